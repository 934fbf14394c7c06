//! Local caching of recently fetched CRM data.
//!
//! The `CacheManager` keeps the dashboard metrics, the last customer list
//! page and per-customer overviews as JSON so the terminal can paint
//! something immediately on startup. Entries are considered stale after
//! 60 minutes and the whole cache is wiped on logout.

pub mod manager;

pub use manager::{CacheAges, CacheManager, CachedCustomerPage, CachedData};
