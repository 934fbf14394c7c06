//! Data models for the CRM service.
//!
//! - `Customer`, `Address`: the customer record and its postal address
//! - `Contact`: people attached to a customer
//! - `Activity`: calls, emails, meetings, notes and tasks logged against a customer
//! - `Paginated`, `PageMeta`: the list envelope returned by `/customers`
//!
//! Field names follow the service's camelCase JSON.

pub mod activity;
pub mod contact;
pub mod customer;
pub mod page;

pub use activity::{Activity, ActivityDraft, ActivityType};
pub use contact::{Contact, ContactDraft};
pub use customer::{Address, Customer, CustomerDraft, CustomerStatus, CustomerType};
pub use page::{PageMeta, Paginated};
