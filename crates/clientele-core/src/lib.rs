//! Core library for clientele.
//!
//! This crate contains everything the terminal dashboard needs to talk to
//! the remote CRM service:
//!
//! - `auth`: the session store, OAuth authorization helpers
//! - `api`: the token-aware HTTP client with refresh-and-retry semantics
//! - `services`: authentication and customer/contact/activity endpoints
//! - `models`: request and response types for the REST API
//! - `dashboard`, `filters`: landing-page metrics and list filter state
//! - `cache`: on-disk cache of recently fetched data
//! - `config`: application configuration

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod filters;
pub mod models;
pub mod services;
pub mod utils;

pub use api::{ApiClient, ApiError, ApiRequest};
pub use auth::{SessionState, SessionStore, UserIdentity, UserUpdate};
pub use config::Config;
