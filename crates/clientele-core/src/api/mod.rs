//! REST API client module for the CRM service.
//!
//! This module provides the `ApiClient`, the only path by which the
//! application reaches the remote service. It attaches the bearer token from
//! the `SessionStore`, transparently refreshes an expired access token once,
//! and reports every failure through a `Notifier`.

pub mod client;
pub mod error;
pub mod notify;
pub mod request;

pub use client::ApiClient;
pub use error::ApiError;
pub use notify::{ChannelNotifier, LogNotifier, Notification, NotificationLevel, Notifier};
pub use request::ApiRequest;
