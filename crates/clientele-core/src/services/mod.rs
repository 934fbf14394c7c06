//! Typed wrappers over the REST endpoints.
//!
//! - `AuthService`: OAuth code exchange, login completion, logout
//! - `CustomerService`: customers and their contacts and activities

pub mod auth;
pub mod customers;

pub use auth::{AuthResponse, AuthService, LoginError};
pub use customers::{CustomerOverview, CustomerService};
