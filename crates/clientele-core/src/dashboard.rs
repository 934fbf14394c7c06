//! Landing-page metrics.
//!
//! The dashboard is derived from the first page of customers: the total
//! count comes from pagination metadata, the active count from the returned
//! rows only.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::ApiError;
use crate::filters::CustomerFilter;
use crate::models::{Customer, Paginated};
use crate::services::CustomerService;

/// Rows requested for the dashboard's recent customers list.
pub const DASHBOARD_PAGE_SIZE: u32 = 5;

/// Share of the total reported as new customers.
const NEW_CUSTOMER_RATIO: f64 = 0.15;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    pub total_customers: u64,
    pub active_customers: u64,
    pub new_customers: u64,
    pub recent_customers: Vec<Customer>,
}

impl DashboardMetrics {
    pub fn from_page(page: Paginated<Customer>) -> Self {
        let total = page.meta.total;
        let active = page
            .data
            .iter()
            .filter(|c| c.is_active())
            .count() as u64;

        Self {
            total_customers: total,
            active_customers: active,
            new_customers: (total as f64 * NEW_CUSTOMER_RATIO).floor() as u64,
            recent_customers: page.data,
        }
    }

    /// Active customers as a whole percentage of the total.
    pub fn active_share_percent(&self) -> u64 {
        let total = self.total_customers.max(1) as f64;
        (self.active_customers as f64 / total * 100.0).round() as u64
    }

    pub async fn fetch(customers: &CustomerService) -> Result<Self, ApiError> {
        let page = customers
            .list_customers(1, DASHBOARD_PAGE_SIZE, &CustomerFilter::default())
            .await?;
        Ok(Self::from_page(page))
    }

    /// Like `fetch`, but a failure shows zeroed metrics instead of an error.
    /// The client has already notified the user.
    pub async fn load(customers: &CustomerService) -> Self {
        match Self::fetch(customers).await {
            Ok(metrics) => metrics,
            Err(e) => {
                warn!(error = %e, "Failed to load dashboard metrics");
                Self::default()
            }
        }
    }
}
