//! Customer list filter state.
//!
//! Holds the selection, status filter, and search text for the customers
//! view. The list query is derived from it with `filter()`.

use crate::models::CustomerStatus;

/// Query-side view of the filter: what gets sent as `status` and `search`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerFilter {
    pub status: Option<CustomerStatus>,
    pub search: String,
}

impl CustomerFilter {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.search.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerFilterState {
    pub selected_customer_id: Option<String>,
    pub filter_status: Option<CustomerStatus>,
    pub search_query: String,
}

impl CustomerFilterState {
    pub fn select_customer(&mut self, id: Option<String>) {
        self.selected_customer_id = id;
    }

    pub fn set_filter_status(&mut self, status: Option<CustomerStatus>) {
        self.filter_status = status;
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    /// Advance the status filter: All -> Active -> Inactive -> Lead -> All.
    pub fn cycle_status(&mut self) {
        self.filter_status = match self.filter_status {
            None => Some(CustomerStatus::Active),
            Some(CustomerStatus::Active) => Some(CustomerStatus::Inactive),
            Some(CustomerStatus::Inactive) => Some(CustomerStatus::Lead),
            Some(CustomerStatus::Lead) => None,
        };
    }

    pub fn status_label(&self) -> &'static str {
        self.filter_status.map(|s| s.label()).unwrap_or("All")
    }

    pub fn filter(&self) -> CustomerFilter {
        CustomerFilter {
            status: self.filter_status,
            search: self.search_query.trim().to_string(),
        }
    }
}
