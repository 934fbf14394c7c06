use serde::{Deserialize, Serialize};

/// Pagination metadata returned alongside list results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    #[serde(rename = "totalPages")]
    pub total_pages: u64,
}

impl PageMeta {
    /// One-based (first, last) item numbers shown on this page.
    /// An empty result reports (0, 0).
    pub fn showing_range(&self) -> (u64, u64) {
        if self.total == 0 || self.limit == 0 {
            return (0, 0);
        }
        let first = self.page.saturating_sub(1).saturating_mul(self.limit).saturating_add(1);
        let last = self.page.saturating_mul(self.limit).min(self.total);
        (first.min(last), last)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// Whether a later page exists, computed from `total` and `limit`
    /// rather than trusting `totalPages`.
    pub fn has_next(&self) -> bool {
        if self.limit == 0 {
            return false;
        }
        self.page < self.total.div_ceil(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Default for Paginated<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            meta: PageMeta::default(),
        }
    }
}
