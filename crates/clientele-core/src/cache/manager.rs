use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::dashboard::DashboardMetrics;
use crate::models::{Customer, Paginated};
use crate::services::CustomerOverview;

/// Cached entries older than this are reported as stale.
const CACHE_STALE_MINUTES: i64 = 60;

const DASHBOARD: &str = "dashboard";
const CUSTOMERS: &str = "customers";
const OVERVIEW_PREFIX: &str = "customer_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    /// "just now", "12m ago", "3h ago", "2d ago". Hours and days round to
    /// the nearest unit.
    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        match minutes {
            // Negative means clock skew
            m if m < 1 => "just now".to_string(),
            m if m < 60 => format!("{}m ago", m),
            m if m < 1440 => format!("{}h ago", (m + 30) / 60),
            m => format!("{}d ago", (m + 720) / 1440),
        }
    }

    pub fn is_stale(&self) -> bool {
        self.age_minutes() > CACHE_STALE_MINUTES
    }
}

/// A customer list page together with the query that produced it, so a
/// cached page is only reused for the same filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedCustomerPage {
    pub page: u32,
    pub status: Option<String>,
    pub search: String,
    pub result: Paginated<Customer>,
}

#[derive(Debug, Clone)]
pub struct CacheManager {
    cache_dir: PathBuf,
}

impl CacheManager {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache directory {}", cache_dir.display()))?;
        Ok(Self { cache_dir })
    }

    fn cache_path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", name))
    }

    fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<CachedData<T>>> {
        let path = self.cache_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file: {}", name))?;
        let cached: CachedData<T> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache file: {}", name))?;
        Ok(Some(cached))
    }

    fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        let cached = CachedData::new(data);
        let contents = serde_json::to_string_pretty(&cached)?;
        std::fs::write(self.cache_path(name), contents)?;
        debug!(cache = name, "Cache saved");
        Ok(())
    }

    // ===== Dashboard =====

    pub fn load_dashboard(&self) -> Result<Option<CachedData<DashboardMetrics>>> {
        self.load(DASHBOARD)
    }

    pub fn save_dashboard(&self, metrics: &DashboardMetrics) -> Result<()> {
        self.save(DASHBOARD, metrics)
    }

    // ===== Customer list =====

    pub fn load_customers(&self) -> Result<Option<CachedData<CachedCustomerPage>>> {
        self.load(CUSTOMERS)
    }

    pub fn save_customers(&self, page: &CachedCustomerPage) -> Result<()> {
        self.save(CUSTOMERS, page)
    }

    // ===== Customer detail =====

    /// Percent-encoded so distinct ids never share a file and none can
    /// escape the cache directory.
    fn overview_name(customer_id: &str) -> String {
        format!("{}{}", OVERVIEW_PREFIX, urlencoding::encode(customer_id))
    }

    /// The cached overview for `customer_id`. An entry recorded for another
    /// customer is treated as missing.
    pub fn load_overview(&self, customer_id: &str) -> Result<Option<CachedData<CustomerOverview>>> {
        let cached: Option<CachedData<CustomerOverview>> = self.load(&Self::overview_name(customer_id))?;
        Ok(cached.filter(|c| {
            let matches = c.data.customer.id == customer_id;
            if !matches {
                debug!(customer_id, cached_id = %c.data.customer.id, "Ignoring overview cached for another customer");
            }
            matches
        }))
    }

    pub fn save_overview(&self, overview: &CustomerOverview) -> Result<()> {
        self.save(&Self::overview_name(&overview.customer.id), overview)
    }

    // ===== Maintenance =====

    /// Remove every cached file. Called on logout so the next user does not
    /// see the previous user's customers.
    pub fn clear(&self) -> Result<()> {
        let entries = match std::fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e).context("Failed to read cache directory"),
        };

        let mut removed = 0;
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
                removed += 1;
            }
        }
        debug!(removed, "Cache cleared");
        Ok(())
    }

    /// Load an entry only to report its age; errors are logged and hidden.
    fn load_age<T>(&self, name: &str, loader: impl FnOnce() -> Result<Option<CachedData<T>>>) -> Option<String> {
        match loader() {
            Ok(Some(cached)) => Some(cached.age_display()),
            Ok(None) => None,
            Err(e) => {
                debug!(cache = name, error = %e, "Failed to load cache for age display");
                None
            }
        }
    }

    pub fn get_cache_ages(&self) -> CacheAges {
        CacheAges {
            dashboard: self.load_age(DASHBOARD, || self.load_dashboard()),
            customers: self.load_age(CUSTOMERS, || self.load_customers()),
        }
    }
}

#[derive(Debug, Default)]
pub struct CacheAges {
    pub dashboard: Option<String>,
    pub customers: Option<String>,
}

impl CacheAges {
    /// The first known age, dashboard before customer list.
    pub fn last_updated(&self) -> String {
        self.dashboard
            .clone()
            .or_else(|| self.customers.clone())
            .unwrap_or_else(|| "never".to_string())
    }
}
