//! Application state management for clientele.
//!
//! This module contains the core `App` struct that owns the session, the API
//! services, the cache, and all UI state. Network work runs in spawned tasks
//! that report back through an mpsc channel drained once per tick.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use clientele_core::api::{ChannelNotifier, Notification, NotificationLevel};
use clientele_core::auth::{OAuthSettings, OAuthStateStore, SessionStorage};
use clientele_core::cache::{CacheAges, CacheManager, CachedCustomerPage};
use clientele_core::dashboard::DashboardMetrics;
use clientele_core::filters::CustomerFilterState;
use clientele_core::models::{Customer, CustomerStatus, Paginated};
use clientele_core::services::{AuthService, CustomerOverview, CustomerService, LoginError};
use clientele_core::{ApiClient, ApiError, Config, SessionStore, UserIdentity};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Maximum length for the search box.
const MAX_SEARCH_LENGTH: usize = 100;

/// Maximum length for the pasted redirect URL. Authorization codes and
/// state nonces keep real redirects well under this.
const MAX_REDIRECT_LENGTH: usize = 2048;

/// Number of rows to move on page up/down.
pub const PAGE_SCROLL_SIZE: usize = 10;

// ============================================================================
// UI State Types
// ============================================================================

/// Main navigation tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Dashboard,
    Customers,
}

impl Tab {
    pub fn next(&self) -> Self {
        match self {
            Tab::Dashboard => Tab::Customers,
            Tab::Customers => Tab::Dashboard,
        }
    }

    pub fn prev(&self) -> Self {
        // Two tabs: previous and next coincide
        self.next()
    }
}

/// Sub-view of the customer detail screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailView {
    Overview,
    Contacts,
    Activities,
}

impl DetailView {
    pub fn title(&self) -> &'static str {
        match self {
            DetailView::Overview => "Overview",
            DetailView::Contacts => "Contacts",
            DetailView::Activities => "Activities",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            DetailView::Overview => DetailView::Contacts,
            DetailView::Contacts => DetailView::Activities,
            DetailView::Activities => DetailView::Overview,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            DetailView::Overview => DetailView::Activities,
            DetailView::Contacts => DetailView::Overview,
            DetailView::Activities => DetailView::Contacts,
        }
    }
}

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    Searching,
    ShowingHelp,
    LoggingIn,
    ConfirmingQuit,
    Quitting,
}

/// Loading and failure state of one view's data. A failed load keeps the
/// message so the view can offer a retry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Failed(String),
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Results sent from spawned tasks back to the main loop.
enum FetchResult {
    Dashboard(Result<DashboardMetrics, ApiError>),
    /// Customer list page for the query identified by the generation
    Customers(u64, Result<Paginated<Customer>, ApiError>),
    Overview(String, Result<CustomerOverview, ApiError>),
    Login(Result<UserIdentity, LoginError>),
    LoggedOut,
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    // Core services
    pub config: Config,
    pub session: Arc<SessionStore>,
    pub auth: AuthService,
    pub customers: CustomerService,
    pub cache: CacheManager,

    // UI State
    pub state: AppState,
    pub current_tab: Tab,
    pub detail_view: DetailView,
    /// Customer whose detail screen is open
    pub viewing_customer: Option<String>,

    // Login overlay
    pub login_url: Option<String>,
    pub login_input: String,
    pub login_error: Option<String>,
    pub login_in_progress: bool,

    // Customers list
    pub filters: CustomerFilterState,
    pub search_input: String,
    pub page: u32,
    pub customer_selection: usize,

    // Data
    pub dashboard: DashboardMetrics,
    pub customer_page: Paginated<Customer>,
    pub overview: Option<CustomerOverview>,
    pub dashboard_selection: usize,
    pub contact_selection: usize,
    pub activity_selection: usize,

    pub dashboard_load: LoadState,
    pub customers_load: LoadState,
    pub detail_load: LoadState,

    // Background work
    fetch_rx: mpsc::Receiver<FetchResult>,
    fetch_tx: mpsc::Sender<FetchResult>,
    notifications: mpsc::UnboundedReceiver<Notification>,
    customers_generation: u64,
    customers_cancel: Option<CancellationToken>,

    pub status_message: Option<String>,
    pub cache_ages: CacheAges,
}

impl App {
    /// Create a new application instance
    pub fn new() -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };
        debug!(api = %config.api_base(), "Config loaded");

        let data_dir = config.data_dir().unwrap_or_else(|_| PathBuf::from("./data"));
        let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));

        let session = Arc::new(SessionStore::open(SessionStorage::in_dir(&data_dir)));
        let (notifier, notifications) = ChannelNotifier::new();
        let api = ApiClient::new(&config, session.clone(), Arc::new(notifier))?;

        let auth = AuthService::new(
            api.clone(),
            OAuthSettings::from_config(&config),
            OAuthStateStore::in_dir(&data_dir),
        );
        let customers = CustomerService::new(api);
        let cache = CacheManager::new(cache_dir)?;

        let (fetch_tx, fetch_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        Ok(Self {
            config,
            session,
            auth,
            customers,
            cache,

            state: AppState::Normal,
            current_tab: Tab::Dashboard,
            detail_view: DetailView::Overview,
            viewing_customer: None,

            login_url: None,
            login_input: String::new(),
            login_error: None,
            login_in_progress: false,

            filters: CustomerFilterState::default(),
            search_input: String::new(),
            page: 1,
            customer_selection: 0,

            dashboard: DashboardMetrics::default(),
            customer_page: Paginated::default(),
            overview: None,
            dashboard_selection: 0,
            contact_selection: 0,
            activity_selection: 0,

            dashboard_load: LoadState::Idle,
            customers_load: LoadState::Idle,
            detail_load: LoadState::Idle,

            fetch_rx,
            fetch_tx,
            notifications,
            customers_generation: 0,
            customers_cancel: None,

            status_message: None,
            cache_ages: CacheAges::default(),
        })
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn user_name(&self) -> Option<String> {
        self.session.user().map(|u| u.name)
    }

    /// Show the login overlay with a fresh authorization URL.
    pub fn start_login(&mut self) {
        self.state = AppState::LoggingIn;
        self.login_input.clear();
        self.login_in_progress = false;
        match self.auth.begin_login() {
            Ok(url) => {
                self.login_url = Some(url.to_string());
                self.login_error = None;
            }
            Err(e) => {
                error!(error = %e, "Failed to start login");
                self.login_url = None;
                self.login_error = Some(e.to_string());
            }
        }
    }

    /// Complete the login with the pasted redirect URL in the background.
    pub fn submit_login(&mut self) {
        if self.login_in_progress {
            return;
        }
        let redirect = self.login_input.trim().to_string();
        if redirect.is_empty() {
            self.login_error = Some("Paste the URL you were redirected to".to_string());
            return;
        }

        self.login_error = None;
        self.login_in_progress = true;

        let auth = self.auth.clone();
        let tx = self.fetch_tx.clone();
        tokio::spawn(async move {
            let result = auth.complete_login(&redirect).await;
            Self::send_result(&tx, FetchResult::Login(result)).await;
        });
    }

    /// Log out on the server and locally, then return to the login overlay.
    pub fn logout(&mut self) {
        info!("Logging out");
        let auth = self.auth.clone();
        let tx = self.fetch_tx.clone();
        tokio::spawn(async move {
            auth.logout().await;
            Self::send_result(&tx, FetchResult::LoggedOut).await;
        });
        self.status_message = Some("Logging out...".to_string());
    }

    fn clear_user_data(&mut self) {
        if let Some(cancel) = self.customers_cancel.take() {
            cancel.cancel();
        }
        if let Err(e) = self.cache.clear() {
            warn!(error = %e, "Failed to clear cache");
        }
        self.dashboard = DashboardMetrics::default();
        self.customer_page = Paginated::default();
        self.overview = None;
        self.viewing_customer = None;
        self.filters = CustomerFilterState::default();
        self.page = 1;
        self.customer_selection = 0;
        self.dashboard_selection = 0;
        self.dashboard_load = LoadState::Idle;
        self.customers_load = LoadState::Idle;
        self.detail_load = LoadState::Idle;
        self.cache_ages = self.cache.get_cache_ages();
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Paint whatever was cached last time, so the screen is not empty while
    /// the first fetch is running.
    pub fn load_from_cache(&mut self) {
        match self.cache.load_dashboard() {
            Ok(Some(cached)) => self.dashboard = cached.data,
            Ok(None) => {}
            Err(e) => debug!(error = %e, "Ignoring dashboard cache"),
        }

        match self.cache.load_customers() {
            Ok(Some(cached)) => {
                let cached = cached.data;
                self.page = cached.page.max(1);
                self.filters.set_filter_status(
                    cached
                        .status
                        .as_deref()
                        .and_then(|s| CustomerStatus::ALL.into_iter().find(|st| st.as_str() == s)),
                );
                self.filters.set_search_query(cached.search);
                self.customer_page = cached.result;
            }
            Ok(None) => {}
            Err(e) => debug!(error = %e, "Ignoring customer list cache"),
        }

        self.cache_ages = self.cache.get_cache_ages();
    }

    // =========================================================================
    // Background Fetches
    // =========================================================================

    async fn send_result(tx: &mpsc::Sender<FetchResult>, result: FetchResult) {
        if let Err(e) = tx.send(result).await {
            error!(error = %e, "Failed to send fetch result - channel closed");
        }
    }

    /// Refetch the dashboard and the current customer page.
    pub fn refresh_all(&mut self) {
        self.fetch_dashboard();
        self.fetch_customers();
    }

    /// Refetch whatever the user is looking at. Also the retry for a failed
    /// load.
    pub fn refresh_current_view(&mut self) {
        if let Some(id) = self.viewing_customer.clone() {
            self.fetch_overview(id);
            return;
        }
        match self.current_tab {
            Tab::Dashboard => self.fetch_dashboard(),
            Tab::Customers => self.fetch_customers(),
        }
    }

    pub fn fetch_dashboard(&mut self) {
        self.dashboard_load = LoadState::Loading;
        let customers = self.customers.clone();
        let tx = self.fetch_tx.clone();
        tokio::spawn(async move {
            let result = DashboardMetrics::fetch(&customers).await;
            Self::send_result(&tx, FetchResult::Dashboard(result)).await;
        });
    }

    /// Fetch the current page for the current filter. An in-flight request
    /// for an older query is cancelled and its result ignored.
    pub fn fetch_customers(&mut self) {
        if let Some(previous) = self.customers_cancel.take() {
            previous.cancel();
        }
        self.customers_generation += 1;
        let generation = self.customers_generation;
        let cancel = CancellationToken::new();
        self.customers_cancel = Some(cancel.clone());
        self.customers_load = LoadState::Loading;

        let customers = self.customers.clone();
        let tx = self.fetch_tx.clone();
        let page = self.page;
        let limit = self.config.page_size;
        let filter = self.filters.filter();
        tokio::spawn(async move {
            let result = customers
                .list_customers_with_cancel(page, limit, &filter, &cancel)
                .await;
            if matches!(result, Err(ApiError::Cancelled)) {
                debug!(generation, "Customer list fetch superseded");
                return;
            }
            Self::send_result(&tx, FetchResult::Customers(generation, result)).await;
        });
    }

    /// Open the detail screen for a customer, painting the cached overview
    /// first when there is one.
    pub fn open_customer(&mut self, id: String) {
        self.detail_view = DetailView::Overview;
        self.contact_selection = 0;
        self.activity_selection = 0;
        self.overview = match self.cache.load_overview(&id) {
            Ok(Some(cached)) => Some(cached.data),
            _ => None,
        };
        self.viewing_customer = Some(id.clone());
        self.filters.select_customer(Some(id.clone()));
        self.fetch_overview(id);
    }

    pub fn close_customer(&mut self) {
        self.viewing_customer = None;
        self.overview = None;
        self.detail_load = LoadState::Idle;
        self.filters.select_customer(None);
    }

    fn fetch_overview(&mut self, id: String) {
        self.detail_load = LoadState::Loading;
        let customers = self.customers.clone();
        let tx = self.fetch_tx.clone();
        tokio::spawn(async move {
            let result = customers.customer_overview(&id).await;
            Self::send_result(&tx, FetchResult::Overview(id, result)).await;
        });
    }

    // =========================================================================
    // Customer List Controls
    // =========================================================================

    pub fn apply_search(&mut self) {
        let query = self.search_input.trim().to_string();
        if query == self.filters.search_query {
            return;
        }
        self.filters.set_search_query(query);
        self.page = 1;
        self.customer_selection = 0;
        self.fetch_customers();
    }

    pub fn cycle_status_filter(&mut self) {
        self.filters.cycle_status();
        self.page = 1;
        self.customer_selection = 0;
        self.fetch_customers();
    }

    pub fn next_page(&mut self) {
        if self.customer_page.meta.has_next() {
            self.page += 1;
            self.customer_selection = 0;
            self.fetch_customers();
        }
    }

    pub fn previous_page(&mut self) {
        if self.page > 1 {
            self.page -= 1;
            self.customer_selection = 0;
            self.fetch_customers();
        }
    }

    pub fn selected_customer(&self) -> Option<&Customer> {
        match self.current_tab {
            Tab::Customers => self.customer_page.data.get(self.customer_selection),
            Tab::Dashboard => self.dashboard.recent_customers.get(self.dashboard_selection),
        }
    }

    // =========================================================================
    // Result Processing
    // =========================================================================

    /// Drain finished background tasks and pending notifications.
    pub fn check_background_tasks(&mut self) {
        while let Ok(result) = self.fetch_rx.try_recv() {
            self.process_fetch_result(result);
        }

        while let Ok(notification) = self.notifications.try_recv() {
            self.status_message = Some(match notification.level {
                NotificationLevel::Error => format!("{}: {}", notification.title, notification.message),
                NotificationLevel::Info => notification.message,
            });
        }
    }

    fn process_fetch_result(&mut self, result: FetchResult) {
        match result {
            FetchResult::Dashboard(Ok(metrics)) => {
                if let Err(e) = self.cache.save_dashboard(&metrics) {
                    warn!(error = %e, "Failed to cache dashboard");
                }
                self.dashboard = metrics;
                self.dashboard_selection = self
                    .dashboard_selection
                    .min(self.dashboard.recent_customers.len().saturating_sub(1));
                self.dashboard_load = LoadState::Idle;
                self.cache_ages = self.cache.get_cache_ages();
            }
            FetchResult::Dashboard(Err(e)) => {
                // Zeroed metrics rather than stale numbers
                self.dashboard = DashboardMetrics::default();
                self.dashboard_load = LoadState::Failed(e.to_string());
                self.handle_auth_failure(&e);
            }
            FetchResult::Customers(generation, result) => {
                if generation != self.customers_generation {
                    debug!(generation, "Discarding stale customer list");
                    return;
                }
                self.customers_cancel = None;
                match result {
                    Ok(page) => {
                        let cached = CachedCustomerPage {
                            page: self.page,
                            status: self.filters.filter_status.map(|s| s.as_str().to_string()),
                            search: self.filters.search_query.clone(),
                            result: page.clone(),
                        };
                        if let Err(e) = self.cache.save_customers(&cached) {
                            warn!(error = %e, "Failed to cache customer list");
                        }
                        self.customer_selection = self
                            .customer_selection
                            .min(page.data.len().saturating_sub(1));
                        self.customer_page = page;
                        self.customers_load = LoadState::Idle;
                        self.cache_ages = self.cache.get_cache_ages();
                    }
                    Err(e) => {
                        self.customers_load = LoadState::Failed(e.to_string());
                        self.handle_auth_failure(&e);
                    }
                }
            }
            FetchResult::Overview(id, result) => {
                if self.viewing_customer.as_deref() != Some(id.as_str()) {
                    return;
                }
                match result {
                    Ok(overview) => {
                        if let Err(e) = self.cache.save_overview(&overview) {
                            warn!(error = %e, "Failed to cache customer overview");
                        }
                        self.overview = Some(overview);
                        self.detail_load = LoadState::Idle;
                    }
                    Err(e) => {
                        self.detail_load = LoadState::Failed(e.to_string());
                        self.handle_auth_failure(&e);
                    }
                }
            }
            FetchResult::Login(Ok(user)) => {
                info!(user_id = %user.id, "Logged in");
                self.login_in_progress = false;
                self.login_input.clear();
                self.login_url = None;
                self.state = AppState::Normal;
                self.status_message = Some(format!("Welcome, {}", user.name));
                self.refresh_all();
            }
            FetchResult::Login(Err(e)) => {
                warn!(error = %e, "Login failed");
                self.login_in_progress = false;
                self.login_error = Some(e.to_string());
                // The nonce is spent either way; offer a fresh URL
                if matches!(e, LoginError::OAuth(_)) {
                    if let Ok(url) = self.auth.begin_login() {
                        self.login_url = Some(url.to_string());
                    }
                }
            }
            FetchResult::LoggedOut => {
                self.clear_user_data();
                self.status_message = None;
                self.start_login();
            }
        }
    }

    /// When a request ended the session, send the user back to login.
    fn handle_auth_failure(&mut self, error: &ApiError) {
        if error.is_auth_failure() && self.state != AppState::LoggingIn {
            info!("Session ended, showing login");
            self.start_login();
        }
    }
}

// ============================================================================
// Input validation helpers (exported for use in input.rs)
// ============================================================================

fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

pub fn can_add_search_char(current_len: usize, c: char) -> bool {
    current_len < MAX_SEARCH_LENGTH && is_valid_input_char(c)
}

pub fn can_add_redirect_char(current_len: usize, c: char) -> bool {
    current_len < MAX_REDIRECT_LENGTH && is_valid_input_char(c)
}

/// Move a list selection by `delta`, clamped to `[0, len)`.
pub fn move_selection(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let max = len - 1;
    if delta < 0 {
        current.saturating_sub(delta.unsigned_abs())
    } else {
        current.saturating_add(delta as usize).min(max)
    }
}

// ============================================================================
// Tests
// ============================================================================
