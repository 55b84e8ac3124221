use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;

use kkvat_core::{AppError, AppResult};

use crate::api_gateway::ApiGateway;
use crate::list_envelope::{Page, decode_page};

mod resources;

pub use resources::{
    EntityConfigs, Groups, MenuItems, ReportSchedules, Reports, Roles, TestCases, Users,
};

/// How a resource's collection endpoint returns rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    /// `GET base?page&size` returning a paged envelope.
    Paged,
    /// `GET base` returning every row.
    Full,
    /// `GET base + suffix` returning every row.
    FullAt(&'static str),
}

/// Where keyword search runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// `GET base/search?keyword=`.
    Server,
    /// Containment match over the cached full list.
    Client,
    /// The resource cannot be searched.
    Unsupported,
}

/// Backend collection administered through a [`ListScreen`].
pub trait ConsoleResource: Send + Sync + 'static {
    /// Human-readable collection name used in logs and errors.
    const LABEL: &'static str;
    /// Collection path, e.g. `/api/users`.
    const BASE_PATH: &'static str;
    /// Collection listing style.
    const LISTING: Listing;
    /// Search style.
    const SEARCH: SearchMode;

    /// Row model.
    type Model: DeserializeOwned + Clone + Send + Sync + 'static;
    /// Create/update body.
    type Draft: Serialize + Send + Sync;

    /// Returns the backend identifier of a row.
    fn id(model: &Self::Model) -> i64;

    /// Client-side keyword match; only consulted for [`SearchMode::Client`].
    fn matches(_model: &Self::Model, _keyword: &str) -> bool {
        false
    }

    /// Local validation run before any mutation is sent.
    fn validate(_draft: &Self::Draft) -> AppResult<()> {
        Ok(())
    }
}

/// Loading state of a list screen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ListState {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// A fetch is in flight.
    Loading,
    /// Rows reflect the last successful fetch.
    Loaded,
    /// The last fetch failed with this message.
    Error(String),
}

/// Point-in-time view of a list screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ListSnapshot<T> {
    /// Loading state.
    pub state: ListState,
    /// Visible rows.
    pub rows: Vec<T>,
    /// Zero-based page index.
    pub page: u32,
    /// Page count.
    pub total_pages: u32,
    /// Row count across pages.
    pub total_elements: u64,
    /// Active search keyword.
    pub keyword: Option<String>,
}

struct ScreenState<T> {
    state: ListState,
    rows: Vec<T>,
    master: Vec<T>,
    page: u32,
    total_pages: u32,
    total_elements: u64,
    keyword: Option<String>,
}

impl<T> Default for ScreenState<T> {
    fn default() -> Self {
        Self {
            state: ListState::Idle,
            rows: Vec::new(),
            master: Vec::new(),
            page: 0,
            total_pages: 0,
            total_elements: 0,
            keyword: None,
        }
    }
}

struct SavingGuard<'a>(&'a AtomicBool);

impl Drop for SavingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Generic list/create/edit/delete screen over one backend collection.
///
/// Every successful mutation is followed by a reload from the server. Only
/// one mutation may be in flight; others are rejected with `Conflict`.
pub struct ListScreen<R: ConsoleResource> {
    gateway: ApiGateway,
    page_size: u32,
    state: RwLock<ScreenState<R::Model>>,
    saving: AtomicBool,
}

impl<R: ConsoleResource> ListScreen<R> {
    /// Creates an idle screen.
    #[must_use]
    pub fn new(gateway: ApiGateway, page_size: u32) -> Self {
        Self {
            gateway,
            page_size: page_size.max(1),
            state: RwLock::new(ScreenState::default()),
            saving: AtomicBool::new(false),
        }
    }

    /// Returns the configured page size.
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Returns whether a mutation is in flight.
    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::Acquire)
    }

    /// Returns the current rows and paging state.
    pub async fn snapshot(&self) -> ListSnapshot<R::Model> {
        let state = self.state.read().await;
        ListSnapshot {
            state: state.state.clone(),
            rows: state.rows.clone(),
            page: state.page,
            total_pages: state.total_pages,
            total_elements: state.total_elements,
            keyword: state.keyword.clone(),
        }
    }

    /// Fetches `page` and clears any active search.
    pub async fn load(&self, page: u32) -> AppResult<()> {
        self.state.write().await.state = ListState::Loading;

        let (path, query) = match R::LISTING {
            Listing::Paged => (
                R::BASE_PATH.to_owned(),
                vec![("page", page.to_string()), ("size", self.page_size.to_string())],
            ),
            Listing::Full => (R::BASE_PATH.to_owned(), Vec::new()),
            Listing::FullAt(suffix) => (format!("{}{suffix}", R::BASE_PATH), Vec::new()),
        };

        match self.fetch(&path, &query).await {
            Ok(fetched) => {
                let mut state = self.state.write().await;
                state.page = if R::LISTING == Listing::Paged { page } else { 0 };
                state.total_pages = fetched.page_count(self.page_size);
                state.total_elements = fetched.total();
                state.keyword = None;
                state.master = fetched.rows.clone();
                state.rows = fetched.rows;
                state.state = ListState::Loaded;
                tracing::debug!(resource = R::LABEL, page, rows = state.rows.len(), "list loaded");
                Ok(())
            }
            Err(error) => Err(self.record_failure(error).await),
        }
    }

    /// Reloads the current page.
    pub async fn reload(&self) -> AppResult<()> {
        let page = self.state.read().await.page;
        self.load(page).await
    }

    /// Filters the list by `keyword`. A blank keyword restores the full list.
    pub async fn search(&self, keyword: &str) -> AppResult<()> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return self.clear_search().await;
        }

        match R::SEARCH {
            SearchMode::Server => {
                self.state.write().await.state = ListState::Loading;
                let mut query = vec![("keyword", keyword.to_owned())];
                if R::LISTING == Listing::Paged {
                    query.push(("page", "0".to_owned()));
                    query.push(("size", self.page_size.to_string()));
                }

                match self.fetch(&format!("{}/search", R::BASE_PATH), &query).await {
                    Ok(fetched) => {
                        let mut state = self.state.write().await;
                        state.page = 0;
                        state.total_pages = fetched.page_count(self.page_size);
                        state.total_elements = fetched.total();
                        state.rows = fetched.rows;
                        state.keyword = Some(keyword.to_owned());
                        state.state = ListState::Loaded;
                        Ok(())
                    }
                    Err(error) => Err(self.record_failure(error).await),
                }
            }
            SearchMode::Client => {
                if self.state.read().await.state == ListState::Idle {
                    self.load(0).await?;
                }

                let mut state = self.state.write().await;
                let rows: Vec<R::Model> = state
                    .master
                    .iter()
                    .filter(|model| R::matches(model, keyword))
                    .cloned()
                    .collect();
                state.total_elements = u64::try_from(rows.len()).unwrap_or(u64::MAX);
                state.total_pages = u32::from(!rows.is_empty());
                state.rows = rows;
                state.keyword = Some(keyword.to_owned());
                Ok(())
            }
            SearchMode::Unsupported => Err(AppError::Validation(format!(
                "{} cannot be searched",
                R::LABEL
            ))),
        }
    }

    /// Drops the active search.
    pub async fn clear_search(&self) -> AppResult<()> {
        let cached = self.state.read().await.state != ListState::Idle;
        if R::SEARCH != SearchMode::Client || !cached {
            return self.load(0).await;
        }

        let mut state = self.state.write().await;
        state.rows = state.master.clone();
        state.total_elements = u64::try_from(state.rows.len()).unwrap_or(u64::MAX);
        state.total_pages = u32::from(!state.rows.is_empty());
        state.keyword = None;
        Ok(())
    }

    /// Fetches one row.
    pub async fn get(&self, id: i64) -> AppResult<R::Model> {
        self.gateway
            .get_json(&format!("{}/{id}", R::BASE_PATH), &[])
            .await
    }

    /// Creates a row and reloads.
    pub async fn create(&self, draft: &R::Draft) -> AppResult<Value> {
        R::validate(draft)?;
        let _guard = self.begin_saving()?;

        let created: Value = self.gateway.post_json(R::BASE_PATH, draft).await?;
        tracing::info!(resource = R::LABEL, "created");
        self.reload_after_mutation().await;
        Ok(created)
    }

    /// Replaces row `id` and reloads.
    pub async fn update(&self, id: i64, draft: &R::Draft) -> AppResult<Value> {
        R::validate(draft)?;
        let _guard = self.begin_saving()?;

        let updated: Value = self
            .gateway
            .put_json(&format!("{}/{id}", R::BASE_PATH), draft)
            .await?;
        tracing::info!(resource = R::LABEL, id, "updated");
        self.reload_after_mutation().await;
        Ok(updated)
    }

    /// Deletes row `id`, drops it from the cached rows and reloads.
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let _guard = self.begin_saving()?;

        self.gateway
            .delete(&format!("{}/{id}", R::BASE_PATH))
            .await?;
        tracing::info!(resource = R::LABEL, id, "deleted");
        {
            let mut state = self.state.write().await;
            state.rows.retain(|model| R::id(model) != id);
            state.master.retain(|model| R::id(model) != id);
        }
        self.reload_after_mutation().await;
        Ok(())
    }

    fn begin_saving(&self) -> AppResult<SavingGuard<'_>> {
        self.saving
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                AppError::Conflict(format!(
                    "another change to {} is still being saved",
                    R::LABEL
                ))
            })?;
        Ok(SavingGuard(&self.saving))
    }

    async fn reload_after_mutation(&self) {
        if let Err(error) = self.reload().await {
            tracing::warn!(resource = R::LABEL, error = %error, "reload after change failed");
        }
    }

    async fn fetch(&self, path: &str, query: &[(&str, String)]) -> AppResult<Page<R::Model>> {
        let payload: Value = self.gateway.get_json(path, query).await?;
        Ok(decode_page(payload))
    }

    async fn record_failure(&self, error: AppError) -> AppError {
        tracing::warn!(resource = R::LABEL, error = %error, "list fetch failed");
        self.state.write().await.state = ListState::Error(error.message().to_owned());
        error
    }
}
