//! Paged list state and page-number navigation.
//!
//! [`compute_page_tokens`] turns the current page and page count into the
//! compact sequence of buttons a pager renders, collapsing long ranges into
//! ellipses. [`PaginatedListController`] owns the displayed slice of records
//! and is the only place a page change is requested from.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use anyhow::Result;
use async_trait::async_trait;
use shared::protocol::{Page, PaginationDescriptor};
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const DEFAULT_MAX_VISIBLE: u32 = 5;
pub const MIN_MAX_VISIBLE: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageToken {
    Page(u32),
    Ellipsis,
}

impl PageToken {
    pub fn page(self) -> Option<u32> {
        match self {
            Self::Page(page) => Some(page),
            Self::Ellipsis => None,
        }
    }
}

/// Page buttons for `current` out of `total_pages`.
///
/// The first and last pages are always present. Between them sits a window of
/// `max_visible - 2` pages around `current`, shifted inward at either edge, and
/// an ellipsis stands in for every gap. With the default width of 5 and ten
/// pages, page 5 yields `1 … 4 5 6 … 10`.
///
/// Out-of-range inputs are clamped: `total_pages` to at least 1, `current`
/// into `1..=total_pages` and `max_visible` to at least [`MIN_MAX_VISIBLE`].
pub fn compute_page_tokens(current: u32, total_pages: u32, max_visible: u32) -> Vec<PageToken> {
    let total_pages = total_pages.max(1);
    let current = current.clamp(1, total_pages);
    let max_visible = max_visible.max(MIN_MAX_VISIBLE);

    if total_pages <= max_visible {
        return (1..=total_pages).map(PageToken::Page).collect();
    }

    // total_pages > max_visible, so the interior (2..=total_pages - 1) always
    // has room for the whole window.
    let width = max_visible - 2;
    let half = (width - 1) / 2;
    let last_interior = total_pages - 1;

    let mut start = current.saturating_sub(half).max(2);
    let mut end = start + width - 1;
    if end > last_interior {
        end = last_interior;
        start = end + 1 - width;
    }

    let mut tokens = Vec::with_capacity(max_visible as usize + 2);
    tokens.push(PageToken::Page(1));
    if start > 2 {
        tokens.push(PageToken::Ellipsis);
    }
    tokens.extend((start..=end).map(PageToken::Page));
    if end < last_interior {
        tokens.push(PageToken::Ellipsis);
    }
    tokens.push(PageToken::Page(total_pages));
    tokens
}

/// Source of paged records, usually the admin API.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    type Item: Clone + Send + Sync + 'static;

    async fn fetch_page(&self, page: u32) -> Result<Page<Self::Item>>;
}

#[async_trait]
impl<F: PageFetcher + ?Sized> PageFetcher for Arc<F> {
    type Item = F::Item;

    async fn fetch_page(&self, page: u32) -> Result<Page<Self::Item>> {
        (**self).fetch_page(page).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageChange {
    /// Out of range or already the current page; nothing was fetched.
    Ignored,
    Loaded(PaginationDescriptor),
    Failed(String),
    /// A newer request was issued before this one resolved; its response was
    /// dropped.
    Superseded,
}

#[derive(Debug, Clone)]
pub struct ListSnapshot<T> {
    pub items: Vec<T>,
    pub pagination: PaginationDescriptor,
    pub loading: bool,
    pub pending_page: Option<u32>,
    pub last_error: Option<String>,
}

impl<T> Default for ListSnapshot<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            pagination: PaginationDescriptor::default(),
            loading: false,
            pending_page: None,
            last_error: None,
        }
    }
}

impl<T> ListSnapshot<T> {
    pub fn load_failed(&self) -> bool {
        self.last_error.is_some()
    }
}

pub struct PaginatedListController<F: PageFetcher> {
    fetcher: F,
    max_visible: u32,
    state: Mutex<ListSnapshot<F::Item>>,
    issued: AtomicU64,
}

impl<F: PageFetcher> PaginatedListController<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            max_visible: DEFAULT_MAX_VISIBLE,
            state: Mutex::new(ListSnapshot::default()),
            issued: AtomicU64::new(0),
        }
    }

    pub fn with_max_visible(mut self, max_visible: u32) -> Self {
        self.max_visible = max_visible.max(MIN_MAX_VISIBLE);
        self
    }

    pub fn max_visible(&self) -> u32 {
        self.max_visible
    }

    pub async fn snapshot(&self) -> ListSnapshot<F::Item> {
        self.state.lock().await.clone()
    }

    pub async fn pagination(&self) -> PaginationDescriptor {
        self.state.lock().await.pagination
    }

    pub async fn page_tokens(&self) -> Vec<PageToken> {
        let pagination = self.pagination().await;
        compute_page_tokens(pagination.page, pagination.pages, self.max_visible)
    }

    pub async fn can_go_previous(&self) -> bool {
        self.pagination().await.has_previous()
    }

    pub async fn can_go_next(&self) -> bool {
        self.pagination().await.has_next()
    }

    /// Requests `requested`. Pages outside `1..=pages` and the current page
    /// are ignored without touching the fetcher.
    pub async fn change_page(&self, requested: u32) -> PageChange {
        let pagination = self.pagination().await;
        if !pagination.contains(requested) || requested == pagination.page {
            debug!(
                requested,
                current = pagination.page,
                pages = pagination.pages,
                "ignoring page change"
            );
            return PageChange::Ignored;
        }
        self.load(requested).await
    }

    pub async fn next(&self) -> PageChange {
        let current = self.pagination().await.page;
        self.change_page(current.saturating_add(1)).await
    }

    pub async fn previous(&self) -> PageChange {
        let current = self.pagination().await.page;
        self.change_page(current.saturating_sub(1)).await
    }

    /// Re-fetches the current page, e.g. on first display or after the
    /// underlying collection changed.
    pub async fn refresh(&self) -> PageChange {
        let current = self.pagination().await.page;
        self.load(current).await
    }

    async fn load(&self, page: u32) -> PageChange {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.state.lock().await;
            state.loading = true;
            state.pending_page = Some(page);
        }
        debug!(page, seq, "requesting page");

        let result = self.fetcher.fetch_page(page).await;

        let mut state = self.state.lock().await;
        if self.issued.load(Ordering::SeqCst) != seq {
            debug!(page, seq, "discarding superseded page response");
            return PageChange::Superseded;
        }

        state.loading = false;
        state.pending_page = None;
        match result {
            Ok(fetched) => {
                state.items = fetched.items;
                state.pagination = fetched.pagination.normalized();
                state.last_error = None;
                PageChange::Loaded(state.pagination)
            }
            Err(err) => {
                warn!(page, error = %err, "page load failed");
                let message = err.to_string();
                state.items.clear();
                state.last_error = Some(message.clone());
                PageChange::Failed(message)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/pagination_tests.rs"]
mod tests;
