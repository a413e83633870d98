//! Page-at-a-time loading of the portal's list endpoints.
//!
//! `PageLoader` keeps the rows fetched so far and decides when the next page may be requested. It
//! does not fetch anything on its own: the caller asks `on_sentinel_visible` (or `retry`) which
//! page to fetch, fetches it, and hands the result to `finish`. `load_next`, `retry_with` and
//! `load_all` do those three steps against a `PageSource`.

use crate::Result;
use anyhow::ensure;
use serde::Serialize;
use tracing::{debug, warn};

/// One page of rows, as returned by a list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    rows: Vec<T>,
    page: u32,
    limit: u32,
    total: u64,
}

impl<T> Page<T> {
    pub fn new(rows: Vec<T>, page: u32, limit: u32, total: u64) -> Self {
        Self {
            rows,
            page,
            limit,
            total,
        }
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<T> {
        self.rows
    }

    /// The 1-based page number.
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// The number of rows across all pages.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// True when rows exist beyond this page.
    pub fn has_next(&self) -> bool {
        u64::from(self.page) * u64::from(self.limit) < self.total
    }
}

/// Anything that can produce pages of `T`.
#[async_trait::async_trait]
pub trait PageSource<T> {
    async fn fetch_page(&mut self, page: u32, page_size: u32) -> Result<Page<T>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    /// A request for this page is in flight.
    Loading(u32),
    /// The request for `page` failed. Nothing more is loaded until `retry`.
    Failed { page: u32, message: String },
}

/// Accumulates the rows of an infinite list.
#[derive(Debug, Clone)]
pub struct PageLoader<T> {
    page_size: u32,
    rows: Vec<T>,
    loaded_page: u32,
    total: Option<u64>,
    more: bool,
    state: LoadState,
}

impl<T> PageLoader<T> {
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
            rows: Vec::new(),
            loaded_page: 0,
            total: None,
            more: true,
            state: LoadState::Idle,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<T> {
        self.rows
    }

    /// The last page appended, 0 before the first one.
    pub fn loaded_page(&self) -> u32 {
        self.loaded_page
    }

    /// The total reported by the last page, if any page has been loaded.
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, LoadState::Loading(_))
    }

    /// The message of the failed request, if the last request failed.
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            LoadState::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Whether another page should be loaded when the end of the list comes into view. Always
    /// false after a failure.
    pub fn has_next_page(&self) -> bool {
        self.more && !matches!(self.state, LoadState::Failed { .. })
    }

    /// Called when the end of the list becomes visible. Returns the page to fetch and marks it as
    /// loading, or `None` when nothing should be fetched.
    pub fn on_sentinel_visible(&mut self) -> Option<u32> {
        if self.state != LoadState::Idle || !self.has_next_page() {
            return None;
        }
        let page = self.loaded_page + 1;
        self.state = LoadState::Loading(page);
        Some(page)
    }

    /// Re-requests the page that failed. Returns `None` when the last request did not fail.
    pub fn retry(&mut self) -> Option<u32> {
        match &self.state {
            LoadState::Failed { page, .. } => {
                let page = *page;
                self.state = LoadState::Loading(page);
                Some(page)
            }
            _ => None,
        }
    }

    /// Records the outcome of the request started by `on_sentinel_visible` or `retry`. A page
    /// that arrives when no request is in flight is dropped.
    pub fn finish(&mut self, result: std::result::Result<Page<T>, String>) {
        let LoadState::Loading(page) = self.state else {
            warn!("Dropping a page that arrived while no request was in flight");
            return;
        };
        match result {
            Ok(p) => {
                debug!(
                    "Loaded page {page}: {} rows, {} total",
                    p.rows().len(),
                    p.total()
                );
                self.more = p.has_next();
                self.total = Some(p.total());
                self.loaded_page = page;
                self.rows.extend(p.into_rows());
                self.state = LoadState::Idle;
            }
            Err(message) => {
                self.state = LoadState::Failed { page, message };
            }
        }
    }

    /// Drops every row and starts again from page 1. Used when the filters change.
    pub fn reset(&mut self) {
        self.rows.clear();
        self.loaded_page = 0;
        self.total = None;
        self.more = true;
        self.state = LoadState::Idle;
    }

    /// Fetches the next page from `source`, if there is one. Returns the number of rows added.
    pub async fn load_next<S>(&mut self, source: &mut S) -> Result<usize>
    where
        S: PageSource<T> + ?Sized,
    {
        match self.on_sentinel_visible() {
            Some(page) => self.fetch(source, page).await,
            None => Ok(0),
        }
    }

    /// Fetches the page that failed again. Returns the number of rows added.
    pub async fn retry_with<S>(&mut self, source: &mut S) -> Result<usize>
    where
        S: PageSource<T> + ?Sized,
    {
        match self.retry() {
            Some(page) => self.fetch(source, page).await,
            None => Ok(0),
        }
    }

    /// Fetches pages until there are no more, stopping at the first error. Fails if a page
    /// handed out by `on_sentinel_visible` or `retry` has not been finished yet.
    pub async fn load_all<S>(&mut self, source: &mut S) -> Result<&[T]>
    where
        S: PageSource<T> + ?Sized,
    {
        ensure!(
            !self.is_loading(),
            "Page {} is still loading",
            self.loaded_page + 1
        );
        while self.has_next_page() {
            self.load_next(source).await?;
        }
        Ok(&self.rows)
    }

    async fn fetch<S>(&mut self, source: &mut S, page: u32) -> Result<usize>
    where
        S: PageSource<T> + ?Sized,
    {
        match source.fetch_page(page, self.page_size).await {
            Ok(p) => {
                let count = p.rows().len();
                self.finish(Ok(p));
                Ok(count)
            }
            Err(e) => {
                self.finish(Err(format!("{e:#}")));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::collections::HashSet;

    /// Serves the numbers `1..=total`, failing once for each page listed in `fail_once`.
    struct Numbers {
        total: u32,
        fail_once: HashSet<u32>,
        requested: Vec<u32>,
    }

    impl Numbers {
        fn new(total: u32) -> Self {
            Self {
                total,
                fail_once: HashSet::new(),
                requested: Vec::new(),
            }
        }
    }

    #[async_trait::async_trait]
    impl PageSource<u32> for Numbers {
        async fn fetch_page(&mut self, page: u32, page_size: u32) -> Result<Page<u32>> {
            self.requested.push(page);
            if self.fail_once.remove(&page) {
                bail!("GET /numbers failed with status 500: boom");
            }
            let start = (page - 1) * page_size + 1;
            let end = (page * page_size).min(self.total);
            Ok(Page::new(
                (start..=end).collect(),
                page,
                page_size,
                u64::from(self.total),
            ))
        }
    }

    #[test]
    fn test_page_has_next() {
        assert!(Page::new(vec![1, 2], 1, 2, 3).has_next());
        assert!(!Page::new(vec![3], 2, 2, 3).has_next());
        assert!(!Page::new(Vec::<u32>::new(), 1, 10, 0).has_next());
    }

    #[tokio::test]
    async fn test_load_appends_until_last_page() {
        let mut source = Numbers::new(7);
        let mut loader = PageLoader::new(3);
        assert_eq!(loader.load_next(&mut source).await.unwrap(), 3);
        assert!(loader.has_next_page());
        assert_eq!(loader.load_all(&mut source).await.unwrap(), &[1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(source.requested, vec![1, 2, 3]);
        assert!(!loader.has_next_page());
        assert_eq!(loader.on_sentinel_visible(), None);
        assert_eq!(loader.total(), Some(7));
    }

    #[tokio::test]
    async fn test_failed_fetch_stops_and_retries_same_page() {
        let mut source = Numbers::new(10);
        source.fail_once.insert(2);
        let mut loader = PageLoader::new(4);
        loader.load_next(&mut source).await.unwrap();

        let err = loader.load_next(&mut source).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert!(!loader.has_next_page());
        assert_eq!(loader.error(), Some("GET /numbers failed with status 500: boom"));
        // No automatic fetch while failed.
        assert_eq!(loader.on_sentinel_visible(), None);
        assert_eq!(loader.load_next(&mut source).await.unwrap(), 0);
        assert_eq!(loader.rows(), &[1, 2, 3, 4]);

        assert_eq!(loader.retry_with(&mut source).await.unwrap(), 4);
        assert_eq!(source.requested, vec![1, 2, 2]);
        assert!(loader.error().is_none());
        assert!(loader.has_next_page());
        assert_eq!(loader.rows().len(), 8);
    }

    #[test]
    fn test_sentinel_while_loading() {
        let mut loader: PageLoader<u32> = PageLoader::new(5);
        assert_eq!(loader.on_sentinel_visible(), Some(1));
        assert!(loader.is_loading());
        assert_eq!(loader.on_sentinel_visible(), None);
        loader.finish(Ok(Page::new(vec![1, 2, 3, 4, 5], 1, 5, 12)));
        assert_eq!(loader.on_sentinel_visible(), Some(2));
    }

    #[tokio::test]
    async fn test_load_all_refuses_while_page_outstanding() {
        let mut source = Numbers::new(3);
        let mut loader = PageLoader::new(2);
        assert_eq!(loader.on_sentinel_visible(), Some(1));
        let err = loader.load_all(&mut source).await.unwrap_err();
        assert_eq!(err.to_string(), "Page 1 is still loading");
        assert!(source.requested.is_empty());

        loader.finish(Ok(Page::new(vec![1, 2], 1, 2, 3)));
        assert_eq!(loader.load_all(&mut source).await.unwrap(), &[1, 2, 3]);
        assert_eq!(source.requested, vec![2]);
    }

    #[test]
    fn test_retry_without_failure() {
        let mut loader: PageLoader<u32> = PageLoader::new(5);
        assert_eq!(loader.retry(), None);
        assert_eq!(loader.on_sentinel_visible(), Some(1));
        loader.finish(Err("timed out".into()));
        assert_eq!(loader.retry(), Some(1));
    }

    #[test]
    fn test_reset_replaces_results() {
        let mut loader: PageLoader<u32> = PageLoader::new(2);
        loader.on_sentinel_visible();
        loader.finish(Ok(Page::new(vec![1, 2], 1, 2, 2)));
        assert!(!loader.has_next_page());
        loader.reset();
        assert!(loader.rows().is_empty());
        assert_eq!(loader.loaded_page(), 0);
        assert_eq!(loader.on_sentinel_visible(), Some(1));
    }

    #[test]
    fn test_late_page_is_dropped() {
        let mut loader: PageLoader<u32> = PageLoader::new(2);
        loader.finish(Ok(Page::new(vec![9], 1, 2, 1)));
        assert!(loader.rows().is_empty());
    }
}
