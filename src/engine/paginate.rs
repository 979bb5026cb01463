//! # Paginator
//!
//! Lists a paginated vendor collection.
//!
//! Page 1 is fetched inline to learn the total count. The remaining pages are
//! fanned out to a [`WorkerPool`], each task returning its page index with the
//! result so every page lands in its own pre-allocated slot. Slots are
//! concatenated in page order, so the returned sequence is
//! `page 1 ∥ page 2 ∥ … ∥ page n` regardless of completion order.
//!
//! A failing page does not discard the others: [`ListOutcome`] carries the
//! assembled partial result together with the first observed error, and the
//! caller decides whether partial results are acceptable.

use std::future::Future;
use tracing::{debug, warn};

use super::context::OperationContext;
use super::error::{ProviderError, ProviderResult};
use super::pool::WorkerPool;
use crate::constants::{DEFAULT_MAX_CONCURRENCY, DEFAULT_PAGE_SIZE, MAX_LIST_PAGES};

/// One page of a vendor list response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Size of the whole collection as reported by the remote
    pub total_count: u64,
}

/// Parameters of a single page fetch; `page_num` is 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page_num: u32,
    pub page_size: u32,
}

/// Result of a [`Paginator::list`] run
#[derive(Debug)]
pub struct ListOutcome<T> {
    /// Items of every page that succeeded, in page order
    pub items: Vec<T>,
    /// First error observed, if any page failed
    pub error: Option<ProviderError>,
    /// Number of page fetches performed, including page 1
    pub pages_fetched: usize,
    /// Number of fetches dispatched to the worker pool
    pub pool_submissions: usize,
}

impl<T> ListOutcome<T> {
    /// Treat a partial result as a failure
    ///
    /// # Errors
    /// Returns the first page error, if any.
    pub fn into_result(self) -> ProviderResult<Vec<T>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.items),
        }
    }
}

/// Page size and fan-out settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page_size: u32,
    max_concurrency: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, DEFAULT_MAX_CONCURRENCY)
    }
}

impl Paginator {
    /// Both values are raised to at least one
    #[must_use]
    pub fn new(page_size: u32, max_concurrency: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            max_concurrency: max_concurrency.max(1),
        }
    }

    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Pages left after page 1 for a collection of `total_count` items
    #[must_use]
    pub fn remaining_pages(&self, total_count: u64) -> u32 {
        let pages = total_count.div_ceil(u64::from(self.page_size));
        u32::try_from(pages.saturating_sub(1)).unwrap_or(u32::MAX)
    }

    fn request(&self, page_num: u32) -> PageRequest {
        PageRequest {
            page_num,
            page_size: self.page_size,
        }
    }

    /// Fetch every page of a collection
    ///
    /// Cancellation while pages are in flight aborts the remaining fetches and is
    /// reported through [`ListOutcome::error`].
    pub async fn list<T, F, Fut>(&self, ctx: &OperationContext, fetch: F) -> ListOutcome<T>
    where
        T: Send + 'static,
        F: Fn(PageRequest) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = ProviderResult<Page<T>>> + Send + 'static,
    {
        let first = match fetch(self.request(1)).await {
            Ok(page) => page,
            Err(err) => {
                return ListOutcome {
                    items: Vec::new(),
                    error: Some(err),
                    pages_fetched: 1,
                    pool_submissions: 0,
                };
            }
        };

        let remaining = self.remaining_pages(first.total_count);
        debug!(
            total_count = first.total_count,
            page_size = self.page_size,
            remaining,
            "fetched first page"
        );

        let mut items = first.items;
        if remaining > MAX_LIST_PAGES {
            return ListOutcome {
                items,
                error: Some(ProviderError::Permanent(format!(
                    "reported total count {} needs {remaining} more pages, above the limit of {MAX_LIST_PAGES}",
                    first.total_count
                ))),
                pages_fetched: 1,
                pool_submissions: 0,
            };
        }
        if remaining == 0 {
            return ListOutcome {
                items,
                error: None,
                pages_fetched: 1,
                pool_submissions: 0,
            };
        }

        let mut slots: Vec<Option<ProviderResult<Vec<T>>>> = (0..remaining).map(|_| None).collect();
        let mut error = None;
        let mut pool = WorkerPool::new(self.max_concurrency);

        for index in 0..remaining {
            let fetch = fetch.clone();
            let request = self.request(index + 2);
            let submitted = pool
                .run(ctx.cancellation(), async move {
                    (index, fetch(request).await.map(|page| page.items))
                })
                .await;
            if let Err(err) = submitted {
                error = Some(err);
                break;
            }
        }

        let pool_submissions = pool.submitted();
        let joined = pool.wait(ctx.cancellation()).await;
        for (index, result) in joined.outputs {
            if let Some(slot) = usize::try_from(index).ok().and_then(|i| slots.get_mut(i)) {
                *slot = Some(result);
            }
        }
        if let Some(err) = joined.error {
            error.get_or_insert(err);
        }

        for (index, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(Ok(page_items)) => items.extend(page_items),
                Some(Err(err)) => {
                    warn!(page = index + 2, code = err.code(), "page fetch failed: {}", err);
                    error.get_or_insert(err);
                }
                None => {}
            }
        }

        ListOutcome {
            items,
            error,
            pages_fetched: pool_submissions + 1,
            pool_submissions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// A stable remote collection of `size` numbered items
    fn remote(
        size: u64,
        calls: Arc<AtomicUsize>,
    ) -> impl Fn(PageRequest) -> std::pin::Pin<Box<dyn Future<Output = ProviderResult<Page<u64>>> + Send>>
           + Clone
           + Send
           + Sync
           + 'static {
        move |request: PageRequest| {
            calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                // Later pages answer faster so completion order differs from page order
                let delay = 50u64.saturating_sub(u64::from(request.page_num) * 10);
                tokio::time::sleep(Duration::from_millis(delay)).await;
                let start = u64::from(request.page_num - 1) * u64::from(request.page_size);
                let end = (start + u64::from(request.page_size)).min(size);
                Ok(Page {
                    items: (start..end).collect(),
                    total_count: size,
                })
            })
        }
    }

    #[test]
    fn test_remaining_pages() {
        let paginator = Paginator::new(100, 50);
        assert_eq!(paginator.remaining_pages(0), 0);
        assert_eq!(paginator.remaining_pages(37), 0);
        assert_eq!(paginator.remaining_pages(100), 0);
        assert_eq!(paginator.remaining_pages(101), 1);
        assert_eq!(paginator.remaining_pages(250), 2);
    }

    #[tokio::test]
    async fn test_single_page_uses_no_workers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let outcome = Paginator::default()
            .list(&OperationContext::default(), remote(37, Arc::clone(&calls)))
            .await;

        assert!(outcome.error.is_none());
        assert_eq!(outcome.items.len(), 37);
        assert_eq!(outcome.pool_submissions, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_multi_page_preserves_page_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let outcome = Paginator::default()
            .list(&OperationContext::default(), remote(250, Arc::clone(&calls)))
            .await;

        assert!(outcome.error.is_none());
        assert_eq!(outcome.pool_submissions, 2);
        assert_eq!(outcome.pages_fetched, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.items, (0..250).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_many_pages_with_small_pool() {
        let calls = Arc::new(AtomicUsize::new(0));
        let outcome = Paginator::new(10, 3)
            .list(&OperationContext::default(), remote(1000, Arc::clone(&calls)))
            .await;

        assert_eq!(outcome.items.len(), 1000);
        assert_eq!(&outcome.items[..10], &(0..10).collect::<Vec<_>>()[..]);
        assert_eq!(calls.load(Ordering::SeqCst), 100);
    }

    #[tokio::test]
    async fn test_failed_page_keeps_partial_result_and_first_error() {
        let fetch = |request: PageRequest| async move {
            if request.page_num == 2 {
                return Err(ProviderError::vendor("INVALID_PARAMETER", "page 2 rejected"));
            }
            let start = u64::from(request.page_num - 1) * u64::from(request.page_size);
            Ok(Page {
                items: (start..start + u64::from(request.page_size)).collect::<Vec<u64>>(),
                total_count: 30,
            })
        };

        let outcome = Paginator::new(10, 50)
            .list(&OperationContext::default(), fetch)
            .await;

        let items: Vec<u64> = (0..10).chain(20..30).collect();
        assert_eq!(outcome.items, items);
        assert_eq!(outcome.error.as_ref().map(ProviderError::code), Some("INVALID_PARAMETER"));
        assert!(outcome.into_result().is_err());
    }

    #[tokio::test]
    async fn test_first_page_failure_returns_empty() {
        let fetch = |_request: PageRequest| async move {
            Err::<Page<u64>, _>(ProviderError::vendor("AUTH_FAILED", "bad signature"))
        };
        let outcome = Paginator::default()
            .list(&OperationContext::default(), fetch)
            .await;
        assert!(outcome.items.is_empty());
        assert_eq!(outcome.error.map(|e| e.code().to_string()), Some("AUTH_FAILED".to_string()));
    }

    #[tokio::test]
    async fn test_implausible_total_count_is_rejected() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let fetch = move |_request: PageRequest| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                Ok::<_, ProviderError>(Page {
                    items: vec![0u64],
                    total_count: u64::MAX,
                })
            }
        };

        let outcome = Paginator::new(1, 50)
            .list(&OperationContext::default(), fetch)
            .await;

        assert_eq!(outcome.items, vec![0]);
        assert_eq!(outcome.error.as_ref().map(ProviderError::code), Some("PERMANENT"));
        assert_eq!(outcome.pool_submissions, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_page_keeps_completed_pages() {
        let fetch = |request: PageRequest| async move {
            assert_ne!(request.page_num, 3, "page 3 worker crashed");
            let start = u64::from(request.page_num - 1) * u64::from(request.page_size);
            Ok::<_, ProviderError>(Page {
                items: (start..start + u64::from(request.page_size)).collect::<Vec<u64>>(),
                total_count: 40,
            })
        };

        let outcome = Paginator::new(10, 50)
            .list(&OperationContext::default(), fetch)
            .await;

        let items: Vec<u64> = (0..20).chain(30..40).collect();
        assert_eq!(outcome.items, items);
        assert_eq!(outcome.error.as_ref().map(ProviderError::code), Some("INTERNAL"));
    }
}
