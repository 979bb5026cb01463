//! # Bounded Worker Pool
//!
//! A collection of tokio tasks gated by a counting semaphore.
//!
//! [`WorkerPool::run`] waits for a permit before spawning, so submitters block
//! while the pool is saturated. The permit moves into the spawned task and is
//! released when the task finishes, panics or is aborted. [`WorkerPool::wait`]
//! is the completion counter: it resolves once every submitted task has
//! finished.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::error::ProviderError;
use crate::constants::DEFAULT_MAX_CONCURRENCY;

/// Tasks running in parallel up to a fixed capacity
#[derive(Debug)]
pub struct WorkerPool<T> {
    semaphore: Arc<Semaphore>,
    tasks: JoinSet<T>,
    submitted: usize,
}

impl<T: Send + 'static> Default for WorkerPool<T> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENCY)
    }
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Create a pool allowing `capacity` tasks in flight (at least one)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity.max(1))),
            tasks: JoinSet::new(),
            submitted: 0,
        }
    }

    /// Number of tasks submitted so far
    #[must_use]
    pub fn submitted(&self) -> usize {
        self.submitted
    }

    /// Wait for a permit, then run `task` on its own tokio task
    ///
    /// # Errors
    /// Returns [`ProviderError::Cancelled`] if `cancel` fires while waiting for a permit.
    pub async fn run<F>(&mut self, cancel: &CancellationToken, task: F) -> Result<(), ProviderError>
    where
        F: Future<Output = T> + Send + 'static,
    {
        let permit = tokio::select! {
            () = cancel.cancelled() => return Err(ProviderError::Cancelled),
            permit = Arc::clone(&self.semaphore).acquire_owned() => permit
                .map_err(|_closed| ProviderError::Internal("worker pool semaphore closed".to_string()))?,
        };

        self.tasks.spawn(async move {
            let _permit = permit;
            task.await
        });
        self.submitted += 1;
        Ok(())
    }

    /// Wait for every submitted task and collect their outputs in completion order
    ///
    /// Outputs of tasks that finished are kept even when another task fails.
    /// [`Joined::error`] holds the first failure:
    /// - [`ProviderError::Cancelled`] if `cancel` fires; outstanding tasks are aborted
    /// - [`ProviderError::Internal`] if a task panicked; the others run to completion
    pub async fn wait(mut self, cancel: &CancellationToken) -> Joined<T> {
        let mut joined = Joined {
            outputs: Vec::with_capacity(self.tasks.len()),
            error: None,
        };
        loop {
            let next = tokio::select! {
                () = cancel.cancelled() => {
                    self.tasks.abort_all();
                    joined.error.get_or_insert(ProviderError::Cancelled);
                    return joined;
                }
                next = self.tasks.join_next() => next,
            };
            match next {
                Some(Ok(output)) => joined.outputs.push(output),
                Some(Err(err)) => {
                    joined
                        .error
                        .get_or_insert(ProviderError::Internal(format!("worker task failed: {err}")));
                }
                None => return joined,
            }
        }
    }
}

/// Outputs gathered by [`WorkerPool::wait`]
#[derive(Debug)]
pub struct Joined<T> {
    pub outputs: Vec<T>,
    pub error: Option<ProviderError>,
}

impl<T> Joined<T> {
    /// All outputs, or the first failure
    ///
    /// # Errors
    /// Returns [`Joined::error`] when set.
    pub fn into_result(self) -> Result<Vec<T>, ProviderError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.outputs),
        }
    }
}
