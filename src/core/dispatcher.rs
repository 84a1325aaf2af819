//! Bounded-parallel dispatch of row units
//!
//! ```text
//! rows ──► acquire permit ──► tokio::spawn(unit) ──► permit dropped when unit ends
//!              │ (blocks when N in flight)
//!              └─ cancelled ──► stop submitting; submitted units still run
//! all JoinHandles awaited ──► barrier released
//! ```
//!
//! # Thread Safety
//!
//! Units run on the shared tokio worker pool. The permit is moved into the
//! spawned task, so it is released when the task ends whether the unit
//! returned or panicked.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// What happened to the units handed to [`Dispatcher::dispatch`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Units spawned
    pub submitted: usize,
    /// Units that ran to completion
    pub completed: usize,
    /// Units whose task panicked or was aborted
    pub crashed: usize,
    /// Dispatch stopped before every item was submitted
    pub interrupted: bool,
}

/// Counting-semaphore dispatcher
#[derive(Debug, Clone)]
pub struct Dispatcher {
    permits: Arc<Semaphore>,
}

impl Dispatcher {
    /// Create a dispatcher allowing `max_concurrent` units in flight
    ///
    /// A zero limit is raised to one.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Run `work` for every item, at most N at a time, and wait for all of them
    ///
    /// # Arguments
    ///
    /// * `items` - Work items, submitted in order
    /// * `cancel` - Stops further submissions while waiting for a permit
    /// * `work` - Builds the unit of work for an item
    ///
    /// # Returns
    ///
    /// A [`DispatchReport`]; the barrier has been passed when this returns.
    pub async fn dispatch<T, F, Fut>(
        &self,
        items: Vec<T>,
        cancel: &CancellationToken,
        work: F,
    ) -> DispatchReport
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut report = DispatchReport::default();
        let mut handles = Vec::with_capacity(items.len());

        for item in items {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(submitted = report.submitted, "Dispatch interrupted, not submitting further rows");
                    report.interrupted = true;
                    break;
                }
                permit = Arc::clone(&self.permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        error!("Dispatch semaphore closed");
                        report.interrupted = true;
                        break;
                    }
                },
            };

            let unit = work(item);
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                unit.await
            }));
            report.submitted += 1;
        }

        for handle in handles {
            match handle.await {
                Ok(()) => report.completed += 1,
                Err(e) => {
                    error!(error = %e, "Dispatched unit crashed");
                    report.crashed += 1;
                }
            }
        }

        debug!(
            submitted = report.submitted,
            completed = report.completed,
            crashed = report.crashed,
            "Dispatch barrier passed"
        );
        report
    }
}
