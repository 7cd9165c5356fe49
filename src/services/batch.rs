//! Bounded concurrent execution of independent jobs.
//!
//! Jobs share no state; a counting semaphore caps how many run at once.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::domain::errors::{DomainError, DomainResult};

/// Run `job` for every item with at most `concurrency` in flight.
///
/// Results are returned in input order. A failing or panicking job yields an
/// `Err` in its slot and does not affect the others.
pub async fn run_bounded<I, T, F, Fut>(
    items: Vec<I>,
    concurrency: usize,
    job: F,
) -> Vec<DomainResult<T>>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DomainResult<T>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let job = Arc::new(job);
    let mut handles = Vec::with_capacity(items.len());

    for item in items {
        let semaphore = Arc::clone(&semaphore);
        let job = Arc::clone(&job);
        handles.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| DomainError::ValidationFailed("batch semaphore closed".to_string()))?;
            job(item).await
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await.unwrap_or_else(|e| {
            Err(DomainError::ValidationFailed(format!("batch job failed to complete: {e}")))
        }));
    }
    results
}
