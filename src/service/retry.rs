use crate::db::ledger::Transactional;
use crate::error::{BankError, IsRetryable};
use backon::{ExponentialBuilder, Retryable};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Bound on how often a conflicting unit of work is re-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; `0` disables retrying.
    pub max_retries: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 10,
            min_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries)
            .with_jitter()
    }
}

/// Run `unit_of_work` inside a transaction on `store`, committing on success.
///
/// Each attempt starts a fresh transaction and calls `unit_of_work` again, so
/// anything it read in a failed attempt is read again. Only conflicts are
/// retried; every other error is returned after rolling back.
pub async fn execute_tx<S, T, F>(
    store: &S,
    policy: &RetryPolicy,
    unit_of_work: F,
) -> Result<T, BankError>
where
    S: Transactional,
    F: for<'t> Fn(&'t mut S::Tx) -> BoxFuture<'t, Result<T, BankError>>,
{
    let attempts = AtomicUsize::new(0);

    let result = (|| {
        let n = attempts.fetch_add(1, Ordering::Relaxed) + 1;
        run_attempt(store, &unit_of_work, n)
    })
    .retry(policy.backoff())
    .when(|e: &BankError| e.is_retryable())
    .notify(|err, dur: Duration| {
        warn!(
            "transaction retrying after conflict {}, sleeping {:?}",
            err, dur
        );
    })
    .await;

    let attempts = attempts.load(Ordering::Relaxed);
    match &result {
        Ok(_) => debug!(attempts, "transaction committed"),
        Err(e) if e.is_retryable() => warn!(attempts, error = %e, "transaction gave up"),
        Err(_) => {}
    }
    result
}

/// One transaction: begin, run, then commit or roll back.
async fn run_attempt<S, T, F>(store: &S, unit_of_work: &F, attempt: usize) -> Result<T, BankError>
where
    S: Transactional,
    F: for<'t> Fn(&'t mut S::Tx) -> BoxFuture<'t, Result<T, BankError>>,
{
    debug!(attempt, "beginning transaction");
    let mut tx = store.begin().await?;
    match unit_of_work(&mut tx).await {
        Ok(value) => {
            store.commit(tx).await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = store.rollback(tx).await {
                warn!(attempt, error = %rollback_err, "rollback failed");
            }
            Err(e)
        }
    }
}
