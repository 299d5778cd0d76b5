//! Response poller: bounded-time, fixed-interval polling of the response
//! store.
//!
//! There is no request/reply primitive between the command channel and the
//! response store, so "awaiting a reply" means asking the store for a
//! recent matching document until one shows up or the budget runs out.

use std::time::Duration;

use tokio::time::Instant;

use relayhub_domain::response::{MatchCriteria, ResponseDocument};
use relayhub_domain::time;

use crate::ports::ResponseStore;

/// Polls a [`ResponseStore`] for documents matching a [`MatchCriteria`].
pub struct ResponsePoller<S> {
    store: S,
}

impl<S: ResponseStore> ResponsePoller<S> {
    /// Create a poller backed by the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Wait up to `budget` for a document matching `criteria`.
    ///
    /// Each iteration issues one query for the most recent document
    /// inserted within `criteria.window` of the current time, so the window
    /// slides forward with every attempt. Between attempts the task sleeps
    /// for `criteria.interval`, yielding to the runtime.
    ///
    /// Returns `None` when the budget expires without a match; that is an
    /// expected outcome, not an error. Query failures are logged and count
    /// as a miss for that iteration. A query still pending when the budget
    /// runs out is dropped and the poll ends with `None`.
    #[tracing::instrument(
        skip(self, criteria),
        fields(key = criteria.key.value(), kind = %criteria.kind, sensor_index = ?criteria.sensor_index)
    )]
    pub async fn poll(&self, criteria: &MatchCriteria, budget: Duration) -> Option<ResponseDocument> {
        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            let since = criteria.since(time::now());
            let remaining = budget.saturating_sub(started.elapsed());
            match tokio::time::timeout(remaining, self.store.find_latest(criteria, since)).await {
                Ok(Ok(Some(document))) => {
                    tracing::debug!(attempts, elapsed_ms = elapsed_ms(started), "response found");
                    return Some(document);
                }
                Ok(Ok(None)) => {}
                Ok(Err(err)) => tracing::warn!(error = %err, attempts, "response query failed"),
                Err(_) => {
                    tracing::warn!(attempts, "response query outlived the budget");
                    return None;
                }
            }

            if started.elapsed() >= budget {
                tracing::debug!(attempts, "no response within budget");
                return None;
            }

            tokio::time::sleep(criteria.interval).await;
        }
    }
}

fn elapsed_ms(started: Instant) -> u128 {
    started.elapsed().as_millis()
}
