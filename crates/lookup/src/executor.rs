//! Runs built requests under a shared concurrency limit.

use std::sync::Arc;

use futures::future::try_join_all;
use tokio::sync::Semaphore;

use voidcheck_core::DEFAULT_CONCURRENCY;

use crate::error::LookupError;
use crate::request::LookupRequest;
use crate::transport::{Transport, TransportOutcome};

/// Fans requests out to the transport, at most `limit` in flight at once.
///
/// The semaphore is the only state shared between requests, and between
/// batches run on the same executor.
pub struct Executor {
    transport: Arc<dyn Transport>,
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl Executor {
    pub fn new(transport: Arc<dyn Transport>, limit: usize) -> Self {
        let limit = match limit {
            0 => DEFAULT_CONCURRENCY,
            n => n.min(Semaphore::MAX_PERMITS),
        };
        Self {
            transport,
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Close the limiter. Running and future batches fail with
    /// [`LookupError::LimiterClosed`] instead of returning partial results.
    pub fn close(&self) {
        self.semaphore.close();
    }

    /// Issue every request and return one outcome per request, in request order.
    ///
    /// Transport failures are recorded in the outcome. Only a failure of the
    /// limiter or of a request task itself fails the batch.
    pub async fn execute(
        &self,
        requests: Vec<LookupRequest>,
    ) -> Result<Vec<TransportOutcome>, LookupError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(
            requests = requests.len(),
            limit = self.limit,
            transport = self.transport.transport_name(),
            "executing lookups"
        );

        let handles = requests.into_iter().map(|request| {
            let transport = Arc::clone(&self.transport);
            let sem = Arc::clone(&self.semaphore);

            tokio::spawn(async move {
                let _permit = sem
                    .acquire_owned()
                    .await
                    .map_err(|_| LookupError::LimiterClosed)?;
                let result = transport.send(&request).await;
                if let Err(ref e) = result {
                    tracing::warn!(
                        indicator = %request.indicator.value,
                        error = %e,
                        "lookup request failed"
                    );
                }
                Ok::<_, LookupError>(TransportOutcome {
                    indicator: request.indicator,
                    result,
                })
            })
        });

        let joined = try_join_all(handles)
            .await
            .map_err(|e| LookupError::TaskFailed(e.to_string()))?;

        joined.into_iter().collect()
    }
}
