//! Merges per-indicator outcomes into the batch result.

use serde::Serialize;

use voidcheck_core::{FailurePolicy, Indicator};

use crate::classify::Failure;
use crate::error::LookupError;
use crate::normalize::NormalizedResult;

/// Per-indicator state once classification and normalization are done.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEntry {
    /// Never looked up (filtered out before any request).
    Skipped(Indicator),
    /// Looked up; `None` when suppressed by blocklisted-only.
    Enriched(Indicator, Option<NormalizedResult>),
    Failed(Failure),
}

/// One output row. `data: null` means no enrichment was produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupResult {
    pub indicator: Indicator,
    pub data: Option<NormalizedResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Failure>,
}

#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    policy: FailurePolicy,
}

impl Aggregator {
    pub fn new(policy: FailurePolicy) -> Self {
        Self { policy }
    }

    /// Build the output list, one row per entry in entry order.
    ///
    /// Under [`FailurePolicy::FailBatch`] the first failure (in entry order)
    /// becomes a [`LookupError::Batch`] and nothing else is returned.
    pub fn aggregate(&self, entries: Vec<BatchEntry>) -> Result<Vec<LookupResult>, LookupError> {
        if self.policy == FailurePolicy::FailBatch {
            if let Some(failure) = entries.iter().find_map(|entry| match entry {
                BatchEntry::Failed(f) => Some(f),
                _ => None,
            }) {
                tracing::error!(
                    indicator = %failure.indicator.value,
                    kind = %failure.kind,
                    detail = %failure.detail,
                    "lookup batch failed"
                );
                return Err(LookupError::Batch {
                    indicator: failure.indicator.value.clone(),
                    kind: failure.kind,
                    detail: failure.detail.clone(),
                });
            }
        }

        Ok(entries
            .into_iter()
            .map(|entry| match entry {
                BatchEntry::Skipped(indicator) => LookupResult {
                    indicator,
                    data: None,
                    error: None,
                },
                BatchEntry::Enriched(indicator, data) => LookupResult {
                    indicator,
                    data,
                    error: None,
                },
                BatchEntry::Failed(failure) => LookupResult {
                    indicator: failure.indicator.clone(),
                    data: None,
                    error: Some(failure),
                },
            })
            .collect())
    }
}
