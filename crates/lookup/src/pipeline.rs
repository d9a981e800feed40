//! One batch: filter, build, execute, classify, normalize, aggregate.

use std::sync::Arc;

use voidcheck_core::{Config, Indicator};

use crate::aggregate::{Aggregator, BatchEntry, LookupResult};
use crate::classify::{ClassifiedResult, Classifier};
use crate::error::LookupError;
use crate::executor::Executor;
use crate::filter::{filter, Eligibility};
use crate::normalize::Normalizer;
use crate::request::RequestBuilder;
use crate::transport::{HttpTransport, Transport, TransportOptions};

/// Everything a batch needs, built once from config and read-only afterwards.
pub struct LookupPipeline {
    builder: RequestBuilder,
    executor: Executor,
    classifier: Classifier,
    normalizer: Normalizer,
    aggregator: Aggregator,
}

impl LookupPipeline {
    /// Build a pipeline over any transport. Invalid config is rejected here,
    /// before a single request can be issued.
    pub fn new(config: &Config, transport: Arc<dyn Transport>) -> Result<Self, LookupError> {
        config.validate()?;

        Ok(Self {
            builder: RequestBuilder::new(&config.api),
            executor: Executor::new(transport, config.lookup.concurrency),
            classifier: Classifier::new(config.api.schema, config.api.quota_header.clone()),
            normalizer: Normalizer::new(config.lookup.blocklisted_only),
            aggregator: Aggregator::new(config.lookup.failure_policy),
        })
    }

    /// Build a pipeline over HTTPS.
    pub fn from_config(config: &Config, options: &TransportOptions) -> Result<Self, LookupError> {
        config.validate()?;
        let transport = HttpTransport::new(options)?;
        Self::new(config, Arc::new(transport))
    }

    /// Look up a batch. Returns one row per input indicator, in input order,
    /// or a single batch-level error.
    pub async fn lookup(&self, indicators: &[Indicator]) -> Result<Vec<LookupResult>, LookupError> {
        let mut entries: Vec<Option<BatchEntry>> = vec![None; indicators.len()];
        let mut slots = Vec::new();
        let mut requests = Vec::new();

        for (slot, indicator) in indicators.iter().enumerate() {
            let request = match filter(indicator) {
                Eligibility::Eligible => self.builder.build(indicator),
                Eligibility::Skip(reason) => {
                    tracing::trace!(indicator = %indicator.value, ?reason, "indicator skipped");
                    None
                }
            };
            match request {
                Some(request) => {
                    slots.push(slot);
                    requests.push(request);
                }
                None => entries[slot] = Some(BatchEntry::Skipped(indicator.clone())),
            }
        }

        tracing::info!(
            indicators = indicators.len(),
            requests = requests.len(),
            "lookup batch started"
        );

        let outcomes = self.executor.execute(requests).await?;

        for (slot, outcome) in slots.into_iter().zip(outcomes) {
            let entry = match self.classifier.classify(outcome) {
                ClassifiedResult::Failure(failure) => BatchEntry::Failed(failure),
                ClassifiedResult::Success { indicator, payload } => {
                    let data = self.normalizer.normalize(&indicator, &payload);
                    BatchEntry::Enriched(indicator, data)
                }
            };
            entries[slot] = Some(entry);
        }

        let results = self
            .aggregator
            .aggregate(entries.into_iter().flatten().collect())?;

        tracing::info!(
            results = results.len(),
            enriched = results.iter().filter(|r| r.data.is_some()).count(),
            "lookup batch finished"
        );

        Ok(results)
    }
}
