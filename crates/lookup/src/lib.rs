//! Bounded-concurrency reputation lookups for IPv4 and domain indicators.
//!
//! This crate provides:
//! - `filter` deciding which indicators are looked up at all
//! - `RequestBuilder` mapping an indicator onto the upstream endpoint
//! - `Transport` trait with a `reqwest`-backed `HttpTransport`
//! - `Executor` running requests under a shared concurrency limit
//! - `Classifier` and `Normalizer` turning raw responses into tagged results
//!   across every known response schema
//! - `Aggregator` and `LookupPipeline` tying one batch together

pub mod aggregate;
pub mod classify;
pub mod error;
pub mod executor;
pub mod filter;
pub mod normalize;
pub mod pipeline;
pub mod quota;
pub mod request;
pub mod schema;
pub mod tags;
pub mod transport;

pub use aggregate::{Aggregator, BatchEntry, LookupResult};
pub use classify::{ClassifiedResult, Classifier, Failure, FailureKind, Payload};
pub use error::LookupError;
pub use executor::Executor;
pub use filter::{filter, Eligibility, SkipReason};
pub use normalize::{DetectionRatio, EngineVerdict, NormalizedResult, Normalizer, RiskScore};
pub use pipeline::LookupPipeline;
pub use quota::{parse_quota, QuotaValue};
pub use request::{HttpMethod, LookupRequest, RequestBuilder};
pub use schema::SchemaDescriptor;
pub use transport::{
    HttpTransport, RawResponse, Transport, TransportError, TransportOptions, TransportOutcome,
};
