use thiserror::Error;

use voidcheck_core::VoidcheckError;

use crate::classify::FailureKind;

/// Batch-level errors. A `LookupError` means no results were returned.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Configuration error: {0}")]
    Config(#[from] VoidcheckError),

    #[error("HTTP client setup failed: {0}")]
    Client(String),

    #[error("Concurrency limiter closed")]
    LimiterClosed,

    #[error("Lookup task failed: {0}")]
    TaskFailed(String),

    #[error("Lookup for '{indicator}' failed ({kind}): {detail}")]
    Batch {
        indicator: String,
        kind: FailureKind,
        detail: String,
    },
}
