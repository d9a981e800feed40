//! Turns one transport outcome into a failure or a payload to normalize.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use voidcheck_core::{Indicator, SchemaVersion};

use crate::schema::SchemaDescriptor;
use crate::transport::TransportOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Connection error, timeout, or unreadable response.
    Transport,
    /// HTTP 200 carrying an explicit `error` field.
    ApiError,
    /// Any other status, an unusable body, or `success: false`.
    Unexpected,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Transport => write!(f, "transport error"),
            FailureKind::ApiError => write!(f, "API error"),
            FailureKind::Unexpected => write!(f, "unexpected response"),
        }
    }
}

/// A terminal per-indicator error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub indicator: Indicator,
    pub kind: FailureKind,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// A successful response body with the schema that reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    pub body: Value,
    pub schema: &'static SchemaDescriptor,
    /// Raw quota header, kept only for schemas that read it.
    pub quota: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassifiedResult {
    Failure(Failure),
    Success { indicator: Indicator, payload: Payload },
}

impl ClassifiedResult {
    pub fn is_failure(&self) -> bool {
        matches!(self, ClassifiedResult::Failure(_))
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    schema: SchemaVersion,
    quota_header: String,
}

impl Classifier {
    pub fn new(schema: SchemaVersion, quota_header: impl Into<String>) -> Self {
        Self {
            schema,
            quota_header: quota_header.into(),
        }
    }

    pub fn classify(&self, outcome: TransportOutcome) -> ClassifiedResult {
        let indicator = outcome.indicator;

        let raw = match outcome.result {
            Ok(raw) => raw,
            Err(e) => {
                return self.fail(indicator, FailureKind::Transport, e.to_string(), None);
            }
        };

        if raw.status != 200 {
            return self.fail(
                indicator,
                FailureKind::Unexpected,
                format!("unexpected HTTP status {}", raw.status),
                Some(raw.status),
            );
        }

        let quota = raw.header(&self.quota_header).map(str::to_string);

        let body = match raw.body {
            Some(body) if body.is_object() => body,
            _ => {
                return self.fail(
                    indicator,
                    FailureKind::Unexpected,
                    "HTTP 200 without a usable JSON body".to_string(),
                    Some(200),
                );
            }
        };

        if let Some(detail) = api_error(&body) {
            return self.fail(indicator, FailureKind::ApiError, detail, Some(200));
        }

        let schema = SchemaDescriptor::for_response(self.schema, &body, quota.is_some());

        if schema.success(&body) == Some(false) {
            return self.fail(
                indicator,
                FailureKind::Unexpected,
                "HTTP 200 with success=false".to_string(),
                Some(200),
            );
        }

        tracing::debug!(
            indicator = %indicator.value,
            schema = %schema.version,
            "lookup succeeded"
        );

        ClassifiedResult::Success {
            indicator,
            payload: Payload {
                body,
                schema,
                quota: quota.filter(|_| schema.quota_header),
            },
        }
    }

    fn fail(
        &self,
        indicator: Indicator,
        kind: FailureKind,
        detail: String,
        status: Option<u16>,
    ) -> ClassifiedResult {
        tracing::warn!(
            indicator = %indicator.value,
            %kind,
            detail = %detail,
            "lookup failed"
        );
        ClassifiedResult::Failure(Failure {
            indicator,
            kind,
            detail,
            status,
        })
    }
}

/// Text of a non-empty top-level `error` field.
fn api_error(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
