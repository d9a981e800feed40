//! Field-path tables for every upstream response schema.
//!
//! The normalizer and request builder never branch on a version directly;
//! they read paths and endpoint templates from a [`SchemaDescriptor`].

use serde_json::Value;

use voidcheck_core::SchemaVersion;

use crate::request::{HttpMethod, ParamPlacement};

type Path = &'static [&'static str];

/// Where to find each piece of a reputation report for one schema version.
#[derive(Debug, PartialEq, Eq)]
pub struct SchemaDescriptor {
    pub version: SchemaVersion,

    // Request side.
    pub ip_endpoint: &'static str,
    pub domain_endpoint: &'static str,
    pub method: HttpMethod,
    pub placement: ParamPlacement,

    // Response side. `report_path` is relative to the body, the rest to the report.
    pub report_path: Path,
    pub success_flag: Option<Path>,
    pub risk_score: Path,
    pub detections: Path,
    pub engines_count: Path,
    pub engines: Path,
    pub anonymity: Path,
    pub category: Path,
    pub security_checks: Path,

    /// Top-level body counters folded into the quota map.
    pub body_quota_fields: &'static [&'static str],
    /// Whether the quota response header is read.
    pub quota_header: bool,
}

const FLAT_TABLE: SchemaDescriptor = SchemaDescriptor {
    version: SchemaVersion::Flat,
    ip_endpoint: "/v2/ip-reputation",
    domain_endpoint: "/v2/domain-reputation",
    method: HttpMethod::Post,
    placement: ParamPlacement::JsonBody,
    report_path: &[],
    success_flag: None,
    risk_score: &["risk_score", "result"],
    detections: &["blacklists", "detections"],
    engines_count: &["blacklists", "engines_count"],
    engines: &["blacklists", "engines"],
    anonymity: &["anonymity"],
    category: &["category"],
    security_checks: &["security_checks"],
    body_quota_fields: &[],
    quota_header: false,
};

pub static FLAT: SchemaDescriptor = FLAT_TABLE;

pub static ENVELOPE: SchemaDescriptor = SchemaDescriptor {
    version: SchemaVersion::Envelope,
    ip_endpoint: "/iprep/v1/pay-as-you-go/",
    domain_endpoint: "/domainbl/v1/pay-as-you-go/",
    method: HttpMethod::Get,
    placement: ParamPlacement::Query,
    report_path: &["data", "report"],
    success_flag: Some(&["success"]),
    risk_score: &["risk_score", "result"],
    detections: &["blacklists", "detections"],
    engines_count: &["blacklists", "engines_count"],
    engines: &["blacklists", "engines"],
    anonymity: &["anonymity"],
    category: &["category"],
    security_checks: &["security_checks"],
    body_quota_fields: &["credits_remained", "estimated_queries", "elapsed_time"],
    quota_header: false,
};

pub static FLAT_WITH_QUOTA: SchemaDescriptor = SchemaDescriptor {
    version: SchemaVersion::FlatWithQuota,
    quota_header: true,
    ..FLAT_TABLE
};

impl SchemaDescriptor {
    /// Descriptor used to build requests. `Auto` targets the current API.
    pub fn for_requests(version: SchemaVersion) -> &'static SchemaDescriptor {
        match version {
            SchemaVersion::Envelope => &ENVELOPE,
            SchemaVersion::FlatWithQuota => &FLAT_WITH_QUOTA,
            SchemaVersion::Flat | SchemaVersion::Auto => &FLAT,
        }
    }

    /// Descriptor used to read one response.
    ///
    /// Fixed versions are taken as configured. `Auto` picks `Envelope` when the
    /// body carries a `data.report` object, `FlatWithQuota` when the quota
    /// header was returned, and `Flat` otherwise.
    pub fn for_response(
        version: SchemaVersion,
        body: &Value,
        has_quota_header: bool,
    ) -> &'static SchemaDescriptor {
        match version {
            SchemaVersion::Auto => {
                if lookup(body, ENVELOPE.report_path).is_some_and(Value::is_object) {
                    &ENVELOPE
                } else if has_quota_header {
                    &FLAT_WITH_QUOTA
                } else {
                    &FLAT
                }
            }
            fixed => Self::for_requests(fixed),
        }
    }

    /// The report object inside `body`, or `None` if the envelope is missing.
    pub fn report<'a>(&self, body: &'a Value) -> Option<&'a Value> {
        lookup(body, self.report_path)
    }

    /// Explicit `success` flag, for schemas that declare one.
    pub fn success(&self, body: &Value) -> Option<bool> {
        self.success_flag
            .and_then(|path| lookup(body, path))
            .and_then(Value::as_bool)
    }
}

/// Follow `path` through nested objects. An empty path returns `value`.
pub fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(value, |current, key| current.get(key))
        .filter(|v| !v.is_null())
}
