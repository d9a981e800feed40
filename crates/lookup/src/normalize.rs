//! Schema-tolerant extraction of a uniform result from one payload.
//!
//! Every read goes through the payload's [`SchemaDescriptor`] and falls back
//! to a default when the path is missing, so a partial or oddly shaped body
//! still produces a result instead of an error.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Number, Value};

use voidcheck_core::Indicator;

use crate::classify::Payload;
use crate::quota::{parse_quota, QuotaValue};
use crate::schema::lookup;
use crate::tags::{flag_tags, ANONYMITY_FLAGS, CATEGORY_FLAGS, SECURITY_CHECK_FLAGS};

pub const RISK_SCORE_NOT_AVAILABLE: &str = "Not Available";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineVerdict {
    pub name: String,
    pub detected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DetectionRatio {
    pub detected: u64,
    pub total: u64,
}

/// Risk score as reported: a number when it reads as one, else the raw text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RiskScore {
    Number(Number),
    Text(String),
}

impl fmt::Display for RiskScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskScore::Number(n) => write!(f, "{n}"),
            RiskScore::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedResult {
    pub indicator: Indicator,
    pub summary_tags: Vec<String>,
    /// `None` only when the payload carries no score at all.
    pub risk_score: Option<RiskScore>,
    pub detection_ratio: DetectionRatio,
    pub category_tags: Vec<String>,
    pub anonymity_tags: Vec<String>,
    pub security_check_tags: Vec<String>,
    pub detected_engines: Vec<EngineVerdict>,
    pub clean_engines: Vec<EngineVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<BTreeMap<String, QuotaValue>>,
    /// The report object as returned, for detail views.
    pub report: Value,
}

impl NormalizedResult {
    pub fn risk_score_label(&self) -> String {
        self.risk_score
            .as_ref()
            .map(RiskScore::to_string)
            .unwrap_or_else(|| RISK_SCORE_NOT_AVAILABLE.to_string())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    blocklisted_only: bool,
}

impl Normalizer {
    pub fn new(blocklisted_only: bool) -> Self {
        Self { blocklisted_only }
    }

    /// Normalize one payload. `None` means the indicator is suppressed
    /// because it has no detections and blocklisted-only is set.
    pub fn normalize(&self, indicator: &Indicator, payload: &Payload) -> Option<NormalizedResult> {
        let schema = payload.schema;
        let report = schema.report(&payload.body).cloned().unwrap_or_else(|| {
            tracing::trace!(
                indicator = %indicator.value,
                schema = %schema.version,
                "report object missing, using defaults"
            );
            Value::Object(Default::default())
        });

        let (detected_engines, clean_engines) =
            partition_engines(&report, schema.engines, schema.engines_count);

        if self.blocklisted_only && detected_engines.is_empty() {
            tracing::debug!(
                indicator = %indicator.value,
                "no engine detections, suppressed by blocklisted-only"
            );
            return None;
        }

        let risk_score = lookup(&report, schema.risk_score).and_then(risk_score);
        let detection_ratio = DetectionRatio {
            detected: read_u64(&report, schema.detections),
            total: read_u64(&report, schema.engines_count),
        };

        let anonymity_tags = flag_tags(lookup(&report, schema.anonymity), ANONYMITY_FLAGS);
        let category_tags = flag_tags(lookup(&report, schema.category), CATEGORY_FLAGS);
        let security_check_tags =
            flag_tags(lookup(&report, schema.security_checks), SECURITY_CHECK_FLAGS);

        let quota = collect_quota(payload);

        let mut result = NormalizedResult {
            indicator: indicator.clone(),
            summary_tags: Vec::new(),
            risk_score,
            detection_ratio,
            category_tags,
            anonymity_tags,
            security_check_tags,
            detected_engines,
            clean_engines,
            quota,
            report,
        };

        let mut summary = vec![
            format!("Risk Score: {}", result.risk_score_label()),
            format!(
                "Detection Ratio: {} / {}",
                detection_ratio.detected, detection_ratio.total
            ),
        ];
        summary.extend(result.anonymity_tags.iter().cloned());
        summary.extend(result.category_tags.iter().cloned());
        summary.extend(result.security_check_tags.iter().cloned());
        result.summary_tags = summary;

        tracing::trace!(
            indicator = %indicator.value,
            detected = result.detected_engines.len(),
            clean = result.clean_engines.len(),
            "payload normalized"
        );

        Some(result)
    }
}

fn risk_score(value: &Value) -> Option<RiskScore> {
    match value {
        Value::Number(n) => Some(RiskScore::Number(n.clone())),
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(
            s.trim()
                .parse()
                .map(RiskScore::Number)
                .unwrap_or_else(|_| RiskScore::Text(s.clone())),
        ),
        Value::Bool(b) => Some(RiskScore::Text(b.to_string())),
        _ => None,
    }
}

fn read_u64(report: &Value, path: &[&str]) -> u64 {
    lookup(report, path)
        .and_then(|v| match v {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .unwrap_or(0)
}

/// Split engine verdicts into (detected, clean), keeping only slots below
/// `engines_count`. The container may be an array or an object keyed by
/// stringified index; other keys and malformed slots are skipped.
fn partition_engines(
    report: &Value,
    engines_path: &[&str],
    count_path: &[&str],
) -> (Vec<EngineVerdict>, Vec<EngineVerdict>) {
    let mut detected = Vec::new();
    let mut clean = Vec::new();

    let Some(engines) = lookup(report, engines_path) else {
        return (detected, clean);
    };
    let declared = read_u64(report, count_path);

    let slots: Vec<(u64, &Value)> = match engines {
        Value::Array(items) => (0..declared).zip(items).collect(),
        Value::Object(map) => {
            let mut slots: Vec<_> = map
                .iter()
                .filter_map(|(key, entry)| {
                    let index = key.parse::<u64>().ok().filter(|i| *i < declared);
                    if index.is_none() {
                        tracing::trace!(key = %key, "engine key skipped");
                    }
                    index.map(|i| (i, entry))
                })
                .collect();
            slots.sort_by_key(|(index, _)| *index);
            slots
        }
        _ => Vec::new(),
    };

    for (index, entry) in slots {
        let Some(verdict) = engine_verdict(entry) else {
            tracing::trace!(index, "engine entry is not an object, skipped");
            continue;
        };
        if verdict.detected {
            detected.push(verdict);
        } else {
            clean.push(verdict);
        }
    }

    (detected, clean)
}

fn engine_verdict(entry: &Value) -> Option<EngineVerdict> {
    if !entry.is_object() {
        return None;
    }
    let text = |key: &str| match entry.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    Some(EngineVerdict {
        name: text("name")
            .or_else(|| text("engine"))
            .unwrap_or_else(|| "unknown".to_string()),
        detected: entry.get("detected").and_then(Value::as_bool) == Some(true),
        reference: text("reference"),
        elapsed: text("elapsed"),
    })
}

fn collect_quota(payload: &Payload) -> Option<BTreeMap<String, QuotaValue>> {
    let mut quota = BTreeMap::new();

    for field in payload.schema.body_quota_fields {
        if let Some(value) = payload.body.get(*field).and_then(QuotaValue::from_json) {
            quota.insert(field.to_string(), value);
        }
    }
    if let Some(ref header) = payload.quota {
        quota.extend(parse_quota(header));
    }

    if quota.is_empty() {
        None
    } else {
        Some(quota)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use voidcheck_core::SchemaVersion;

    use crate::schema::{SchemaDescriptor, ENVELOPE, FLAT, FLAT_WITH_QUOTA};

    fn payload(body: Value, schema: &'static SchemaDescriptor) -> Payload {
        Payload {
            body,
            schema,
            quota: None,
        }
    }

    fn example_body() -> Value {
        json!({
            "risk_score": {"result": 50},
            "blacklists": {
                "detections": 2,
                "engines_count": 5,
                "engines": [
                    {"name": "A", "detected": true},
                    {"name": "B", "detected": false},
                    {"name": "C", "detected": true, "reference": "https://c.example"},
                    {"name": "D", "detected": false},
                    {"name": "E", "detected": false}
                ]
            },
            "security_checks": {"is_possible_typosquatting": true, "is_parked_domain": false}
        })
    }

    #[test]
    fn domain_scenario() {
        let indicator = Indicator::domain("example.com");
        let result = Normalizer::new(false)
            .normalize(&indicator, &payload(example_body(), &FLAT))
            .unwrap();

        assert_eq!(result.summary_tags[0], "Risk Score: 50");
        assert_eq!(result.summary_tags[1], "Detection Ratio: 2 / 5");
        assert!(result.summary_tags.contains(&"Possible Typosquatting".to_string()));
        assert_eq!(result.detection_ratio, DetectionRatio { detected: 2, total: 5 });
        assert_eq!(result.detected_engines.len(), 2);
        assert!(result.detected_engines.iter().all(|e| e.detected));
        assert_eq!(result.clean_engines.len(), 3);
        assert_eq!(
            result.detected_engines[1].reference.as_deref(),
            Some("https://c.example")
        );
        assert_eq!(result.security_check_tags, vec!["Possible Typosquatting"]);
        assert!(result.quota.is_none());
    }

    #[test]
    fn short_engine_list_skips_missing_slots() {
        let body = json!({
            "blacklists": {
                "detections": 2,
                "engines_count": 5,
                "engines": [
                    {"name": "A", "detected": true},
                    {"name": "B", "detected": false}
                ]
            }
        });
        let result = Normalizer::new(false)
            .normalize(&Indicator::domain("example.com"), &payload(body, &FLAT))
            .unwrap();

        assert_eq!(result.detected_engines.len(), 1);
        assert_eq!(result.clean_engines.len(), 1);
        assert_eq!(result.summary_tags[1], "Detection Ratio: 2 / 5");
    }

    #[test]
    fn null_engine_entries_are_skipped() {
        let body = json!({
            "blacklists": {
                "engines_count": 3,
                "engines": [null, {"name": "B", "detected": true}, 7]
            }
        });
        let result = Normalizer::new(true)
            .normalize(&Indicator::ipv4("1.1.1.1"), &payload(body, &FLAT))
            .unwrap();

        assert_eq!(result.detected_engines.len(), 1);
        assert!(result.clean_engines.is_empty());
    }

    #[test]
    fn empty_payload_still_has_summary_lines() {
        let result = Normalizer::new(false)
            .normalize(&Indicator::ipv4("1.1.1.1"), &payload(json!({}), &FLAT))
            .unwrap();

        assert_eq!(
            result.summary_tags,
            vec!["Risk Score: Not Available", "Detection Ratio: 0 / 0"]
        );
        assert!(result.risk_score.is_none());
        assert!(result.detected_engines.is_empty());
        assert!(result.anonymity_tags.is_empty());
    }

    #[test]
    fn blocklisted_only_suppresses_clean_indicators() {
        let body = json!({
            "risk_score": {"result": 0},
            "blacklists": {
                "detections": 0,
                "engines_count": 2,
                "engines": [{"name": "A", "detected": false}, {"name": "B", "detected": false}]
            }
        });
        let indicator = Indicator::ipv4("8.8.8.8");

        assert!(Normalizer::new(true)
            .normalize(&indicator, &payload(body.clone(), &FLAT))
            .is_none());

        let result = Normalizer::new(false)
            .normalize(&indicator, &payload(body, &FLAT))
            .unwrap();
        assert!(result.detected_engines.is_empty());
        assert_eq!(result.clean_engines.len(), 2);
    }

    #[test]
    fn normalize_is_idempotent() {
        let normalizer = Normalizer::new(false);
        let indicator = Indicator::domain("example.com");
        let payload = payload(example_body(), &FLAT);

        assert_eq!(
            normalizer.normalize(&indicator, &payload),
            normalizer.normalize(&indicator, &payload)
        );
    }

    #[test]
    fn envelope_schema_reads_nested_report() {
        let body = json!({
            "data": {
                "report": {
                    "ip": "185.220.101.1",
                    "risk_score": {"result": 100},
                    "blacklists": {
                        "detections": 1,
                        "engines_count": 2,
                        "engines": {
                            "0": {"engine": "Spamhaus", "detected": true, "elapsed": "0.12"},
                            "1": {"engine": "Barracuda", "detected": false}
                        }
                    },
                    "anonymity": {"is_tor": true, "is_proxy": false, "is_webproxy": true}
                }
            },
            "success": true,
            "credits_remained": 24.5,
            "estimated_queries": "306"
        });
        let result = Normalizer::new(true)
            .normalize(&Indicator::ipv4("185.220.101.1"), &payload(body, &ENVELOPE))
            .unwrap();

        assert_eq!(result.risk_score_label(), "100");
        assert_eq!(result.detected_engines[0].name, "Spamhaus");
        assert_eq!(result.detected_engines[0].elapsed.as_deref(), Some("0.12"));
        assert_eq!(result.clean_engines[0].name, "Barracuda");
        assert_eq!(result.anonymity_tags, vec!["Web Proxy", "Tor"]);
        assert_eq!(
            result.summary_tags,
            vec!["Risk Score: 100", "Detection Ratio: 1 / 2", "Web Proxy", "Tor"]
        );

        let quota = result.quota.unwrap();
        assert_eq!(quota["estimated_queries"], QuotaValue::Number(306.into()));
        assert!(matches!(quota["credits_remained"], QuotaValue::Number(_)));
        assert_eq!(result.report["ip"], json!("185.220.101.1"));
    }

    #[test]
    fn envelope_without_report_uses_defaults() {
        let body = json!({"data": {}, "success": true});
        let result = Normalizer::new(false)
            .normalize(&Indicator::ipv4("9.9.9.9"), &payload(body, &ENVELOPE))
            .unwrap();
        assert_eq!(result.summary_tags[0], "Risk Score: Not Available");
        assert_eq!(result.report, json!({}));
    }

    #[test]
    fn quota_schema_parses_header() {
        let mut p = payload(example_body(), &FLAT_WITH_QUOTA);
        p.quota = Some("limit=1000;used=42;exceeded=false;bad".into());
        let result = Normalizer::new(false)
            .normalize(&Indicator::domain("example.com"), &p)
            .unwrap();

        assert_eq!(p.schema.version, SchemaVersion::FlatWithQuota);
        let quota = result.quota.unwrap();
        assert_eq!(quota.len(), 3);
        assert_eq!(quota["limit"], QuotaValue::Number(1000.into()));
        assert_eq!(quota["used"], QuotaValue::Number(42.into()));
        assert_eq!(quota["exceeded"], QuotaValue::Bool(false));
    }

    #[test]
    fn string_scores_and_counts_are_accepted() {
        let body = json!({
            "risk_score": {"result": "75"},
            "blacklists": {"detections": "1", "engines_count": "1",
                           "engines": [{"name": "X", "detected": true}]}
        });
        let result = Normalizer::new(true)
            .normalize(&Indicator::domain("bad.example"), &payload(body, &FLAT))
            .unwrap();
        assert_eq!(result.summary_tags[0], "Risk Score: 75");
        assert_eq!(result.summary_tags[1], "Detection Ratio: 1 / 1");
    }

    #[test]
    fn category_tags_follow_vocabulary() {
        let body = json!({
            "blacklists": {"engines_count": 1, "engines": [{"name": "X", "detected": true}]},
            "category": {"is_free_hosting": true, "is_url_shortener": true, "is_new_thing": true}
        });
        let result = Normalizer::new(true)
            .normalize(&Indicator::domain("x.example"), &payload(body, &FLAT))
            .unwrap();
        assert_eq!(result.category_tags, vec!["Free Hosting", "URL Shortener"]);
    }

    #[test]
    fn non_index_engine_keys_do_not_walk_declared_count() {
        let body = json!({
            "blacklists": {
                "engines_count": 2_000_000_000u64,
                "engines": {
                    "spamhaus": {"name": "Spamhaus", "detected": true},
                    "1": {"name": "SURBL", "detected": true},
                    "0": {"name": "Barracuda", "detected": false}
                }
            }
        });
        let started = std::time::Instant::now();
        let result = Normalizer::new(false)
            .normalize(&Indicator::ipv4("45.9.148.1"), &payload(body, &FLAT))
            .unwrap();

        assert!(started.elapsed() < std::time::Duration::from_secs(1));
        assert_eq!(result.detected_engines.len(), 1);
        assert_eq!(result.detected_engines[0].name, "SURBL");
        assert_eq!(result.clean_engines[0].name, "Barracuda");
    }

    #[test]
    fn indexed_object_keys_beyond_count_are_ignored() {
        let body = json!({
            "blacklists": {
                "engines_count": 2,
                "engines": {
                    "10": {"name": "Late", "detected": true},
                    "1": {"name": "B", "detected": true},
                    "0": {"name": "A", "detected": true}
                }
            }
        });
        let result = Normalizer::new(true)
            .normalize(&Indicator::domain("example.com"), &payload(body, &FLAT))
            .unwrap();

        let names: Vec<&str> = result.detected_engines.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn textual_risk_score_is_kept_verbatim() {
        let body = json!({"risk_score": {"result": "High"}});
        let result = Normalizer::new(false)
            .normalize(&Indicator::domain("example.com"), &payload(body, &FLAT))
            .unwrap();

        assert_eq!(result.risk_score, Some(RiskScore::Text("High".into())));
        assert_eq!(result.summary_tags[0], "Risk Score: High");
        assert_eq!(serde_json::to_value(&result.risk_score).unwrap(), json!("High"));
    }
}
