//! Rate-limit quota metadata.
//!
//! The quota header is a `;`-separated list of `key=value` pairs. Values are
//! coerced to booleans or numbers where they look like one.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Number, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QuotaValue {
    Bool(bool),
    Number(Number),
    Text(String),
}

impl QuotaValue {
    /// Coerce a raw header value: `true`/`false`, then numbers, else text.
    pub fn coerce(raw: &str) -> Self {
        match raw {
            "true" => return QuotaValue::Bool(true),
            "false" => return QuotaValue::Bool(false),
            _ => {}
        }
        if let Ok(n) = raw.parse::<i64>() {
            return QuotaValue::Number(n.into());
        }
        if let Some(n) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
            return QuotaValue::Number(n);
        }
        QuotaValue::Text(raw.to_string())
    }

    /// Same coercion for a value already decoded from a JSON body.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(QuotaValue::Bool(*b)),
            Value::Number(n) => Some(QuotaValue::Number(n.clone())),
            Value::String(s) => Some(QuotaValue::coerce(s.trim())),
            _ => None,
        }
    }
}

/// Parse a quota header. Segments without `=` or with an empty key are skipped.
pub fn parse_quota(raw: &str) -> BTreeMap<String, QuotaValue> {
    raw.split(';')
        .filter_map(|segment| {
            let (key, value) = segment.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), QuotaValue::coerce(value.trim())))
        })
        .collect()
}
