use serde::{Deserialize, Serialize};

/// Indicator type as assigned by the upstream classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
    Ipv4,
    Domain,
    #[serde(other)]
    Other,
}

impl std::fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndicatorKind::Ipv4 => write!(f, "ipv4"),
            IndicatorKind::Domain => write!(f, "domain"),
            IndicatorKind::Other => write!(f, "other"),
        }
    }
}

/// An observable submitted for reputation lookup.
///
/// Indicators arrive pre-classified; this crate never re-parses `value`
/// to decide its kind or privacy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Indicator {
    pub value: String,
    pub kind: IndicatorKind,
    #[serde(default)]
    pub is_private: bool,
}

impl Indicator {
    pub fn new(value: impl Into<String>, kind: IndicatorKind) -> Self {
        Self {
            value: value.into(),
            kind,
            is_private: false,
        }
    }

    pub fn ipv4(value: impl Into<String>) -> Self {
        Self::new(value, IndicatorKind::Ipv4)
    }

    pub fn domain(value: impl Into<String>) -> Self {
        Self::new(value, IndicatorKind::Domain)
    }

    pub fn other(value: impl Into<String>) -> Self {
        Self::new(value, IndicatorKind::Other)
    }

    /// Mark the indicator as private, as the classifier would.
    pub fn private(mut self) -> Self {
        self.is_private = true;
        self
    }
}
