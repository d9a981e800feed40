//! Per-indicator eligibility for lookup.
//!
//! The IPv4 checks are string-prefix heuristics, not CIDR matching: anything
//! starting with "127" counts as loopback and anything starting with "169" as
//! link-local. Most RFC1918 space is only caught through the classifier's
//! `is_private` flag.

use voidcheck_core::{Indicator, IndicatorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    UnsupportedKind,
    Loopback,
    LinkLocal,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Skip(SkipReason),
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }
}

/// Decide whether `indicator` should be sent upstream.
pub fn filter(indicator: &Indicator) -> Eligibility {
    match indicator.kind {
        IndicatorKind::Domain => Eligibility::Eligible,
        IndicatorKind::Ipv4 => {
            if indicator.value.starts_with("127") {
                Eligibility::Skip(SkipReason::Loopback)
            } else if indicator.value.starts_with("169") {
                Eligibility::Skip(SkipReason::LinkLocal)
            } else if indicator.is_private {
                Eligibility::Skip(SkipReason::Private)
            } else {
                Eligibility::Eligible
            }
        }
        IndicatorKind::Other => Eligibility::Skip(SkipReason::UnsupportedKind),
    }
}
