use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::RuleConfig;
use crate::types::{Money, Rate};

use super::candidates::CandidateLimits;
use super::engine::SecurityRow;

/// Why a final limit ended up at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroCause {
    /// A defined candidate is below the threshold.
    BelowThreshold,
    /// The selected haircut was already 100%.
    FullHaircut,
    /// No candidate limit could be computed.
    NoCandidates,
}

/// Outcome of limit resolution for one security.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitResolution {
    pub final_limit: Money,
    /// True when an override cap lowered the limit.
    pub capped: bool,
    pub zero_cause: Option<ZeroCause>,
}

/// Haircut before any coupling with the final limit: KPEI under UMA, PEI otherwise.
pub fn select_haircut(row: &SecurityRow) -> Option<Rate> {
    if row.has_uma() {
        row.haircut_kpei
    } else {
        row.haircut_pei
    }
}

/// Resolve the final concentration limit.
///
/// Order: minimum of defined candidates, zero override below threshold,
/// issuer cap on non-zero limits (rounded to whole Rupiah), then the safety
/// reset for a 100% haircut or a sub-threshold computed limit.
pub fn resolve_limit(
    row: &SecurityRow,
    candidates: &CandidateLimits,
    selected_haircut: Option<Rate>,
    config: &RuleConfig,
) -> LimitResolution {
    let Some(minimum) = candidates.minimum() else {
        return LimitResolution {
            final_limit: Decimal::ZERO,
            capped: false,
            zero_cause: Some(ZeroCause::NoCandidates),
        };
    };

    if candidates.any_below(config.threshold) {
        return LimitResolution {
            final_limit: Decimal::ZERO,
            capped: false,
            zero_cause: Some(ZeroCause::BelowThreshold),
        };
    }

    let mut final_limit = minimum;
    let mut capped = false;
    if !final_limit.is_zero() {
        if let Some(cap) = config.override_cap(&row.code) {
            if cap < final_limit {
                final_limit = cap;
                capped = true;
            }
        }
        final_limit = final_limit.round_dp(0);
    }

    // Safety reset, applied after the per-row rules.
    if selected_haircut.is_some_and(|h| config.is_full_haircut(h)) {
        return LimitResolution {
            final_limit: Decimal::ZERO,
            capped,
            zero_cause: Some(ZeroCause::FullHaircut),
        };
    }
    if row.computed_limit.is_some_and(|c| c < config.threshold) {
        return LimitResolution {
            final_limit: Decimal::ZERO,
            capped,
            zero_cause: Some(ZeroCause::BelowThreshold),
        };
    }

    LimitResolution {
        final_limit,
        capped,
        zero_cause: None,
    }
}

/// Final haircut: forced to 100% whenever the limit is zero.
pub fn resolve_haircut(final_limit: Money, selected_haircut: Option<Rate>) -> Option<Rate> {
    if final_limit.is_zero() {
        Some(Decimal::ONE)
    } else {
        selected_haircut
    }
}
