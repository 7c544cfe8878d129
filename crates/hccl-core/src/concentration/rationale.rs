//! Justification text for each resolved limit and haircut.
//!
//! The limit rationale comes from an ordered rule table. Every rule whose
//! predicate holds is a match and the last match wins, so the table reads
//! from the general case down to the most specific override. Predicates are
//! written to be mutually exclusive except where a later rule is meant to
//! replace an earlier one (issuer profile over a zero limit, and the combined
//! listed & free-float wording over either single wording).

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::RuleConfig;
use crate::types::{Language, Money, Rate};

use super::candidates::CandidateLimits;
use super::engine::SecurityRow;

/// Why the concentration limit has its final value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitRationale {
    PerCalculation,
    BelowThreshold,
    FullHaircut,
    IssuerProfile,
    NewMarginStock,
    ExceedsListed,
    ExceedsFreeFloat,
    ExceedsListedAndFreeFloat,
}

impl LimitRationale {
    /// Stable identifier used in summaries.
    pub fn code(&self) -> &'static str {
        match self {
            LimitRationale::PerCalculation => "per_calculation",
            LimitRationale::BelowThreshold => "below_threshold",
            LimitRationale::FullHaircut => "full_haircut",
            LimitRationale::IssuerProfile => "issuer_profile",
            LimitRationale::NewMarginStock => "new_margin_stock",
            LimitRationale::ExceedsListed => "exceeds_listed",
            LimitRationale::ExceedsFreeFloat => "exceeds_free_float",
            LimitRationale::ExceedsListedAndFreeFloat => "exceeds_listed_and_free_float",
        }
    }

    pub fn localized(&self, language: Language) -> &'static str {
        match language {
            Language::English => match self {
                LimitRationale::PerCalculation => "per calculation method",
                LimitRationale::BelowThreshold => {
                    "adjustment: concentration limit below Rp5 billion"
                }
                LimitRationale::FullHaircut => "adjustment: PEI haircut 100%",
                LimitRationale::IssuerProfile => "adjustment: issuer profile",
                LimitRationale::NewMarginStock => "adjustment: newly margin-eligible stock",
                LimitRationale::ExceedsListed => "adjustment: exceeds 5% of listed shares",
                LimitRationale::ExceedsFreeFloat => "adjustment: exceeds 20% of free float",
                LimitRationale::ExceedsListedAndFreeFloat => {
                    "adjustment: exceeds 5% listed & 20% free float"
                }
            },
            Language::Indonesian => match self {
                LimitRationale::PerCalculation => "Sesuai metode perhitungan",
                LimitRationale::BelowThreshold => {
                    "Penyesuaian karena Batas Konsentrasi < Rp5 Miliar"
                }
                LimitRationale::FullHaircut => "Penyesuaian karena Haircut PEI 100%",
                LimitRationale::IssuerProfile => "Penyesuaian karena profil emiten",
                LimitRationale::NewMarginStock => "Penyesuaian karena saham baru masuk marjin",
                LimitRationale::ExceedsListed => "Penyesuaian karena melebihi 5% listed shares",
                LimitRationale::ExceedsFreeFloat => "Penyesuaian karena melebihi 20% free float",
                LimitRationale::ExceedsListedAndFreeFloat => {
                    "Penyesuaian karena melebihi 5% listed & 20% free float"
                }
            },
        }
    }
}

impl fmt::Display for LimitRationale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.localized(Language::English))
    }
}

/// Why the haircut has its final value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HaircutRationale {
    PerCalculation,
    /// KPEI haircut taken because of a UMA announcement.
    UmaAnnouncement,
    /// Forced to 100% by a sub-threshold limit.
    LimitIsZero,
}

impl HaircutRationale {
    /// Render the rationale; `uma_date` is used only for `UmaAnnouncement`.
    pub fn localized(&self, language: Language, uma_date: Option<NaiveDate>) -> String {
        match (self, uma_date) {
            (HaircutRationale::UmaAnnouncement, Some(date)) => match language {
                Language::English => format!(
                    "per KPEI haircut, considering UMA announcement dated {}",
                    date.format("%d %b %Y")
                ),
                Language::Indonesian => format!(
                    "Sesuai Haircut KPEI, mempertimbangkan pengumuman UMA dari BEI tanggal {}",
                    date.format("%d %b %Y")
                ),
            },
            (HaircutRationale::LimitIsZero, _) => match language {
                Language::English => "adjustment: concentration limit is 0".to_string(),
                Language::Indonesian => "Penyesuaian karena Batas Konsentrasi 0".to_string(),
            },
            _ => match language {
                Language::English => "per calculation method".to_string(),
                Language::Indonesian => "Sesuai Metode Perhitungan".to_string(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Rule table
// ---------------------------------------------------------------------------

/// Everything a rationale predicate may look at for one security.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub row: &'a SecurityRow,
    pub candidates: &'a CandidateLimits,
    pub final_limit: Money,
    /// Haircut selected from KPEI/PEI before the zero-limit coupling.
    pub selected_haircut: Option<Rate>,
    pub config: &'a RuleConfig,
}

impl RuleContext<'_> {
    fn is_zero(&self) -> bool {
        self.final_limit.is_zero()
    }

    fn below_threshold(&self) -> bool {
        self.candidates.any_below(self.config.threshold)
    }

    fn full_haircut(&self) -> bool {
        self.selected_haircut
            .is_some_and(|h| self.config.is_full_haircut(h))
    }

    fn equals_final(&self, candidate: Option<Money>) -> bool {
        candidate.is_some_and(|c| c.round_dp(0) == self.final_limit.round_dp(0))
    }

    fn at_override_cap(&self) -> bool {
        !self.is_zero() && self.equals_final(self.config.override_cap(&self.row.code))
    }

    /// Non-zero limit that was not set by an issuer cap.
    fn formula_limit(&self) -> bool {
        !self.is_zero() && !self.at_override_cap()
    }

    fn from_listed(&self) -> bool {
        self.formula_limit() && self.equals_final(self.candidates.listed)
    }

    fn from_free_float(&self) -> bool {
        self.formula_limit() && self.equals_final(self.candidates.free_float) && !self.from_listed()
    }
}

/// One predicate/outcome pair of the rationale table.
pub struct LimitRule {
    pub name: &'static str,
    pub applies: fn(&RuleContext<'_>) -> bool,
    pub outcome: LimitRationale,
}

/// Evaluated top to bottom; the last matching rule wins.
pub const LIMIT_RULES: [LimitRule; 8] = [
    LimitRule {
        name: "below_threshold",
        applies: |ctx| ctx.below_threshold(),
        outcome: LimitRationale::BelowThreshold,
    },
    LimitRule {
        name: "full_haircut",
        applies: |ctx| ctx.is_zero() && ctx.full_haircut() && !ctx.below_threshold(),
        outcome: LimitRationale::FullHaircut,
    },
    LimitRule {
        name: "special_profile_zero",
        applies: |ctx| ctx.is_zero() && ctx.config.is_special_profile(&ctx.row.code),
        outcome: LimitRationale::IssuerProfile,
    },
    LimitRule {
        name: "override_cap",
        applies: |ctx| ctx.at_override_cap(),
        outcome: LimitRationale::IssuerProfile,
    },
    LimitRule {
        name: "new_margin_stock",
        applies: |ctx| {
            ctx.formula_limit()
                && ctx.row.is_new_margin_stock
                && ctx.equals_final(ctx.candidates.margin)
        },
        outcome: LimitRationale::NewMarginStock,
    },
    LimitRule {
        name: "exceeds_listed",
        applies: |ctx| ctx.from_listed(),
        outcome: LimitRationale::ExceedsListed,
    },
    LimitRule {
        name: "exceeds_free_float",
        applies: |ctx| ctx.from_free_float(),
        outcome: LimitRationale::ExceedsFreeFloat,
    },
    LimitRule {
        name: "exceeds_listed_and_free_float",
        applies: |ctx| {
            (ctx.from_listed() || ctx.from_free_float())
                && ctx.candidates.listed.is_some()
                && ctx.candidates.free_float.is_some()
        },
        outcome: LimitRationale::ExceedsListedAndFreeFloat,
    },
];

/// Names of every rule that matches, in table order.
pub fn matching_rules(ctx: &RuleContext<'_>) -> Vec<&'static str> {
    LIMIT_RULES
        .iter()
        .filter(|rule| (rule.applies)(ctx))
        .map(|rule| rule.name)
        .collect()
}

pub fn assign_limit_rationale(ctx: &RuleContext<'_>) -> LimitRationale {
    LIMIT_RULES
        .iter()
        .filter(|rule| (rule.applies)(ctx))
        .last()
        .map(|rule| rule.outcome)
        .unwrap_or(LimitRationale::PerCalculation)
}

/// The sub-threshold wording on the limit carries over to the haircut.
pub fn assign_haircut_rationale(
    limit_rationale: LimitRationale,
    uma_date: Option<NaiveDate>,
) -> HaircutRationale {
    if limit_rationale == LimitRationale::BelowThreshold {
        HaircutRationale::LimitIsZero
    } else if uma_date.is_some() {
        HaircutRationale::UmaAnnouncement
    } else {
        HaircutRationale::PerCalculation
    }
}

// ---------------------------------------------------------------------------
// UMA dates
// ---------------------------------------------------------------------------

const UMA_DATE_FORMATS: [&str; 7] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d %b %Y",
    "%d-%b-%Y",
    "%d-%b-%y",
];

/// Parse a UMA announcement cell. Accepts ISO dates, day-first dates and
/// Excel serial day numbers; a trailing time part is ignored in every form.
pub fn parse_uma_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    let date_part = strip_time(value);

    for fmt in UMA_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&date_part, fmt) {
            return Some(date);
        }
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return Some(date);
        }
    }

    // Excel stores dates as days since 1899-12-30.
    let serial: i64 = value.split('.').next()?.parse().ok()?;
    if (20_000..=80_000).contains(&serial) {
        let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
        return epoch.checked_add_signed(chrono::Duration::days(serial));
    }
    None
}

/// Drop an ISO `T..` suffix and any whitespace-separated `hh:mm[:ss]` tokens.
fn strip_time(value: &str) -> String {
    let value = match value.split_once('T') {
        Some((date, time)) if time.contains(':') => date,
        _ => value,
    };
    value
        .split_whitespace()
        .filter(|token| !token.contains(':'))
        .collect::<Vec<_>>()
        .join(" ")
}
