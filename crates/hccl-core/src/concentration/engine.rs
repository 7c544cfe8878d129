use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::RuleConfig;
use crate::error::HcclError;
use crate::types::{with_metadata, ComputationOutput, Money, Rate, Shares};
use crate::HcclResult;

use super::candidates::CandidateLimits;
use super::rationale::{
    assign_haircut_rationale, assign_limit_rationale, parse_uma_date, HaircutRationale,
    LimitRationale, RuleContext,
};
use super::resolution::{resolve_haircut, resolve_limit, select_haircut, ZeroCause};

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

/// One listed security for a valuation date.
///
/// Numeric fields are `None` when the source cell was blank or not a number;
/// such values make the rules that need them not applicable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityRow {
    /// Security code, unique within a run.
    pub code: String,
    #[serde(default)]
    pub closing_price: Option<Money>,
    #[serde(default)]
    pub listed_shares: Option<Shares>,
    #[serde(default)]
    pub free_float_shares: Option<Shares>,
    /// Position as a fraction of listed shares.
    #[serde(default)]
    pub pct_of_listed: Option<Rate>,
    /// Position as a fraction of free-float shares.
    #[serde(default)]
    pub pct_of_free_float: Option<Rate>,
    /// Baseline limit from the valuation formula.
    #[serde(default)]
    pub computed_limit: Option<Money>,
    #[serde(default)]
    pub is_new_margin_stock: bool,
    /// UMA announcement date as uploaded. Blank or "-" means no UMA.
    #[serde(default)]
    pub uma_flag: Option<String>,
    /// KPEI haircut, fraction scale.
    #[serde(default)]
    pub haircut_kpei: Option<Rate>,
    /// PEI haircut, fraction scale.
    #[serde(default)]
    pub haircut_pei: Option<Rate>,
}

impl SecurityRow {
    /// A row with only a code; every input is not applicable.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            closing_price: None,
            listed_shares: None,
            free_float_shares: None,
            pct_of_listed: None,
            pct_of_free_float: None,
            computed_limit: None,
            is_new_margin_stock: false,
            uma_flag: None,
            haircut_kpei: None,
            haircut_pei: None,
        }
    }

    pub fn has_uma(&self) -> bool {
        self.uma_flag
            .as_deref()
            .map(str::trim)
            .is_some_and(|v| !v.is_empty() && v != "-")
    }
}

/// Input for a concentration limit run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcentrationInput {
    pub rows: Vec<SecurityRow>,
    #[serde(default)]
    pub config: RuleConfig,
}

/// Resolved limit and haircut for one security.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcentrationResult {
    pub code: String,
    pub computed_limit: Option<Money>,
    pub limit_from_margin_rule: Option<Money>,
    pub limit_from_listed_rule: Option<Money>,
    pub limit_from_freefloat_rule: Option<Money>,
    /// Whole Rupiah, never negative.
    pub final_limit: Money,
    /// Fraction scale; always 1 when `final_limit` is zero.
    pub final_haircut: Option<Rate>,
    pub limit_rationale: LimitRationale,
    pub haircut_rationale: HaircutRationale,
    pub uma_date: Option<NaiveDate>,
    pub limit_rationale_text: String,
    pub haircut_rationale_text: String,
}

/// Aggregate counts over a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcentrationSummary {
    pub securities: usize,
    pub zero_limits: usize,
    pub capped_limits: usize,
    pub under_uma: usize,
    /// Total of all non-zero final limits.
    pub total_final_limit: Money,
    pub rationale_counts: BTreeMap<String, usize>,
}

/// Output of a concentration limit run, one result per input row in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcentrationOutput {
    pub rows: Vec<ConcentrationResult>,
    pub summary: ConcentrationSummary,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Resolve concentration limits, haircuts and rationales for every row.
///
/// Rows are independent; the output preserves input order.
pub fn calculate_concentration_limits(
    input: &ConcentrationInput,
) -> HcclResult<ComputationOutput<ConcentrationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    input.config.validate()?;
    validate_rows(&input.rows, &input.config)?;

    let mut rows = Vec::with_capacity(input.rows.len());
    let mut capped_limits = 0;
    for row in &input.rows {
        let (result, capped) = evaluate_row(row, &input.config, &mut warnings);
        if capped {
            capped_limits += 1;
        }
        rows.push(result);
    }

    let summary = summarize(&rows, capped_limits);
    info!(
        securities = summary.securities,
        zero_limits = summary.zero_limits,
        capped = summary.capped_limits,
        "concentration limits resolved"
    );

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Concentration limit: min of margin/listed/free-float/computed candidates, \
         Rp5bn zero override, issuer caps, 100% haircut reset",
        &input.config,
        warnings,
        elapsed,
        ConcentrationOutput { rows, summary },
    ))
}

/// Evaluate a single security against `config`.
pub fn evaluate_security(row: &SecurityRow, config: &RuleConfig) -> ConcentrationResult {
    let mut warnings = Vec::new();
    evaluate_row(row, config, &mut warnings).0
}

fn evaluate_row(
    row: &SecurityRow,
    config: &RuleConfig,
    warnings: &mut Vec<String>,
) -> (ConcentrationResult, bool) {
    let candidates = CandidateLimits::compute(row, config);
    let selected_haircut = select_haircut(row);
    let resolution = resolve_limit(row, &candidates, selected_haircut, config);

    if resolution.zero_cause == Some(ZeroCause::NoCandidates) {
        warn!(code = %row.code, "no candidate limit could be computed");
        warnings.push(format!(
            "{}: no candidate limit could be computed; limit set to 0",
            row.code
        ));
    }
    if selected_haircut.is_none() && !resolution.final_limit.is_zero() {
        warnings.push(format!(
            "{}: {} haircut missing; final haircut left blank",
            row.code,
            if row.has_uma() { "KPEI" } else { "PEI" }
        ));
    }

    let uma_date = match row.uma_flag.as_deref() {
        Some(raw) if row.has_uma() => {
            let parsed = parse_uma_date(raw);
            if parsed.is_none() {
                warnings.push(format!(
                    "{}: UMA value '{}' is not a date; KPEI haircut used without announcement date",
                    row.code,
                    raw.trim()
                ));
            }
            parsed
        }
        _ => None,
    };

    let ctx = RuleContext {
        row,
        candidates: &candidates,
        final_limit: resolution.final_limit,
        selected_haircut,
        config,
    };
    let limit_rationale = assign_limit_rationale(&ctx);
    let haircut_rationale = assign_haircut_rationale(limit_rationale, uma_date);

    debug!(
        code = %row.code,
        final_limit = %resolution.final_limit,
        rationale = limit_rationale.code(),
        "security evaluated"
    );

    let result = ConcentrationResult {
        code: row.code.clone(),
        computed_limit: row.computed_limit,
        limit_from_margin_rule: candidates.margin,
        limit_from_listed_rule: candidates.listed,
        limit_from_freefloat_rule: candidates.free_float,
        final_limit: resolution.final_limit,
        final_haircut: resolve_haircut(resolution.final_limit, selected_haircut),
        limit_rationale,
        haircut_rationale,
        uma_date,
        limit_rationale_text: limit_rationale.localized(config.language).to_string(),
        haircut_rationale_text: haircut_rationale.localized(config.language, uma_date),
    };

    (result, resolution.capped && !resolution.final_limit.is_zero())
}

fn summarize(rows: &[ConcentrationResult], capped_limits: usize) -> ConcentrationSummary {
    let mut rationale_counts = BTreeMap::new();
    for r in rows {
        *rationale_counts
            .entry(r.limit_rationale.code().to_string())
            .or_insert(0) += 1;
    }

    ConcentrationSummary {
        securities: rows.len(),
        zero_limits: rows.iter().filter(|r| r.final_limit.is_zero()).count(),
        capped_limits,
        under_uma: rows
            .iter()
            .filter(|r| r.haircut_rationale == HaircutRationale::UmaAnnouncement)
            .count(),
        total_final_limit: rows.iter().map(|r| r.final_limit).sum(),
        rationale_counts,
    }
}

fn validate_rows(rows: &[SecurityRow], config: &RuleConfig) -> HcclResult<()> {
    if rows.is_empty() {
        return Err(HcclError::InsufficientData(
            "At least one security row is required.".into(),
        ));
    }

    let mut seen = HashSet::with_capacity(rows.len());
    for row in rows {
        validate_security(row, config)?;
        if !seen.insert(row.code.as_str()) {
            return Err(HcclError::InvalidInput {
                field: "code".into(),
                reason: format!("Duplicate security code '{}'.", row.code),
            });
        }
    }
    Ok(())
}

/// Check one row before evaluation.
///
/// Haircuts must already be on the fraction scale: a value above
/// `1 + haircut_tolerance` is rejected rather than read as a percentage.
pub fn validate_security(row: &SecurityRow, config: &RuleConfig) -> HcclResult<()> {
    if row.code.trim().is_empty() {
        return Err(HcclError::InvalidInput {
            field: "code".into(),
            reason: "Security code must not be empty.".into(),
        });
    }

    let non_negative = [
        ("closing_price", row.closing_price),
        ("listed_shares", row.listed_shares),
        ("free_float_shares", row.free_float_shares),
        ("haircut_kpei", row.haircut_kpei),
        ("haircut_pei", row.haircut_pei),
    ];
    for (field, value) in non_negative {
        if value.is_some_and(|v| v < Decimal::ZERO) {
            return Err(HcclError::InvalidInput {
                field: field.into(),
                reason: format!("Must be non-negative for security '{}'.", row.code),
            });
        }
    }

    let max_haircut = Decimal::ONE + config.haircut_tolerance;
    for (field, value) in [
        ("haircut_kpei", row.haircut_kpei),
        ("haircut_pei", row.haircut_pei),
    ] {
        if let Some(h) = value.filter(|h| *h > max_haircut) {
            return Err(HcclError::InvalidInput {
                field: field.into(),
                reason: format!(
                    "Haircut {h} for security '{}' is above 1; haircuts are fractions (1 = 100%).",
                    row.code
                ),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
