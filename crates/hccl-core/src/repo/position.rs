use std::collections::BTreeMap;
use std::collections::HashMap;
use std::time::Instant;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::HcclError;
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::HcclResult;

/// The price file quotes fair prices in units of 10^-12.
pub const FAIR_PRICE_DIVISOR: Decimal = dec!(1_000_000_000_000);

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

/// One line of the reverse repo position report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoPosition {
    /// ISIN of the bond.
    pub instrument_code: String,
    pub nominal_amount: Money,
    /// Every cell of the report line keyed by header, carried to the output.
    #[serde(default)]
    pub details: BTreeMap<String, String>,
}

/// One line of the daily fair price file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairPriceQuote {
    pub isin_code: String,
    /// `None` when the file holds a non-numeric price.
    #[serde(default)]
    pub today_fair_price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoDailyInput {
    pub positions: Vec<RepoPosition>,
    #[serde(default)]
    pub prices: Vec<FairPriceQuote>,
}

/// A position line with its looked-up fair price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoPositionRow {
    pub instrument_code: String,
    pub nominal_amount: Money,
    /// Quoted price divided by [`FAIR_PRICE_DIVISOR`].
    pub today_fair_price: Option<Decimal>,
    /// An ISIN in the price file matched the instrument code.
    pub matched: bool,
    pub details: BTreeMap<String, String>,
}

/// Output of the daily position merge, one row per position in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoDailyOutput {
    pub rows: Vec<RepoPositionRow>,
    pub matched_count: usize,
    pub unmatched_count: usize,
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Attach today's fair price to each repo position.
///
/// Positions are joined on `instrument_code == isin_code` after trimming.
/// Every position is kept. When the price file lists an ISIN more than once
/// the first quote is used.
pub fn calculate_repo_daily_position(
    input: &RepoDailyInput,
) -> HcclResult<ComputationOutput<RepoDailyOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.positions.is_empty() {
        return Err(HcclError::InsufficientData(
            "At least one repo position is required.".into(),
        ));
    }

    let mut quotes: HashMap<&str, Option<Decimal>> = HashMap::with_capacity(input.prices.len());
    let mut duplicates: Vec<&str> = Vec::new();
    for quote in &input.prices {
        let isin = quote.isin_code.trim();
        if isin.is_empty() {
            continue;
        }
        if quotes.contains_key(isin) {
            duplicates.push(isin);
            continue;
        }
        quotes.insert(isin, quote.today_fair_price);
    }
    if !duplicates.is_empty() {
        duplicates.sort_unstable();
        duplicates.dedup();
        warnings.push(format!(
            "Duplicate ISINs in the price file, first quote used: {}",
            duplicates.join(", ")
        ));
    }

    let mut rows = Vec::with_capacity(input.positions.len());
    let mut unmatched: Vec<&str> = Vec::new();
    for position in &input.positions {
        let code = position.instrument_code.trim();
        let quote = quotes.get(code);
        if quote.is_none() {
            unmatched.push(code);
        }
        let today_fair_price = quote
            .copied()
            .flatten()
            .and_then(|price| price.checked_div(FAIR_PRICE_DIVISOR));
        rows.push(RepoPositionRow {
            instrument_code: code.to_string(),
            nominal_amount: position.nominal_amount,
            today_fair_price,
            matched: quote.is_some(),
            details: position.details.clone(),
        });
    }

    let matched_count = rows.len() - unmatched.len();
    if !unmatched.is_empty() {
        warn!(unmatched = unmatched.len(), "positions without a fair price");
        warnings.push(format!(
            "No fair price for {} of {} positions: {}",
            unmatched.len(),
            rows.len(),
            unmatched.join(", ")
        ));
    }

    info!(
        positions = rows.len(),
        matched = matched_count,
        "repo daily position merged"
    );

    let assumptions = serde_json::json!({
        "join": "instrument_code = isin_code",
        "fair_price_divisor": FAIR_PRICE_DIVISOR.to_string(),
        "duplicate_isin": "first quote",
    });

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Repo daily position: position report left-joined to daily fair prices on ISIN",
        &assumptions,
        warnings,
        elapsed,
        RepoDailyOutput {
            unmatched_count: unmatched.len(),
            matched_count,
            rows,
        },
    ))
}
