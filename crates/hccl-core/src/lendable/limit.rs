use std::collections::BTreeMap;
use std::time::Instant;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::HcclError;
use crate::types::{with_metadata, ComputationOutput, Rate, Shares};
use crate::HcclResult;

/// Codes never published as lendable.
pub const DEFAULT_BLACKLIST: [&str; 4] = ["BEBS", "IPPE", "WMPP", "WMUU"];

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

/// One client holding from the stock position detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionLine {
    pub stock_code: String,
    pub quantity: Shares,
}

/// One line of the instrument usage report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentLine {
    pub local_code: String,
    #[serde(default)]
    pub stock_name: Option<String>,
    #[serde(default)]
    pub used_loan_qty: Shares,
    #[serde(default)]
    pub used_reverse_repo_qty: Shares,
}

/// One outstanding borrow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowLine {
    pub stock_code: String,
    pub borrow_amount: Shares,
}

fn default_blacklist() -> Vec<String> {
    DEFAULT_BLACKLIST.iter().map(|c| c.to_string()).collect()
}

fn default_on_hand_factor() -> Rate {
    dec!(0.30)
}

fn default_repo_factor() -> Rate {
    dec!(0.10)
}

/// Input for the lendable limit calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LendableLimitInput {
    pub positions: Vec<PositionLine>,
    pub instruments: Vec<InstrumentLine>,
    #[serde(default)]
    pub borrows: Vec<BorrowLine>,
    #[serde(default = "default_blacklist")]
    pub blacklist: Vec<String>,
    /// Share of on-hand quantity that may be lent (0.30).
    #[serde(default = "default_on_hand_factor")]
    pub on_hand_factor: Rate,
    /// Share of reverse repo quantity added to the limit (0.10).
    #[serde(default = "default_repo_factor")]
    pub repo_factor: Rate,
}

impl LendableLimitInput {
    pub fn new(
        positions: Vec<PositionLine>,
        instruments: Vec<InstrumentLine>,
        borrows: Vec<BorrowLine>,
    ) -> Self {
        Self {
            positions,
            instruments,
            borrows,
            blacklist: default_blacklist(),
            on_hand_factor: default_on_hand_factor(),
            repo_factor: default_repo_factor(),
        }
    }
}

/// Lendable limit for one stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LendableLimitRow {
    pub stock_code: String,
    pub stock_name: String,
    pub quantity_on_hand: Shares,
    pub first_largest: Shares,
    pub second_largest: Shares,
    pub total_two_largest: Shares,
    pub quantity_available: Shares,
    pub thirty_percent_on_hand: Shares,
    pub repo: Shares,
    pub lendable_limit: Shares,
    pub borrow_position: Shares,
    pub available_lendable_limit: Shares,
    /// Included in the published template (some capacity left).
    pub published: bool,
}

/// Output of the lendable limit calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LendableLimitOutput {
    /// Every non-blacklisted stock with loan or repo usage, sorted by code.
    pub rows: Vec<LendableLimitRow>,
    pub published_count: usize,
    pub total_available_lendable_limit: Shares,
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

#[derive(Default)]
struct InstrumentUsage {
    name: Option<String>,
    loan: Shares,
    repo: Shares,
}

/// Quantity on hand plus the two largest position lines, whatever their sign.
#[derive(Default)]
struct Holdings {
    on_hand: Shares,
    largest: [Option<Shares>; 2],
}

impl Holdings {
    fn add(&mut self, quantity: Shares) {
        self.on_hand += quantity;
        match self.largest {
            [None, _] => self.largest[0] = Some(quantity),
            [Some(first), _] if quantity > first => {
                self.largest = [Some(quantity), Some(first)];
            }
            [Some(_), None] => self.largest[1] = Some(quantity),
            [Some(_), Some(second)] if quantity > second => self.largest[1] = Some(quantity),
            _ => {}
        }
    }

    /// The two largest lines, zero where fewer than two exist.
    fn top_two(&self) -> [Shares; 2] {
        self.largest.map(|q| q.unwrap_or(Decimal::ZERO))
    }
}

/// Calculate lendable limits per stock.
///
/// A stock is considered when its instrument lines show any loan or reverse
/// repo usage. Lendable limit = min(on_hand_factor * QOH, QOH - top two
/// holders) + repo_factor * reverse repo; available = lendable - borrowed.
pub fn calculate_lendable_limits(
    input: &LendableLimitInput,
) -> HcclResult<ComputationOutput<LendableLimitOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_lendable_input(input)?;

    let mut usage: BTreeMap<String, InstrumentUsage> = BTreeMap::new();
    for line in &input.instruments {
        let code = line.local_code.trim();
        if code.is_empty() {
            continue;
        }
        let entry = usage.entry(code.to_string()).or_default();
        entry.loan += line.used_loan_qty;
        entry.repo += line.used_reverse_repo_qty;
        if entry.name.is_none() {
            entry.name = line
                .stock_name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string);
        }
    }

    let mut holdings: BTreeMap<&str, Holdings> = BTreeMap::new();
    for line in &input.positions {
        holdings
            .entry(line.stock_code.trim())
            .or_default()
            .add(line.quantity);
    }

    let mut borrowed: BTreeMap<&str, Shares> = BTreeMap::new();
    for line in &input.borrows {
        *borrowed.entry(line.stock_code.trim()).or_default() += line.borrow_amount;
    }

    let mut rows = Vec::new();
    for (code, use_) in &usage {
        if use_.loan.is_zero() && use_.repo.is_zero() {
            continue;
        }
        if input.blacklist.iter().any(|b| b.trim() == code.as_str()) {
            continue;
        }

        let held = holdings.get(code.as_str());
        let quantity_on_hand = held.map(|h| h.on_hand).unwrap_or(Decimal::ZERO);
        let [first_largest, second_largest] =
            held.map(Holdings::top_two).unwrap_or([Decimal::ZERO; 2]);
        let total_two_largest = first_largest + second_largest;
        let quantity_available = quantity_on_hand - total_two_largest;
        let thirty_percent_on_hand = input.on_hand_factor * quantity_on_hand;
        let repo = input.repo_factor * use_.repo;
        let lendable_limit = thirty_percent_on_hand.min(quantity_available) + repo;
        let borrow_position = borrowed
            .get(code.as_str())
            .copied()
            .unwrap_or(Decimal::ZERO);
        let available_lendable_limit = lendable_limit - borrow_position;

        if available_lendable_limit < Decimal::ZERO {
            warnings.push(format!(
                "{code}: borrow position {borrow_position} exceeds lendable limit {lendable_limit}"
            ));
        }

        rows.push(LendableLimitRow {
            stock_code: code.clone(),
            stock_name: use_.name.clone().unwrap_or_default(),
            quantity_on_hand,
            first_largest,
            second_largest,
            total_two_largest,
            quantity_available,
            thirty_percent_on_hand,
            repo,
            lendable_limit,
            borrow_position,
            available_lendable_limit,
            published: lendable_limit > Decimal::ZERO
                || available_lendable_limit > Decimal::ZERO,
        });
    }

    let unknown_borrows: Vec<&str> = borrowed
        .keys()
        .filter(|code| !usage.contains_key(**code))
        .copied()
        .collect();
    if !unknown_borrows.is_empty() {
        warnings.push(format!(
            "Borrow positions without instrument usage ignored: {}",
            unknown_borrows.join(", ")
        ));
    }

    let published_count = rows.iter().filter(|r| r.published).count();
    let total_available_lendable_limit = rows
        .iter()
        .filter(|r| r.published)
        .map(|r| r.available_lendable_limit)
        .sum();

    info!(
        stocks = rows.len(),
        published = published_count,
        "lendable limits calculated"
    );

    let assumptions = serde_json::json!({
        "on_hand_factor": input.on_hand_factor.to_string(),
        "repo_factor": input.repo_factor.to_string(),
        "blacklist": input.blacklist,
    });

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Lendable limit: min(30% QOH, QOH - two largest holders) + 10% reverse repo - borrow",
        &assumptions,
        warnings,
        elapsed,
        LendableLimitOutput {
            rows,
            published_count,
            total_available_lendable_limit,
        },
    ))
}

fn validate_lendable_input(input: &LendableLimitInput) -> HcclResult<()> {
    if input.instruments.is_empty() {
        return Err(HcclError::InsufficientData(
            "At least one instrument line is required.".into(),
        ));
    }
    for (field, value) in [
        ("on_hand_factor", input.on_hand_factor),
        ("repo_factor", input.repo_factor),
    ] {
        if value < Decimal::ZERO || value > Decimal::ONE {
            return Err(HcclError::InvalidInput {
                field: field.into(),
                reason: format!("Must be in [0, 1], got {value}."),
            });
        }
    }
    Ok(())
}
