//! Mapping between the uploaded HCCL spreadsheet and engine types.
//!
//! The upload uses fixed Indonesian column headers. Values arrive as text
//! cells (CSV or a sheet export); anything that does not parse as a number
//! becomes `None` rather than zero.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::concentration::{ConcentrationResult, SecurityRow};
use crate::error::HcclError;
pub use crate::numeric::parse_number;
use crate::types::{HaircutScale, Rate};
use crate::HcclResult;

pub const COL_CODE: &str = "KODE EFEK";
pub const COL_CLOSING_PRICE: &str = "CLOSING PRICE";
pub const COL_LISTED_SHARES: &str = "LISTED SHARES";
pub const COL_FREE_FLOAT: &str = "FREE FLOAT (DALAM LEMBAR)";
pub const COL_PCT_LISTED: &str = "PERBANDINGAN DENGAN LISTED SHARES (Sesuai Perhitungan)";
pub const COL_PCT_FREE_FLOAT: &str = "PERBANDINGAN DENGAN FREE FLOAT (Sesuai Perhitungan)";
pub const COL_COMPUTED_LIMIT: &str = "CONCENTRATION LIMIT SESUAI PERHITUNGAN";
pub const COL_NEW_MARGIN: &str = "SAHAM MARJIN BARU?";
pub const COL_UMA: &str = "UMA";
pub const COL_HAIRCUT_KPEI: &str = "HAIRCUT KPEI";
pub const COL_HAIRCUT_PEI: &str = "HAIRCUT PEI";

pub const COL_MARGIN_LIMIT: &str = "CONCENTRATION LIMIT KARENA SAHAM MARJIN BARU";
pub const COL_LISTED_LIMIT: &str = "CONCENTRATION LIMIT TERKENA % LISTED SHARES";
pub const COL_FREE_FLOAT_LIMIT: &str = "CONCENTRATION LIMIT TERKENA % FREE FLOAT";
pub const COL_FINAL_LIMIT: &str = "CONCENTRATION LIMIT USULAN RMCC";
pub const COL_FINAL_HAIRCUT: &str = "HAIRCUT PEI USULAN DIVISI";
pub const COL_HAIRCUT_RATIONALE: &str = "PERTIMBANGAN DIVISI (HAIRCUT)";
pub const COL_LIMIT_RATIONALE: &str = "PERTIMBANGAN DIVISI (CONC LIMIT)";

/// Columns every upload must carry (the code column may fall back to the first column).
pub const REQUIRED_COLUMNS: [&str; 10] = [
    COL_CLOSING_PRICE,
    COL_LISTED_SHARES,
    COL_FREE_FLOAT,
    COL_PCT_LISTED,
    COL_PCT_FREE_FLOAT,
    COL_COMPUTED_LIMIT,
    COL_NEW_MARGIN,
    COL_UMA,
    COL_HAIRCUT_KPEI,
    COL_HAIRCUT_PEI,
];

/// Derived columns appended to the output table.
pub const RESULT_COLUMNS: [&str; 7] = [
    COL_MARGIN_LIMIT,
    COL_LISTED_LIMIT,
    COL_FREE_FLOAT_LIMIT,
    COL_FINAL_LIMIT,
    COL_FINAL_HAIRCUT,
    COL_HAIRCUT_RATIONALE,
    COL_LIMIT_RATIONALE,
];

/// Parsed upload ready for the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityTable {
    pub rows: Vec<SecurityRow>,
    /// Scale the haircut columns were read in (never `Auto`).
    pub haircut_scale: HaircutScale,
    pub warnings: Vec<String>,
}

/// Column positions resolved from a header row.
struct ColumnIndex {
    code: usize,
    closing_price: usize,
    listed_shares: usize,
    free_float: usize,
    pct_listed: usize,
    pct_free_float: usize,
    computed_limit: usize,
    new_margin: usize,
    uma: usize,
    haircut_kpei: usize,
    haircut_pei: usize,
}

impl ColumnIndex {
    fn resolve(headers: &[String]) -> HcclResult<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| HcclError::MissingColumn {
                column: name.to_string(),
            })
        };

        if headers.is_empty() {
            return Err(HcclError::MissingColumn {
                column: COL_CODE.to_string(),
            });
        }

        Ok(Self {
            // Uploads without a code header carry the code in the first column.
            code: find(COL_CODE).unwrap_or(0),
            closing_price: require(COL_CLOSING_PRICE)?,
            listed_shares: require(COL_LISTED_SHARES)?,
            free_float: require(COL_FREE_FLOAT)?,
            pct_listed: require(COL_PCT_LISTED)?,
            pct_free_float: require(COL_PCT_FREE_FLOAT)?,
            computed_limit: require(COL_COMPUTED_LIMIT)?,
            new_margin: require(COL_NEW_MARGIN)?,
            uma: require(COL_UMA)?,
            haircut_kpei: require(COL_HAIRCUT_KPEI)?,
            haircut_pei: require(COL_HAIRCUT_PEI)?,
        })
    }
}

/// Build engine rows from a header row and text records.
///
/// Blank records (every cell empty) are skipped. Haircuts are converted to
/// the fraction scale according to `scale`.
pub fn parse_security_table(
    headers: &[String],
    records: &[Vec<String>],
    scale: HaircutScale,
) -> HcclResult<SecurityTable> {
    let idx = ColumnIndex::resolve(headers)?;
    let mut warnings = Vec::new();
    let mut rows = Vec::with_capacity(records.len());
    // Haircut cells written with `%` are already fractions once parsed.
    let mut marked = Vec::with_capacity(records.len());

    for (line, record) in records.iter().enumerate() {
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let cell = |i: usize| record.get(i).map(String::as_str).unwrap_or("");

        let code = cell(idx.code).trim().to_string();
        if code.is_empty() {
            return Err(HcclError::InvalidInput {
                field: COL_CODE.into(),
                reason: format!("Empty security code on data row {}.", line + 1),
            });
        }

        let uma = cell(idx.uma).trim();
        marked.push([
            has_percent_sign(cell(idx.haircut_kpei)),
            has_percent_sign(cell(idx.haircut_pei)),
        ]);
        rows.push(SecurityRow {
            closing_price: parse_number(cell(idx.closing_price)),
            listed_shares: parse_number(cell(idx.listed_shares)),
            free_float_shares: parse_number(cell(idx.free_float)),
            pct_of_listed: parse_number(cell(idx.pct_listed)),
            pct_of_free_float: parse_number(cell(idx.pct_free_float)),
            computed_limit: parse_number(cell(idx.computed_limit)),
            is_new_margin_stock: parse_flag(cell(idx.new_margin)),
            uma_flag: (!uma.is_empty()).then(|| uma.to_string()),
            haircut_kpei: parse_number(cell(idx.haircut_kpei)),
            haircut_pei: parse_number(cell(idx.haircut_pei)),
            code,
        });
    }

    let haircut_scale = rescale_haircuts(&mut rows, &marked, scale, &mut warnings);

    Ok(SecurityTable {
        rows,
        haircut_scale,
        warnings,
    })
}

/// Convert haircuts to fractions in place and return the scale applied.
pub fn normalize_haircuts(
    rows: &mut [SecurityRow],
    scale: HaircutScale,
    warnings: &mut Vec<String>,
) -> HaircutScale {
    let marked = vec![[false; 2]; rows.len()];
    rescale_haircuts(rows, &marked, scale, warnings)
}

fn has_percent_sign(raw: &str) -> bool {
    raw.trim().ends_with('%')
}

/// `marked[i]` flags the KPEI / PEI cells of row `i` that carried a `%`
/// sign; those are fractions already and neither drive detection nor get
/// divided again.
fn rescale_haircuts(
    rows: &mut [SecurityRow],
    marked: &[[bool; 2]],
    scale: HaircutScale,
    warnings: &mut Vec<String>,
) -> HaircutScale {
    let plain = |i: usize, col: usize| !marked.get(i).is_some_and(|m| m[col]);

    let resolved = match scale {
        HaircutScale::Auto => {
            let percent = rows.iter().enumerate().any(|(i, r)| {
                [r.haircut_kpei, r.haircut_pei]
                    .into_iter()
                    .enumerate()
                    .any(|(col, h)| plain(i, col) && h.is_some_and(|h| h > dec!(1.000001)))
            });
            if percent {
                warn!("haircut columns detected as percent scale");
                warnings.push(
                    "Haircut values above 1 found; haircut columns read as percentages".into(),
                );
                HaircutScale::Percent
            } else {
                HaircutScale::Fraction
            }
        }
        explicit => explicit,
    };

    if resolved == HaircutScale::Percent {
        for (i, row) in rows.iter_mut().enumerate() {
            if plain(i, 0) {
                row.haircut_kpei = row.haircut_kpei.map(percent_to_fraction);
            }
            if plain(i, 1) {
                row.haircut_pei = row.haircut_pei.map(percent_to_fraction);
            }
        }
    }
    resolved
}

fn percent_to_fraction(value: Rate) -> Rate {
    value / dec!(100)
}

/// `YA` (and common English equivalents) marks a newly margin-eligible stock.
pub fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_uppercase().as_str(),
        "YA" | "Y" | "YES" | "TRUE"
    )
}

fn format_amount(value: Option<Decimal>) -> String {
    value.map(|v| v.normalize().to_string()).unwrap_or_default()
}

/// Values for `RESULT_COLUMNS`, in order.
pub fn result_record(result: &ConcentrationResult) -> Vec<String> {
    vec![
        format_amount(result.limit_from_margin_rule),
        format_amount(result.limit_from_listed_rule),
        format_amount(result.limit_from_freefloat_rule),
        format_amount(Some(result.final_limit)),
        format_amount(result.final_haircut),
        result.haircut_rationale_text.clone(),
        result.limit_rationale_text.clone(),
    ]
}

/// The uploaded table with the derived columns appended.
///
/// Data records are matched to results in order, skipping blank records the
/// same way `parse_security_table` does.
pub fn augment_table(
    headers: &[String],
    records: &[Vec<String>],
    results: &[ConcentrationResult],
) -> HcclResult<(Vec<String>, Vec<Vec<String>>)> {
    let data: Vec<&Vec<String>> = records
        .iter()
        .filter(|r| !r.iter().all(|cell| cell.trim().is_empty()))
        .collect();
    if data.len() != results.len() {
        return Err(HcclError::InvalidInput {
            field: "results".into(),
            reason: format!(
                "{} data rows but {} results; run the engine on this table first.",
                data.len(),
                results.len()
            ),
        });
    }

    let mut out_headers: Vec<String> = headers
        .iter()
        .filter(|h| !RESULT_COLUMNS.contains(&h.trim()))
        .cloned()
        .collect();
    let keep: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !RESULT_COLUMNS.contains(&h.trim()))
        .map(|(i, _)| i)
        .collect();
    out_headers.extend(RESULT_COLUMNS.iter().map(|c| c.to_string()));

    let rows = data
        .into_iter()
        .zip(results)
        .map(|(record, result)| {
            let mut row: Vec<String> = keep
                .iter()
                .map(|&i| record.get(i).cloned().unwrap_or_default())
                .collect();
            row.extend(result_record(result));
            row
        })
        .collect();

    Ok((out_headers, rows))
}
