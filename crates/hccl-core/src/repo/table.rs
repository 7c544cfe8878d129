//! Reading the repo position report and the daily fair price file.
//!
//! The position report carries multi-line headers; line breaks inside a
//! header are read as spaces. Lines without an instrument code or nominal
//! amount are skipped, as are price lines without an ISIN or price.

use std::collections::BTreeMap;

use crate::error::HcclError;
use crate::numeric::parse_number;
use crate::HcclResult;

use super::position::{FairPriceQuote, RepoDailyOutput, RepoPosition};

pub const COL_INSTRUMENT_CODE: &str = "Instrument Code";
pub const COL_NOMINAL_AMOUNT: &str = "Nominal Amount";
pub const COL_ISIN_CODE: &str = "ISIN CODE";
pub const COL_TODAY_FAIR_PRICE: &str = "TODAY FAIR PRICE";

/// Header as matched: line breaks become spaces, outer whitespace dropped.
pub fn clean_header(header: &str) -> String {
    header
        .trim_start_matches('\u{feff}')
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .trim()
        .to_string()
}

fn require(headers: &[String], name: &str) -> HcclResult<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| HcclError::MissingColumn {
            column: name.to_string(),
        })
}

fn cell(record: &[String], i: usize) -> &str {
    record.get(i).map(|c| c.trim()).unwrap_or("")
}

pub fn parse_repo_positions(
    headers: &[String],
    records: &[Vec<String>],
) -> HcclResult<Vec<RepoPosition>> {
    let headers: Vec<String> = headers.iter().map(|h| clean_header(h)).collect();
    let code = require(&headers, COL_INSTRUMENT_CODE)?;
    let nominal = require(&headers, COL_NOMINAL_AMOUNT)?;

    let mut positions = Vec::new();
    for (line, record) in records.iter().enumerate() {
        if cell(record, code).is_empty() || cell(record, nominal).is_empty() {
            continue;
        }
        let nominal_amount =
            parse_number(cell(record, nominal)).ok_or_else(|| HcclError::InvalidInput {
                field: COL_NOMINAL_AMOUNT.into(),
                reason: format!(
                    "'{}' on data line {} is not a number.",
                    cell(record, nominal),
                    line + 1
                ),
            })?;
        let details: BTreeMap<String, String> = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !h.is_empty())
            .map(|(i, h)| (h.clone(), cell(record, i).to_string()))
            .collect();
        positions.push(RepoPosition {
            instrument_code: cell(record, code).to_string(),
            nominal_amount,
            details,
        });
    }
    Ok(positions)
}

pub fn parse_fair_prices(
    headers: &[String],
    records: &[Vec<String>],
) -> HcclResult<Vec<FairPriceQuote>> {
    let headers: Vec<String> = headers.iter().map(|h| clean_header(h)).collect();
    let isin = require(&headers, COL_ISIN_CODE)?;
    let price = require(&headers, COL_TODAY_FAIR_PRICE)?;

    Ok(records
        .iter()
        .filter(|r| !cell(r, isin).is_empty() && !cell(r, price).is_empty())
        .map(|r| FairPriceQuote {
            isin_code: cell(r, isin).to_string(),
            today_fair_price: parse_number(cell(r, price)),
        })
        .collect())
}

/// The position report with a fair price column appended, one line per row.
pub fn result_table(
    headers: &[String],
    output: &RepoDailyOutput,
) -> (Vec<String>, Vec<Vec<String>>) {
    let mut out_headers: Vec<String> = headers
        .iter()
        .map(|h| clean_header(h))
        .filter(|h| !h.is_empty() && h != COL_TODAY_FAIR_PRICE)
        .collect();

    let rows = output
        .rows
        .iter()
        .map(|row| {
            let mut line: Vec<String> = out_headers
                .iter()
                .map(|h| row.details.get(h).cloned().unwrap_or_default())
                .collect();
            line.push(
                row.today_fair_price
                    .map(|p| p.normalize().to_string())
                    .unwrap_or_default(),
            );
            line
        })
        .collect();

    out_headers.push(COL_TODAY_FAIR_PRICE.to_string());
    (out_headers, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_multiline_headers_are_joined() {
        assert_eq!(clean_header("Nominal\nAmount "), "Nominal Amount");
        assert_eq!(clean_header("Instrument\r\nCode"), "Instrument Code");
    }

    #[test]
    fn test_positions_skip_incomplete_lines() {
        let headers = strings(&["No", "Instrument\nCode", "Nominal\nAmount"]);
        let records = vec![
            strings(&["1", "IDG000012345", "5,000,000,000"]),
            strings(&["2", "", "1,000"]),
            strings(&["3", "IDA000099999", ""]),
            strings(&["Total"]),
        ];
        let positions = parse_repo_positions(&headers, &records).unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].nominal_amount, dec!(5_000_000_000));
        assert_eq!(positions[0].details["No"], "1");
    }

    #[test]
    fn test_text_nominal_rejected() {
        let headers = strings(&["Instrument Code", "Nominal Amount"]);
        let records = vec![strings(&["IDG000012345", "five"])];
        match parse_repo_positions(&headers, &records).unwrap_err() {
            HcclError::InvalidInput { field, .. } => assert_eq!(field, COL_NOMINAL_AMOUNT),
            e => panic!("Expected InvalidInput, got {e:?}"),
        }
    }

    #[test]
    fn test_price_file_requires_isin() {
        let headers = strings(&["SERIES", "TODAY FAIR PRICE"]);
        match parse_fair_prices(&headers, &[]).unwrap_err() {
            HcclError::MissingColumn { column } => assert_eq!(column, COL_ISIN_CODE),
            e => panic!("Expected MissingColumn, got {e:?}"),
        }
    }

    #[test]
    fn test_non_numeric_price_kept_as_none() {
        let headers = strings(&[" ISIN CODE ", "TODAY FAIR PRICE"]);
        let records = vec![
            strings(&["IDG000012345", "N/A"]),
            strings(&["IDA000099999", ""]),
        ];
        let quotes = parse_fair_prices(&headers, &records).unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].today_fair_price, None);
    }
}
