//! Reading lendable limit inputs from uploaded report tables.
//!
//! The back-office exports are positional: the stock position detail keeps
//! the stock code in the second column and the quantity in the eleventh.
//! Named headers are preferred when present; positions are the fallback.
//! Unparseable quantities count as zero, matching how the reports are read.

use rust_decimal::Decimal;

use crate::error::HcclError;
use crate::numeric::parse_number;
use crate::HcclResult;

use super::limit::{BorrowLine, InstrumentLine, PositionLine};

pub const COL_STOCK_CODE: &str = "Stock Code";
pub const COL_QUANTITY: &str = "Quantity";
pub const COL_LOCAL_CODE: &str = "Local Code";
pub const COL_STOCK_NAME: &str = "Stock Name";
pub const COL_USED_LOAN: &str = "Used Loan Qty";
pub const COL_USED_REPO: &str = "Used Reverse Repo Qty";
pub const COL_BORROW_AMOUNT: &str = "Borrow Amount (shares)";

const POSITION_CODE_INDEX: usize = 1;
const POSITION_QUANTITY_INDEX: usize = 10;

fn find(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

fn require(headers: &[String], name: &str) -> HcclResult<usize> {
    find(headers, name).ok_or_else(|| HcclError::MissingColumn {
        column: name.to_string(),
    })
}

fn cell(record: &[String], i: usize) -> &str {
    record.get(i).map(|c| c.trim()).unwrap_or("")
}

fn quantity(record: &[String], i: usize) -> Decimal {
    parse_number(cell(record, i)).unwrap_or(Decimal::ZERO)
}

pub fn parse_positions(headers: &[String], records: &[Vec<String>]) -> HcclResult<Vec<PositionLine>> {
    let code = find(headers, COL_STOCK_CODE).unwrap_or(POSITION_CODE_INDEX);
    let qty = find(headers, COL_QUANTITY).unwrap_or(POSITION_QUANTITY_INDEX);
    if headers.len() <= code.max(qty) {
        return Err(HcclError::MissingColumn {
            column: format!("{COL_STOCK_CODE} / {COL_QUANTITY}"),
        });
    }

    Ok(records
        .iter()
        .filter(|r| !cell(r, code).is_empty())
        .map(|r| PositionLine {
            stock_code: cell(r, code).to_string(),
            quantity: quantity(r, qty),
        })
        .collect())
}

pub fn parse_instruments(
    headers: &[String],
    records: &[Vec<String>],
) -> HcclResult<Vec<InstrumentLine>> {
    let code = require(headers, COL_LOCAL_CODE)?;
    let loan = require(headers, COL_USED_LOAN)?;
    let repo = require(headers, COL_USED_REPO)?;
    let name = find(headers, COL_STOCK_NAME);

    Ok(records
        .iter()
        .filter(|r| !cell(r, code).is_empty())
        .map(|r| InstrumentLine {
            local_code: cell(r, code).to_string(),
            stock_name: name.map(|i| cell(r, i).to_string()),
            used_loan_qty: quantity(r, loan),
            used_reverse_repo_qty: quantity(r, repo),
        })
        .collect())
}

pub fn parse_borrows(headers: &[String], records: &[Vec<String>]) -> HcclResult<Vec<BorrowLine>> {
    if headers.is_empty() {
        return Err(HcclError::MissingColumn {
            column: COL_STOCK_CODE.to_string(),
        });
    }
    let code = find(headers, COL_STOCK_CODE).unwrap_or(0);
    let amount = require(headers, COL_BORROW_AMOUNT)?;

    Ok(records
        .iter()
        .filter(|r| !cell(r, code).is_empty())
        .map(|r| BorrowLine {
            stock_code: cell(r, code).to_string(),
            borrow_amount: quantity(r, amount),
        })
        .collect())
}
