//! Fixed-layout projection of engine results onto the HC / CONC report template.
//!
//! The engine output stays a plain table; this module only decides which
//! cell of which sheet each value lands in. Writing the workbook itself is
//! left to the caller.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::concentration::ConcentrationResult;
use crate::error::HcclError;
use crate::HcclResult;

/// Column numbers (1-based) on the haircut sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HaircutSheetColumns {
    pub code: u32,
    pub final_haircut: u32,
    pub rationale: u32,
}

/// Column numbers (1-based) on the concentration limit sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitSheetColumns {
    pub code: u32,
    pub margin_limit: u32,
    pub listed_limit: u32,
    pub free_float_limit: u32,
    pub final_limit: u32,
    pub rationale: u32,
}

/// Where results are written in the report template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateLayout {
    /// First data row (1-based).
    pub start_row: u32,
    pub haircut_sheet: String,
    pub limit_sheet: String,
    pub haircut_columns: HaircutSheetColumns,
    pub limit_columns: LimitSheetColumns,
}

impl Default for TemplateLayout {
    fn default() -> Self {
        Self {
            start_row: 5,
            haircut_sheet: "HC".into(),
            limit_sheet: "CONC".into(),
            haircut_columns: HaircutSheetColumns {
                code: 3,           // C
                final_haircut: 18, // R
                rationale: 20,     // T
            },
            limit_columns: LimitSheetColumns {
                code: 3,              // C
                margin_limit: 16,     // P
                listed_limit: 17,     // Q
                free_float_limit: 18, // R
                final_limit: 19,      // S
                rationale: 22,        // V
            },
        }
    }
}

impl TemplateLayout {
    pub fn validate(&self) -> HcclResult<()> {
        if self.start_row == 0 {
            return Err(HcclError::InvalidInput {
                field: "start_row".into(),
                reason: "Rows are 1-based; start_row must be at least 1.".into(),
            });
        }
        let columns = [
            self.haircut_columns.code,
            self.haircut_columns.final_haircut,
            self.haircut_columns.rationale,
            self.limit_columns.code,
            self.limit_columns.margin_limit,
            self.limit_columns.listed_limit,
            self.limit_columns.free_float_limit,
            self.limit_columns.final_limit,
            self.limit_columns.rationale,
        ];
        if columns.contains(&0) {
            return Err(HcclError::InvalidInput {
                field: "columns".into(),
                reason: "Columns are 1-based; 0 is not a column.".into(),
            });
        }
        if self.haircut_sheet.trim().is_empty() || self.limit_sheet.trim().is_empty() {
            return Err(HcclError::InvalidInput {
                field: "sheet".into(),
                reason: "Sheet names must not be empty.".into(),
            });
        }
        Ok(())
    }
}

/// Value written to a single cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(Decimal),
    Text(String),
    Empty,
}

impl From<Option<Decimal>> for CellValue {
    fn from(value: Option<Decimal>) -> Self {
        value.map(CellValue::Number).unwrap_or(CellValue::Empty)
    }
}

/// One cell assignment in A1 notation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellWrite {
    pub sheet: String,
    pub cell: String,
    pub row: u32,
    pub column: u32,
    pub value: CellValue,
}

/// Spreadsheet column letters for a 1-based column number (1 = A, 27 = AA).
pub fn column_letter(column: u32) -> String {
    let mut n = column;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

fn write(sheet: &str, row: u32, column: u32, value: CellValue) -> CellWrite {
    CellWrite {
        sheet: sheet.to_string(),
        cell: format!("{}{}", column_letter(column), row),
        row,
        column,
        value,
    }
}

/// Cell writes for every result: the haircut sheet cells first, then the
/// limit sheet cells, one template row per security.
pub fn template_cells(
    results: &[ConcentrationResult],
    layout: &TemplateLayout,
) -> HcclResult<Vec<CellWrite>> {
    layout.validate()?;

    let hc = &layout.haircut_columns;
    let cl = &layout.limit_columns;
    let mut cells = Vec::with_capacity(results.len() * 9);

    for (offset, r) in results.iter().enumerate() {
        let row = u32::try_from(offset)
            .ok()
            .and_then(|offset| layout.start_row.checked_add(offset))
            .ok_or_else(|| HcclError::InvalidInput {
                field: "start_row".into(),
                reason: format!(
                    "{} results starting at row {} run past the last sheet row.",
                    results.len(),
                    layout.start_row
                ),
            })?;
        let hs = layout.haircut_sheet.as_str();
        let ls = layout.limit_sheet.as_str();

        cells.push(write(hs, row, hc.code, CellValue::Text(r.code.clone())));
        cells.push(write(hs, row, hc.final_haircut, r.final_haircut.into()));
        cells.push(write(
            hs,
            row,
            hc.rationale,
            CellValue::Text(r.haircut_rationale_text.clone()),
        ));

        cells.push(write(ls, row, cl.code, CellValue::Text(r.code.clone())));
        cells.push(write(ls, row, cl.margin_limit, r.limit_from_margin_rule.into()));
        cells.push(write(ls, row, cl.listed_limit, r.limit_from_listed_rule.into()));
        cells.push(write(
            ls,
            row,
            cl.free_float_limit,
            r.limit_from_freefloat_rule.into(),
        ));
        cells.push(write(ls, row, cl.final_limit, Some(r.final_limit).into()));
        cells.push(write(
            ls,
            row,
            cl.rationale,
            CellValue::Text(r.limit_rationale_text.clone()),
        ));
    }

    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(3), "C");
        assert_eq!(column_letter(22), "V");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(52), "AZ");
        assert_eq!(column_letter(703), "AAA");
    }

    #[test]
    fn test_zero_start_row_rejected() {
        let layout = TemplateLayout {
            start_row: 0,
            ..TemplateLayout::default()
        };
        assert!(template_cells(&[], &layout).is_err());
    }

    #[test]
    fn test_start_row_overflow_rejected() {
        let layout = TemplateLayout {
            start_row: u32::MAX,
            ..TemplateLayout::default()
        };
        let results = vec![
            crate::concentration::evaluate_security(
                &crate::concentration::SecurityRow::new("AAAA"),
                &crate::RuleConfig::default(),
            ),
            crate::concentration::evaluate_security(
                &crate::concentration::SecurityRow::new("BBBB"),
                &crate::RuleConfig::default(),
            ),
        ];
        match template_cells(&results, &layout).unwrap_err() {
            HcclError::InvalidInput { field, .. } => assert_eq!(field, "start_row"),
            e => panic!("Expected InvalidInput, got {e:?}"),
        }
    }
}
