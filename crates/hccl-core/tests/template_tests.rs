#![cfg(feature = "template")]

use hccl_core::concentration::{evaluate_security, SecurityRow};
use hccl_core::template::{template_cells, CellValue, TemplateLayout};
use hccl_core::RuleConfig;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn results() -> Vec<hccl_core::concentration::ConcentrationResult> {
    let config = RuleConfig::default();
    let ok = SecurityRow {
        computed_limit: Some(dec!(6_000_000_000)),
        haircut_pei: Some(dec!(0.3)),
        ..SecurityRow::new("BBCA")
    };
    let zero = SecurityRow {
        computed_limit: Some(dec!(4_000_000_000)),
        haircut_pei: Some(dec!(0.3)),
        ..SecurityRow::new("ABCD")
    };
    vec![evaluate_security(&ok, &config), evaluate_security(&zero, &config)]
}

#[test]
fn test_default_layout_coordinates() {
    let cells = template_cells(&results(), &TemplateLayout::default()).unwrap();
    assert_eq!(cells.len(), 18);

    let addresses: Vec<(&str, &str)> = cells
        .iter()
        .take(9)
        .map(|c| (c.sheet.as_str(), c.cell.as_str()))
        .collect();
    assert_eq!(
        addresses,
        vec![
            ("HC", "C5"),
            ("HC", "R5"),
            ("HC", "T5"),
            ("CONC", "C5"),
            ("CONC", "P5"),
            ("CONC", "Q5"),
            ("CONC", "R5"),
            ("CONC", "S5"),
            ("CONC", "V5"),
        ]
    );
    assert!(cells[9..].iter().all(|c| c.row == 6));
}

#[test]
fn test_cell_values() {
    let cells = template_cells(&results(), &TemplateLayout::default()).unwrap();
    let find = |sheet: &str, cell: &str| {
        cells
            .iter()
            .find(|c| c.sheet == sheet && c.cell == cell)
            .map(|c| c.value.clone())
            .unwrap()
    };

    assert_eq!(find("HC", "C5"), CellValue::Text("BBCA".into()));
    assert_eq!(find("HC", "R5"), CellValue::Number(dec!(0.3)));
    assert_eq!(find("CONC", "S5"), CellValue::Number(dec!(6_000_000_000)));
    assert_eq!(find("CONC", "Q5"), CellValue::Empty);
    assert_eq!(find("HC", "R6"), CellValue::Number(Decimal::ONE));
    assert_eq!(
        find("CONC", "V6"),
        CellValue::Text("adjustment: concentration limit below Rp5 billion".into())
    );
}

#[test]
fn test_custom_layout_from_json() {
    let layout: TemplateLayout = serde_json::from_str(r#"{"start_row": 2, "limit_sheet": "CL"}"#).unwrap();
    assert_eq!(layout.haircut_sheet, "HC");

    let cells = template_cells(&results(), &layout).unwrap();
    assert_eq!(cells[3].sheet, "CL");
    assert_eq!(cells[3].cell, "C2");
}

#[test]
fn test_layout_past_last_row_is_an_error() {
    let layout: TemplateLayout = serde_json::from_str(r#"{"start_row": 4294967295}"#).unwrap();
    assert!(template_cells(&results(), &layout).is_err());

    // A single result still fits on the last row.
    let all = results();
    let cells = template_cells(&all[..1], &layout).unwrap();
    assert!(cells.iter().all(|c| c.row == u32::MAX));
}
