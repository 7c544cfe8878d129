#![cfg(feature = "concentration")]

use hccl_core::concentration::{calculate_concentration_limits, ConcentrationInput};
use hccl_core::schema::{
    augment_table, parse_security_table, COL_CODE, COL_FINAL_LIMIT, COL_LIMIT_RATIONALE,
    REQUIRED_COLUMNS, RESULT_COLUMNS,
};
use hccl_core::{HaircutScale, HcclError, RuleConfig};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

fn headers() -> Vec<String> {
    std::iter::once(COL_CODE)
        .chain(REQUIRED_COLUMNS)
        .map(str::to_string)
        .collect()
}

// Column order: code, price, listed, free float, % listed, % free float,
// computed limit, new margin, UMA, haircut KPEI, haircut PEI.
fn record(values: [&str; 11]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn upload() -> Vec<Vec<String>> {
    vec![
        record([
            "BBCA", "9,500", "123,275,050,000", "56,000,000,000", "0.01", "0.02",
            "6,000,000,000", "TIDAK", "-", "40", "30",
        ]),
        record(["", "", "", "", "", "", "", "", "", "", ""]),
        record([
            "GOTO", "70", "1,200,000,000,000", "900,000,000,000", "0.001", "0.002",
            "20,000,000,000", "YA", "2024-05-02", "50", "100",
        ]),
    ]
}

#[test]
fn test_parse_exact_headers_and_detect_percent() {
    let table = parse_security_table(&headers(), &upload(), HaircutScale::Auto).unwrap();

    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.haircut_scale, HaircutScale::Percent);
    assert_eq!(table.warnings.len(), 1);

    let bbca = &table.rows[0];
    assert_eq!(bbca.code, "BBCA");
    assert_eq!(bbca.closing_price, Some(dec!(9500)));
    assert_eq!(bbca.haircut_pei, Some(dec!(0.3)));
    assert_eq!(bbca.uma_flag.as_deref(), Some("-"));
    assert!(!bbca.has_uma());

    let goto = &table.rows[1];
    assert!(goto.is_new_margin_stock);
    assert!(goto.has_uma());
    assert_eq!(goto.haircut_kpei, Some(dec!(0.5)));
}

#[test]
fn test_explicit_fraction_scale_is_not_rescaled() {
    let table = parse_security_table(&headers(), &upload(), HaircutScale::Fraction).unwrap();
    assert_eq!(table.haircut_scale, HaircutScale::Fraction);
    assert_eq!(table.rows[0].haircut_pei, Some(dec!(30)));
    assert!(table.warnings.is_empty());
}

#[test]
fn test_missing_required_column() {
    let headers: Vec<String> = headers()
        .into_iter()
        .filter(|h| h != "HAIRCUT PEI")
        .collect();
    match parse_security_table(&headers, &upload(), HaircutScale::Auto).unwrap_err() {
        HcclError::MissingColumn { column } => assert_eq!(column, "HAIRCUT PEI"),
        e => panic!("Expected MissingColumn, got {e:?}"),
    }
}

#[test]
fn test_code_falls_back_to_first_column() {
    let mut headers = headers();
    headers[0] = "Kode".into();
    let table = parse_security_table(&headers, &upload(), HaircutScale::Auto).unwrap();
    assert_eq!(table.rows[1].code, "GOTO");
}

#[test]
fn test_augment_appends_result_columns() {
    let headers = headers();
    let records = upload();
    let table = parse_security_table(&headers, &records, HaircutScale::Auto).unwrap();
    let out = calculate_concentration_limits(&ConcentrationInput {
        rows: table.rows,
        config: RuleConfig::default(),
    })
    .unwrap();

    let (out_headers, rows) = augment_table(&headers, &records, &out.result.rows).unwrap();

    assert_eq!(out_headers.len(), headers.len() + RESULT_COLUMNS.len());
    assert_eq!(rows.len(), 2);

    let final_idx = out_headers.iter().position(|h| h == COL_FINAL_LIMIT).unwrap();
    let rationale_idx = out_headers
        .iter()
        .position(|h| h == COL_LIMIT_RATIONALE)
        .unwrap();
    assert_eq!(rows[0][0], "BBCA");
    assert_eq!(rows[0][final_idx], "6000000000");
    assert_eq!(rows[0][rationale_idx], "per calculation method");
    // GOTO: 100% PEI haircut is irrelevant under UMA; KPEI 50% applies.
    assert_eq!(rows[1][rationale_idx], "adjustment: newly margin-eligible stock");
}

#[test]
fn test_augment_replaces_existing_result_columns() {
    let mut headers = headers();
    headers.push(COL_FINAL_LIMIT.to_string());
    let records: Vec<Vec<String>> = upload()
        .into_iter()
        .map(|mut r| {
            let blank = r.iter().all(|c| c.is_empty());
            r.push(if blank { String::new() } else { "stale".into() });
            r
        })
        .collect();
    let table = parse_security_table(&headers, &records, HaircutScale::Auto).unwrap();
    let out = calculate_concentration_limits(&ConcentrationInput {
        rows: table.rows,
        config: RuleConfig::default(),
    })
    .unwrap();

    let (out_headers, rows) = augment_table(&headers, &records, &out.result.rows).unwrap();
    assert_eq!(
        out_headers.iter().filter(|h| *h == COL_FINAL_LIMIT).count(),
        1
    );
    assert!(rows.iter().all(|r| !r.contains(&"stale".to_string())));
}

#[test]
fn test_augment_rejects_mismatched_results() {
    assert!(augment_table(&headers(), &upload(), &[]).is_err());
}

#[test]
fn test_percent_sign_cells_are_not_rescaled() {
    let mut records = upload();
    records[2][8] = "-".into();
    records[2][10] = "100%".into();

    let table = parse_security_table(&headers(), &records, HaircutScale::Auto).unwrap();
    assert_eq!(table.haircut_scale, HaircutScale::Percent);
    assert_eq!(table.rows[0].haircut_pei, Some(dec!(0.3)));
    assert_eq!(table.rows[1].haircut_pei, Some(dec!(1)));
    assert_eq!(table.rows[1].haircut_kpei, Some(dec!(0.5)));

    let out = calculate_concentration_limits(&ConcentrationInput {
        rows: table.rows,
        config: RuleConfig::default(),
    })
    .unwrap();
    let goto = &out.result.rows[1];
    assert_eq!(goto.final_limit, rust_decimal::Decimal::ZERO);
    assert_eq!(goto.final_haircut, Some(dec!(1)));
}

#[test]
fn test_only_percent_sign_cells_keep_fraction_scale() {
    let mut records = upload();
    records[0][9] = "40%".into();
    records[0][10] = "30%".into();
    records[2][9] = "50%".into();
    records[2][10] = "100%".into();

    let table = parse_security_table(&headers(), &records, HaircutScale::Auto).unwrap();
    assert_eq!(table.haircut_scale, HaircutScale::Fraction);
    assert!(table.warnings.is_empty());
    assert_eq!(table.rows[0].haircut_pei, Some(dec!(0.3)));
    assert_eq!(table.rows[1].haircut_pei, Some(dec!(1)));
}
