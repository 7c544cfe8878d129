#![cfg(feature = "lendable")]

use hccl_core::lendable::table::{parse_borrows, parse_instruments};
use hccl_core::lendable::{
    calculate_lendable_limits, BorrowLine, InstrumentLine, LendableLimitInput, PositionLine,
};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn position(code: &str, quantity: Decimal) -> PositionLine {
    PositionLine {
        stock_code: code.into(),
        quantity,
    }
}

fn instrument(code: &str, loan: Decimal, repo: Decimal) -> InstrumentLine {
    InstrumentLine {
        local_code: code.into(),
        stock_name: Some(format!("{code} Tbk")),
        used_loan_qty: loan,
        used_reverse_repo_qty: repo,
    }
}

fn sample_input() -> LendableLimitInput {
    LendableLimitInput::new(
        vec![
            position("BBCA", dec!(500)),
            position("BBCA", dec!(300)),
            position("BBCA", dec!(200)),
            position("BBCA", dec!(1000)),
            position("IPPE", dec!(9000)),
        ],
        vec![
            instrument("BBCA", dec!(10), dec!(1500)),
            instrument("BBCA", dec!(0), dec!(500)),
            instrument("IPPE", dec!(100), dec!(100)),
            instrument("TLKM", dec!(0), dec!(0)),
            instrument("ASII", dec!(5), dec!(0)),
        ],
        vec![
            BorrowLine {
                stock_code: "BBCA".into(),
                borrow_amount: dec!(100),
            },
            BorrowLine {
                stock_code: "XXXX".into(),
                borrow_amount: dec!(1),
            },
        ],
    )
}

#[test]
fn test_lendable_limit_arithmetic() {
    let out = calculate_lendable_limits(&sample_input()).unwrap();
    let bbca = out
        .result
        .rows
        .iter()
        .find(|r| r.stock_code == "BBCA")
        .unwrap();

    assert_eq!(bbca.stock_name, "BBCA Tbk");
    assert_eq!(bbca.quantity_on_hand, dec!(2000));
    assert_eq!(bbca.first_largest, dec!(1000));
    assert_eq!(bbca.second_largest, dec!(500));
    assert_eq!(bbca.total_two_largest, dec!(1500));
    assert_eq!(bbca.quantity_available, dec!(500));
    assert_eq!(bbca.thirty_percent_on_hand, dec!(600));
    assert_eq!(bbca.repo, dec!(200));
    // min(600, 500) + 200
    assert_eq!(bbca.lendable_limit, dec!(700));
    assert_eq!(bbca.borrow_position, dec!(100));
    assert_eq!(bbca.available_lendable_limit, dec!(600));
    assert!(bbca.published);
}

#[test]
fn test_blacklist_and_unused_stocks_excluded() {
    let out = calculate_lendable_limits(&sample_input()).unwrap();
    let codes: Vec<&str> = out.result.rows.iter().map(|r| r.stock_code.as_str()).collect();
    assert_eq!(codes, vec!["ASII", "BBCA"]);
}

#[test]
fn test_stock_without_positions_is_not_published() {
    let out = calculate_lendable_limits(&sample_input()).unwrap();
    let asii = &out.result.rows[0];
    assert_eq!(asii.lendable_limit, Decimal::ZERO);
    assert!(!asii.published);
    assert_eq!(out.result.published_count, 1);
    assert_eq!(out.result.total_available_lendable_limit, dec!(600));
}

#[test]
fn test_warnings_for_unknown_borrows_and_overdraw() {
    let mut input = sample_input();
    input.borrows[0].borrow_amount = dec!(1000);
    let out = calculate_lendable_limits(&input).unwrap();

    assert!(out.warnings.iter().any(|w| w.contains("XXXX")));
    assert!(out
        .warnings
        .iter()
        .any(|w| w.starts_with("BBCA") && w.contains("exceeds")));
    let bbca = out
        .result
        .rows
        .iter()
        .find(|r| r.stock_code == "BBCA")
        .unwrap();
    assert_eq!(bbca.available_lendable_limit, dec!(-300));
    // Lendable limit is still positive, so the row stays published.
    assert!(bbca.published);
}

#[test]
fn test_custom_blacklist_from_json() {
    let json = r#"{
        "positions": [{"stock_code": "IPPE", "quantity": "1000"}],
        "instruments": [{"local_code": "IPPE", "used_loan_qty": "10"}],
        "blacklist": []
    }"#;
    let input: LendableLimitInput = serde_json::from_str(json).unwrap();
    assert_eq!(input.on_hand_factor, dec!(0.30));

    let out = calculate_lendable_limits(&input).unwrap();
    assert_eq!(out.result.rows.len(), 1);
    // Single holder owns everything: nothing is available beyond the top two.
    assert_eq!(out.result.rows[0].lendable_limit, Decimal::ZERO);
}

#[test]
fn test_tables_feed_the_calculation() {
    let s = |v: &[&str]| v.iter().map(|c| c.to_string()).collect::<Vec<_>>();
    let instruments = parse_instruments(
        &s(&["Local Code", "Stock Name", "Used Loan Qty", "Used Reverse Repo Qty"]),
        &[s(&["BBCA", "Bank Central Asia", "1,000", "0"])],
    )
    .unwrap();
    let borrows = parse_borrows(
        &s(&["Stock Code", "Borrow Amount (shares)"]),
        &[s(&["BBCA", "50"])],
    )
    .unwrap();
    let positions = vec![
        position("BBCA", dec!(10_000)),
        position("BBCA", dec!(5_000)),
        position("BBCA", dec!(2_000)),
        position("BBCA", dec!(3_000)),
    ];

    let out = calculate_lendable_limits(&LendableLimitInput::new(positions, instruments, borrows))
        .unwrap();
    let row = &out.result.rows[0];
    // min(0.3 * 20000, 20000 - 15000) = 5000
    assert_eq!(row.lendable_limit, dec!(5000));
    assert_eq!(row.available_lendable_limit, dec!(4950));
    assert_eq!(row.stock_name, "Bank Central Asia");
}
