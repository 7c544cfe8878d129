#![cfg(feature = "concentration")]

use hccl_core::concentration::{
    calculate_concentration_limits, evaluate_security, validate_security, ConcentrationInput,
    LimitRationale, SecurityRow,
};
use hccl_core::{HcclError, RuleConfig};
use proptest::prelude::*;
use rust_decimal::Decimal;

const CODES: [&str; 6] = ["BBCA", "TLKM", "PTPP", "NOBU", "LPKR", "ASII"];

fn decimal(range: std::ops::Range<i64>, scale: u32) -> impl Strategy<Value = Decimal> {
    range.prop_map(move |n| Decimal::new(n, scale))
}

prop_compose! {
    fn arb_row()(
        code in prop::sample::select(CODES.to_vec()),
        price in prop::option::of(decimal(1..100_000, 0)),
        listed in prop::option::of(decimal(1_000_000..100_000_000_000, 0)),
        free_float in prop::option::of(decimal(1_000_000..50_000_000_000, 0)),
        pct_listed in prop::option::of(decimal(0..2_000, 4)),
        pct_free_float in prop::option::of(decimal(0..5_000, 4)),
        computed in prop::option::of(decimal(0..50_000, 0)),
        new_margin in any::<bool>(),
        uma in prop::option::of(prop::sample::select(vec!["2024-01-02", "-", "", "YA"])),
        kpei in prop::option::of(decimal(0..101, 2)),
        pei in prop::option::of(decimal(0..101, 2)),
    ) -> SecurityRow {
        SecurityRow {
            code: code.to_string(),
            closing_price: price,
            listed_shares: listed,
            free_float_shares: free_float,
            pct_of_listed: pct_listed,
            pct_of_free_float: pct_free_float,
            // Up to Rp50 bn in Rp1 mn steps.
            computed_limit: computed.map(|c| c * Decimal::new(1_000_000, 0)),
            is_new_margin_stock: new_margin,
            uma_flag: uma.map(str::to_string),
            haircut_kpei: kpei,
            haircut_pei: pei,
        }
    }
}

proptest! {
    #[test]
    fn evaluation_is_deterministic(row in arb_row()) {
        let config = RuleConfig::default();
        prop_assert_eq!(evaluate_security(&row, &config), evaluate_security(&row, &config));
    }

    #[test]
    fn final_limit_is_zero_or_at_least_threshold(row in arb_row()) {
        let config = RuleConfig::default();
        let r = evaluate_security(&row, &config);
        prop_assert!(r.final_limit >= Decimal::ZERO);
        prop_assert!(r.final_limit.is_zero() || r.final_limit >= config.threshold);
    }

    #[test]
    fn zero_limit_forces_full_haircut(row in arb_row()) {
        let r = evaluate_security(&row, &RuleConfig::default());
        if r.final_limit.is_zero() {
            prop_assert_eq!(r.final_haircut, Some(Decimal::ONE));
        }
    }

    #[test]
    fn capped_codes_never_exceed_cap(row in arb_row()) {
        let config = RuleConfig::default();
        let r = evaluate_security(&row, &config);
        if let Some(cap) = config.override_cap(&r.code) {
            prop_assert!(r.final_limit <= cap);
        }
    }

    #[test]
    fn final_limit_never_exceeds_smallest_candidate(row in arb_row()) {
        let r = evaluate_security(&row, &RuleConfig::default());
        let smallest = [
            r.limit_from_margin_rule,
            r.limit_from_listed_rule,
            r.limit_from_freefloat_rule,
            r.computed_limit,
        ]
        .into_iter()
        .flatten()
        .min();
        match smallest {
            Some(m) => prop_assert!(r.final_limit <= m.round_dp(0)),
            None => prop_assert!(r.final_limit.is_zero()),
        }
    }

    #[test]
    fn below_threshold_wording_only_on_zero_limit(row in arb_row()) {
        let r = evaluate_security(&row, &RuleConfig::default());
        if r.limit_rationale == LimitRationale::BelowThreshold
            || r.limit_rationale == LimitRationale::FullHaircut
        {
            prop_assert!(r.final_limit.is_zero());
        }
    }

    #[test]
    fn fraction_scale_rows_pass_validation(row in arb_row()) {
        prop_assert!(validate_security(&row, &RuleConfig::default()).is_ok());
    }

    #[test]
    fn haircuts_above_one_are_rejected(
        row in arb_row(),
        haircut in decimal(101..10_001, 2),
        on_pei in any::<bool>(),
    ) {
        let row = if on_pei {
            SecurityRow { haircut_pei: Some(haircut), ..row }
        } else {
            SecurityRow { haircut_kpei: Some(haircut), ..row }
        };
        let expected_field = if on_pei { "haircut_pei" } else { "haircut_kpei" };

        prop_assert!(validate_security(&row, &RuleConfig::default()).is_err());
        let input = ConcentrationInput { rows: vec![row], config: RuleConfig::default() };
        let rejected = matches!(
            calculate_concentration_limits(&input),
            Err(HcclError::InvalidInput { ref field, .. }) if field == expected_field
        );
        prop_assert!(rejected);
    }
}
