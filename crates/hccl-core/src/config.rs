//! Rule configuration for the concentration limit engine.
//!
//! Every threshold, factor and issuer list used by the engine lives here as
//! an immutable value passed into each calculation. `RuleConfig::default()`
//! reproduces the division's current policy.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::HcclError;
use crate::types::{Language, Money, Rate};
use crate::HcclResult;

/// Issuers whose limits are set by issuer profile rather than formula.
pub const DEFAULT_SPECIAL_PROFILE_CODES: [&str; 5] = ["LPKR", "MLPL", "NOBU", "PTPP", "SILO"];

/// Policy parameters for concentration limit and haircut resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Any candidate limit below this amount zeroes the final limit (Rp5 bn).
    pub threshold: Money,
    /// Multiplier applied to the computed limit of a newly margin-eligible stock.
    pub new_margin_factor: Rate,
    /// Ownership of listed shares at or above which the listed-share rule applies.
    pub listed_trigger: Rate,
    /// Fraction of listed market value allowed once the listed rule applies.
    pub listed_factor: Rate,
    /// Ownership of free float at or above which the free-float rule applies.
    pub free_float_trigger: Rate,
    /// Fraction of free-float market value allowed once the free-float rule applies.
    pub free_float_factor: Rate,
    pub special_profile_codes: BTreeSet<String>,
    /// Hard caps per security code. Only applied to non-zero limits.
    pub override_caps: BTreeMap<String, Money>,
    /// Absolute tolerance when testing a haircut for 100%.
    pub haircut_tolerance: Decimal,
    pub language: Language,
}

impl Default for RuleConfig {
    fn default() -> Self {
        let special_profile_codes = DEFAULT_SPECIAL_PROFILE_CODES
            .iter()
            .map(|c| c.to_string())
            .collect();

        let mut override_caps = BTreeMap::new();
        override_caps.insert("LPKR".to_string(), dec!(10_000_000_000));
        override_caps.insert("MLPL".to_string(), dec!(10_000_000_000));
        override_caps.insert("NOBU".to_string(), dec!(10_000_000_000));
        override_caps.insert("PTPP".to_string(), dec!(50_000_000_000));
        override_caps.insert("SILO".to_string(), dec!(10_000_000_000));

        Self {
            threshold: dec!(5_000_000_000),
            new_margin_factor: dec!(0.5),
            listed_trigger: dec!(0.05),
            listed_factor: dec!(0.0499),
            free_float_trigger: dec!(0.20),
            free_float_factor: dec!(0.1999),
            special_profile_codes,
            override_caps,
            haircut_tolerance: dec!(0.000001),
            language: Language::English,
        }
    }
}

impl RuleConfig {
    /// Check that the configuration describes a usable policy.
    pub fn validate(&self) -> HcclResult<()> {
        if self.threshold < Decimal::ZERO {
            return Err(HcclError::InvalidConfig(format!(
                "threshold must be non-negative, got {}",
                self.threshold
            )));
        }

        let unit_params = [
            ("new_margin_factor", self.new_margin_factor),
            ("listed_trigger", self.listed_trigger),
            ("listed_factor", self.listed_factor),
            ("free_float_trigger", self.free_float_trigger),
            ("free_float_factor", self.free_float_factor),
        ];
        for (name, value) in unit_params {
            if value <= Decimal::ZERO || value > Decimal::ONE {
                return Err(HcclError::InvalidConfig(format!(
                    "{name} must be in (0, 1], got {value}"
                )));
            }
        }

        for (code, cap) in &self.override_caps {
            if *cap <= Decimal::ZERO {
                return Err(HcclError::InvalidConfig(format!(
                    "override cap for '{code}' must be positive, got {cap}"
                )));
            }
        }

        if self.haircut_tolerance < Decimal::ZERO || self.haircut_tolerance >= dec!(0.01) {
            return Err(HcclError::InvalidConfig(format!(
                "haircut_tolerance must be in [0, 0.01), got {}",
                self.haircut_tolerance
            )));
        }

        Ok(())
    }

    pub fn is_special_profile(&self, code: &str) -> bool {
        self.special_profile_codes.contains(code)
    }

    pub fn override_cap(&self, code: &str) -> Option<Money> {
        self.override_caps.get(code).copied()
    }

    /// True when `haircut` is 100% within tolerance (fraction scale).
    pub fn is_full_haircut(&self, haircut: Rate) -> bool {
        (haircut - Decimal::ONE).abs() < self.haircut_tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_policy() {
        let cfg = RuleConfig::default();
        assert_eq!(cfg.threshold, dec!(5_000_000_000));
        assert_eq!(cfg.override_cap("PTPP"), Some(dec!(50_000_000_000)));
        assert_eq!(cfg.override_cap("LPKR"), Some(dec!(10_000_000_000)));
        assert_eq!(cfg.override_cap("BBCA"), None);
        assert!(cfg.is_special_profile("SILO"));
        assert!(!cfg.is_special_profile("KPIG"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_full_haircut_tolerance() {
        let cfg = RuleConfig::default();
        assert!(cfg.is_full_haircut(dec!(1)));
        assert!(cfg.is_full_haircut(dec!(0.9999999)));
        assert!(!cfg.is_full_haircut(dec!(0.99)));
    }

    #[test]
    fn test_factor_out_of_range_rejected() {
        let cfg = RuleConfig {
            listed_factor: dec!(1.5),
            ..RuleConfig::default()
        };
        match cfg.validate().unwrap_err() {
            HcclError::InvalidConfig(msg) => assert!(msg.contains("listed_factor")),
            e => panic!("Expected InvalidConfig, got {e:?}"),
        }
    }

    #[test]
    fn test_non_positive_cap_rejected() {
        let mut cfg = RuleConfig::default();
        cfg.override_caps.insert("ABCD".into(), Decimal::ZERO);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let cfg: RuleConfig =
            serde_json::from_str(r#"{ "threshold": "1000000000", "language": "indonesian" }"#)
                .unwrap();
        assert_eq!(cfg.threshold, dec!(1_000_000_000));
        assert_eq!(cfg.language, Language::Indonesian);
        assert_eq!(cfg.listed_factor, dec!(0.0499));
        assert_eq!(cfg.override_caps.len(), 5);
    }
}
