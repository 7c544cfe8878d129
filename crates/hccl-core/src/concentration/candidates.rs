use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::RuleConfig;
use crate::types::Money;

use super::engine::SecurityRow;

/// The candidate limits a security can be held to. `None` = rule not applicable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateLimits {
    pub margin: Option<Money>,
    pub listed: Option<Money>,
    pub free_float: Option<Money>,
    pub computed: Option<Money>,
}

impl CandidateLimits {
    pub fn compute(row: &SecurityRow, config: &RuleConfig) -> Self {
        let computed = row.computed_limit;

        let margin = computed.map(|limit| {
            if row.is_new_margin_stock {
                limit * config.new_margin_factor
            } else {
                limit
            }
        });

        let listed = ownership_limit(
            row.pct_of_listed,
            config.listed_trigger,
            config.listed_factor,
            row.listed_shares,
            row.closing_price,
        );

        let free_float = ownership_limit(
            row.pct_of_free_float,
            config.free_float_trigger,
            config.free_float_factor,
            row.free_float_shares,
            row.closing_price,
        );

        Self {
            margin,
            listed,
            free_float,
            computed,
        }
    }

    /// Defined candidates in rule order: margin, listed, free float, computed.
    pub fn defined(&self) -> impl Iterator<Item = Money> {
        [self.margin, self.listed, self.free_float, self.computed]
            .into_iter()
            .flatten()
    }

    /// Smallest defined candidate, or `None` when no rule applies at all.
    pub fn minimum(&self) -> Option<Money> {
        self.defined().min()
    }

    pub fn any_below(&self, threshold: Money) -> bool {
        self.defined().any(|limit| limit < threshold)
    }
}

/// `factor * shares * price` when the ownership ratio reaches the trigger.
fn ownership_limit(
    ownership: Option<Decimal>,
    trigger: Decimal,
    factor: Decimal,
    shares: Option<Decimal>,
    price: Option<Money>,
) -> Option<Money> {
    match (ownership, shares, price) {
        (Some(pct), Some(shares), Some(price)) if pct >= trigger => factor
            .checked_mul(shares)
            .and_then(|value| value.checked_mul(price)),
        _ => None,
    }
}
