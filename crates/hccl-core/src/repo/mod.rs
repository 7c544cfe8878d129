//! Daily position of reverse repo bonds.
//!
//! Covers:
//! 1. **Position report** -- instrument code and nominal amount per line
//! 2. **Fair price lookup** -- today's fair price per ISIN from the daily price file
//! 3. **Merge** -- left join of positions on ISIN, price scaled by 10^12
//!
//! All arithmetic uses `rust_decimal::Decimal`. No `f64`.

pub mod position;
pub mod table;

pub use position::{
    calculate_repo_daily_position, FairPriceQuote, RepoDailyInput, RepoDailyOutput,
    RepoPosition, RepoPositionRow, FAIR_PRICE_DIVISOR,
};
