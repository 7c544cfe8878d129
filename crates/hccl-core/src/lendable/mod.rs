//! Securities lending capacity per stock.
//!
//! Covers:
//! 1. **Position aggregation** -- quantity on hand and the two largest holders
//! 2. **Instrument usage** -- loan and reverse repo quantities per local code
//! 3. **Lendable limit** -- min(30% of on-hand, on-hand less top two) + 10% of repo
//! 4. **Availability** -- lendable limit less outstanding borrow positions
//!
//! All arithmetic uses `rust_decimal::Decimal`. No `f64`.

pub mod limit;
pub mod table;

pub use limit::{
    calculate_lendable_limits, BorrowLine, InstrumentLine, LendableLimitInput,
    LendableLimitOutput, LendableLimitRow, PositionLine,
};
