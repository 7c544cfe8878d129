//! Concentration limit and haircut rule engine.
//!
//! Covers:
//! 1. **Candidate limits** -- new-margin, listed-share and free-float rules
//! 2. **Resolution** -- minimum, Rp5 bn zero override, issuer caps, safety reset
//! 3. **Haircut** -- KPEI vs PEI selection and the 100% coupling with a zero limit
//! 4. **Rationale** -- ordered rule table producing one justification per row
//!
//! All arithmetic uses `rust_decimal::Decimal`. No `f64`.

pub mod candidates;
pub mod engine;
pub mod rationale;
pub mod resolution;

pub use engine::{
    calculate_concentration_limits, evaluate_security, validate_security, ConcentrationInput,
    ConcentrationOutput, ConcentrationResult, ConcentrationSummary, SecurityRow,
};
pub use rationale::{HaircutRationale, LimitRationale};
