//! Pure computation for the ranking pass: valuation and tier policy.

pub mod tier;
pub mod valuation;

pub use tier::{tier_case_sql, tier_for_rank, PERCENTILE_TIERS};
pub use valuation::{value_page, value_participant, PageValuation, Valuation, ValuationError};
