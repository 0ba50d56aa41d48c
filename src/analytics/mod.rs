//! Option-chain analytics.
//!
//! Provides:
//! - Delta/strike selection and vertical spread finding
//! - Spread ranking and iron condor composition

pub mod iron_condor;
pub mod option_filter;

pub use iron_condor::{best_spread, find_iron_condors, rank_by_credit_to_delta, IronCondor};
pub use option_filter::{
    ExpirationMatch, FilterError, FilterParameters, OptionChainFilter, SpreadCandidate,
};
