//! Option-chain filtering and vertical spread construction.
//!
//! Two entry points:
//! - [`OptionChainFilter::select`] flattens a chain and keeps contracts inside
//!   a delta band and strike range (display filtering).
//! - [`OptionChainFilter::find_spreads`] pairs qualifying short legs with every
//!   valid long leg in the same expiration bucket:
//!   - short leg: delta band, open interest, distance from the underlying,
//!     categorical fields
//!   - long leg: positive mark, correct side of the short strike, width cap,
//!     minimum credit, categorical fields, open interest
//!
//! Pairing is any-to-any within an expiration (O(S²) per bucket), so every
//! width-bounded pair is returned, not just adjacent strikes. Ranking is left
//! to the caller.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::data::{ChainBuckets, ExpirationKey, OptionContract, OptionType};

/// Contract multiplier used to express per-share credit in dollars.
const CONTRACT_MULTIPLIER: Decimal = Decimal::ONE_HUNDRED;

/// Filter errors. Only caller contract violations surface here; contracts
/// that merely fail a predicate are excluded silently.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Underlying price is required for distance filtering")]
    MissingUnderlyingPrice,

    #[error("Underlying price must be positive, got {0}")]
    InvalidUnderlyingPrice(Decimal),
}

/// How expiration bucket keys are matched against the target date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpirationMatch {
    /// The key's parsed `YYYY-MM-DD` prefix equals the target date.
    #[default]
    Exact,
    /// The key contains the formatted target date anywhere.
    Substring,
}

/// Configuration for one filter invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParameters {
    /// Target expiration date.
    pub expiration_date: NaiveDate,
    /// Current underlying price (required for spread finding).
    pub underlying_price: Option<Decimal>,
    /// Required expiration type, if any.
    pub expiration_type: Option<String>,
    /// Required settlement type, if any.
    pub settlement_type: Option<String>,
    /// Required option root, if any.
    pub option_root: Option<String>,
    /// Minimum absolute delta.
    pub min_delta: f64,
    /// Maximum absolute delta.
    pub max_delta: f64,
    /// Maximum spread width in strike points.
    pub max_spread: Decimal,
    /// Minimum credit in dollars per contract (per-share credit x 100).
    pub min_credit: Decimal,
    /// Minimum open interest on both legs.
    pub min_open_interest: u64,
    /// Minimum fractional distance of the short strike from the underlying.
    pub dist_from_strike: f64,
    /// Contracts per spread.
    pub quantity: u32,
    /// Lower strike bound for `select`.
    pub min_strike: Option<Decimal>,
    /// Upper strike bound for `select`.
    pub max_strike: Option<Decimal>,
    /// Expiration key matching mode.
    pub expiration_match: ExpirationMatch,
}

impl Default for FilterParameters {
    fn default() -> Self {
        Self {
            expiration_date: NaiveDate::default(),
            underlying_price: None,
            expiration_type: None,
            settlement_type: None,
            option_root: None,
            min_delta: 0.0,
            max_delta: 0.15,
            max_spread: Decimal::from(20),
            min_credit: Decimal::ZERO,
            min_open_interest: 0,
            dist_from_strike: 0.0,
            quantity: 1,
            min_strike: None,
            max_strike: None,
            expiration_match: ExpirationMatch::Exact,
        }
    }
}

impl FilterParameters {
    /// Default parameters for the given expiration.
    pub fn new(expiration_date: NaiveDate) -> Self {
        Self {
            expiration_date,
            ..Default::default()
        }
    }
}

/// A two-leg vertical spread candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadCandidate {
    /// Sold leg.
    pub short_option: OptionContract,
    /// Bought leg.
    pub long_option: OptionContract,
    /// Net credit per share (short mark - long mark).
    pub credit: Decimal,
    /// Short leg delta (signed, 0.0 when unknown).
    pub delta: f64,
    /// Absolute strike distance between the legs.
    pub spread_width: Decimal,
    /// Contracts per leg.
    pub quantity: u32,
}

impl SpreadCandidate {
    /// Credit in dollars for the whole position.
    pub fn total_credit(&self) -> Decimal {
        self.credit * CONTRACT_MULTIPLIER * Decimal::from(self.quantity)
    }

    /// Maximum loss in dollars for the whole position.
    pub fn max_loss(&self) -> Decimal {
        (self.spread_width - self.credit) * CONTRACT_MULTIPLIER * Decimal::from(self.quantity)
    }

    /// Credit received per unit of short delta.
    pub fn credit_to_delta(&self) -> f64 {
        let delta = self.delta.abs();
        if delta > 0.0 {
            self.credit.to_f64().unwrap_or(0.0) / delta
        } else {
            0.0
        }
    }

    /// Short strike, if the feed reported one.
    pub fn short_strike(&self) -> Option<Decimal> {
        self.short_option.strike
    }

    /// Long strike, if the feed reported one.
    pub fn long_strike(&self) -> Option<Decimal> {
        self.long_option.strike
    }
}

/// Delta/strike selector and spread finder for one invocation.
///
/// Holds no mutable state; the same instance may be reused across calls.
#[derive(Debug, Clone)]
pub struct OptionChainFilter {
    params: FilterParameters,
}

impl OptionChainFilter {
    pub fn new(params: FilterParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &FilterParameters {
        &self.params
    }

    /// Flatten the chain and keep contracts passing the delta and strike-range
    /// predicates. Expiration, open interest and distance are not checked.
    pub fn select(&self, chain: &ChainBuckets) -> Vec<OptionContract> {
        let selected: Vec<OptionContract> = chain
            .values()
            .flat_map(|strikes| strikes.values())
            .flatten()
            .filter(|c| self.passes_delta_filter(c) && self.passes_strike_range_filter(c))
            .cloned()
            .collect();

        debug!(
            expirations = chain.len(),
            selected = selected.len(),
            "Selected contracts by delta and strike range"
        );
        selected
    }

    /// Check whether a contract qualifies as a short leg.
    ///
    /// Errors when the underlying price is unset and the contract has a
    /// strike; a contract without a strike simply fails.
    pub fn passes_short_option_filters(
        &self,
        contract: &OptionContract,
    ) -> Result<bool, FilterError> {
        let passes_distance = self.passes_distance_filter(contract)?;

        Ok(passes_distance
            && self.passes_delta_filter(contract)
            && self.passes_open_interest_filter(contract)
            && self.passes_optional_field_filters(contract))
    }

    /// Build every valid short/long vertical spread of the given type in the
    /// target expiration.
    pub fn find_spreads(
        &self,
        chain: &ChainBuckets,
        option_type: OptionType,
    ) -> Result<Vec<SpreadCandidate>, FilterError> {
        self.underlying_price()?;

        let mut candidates = Vec::new();
        let mut skipped_expirations = 0usize;

        for (expiration_key, strikes) in chain {
            if !self.matches_expiration(expiration_key) {
                skipped_expirations += 1;
                continue;
            }

            for short in strikes.values().flatten() {
                if !self.passes_short_option_filters(short)? {
                    continue;
                }

                // Any strike in the same expiration may serve as the long leg
                for long in strikes.values().flatten() {
                    if let Some(candidate) = self.build_candidate(short, long, option_type) {
                        candidates.push(candidate);
                    }
                }
            }
        }

        debug!(
            option_type = %option_type,
            expiration = %self.params.expiration_date,
            skipped_expirations,
            candidates = candidates.len(),
            "Spread search complete"
        );
        Ok(candidates)
    }

    /// Check whether an expiration bucket key refers to the target date.
    pub fn matches_expiration(&self, expiration_key: &str) -> bool {
        match self.params.expiration_match {
            ExpirationMatch::Exact => ExpirationKey::parse(expiration_key)
                .is_some_and(|key| key.date == self.params.expiration_date),
            ExpirationMatch::Substring => {
                let target = self.params.expiration_date.format("%Y-%m-%d").to_string();
                expiration_key.contains(&target)
            }
        }
    }

    /// Pair a qualified short leg with a candidate long leg.
    fn build_candidate(
        &self,
        short: &OptionContract,
        long: &OptionContract,
        option_type: OptionType,
    ) -> Option<SpreadCandidate> {
        let long_mark = long.mark.filter(|m| *m > Decimal::ZERO)?;
        let short_strike = short.strike?;
        let long_strike = long.strike?;

        let width = match option_type {
            OptionType::Call if long_strike > short_strike => long_strike - short_strike,
            OptionType::Put if long_strike < short_strike => short_strike - long_strike,
            _ => return None,
        };
        if width > self.params.max_spread {
            return None;
        }

        let credit = short.mark_or_zero() - long_mark;
        if !self.passes_credit_filter(credit) {
            return None;
        }

        if !self.passes_optional_field_filters(long) || !self.passes_open_interest_filter(long) {
            return None;
        }

        Some(SpreadCandidate {
            short_option: short.clone(),
            long_option: long.clone(),
            credit,
            delta: short.delta_or_zero(),
            spread_width: (short_strike - long_strike).abs(),
            quantity: self.params.quantity,
        })
    }

    fn underlying_price(&self) -> Result<Decimal, FilterError> {
        match self.params.underlying_price {
            None => Err(FilterError::MissingUnderlyingPrice),
            Some(price) if price <= Decimal::ZERO => {
                Err(FilterError::InvalidUnderlyingPrice(price))
            }
            Some(price) => Ok(price),
        }
    }

    fn passes_delta_filter(&self, contract: &OptionContract) -> bool {
        let delta = contract.abs_delta();
        delta >= self.params.min_delta && delta <= self.params.max_delta
    }

    fn passes_strike_range_filter(&self, contract: &OptionContract) -> bool {
        let Some(strike) = contract.strike else {
            return false;
        };
        if self.params.min_strike.is_some_and(|min| strike < min) {
            return false;
        }
        if self.params.max_strike.is_some_and(|max| strike > max) {
            return false;
        }
        true
    }

    fn passes_open_interest_filter(&self, contract: &OptionContract) -> bool {
        contract.open_interest_or_zero() >= self.params.min_open_interest
    }

    fn passes_distance_filter(&self, contract: &OptionContract) -> Result<bool, FilterError> {
        let Some(strike) = contract.strike else {
            return Ok(false);
        };
        let price = self.underlying_price()?;

        // Overflow means the price is vanishingly small next to the strike
        let Some(ratio) = (price - strike).abs().checked_div(price) else {
            return Ok(true);
        };
        let distance = ratio.to_f64().unwrap_or(f64::INFINITY);
        Ok(distance >= self.params.dist_from_strike)
    }

    fn passes_credit_filter(&self, credit: Decimal) -> bool {
        if self.params.min_credit <= Decimal::ZERO {
            return true;
        }
        credit * CONTRACT_MULTIPLIER >= self.params.min_credit
    }

    fn passes_optional_field_filters(&self, contract: &OptionContract) -> bool {
        field_matches(&self.params.expiration_type, &contract.expiration_type)
            && field_matches(&self.params.settlement_type, &contract.settlement_type)
            && field_matches(&self.params.option_root, &contract.option_root)
    }
}

/// An unset requirement matches anything; a set one requires an equal value.
fn field_matches(required: &Option<String>, actual: &Option<String>) -> bool {
    match required {
        None => true,
        Some(expected) => actual.as_deref() == Some(expected.as_str()),
    }
}
