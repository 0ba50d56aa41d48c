//! Spread ranking and iron condor composition.
//!
//! An iron condor is one call credit spread plus one put credit spread in the
//! same expiration. Both sides come from independent
//! [`OptionChainFilter::find_spreads`] calls and are combined afterwards.

use std::cmp::Ordering;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{OptionChain, OptionType};

use super::option_filter::{FilterError, OptionChainFilter, SpreadCandidate};

/// Sort candidates by credit-to-delta ratio, best first.
pub fn rank_by_credit_to_delta(candidates: &mut [SpreadCandidate]) {
    candidates.sort_by(|a, b| {
        b.credit_to_delta()
            .partial_cmp(&a.credit_to_delta())
            .unwrap_or(Ordering::Equal)
    });
}

/// Candidate with the highest credit-to-delta ratio.
pub fn best_spread(candidates: &[SpreadCandidate]) -> Option<&SpreadCandidate> {
    candidates.iter().max_by(|a, b| {
        a.credit_to_delta()
            .partial_cmp(&b.credit_to_delta())
            .unwrap_or(Ordering::Equal)
    })
}

/// A call credit spread and a put credit spread on the same expiration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IronCondor {
    pub call_spread: SpreadCandidate,
    pub put_spread: SpreadCandidate,
}

impl IronCondor {
    /// Combined credit per share.
    pub fn credit(&self) -> Decimal {
        self.call_spread.credit + self.put_spread.credit
    }

    /// Combined credit in dollars for the whole position.
    pub fn total_credit(&self) -> Decimal {
        self.call_spread.total_credit() + self.put_spread.total_credit()
    }

    /// Width of the wider wing. Only one side can finish in the money.
    pub fn max_width(&self) -> Decimal {
        self.call_spread.spread_width.max(self.put_spread.spread_width)
    }

    /// Maximum loss in dollars for the whole position.
    pub fn max_loss(&self) -> Decimal {
        (self.max_width() - self.credit())
            * Decimal::ONE_HUNDRED
            * Decimal::from(self.call_spread.quantity)
    }

    /// Lower and upper breakeven prices at expiration.
    pub fn breakevens(&self) -> Option<(Decimal, Decimal)> {
        let put_short = self.put_spread.short_strike()?;
        let call_short = self.call_spread.short_strike()?;
        Some((put_short - self.credit(), call_short + self.credit()))
    }

    /// Combined credit per unit of combined short delta.
    pub fn credit_to_delta(&self) -> f64 {
        let delta = self.call_spread.delta.abs() + self.put_spread.delta.abs();
        if delta > 0.0 {
            self.credit().to_f64().unwrap_or(0.0) / delta
        } else {
            0.0
        }
    }
}

/// Find every iron condor whose put short strike sits below its call short
/// strike, ranked by combined credit-to-delta.
pub fn find_iron_condors(
    chain: &OptionChain,
    filter: &OptionChainFilter,
) -> Result<Vec<IronCondor>, FilterError> {
    let call_spreads = filter.find_spreads(chain.side(OptionType::Call), OptionType::Call)?;
    let put_spreads = filter.find_spreads(chain.side(OptionType::Put), OptionType::Put)?;

    let mut condors = Vec::with_capacity(call_spreads.len() * put_spreads.len());
    for call_spread in &call_spreads {
        for put_spread in &put_spreads {
            let (Some(call_short), Some(put_short)) =
                (call_spread.short_strike(), put_spread.short_strike())
            else {
                continue;
            };
            if put_short >= call_short {
                continue;
            }
            condors.push(IronCondor {
                call_spread: call_spread.clone(),
                put_spread: put_spread.clone(),
            });
        }
    }

    condors.sort_by(|a, b| {
        b.credit_to_delta()
            .partial_cmp(&a.credit_to_delta())
            .unwrap_or(Ordering::Equal)
    });

    debug!(
        call_spreads = call_spreads.len(),
        put_spreads = put_spreads.len(),
        condors = condors.len(),
        "Iron condor search complete"
    );
    Ok(condors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::option_filter::FilterParameters;
    use crate::data::OptionContract;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    const KEY: &str = "2025-01-17:5";

    fn contract(strike: Decimal, mark: Decimal, delta: f64) -> OptionContract {
        OptionContract {
            symbol: format!("SPXW_{}", strike),
            strike: Some(strike),
            mark: Some(mark),
            delta: Some(delta),
            open_interest: Some(100),
            ..Default::default()
        }
    }

    fn candidate(short: OptionContract, long: OptionContract) -> SpreadCandidate {
        let credit = short.mark_or_zero() - long.mark_or_zero();
        let width = (short.strike.unwrap() - long.strike.unwrap()).abs();
        SpreadCandidate {
            delta: short.delta_or_zero(),
            short_option: short,
            long_option: long,
            credit,
            spread_width: width,
            quantity: 1,
        }
    }

    fn chain() -> OptionChain {
        let mut chain = OptionChain::new("$SPX", Some(dec!(5800)));
        for c in [
            contract(dec!(6100), dec!(3.00), 0.10),
            contract(dec!(6110), dec!(2.00), 0.08),
        ] {
            let key = c.strike.unwrap().to_string();
            chain.add_contract(OptionType::Call, KEY, &key, c);
        }
        for c in [
            contract(dec!(5500), dec!(5.50), -0.10),
            contract(dec!(5490), dec!(4.25), -0.08),
        ] {
            let key = c.strike.unwrap().to_string();
            chain.add_contract(OptionType::Put, KEY, &key, c);
        }
        chain
    }

    fn filter() -> OptionChainFilter {
        OptionChainFilter::new(FilterParameters {
            underlying_price: Some(dec!(5800)),
            max_delta: 0.09,
            ..FilterParameters::new(NaiveDate::from_ymd_opt(2025, 1, 17).unwrap())
        })
    }

    #[test]
    fn test_rank_by_credit_to_delta() {
        let mut candidates = vec![
            candidate(
                contract(dec!(5500), dec!(2.00), -0.20),
                contract(dec!(5490), dec!(1.00), -0.15),
            ),
            candidate(
                contract(dec!(5480), dec!(1.50), -0.05),
                contract(dec!(5470), dec!(1.00), -0.04),
            ),
        ];
        // 1.00 / 0.20 = 5 vs 0.50 / 0.05 = 10
        rank_by_credit_to_delta(&mut candidates);
        assert_eq!(candidates[0].short_strike(), Some(dec!(5480)));

        let best = best_spread(&candidates).unwrap();
        assert_eq!(best.short_strike(), Some(dec!(5480)));
        assert!(best_spread(&[]).is_none());
    }

    #[test]
    fn test_iron_condor_metrics() {
        let condor = IronCondor {
            call_spread: candidate(
                contract(dec!(6100), dec!(3.00), 0.10),
                contract(dec!(6110), dec!(2.00), 0.08),
            ),
            put_spread: candidate(
                contract(dec!(5500), dec!(5.50), -0.10),
                contract(dec!(5490), dec!(4.25), -0.08),
            ),
        };

        assert_eq!(condor.credit(), dec!(2.25));
        assert_eq!(condor.total_credit(), dec!(225));
        assert_eq!(condor.max_width(), dec!(10));
        assert_eq!(condor.max_loss(), dec!(775));
        assert_eq!(condor.breakevens(), Some((dec!(5497.75), dec!(6102.25))));
        assert!((condor.credit_to_delta() - 11.25).abs() < 1e-9);
    }

    #[test]
    fn test_find_iron_condors() {
        // max_delta 0.09 leaves only the 6110 call and 5490 put as short legs,
        // neither of which has a long leg further out.
        assert!(find_iron_condors(&chain(), &filter()).unwrap().is_empty());

        let wide = OptionChainFilter::new(FilterParameters {
            max_delta: 0.15,
            ..filter().params().clone()
        });
        let condors = find_iron_condors(&chain(), &wide).unwrap();
        assert_eq!(condors.len(), 1);
        assert_eq!(condors[0].call_spread.short_strike(), Some(dec!(6100)));
        assert_eq!(condors[0].put_spread.short_strike(), Some(dec!(5500)));
    }

    #[test]
    fn test_overlapping_short_strikes_rejected() {
        let mut chain = OptionChain::new("XYZ", Some(dec!(100)));
        for c in [contract(dec!(95), dec!(6.00), 0.10), contract(dec!(100), dec!(3.00), 0.05)] {
            let key = c.strike.unwrap().to_string();
            chain.add_contract(OptionType::Call, KEY, &key, c);
        }
        for c in [contract(dec!(105), dec!(6.00), -0.10), contract(dec!(100), dec!(3.00), -0.05)] {
            let key = c.strike.unwrap().to_string();
            chain.add_contract(OptionType::Put, KEY, &key, c);
        }
        let filter = OptionChainFilter::new(FilterParameters {
            underlying_price: Some(dec!(100)),
            ..FilterParameters::new(NaiveDate::from_ymd_opt(2025, 1, 17).unwrap())
        });

        // Call short 95 sits below put short 105
        assert!(find_iron_condors(&chain, &filter).unwrap().is_empty());
    }

    #[test]
    fn test_missing_underlying_propagates() {
        let filter = OptionChainFilter::new(FilterParameters::new(
            NaiveDate::from_ymd_opt(2025, 1, 17).unwrap(),
        ));
        assert_eq!(
            find_iron_condors(&chain(), &filter),
            Err(FilterError::MissingUnderlyingPrice)
        );
    }
}
