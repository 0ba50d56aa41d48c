//! Core data types for option-chain screening.
//!
//! These types represent an option chain as delivered by the brokerage feed:
//! expiration buckets containing strike buckets containing contracts. Every
//! field the feed may omit is an `Option`; the accessors on [`OptionContract`]
//! are the single place where absence is normalized.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Option type (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "C" | "CALL" => Some(Self::Call),
            "P" | "PUT" => Some(Self::Put),
            _ => None,
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call => write!(f, "call"),
            Self::Put => write!(f, "put"),
        }
    }
}

/// A single option contract as quoted by the feed.
///
/// Marks and deltas arrive pre-computed; nothing here prices an option.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OptionContract {
    /// OCC-style contract symbol (e.g., "SPXW  250117P05500000")
    pub symbol: String,

    /// Strike price
    pub strike: Option<Decimal>,

    /// Mark price (normally the bid/ask midpoint, supplied by the feed)
    pub mark: Option<Decimal>,

    /// Bid price
    pub bid: Option<Decimal>,

    /// Ask price
    pub ask: Option<Decimal>,

    /// Signed delta in [-1, 1]
    pub delta: Option<f64>,

    /// Open interest
    pub open_interest: Option<u64>,

    /// Expiration cycle (e.g., "W" weekly, "S" standard, "Q" quarterly)
    pub expiration_type: Option<String>,

    /// Settlement style (e.g., "P" PM-settled, "A" AM-settled)
    pub settlement_type: Option<String>,

    /// Option root (e.g., "SPX" vs "SPXW")
    pub option_root: Option<String>,

    /// Days to expiration
    pub days_to_expiration: Option<i32>,
}

impl OptionContract {
    /// Delta magnitude, with an unknown delta treated as 0.0.
    pub fn abs_delta(&self) -> f64 {
        self.delta.unwrap_or(0.0).abs()
    }

    /// Signed delta, with an unknown delta treated as 0.0.
    pub fn delta_or_zero(&self) -> f64 {
        self.delta.unwrap_or(0.0)
    }

    /// Open interest, with unknown open interest treated as 0.
    pub fn open_interest_or_zero(&self) -> u64 {
        self.open_interest.unwrap_or(0)
    }

    /// Mark, with an unknown mark treated as zero (unpriceable).
    pub fn mark_or_zero(&self) -> Decimal {
        self.mark.unwrap_or(Decimal::ZERO)
    }
}

/// Expiration key -> strike key -> contracts.
///
/// Strike buckets are normally singleton lists but may hold several contracts
/// (e.g., SPX and SPXW roots at the same strike).
pub type ChainBuckets = BTreeMap<String, BTreeMap<String, Vec<OptionContract>>>;

/// Parsed form of an expiration bucket key such as `2025-01-17:5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpirationKey {
    pub date: NaiveDate,
    pub dte: Option<i32>,
}

impl ExpirationKey {
    pub fn parse(key: &str) -> Option<Self> {
        let (date_part, dte_part) = match key.split_once(':') {
            Some((date, dte)) => (date, Some(dte)),
            None => (key, None),
        };
        let date = NaiveDate::parse_from_str(date_part.trim(), "%Y-%m-%d").ok()?;
        let dte = dte_part.and_then(|d| d.trim().parse::<i32>().ok());
        Some(Self { date, dte })
    }
}

/// Complete option chain for one underlying.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionChain {
    /// Underlying symbol
    pub symbol: String,

    /// Underlying price, when the feed reported one
    pub underlying_price: Option<Decimal>,

    /// Call contracts by expiration and strike
    pub calls: ChainBuckets,

    /// Put contracts by expiration and strike
    pub puts: ChainBuckets,
}

impl OptionChain {
    /// Create a new empty chain.
    pub fn new(symbol: &str, underlying_price: Option<Decimal>) -> Self {
        Self {
            symbol: symbol.to_string(),
            underlying_price,
            calls: ChainBuckets::new(),
            puts: ChainBuckets::new(),
        }
    }

    /// Buckets for one side of the chain.
    pub fn side(&self, option_type: OptionType) -> &ChainBuckets {
        match option_type {
            OptionType::Call => &self.calls,
            OptionType::Put => &self.puts,
        }
    }

    /// Add a contract under the given expiration and strike keys.
    pub fn add_contract(
        &mut self,
        option_type: OptionType,
        expiration_key: &str,
        strike_key: &str,
        contract: OptionContract,
    ) {
        let side = match option_type {
            OptionType::Call => &mut self.calls,
            OptionType::Put => &mut self.puts,
        };
        side.entry(expiration_key.to_string())
            .or_default()
            .entry(strike_key.to_string())
            .or_default()
            .push(contract);
    }

    /// All distinct expiration dates present on either side, sorted.
    pub fn expirations(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .calls
            .keys()
            .chain(self.puts.keys())
            .filter_map(|k| ExpirationKey::parse(k).map(|e| e.date))
            .collect();
        dates.sort();
        dates.dedup();
        dates
    }

    /// Total number of contracts in this chain.
    pub fn total_contracts(&self) -> usize {
        [&self.calls, &self.puts]
            .iter()
            .flat_map(|side| side.values())
            .flat_map(|strikes| strikes.values())
            .map(Vec::len)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_option_type_parsing() {
        assert_eq!(OptionType::from_str("C"), Some(OptionType::Call));
        assert_eq!(OptionType::from_str("P"), Some(OptionType::Put));
        assert_eq!(OptionType::from_str("call"), Some(OptionType::Call));
        assert_eq!(OptionType::from_str("PUT"), Some(OptionType::Put));
        assert_eq!(OptionType::from_str("X"), None);
    }

    #[test]
    fn test_absent_fields_normalize() {
        let contract = OptionContract::default();
        assert_eq!(contract.abs_delta(), 0.0);
        assert_eq!(contract.open_interest_or_zero(), 0);
        assert_eq!(contract.mark_or_zero(), Decimal::ZERO);
    }

    #[test]
    fn test_abs_delta_ignores_sign() {
        let contract = OptionContract {
            delta: Some(-0.12),
            ..Default::default()
        };
        assert_eq!(contract.abs_delta(), 0.12);
        assert_eq!(contract.delta_or_zero(), -0.12);
    }

    #[test]
    fn test_expiration_key_parsing() {
        let key = ExpirationKey::parse("2025-01-17:5").unwrap();
        assert_eq!(key.date, NaiveDate::from_ymd_opt(2025, 1, 17).unwrap());
        assert_eq!(key.dte, Some(5));

        let bare = ExpirationKey::parse("2025-01-17").unwrap();
        assert_eq!(bare.dte, None);

        assert!(ExpirationKey::parse("2025-13-01:5").is_none());
        assert!(ExpirationKey::parse("garbage").is_none());
    }

    #[test]
    fn test_chain_expirations_and_counts() {
        let mut chain = OptionChain::new("SPX", Some(dec!(5800)));
        let contract = OptionContract {
            symbol: "SPXW  250117P05500000".to_string(),
            strike: Some(dec!(5500)),
            ..Default::default()
        };
        chain.add_contract(OptionType::Put, "2025-01-17:5", "5500.0", contract.clone());
        chain.add_contract(OptionType::Call, "2025-01-17:5", "6000.0", contract.clone());
        chain.add_contract(OptionType::Put, "2025-01-10:0", "5500.0", contract);

        assert_eq!(chain.total_contracts(), 3);
        assert_eq!(
            chain.expirations(),
            vec![
                NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
                NaiveDate::from_ymd_opt(2025, 1, 17).unwrap(),
            ]
        );
        assert_eq!(chain.side(OptionType::Put).len(), 2);
    }
}
