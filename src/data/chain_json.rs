//! Brokerage option-chain document adapter.
//!
//! The feed returns a chain as one JSON document with two expiration maps:
//!
//! ```json
//! {
//!   "symbol": "$SPX",
//!   "underlyingPrice": 5800.0,
//!   "callExpDateMap": { "2025-01-17:5": { "6000.0": [ { ... } ] } },
//!   "putExpDateMap":  { "2025-01-17:5": { "5500.0": [ { ... } ] } }
//! }
//! ```
//!
//! This module deserializes that document and normalizes every contract into
//! an [`OptionContract`]. Fetching the document is the brokerage client's job.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::types::{OptionChain, OptionContract, OptionType};

/// Option-chain document errors.
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Failed to read chain file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid chain document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Underlying quote embedded in the chain document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUnderlying {
    #[serde(default, deserialize_with = "feed_f64")]
    pub mark: Option<f64>,
    #[serde(default, deserialize_with = "feed_f64")]
    pub last: Option<f64>,
}

/// Raw contract record as it appears in an expiration map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawContract {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub put_call: Option<String>,
    #[serde(default, deserialize_with = "feed_f64")]
    pub strike_price: Option<f64>,
    #[serde(default, deserialize_with = "feed_f64")]
    pub mark: Option<f64>,
    #[serde(default, deserialize_with = "feed_f64")]
    pub bid: Option<f64>,
    #[serde(default, deserialize_with = "feed_f64")]
    pub ask: Option<f64>,
    #[serde(default, deserialize_with = "feed_f64")]
    pub delta: Option<f64>,
    #[serde(default, deserialize_with = "feed_i64")]
    pub open_interest: Option<i64>,
    #[serde(default)]
    pub expiration_type: Option<String>,
    #[serde(default)]
    pub settlement_type: Option<String>,
    #[serde(default)]
    pub option_root: Option<String>,
    #[serde(default, deserialize_with = "feed_i64")]
    pub days_to_expiration: Option<i64>,
}

impl RawContract {
    /// Side reported by the contract itself, if any.
    pub fn reported_type(&self) -> Option<OptionType> {
        self.put_call.as_deref().and_then(OptionType::from_str)
    }

    /// Normalize into an [`OptionContract`].
    ///
    /// Out-of-range deltas (the feed reports -999.0 when it cannot compute
    /// one) and negative open interest become unknown. A missing mark is
    /// filled from the bid/ask midpoint when both sides are quoted.
    pub fn to_contract(&self) -> OptionContract {
        let bid = self.bid.and_then(to_decimal);
        let ask = self.ask.and_then(to_decimal);
        let mark = self.mark.and_then(to_decimal).or(match (bid, ask) {
            (Some(b), Some(a)) => Some((b + a) / Decimal::from(2)),
            _ => None,
        });

        let delta = self.delta.filter(|d| d.is_finite() && d.abs() <= 1.0);

        OptionContract {
            symbol: self.symbol.clone(),
            strike: self.strike_price.and_then(to_decimal),
            mark,
            bid,
            ask,
            delta,
            open_interest: self.open_interest.and_then(|oi| u64::try_from(oi).ok()),
            expiration_type: non_empty(&self.expiration_type),
            settlement_type: non_empty(&self.settlement_type),
            option_root: non_empty(&self.option_root),
            days_to_expiration: self.days_to_expiration.and_then(|d| i32::try_from(d).ok()),
        }
    }
}

type RawExpDateMap = BTreeMap<String, BTreeMap<String, Vec<RawContract>>>;

/// Raw option-chain document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOptionChain {
    #[serde(default)]
    pub symbol: String,
    #[serde(default, deserialize_with = "feed_f64")]
    pub underlying_price: Option<f64>,
    #[serde(default)]
    pub underlying: Option<RawUnderlying>,
    #[serde(default)]
    pub call_exp_date_map: RawExpDateMap,
    #[serde(default)]
    pub put_exp_date_map: RawExpDateMap,
}

impl RawOptionChain {
    /// Underlying price from the top-level field, falling back to the
    /// embedded underlying quote.
    pub fn resolved_underlying_price(&self) -> Option<Decimal> {
        self.underlying_price
            .filter(|p| *p > 0.0)
            .or_else(|| {
                self.underlying
                    .as_ref()
                    .and_then(|u| u.mark.filter(|p| *p > 0.0).or(u.last.filter(|p| *p > 0.0)))
            })
            .and_then(to_decimal)
    }

    /// Convert into a normalized [`OptionChain`].
    ///
    /// A contract whose `putCall` contradicts the map it is filed under is
    /// dropped.
    pub fn into_chain(self) -> OptionChain {
        let mut chain = OptionChain::new(&self.symbol, self.resolved_underlying_price());

        for (option_type, map) in [
            (OptionType::Call, &self.call_exp_date_map),
            (OptionType::Put, &self.put_exp_date_map),
        ] {
            for (expiration_key, strikes) in map {
                for (strike_key, contracts) in strikes {
                    for raw in contracts {
                        if raw.reported_type().is_some_and(|t| t != option_type) {
                            warn!(
                                symbol = %raw.symbol,
                                side = %option_type,
                                "Dropping contract filed under the wrong side"
                            );
                            continue;
                        }
                        let contract = raw.to_contract();
                        chain.add_contract(option_type, expiration_key, strike_key, contract);
                    }
                }
            }
        }

        debug!(
            symbol = %chain.symbol,
            contracts = chain.total_contracts(),
            "Normalized option chain"
        );
        chain
    }
}

impl OptionChain {
    /// Parse a chain document from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ChainError> {
        let raw: RawOptionChain = serde_json::from_str(json)?;
        Ok(raw.into_chain())
    }

    /// Read and parse a chain document saved on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ChainError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ChainError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }
}

/// Feed numbers arrive as JSON numbers or as strings (`"5.25"`, `"NaN"`).
#[derive(Deserialize)]
#[serde(untagged)]
enum FeedNumber {
    Number(f64),
    Text(String),
}

/// Lenient numeric field: unparseable or non-finite values become `None`.
fn feed_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<FeedNumber>::deserialize(deserializer)?;
    let number = match value {
        Some(FeedNumber::Number(n)) => Some(n),
        Some(FeedNumber::Text(s)) => s.trim().parse::<f64>().ok(),
        None => None,
    };
    Ok(number.filter(|n| n.is_finite()))
}

/// Lenient integer field; whole-valued floats are accepted.
fn feed_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let number = feed_f64(deserializer)?;
    Ok(number
        .filter(|n| n.fract() == 0.0 && n.abs() < i64::MAX as f64)
        .map(|n| n as i64))
}

fn to_decimal(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::try_from(value).ok()
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = r#"{
        "symbol": "$SPX",
        "status": "SUCCESS",
        "underlyingPrice": 5800.0,
        "callExpDateMap": {
            "2025-01-17:5": {
                "6000.0": [{
                    "putCall": "CALL",
                    "symbol": "SPXW  250117C06000000",
                    "strikePrice": 6000.0,
                    "bid": 3.0,
                    "ask": 3.4,
                    "mark": 3.2,
                    "delta": 0.11,
                    "openInterest": 120,
                    "expirationType": "W",
                    "settlementType": "P",
                    "optionRoot": "SPXW",
                    "daysToExpiration": 5
                }]
            }
        },
        "putExpDateMap": {
            "2025-01-17:5": {
                "5500.0": [{
                    "putCall": "PUT",
                    "symbol": "SPXW  250117P05500000",
                    "strikePrice": 5500.0,
                    "bid": 5.3,
                    "ask": 5.7,
                    "delta": -999.0,
                    "openInterest": -1,
                    "optionRoot": ""
                }]
            }
        }
    }"#;

    #[test]
    fn test_parse_chain_document() {
        let chain = OptionChain::from_json_str(SAMPLE).unwrap();

        assert_eq!(chain.symbol, "$SPX");
        assert_eq!(chain.underlying_price, Some(dec!(5800)));
        assert_eq!(chain.total_contracts(), 2);

        let call = &chain.calls["2025-01-17:5"]["6000.0"][0];
        assert_eq!(call.strike, Some(dec!(6000)));
        assert_eq!(call.mark, Some(dec!(3.2)));
        assert_eq!(call.delta, Some(0.11));
        assert_eq!(call.open_interest, Some(120));
        assert_eq!(call.option_root.as_deref(), Some("SPXW"));
        assert_eq!(call.days_to_expiration, Some(5));
    }

    #[test]
    fn test_sentinels_normalize_to_unknown() {
        let chain = OptionChain::from_json_str(SAMPLE).unwrap();
        let put = &chain.puts["2025-01-17:5"]["5500.0"][0];

        assert_eq!(put.delta, None);
        assert_eq!(put.open_interest, None);
        assert_eq!(put.option_root, None);
        // Mark filled from the bid/ask midpoint
        assert_eq!(put.mark, Some(dec!(5.5)));
    }

    #[test]
    fn test_nan_and_string_numbers() {
        let chain = OptionChain::from_json_str(
            r#"{
                "symbol": "$SPX",
                "underlyingPrice": "5800.0",
                "putExpDateMap": {
                    "2025-01-17:5": {
                        "5500.0": [{
                            "symbol": "SPXW  250117P05500000",
                            "strikePrice": 5500.0,
                            "mark": 5.5,
                            "delta": -0.10,
                            "openInterest": 50
                        }],
                        "5490.0": [{
                            "symbol": "SPXW  250117P05490000",
                            "strikePrice": "5490",
                            "mark": "4.25",
                            "delta": "NaN",
                            "openInterest": "30",
                            "daysToExpiration": 5.0
                        }]
                    }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(chain.underlying_price, Some(dec!(5800)));
        assert_eq!(chain.total_contracts(), 2);

        let put = &chain.puts["2025-01-17:5"]["5490.0"][0];
        assert_eq!(put.delta, None);
        assert_eq!(put.strike, Some(dec!(5490)));
        assert_eq!(put.mark, Some(dec!(4.25)));
        assert_eq!(put.open_interest, Some(30));
        assert_eq!(put.days_to_expiration, Some(5));
    }

    #[test]
    fn test_unparseable_numbers_become_unknown() {
        let raw: RawContract = serde_json::from_str(
            r#"{"symbol": "X", "bid": "n/a", "ask": null, "openInterest": 12.5}"#,
        )
        .unwrap();
        assert_eq!(raw.bid, None);
        assert_eq!(raw.ask, None);
        assert_eq!(raw.open_interest, None);
    }

    #[test]
    fn test_contract_on_wrong_side_is_dropped() {
        let chain = OptionChain::from_json_str(
            r#"{
                "symbol": "$SPX",
                "callExpDateMap": {
                    "2025-01-17:5": {
                        "6000.0": [
                            {"putCall": "CALL", "symbol": "SPXW  250117C06000000"},
                            {"putCall": "PUT", "symbol": "SPXW  250117P06000000"},
                            {"symbol": "SPX   250117C06000000"}
                        ]
                    }
                }
            }"#,
        )
        .unwrap();

        let symbols: Vec<&str> = chain.calls["2025-01-17:5"]["6000.0"]
            .iter()
            .map(|c| c.symbol.as_str())
            .collect();
        assert_eq!(symbols, vec!["SPXW  250117C06000000", "SPX   250117C06000000"]);
        assert!(chain.puts.is_empty());
    }

    #[test]
    fn test_underlying_price_fallback() {
        let chain = OptionChain::from_json_str(
            r#"{"symbol": "SPY", "underlying": {"mark": 0.0, "last": 581.25}}"#,
        )
        .unwrap();
        assert_eq!(chain.underlying_price, Some(dec!(581.25)));

        let chain = OptionChain::from_json_str(r#"{"symbol": "SPY"}"#).unwrap();
        assert_eq!(chain.underlying_price, None);
        assert_eq!(chain.total_contracts(), 0);
    }

    #[test]
    fn test_invalid_document() {
        let err = OptionChain::from_json_str("not json").unwrap_err();
        assert!(matches!(err, ChainError::Json(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = OptionChain::from_path("/nonexistent/chain.json").unwrap_err();
        assert!(matches!(err, ChainError::Io { .. }));
    }
}
