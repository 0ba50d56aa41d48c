//! Tool-call argument parsing and validation.
//!
//! Arguments arrive as loosely-typed JSON. Each tool's arguments are decoded
//! into a struct, checked, and turned into [`FilterParameters`] with the
//! defaults for anything the caller left out.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::analytics::FilterParameters;
use crate::config::Settings;
use crate::data::OptionType;

use super::ToolError;

/// Filter arguments shared by the spread tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpreadFilterArgs {
    pub underlying_price: Option<f64>,
    pub expiration_type: Option<String>,
    pub settlement_type: Option<String>,
    pub option_root: Option<String>,
    pub min_delta: Option<f64>,
    pub max_delta: Option<f64>,
    pub max_spread: Option<f64>,
    pub min_credit: Option<f64>,
    pub min_open_interest: Option<u64>,
    pub dist_from_strike: Option<f64>,
    pub quantity: Option<u32>,
    pub limit: Option<usize>,
}

/// Arguments for `find_spreads`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindSpreadsArgs {
    pub expiration_date: String,
    pub option_type: String,
    #[serde(flatten)]
    pub filters: SpreadFilterArgs,
}

/// Arguments for `find_iron_condor`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IronCondorArgs {
    pub expiration_date: String,
    #[serde(flatten)]
    pub filters: SpreadFilterArgs,
}

/// Arguments for `filter_options`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterOptionsArgs {
    pub expiration_date: Option<String>,
    pub option_type: Option<String>,
    pub min_delta: Option<f64>,
    pub max_delta: Option<f64>,
    pub min_strike: Option<f64>,
    pub max_strike: Option<f64>,
    pub limit: Option<usize>,
}

impl FindSpreadsArgs {
    pub fn option_type(&self) -> Result<OptionType, ToolError> {
        parse_option_type(&self.option_type)
    }

    /// Validate and build filter parameters.
    pub fn to_params(
        &self,
        chain_underlying: Option<Decimal>,
        settings: &Settings,
    ) -> Result<FilterParameters, ToolError> {
        self.option_type()?;
        let expiration_date = parse_date(&self.expiration_date)?;
        self.filters.to_params(expiration_date, chain_underlying, settings)
    }
}

impl IronCondorArgs {
    /// Validate and build filter parameters.
    pub fn to_params(
        &self,
        chain_underlying: Option<Decimal>,
        settings: &Settings,
    ) -> Result<FilterParameters, ToolError> {
        let expiration_date = parse_date(&self.expiration_date)?;
        self.filters.to_params(expiration_date, chain_underlying, settings)
    }
}

impl FilterOptionsArgs {
    pub fn option_type(&self) -> Result<Option<OptionType>, ToolError> {
        self.option_type.as_deref().map(parse_option_type).transpose()
    }

    pub fn expiration_date(&self) -> Result<Option<NaiveDate>, ToolError> {
        self.expiration_date.as_deref().map(parse_date).transpose()
    }

    /// Validate and build filter parameters. The expiration date only
    /// narrows the chain; it defaults to the epoch when absent.
    pub fn to_params(&self, settings: &Settings) -> Result<FilterParameters, ToolError> {
        self.option_type()?;
        let expiration_date = self.expiration_date()?.unwrap_or_default();

        let defaults = FilterParameters::new(expiration_date);
        let min_delta = self.min_delta.unwrap_or(defaults.min_delta);
        let max_delta = self.max_delta.unwrap_or(defaults.max_delta);
        check_delta_band(min_delta, max_delta)?;

        let min_strike = self.min_strike.map(|s| to_decimal("min_strike", s)).transpose()?;
        let max_strike = self.max_strike.map(|s| to_decimal("max_strike", s)).transpose()?;
        check_strike_range(min_strike, max_strike)?;
        check_limit(self.limit)?;

        Ok(FilterParameters {
            min_delta,
            max_delta,
            min_strike,
            max_strike,
            expiration_match: settings.expiration_match,
            ..defaults
        })
    }
}

impl SpreadFilterArgs {
    /// Validate and merge with defaults. An explicit underlying price wins
    /// over the one reported by the chain.
    pub fn to_params(
        &self,
        expiration_date: NaiveDate,
        chain_underlying: Option<Decimal>,
        settings: &Settings,
    ) -> Result<FilterParameters, ToolError> {
        let defaults = FilterParameters::new(expiration_date);

        let min_delta = self.min_delta.unwrap_or(defaults.min_delta);
        let max_delta = self.max_delta.unwrap_or(defaults.max_delta);
        check_delta_band(min_delta, max_delta)?;

        let max_spread = match self.max_spread {
            Some(width) if width <= 0.0 => {
                return Err(invalid(format!("max_spread must be positive, got {}", width)));
            }
            Some(width) => to_decimal("max_spread", width)?,
            None => defaults.max_spread,
        };

        let min_credit = match self.min_credit {
            Some(credit) if credit < 0.0 => {
                return Err(invalid(format!("min_credit must not be negative, got {}", credit)));
            }
            Some(credit) => to_decimal("min_credit", credit)?,
            None => defaults.min_credit,
        };

        let dist_from_strike = self.dist_from_strike.unwrap_or(defaults.dist_from_strike);
        if !(0.0..1.0).contains(&dist_from_strike) {
            return Err(invalid(format!(
                "dist_from_strike must be in [0, 1), got {}",
                dist_from_strike
            )));
        }

        let quantity = self.quantity.unwrap_or(settings.default_quantity);
        if quantity == 0 {
            return Err(invalid("quantity must be at least 1"));
        }
        check_limit(self.limit)?;

        let underlying_price = match self.underlying_price {
            Some(price) if price <= 0.0 => {
                return Err(invalid(format!("underlying_price must be positive, got {}", price)));
            }
            Some(price) => Some(to_decimal("underlying_price", price)?),
            None => chain_underlying,
        };

        Ok(FilterParameters {
            underlying_price,
            expiration_type: self.expiration_type.clone(),
            settlement_type: self.settlement_type.clone(),
            option_root: self.option_root.clone(),
            min_delta,
            max_delta,
            max_spread,
            min_credit,
            min_open_interest: self.min_open_interest.unwrap_or(defaults.min_open_interest),
            dist_from_strike,
            quantity,
            expiration_match: settings.expiration_match,
            ..defaults
        })
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate, ToolError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| invalid(format!("expiration_date must be YYYY-MM-DD, got '{}'", value)))
}

pub fn parse_option_type(value: &str) -> Result<OptionType, ToolError> {
    OptionType::from_str(value)
        .ok_or_else(|| invalid(format!("option_type must be 'call' or 'put', got '{}'", value)))
}

fn check_delta_band(min_delta: f64, max_delta: f64) -> Result<(), ToolError> {
    for (name, value) in [("min_delta", min_delta), ("max_delta", max_delta)] {
        if !(0.0..=1.0).contains(&value) {
            return Err(invalid(format!("{} must be in [0, 1], got {}", name, value)));
        }
    }
    if min_delta > max_delta {
        return Err(invalid(format!(
            "min_delta ({}) must not exceed max_delta ({})",
            min_delta, max_delta
        )));
    }
    Ok(())
}

fn check_strike_range(min: Option<Decimal>, max: Option<Decimal>) -> Result<(), ToolError> {
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(invalid(format!(
                "min_strike ({}) must not exceed max_strike ({})",
                min, max
            )));
        }
    }
    Ok(())
}

fn check_limit(limit: Option<usize>) -> Result<(), ToolError> {
    if limit == Some(0) {
        return Err(invalid("limit must be at least 1"));
    }
    Ok(())
}

fn to_decimal(name: &str, value: f64) -> Result<Decimal, ToolError> {
    Decimal::try_from(value)
        .map_err(|_| invalid(format!("{} is not a valid number: {}", name, value)))
}

fn invalid(message: impl Into<String>) -> ToolError {
    ToolError::InvalidArgument(message.into())
}
