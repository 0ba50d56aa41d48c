//! Environment configuration.
//!
//! | Variable | Values | Default |
//! |---|---|---|
//! | `SPREAD_FINDER_OUTPUT` | `markdown`, `json` | `markdown` |
//! | `SPREAD_FINDER_QUANTITY` | integer >= 1 | `1` |
//! | `SPREAD_FINDER_EXPIRATION_MATCH` | `exact`, `substring` | `exact` |
//! | `SPREAD_FINDER_MAX_RESULTS` | integer >= 1 | `25` |

use thiserror::Error;

use crate::analytics::ExpirationMatch;
use crate::tools::OutputFormat;

pub const OUTPUT_VAR: &str = "SPREAD_FINDER_OUTPUT";
pub const QUANTITY_VAR: &str = "SPREAD_FINDER_QUANTITY";
pub const EXPIRATION_MATCH_VAR: &str = "SPREAD_FINDER_EXPIRATION_MATCH";
pub const MAX_RESULTS_VAR: &str = "SPREAD_FINDER_MAX_RESULTS";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}' ({reason})")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Runtime settings shared by every tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Response format when the caller does not choose one.
    pub output_format: OutputFormat,
    /// Contracts per spread when the caller does not choose one.
    pub default_quantity: u32,
    /// How expiration bucket keys are matched.
    pub expiration_match: ExpirationMatch,
    /// Maximum rows returned by a tool unless the caller sets a limit.
    pub max_results: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Markdown,
            default_quantity: 1,
            expiration_match: ExpirationMatch::Exact,
            max_results: 25,
        }
    }
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(value) = lookup(OUTPUT_VAR) {
            let parsed = OutputFormat::from_str(&value);
            settings.output_format = parsed.ok_or(ConfigError::InvalidValue {
                var: OUTPUT_VAR,
                value,
                reason: "expected markdown or json",
            })?;
        }

        if let Some(value) = lookup(QUANTITY_VAR) {
            settings.default_quantity = parse_positive(QUANTITY_VAR, value)?;
        }

        if let Some(value) = lookup(EXPIRATION_MATCH_VAR) {
            settings.expiration_match = match value.trim().to_lowercase().as_str() {
                "exact" => ExpirationMatch::Exact,
                "substring" => ExpirationMatch::Substring,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: EXPIRATION_MATCH_VAR,
                        value,
                        reason: "expected exact or substring",
                    })
                }
            };
        }

        if let Some(value) = lookup(MAX_RESULTS_VAR) {
            settings.max_results = parse_positive(MAX_RESULTS_VAR, value)?;
        }

        Ok(settings)
    }
}

fn parse_positive<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + From<u8>,
{
    match value.trim().parse::<T>() {
        Ok(n) if n >= T::from(1) => Ok(n),
        _ => Err(ConfigError::InvalidValue {
            var,
            value,
            reason: "expected a positive integer",
        }),
    }
}
