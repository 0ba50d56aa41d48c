//! Markdown and JSON rendering of tool results.

use std::fmt::Write;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::analytics::{IronCondor, SpreadCandidate};
use crate::data::{OptionContract, OptionType};

use super::ToolError;

/// Response text format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "markdown" | "md" => Some(Self::Markdown),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Render vertical spread candidates.
pub fn render_spreads(
    spreads: &[SpreadCandidate],
    option_type: OptionType,
    format: OutputFormat,
) -> Result<String, ToolError> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(spreads)?);
    }
    if spreads.is_empty() {
        return Ok(format!("No {} spread candidates matched the filters.", option_type));
    }

    let mut out = format!("## {} credit spreads ({})\n\n", title(option_type), spreads.len());
    out.push_str("| Short | Long | Width | Credit | Total Credit | Max Loss | Delta | Qty |\n");
    out.push_str("|---|---|---|---|---|---|---|---|\n");
    for s in spreads {
        let _ = writeln!(
            out,
            "| {} | {} | {} | ${:.2} | ${:.2} | ${:.2} | {:.3} | {} |",
            strike(s.short_strike()),
            strike(s.long_strike()),
            s.spread_width.normalize(),
            s.credit,
            s.total_credit(),
            s.max_loss(),
            s.delta,
            s.quantity
        );
    }
    Ok(out)
}

/// Render iron condor candidates.
pub fn render_condors(condors: &[IronCondor], format: OutputFormat) -> Result<String, ToolError> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(condors)?);
    }
    if condors.is_empty() {
        return Ok("No iron condor candidates matched the filters.".to_string());
    }

    let mut out = format!("## Iron condors ({})\n\n", condors.len());
    out.push_str(
        "| Put Long | Put Short | Call Short | Call Long | Credit | Total Credit | Max Loss \
         | Breakevens |\n",
    );
    out.push_str("|---|---|---|---|---|---|---|---|\n");
    for c in condors {
        let breakevens = c
            .breakevens()
            .map(|(low, high)| format!("{:.2} / {:.2}", low, high))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | ${:.2} | ${:.2} | ${:.2} | {} |",
            strike(c.put_spread.long_strike()),
            strike(c.put_spread.short_strike()),
            strike(c.call_spread.short_strike()),
            strike(c.call_spread.long_strike()),
            c.credit(),
            c.total_credit(),
            c.max_loss(),
            breakevens
        );
    }
    Ok(out)
}

/// Render a flat list of contracts.
pub fn render_contracts(
    contracts: &[OptionContract],
    format: OutputFormat,
) -> Result<String, ToolError> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(contracts)?);
    }
    if contracts.is_empty() {
        return Ok("No option contracts matched the filters.".to_string());
    }

    let mut out = format!("## Option contracts ({})\n\n", contracts.len());
    out.push_str("| Symbol | Strike | Bid | Ask | Mark | Delta | Open Interest | DTE |\n");
    out.push_str("|---|---|---|---|---|---|---|---|\n");
    for c in contracts {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} | {} | {} |",
            c.symbol,
            strike(c.strike),
            price(c.bid),
            price(c.ask),
            price(c.mark),
            c.delta.map(|d| format!("{:.3}", d)).unwrap_or_else(|| "-".to_string()),
            c.open_interest.map(|oi| oi.to_string()).unwrap_or_else(|| "-".to_string()),
            c.days_to_expiration.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
        );
    }
    Ok(out)
}

fn title(option_type: OptionType) -> &'static str {
    match option_type {
        OptionType::Call => "Call",
        OptionType::Put => "Put",
    }
}

fn strike(value: Option<Decimal>) -> String {
    value
        .map(|s| s.normalize().to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn price(value: Option<Decimal>) -> String {
    value
        .map(|p| format!("{:.2}", p))
        .unwrap_or_else(|| "-".to_string())
}
