//! Tool dispatch and definitions.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::analytics::{find_iron_condors, rank_by_credit_to_delta, OptionChainFilter};
use crate::config::Settings;
use crate::data::{ChainBuckets, OptionChain, OptionContract, OptionType};

use super::args::{FilterOptionsArgs, FindSpreadsArgs, IronCondorArgs};
use super::render::{render_condors, render_contracts, render_spreads};
use super::ToolError;

/// Names of the tools this crate serves.
pub const TOOL_NAMES: &[&str] = &["find_spreads", "find_iron_condor", "filter_options"];

/// Tool description advertised to the calling model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

fn filter_properties() -> Value {
    json!({
        "underlying_price": {
            "type": "number",
            "exclusiveMinimum": 0,
            "description": "Overrides the chain's underlying price"
        },
        "expiration_type": {
            "type": "string",
            "description": "Required expiration type, e.g. W, S, Q"
        },
        "settlement_type": {
            "type": "string",
            "description": "Required settlement type, e.g. P or A"
        },
        "option_root": {"type": "string", "description": "Required option root, e.g. SPXW"},
        "min_delta": {"type": "number", "minimum": 0, "maximum": 1, "default": 0.0},
        "max_delta": {"type": "number", "minimum": 0, "maximum": 1, "default": 0.15},
        "max_spread": {"type": "number", "exclusiveMinimum": 0, "default": 20.0},
        "min_credit": {
            "type": "number",
            "minimum": 0,
            "default": 0.0,
            "description": "Minimum credit in dollars per contract"
        },
        "min_open_interest": {"type": "integer", "minimum": 0, "default": 0},
        "dist_from_strike": {"type": "number", "minimum": 0, "exclusiveMaximum": 1, "default": 0.0},
        "quantity": {"type": "integer", "minimum": 1, "default": 1},
        "limit": {"type": "integer", "minimum": 1}
    })
}

fn date_property() -> Value {
    json!({"type": "string", "pattern": "^\\d{4}-\\d{2}-\\d{2}$"})
}

/// Definitions of every tool, with JSON schemas for their arguments.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    let mut spread_properties = filter_properties();
    spread_properties["expiration_date"] = date_property();
    spread_properties["option_type"] = json!({"type": "string", "enum": ["call", "put"]});

    let mut condor_properties = filter_properties();
    condor_properties["expiration_date"] = date_property();

    vec![
        ToolDefinition {
            name: "find_spreads",
            description: "Find vertical credit spreads for one side of an option chain",
            input_schema: json!({
                "type": "object",
                "properties": spread_properties,
                "required": ["expiration_date", "option_type"]
            }),
        },
        ToolDefinition {
            name: "find_iron_condor",
            description: "Find iron condors combining call and put credit spreads",
            input_schema: json!({
                "type": "object",
                "properties": condor_properties,
                "required": ["expiration_date"]
            }),
        },
        ToolDefinition {
            name: "filter_options",
            description: "List option contracts within a delta band and strike range",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "expiration_date": date_property(),
                    "option_type": {"type": "string", "enum": ["call", "put"]},
                    "min_delta": {"type": "number", "minimum": 0, "maximum": 1, "default": 0.0},
                    "max_delta": {"type": "number", "minimum": 0, "maximum": 1, "default": 0.15},
                    "min_strike": {"type": "number"},
                    "max_strike": {"type": "number"},
                    "limit": {"type": "integer", "minimum": 1}
                }
            }),
        },
    ]
}

/// Run a tool against an option chain and return the response text.
pub fn handle_tool(
    name: &str,
    arguments: Value,
    chain: &OptionChain,
    settings: &Settings,
) -> Result<String, ToolError> {
    info!(tool = name, symbol = %chain.symbol, "Handling tool call");

    let result = match name {
        "find_spreads" => serde_json::from_value(arguments)
            .map_err(ToolError::from)
            .and_then(|args| find_spreads(args, chain, settings)),
        "find_iron_condor" => serde_json::from_value(arguments)
            .map_err(ToolError::from)
            .and_then(|args| find_iron_condor(args, chain, settings)),
        "filter_options" => serde_json::from_value(arguments)
            .map_err(ToolError::from)
            .and_then(|args| filter_options(args, chain, settings)),
        other => Err(ToolError::UnknownTool(other.to_string())),
    };

    if let Err(e) = &result {
        warn!(tool = name, error = %e, "Tool call failed");
    }
    result
}

fn find_spreads(
    args: FindSpreadsArgs,
    chain: &OptionChain,
    settings: &Settings,
) -> Result<String, ToolError> {
    let option_type = args.option_type()?;
    let filter = OptionChainFilter::new(args.to_params(chain.underlying_price, settings)?);

    let mut spreads = filter.find_spreads(chain.side(option_type), option_type)?;
    let found = spreads.len();
    rank_by_credit_to_delta(&mut spreads);
    spreads.truncate(args.filters.limit.unwrap_or(settings.max_results));

    info!(option_type = %option_type, found, returned = spreads.len(), "Spread candidates ranked");
    render_spreads(&spreads, option_type, settings.output_format)
}

fn find_iron_condor(
    args: IronCondorArgs,
    chain: &OptionChain,
    settings: &Settings,
) -> Result<String, ToolError> {
    let filter = OptionChainFilter::new(args.to_params(chain.underlying_price, settings)?);

    let mut condors = find_iron_condors(chain, &filter)?;
    let found = condors.len();
    condors.truncate(args.filters.limit.unwrap_or(settings.max_results));

    info!(found, returned = condors.len(), "Iron condor candidates ranked");
    render_condors(&condors, settings.output_format)
}

fn filter_options(
    args: FilterOptionsArgs,
    chain: &OptionChain,
    settings: &Settings,
) -> Result<String, ToolError> {
    let filter = OptionChainFilter::new(args.to_params(settings)?);
    let narrow_to_expiration = args.expiration_date()?.is_some();

    let sides = match args.option_type()? {
        Some(option_type) => vec![option_type],
        None => vec![OptionType::Call, OptionType::Put],
    };

    let mut contracts: Vec<OptionContract> = Vec::new();
    for option_type in sides {
        let side = chain.side(option_type);
        if narrow_to_expiration {
            let narrowed: ChainBuckets = side
                .iter()
                .filter(|(key, _)| filter.matches_expiration(key))
                .map(|(key, strikes)| (key.clone(), strikes.clone()))
                .collect();
            contracts.extend(filter.select(&narrowed));
        } else {
            contracts.extend(filter.select(side));
        }
    }
    contracts.truncate(args.limit.unwrap_or(settings.max_results));

    render_contracts(&contracts, settings.output_format)
}
