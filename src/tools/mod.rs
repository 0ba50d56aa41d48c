//! Tool-call layer over the option-chain analytics.
//!
//! Each tool takes JSON arguments plus an already-fetched option chain and
//! returns response text (markdown or JSON). Transport and dispatch framing
//! belong to the hosting server.

pub mod args;
pub mod handler;
pub mod render;

use thiserror::Error;

use crate::analytics::FilterError;

pub use args::{FilterOptionsArgs, FindSpreadsArgs, IronCondorArgs, SpreadFilterArgs};
pub use handler::{handle_tool, tool_definitions, ToolDefinition, TOOL_NAMES};
pub use render::{render_condors, render_contracts, render_spreads, OutputFormat};

/// Tool errors.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),
}
