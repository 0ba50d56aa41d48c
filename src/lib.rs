pub mod analytics;
pub mod config;
pub mod data;
pub mod tools;

// Re-export commonly used types
pub use analytics::{
    find_iron_condors, ExpirationMatch, FilterError, FilterParameters, IronCondor,
    OptionChainFilter, SpreadCandidate,
};
pub use config::{ConfigError, Settings};
pub use data::{ChainBuckets, ChainError, OptionChain, OptionContract, OptionType};
pub use tools::{handle_tool, tool_definitions, OutputFormat, ToolError};
