pub mod chain_json;
pub mod types;

pub use chain_json::{ChainError, RawContract, RawOptionChain, RawUnderlying};
pub use types::{ChainBuckets, ExpirationKey, OptionChain, OptionContract, OptionType};
