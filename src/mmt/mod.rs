//! # MMT Module
//!
//! Market-making trading core: strategy configuration, bid/ask quote
//! derivation, and the per-pool engine loop that drives both.

pub mod engine;
pub mod error;
pub mod quoting;
pub mod strategy;

pub use engine::{EngineRegistry, Inventory, LoggingQuoteSink, MmtEngine, QuoteIntent, QuoteSink};
pub use error::MmtError;
pub use quoting::{Quote, quote, quote_checked};
pub use strategy::{StrategyConfig, StrategyPatch};
