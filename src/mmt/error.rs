//! Typed errors for the MMT domain layer.

use thiserror::Error;
use uuid::Uuid;

/// Errors produced by strategy validation, quoting, and the engine.
#[derive(Debug, Error)]
pub enum MmtError {
    /// A caller supplied a value the computation cannot act on.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A strategy configuration failed validation.
    #[error("invalid strategy configuration: {0}")]
    Configuration(String),

    /// The price feed could not produce a usable reference price.
    #[error("price feed error: {0}")]
    PriceFeed(String),

    /// No engine is running for the given pool.
    #[error("no engine running for pool {0}")]
    NotRunning(Uuid),

    /// An engine is already running for the given pool.
    #[error("engine already running for pool {0}")]
    AlreadyRunning(Uuid),
}
