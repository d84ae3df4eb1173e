//! Host error types.
//!
//! Everything here is fatal: configuration problems and socket setup
//! failures end the process with a nonzero exit. Recoverable conditions
//! (frame errors, link drops, call faults) never surface as errors - they
//! are counted, logged and healed in place.

use thiserror::Error;

/// Fatal host errors.
#[derive(Error, Debug)]
pub enum HostError {
    /// Configuration unreadable or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Master address did not resolve.
    #[error("cannot resolve master address '{0}'")]
    AddressResolve(String),

    /// Socket setup failure.
    #[error("network error: {0}")]
    Io(#[from] std::io::Error),
}
