//! Domain-level error taxonomy for stanssh.

use crate::capability::Capability;

/// Locally detectable run-parameter problems, caught before any network call.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("chain count must be at least 1")]
    ZeroChains,

    #[error("iteration count must be at least 1")]
    ZeroIterations,

    #[error("got {inits} initial-condition entries for {chains} chains")]
    InitCountMismatch { chains: usize, inits: usize },

    #[error("warmup ({warmup}) must be smaller than iterations ({iter})")]
    WarmupExceedsIterations { warmup: usize, iter: usize },
}

/// stanssh domain errors.
#[derive(Debug, thiserror::Error)]
pub enum StanError {
    /// A data value cannot be expressed as JSON-native numerics.
    #[error("cannot serialize `{name}`: {reason}")]
    Serialization { name: String, reason: String },

    /// A remote result artifact is malformed or truncated.
    #[error("malformed result artifact: {0}")]
    Deserialization(String),

    /// Run parameters failed local validation.
    #[error("invalid run parameters: {0}")]
    Validation(#[from] ValidationError),

    /// The bound backend does not support the requested algorithm.
    /// Detected locally; no remote call is made.
    #[error("backend `{backend}` does not support {capability}")]
    Unsupported {
        backend: &'static str,
        capability: Capability,
    },

    /// An operation was called in the wrong session state.
    #[error("session is {actual}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        actual: String,
    },

    /// Failure in the SSH connection layer.
    #[error(transparent)]
    Transport(#[from] stanssh_transport::TransportError),

    /// Local I/O error (reading a model source file).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for stanssh operations.
pub type Result<T> = std::result::Result<T, StanError>;
