//! Error types for the CORAL probe

use thiserror::Error;

/// Core CORAL errors
#[derive(Error, Debug)]
pub enum CoralError {
    // Transport errors
    #[error("Transport error: {0}")]
    TransportError(String),

    // Routing errors
    #[error("Routing instance unavailable")]
    RoutingUnavailable,

    #[error("Repair request failed: {0}")]
    RepairFailed(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid tick modulus: {0}")]
    InvalidModulus(u64),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for CORAL operations
pub type CoralResult<T> = Result<T, CoralError>;
