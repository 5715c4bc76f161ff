//! Error types for the kernel.
//!
//! Only conditions a caller can act on are reported here. Contract
//! violations halt instead (see the `fatal` module).

use thiserror::Error;

use cellvisor_config::ConfigError;

/// Recoverable kernel errors.
#[derive(Debug, Error)]
pub enum KernelError {
    /// The dispatch loop was already started.
    #[error("Kernel loop is already started")]
    AlreadyStarted,

    /// The loop thread could not be spawned.
    #[error("Failed to spawn kernel loop thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// The loop thread panicked before it could be joined.
    #[error("Kernel loop thread panicked")]
    LoopPanicked,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;
