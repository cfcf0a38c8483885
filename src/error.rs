use std::io;
use thiserror::Error;

/// Convenience alias for fallible sandbox operations.
pub type Result<T> = std::result::Result<T, SandboxError>;

/// Faults raised while assembling or operating the sandbox.
///
/// The per-statement execution path never raises these; it folds every
/// failure into [`crate::executor::ExecutionResult`] instead.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// I/O failure reading a seed or configuration file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Configuration file did not parse or carried invalid values.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Assignment seed data did not parse or was internally inconsistent.
    #[error("invalid assignment data: {0}")]
    Catalog(String),
}
