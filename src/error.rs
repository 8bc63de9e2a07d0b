use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the loader, the analytics engine and the exporters.
///
/// The presentation layer needs to tell "input corrupt" (`Schema`, `Io`),
/// "no data available" (`InsufficientData`) and "model could not be fit"
/// (`DegenerateModel`) apart; the remaining variants are caller mistakes.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Schema error: expected {expected}, found {found}.")]
    Schema { expected: String, found: String },

    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Insufficient data: {available} complete rows available, at least {required} required.")]
    InsufficientData { available: usize, required: usize },

    #[error("Degenerate model: {0}")]
    DegenerateModel(String),

    #[error("Unknown numeric field `{0}`.")]
    UnknownField(String),

    #[error("Invalid configuration: {0}")]
    InvalidSpec(String),

    #[error("Failed to write '{}': {message}", path.display())]
    Export { path: PathBuf, message: String },
}

impl AppError {
    pub fn schema(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::Schema {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn export(path: &std::path::Path, message: impl std::fmt::Display) -> Self {
        Self::Export {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }

    /// Process exit code used by the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Schema { .. }
            | AppError::Io { .. }
            | AppError::UnknownField(_)
            | AppError::InvalidSpec(_)
            | AppError::Export { .. } => 2,
            AppError::InsufficientData { .. } => 3,
            AppError::DegenerateModel(_) => 4,
        }
    }
}
