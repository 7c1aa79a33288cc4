// src/infra/errors.rs — Error types for citemeter

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CitemeterError {
    // Engine errors (adapter sets the retriable flag)
    #[error("Engine '{provider}' error: {message}")]
    Engine {
        provider: String,
        message: String,
        retriable: bool,
    },

    #[error("Rate limited by '{provider}', retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },

    // Capability errors (never retried, the account owner must act)
    #[error("Engine '{provider}': {message}")]
    Capability { provider: String, message: String },

    // User / configuration errors
    #[error("Unsupported provider '{provider}'")]
    UnsupportedProvider { provider: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load task row {row}: {message}")]
    Task { row: usize, message: String },

    // Infra
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CitemeterError {
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            CitemeterError::Engine {
                retriable: true,
                ..
            } | CitemeterError::RateLimited { .. }
        )
    }
}
