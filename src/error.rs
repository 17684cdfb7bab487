use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum BibError {
    #[error("invalid {kind}: {value}")]
    InvalidIdentifier { kind: &'static str, value: String },

    #[error("{provider} request failed: {message}")]
    ProviderHttp { provider: String, message: String },

    #[error("{provider} returned status {status}: {message}")]
    ProviderStatus {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("{provider} returned an unusable response: {message}")]
    ProviderResponse { provider: String, message: String },

    #[error("lookup cancelled")]
    Cancelled,

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("no lookup providers are registered")]
    NoProviders,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to parse library file: {0}")]
    LibraryParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("{0}")]
    Unexpected(String),
}

impl BibError {
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            BibError::InvalidIdentifier { .. }
                | BibError::ProviderHttp { .. }
                | BibError::ProviderStatus { .. }
                | BibError::ProviderResponse { .. }
        )
    }

    pub fn detail(&self) -> String {
        match self {
            BibError::ProviderHttp { message, .. }
            | BibError::ProviderResponse { message, .. } => message.clone(),
            BibError::ProviderStatus {
                status, message, ..
            } => format!("status {status}: {message}"),
            other => other.to_string(),
        }
    }
}
