//! Error types for the TUI.

use crate::config::ConfigError;
use crate::export::ExportError;
use crate::persistence::PersistenceError;
use castmind_client::ApiClientError;

#[derive(Debug, thiserror::Error)]
pub enum TuiError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiClientError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("Logging setup failed: {0}")]
    Logging(String),
}
