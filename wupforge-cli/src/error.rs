//! CLI error type.

use std::fmt;

use wupforge::batch::BatchError;
use wupforge::config::ConfigError;
use wupforge::provision::ProvisionError;

/// Errors surfaced to the terminal with a non-zero exit code.
#[derive(Debug)]
pub enum CliError {
    /// Key configuration could not be loaded.
    Config(ConfigError),

    /// Input discovery or pool setup failed.
    Batch(BatchError),

    /// Standalone provisioning failed.
    Provision(ProvisionError),

    /// The HTTP client could not be constructed.
    Http(String),

    /// One or more titles in the batch failed.
    TitlesFailed(usize),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "{}", e),
            CliError::Batch(e) => write!(f, "{}", e),
            CliError::Provision(e) => write!(f, "{}", e),
            CliError::Http(msg) => write!(f, "{}", msg),
            CliError::TitlesFailed(count) => write!(f, "{} title(s) failed to build", count),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Batch(e) => Some(e),
            CliError::Provision(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<BatchError> for CliError {
    fn from(e: BatchError) -> Self {
        CliError::Batch(e)
    }
}

impl From<ProvisionError> for CliError {
    fn from(e: ProvisionError) -> Self {
        CliError::Provision(e)
    }
}
