use thiserror::Error;

use crate::{actions::CliActionError, exit_codes::K5cExitCode};

/// Error types that can occur during CLI command execution
#[derive(Debug, Error)]
pub enum CliError {
    /// Error when an unsupported or undefined subcommand is encountered
    #[error("Undefined or unsupported subcommand: {0}")]
    UnsupportedSubcommand(String),
    /// Error related to configuration loading or management
    #[error("Configuration error: {0}")]
    ConfigurationError(#[from] crate::configuration::ConfigurationError),
    /// Error related to data formatting
    #[error("Formatting error: {0}")]
    FormattingError(#[from] crate::format::FormattingError),
    #[error("{0}")]
    ActionError(#[from] CliActionError),
}

impl CliError {
    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> K5cExitCode {
        match self {
            CliError::UnsupportedSubcommand(_) => K5cExitCode::UsageError,
            CliError::ConfigurationError(_) => K5cExitCode::ConfigError,
            CliError::FormattingError(_) => K5cExitCode::DataError,
            CliError::ActionError(e) => e.exit_code(),
        }
    }
}
