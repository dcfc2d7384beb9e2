//! Exit codes for the k5c application
//!
//! These follow the BSD sysexits.h conventions where possible, with
//! application-specific codes from 100 upwards.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum K5cExitCode {
    /// Command completed successfully
    Success = exitcode::OK,

    /// User input error
    UsageError = exitcode::USAGE,

    /// Input data or output formatting was incorrect
    DataError = exitcode::DATAERR,

    /// File system error
    IoError = exitcode::IOERR,

    /// Application configuration issue
    ConfigError = exitcode::CONFIG,

    /// Login, keyring or token issues
    AuthError = 100,

    /// Connection or communication issues
    NetworkError = 101,

    /// Remote API returned an error status
    ApiError = 102,
}

impl K5cExitCode {
    pub fn code(&self) -> i32 {
        *self as i32
    }

    pub fn message(&self) -> &'static str {
        match self {
            K5cExitCode::Success => "Success",
            K5cExitCode::UsageError => "Command line usage error",
            K5cExitCode::DataError => "Data format error",
            K5cExitCode::IoError => "Input/output error",
            K5cExitCode::ConfigError => "Configuration error",
            K5cExitCode::AuthError => "Authentication error",
            K5cExitCode::NetworkError => "Network communication error",
            K5cExitCode::ApiError => "Remote API error",
        }
    }
}

impl From<K5cExitCode> for i32 {
    fn from(code: K5cExitCode) -> Self {
        code.code()
    }
}
