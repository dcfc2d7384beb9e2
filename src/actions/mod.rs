use crate::auth::{AuthError, Authenticator, IdentityClient};
use crate::cache::TokenFile;
use crate::configuration::Configuration;
use crate::exit_codes::K5cExitCode;
use crate::http_utils::ApiError;
use crate::keyring::Keyring;
use crate::token::TokenRecord;
use crate::token_store::TokenStore;
use crate::token_supervisor::{CredentialError, CredentialSupervisor};
use async_trait::async_trait;
use thiserror::Error;

pub mod api;
pub mod auth;
pub mod config;

#[derive(Debug, Error)]
pub enum CliActionError {
    #[error("{0}")]
    ConfigurationError(#[from] crate::configuration::ConfigurationError),

    #[error("{0}")]
    FormattingError(#[from] crate::format::FormattingError),

    #[error("{0}")]
    AuthError(#[from] AuthError),

    #[error("{0}")]
    CredentialError(#[from] CredentialError),

    #[error("{0}")]
    ApiError(#[from] ApiError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Prompt error: {0}")]
    PromptError(#[from] inquire::InquireError),

    #[error("Missing required argument: {0}")]
    MissingRequiredArgument(String),

    #[error("Request body is not valid JSON: {0}")]
    InvalidBody(#[source] serde_json::Error),

    #[error("Remote API responded with HTTP {status_code}")]
    RemoteApiError { status_code: u16 },
}

impl CliActionError {
    pub fn exit_code(&self) -> K5cExitCode {
        match self {
            CliActionError::ConfigurationError(_) => K5cExitCode::ConfigError,
            CliActionError::FormattingError(_) => K5cExitCode::DataError,
            CliActionError::AuthError(AuthError::HttpError(_)) => K5cExitCode::NetworkError,
            CliActionError::AuthError(_) => K5cExitCode::AuthError,
            CliActionError::CredentialError(_) => K5cExitCode::AuthError,
            CliActionError::ApiError(ApiError::CredentialError(_)) => K5cExitCode::AuthError,
            CliActionError::ApiError(ApiError::HttpError(_)) => K5cExitCode::NetworkError,
            CliActionError::ApiError(ApiError::ConfigurationError(_)) => K5cExitCode::ConfigError,
            CliActionError::IoError(_) => K5cExitCode::IoError,
            CliActionError::PromptError(_) => K5cExitCode::UsageError,
            CliActionError::MissingRequiredArgument(_) => K5cExitCode::UsageError,
            CliActionError::InvalidBody(_) => K5cExitCode::DataError,
            CliActionError::RemoteApiError { .. } => K5cExitCode::ApiError,
        }
    }
}

/// Authenticator that resolves the password only when a token is actually needed,
/// so commands served from the cache never touch the keyring.
pub struct ConfiguredAuthenticator {
    configuration: Configuration,
}

impl ConfiguredAuthenticator {
    pub fn new(configuration: Configuration) -> Self {
        Self { configuration }
    }
}

#[async_trait]
impl Authenticator for ConfiguredAuthenticator {
    async fn authenticate(&self) -> Result<TokenRecord, AuthError> {
        let password = Keyring::default()
            .resolve_password(&self.configuration)
            .map_err(|e| AuthError::MissingCredential(e.to_string()))?;
        IdentityClient::new_with_configuration(&self.configuration, password)?
            .authenticate()
            .await
    }
}

/// Build a supervisor over the configured token cache file.
pub fn credential_supervisor<A: Authenticator>(
    configuration: &Configuration,
    authenticator: A,
) -> Result<CredentialSupervisor<A>, CliActionError> {
    let store = TokenStore::new(TokenFile::new(configuration.token_cache_path()));
    Ok(CredentialSupervisor::new(
        store,
        authenticator,
        configuration.expiry_policy()?,
    ))
}

pub fn default_credential_supervisor(
    configuration: &Configuration,
) -> Result<CredentialSupervisor<ConfiguredAuthenticator>, CliActionError> {
    credential_supervisor(
        configuration,
        ConfiguredAuthenticator::new(configuration.clone()),
    )
}
