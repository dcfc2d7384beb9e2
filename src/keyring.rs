use crate::configuration::Configuration;
use keyring::Entry;
use secrecy::SecretString;
use thiserror::Error;
use tracing::debug;

/// Service name the password entries are stored under
pub const KEYRING_SERVICE: &str = "k5c";

/// Environment variable that takes precedence over the keyring
pub const ENV_PASSWORD: &str = "K5C_PASSWORD";

#[derive(Debug, Error)]
pub enum KeyringError {
    #[error("keyring error: {0}")]
    KeyringAccessError(#[from] keyring::Error),
    #[error("configuration property {0} is required to address the keyring entry")]
    MissingAccount(String),
    #[error("no password stored for {0}; run 'auth login' first or set {ENV_PASSWORD}")]
    PasswordNotFound(String),
}

#[derive(Default)]
pub struct Keyring {}

impl Keyring {
    /// Entries are keyed by `<domain_name>:<username>`.
    fn account(configuration: &Configuration) -> Result<String, KeyringError> {
        let domain_name = configuration
            .domain_name()
            .ok_or_else(|| KeyringError::MissingAccount("domain_name".to_string()))?;
        let username = configuration
            .username()
            .ok_or_else(|| KeyringError::MissingAccount("username".to_string()))?;
        Ok([domain_name, username].join(":"))
    }

    pub fn get(&self, account: &str) -> Result<Option<String>, KeyringError> {
        let entry = Entry::new(KEYRING_SERVICE, account)?;
        match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(e) => match e {
                keyring::Error::NoEntry => Ok(None),
                _ => Err(KeyringError::from(e)),
            },
        }
    }

    pub fn put(&self, account: &str, value: &str) -> Result<(), KeyringError> {
        let entry = Entry::new(KEYRING_SERVICE, account)?;
        entry.set_password(value)?;
        Ok(())
    }

    /// Returns `false` when there was nothing to delete.
    pub fn delete(&self, account: &str) -> Result<bool, KeyringError> {
        let entry = Entry::new(KEYRING_SERVICE, account)?;
        match entry.delete_password() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(KeyringError::from(e)),
        }
    }

    pub fn store_password(
        &self,
        configuration: &Configuration,
        password: &str,
    ) -> Result<(), KeyringError> {
        self.put(&Self::account(configuration)?, password)
    }

    pub fn delete_password(&self, configuration: &Configuration) -> Result<bool, KeyringError> {
        self.delete(&Self::account(configuration)?)
    }

    /// Look up the password, preferring [`ENV_PASSWORD`] over the keyring.
    pub fn resolve_password(
        &self,
        configuration: &Configuration,
    ) -> Result<SecretString, KeyringError> {
        if let Ok(password) = std::env::var(ENV_PASSWORD) {
            if !password.is_empty() {
                debug!("Using password from {}", ENV_PASSWORD);
                return Ok(SecretString::new(password));
            }
        }

        let account = Self::account(configuration)?;
        match self.get(&account)? {
            Some(password) => Ok(SecretString::new(password)),
            None => Err(KeyringError::PasswordNotFound(account)),
        }
    }
}
