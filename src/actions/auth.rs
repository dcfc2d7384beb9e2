//! Authentication action implementations.
//!
//! Login stores the password in the keyring once the identity service has
//! accepted it. Every other command goes through the credential supervisor,
//! so a token cached by an earlier run (or by another process sharing the
//! cache file) is reused until it nears expiry.

use crate::actions::{credential_supervisor, default_credential_supervisor, CliActionError};
use crate::auth::IdentityClient;
use crate::commands::params::{get_format_parameter_value, PARAMETER_NO_SAVE, PARAMETER_PASSWORD};
use crate::configuration::Configuration;
use crate::format::{to_csv_row, to_json, Formattable, FormattingError, OutputFormat};
use crate::keyring::{Keyring, KeyringError};
use crate::token::{format_timestamp, ExpiryPolicy, TokenRecord};
use crate::token_supervisor::TokenInspection;
use chrono::{DateTime, Utc};
use clap::ArgMatches;
use secrecy::SecretString;
use serde::Serialize;
use tracing::{debug, info, warn};

/// What the CLI reports about a token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub issued_at: Option<String>,
    pub expires_at: Option<String>,
    /// Expiry moved earlier by the safety margin
    pub usable_until: Option<String>,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl TokenStatus {
    fn from_record(record: &TokenRecord, policy: &ExpiryPolicy, now: DateTime<Utc>) -> Self {
        TokenStatus {
            token: Some(record.secret.clone()),
            issued_at: record.issued_at.clone(),
            expires_at: record.expires_at.clone(),
            usable_until: policy.deadline(record).as_ref().map(format_timestamp),
            valid: policy.is_valid(record, now),
            source: None,
        }
    }

    fn from_inspection(inspection: &TokenInspection) -> Self {
        TokenStatus {
            token: None,
            issued_at: inspection.record.issued_at.clone(),
            expires_at: inspection.record.expires_at.clone(),
            usable_until: inspection.deadline.as_ref().map(format_timestamp),
            valid: inspection.valid,
            source: Some(inspection.source.to_string()),
        }
    }
}

impl Formattable for TokenStatus {
    fn format(&self, f: &OutputFormat) -> Result<String, FormattingError> {
        match f {
            OutputFormat::Json(options) => to_json(self, options),
            OutputFormat::Csv(options) => {
                let valid = self.valid.to_string();
                to_csv_row(
                    &[
                        "TOKEN",
                        "ISSUED_AT",
                        "EXPIRES_AT",
                        "USABLE_UNTIL",
                        "VALID",
                        "SOURCE",
                    ],
                    &[
                        self.token.as_deref().unwrap_or(""),
                        self.issued_at.as_deref().unwrap_or(""),
                        self.expires_at.as_deref().unwrap_or(""),
                        self.usable_until.as_deref().unwrap_or(""),
                        valid.as_str(),
                        self.source.as_deref().unwrap_or(""),
                    ],
                    options,
                )
            }
        }
    }
}

pub async fn login(
    configuration: &Configuration,
    sub_matches: &ArgMatches,
) -> Result<(), CliActionError> {
    let password = match sub_matches.get_one::<String>(PARAMETER_PASSWORD) {
        Some(password) => password.clone(),
        None => inquire::Password::new("Password:")
            .without_confirmation()
            .prompt()?,
    };
    if password.is_empty() {
        return Err(CliActionError::MissingRequiredArgument(
            PARAMETER_PASSWORD.to_string(),
        ));
    }

    let client =
        IdentityClient::new_with_configuration(configuration, SecretString::new(password.clone()))?;
    let supervisor = credential_supervisor(configuration, client)?;

    // a login always asks the identity service, even if the cache holds a valid token
    let record = supervisor.refresh().await?;

    if sub_matches.get_flag(PARAMETER_NO_SAVE) {
        debug!("Not storing the password in the keyring");
    } else {
        match Keyring::default().store_password(configuration, &password) {
            Ok(()) => info!("Password stored in the keyring"),
            Err(e) => warn!("Password was not stored in the keyring: {}", e),
        }
    }

    println!(
        "Login successful, token expires at {}",
        record.expires_at.as_deref().unwrap_or("<unknown>")
    );
    Ok(())
}

pub async fn logout(configuration: &Configuration) -> Result<(), CliActionError> {
    match Keyring::default().delete_password(configuration) {
        Ok(true) => info!("Password removed from the keyring"),
        Ok(false) => debug!("No password was stored in the keyring"),
        Err(KeyringError::MissingAccount(name)) => {
            debug!("Skipping keyring cleanup, {} is not configured", name)
        }
        Err(e) => warn!("Could not remove the password from the keyring: {}", e),
    }

    default_credential_supervisor(configuration)?.invalidate().await;
    Ok(())
}

pub async fn print_token(
    configuration: &Configuration,
    sub_matches: &ArgMatches,
) -> Result<(), CliActionError> {
    let format = get_format_parameter_value(sub_matches)?;
    let supervisor = default_credential_supervisor(configuration)?;

    let record = supervisor.get_valid_token().await?;
    let status = TokenStatus::from_record(&record, supervisor.policy(), supervisor.now());

    println!("{}", status.format(&format)?);
    Ok(())
}

pub async fn print_expiration(
    configuration: &Configuration,
    sub_matches: &ArgMatches,
) -> Result<(), CliActionError> {
    let format = get_format_parameter_value(sub_matches)?;
    let supervisor = default_credential_supervisor(configuration)?;

    match supervisor.inspect().await {
        Some(inspection) => {
            let status = TokenStatus::from_inspection(&inspection);
            println!("{}", status.format(&format)?);
        }
        None => eprintln!("No cached token found"),
    }
    Ok(())
}

pub async fn clear_token(configuration: &Configuration) -> Result<(), CliActionError> {
    default_credential_supervisor(configuration)?.invalidate().await;
    Ok(())
}
