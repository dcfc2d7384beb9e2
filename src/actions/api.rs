use crate::actions::{default_credential_supervisor, CliActionError};
use crate::commands::params::{
    get_format_parameter_value, PARAMETER_BODY, PARAMETER_RESOURCE_PATH,
};
use crate::configuration::Configuration;
use crate::format::Formattable;
use crate::http_utils::{ApiClient, ApiResponse};
use clap::ArgMatches;
use reqwest::Method;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Send one request to the networking API and print the response.
///
/// The response is printed even when the service answers with an error
/// status; the status then decides the exit code.
pub async fn call(
    configuration: &Configuration,
    method: Method,
    sub_matches: &ArgMatches,
) -> Result<(), CliActionError> {
    let path = sub_matches
        .get_one::<String>(PARAMETER_RESOURCE_PATH)
        .ok_or_else(|| {
            CliActionError::MissingRequiredArgument(PARAMETER_RESOURCE_PATH.to_string())
        })?;
    let format = get_format_parameter_value(sub_matches)?;

    // read before a token is requested
    let body = match sub_matches
        .try_get_one::<PathBuf>(PARAMETER_BODY)
        .ok()
        .flatten()
    {
        Some(source) => Some(read_body(source)?),
        None => None,
    };

    let supervisor = Arc::new(default_credential_supervisor(configuration)?);
    let client = ApiClient::new_with_configuration(configuration, supervisor)?;

    let response: ApiResponse = if method == Method::POST || method == Method::PUT {
        let body = body.ok_or_else(|| {
            CliActionError::MissingRequiredArgument(PARAMETER_BODY.to_string())
        })?;
        if method == Method::POST {
            client.post(path, &body).await?
        } else {
            client.put(path, &body).await?
        }
    } else if method == Method::DELETE {
        client.delete(path).await?
    } else {
        client.get(path).await?
    };

    println!("{}", response.format(&format)?);

    if response.is_success() {
        Ok(())
    } else {
        Err(CliActionError::RemoteApiError {
            status_code: response.status_code,
        })
    }
}

/// Read a JSON document from `source`, where `-` means stdin.
fn read_body(source: &Path) -> Result<Value, CliActionError> {
    let text = if source == Path::new("-") {
        debug!("Reading request body from stdin");
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        text
    } else {
        debug!("Reading request body from {:?}", source);
        std::fs::read_to_string(source)?
    };
    serde_json::from_str(&text).map_err(CliActionError::InvalidBody)
}
