//! HTTP utilities for the K5 CLI client.
//!
//! Every request made here first asks the [`CredentialSupervisor`] for a
//! valid token and sends it as `X-Auth-Token`.

use crate::auth::Authenticator;
use crate::configuration::{join_path, Configuration, ConfigurationError};
use crate::format::{to_json, Formattable, FormattingError, OutputFormat};
use crate::token_supervisor::{CredentialError, CredentialSupervisor};
use reqwest::{Client, Method};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

/// Header the networking API reads the token from
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    CredentialError(#[from] CredentialError),
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("{0}")]
    ConfigurationError(#[from] ConfigurationError),
}

/// Response of one API call, reported the way the remote service answered it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status_code: u16,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

impl Formattable for ApiResponse {
    fn format(&self, f: &OutputFormat) -> Result<String, FormattingError> {
        match f {
            OutputFormat::Json(options) => to_json(self, options),
            OutputFormat::Csv(_) => Err(FormattingError::UnsupportedOutputFormat(f.to_string())),
        }
    }
}

/// Client for the networking API
pub struct ApiClient<A: Authenticator> {
    client: Client,
    base_url: Url,
    supervisor: Arc<CredentialSupervisor<A>>,
}

impl<A: Authenticator> ApiClient<A> {
    pub fn new(
        base_url: Url,
        supervisor: Arc<CredentialSupervisor<A>>,
        timeout: Duration,
        proxy: Option<&Url>,
    ) -> Result<Self, ApiError> {
        let mut builder = Client::builder()
            .user_agent(concat!("k5c/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout);
        if let Some(proxy) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy.as_str())?);
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
            supervisor,
        })
    }

    pub fn new_with_configuration(
        configuration: &Configuration,
        supervisor: Arc<CredentialSupervisor<A>>,
    ) -> Result<Self, ApiError> {
        Self::new(
            configuration.network_url()?,
            supervisor,
            configuration.timeout(),
            configuration.proxy(),
        )
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.execute(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<ApiResponse, ApiError> {
        self.execute(Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<ApiResponse, ApiError> {
        self.execute(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.execute(Method::DELETE, path, None).await
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<ApiResponse, ApiError> {
        let token = self.supervisor.get_valid_token().await?;
        let url = join_path(&self.base_url, path)?;
        debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method, url)
            .header(AUTH_TOKEN_HEADER, token.secret.as_str())
            .header("Accept", "application/json");
        if let Some(body) = body {
            trace!("Request body: {}", body);
            request = request.json(body);
        }
        let response = request.send().await?;

        let status_code = response.status().as_u16();
        let body = response.text().await?;
        trace!("Response {}: {}", status_code, body);

        let data = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&body).unwrap_or(Value::String(body))
        };

        Ok(ApiResponse { status_code, data })
    }
}
