use crate::configuration::Configuration;
use crate::token::TokenRecord;
use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Header carrying the issued token in the identity service response.
pub const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Authentication failed: {0}")]
    AuthFailed(String),
    #[error("Missing credential: {0}")]
    MissingCredential(String),
}

/// Performs the identity service handshake.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Obtain a fresh token. Retries, if any, are the implementor's business.
    async fn authenticate(&self) -> Result<TokenRecord, AuthError>;
}

#[async_trait]
impl<A: Authenticator + ?Sized> Authenticator for std::sync::Arc<A> {
    async fn authenticate(&self) -> Result<TokenRecord, AuthError> {
        (**self).authenticate().await
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct TokenBody {
    token: TokenValidity,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct TokenValidity {
    #[serde(default)]
    issued_at: Option<String>,
    #[serde(default)]
    expires_at: Option<String>,
}

/// Project-scoped password credentials.
pub struct Credentials {
    pub domain_name: String,
    pub username: String,
    pub password: SecretString,
    pub project_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("domain_name", &self.domain_name)
            .field("username", &self.username)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    fn request_body(&self) -> serde_json::Value {
        json!({
            "auth": {
                "identity": {
                    "methods": ["password"],
                    "password": {
                        "user": {
                            "domain": { "name": self.domain_name },
                            "name": self.username,
                            "password": self.password.expose_secret()
                        }
                    }
                },
                "scope": {
                    "project": { "id": self.project_id }
                }
            }
        })
    }
}

/// Client for the identity service token endpoint.
pub struct IdentityClient {
    client: reqwest::Client,
    token_url: Url,
    credentials: Credentials,
}

impl IdentityClient {
    pub fn new(
        token_url: Url,
        credentials: Credentials,
        timeout: Duration,
        proxy: Option<&Url>,
    ) -> Result<Self, AuthError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("k5c/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout);
        if let Some(proxy) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy.as_str())?);
        }

        Ok(Self {
            client: builder.build()?,
            token_url,
            credentials,
        })
    }

    pub fn new_with_configuration(
        configuration: &Configuration,
        password: SecretString,
    ) -> Result<Self, AuthError> {
        let credentials = Credentials {
            domain_name: required(configuration.domain_name(), "domain_name")?,
            username: required(configuration.username(), "username")?,
            password,
            project_id: required(configuration.project_id(), "project_id")?,
        };
        let token_url = configuration
            .token_url()
            .map_err(|e| AuthError::MissingCredential(e.to_string()))?;

        Self::new(
            token_url,
            credentials,
            configuration.timeout(),
            configuration.proxy(),
        )
    }

    pub fn token_url(&self) -> &Url {
        &self.token_url
    }
}

fn required(value: Option<&str>, name: &str) -> Result<String, AuthError> {
    match value {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(AuthError::MissingCredential(format!(
            "configuration property {} is not set",
            name
        ))),
    }
}

#[async_trait]
impl Authenticator for IdentityClient {
    async fn authenticate(&self) -> Result<TokenRecord, AuthError> {
        tracing::debug!("Authenticating with token URL: {}", &self.token_url);
        tracing::debug!(
            "Domain: {}, user: {}, project: {}",
            &self.credentials.domain_name,
            &self.credentials.username,
            &self.credentials.project_id
        );

        let response = self
            .client
            .post(self.token_url.clone())
            .header("Accept", "application/json")
            .json(&self.credentials.request_body())
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Authentication response status: {}", status);

        if !status.is_success() {
            let error_body = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("Failed to read error response body: {}", e);
                    "Unable to read error response body".to_string()
                }
            };
            tracing::error!(
                "Authentication request failed with status {}: {}",
                status,
                &error_body
            );
            return Err(AuthError::AuthFailed(describe_failure(status, &error_body)));
        }

        let secret = response
            .headers()
            .get(SUBJECT_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                AuthError::AuthFailed(format!(
                    "HTTP {} response without {} header",
                    status, SUBJECT_TOKEN_HEADER
                ))
            })?;

        let body = response.text().await?;
        let validity: TokenBody = serde_json::from_str(&body)?;
        tracing::debug!(
            "Authentication successful, token expires at {:?}",
            validity.token.expires_at
        );

        Ok(TokenRecord::new(
            secret,
            validity.token.issued_at,
            validity.token.expires_at,
        ))
    }
}

/// Turn an identity service error response into a readable message.
fn describe_failure(status: StatusCode, body: &str) -> String {
    // Keystone errors look like {"error": {"code": 401, "title": "Unauthorized", "message": "..."}}
    let details = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(error_json) => match error_json.get("error") {
            Some(error) => {
                let title = error.get("title").and_then(|v| v.as_str()).unwrap_or("");
                let message = error.get("message").and_then(|v| v.as_str()).unwrap_or("");
                match (title.is_empty(), message.is_empty()) {
                    (false, false) => format!("{} - {}", title, message),
                    (false, true) => title.to_string(),
                    (true, false) => message.to_string(),
                    (true, true) => body.to_string(),
                }
            }
            None => body.to_string(),
        },
        Err(json_err) => {
            tracing::warn!(
                "Failed to parse error response as JSON: {}. Raw error: {}",
                json_err,
                body
            );
            body.to_string()
        }
    };

    format!("HTTP {} {}", status, details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> Credentials {
        Credentials {
            domain_name: "contract-0001".to_string(),
            username: "operator".to_string(),
            password: SecretString::new("s3cret".to_string()),
            project_id: "project-42".to_string(),
        }
    }

    async fn client_for(server: &MockServer) -> IdentityClient {
        let url = Url::parse(&format!("{}/v3/auth/tokens", server.uri())).unwrap();
        IdentityClient::new(url, credentials(), Duration::from_secs(5), None).unwrap()
    }

    #[tokio::test]
    async fn test_authenticate_reads_header_and_validity() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/auth/tokens"))
            .and(body_partial_json(json!({
                "auth": {
                    "identity": {
                        "password": {
                            "user": {
                                "domain": { "name": "contract-0001" },
                                "name": "operator",
                                "password": "s3cret"
                            }
                        }
                    },
                    "scope": { "project": { "id": "project-42" } }
                }
            })))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header(SUBJECT_TOKEN_HEADER, "ed0456b9f91041e88db9163e7cf88043")
                    .set_body_json(json!({
                        "token": {
                            "issued_at": "2017-05-02T06:11:58.198552Z",
                            "expires_at": "2017-05-02T09:11:58.198526Z",
                            "methods": ["password"]
                        }
                    })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let record = client_for(&server).await.authenticate().await.unwrap();

        assert_eq!(record.secret, "ed0456b9f91041e88db9163e7cf88043");
        assert_eq!(record.issued_at.as_deref(), Some("2017-05-02T06:11:58.198552Z"));
        assert_eq!(record.expires_at.as_deref(), Some("2017-05-02T09:11:58.198526Z"));
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_auth_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/auth/tokens"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {
                    "code": 401,
                    "title": "Unauthorized",
                    "message": "The request you have made requires authentication."
                }
            })))
            .mount(&server)
            .await;

        let result = client_for(&server).await.authenticate().await;

        match result {
            Err(AuthError::AuthFailed(message)) => {
                assert!(message.contains("401"));
                assert!(message.contains("Unauthorized"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_subject_token_header_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/auth/tokens"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "token": { "expires_at": "2017-05-02T09:11:58.198526Z" }
            })))
            .mount(&server)
            .await;

        let result = client_for(&server).await.authenticate().await;
        assert!(matches!(result, Err(AuthError::AuthFailed(_))));
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let rendered = format!("{:?}", credentials());
        assert!(rendered.contains("operator"));
        assert!(!rendered.contains("s3cret"));
    }

    #[test]
    fn test_describe_failure_falls_back_to_raw_body() {
        let message = describe_failure(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(message, "HTTP 502 Bad Gateway upstream down");
    }
}
