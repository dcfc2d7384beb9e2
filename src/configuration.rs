use crate::{
    cache::DEFAULT_TOKEN_CACHE_FILE_NAME,
    format::{to_csv_row, to_json, Formattable, FormattingError, OutputFormat},
    token::{
        ExpiryPolicy, PolicyError, DEFAULT_EXPIRY_OFFSET_SECONDS, DEFAULT_SAFETY_MARGIN_SECONDS,
    },
};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::Write,
    path::PathBuf,
    time::Duration,
};
use tracing::debug;
use url::Url;

pub const DEFAULT_APPLICATION_ID: &str = "k5c";
pub const DEFAULT_CONFIGURATION_FILE_NAME: &str = "config.yml";
pub const DEFAULT_REGION: &str = "jp-east-1";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 15;

/// Overrides the configuration directory
pub const ENV_CONFIG_DIR: &str = "K5C_CONFIG_DIR";
/// Overrides the token cache file for one process
pub const ENV_TOKEN_CACHE: &str = "K5C_TOKEN_CACHE";

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("failed to resolve the configuration directory")]
    FailedToFindConfigurationDirectory,
    #[error("failed to load configuration data, because of: {cause:?}")]
    FailedToLoadData { cause: Box<dyn std::error::Error> },
    #[error("failed to write configuration data to file, because of: {cause:?}")]
    FailedToWriteData { cause: Box<dyn std::error::Error> },
    #[error("missing value for property {name:?}")]
    MissingRequiredPropertyValue { name: String },
    #[error("invalid endpoint URL {url:?}")]
    InvalidEndpoint { url: String },
    #[error("invalid token expiry settings: {0}")]
    InvalidExpiryPolicy(#[from] PolicyError),
    #[error("{cause:?}")]
    FormattingError {
        #[from]
        cause: FormattingError,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    #[serde(skip_serializing_if = "Option::is_none")]
    domain_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    domain_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    identity_url: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    network_url: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    proxy: Option<Url>,
    timeout_seconds: u64,
    token_cache_path: PathBuf,
    safety_margin_seconds: u64,
    expiry_offset_seconds: i64,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            domain_name: None,
            domain_id: None,
            project_id: None,
            username: None,
            region: DEFAULT_REGION.to_string(),
            identity_url: None,
            network_url: None,
            proxy: None,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            token_cache_path: PathBuf::from(DEFAULT_TOKEN_CACHE_FILE_NAME),
            safety_margin_seconds: DEFAULT_SAFETY_MARGIN_SECONDS,
            expiry_offset_seconds: DEFAULT_EXPIRY_OFFSET_SECONDS,
        }
    }
}

impl Configuration {
    pub fn get_default_configuration_file_path() -> Result<PathBuf, ConfigurationError> {
        if let Ok(config_dir_str) = std::env::var(ENV_CONFIG_DIR) {
            let mut config_path = PathBuf::from(config_dir_str);
            config_path.push(DEFAULT_CONFIGURATION_FILE_NAME);
            return Ok(config_path);
        }

        match config_dir() {
            Some(configuration_directory) => {
                let mut default_config_file_path = configuration_directory;
                default_config_file_path.push(DEFAULT_APPLICATION_ID);
                default_config_file_path.push(DEFAULT_CONFIGURATION_FILE_NAME);

                Ok(default_config_file_path)
            }
            None => Err(ConfigurationError::FailedToFindConfigurationDirectory),
        }
    }

    /// Load the default configuration, falling back to defaults when there is no file yet
    pub fn load_default() -> Result<Configuration, ConfigurationError> {
        let default_file_path = Configuration::get_default_configuration_file_path()?;
        debug!("Loading configuration from {:?}...", default_file_path);

        if !default_file_path.exists() {
            debug!("Configuration file not found, using defaults");
            return Ok(Configuration::default());
        }
        Configuration::load_from_file(default_file_path)
    }

    pub fn load_from_file(path: PathBuf) -> Result<Configuration, ConfigurationError> {
        let configuration: Configuration = match fs::read_to_string(path) {
            Ok(configuration) => match serde_yaml::from_str(&configuration) {
                Ok(configuration) => configuration,
                Err(cause) => {
                    return Err(ConfigurationError::FailedToLoadData {
                        cause: Box::new(cause),
                    })
                }
            },
            Err(cause) => {
                return Err(ConfigurationError::FailedToLoadData {
                    cause: Box::new(cause),
                })
            }
        };

        configuration.expiry_policy()?;
        Ok(configuration)
    }

    /// Expiry policy built from the configured margin and offset.
    pub fn expiry_policy(&self) -> Result<ExpiryPolicy, ConfigurationError> {
        Ok(ExpiryPolicy::from_configuration(self)?)
    }

    pub fn write(&self, writer: Box<dyn Write>) -> Result<(), ConfigurationError> {
        match serde_yaml::to_writer(writer, self) {
            Ok(()) => Ok(()),
            Err(e) => Err(ConfigurationError::FailedToWriteData { cause: Box::new(e) }),
        }
    }

    pub fn save(&self, path: &PathBuf) -> Result<(), ConfigurationError> {
        // first check if the parent directory exists and try to create it if not
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                if fs::create_dir_all(parent).is_err() {
                    return Err(ConfigurationError::FailedToFindConfigurationDirectory);
                }
            }
            Some(_) => (),
            None => return Err(ConfigurationError::FailedToFindConfigurationDirectory),
        }

        match File::create(path) {
            Ok(file) => {
                let writer: Box<dyn Write> = Box::new(file);
                self.write(writer)
            }
            Err(e) => Err(ConfigurationError::FailedToWriteData { cause: Box::new(e) }),
        }
    }

    pub fn save_to_default(&self) -> Result<(), ConfigurationError> {
        self.save(&Self::get_default_configuration_file_path()?)
    }

    pub fn domain_name(&self) -> Option<&str> {
        self.domain_name.as_deref()
    }

    pub fn domain_id(&self) -> Option<&str> {
        self.domain_id.as_deref()
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn proxy(&self) -> Option<&Url> {
        self.proxy.as_ref()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn safety_margin_seconds(&self) -> u64 {
        self.safety_margin_seconds
    }

    pub fn expiry_offset_seconds(&self) -> i64 {
        self.expiry_offset_seconds
    }

    pub fn set_domain_name(&mut self, value: &str) {
        self.domain_name = Some(value.to_string());
    }

    pub fn set_domain_id(&mut self, value: &str) {
        self.domain_id = Some(value.to_string());
    }

    pub fn set_project_id(&mut self, value: &str) {
        self.project_id = Some(value.to_string());
    }

    pub fn set_username(&mut self, value: &str) {
        self.username = Some(value.to_string());
    }

    pub fn set_region(&mut self, value: &str) {
        self.region = value.to_string();
    }

    pub fn set_token_cache_path(&mut self, path: PathBuf) {
        self.token_cache_path = path;
    }

    pub fn set_safety_margin_seconds(&mut self, seconds: u64) {
        self.safety_margin_seconds = seconds;
    }

    pub fn set_expiry_offset_seconds(&mut self, seconds: i64) {
        self.expiry_offset_seconds = seconds;
    }

    pub fn set_identity_url(&mut self, url: Url) {
        self.identity_url = Some(url);
    }

    pub fn set_network_url(&mut self, url: Url) {
        self.network_url = Some(url);
    }

    /// Token cache file for this process.
    ///
    /// `K5C_TOKEN_CACHE` wins over the configured value. Relative paths are
    /// left relative, so they resolve against the working directory.
    pub fn token_cache_path(&self) -> PathBuf {
        match std::env::var(ENV_TOKEN_CACHE) {
            Ok(path) if !path.is_empty() => PathBuf::from(path),
            _ => self.token_cache_path.clone(),
        }
    }

    pub fn identity_url(&self) -> Result<Url, ConfigurationError> {
        match &self.identity_url {
            Some(url) => Ok(url.clone()),
            None => self.regional_endpoint("identity"),
        }
    }

    pub fn network_url(&self) -> Result<Url, ConfigurationError> {
        match &self.network_url {
            Some(url) => Ok(url.clone()),
            None => self.regional_endpoint("networking"),
        }
    }

    pub fn token_url(&self) -> Result<Url, ConfigurationError> {
        join_path(&self.identity_url()?, "/v3/auth/tokens")
    }

    fn regional_endpoint(&self, service: &str) -> Result<Url, ConfigurationError> {
        if self.region.is_empty() {
            return Err(ConfigurationError::MissingRequiredPropertyValue {
                name: "region".to_string(),
            });
        }
        let url = format!("https://{}.{}.cloud.global.fujitsu.com", service, self.region);
        Url::parse(&url).map_err(|_| ConfigurationError::InvalidEndpoint { url })
    }
}

/// Append `path` to `base`, keeping any path prefix the base already has.
pub fn join_path(base: &Url, path: &str) -> Result<Url, ConfigurationError> {
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|_| ConfigurationError::InvalidEndpoint { url: joined })
}

impl Formattable for Configuration {
    fn format(&self, f: &OutputFormat) -> Result<String, FormattingError> {
        match f {
            OutputFormat::Json(options) => to_json(self, options),
            OutputFormat::Csv(options) => {
                let token_cache_path = self.token_cache_path.to_string_lossy();
                to_csv_row(
                    &[
                        "DOMAIN_NAME",
                        "DOMAIN_ID",
                        "PROJECT_ID",
                        "USERNAME",
                        "REGION",
                        "TOKEN_CACHE_PATH",
                    ],
                    &[
                        self.domain_name().unwrap_or(""),
                        self.domain_id().unwrap_or(""),
                        self.project_id().unwrap_or(""),
                        self.username().unwrap_or(""),
                        self.region(),
                        token_cache_path.as_ref(),
                    ],
                    options,
                )
            }
        }
    }
}
