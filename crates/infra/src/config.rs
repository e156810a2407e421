//! Engine connection settings, read from the environment.

use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_ENGINE_URL: &str = "http://localhost:9200";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is not a valid boolean: {value}")]
    InvalidBool { name: &'static str, value: String },

    #[error("{name} is not a valid number of milliseconds: {value}")]
    InvalidMillis { name: &'static str, value: String },

    #[error("{name} is set but {missing} is not")]
    IncompleteCredentials {
        name: &'static str,
        missing: &'static str,
    },
}

/// Basic-auth credentials for the engine.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Where and how to reach the search engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub url: String,
    /// Node discovery toggle.
    pub sniff: bool,
    pub credentials: Option<Credentials>,
    /// Transport-level timeout applied to every request.
    pub timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ENGINE_URL.to_string(),
            sniff: false,
            credentials: None,
            timeout: None,
        }
    }
}

impl EngineConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Load from `CATALOG_ENGINE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("CATALOG_ENGINE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENGINE_URL.to_string());

        let sniff = match lookup("CATALOG_ENGINE_SNIFF") {
            Some(raw) => parse_bool("CATALOG_ENGINE_SNIFF", &raw)?,
            None => false,
        };

        let credentials = match (
            lookup("CATALOG_ENGINE_USERNAME"),
            lookup("CATALOG_ENGINE_PASSWORD"),
        ) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::IncompleteCredentials {
                    name: "CATALOG_ENGINE_USERNAME",
                    missing: "CATALOG_ENGINE_PASSWORD",
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::IncompleteCredentials {
                    name: "CATALOG_ENGINE_PASSWORD",
                    missing: "CATALOG_ENGINE_USERNAME",
                });
            }
        };

        let timeout = match lookup("CATALOG_ENGINE_TIMEOUT_MS") {
            Some(raw) => Some(Duration::from_millis(raw.trim().parse().map_err(|_| {
                ConfigError::InvalidMillis {
                    name: "CATALOG_ENGINE_TIMEOUT_MS",
                    value: raw.clone(),
                }
            })?)),
            None => None,
        };

        Ok(Self {
            url,
            sniff,
            credentials,
            timeout,
        })
    }
}

fn parse_bool(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            name,
            value: raw.to_string(),
        }),
    }
}
