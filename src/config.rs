// Settings sourced from the environment (and an optional `.env` file).

use crate::error::{ClientError, Result};
use reqwest::Url;
use std::fmt;
use std::time::Duration;

pub const ENV_API_URL: &str = "LANGCONNECT_API_URL";
pub const ENV_API_KEY: &str = "LANGCONNECT_API_KEY";
pub const ENV_ADMIN_EMAIL: &str = "LANGCONNECT_ADMIN_EMAIL";
pub const ENV_ADMIN_PASSWORD: &str = "LANGCONNECT_ADMIN_PASSWORD";
pub const ENV_TIMEOUT_SECS: &str = "LANGCONNECT_TIMEOUT_SECS";

/// Per-request timeout ceiling applied to every call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);

/// How the client proves who it is.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Static key sent as a bearer token; never needs a sign-in round trip.
    ApiKey(String),
    /// Exchanged for an access/refresh token pair via `/auth/signin`.
    Password { email: String, password: String },
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::ApiKey(_) => f.write_str("ApiKey(***)"),
            Credential::Password { email, .. } => f
                .debug_struct("Password")
                .field("email", email)
                .field("password", &"***")
                .finish(),
        }
    }
}

/// Everything the client needs before it can talk to the API.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub credential: Option<Credential>,
    pub timeout: Duration,
}

impl Settings {
    /// Build settings from explicit values, normalizing the base URL.
    pub fn new(base_url: &str, credential: Option<Credential>) -> Result<Self> {
        Ok(Settings {
            base_url: normalize_base_url(base_url)?,
            credential,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load `.env` from the working directory (if any), then read the
    /// process environment.
    pub fn from_env() -> Result<Self> {
        // A missing .env file is normal.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`, treating empty values as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let base_url = get(ENV_API_URL).ok_or_else(|| {
            ClientError::Configuration(format!("'{ENV_API_URL}' environment variable not set!"))
        })?;

        let credential = match (get(ENV_API_KEY), get(ENV_ADMIN_EMAIL), get(ENV_ADMIN_PASSWORD)) {
            (Some(key), _, _) => Some(Credential::ApiKey(key)),
            (None, Some(email), Some(password)) => Some(Credential::Password { email, password }),
            (None, Some(_), None) => {
                return Err(ClientError::Configuration(format!(
                    "'{ENV_ADMIN_PASSWORD}' environment variable not set!"
                )))
            }
            (None, None, Some(_)) => {
                return Err(ClientError::Configuration(format!(
                    "'{ENV_ADMIN_EMAIL}' environment variable not set!"
                )))
            }
            (None, None, None) => None,
        };

        let timeout = match get(ENV_TIMEOUT_SECS) {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    ClientError::Configuration(format!(
                        "'{ENV_TIMEOUT_SECS}' must be a whole number of seconds, got '{raw}'"
                    ))
                })?;
                timeout_from_secs(secs)?
            }
            None => DEFAULT_TIMEOUT,
        };

        Ok(Settings::new(&base_url, credential)?.with_timeout(timeout))
    }
}

/// Request timeout in whole seconds. Zero would fail every request at once.
pub fn timeout_from_secs(secs: u64) -> Result<Duration> {
    if secs == 0 {
        return Err(ClientError::Configuration(
            "timeout must be at least one second".into(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

/// Validate the URL and drop a trailing slash so endpoints can be appended.
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    Url::parse(trimmed)
        .map_err(|e| ClientError::Configuration(format!("invalid base URL '{trimmed}': {e}")))?;
    Ok(trimmed.strip_suffix('/').unwrap_or(trimmed).to_string())
}
