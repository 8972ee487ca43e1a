//! Configuration management for the TeamDynamix client.
//!
//! This module handles loading configuration from environment variables,
//! with validation to ensure all required values are present. Every loader
//! has a `from_lookup` twin that takes a variable lookup function, so tests
//! never have to touch the process environment.

use std::env;
use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::TdxError;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default chat-completions endpoint for the ticket generator.
pub const DEFAULT_GENERATOR_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model for the ticket generator.
pub const DEFAULT_GENERATOR_MODEL: &str = "gpt-4o-mini";

/// Credentials used to obtain a bearer token.
///
/// Exactly one pair is held. Secrets are redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Regular user login via `POST /api/auth`.
    Password {
        /// TeamDynamix username.
        username: String,
        /// Password for the user.
        password: String,
    },
    /// Administrative login via `POST /api/auth/loginadmin`.
    Admin {
        /// Business entity ID.
        beid: String,
        /// Web services key paired with the BEID.
        web_services_key: String,
    },
}

impl Credentials {
    /// Picks a credential pair from optional parts.
    ///
    /// The admin pair wins when both pairs are complete. A pair counts only
    /// when both halves are non-empty after trimming.
    ///
    /// # Errors
    ///
    /// Returns `TdxError::Config` if neither pair is complete.
    pub fn resolve(
        username: Option<String>,
        password: Option<String>,
        beid: Option<String>,
        web_services_key: Option<String>,
    ) -> Result<Self, TdxError> {
        if let (Some(beid), Some(web_services_key)) = (non_empty(beid), non_empty(web_services_key))
        {
            return Ok(Credentials::Admin {
                beid,
                web_services_key,
            });
        }

        if let (Some(username), Some(password)) = (non_empty(username), non_empty(password)) {
            return Ok(Credentials::Password { username, password });
        }

        Err(TdxError::invalid_config(
            "either username/password or BEID/WebServicesKey must be provided",
        ))
    }

    /// Returns true for the administrative (BEID) flow.
    pub fn is_admin(&self) -> bool {
        matches!(self, Credentials::Admin { .. })
    }

    /// Returns the secret half of the pair, for message sanitization only.
    pub(crate) fn secret(&self) -> &str {
        match self {
            Credentials::Password { password, .. } => password,
            Credentials::Admin {
                web_services_key, ..
            } => web_services_key,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            Credentials::Admin { beid, .. } => f
                .debug_struct("Admin")
                .field("beid", beid)
                .field("web_services_key", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Configuration for connecting to TeamDynamix.
///
/// The secret half of the credentials is stored but never logged or exposed
/// in error messages.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the TDX instance without trailing slash
    /// (e.g., `https://example.teamdynamix.com/TDWebApi`).
    pub base_url: String,

    /// Timeout applied to every HTTP call.
    pub timeout: Duration,

    credentials: Credentials,
}

impl Config {
    /// Builds a configuration from explicit values.
    ///
    /// # Errors
    ///
    /// Returns `TdxError::Config` if the base URL is empty or malformed.
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Result<Self, TdxError> {
        let base_url = Self::validate_base_url(base_url.into())?;

        Ok(Config {
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            credentials,
        })
    }

    /// Overrides the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the credentials used for login.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Loads configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `TDX_BASE_URL` (or `BASE_URL`): required
    /// - `TDX_USERNAME` / `TDX_PASSWORD`: user credentials
    /// - `TDX_BEID` (or `BEID`) / `TDX_WEB_SERVICES_KEY` (or `WEB_SERVICES_KEY`): admin credentials
    /// - `TDX_TIMEOUT_SECS`: optional, defaults to 30
    ///
    /// # Errors
    ///
    /// Returns `TdxError::Config` if the base URL is missing or invalid, if no
    /// complete credential pair is set, or if a secret looks like a placeholder.
    pub fn from_env() -> Result<Self, TdxError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TdxError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = first_set(&lookup, &["TDX_BASE_URL", "BASE_URL"])
            .ok_or_else(|| TdxError::missing_env("TDX_BASE_URL"))?;

        let credentials = Credentials::resolve(
            first_set(&lookup, &["TDX_USERNAME"]),
            first_set(&lookup, &["TDX_PASSWORD"]),
            first_set(&lookup, &["TDX_BEID", "BEID"]),
            first_set(&lookup, &["TDX_WEB_SERVICES_KEY", "WEB_SERVICES_KEY"]),
        )?;
        Self::validate_secret(credentials.secret())?;

        let timeout = match first_set(&lookup, &["TDX_TIMEOUT_SECS"]) {
            Some(raw) => Duration::from_secs(parse_number::<u64>("TDX_TIMEOUT_SECS", &raw)?),
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self::new(base_url, credentials)?.with_timeout(timeout))
    }

    /// Validates and normalizes the base URL.
    fn validate_base_url(url: String) -> Result<String, TdxError> {
        let url = url.trim().trim_end_matches('/').to_string();

        if url.is_empty() {
            return Err(TdxError::invalid_config("base URL is required"));
        }

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(TdxError::invalid_config(
                "base URL must start with http:// or https://",
            ));
        }

        Url::parse(&url)
            .map_err(|e| TdxError::invalid_config(format!("invalid base URL: {}", e)))?;

        Ok(url)
    }

    /// Validates a secret is not a placeholder value.
    fn validate_secret(secret: &str) -> Result<(), TdxError> {
        let lower = secret.to_lowercase();
        let placeholder_patterns = ["your_password", "your_key", "placeholder", "changeme"];

        for pattern in placeholder_patterns {
            if lower.contains(pattern) {
                return Err(TdxError::invalid_config(
                    "credential secret appears to be a placeholder value",
                ));
            }
        }

        Ok(())
    }
}

/// Default field values used when the CLI creates tickets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketDefaults {
    /// Ticketing application ID.
    pub app_id: u32,
    /// Account/department ID.
    pub account_id: i64,
    /// Ticket type ID.
    pub type_id: i64,
    /// Status used when the user accepts the default.
    pub status_id: i64,
    /// Source ID.
    pub source_id: i64,
    /// Priority ID.
    pub priority_id: i64,
    /// Responsible group ID.
    pub responsible_group_id: i64,
    /// UID of the requestor.
    pub requestor_uid: String,
    /// Requestor email, sent as an additional field when present.
    pub requestor_email: Option<String>,
}

impl TicketDefaults {
    /// Loads ticket defaults from environment variables.
    ///
    /// `TDX_APP_ID` and `REQUESTOR_UID` are required; numeric IDs fall back
    /// to the values of the reference TDX tenant.
    pub fn from_env() -> Result<Self, TdxError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads ticket defaults through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TdxError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_id = first_set(&lookup, &["TDX_APP_ID"])
            .ok_or_else(|| TdxError::missing_env("TDX_APP_ID"))?;
        let app_id = parse_number::<u32>("TDX_APP_ID", &app_id)?;

        let requestor_uid = first_set(&lookup, &["REQUESTOR_UID"])
            .ok_or_else(|| TdxError::missing_env("REQUESTOR_UID"))?;

        let id_or = |name: &str, default: i64| -> Result<i64, TdxError> {
            match first_set(&lookup, &[name]) {
                Some(raw) => parse_number::<i64>(name, &raw),
                None => Ok(default),
            }
        };

        Ok(TicketDefaults {
            app_id,
            account_id: id_or("TDX_ACCOUNT_ID", 8811)?,
            type_id: id_or("TDX_TYPE_ID", 4713)?,
            status_id: id_or("TDX_STATUS_ID", 28549)?,
            source_id: id_or("TDX_SOURCE_ID", 1648)?,
            priority_id: id_or("TDX_PRIORITY_ID", 864)?,
            responsible_group_id: id_or("TDX_RESPONSIBLE_GROUP_ID", 1110)?,
            requestor_uid,
            requestor_email: first_set(&lookup, &["REQUESTOR_EMAIL"]),
        })
    }
}

/// Settings for the synthetic ticket generator.
#[derive(Clone)]
pub struct GeneratorConfig {
    /// Chat-completions base URL without trailing slash.
    pub base_url: String,
    /// Model name.
    pub model: String,
    /// Prompt template sent as the user message.
    pub prompt: String,
    api_key: String,
}

impl GeneratorConfig {
    /// Builds a generator configuration with the default endpoint and model.
    pub fn new(api_key: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_GENERATOR_BASE_URL.to_string(),
            model: DEFAULT_GENERATOR_MODEL.to_string(),
            prompt: prompt.into(),
            api_key: api_key.into(),
        }
    }

    /// Overrides the chat-completions base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Returns the API key. Never log this value.
    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Loads the generator configuration, or `None` when `OPENAI_API_KEY` is unset.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads the generator configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = first_set(&lookup, &["OPENAI_API_KEY"])?;
        let prompt = lookup("MODEL_PROMPT").unwrap_or_default();

        let mut config = Self::new(api_key, prompt);
        if let Some(base_url) = first_set(&lookup, &["OPENAI_BASE_URL"]) {
            config = config.with_base_url(base_url);
        }
        if let Some(model) = first_set(&lookup, &["OPENAI_MODEL"]) {
            config = config.with_model(model);
        }
        Some(config)
    }
}

impl fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Returns the first variable among `names` that is set to a non-blank value.
fn first_set<F>(lookup: &F, names: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    names
        .iter()
        .find_map(|name| non_empty(lookup(*name)))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, TdxError> {
    raw.trim().parse::<T>().map_err(|_| {
        TdxError::invalid_config(format!("{} must be an integer, got {:?}", name, raw))
    })
}
