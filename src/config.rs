//! Request-log configuration.
//!
//! Settings are read from a key/value source using the `request.log.*` keys,
//! or from the environment, where each key maps to an upper-case variable:
//!
//! ```bash
//! export REQUEST_LOG_PATH_FOR_ACTION="Web."
//! export REQUEST_LOG_MASK_PARAMS="password|cvv|cardNumber|card.cvv|card.number"
//! export REQUEST_LOG_SESSION_COOKIE="session_id"
//! export REQUEST_LOG_MAX_FORM_BYTES="65536"
//! ```
//!
//! A missing or blank value always means "use the default"; a malformed mask
//! list is never rejected.
//!
//! The demo server adds its own variables, see [`ServerConfig`]:
//!
//! - `LISTEN` - Bind address (default: `0.0.0.0:3000`)
//! - `RUST_LOG` - Log level (default: `info`)
//! - `LOG_FORMAT` - Log format: `text` or `json` (default: `text`)

use crate::error::ConfigError;
use crate::params::MaskRules;

use anyhow::Result;
use std::env;

pub const PATH_FOR_ACTION_KEY: &str = "request.log.pathForAction";
pub const MASK_PARAMS_KEY: &str = "request.log.maskParams";
pub const SESSION_COOKIE_KEY: &str = "request.log.sessionCookie";
pub const MAX_FORM_BYTES_KEY: &str = "request.log.maxFormBytes";

pub const DEFAULT_PATH_FOR_ACTION: &str = "Web.";
pub const DEFAULT_MASK_PARAMS: &str = "password|cvv|cardNumber|card.cvv|card.number";
pub const DEFAULT_SESSION_COOKIE: &str = "session_id";
pub const DEFAULT_MAX_FORM_BYTES: usize = 64 * 1024;

const MAX_FORM_BYTES_LIMIT: usize = 16 * 1024 * 1024;

/// Request-log settings, read-only once the pipeline is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Actions starting with this prefix are logged by URL path instead.
    pub path_for_action: String,
    pub mask_rules: MaskRules,
    /// Cookie holding the session id when no `SessionId` extension is present.
    pub session_cookie: String,
    /// Largest form body buffered for parameter logging.
    pub max_form_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path_for_action: DEFAULT_PATH_FOR_ACTION.to_string(),
            mask_rules: MaskRules::parse(DEFAULT_MASK_PARAMS),
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            max_form_bytes: DEFAULT_MAX_FORM_BYTES,
        }
    }
}

impl Config {
    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let path_for_action =
            value(PATH_FOR_ACTION_KEY).unwrap_or_else(|| DEFAULT_PATH_FOR_ACTION.to_string());

        let mask_rules = MaskRules::parse(
            value(MASK_PARAMS_KEY)
                .as_deref()
                .unwrap_or(DEFAULT_MASK_PARAMS),
        );

        let session_cookie = value(SESSION_COOKIE_KEY)
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| DEFAULT_SESSION_COOKIE.to_string());

        let max_form_bytes = match value(MAX_FORM_BYTES_KEY) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(
                    "{} is not a number ('{}'), using {}",
                    MAX_FORM_BYTES_KEY,
                    raw,
                    DEFAULT_MAX_FORM_BYTES
                );
                DEFAULT_MAX_FORM_BYTES
            }),
            None => DEFAULT_MAX_FORM_BYTES,
        };

        Self {
            path_for_action,
            mask_rules,
            session_cookie,
            max_form_bytes,
        }
    }

    /// Loads configuration from `REQUEST_LOG_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(env_var_name(key)).ok())
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `path_for_action` is empty
    /// - `session_cookie` contains whitespace, `;`, `=` or `,`
    /// - `max_form_bytes` exceeds 16 MiB
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path_for_action.is_empty() {
            return Err(ConfigError::Empty {
                key: PATH_FOR_ACTION_KEY,
            });
        }

        if self
            .session_cookie
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, ';' | '=' | ','))
        {
            return Err(ConfigError::InvalidCharacters {
                key: SESSION_COOKIE_KEY,
                value: self.session_cookie.clone(),
            });
        }

        if self.max_form_bytes > MAX_FORM_BYTES_LIMIT {
            return Err(ConfigError::OutOfRange {
                key: MAX_FORM_BYTES_KEY,
                value: self.max_form_bytes,
                max: MAX_FORM_BYTES_LIMIT,
            });
        }

        Ok(())
    }

    /// Prints configuration summary.
    pub fn print_summary(&self) {
        tracing::info!("Request log configuration:");
        tracing::info!("  Path for action prefix: {}", self.path_for_action);
        tracing::info!("  Masked params: {}", self.mask_rules.terms().join("|"));
        tracing::info!("  Session cookie: {}", self.session_cookie);
        tracing::info!("  Max form bytes: {}", self.max_form_bytes);
    }
}

/// Maps `request.log.maskParams` to `REQUEST_LOG_MASK_PARAMS`.
pub fn env_var_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len() + 4);
    let mut prev_lower = false;

    for c in key.chars() {
        if c == '.' {
            name.push('_');
            prev_lower = false;
        } else if c.is_ascii_uppercase() && prev_lower {
            name.push('_');
            name.push(c);
            prev_lower = false;
        } else {
            name.push(c.to_ascii_uppercase());
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }

    name
}

/// Settings of the demo server binary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub log_level: String,
    pub log_format: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            listen_addr: env::var("LISTEN").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string()),
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `log_format` is not `text` or `json`, or if
    /// `listen_addr` is not `host:port`.
    pub fn validate(&self) -> Result<()> {
        if self.log_format != "text" && self.log_format != "json" {
            anyhow::bail!(
                "LOG_FORMAT must be 'text' or 'json', got '{}'",
                self.log_format
            );
        }

        if !self.listen_addr.contains(':') {
            anyhow::bail!(
                "LISTEN must be in format 'host:port', got '{}'",
                self.listen_addr
            );
        }

        Ok(())
    }
}
