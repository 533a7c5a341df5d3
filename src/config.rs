//! Environment-based configuration.
//!
//! Every setting comes from environment variables, read and validated once at
//! startup. Missing required variables are collected and reported together so
//! a misconfigured deployment fails with one actionable message instead of
//! dying one variable at a time.

use std::collections::HashMap;

// ── Environment keys ─────────────────────────────────────────────────────────

pub const ENV_SLACK_BOT_TOKEN: &str = "SLACK_BOT_TOKEN";
pub const ENV_SLACK_SIGNING_SECRET: &str = "SLACK_SIGNING_SECRET";
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_GITHUB_OWNER: &str = "GITHUB_OWNER";
pub const ENV_GITHUB_REPO: &str = "GITHUB_REPO";
pub const ENV_DIFY_API_KEY: &str = "DIFY_API_KEY";
pub const ENV_DIFY_APPLICATION_ID: &str = "DIFY_APPLICATION_ID";
pub const ENV_DIFY_BASE_URL: &str = "DIFY_BASE_URL";
pub const ENV_PORT: &str = "PORT";

const DEFAULT_PORT: u16 = 3000;

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("required environment variables are missing: {0}")]
    MissingEnv(String),
    #[error("{key} is invalid: {message}")]
    InvalidValue { key: &'static str, message: String },
}

// ── Config ───────────────────────────────────────────────────────────────────

/// Validated process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub slack_bot_token: String,
    /// Signing secret for inbound Slack requests. When absent the events
    /// endpoint accepts unsigned requests and logs a warning at startup.
    pub slack_signing_secret: Option<String>,
    pub github_token: String,
    pub github_owner: String,
    pub github_repo: String,
    pub dify_api_key: String,
    pub dify_application_id: String,
    /// Override for the Dify API base URL (self-hosted deployments).
    pub dify_base_url: Option<String>,
    pub port: u16,
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Build a config from an explicit variable map.
    ///
    /// Blank values count as missing. All absent required keys are reported
    /// in a single [`ConfigError::MissingEnv`].
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            vars.get(key)
                .map(String::as_str)
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let mut missing: Vec<&str> = Vec::new();
        let mut require = |key: &'static str| match get(key) {
            Some(v) => v.to_string(),
            None => {
                missing.push(key);
                String::new()
            }
        };

        let slack_bot_token = require(ENV_SLACK_BOT_TOKEN);
        let github_token = require(ENV_GITHUB_TOKEN);
        let github_owner = require(ENV_GITHUB_OWNER);
        let github_repo = require(ENV_GITHUB_REPO);
        let dify_api_key = require(ENV_DIFY_API_KEY);
        let dify_application_id = require(ENV_DIFY_APPLICATION_ID);

        if !missing.is_empty() {
            return Err(ConfigError::MissingEnv(missing.join(", ")));
        }

        let port = match get(ENV_PORT) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_PORT,
                message: format!("'{raw}' is not a valid port number"),
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            slack_bot_token,
            slack_signing_secret: get(ENV_SLACK_SIGNING_SECRET).map(str::to_string),
            github_token,
            github_owner,
            github_repo,
            dify_api_key,
            dify_application_id,
            dify_base_url: get(ENV_DIFY_BASE_URL).map(str::to_string),
            port,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn full_vars() -> HashMap<String, String> {
        [
            (ENV_SLACK_BOT_TOKEN, "xoxb-test"),
            (ENV_GITHUB_TOKEN, "ghp_test"),
            (ENV_GITHUB_OWNER, "acme"),
            (ENV_GITHUB_REPO, "app"),
            (ENV_DIFY_API_KEY, "dify-key"),
            (ENV_DIFY_APPLICATION_ID, "dify-app"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn loads_with_all_required_vars() {
        let config = Config::from_vars(&full_vars()).unwrap();
        assert_eq!(config.slack_bot_token, "xoxb-test");
        assert_eq!(config.github_owner, "acme");
        assert_eq!(config.github_repo, "app");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.slack_signing_secret, None);
        assert_eq!(config.dify_base_url, None);
    }

    #[test]
    fn reports_every_missing_var_at_once() {
        let mut vars = full_vars();
        vars.remove(ENV_GITHUB_TOKEN);
        vars.remove(ENV_DIFY_API_KEY);

        let err = Config::from_vars(&vars).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains(ENV_GITHUB_TOKEN), "got: {msg}");
        assert!(msg.contains(ENV_DIFY_API_KEY), "got: {msg}");
        assert!(!msg.contains(ENV_SLACK_BOT_TOKEN), "got: {msg}");
    }

    #[test]
    fn blank_value_counts_as_missing() {
        let mut vars = full_vars();
        vars.insert(ENV_GITHUB_OWNER.to_string(), "   ".to_string());

        let err = Config::from_vars(&vars).unwrap_err();
        assert!(err.to_string().contains(ENV_GITHUB_OWNER));
    }

    #[test]
    fn optional_vars_are_picked_up() {
        let mut vars = full_vars();
        vars.insert(ENV_SLACK_SIGNING_SECRET.to_string(), "sss".to_string());
        vars.insert(
            ENV_DIFY_BASE_URL.to_string(),
            "http://dify.internal/v1".to_string(),
        );
        vars.insert(ENV_PORT.to_string(), "8080".to_string());

        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(config.slack_signing_secret.as_deref(), Some("sss"));
        assert_eq!(config.dify_base_url.as_deref(), Some("http://dify.internal/v1"));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn rejects_non_numeric_port() {
        let mut vars = full_vars();
        vars.insert(ENV_PORT.to_string(), "http".to_string());

        let err = Config::from_vars(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == ENV_PORT));
    }
}
