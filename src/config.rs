//! Configuration of the Porter bot.
//!
//! The configuration is read from an optional YAML file, then overridden by
//! environment variables.
//!
//! # Configuration File Format
//!
//! ```yaml
//! line:
//!   # Channel access token used to call the Messaging API
//!   access_token: "..."
//!   # Channel secret used to verify the webhook signatures
//!   channel_secret: "..."
//!   # Base URL of the Messaging API (optional)
//!   api_url: "https://api.line.me"
//!   # Timeout of the Messaging API requests in seconds (optional)
//!   request_timeout: 10
//!
//! auth:
//!   # Password users have to send after the trigger phrase
//!   password: "..."
//!
//! server:
//!   # Address the webhook server listens on (optional)
//!   address: "0.0.0.0:8000"
//!   # Path of the webhook endpoint (optional)
//!   webhook_path: "/callback"
//! ```
//!
//! # Environment Variables
//!
//! From lowest to highest precedence:
//!
//! - `ACCESS_TOKEN`, `CHANNEL_SECRET` and `PASSWORD`
//! - any value with the `PORTER_` prefix, nested with `__`, e.g.
//!   `PORTER_LINE__ACCESS_TOKEN` or `PORTER_AUTH__PASSWORD`

use anyhow::{Context, ensure};
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::Deserialize;

/// Root configuration structure.
#[derive(Deserialize, Debug)]
pub struct Config {
    /// LINE channel configuration
    pub line: Line,
    /// User authentication configuration
    pub auth: Auth,
    /// Webhook server configuration
    #[serde(default)]
    pub server: Server,
}

/// LINE channel configuration.
#[derive(Deserialize, Debug)]
pub struct Line {
    /// Channel access token, sent as bearer token to the Messaging API.
    pub access_token: String,

    /// Channel secret, key of the webhook signatures.
    pub channel_secret: String,

    /// Base URL of the Messaging API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Timeout of each Messaging API request, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

/// User authentication configuration.
#[derive(Deserialize, Debug)]
pub struct Auth {
    /// Password shared by every user allowed to relay messages.
    pub password: String,
}

/// Webhook server configuration.
#[derive(Deserialize, Debug)]
pub struct Server {
    /// Socket address to listen on.
    #[serde(default = "default_address")]
    pub address: String,

    /// Path LINE posts the webhook events to.
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,
}

impl Default for Server {
    fn default() -> Self {
        Server {
            address: default_address(),
            webhook_path: default_webhook_path(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.line.me".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_address() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_webhook_path() -> String {
    "/callback".to_string()
}

impl Config {
    /// Loads the configuration from the YAML file at `path` and the environment.
    ///
    /// A missing file is not an error as long as the environment provides
    /// every required value.
    ///
    /// # Errors
    ///
    /// Returns an error if a required value is missing, a value has the wrong
    /// type, or the password, access token or channel secret is empty.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let config: Config = Figment::new()
            .merge(Yaml::file(path))
            .merge(
                Env::raw()
                    .only(&["ACCESS_TOKEN", "CHANNEL_SECRET"])
                    .map(|key| format!("line.{}", key.as_str().to_ascii_lowercase()).into()),
            )
            .merge(
                Env::raw()
                    .only(&["PASSWORD"])
                    .map(|_| "auth.password".into()),
            )
            .merge(Env::prefixed("PORTER_").split("__"))
            .extract()
            .with_context(|| format!("invalid configuration in {path} or environment"))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.line.access_token.is_empty(), "line.access_token is empty");
        ensure!(
            !self.line.channel_secret.is_empty(),
            "line.channel_secret is empty"
        );
        ensure!(!self.auth.password.is_empty(), "auth.password is empty");
        ensure!(
            self.server.webhook_path.starts_with('/'),
            "server.webhook_path must start with '/'"
        );
        Ok(())
    }
}
