use serde::Deserialize;

use crate::models::common::EntitlementPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default)]
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    #[serde(default = "default_verify_signature")]
    pub verify_signature: bool,
    // PayTabs profile server key, used as the HMAC secret
    #[serde(default)]
    pub server_key: Option<String>,
    #[serde(default)]
    pub entitlement_policy: EntitlementPolicy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub log_bodies: bool,
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_verify_signature() -> bool {
    true
}

impl WebhookConfig {
    /// Fails when signature verification is on but no server key is configured
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        let has_key = self
            .server_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty());

        if self.verify_signature && !has_key {
            return Err(config::ConfigError::Message(
                "webhook.server_key is required when webhook.verify_signature is enabled"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for environment variable overrides)
        dotenvy::dotenv().ok();

        // Build config from config.yml (required) with environment variable overrides
        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(true))
            .add_source(
                config::Environment::with_prefix("VIP_WEBHOOK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.webhook.validate()?;

        Ok(config)
    }
}
