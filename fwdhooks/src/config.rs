//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `FWDHOOKS_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `FWDHOOKS_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `FWDHOOKS_WEBHOOKS__TIMEOUT=5s` sets the `webhooks.timeout` field.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use fwdhooks::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//!
//! println!("Server will bind to {}:{}", config.host, config.port);
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration Structure
//!
//! - **Server**: `host`, `port`
//! - **Product**: `product_name` - used in outbound `X-<Product>-*` headers and the `User-Agent`
//! - **Security**: `api_token`, `cors.allowed_origins`
//! - **Features**: `enable_metrics`, `enable_otel_export`
//! - **Webhooks**: `webhooks.timeout`, `webhooks.max_concurrent_sends`, `webhooks.retry`,
//!   `webhooks.subscriptions` (endpoints registered at startup)
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! FWDHOOKS_PORT=8080
//! FWDHOOKS_PRODUCT_NAME=Freightdesk
//! FWDHOOKS_WEBHOOKS__MAX_CONCURRENT_SENDS=50
//! FWDHOOKS_WEBHOOKS__RETRY__MAX_ATTEMPTS=3
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::errors::Error;
use crate::webhooks::WebhookEventType;
use crate::webhooks::delivery::validate_endpoint_url;
use crate::webhooks::registry::SubscriptionConfig;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "FWDHOOKS_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// All fields have defaults defined in the `Default` implementation, so an empty YAML file is a
/// valid configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Product name substituted into outbound headers, e.g. `X-Freightdesk-Event`
    pub product_name: String,
    /// Bearer token required on `/api/v1/*` when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    /// Expose Prometheus metrics at `/internal/metrics`
    pub enable_metrics: bool,
    /// Export traces over OTLP (configured via standard `OTEL_*` variables)
    pub enable_otel_export: bool,
    pub cors: CorsConfig,
    pub webhooks: WebhookConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3002,
            product_name: "Freightdesk".to_string(),
            api_token: None,
            enable_metrics: true,
            enable_otel_export: false,
            cors: CorsConfig::default(),
            webhooks: WebhookConfig::default(),
        }
    }
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests (default: none)
    pub allowed_origins: Vec<CorsOrigin>,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

/// Allowed CORS origin.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://backoffice.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

/// Webhook delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebhookConfig {
    /// HTTP timeout per delivery attempt (default: 10s)
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Maximum concurrent outbound HTTP requests (default: 20)
    pub max_concurrent_sends: usize,
    /// Buffer capacity of the internal send queue (default: 200). Deliveries that don't fit are
    /// dropped and logged.
    pub channel_capacity: usize,
    /// Number of recent delivery outcomes kept in memory (default: 100)
    pub delivery_log_capacity: usize,
    /// Reject non-HTTPS subscriber URLs at the API and in seeds (default: false)
    pub require_https: bool,
    /// How long shutdown waits for queued and in-flight deliveries (default: 10s)
    #[serde(with = "humantime_serde")]
    pub shutdown_grace_period: Duration,
    pub retry: RetryConfig,
    /// Subscriptions registered at startup
    pub subscriptions: Vec<SubscriptionSeed>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_concurrent_sends: 20,
            channel_capacity: 200,
            delivery_log_capacity: 100,
            require_https: false,
            shutdown_grace_period: Duration::from_secs(10),
            retry: RetryConfig::default(),
            subscriptions: vec![],
        }
    }
}

/// Optional retry for failed deliveries.
///
/// The default of a single attempt means failures are logged and never retried.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts per delivery, including the first (default: 1)
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles on each further attempt (default: 1s)
    #[serde(with = "humantime_serde")]
    pub initial_backoff: Duration,
    /// Upper bound on the delay between attempts (default: 30s)
    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,
    /// Randomize each delay between half and the full backoff (default: true)
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            jitter: true,
        }
    }
}

/// A subscription declared in the config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SubscriptionSeed {
    pub url: String,
    pub events: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_active() -> bool {
    true
}

impl From<&SubscriptionSeed> for SubscriptionConfig {
    fn from(seed: &SubscriptionSeed) -> Self {
        Self {
            url: seed.url.clone(),
            events: seed.events.iter().cloned().collect(),
            secret: seed.secret.clone(),
            active: seed.active,
            description: seed.description.clone(),
        }
    }
}

impl Config {
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables override specific values; FWDHOOKS_CONFIG names the file itself
            .merge(Env::prefixed("FWDHOOKS_").ignore(&["config"]).split("__"))
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.product_name.is_empty() || !self.product_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(Error::Internal {
                operation: format!(
                    "Config validation: product_name '{}' must be non-empty and contain only ASCII letters, digits or '-' \
                     since it is used in HTTP header names",
                    self.product_name
                ),
            });
        }

        if self.api_token.as_deref() == Some("") {
            return Err(Error::Internal {
                operation: "Config validation: api_token is set but empty. Remove it to disable API authentication.".to_string(),
            });
        }

        let webhooks = &self.webhooks;
        if webhooks.timeout.is_zero() {
            return Err(Error::Internal {
                operation: "Config validation: webhooks.timeout must be greater than zero".to_string(),
            });
        }
        if webhooks.max_concurrent_sends == 0 {
            return Err(Error::Internal {
                operation: "Config validation: webhooks.max_concurrent_sends must be at least 1".to_string(),
            });
        }
        if webhooks.channel_capacity == 0 {
            return Err(Error::Internal {
                operation: "Config validation: webhooks.channel_capacity must be at least 1".to_string(),
            });
        }
        if webhooks.retry.max_attempts == 0 {
            return Err(Error::Internal {
                operation: "Config validation: webhooks.retry.max_attempts must be at least 1".to_string(),
            });
        }
        if webhooks.retry.initial_backoff > webhooks.retry.max_backoff {
            return Err(Error::Internal {
                operation: "Config validation: webhooks.retry.initial_backoff cannot exceed webhooks.retry.max_backoff".to_string(),
            });
        }

        for (i, seed) in webhooks.subscriptions.iter().enumerate() {
            validate_endpoint_url(&seed.url, webhooks.require_https).map_err(|e| Error::Internal {
                operation: format!("Config validation: webhooks.subscriptions[{}]: {}", i, e),
            })?;
            for event in &seed.events {
                event.parse::<WebhookEventType>().map_err(|e| Error::Internal {
                    operation: format!("Config validation: webhooks.subscriptions[{}]: {}", i, e),
                })?;
            }
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
