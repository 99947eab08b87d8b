//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `PAYPAL_CLIENT_ID` - PayPal REST app client ID
//! - `PAYPAL_SECRET` - PayPal REST app secret
//!
//! ## Optional
//! - `DATABASE_PATH` - SQLite database file (default: pasteleria.db)
//! - `IGNORE_DB_MISSING` - Create the database file when absent (`1`/`true`)
//! - `HOST` - Bind address (default: 127.0.0.1)
//! - `PORT` - Listen port (default: 3001)
//! - `BASE_URL` - Public URL of the API (default: `http://localhost:{PORT}`)
//! - `PAYPAL_ENV` - `sandbox` or `live` (default: sandbox)
//! - `PAYPAL_API_BASE` - Override the PayPal API base URL
//! - `CLP_USD_RATE` - Chilean pesos per US dollar (default: 950)
//! - `CORS_ORIGIN` - Allowed browser origin for the SPA
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_TRACES_SAMPLE_RATE` - Sentry performance sampling (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;

/// Default CLP per USD when `CLP_USD_RATE` is not set.
pub const DEFAULT_CLP_USD_RATE: &str = "950";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Path of the SQLite database file
    pub database_path: PathBuf,
    /// Create the database file when it does not exist
    pub ignore_db_missing: bool,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the API
    pub base_url: String,
    /// PayPal REST configuration
    pub paypal: PayPalConfig,
    /// Chilean pesos per US dollar, used for PayPal totals
    pub clp_usd_rate: Decimal,
    /// Browser origin allowed by CORS
    pub cors_origin: Option<String>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
    /// Sentry traces sample rate (0.0 - 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// PayPal deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayPalEnvironment {
    #[default]
    Sandbox,
    Live,
}

impl PayPalEnvironment {
    /// REST API base URL for this environment.
    #[must_use]
    pub const fn api_base(self) -> &'static str {
        match self {
            Self::Sandbox => "https://api-m.sandbox.paypal.com",
            Self::Live => "https://api-m.paypal.com",
        }
    }
}

impl FromStr for PayPalEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "live" => Ok(Self::Live),
            other => Err(format!("expected 'sandbox' or 'live', got '{other}'")),
        }
    }
}

/// PayPal REST configuration.
///
/// Implements `Debug` manually to redact the secret.
#[derive(Clone)]
pub struct PayPalConfig {
    /// REST app client ID
    pub client_id: String,
    /// REST app secret
    pub secret: SecretString,
    /// Sandbox or live
    pub environment: PayPalEnvironment,
    /// API base URL (derived from `environment` unless overridden)
    pub api_base: String,
}

impl std::fmt::Debug for PayPalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayPalConfig")
            .field("client_id", &self.client_id)
            .field("secret", &"[REDACTED]")
            .field("environment", &self.environment)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_path = PathBuf::from(get_env_or_default("DATABASE_PATH", "pasteleria.db"));
        let ignore_db_missing = get_optional_env("IGNORE_DB_MISSING").is_some_and(|v| parse_flag(&v));
        let host = get_env_or_default("HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("PORT", "3001")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;
        let base_url =
            get_optional_env("BASE_URL").unwrap_or_else(|| format!("http://localhost:{port}"));

        let paypal = PayPalConfig::from_env()?;
        let clp_usd_rate = parse_rate(&get_env_or_default("CLP_USD_RATE", DEFAULT_CLP_USD_RATE))
            .map_err(|e| ConfigError::InvalidEnvVar("CLP_USD_RATE".to_string(), e))?;

        let cors_origin = get_optional_env("CORS_ORIGIN");
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_traces_sample_rate = get_env_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.0")
            .parse::<f32>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("SENTRY_TRACES_SAMPLE_RATE".to_string(), e.to_string())
            })?;

        Ok(Self {
            database_path,
            ignore_db_missing,
            host,
            port,
            base_url,
            paypal,
            clp_usd_rate,
            cors_origin,
            sentry_dsn,
            sentry_environment,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies must carry the `Secure` flag.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl PayPalConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let environment = get_env_or_default("PAYPAL_ENV", "sandbox")
            .parse::<PayPalEnvironment>()
            .map_err(|e| ConfigError::InvalidEnvVar("PAYPAL_ENV".to_string(), e))?;
        let api_base = get_optional_env("PAYPAL_API_BASE")
            .unwrap_or_else(|| environment.api_base().to_string());

        Ok(Self {
            client_id: get_required_env("PAYPAL_CLIENT_ID")?,
            secret: SecretString::from(get_required_env("PAYPAL_SECRET")?),
            environment,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Interpret `1`, `true`, `yes` and `on` as enabled.
fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Parse a strictly positive CLP-per-USD rate.
fn parse_rate(value: &str) -> Result<Decimal, String> {
    let rate = Decimal::from_str(value.trim()).map_err(|e| e.to_string())?;
    if rate <= Decimal::ZERO {
        return Err(format!("must be greater than zero (got {rate})"));
    }
    Ok(rate)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn paypal_config() -> PayPalConfig {
        PayPalConfig {
            client_id: "client_id_value".to_string(),
            secret: SecretString::from("super_secret_paypal_value"),
            environment: PayPalEnvironment::Sandbox,
            api_base: PayPalEnvironment::Sandbox.api_base().to_string(),
        }
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag(" yes "));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("950").unwrap(), Decimal::from(950));
        assert_eq!(parse_rate(" 912.5 ").unwrap(), Decimal::new(9125, 1));
        assert!(parse_rate("0").is_err());
        assert!(parse_rate("-3").is_err());
        assert!(parse_rate("abc").is_err());
    }

    #[test]
    fn test_paypal_environment() {
        assert_eq!("sandbox".parse::<PayPalEnvironment>().unwrap(), PayPalEnvironment::Sandbox);
        assert_eq!("LIVE".parse::<PayPalEnvironment>().unwrap(), PayPalEnvironment::Live);
        assert!("production".parse::<PayPalEnvironment>().is_err());
        assert_eq!(
            PayPalEnvironment::Live.api_base(),
            "https://api-m.paypal.com"
        );
    }

    #[test]
    fn test_socket_addr_and_secure() {
        let config = StorefrontConfig {
            database_path: PathBuf::from("pasteleria.db"),
            ignore_db_missing: false,
            host: "127.0.0.1".parse().unwrap(),
            port: 3001,
            base_url: "https://api.pasteleriamilsabores.cl".to_string(),
            paypal: paypal_config(),
            clp_usd_rate: Decimal::from(950),
            cors_origin: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_traces_sample_rate: 0.0,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3001);
        assert!(config.is_secure());
    }

    #[test]
    fn test_paypal_config_debug_redacts_secret() {
        let debug_output = format!("{:?}", paypal_config());

        assert!(debug_output.contains("client_id_value"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_paypal_value"));
    }
}
