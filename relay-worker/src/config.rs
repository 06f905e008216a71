//! Configuration module for environment variable parsing.
//!
//! Every setting has a default so the relay can boot with an empty
//! environment; remote calls to an unconfigured service fail at call time.

use std::env;
use std::str::FromStr;
use tracing::warn;

/// Default HubSpot CRM API base URL.
pub const DEFAULT_HUBSPOT_API_URL: &str = "https://api.hubapi.com";

/// Default sandbox backend base URL (contacts and products).
pub const DEFAULT_SANDBOX_API_URL: &str = "https://backend.corsolar.com.br/api";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Deployment environment name reported by `/health`
    pub environment: String,

    /// Interface to bind the web server to
    pub host: String,

    /// Port for the web server to listen on
    pub port: u16,

    // =========================================================================
    // HubSpot
    // =========================================================================

    /// HubSpot CRM API base URL
    pub hubspot_api_url: String,

    /// Private app access token sent as a bearer token
    pub hubspot_access_token: Option<String>,

    /// Shared secret for `X-HubSpot-Signature` verification
    pub hubspot_webhook_secret: Option<String>,

    // =========================================================================
    // Backend
    // =========================================================================

    /// Internal backend base URL (sync, health, notifications)
    pub backend_api_url: Option<String>,

    /// API key sent to the backend in `X-API-Key`
    pub backend_api_key: Option<String>,

    /// Backend request timeout in milliseconds
    pub backend_timeout_ms: u64,

    /// Sandbox backend base URL (contacts and products)
    pub sandbox_api_url: String,

    /// Bearer token for the sandbox backend
    pub sandbox_api_key: Option<String>,

    /// Sandbox request timeout in milliseconds
    pub sandbox_timeout_ms: u64,

    // =========================================================================
    // Security
    // =========================================================================

    /// API key expected in inbound `X-API-Key` headers
    pub api_key: Option<String>,

    /// Client IPs allowed on backend routes; empty allows everyone
    pub allowed_ips: Vec<String>,

    /// Global rate limit window in milliseconds
    pub rate_limit_window_ms: u64,

    /// Maximum requests per client within the global window
    pub rate_limit_max_requests: u32,

    /// Webhook rate limit window in milliseconds
    pub webhook_rate_limit_window_ms: u64,

    /// Maximum webhook requests per client within the webhook window
    pub webhook_rate_limit_max_requests: u32,

    /// Allowed CORS origin (`*` for any)
    pub cors_origin: String,

    // =========================================================================
    // Bulk dispatch
    // =========================================================================

    /// Directory holding contact CSV inputs and product CSV exports
    pub data_dir: String,

    /// Pause between consecutive bulk sends in milliseconds
    pub dispatch_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            environment: "development".to_string(),
            host: "0.0.0.0".to_string(),
            port: 3000,
            hubspot_api_url: DEFAULT_HUBSPOT_API_URL.to_string(),
            hubspot_access_token: None,
            hubspot_webhook_secret: None,
            backend_api_url: None,
            backend_api_key: None,
            backend_timeout_ms: 30_000,
            sandbox_api_url: DEFAULT_SANDBOX_API_URL.to_string(),
            sandbox_api_key: None,
            sandbox_timeout_ms: 30_000,
            api_key: None,
            allowed_ips: Vec::new(),
            rate_limit_window_ms: 900_000,
            rate_limit_max_requests: 100,
            webhook_rate_limit_window_ms: 60_000,
            webhook_rate_limit_max_requests: 50,
            cors_origin: "*".to_string(),
            data_dir: "data".to_string(),
            dispatch_delay_ms: 100,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            environment: env::var("NODE_ENV").unwrap_or(defaults.environment),

            host: env::var("HOST").unwrap_or(defaults.host),

            port: parse_number("PORT", defaults.port),

            hubspot_api_url: env::var("HUBSPOT_API_URL").unwrap_or(defaults.hubspot_api_url),

            hubspot_access_token: non_empty("HUBSPOT_ACCESS_TOKEN"),

            hubspot_webhook_secret: non_empty("HUBSPOT_WEBHOOK_SECRET"),

            backend_api_url: non_empty("BACKEND_API_URL"),

            backend_api_key: non_empty("BACKEND_API_KEY"),

            backend_timeout_ms: parse_number("BACKEND_TIMEOUT", defaults.backend_timeout_ms),

            sandbox_api_url: non_empty("BACKEND_API_URL_SANDBOX")
                .unwrap_or(defaults.sandbox_api_url),

            sandbox_api_key: non_empty("BACKEND_API_KEY_SANDBOX"),

            sandbox_timeout_ms: parse_number(
                "BACKEND_TIMEOUT_SANDBOX",
                defaults.sandbox_timeout_ms,
            ),

            api_key: non_empty("API_KEY"),

            allowed_ips: parse_csv("ALLOWED_IPS").unwrap_or_default(),

            rate_limit_window_ms: parse_number(
                "RATE_LIMIT_WINDOW_MS",
                defaults.rate_limit_window_ms,
            ),

            rate_limit_max_requests: parse_number(
                "RATE_LIMIT_MAX_REQUESTS",
                defaults.rate_limit_max_requests,
            ),

            webhook_rate_limit_window_ms: parse_number(
                "WEBHOOK_RATE_LIMIT_WINDOW_MS",
                defaults.webhook_rate_limit_window_ms,
            ),

            webhook_rate_limit_max_requests: parse_number(
                "WEBHOOK_RATE_LIMIT_MAX_REQUESTS",
                defaults.webhook_rate_limit_max_requests,
            ),

            cors_origin: env::var("CORS_ORIGIN").unwrap_or(defaults.cors_origin),

            data_dir: env::var("DATA_DIR").unwrap_or(defaults.data_dir),

            dispatch_delay_ms: parse_number("DISPATCH_DELAY_MS", defaults.dispatch_delay_ms),
        }
    }
}

/// Parse a numeric variable, warning and falling back on garbage.
fn parse_number<T: FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid number, using default");
            default
        }
    }
}

/// Read a variable, treating blank values as unset.
fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a comma-separated list of strings.
fn parse_csv(name: &str) -> Option<Vec<String>> {
    env::var(name).ok().map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_valid() {
        env::set_var("TEST_RELAY_NUMBER", "2500");
        assert_eq!(parse_number("TEST_RELAY_NUMBER", 0u64), 2500);
        env::remove_var("TEST_RELAY_NUMBER");
    }

    #[test]
    fn test_parse_number_invalid_uses_default() {
        env::set_var("TEST_RELAY_BAD_NUMBER", "soon");
        assert_eq!(parse_number("TEST_RELAY_BAD_NUMBER", 42u32), 42);
        env::remove_var("TEST_RELAY_BAD_NUMBER");
    }

    #[test]
    fn test_parse_number_default() {
        assert_eq!(parse_number("NONEXISTENT_RELAY_VAR", 3000u16), 3000);
    }

    #[test]
    fn test_parse_csv() {
        env::set_var("TEST_RELAY_IPS", "10.0.0.1, ,10.0.0.2");
        let result = parse_csv("TEST_RELAY_IPS");
        assert_eq!(
            result,
            Some(vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()])
        );
        env::remove_var("TEST_RELAY_IPS");
    }

    #[test]
    fn test_non_empty_ignores_blank() {
        env::set_var("TEST_RELAY_BLANK", "   ");
        assert_eq!(non_empty("TEST_RELAY_BLANK"), None);
        env::remove_var("TEST_RELAY_BLANK");
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.dispatch_delay_ms, 100);
        assert_eq!(config.rate_limit_max_requests, 100);
        assert_eq!(config.webhook_rate_limit_max_requests, 50);
        assert!(config.allowed_ips.is_empty());
    }
}
