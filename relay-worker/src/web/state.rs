use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::clients::{build_http_client, BackendClient, ClientError, HubSpotClient, SandboxClient};
use crate::dispatch::FixedDelay;
use crate::rate_limit::{RateLimiter, GLOBAL_LIMIT_MESSAGE, WEBHOOK_LIMIT_MESSAGE};
use crate::Config;

/// Shared application state, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub hubspot: HubSpotClient,
    pub backend: BackendClient,
    pub sandbox: SandboxClient,
    pub global_limiter: RateLimiter,
    pub webhook_limiter: RateLimiter,
    pub dispatch_delay: FixedDelay,
    pub started_at: Instant,
}

impl AppState {
    pub fn from_config(config: Config) -> Result<Self, ClientError> {
        let http = build_http_client()?;

        let hubspot = HubSpotClient::new(
            http.clone(),
            &config.hubspot_api_url,
            config.hubspot_access_token.clone(),
        )?;
        let backend = BackendClient::new(
            http.clone(),
            config.backend_api_url.as_deref(),
            config.backend_api_key.clone(),
            Duration::from_millis(config.backend_timeout_ms),
        )?;
        let sandbox = SandboxClient::new(
            http,
            &config.sandbox_api_url,
            config.sandbox_api_key.clone(),
            Duration::from_millis(config.sandbox_timeout_ms),
        )?;

        let global_limiter = RateLimiter::new(
            Duration::from_millis(config.rate_limit_window_ms),
            config.rate_limit_max_requests,
            GLOBAL_LIMIT_MESSAGE,
        );
        let webhook_limiter = RateLimiter::new(
            Duration::from_millis(config.webhook_rate_limit_window_ms),
            config.webhook_rate_limit_max_requests,
            WEBHOOK_LIMIT_MESSAGE,
        );

        Ok(Self {
            dispatch_delay: FixedDelay(Duration::from_millis(config.dispatch_delay_ms)),
            config: Arc::new(config),
            hubspot,
            backend,
            sandbox,
            global_limiter,
            webhook_limiter,
            started_at: Instant::now(),
        })
    }
}
