use gigpay_common::Secret;
use log::*;

/// Connection settings for one payment provider.
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    /// Base URL of the provider's REST API, without a trailing slash.
    pub api_url: String,
    pub api_key: Secret<String>,
    /// Shared secret used to verify inbound webhook signatures from this provider.
    pub webhook_secret: Secret<String>,
}

impl GatewayConfig {
    pub fn new(api_url: &str, api_key: Secret<String>, webhook_secret: Secret<String>) -> Self {
        Self { api_url: api_url.trim_end_matches('/').to_string(), api_key, webhook_secret }
    }

    /// Loads the configuration for the provider with the given env var prefix, e.g. `GIGPAY_CARDGATE`.
    pub fn from_env_or_default(prefix: &str, default_url: &str) -> Self {
        let api_url = std::env::var(format!("{prefix}_API_URL")).unwrap_or_else(|_| {
            warn!("{prefix}_API_URL not set, using {default_url}");
            default_url.to_string()
        });
        let api_key = Secret::new(std::env::var(format!("{prefix}_API_KEY")).unwrap_or_else(|_| {
            warn!("{prefix}_API_KEY not set, using a placeholder that the provider will reject");
            "sk_test_000000000000".to_string()
        }));
        let webhook_secret = Secret::new(std::env::var(format!("{prefix}_WEBHOOK_SECRET")).unwrap_or_else(|_| {
            warn!("{prefix}_WEBHOOK_SECRET not set, webhook signatures from this provider will not verify");
            "whsec_000000000000".to_string()
        }));
        Self { api_url: api_url.trim_end_matches('/').to_string(), api_key, webhook_secret }
    }
}
