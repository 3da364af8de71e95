use std::env;
use tracing::warn;

const DEFAULT_BACKEND_API_URL: &str = "http://localhost:8080/api";
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend_api_url: String,
    pub backend_api_key: Option<String>,
    pub jwt_secret: String,
    pub bind_address: String,
    pub backend_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            backend_api_url: env::var("BACKEND_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| {
                    warn!("BACKEND_API_URL not set, using default");
                    DEFAULT_BACKEND_API_URL.to_string()
                }),
            backend_api_key: env::var("BACKEND_API_KEY")
                .ok()
                .filter(|key| !key.is_empty()),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            bind_address: env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string()),
            backend_timeout_secs: match env::var("BACKEND_TIMEOUT_SECS") {
                Ok(raw) => raw.parse().unwrap_or_else(|_| {
                    warn!("BACKEND_TIMEOUT_SECS is not a number ({}), using default", raw);
                    DEFAULT_BACKEND_TIMEOUT_SECS
                }),
                Err(_) => DEFAULT_BACKEND_TIMEOUT_SECS,
            },
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.backend_api_url.is_empty() && !self.jwt_secret.is_empty()
    }
}
