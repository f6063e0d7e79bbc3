use std::time::Duration;

/// Runtime configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// HS256 secret for access tokens.
    pub jwt_secret: String,
    /// Access token lifetime.
    pub token_ttl: Duration,
    /// Serve from a shared in-memory database that resets on a timer.
    pub demo_mode: bool,
    pub demo_reset_interval: Duration,
    /// Allowed CORS origin; `None` allows any (development).
    pub cors_origin: Option<String>,
}

const DEFAULT_TOKEN_TTL_HOURS: u64 = 24;
const DEFAULT_DEMO_RESET_SECS: u64 = 3600;

impl ServerConfig {
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.trim().parse::<u16>().ok())
            .unwrap_or(0);

        let jwt_secret = match std::env::var("CORKBOARD_JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ => {
                tracing::warn!(
                    "CORKBOARD_JWT_SECRET not set; using an ephemeral secret. \
                     All tokens become invalid on restart."
                );
                uuid::Uuid::new_v4().to_string()
            }
        };

        let token_ttl_hours = std::env::var("CORKBOARD_TOKEN_TTL_HOURS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|&h| h > 0)
            .unwrap_or(DEFAULT_TOKEN_TTL_HOURS);

        let demo_mode = std::env::var("CORKBOARD_DEMO")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let demo_reset_secs = std::env::var("CORKBOARD_DEMO_RESET_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|&s| s >= 60)
            .unwrap_or(DEFAULT_DEMO_RESET_SECS);

        let cors_origin = std::env::var("CORKBOARD_CORS_ORIGIN")
            .ok()
            .filter(|s| !s.trim().is_empty());

        Self {
            host,
            port,
            jwt_secret,
            token_ttl: Duration::from_secs(token_ttl_hours * 3600),
            demo_mode,
            demo_reset_interval: Duration::from_secs(demo_reset_secs),
            cors_origin,
        }
    }
}
