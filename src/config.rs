//! Centralized runtime configuration, loaded once from the environment the
//! way `RateLimitConfig::from_env` does elsewhere in this crate, but
//! gathered into a single value instead of scattered `env::var` calls.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// TCP port to bind (`PORT`, default 8080).
    pub port: u16,
    /// Allowed `Origin` header values for WS upgrades (`WS_ORIGIN_ALLOW`,
    /// comma-separated). Empty means "non-browser context", which must
    /// still be permitted when the Origin header is absent entirely.
    pub ws_origin_allow: Vec<String>,
    /// `debug` | `info` | `warn` | `error` (`LOG_LEVEL`).
    pub log_level: String,

    /// Stream Engine limits.
    pub max_message_bytes: usize,
    pub max_reactions_per_message: usize,
    /// Blob store limit.
    pub max_upload_bytes: usize,

    /// Identity & Token Store.
    pub ticket_ttl: Duration,

    /// Realtime Session.
    pub heartbeat_period: Duration,
    pub missed_pings_before_close: u32,
    /// Outbound channel depth per session, for backpressure.
    pub outbound_buffer: usize,

    /// Retention sweep interval for pruning old stream history.
    pub retention_sweep_interval: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            ws_origin_allow: Vec::new(),
            log_level: "info".to_string(),
            max_message_bytes: 4000,
            max_reactions_per_message: 64,
            max_upload_bytes: 10 * 1024 * 1024,
            ticket_ttl: Duration::from_secs(60),
            heartbeat_period: Duration::from_secs(30),
            missed_pings_before_close: 2,
            outbound_buffer: 256,
            retention_sweep_interval: Duration::from_secs(60),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(val) = env::var("PORT")
            && let Ok(n) = val.parse::<u16>()
        {
            cfg.port = n;
        }
        if let Ok(val) = env::var("WS_ORIGIN_ALLOW") {
            cfg.ws_origin_allow = val
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(val) = env::var("LOG_LEVEL") {
            cfg.log_level = val;
        }
        if let Ok(val) = env::var("MAX_MESSAGE_BYTES")
            && let Ok(n) = val.parse::<usize>()
        {
            cfg.max_message_bytes = n;
        }
        if let Ok(val) = env::var("MAX_REACTIONS_PER_MESSAGE")
            && let Ok(n) = val.parse::<usize>()
        {
            cfg.max_reactions_per_message = n;
        }
        if let Ok(val) = env::var("MAX_UPLOAD_BYTES")
            && let Ok(n) = val.parse::<usize>()
        {
            cfg.max_upload_bytes = n;
        }

        cfg
    }

    /// Whether `origin` is allowed for a WS upgrade. An empty/absent Origin
    /// (non-browser client) is always allowed; otherwise the allowlist must
    /// be non-empty and contain an exact match.
    pub fn origin_allowed(&self, origin: Option<&str>) -> bool {
        match origin {
            None => true,
            Some(o) if o.is_empty() => true,
            Some(o) => self.ws_origin_allow.iter().any(|allowed| allowed == o),
        }
    }
}
