//! Dashboard configuration

use fleet_channel::ChannelConfig;
use fleet_core::PrefixStatus;
use fleet_render::RenderConfig;
use serde::Deserialize;
use std::str::FromStr;

/// Dashboard configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    /// REST API port
    pub api_port: u16,
    /// Telemetry feed connection
    pub channel: ChannelConfig,
    /// Map access credential; the map stays down until one is supplied
    pub map_access_token: Option<String>,
    /// Registrations with this prefix are reported online
    pub status_prefix: String,
    /// Enable CORS for all origins (development)
    pub cors_permissive: bool,
    pub render: RenderConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_port: 3000,
            channel: ChannelConfig::default(),
            map_access_token: None,
            status_prefix: PrefixStatus::DEFAULT_PREFIX.to_string(),
            cors_permissive: true,
            render: RenderConfig::default(),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from environment variables and `.env`
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let channel = ChannelConfig {
            url: std::env::var("TELEMETRY_URL").unwrap_or(defaults.channel.url),
            reconnect_delay_ms: env_or(
                "TELEMETRY_RECONNECT_DELAY_MS",
                defaults.channel.reconnect_delay_ms,
            ),
            max_reconnect_delay_ms: env_or(
                "TELEMETRY_MAX_RECONNECT_DELAY_MS",
                defaults.channel.max_reconnect_delay_ms,
            ),
        };

        let render = RenderConfig {
            animation_duration_ms: env_or(
                "MARKER_ANIMATION_MS",
                defaults.render.animation_duration_ms,
            ),
            popup_refresh_ms: env_or("POPUP_REFRESH_MS", defaults.render.popup_refresh_ms),
            follow_selection: env_flag("FOLLOW_SELECTION", defaults.render.follow_selection),
            ..defaults.render
        };

        let map_access_token = std::env::var("MAP_ACCESS_TOKEN")
            .ok()
            .filter(|s| !s.trim().is_empty());

        Self {
            api_port: env_or("API_PORT", defaults.api_port),
            channel,
            map_access_token,
            status_prefix: std::env::var("STATUS_PREFIX").unwrap_or(defaults.status_prefix),
            cors_permissive: env_flag("CORS_PERMISSIVE", defaults.cors_permissive),
            render,
        }
    }

    pub fn status(&self) -> PrefixStatus {
        PrefixStatus::new(self.status_prefix.clone())
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|s| s == "true" || s == "1")
        .unwrap_or(default)
}
