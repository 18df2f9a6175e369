//! Dashboard Configuration Settings
//!
//! Configuration types for the streaming layer, loaded from environment
//! variables. Unparsable numbers fall back to their defaults; malformed
//! URLs are rejected.

use std::time::Duration;

use reqwest::Url;

/// Base URL used when `DASHBOARD_API_BASE_URL` is unset.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";

/// Push-stream settings shared by every adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSettings {
    /// Reconnection attempts per failure run before falling back; 0 polls after the first failure.
    pub max_reconnect_attempts: u32,
    /// Base delay of the backoff schedule.
    pub reconnect_delay: Duration,
    /// Upper bound on any backoff delay.
    pub max_reconnect_delay: Duration,
    /// Budget for one attempt to reach open.
    pub connection_timeout: Duration,
    /// Store and replay cookies set by the backend.
    pub with_credentials: bool,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: 10,
            reconnect_delay: Duration::from_millis(2000),
            max_reconnect_delay: Duration::from_millis(30_000),
            connection_timeout: Duration::from_millis(30_000),
            with_credentials: false,
        }
    }
}

/// Fallback polling settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingSettings {
    /// Interval between polls once an adapter has fallen back.
    pub interval: Duration,
    /// Timeout for a single poll request.
    pub request_timeout: Duration,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(5000),
            request_timeout: Duration::from_millis(10_000),
        }
    }
}

/// Server port settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Health check HTTP port (0 = disabled).
    pub health_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { health_port: 8083 }
    }
}

/// Per-service base URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUrls {
    /// Market data service, e.g. `http://localhost:8080/api/market-data`.
    pub market_data: String,
    /// Trading service.
    pub trading: String,
    /// Risk service.
    pub risk: String,
}

impl ServiceUrls {
    /// Derive every service URL from a common base.
    #[must_use]
    pub fn from_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            market_data: format!("{base}/market-data"),
            trading: format!("{base}/trading"),
            risk: format!("{base}/risk"),
        }
    }
}

/// Complete dashboard stream configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    /// Common API base URL.
    pub api_base_url: String,
    /// Per-service base URLs.
    pub services: ServiceUrls,
    /// Push-stream settings.
    pub stream: StreamSettings,
    /// Fallback polling settings.
    pub polling: PollingSettings,
    /// Server port settings.
    pub server: ServerSettings,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            services: ServiceUrls::from_base(DEFAULT_API_BASE_URL),
            stream: StreamSettings::default(),
            polling: PollingSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl DashboardConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if a configured URL is not an
    /// absolute http(s) URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if a configured URL is not an
    /// absolute http(s) URL.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };

        let api_base_url = env
            .string("DASHBOARD_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        validate_url("DASHBOARD_API_BASE_URL", &api_base_url)?;

        let derived = ServiceUrls::from_base(&api_base_url);
        let services = ServiceUrls {
            market_data: env.url_or("DASHBOARD_MARKET_DATA_URL", derived.market_data)?,
            trading: env.url_or("DASHBOARD_TRADING_URL", derived.trading)?,
            risk: env.url_or("DASHBOARD_RISK_URL", derived.risk)?,
        };

        let stream_defaults = StreamSettings::default();
        let stream = StreamSettings {
            max_reconnect_attempts: env.u32(
                "DASHBOARD_STREAM_MAX_RECONNECT_ATTEMPTS",
                stream_defaults.max_reconnect_attempts,
            ),
            reconnect_delay: env.duration_millis(
                "DASHBOARD_STREAM_RECONNECT_DELAY_MS",
                stream_defaults.reconnect_delay,
            ),
            max_reconnect_delay: env.duration_millis(
                "DASHBOARD_STREAM_MAX_RECONNECT_DELAY_MS",
                stream_defaults.max_reconnect_delay,
            ),
            connection_timeout: env.duration_millis(
                "DASHBOARD_STREAM_CONNECTION_TIMEOUT_MS",
                stream_defaults.connection_timeout,
            ),
            with_credentials: env.bool(
                "DASHBOARD_STREAM_WITH_CREDENTIALS",
                stream_defaults.with_credentials,
            ),
        };

        let polling_defaults = PollingSettings::default();
        let polling = PollingSettings {
            interval: env.duration_millis("DASHBOARD_POLL_INTERVAL_MS", polling_defaults.interval),
            request_timeout: env.duration_millis(
                "DASHBOARD_REQUEST_TIMEOUT_MS",
                polling_defaults.request_timeout,
            ),
        };

        let server = ServerSettings {
            health_port: env.u16("DASHBOARD_HEALTH_PORT", ServerSettings::default().health_port),
        };

        Ok(Self {
            api_base_url,
            services,
            stream,
            polling,
            server,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A URL setting is not an absolute http(s) URL.
    #[error("invalid URL in {key}: {value:?} ({reason})")]
    InvalidUrl {
        /// Environment variable name.
        key: String,
        /// Value found.
        value: String,
        /// Parse failure.
        reason: String,
    },
}

fn validate_url(key: &str, value: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        key: key.to_string(),
        value: value.to_string(),
        reason,
    };

    let url = Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    if matches!(url.scheme(), "http" | "https") {
        Ok(())
    } else {
        Err(invalid(format!("unsupported scheme {}", url.scheme())))
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn url_or(&self, key: &str, default: String) -> Result<String, ConfigError> {
        match self.string(key) {
            Some(value) => {
                validate_url(key, &value)?;
                Ok(value.trim_end_matches('/').to_string())
            }
            None => Ok(default),
        }
    }

    fn u16(&self, key: &str, default: u16) -> u16 {
        self.string(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn u32(&self, key: &str, default: u32) -> u32 {
        self.string(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn bool(&self, key: &str, default: bool) -> bool {
        self.string(key)
            .map_or(default, |v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
    }

    fn duration_millis(&self, key: &str, default: Duration) -> Duration {
        self.string(key)
            .and_then(|v| v.parse::<u64>().ok())
            .map_or(default, Duration::from_millis)
    }
}
