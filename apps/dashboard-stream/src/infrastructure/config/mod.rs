//! Configuration Module
//!
//! Environment-driven configuration for the dashboard stream layer.

mod settings;

pub use settings::{
    ConfigError, DEFAULT_API_BASE_URL, DashboardConfig, PollingSettings, ServerSettings,
    ServiceUrls, StreamSettings,
};
