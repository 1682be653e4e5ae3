//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. Default: config/dev.toml
//!
//! A missing or unparsable file falls back to built-in defaults with a warning.

use crate::domain::types::{Coordinates, PostId};
use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Unique site identifier (e.g. "perimeter-north")
    #[serde(default = "default_site_id")]
    pub id: String,
}

fn default_site_id() -> String {
    "perimeter".to_string()
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self { id: default_site_id() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SerialConfig {
    pub device: String,
    pub baud: u32,
    /// How long to wait for a command response line
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
}

fn default_response_timeout_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Base server for the fallback channel, host:port
    pub server_addr: String,
    #[serde(default = "default_network_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_network_timeout_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListenerConfig {
    #[serde(default = "default_listener_enabled")]
    pub enabled: bool,
    #[serde(default = "default_listener_port")]
    pub port: u16,
}

fn default_listener_enabled() -> bool {
    true
}

fn default_listener_port() -> u16 {
    7070
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self { enabled: default_listener_enabled(), port: default_listener_port() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,
}

fn default_poll_interval_secs() -> u64 {
    5
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval_secs: default_poll_interval_secs() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlarmConfig {
    /// Duration of a timed (manual-off / intrusion) alarm session.
    /// Source hardware variants used 5s and 25s; configurable, default 25.
    #[serde(default = "default_alarm_timed_secs")]
    pub timed_secs: u64,
    /// Actuator on/off toggle cadence while sounding
    #[serde(default = "default_alarm_toggle_ms")]
    pub toggle_ms: u64,
}

fn default_alarm_timed_secs() -> u64 {
    25
}

fn default_alarm_toggle_ms() -> u64 {
    500
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self { timed_secs: default_alarm_timed_secs(), toggle_ms: default_alarm_toggle_ms() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval_secs")]
    pub interval_secs: u64,
}

fn default_metrics_interval_secs() -> u64 {
    30
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval_secs() }
    }
}

/// One post from the static `[[posts]]` array
#[derive(Debug, Clone, Deserialize)]
pub struct PostConfig {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub site: SiteConfig,
    pub serial: SerialConfig,
    pub network: NetworkConfig,
    #[serde(default)]
    pub listener: ListenerConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub alarm: AlarmConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    pub posts: Vec<PostConfig>,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    site_id: String,
    serial_device: String,
    serial_baud: u32,
    serial_response_timeout_ms: u64,
    network_server_addr: String,
    network_timeout_ms: u64,
    listener_enabled: bool,
    listener_port: u16,
    poll_interval_secs: u64,
    alarm_timed_secs: u64,
    alarm_toggle_ms: u64,
    metrics_interval_secs: u64,
    posts: Vec<(PostId, Coordinates)>,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_id: default_site_id(),
            serial_device: "/dev/ttyUSB0".to_string(),
            serial_baud: 115_200,
            serial_response_timeout_ms: default_response_timeout_ms(),
            network_server_addr: "192.168.1.100:5000".to_string(),
            network_timeout_ms: default_network_timeout_ms(),
            listener_enabled: default_listener_enabled(),
            listener_port: default_listener_port(),
            poll_interval_secs: default_poll_interval_secs(),
            alarm_timed_secs: default_alarm_timed_secs(),
            alarm_toggle_ms: default_alarm_toggle_ms(),
            metrics_interval_secs: default_metrics_interval_secs(),
            posts: Self::default_posts(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Five-post ring matching the reference hardware layout
    fn default_posts() -> Vec<(PostId, Coordinates)> {
        (0..5)
            .map(|i| {
                (
                    PostId(format!("x{}", i + 1)),
                    Coordinates { x: (i * 10) as f64, y: (i * 5) as f64 },
                )
            })
            .collect()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        let posts = toml_config
            .posts
            .into_iter()
            .map(|p| (PostId(p.id), Coordinates { x: p.x, y: p.y }))
            .collect();

        Ok(Self {
            site_id: toml_config.site.id,
            serial_device: toml_config.serial.device,
            serial_baud: toml_config.serial.baud,
            serial_response_timeout_ms: toml_config.serial.response_timeout_ms,
            network_server_addr: toml_config.network.server_addr,
            network_timeout_ms: toml_config.network.timeout_ms,
            listener_enabled: toml_config.listener.enabled,
            listener_port: toml_config.listener.port,
            poll_interval_secs: toml_config.poll.interval_secs,
            alarm_timed_secs: toml_config.alarm.timed_secs,
            alarm_toggle_ms: toml_config.alarm.toggle_ms,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            posts,
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration - tries the TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {:#}. Using defaults.", e);
                Self::default()
            }
        }
    }

    // Getters for all config fields
    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn serial_device(&self) -> &str {
        &self.serial_device
    }

    pub fn serial_baud(&self) -> u32 {
        self.serial_baud
    }

    pub fn serial_response_timeout(&self) -> Duration {
        Duration::from_millis(self.serial_response_timeout_ms)
    }

    pub fn network_server_addr(&self) -> &str {
        &self.network_server_addr
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_millis(self.network_timeout_ms)
    }

    pub fn listener_enabled(&self) -> bool {
        self.listener_enabled
    }

    pub fn listener_port(&self) -> u16 {
        self.listener_port
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn alarm_timed_duration(&self) -> Duration {
        Duration::from_secs(self.alarm_timed_secs)
    }

    pub fn alarm_toggle_cadence(&self) -> Duration {
        Duration::from_millis(self.alarm_toggle_ms)
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn posts(&self) -> &[(PostId, Coordinates)] {
        &self.posts
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_posts_form_a_ring() {
        let config = Config::default();
        assert_eq!(config.posts().len(), 5);
        assert_eq!(config.posts()[0].0.as_str(), "x1");
        assert_eq!(config.posts()[4].0.as_str(), "x5");
        assert_eq!(config.posts()[2].1, Coordinates { x: 20.0, y: 10.0 });
    }

    #[test]
    fn test_default_intervals() {
        let config = Config::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.alarm_timed_duration(), Duration::from_secs(25));
        assert_eq!(config.alarm_toggle_cadence(), Duration::from_millis(500));
    }
}
