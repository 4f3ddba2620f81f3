//! Configuration module
//!
//! Handles loading SyncStart configuration.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::protocol::{DEFAULT_BROADCAST_ADDR, DEFAULT_PORT};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Session needs at least one participant")]
    NoParticipants,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Network settings
    #[serde(default)]
    pub network: NetworkConfig,

    /// Session settings
    #[serde(default)]
    pub session: SessionConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Human-readable name for this participant, used in logs
    #[serde(default = "default_name")]
    pub name: String,
    /// Enable verbose logging
    #[serde(default)]
    pub verbose: bool,
    /// Log file path (optional)
    pub log_file: Option<PathBuf>,
}

fn default_name() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            verbose: false,
            log_file: None,
        }
    }
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Well-known port every participant binds and broadcasts on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Local address to bind (default: all interfaces)
    #[serde(default = "default_bind_address")]
    pub bind_address: Ipv4Addr,
    /// Where datagrams are broadcast. The default stays on this host;
    /// set a subnet broadcast address (e.g. 192.168.1.255) for LAN play.
    #[serde(default = "default_broadcast_address")]
    pub broadcast_address: Ipv4Addr,
    /// Set to false to skip opening the socket entirely
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_bind_address() -> Ipv4Addr {
    Ipv4Addr::UNSPECIFIED
}

fn default_broadcast_address() -> Ipv4Addr {
    DEFAULT_BROADCAST_ADDR
}

fn default_true() -> bool {
    true
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            broadcast_address: default_broadcast_address(),
            enabled: default_true(),
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Number of participants that must agree before preview/start
    #[serde(default = "default_participants")]
    pub participants: u32,
    /// Host loop rate used by the CLI
    #[serde(default = "default_tick_rate")]
    pub tick_rate_hz: u32,
}

fn default_participants() -> u32 {
    2
}

fn default_tick_rate() -> u32 {
    60
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            participants: default_participants(),
            tick_rate_hz: default_tick_rate(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default location
    pub fn load_default() -> ConfigResult<Self> {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("syncstart/config.toml")),
            Some(PathBuf::from("./syncstart.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                return Self::load(path);
            }
        }

        // Return default config if no file found
        Ok(Self::default())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.session.participants == 0 {
            return Err(ConfigError::NoParticipants);
        }
        Ok(())
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config() -> ConfigResult<String> {
    let config = Config {
        general: GeneralConfig {
            name: "cabinet-left".to_string(),
            verbose: false,
            log_file: None,
        },
        network: NetworkConfig {
            broadcast_address: Ipv4Addr::new(192, 168, 1, 255),
            ..Default::default()
        },
        session: SessionConfig::default(),
    };

    Ok(toml::to_string_pretty(&config)?)
}
