//! Configuration module for the line-echo server.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use crate::error::ConfigError;
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for the echo server
#[derive(Parser, Debug)]
#[command(name = "line-echo")]
#[command(author = "line-echo authors")]
#[command(version = "0.1.0")]
#[command(about = "A line-oriented TCP echo server", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory for per-client activity logs
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Seconds of silence before a client is disconnected
    #[arg(long)]
    pub idle_timeout: Option<u64>,

    /// Number of worker threads (defaults to number of CPU cores)
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Command-line arguments for the relay client
#[derive(Parser, Debug)]
#[command(name = "line-echo-client")]
#[command(version = "0.1.0")]
#[command(about = "Relay stdin lines to a line-echo server", long_about = None)]
pub struct ClientArgs {
    /// Server address
    #[arg(long, default_value = "localhost:4000")]
    pub server: String,

    /// Log level for diagnostics on stderr
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Number of worker threads
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            workers: None,
        }
    }
}

/// Per-connection session configuration
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    /// Inactivity timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: default_idle_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory that receives `<peer>.log` files
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: default_log_dir(),
        }
    }
}

fn default_port() -> u16 {
    4000
}

fn default_idle_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub idle_timeout: Duration,
    pub log_dir: PathBuf,
    pub workers: Option<usize>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            idle_timeout: Duration::from_secs(default_idle_timeout()),
            log_dir: default_log_dir(),
            workers: None,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(CliArgs::parse())
    }

    /// Resolve already-parsed CLI arguments against the optional TOML file.
    pub fn from_args(cli: CliArgs) -> Result<Self, ConfigError> {
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Ok(Self::merge(cli, toml_config))
    }

    fn merge(cli: CliArgs, toml_config: TomlConfig) -> Self {
        Config {
            port: cli.port.unwrap_or(toml_config.server.port),
            idle_timeout: Duration::from_secs(
                cli.idle_timeout.unwrap_or(toml_config.session.idle_timeout),
            ),
            log_dir: cli.log_dir.unwrap_or(toml_config.logging.dir),
            workers: cli.workers.or(toml_config.server.workers),
            log_level: cli.log_level.unwrap_or(toml_config.logging.level),
        }
    }

    /// Listen address covering every interface on the configured port.
    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
