//! Error types for the echo server and relay client.
//!
//! Only startup failures are surfaced as errors. Per-connection I/O
//! problems are logged by the session that hit them and never escape it.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {err}", path = .0.display(), err = .1)]
    FileRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file '{path}': {err}", path = .0.display(), err = .1)]
    TomlParse(PathBuf, #[source] toml::de::Error),
}

/// Fatal server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}
