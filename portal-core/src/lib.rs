//! Core library for the captive-portal WiFi provisioning service.
//! This crate defines the core traits (interfaces) and data structures,
//! the network control backends, the connectivity verifier that decides
//! when the captive portal may be torn down, and the HTTP router.

pub mod backends;
pub mod command;
pub mod config;
pub mod disabler;
pub mod frontends;
pub mod probe;
pub mod traits;
pub mod verification_log;
pub mod verifier;
pub mod web_server;

#[cfg(test)]
mod testing;

use std::time::Duration;
use thiserror::Error;

// Shared Error and Result type for the entire crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} not found")]
    ToolNotFound(String),

    #[error("{tool} timed out after {}s", after.as_secs())]
    Timeout { tool: String, after: Duration },

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Invalid JSON")]
    MalformedRequest(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Asset not found: {0}")]
    AssetNotFound(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

/// A specialized `Result` type for this crate's operations.
pub type Result<T> = std::result::Result<T, Error>;
