//! Relay configuration

use std::env;

use anyhow::{Context, Result};

/// Relay configuration loaded from environment
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// WebSocket server port
    pub server_port: u16,
    /// Admission bound: simultaneous connections beyond this are rejected
    pub max_connections: usize,
}

impl RelayConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            max_connections: env::var("MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("MAX_CONNECTIONS must be a positive integer")?,
        })
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            server_port: 3000,
            max_connections: 10,
        }
    }
}
