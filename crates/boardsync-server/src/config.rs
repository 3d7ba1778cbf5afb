//! Relay configuration from the environment.

use std::env;
use std::net::SocketAddr;
use thiserror::Error;

pub const DEFAULT_ADDR: &str = "0.0.0.0:3030";
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid BOARDSYNC_ADDR {value:?}: {source}")]
    Addr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("invalid BOARDSYNC_CHANNEL_CAPACITY {0:?}: must be a positive integer")]
    Capacity(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Buffered frames per room before slow peers start lagging.
    pub channel_capacity: usize,
}

impl ServerConfig {
    /// Read `BOARDSYNC_ADDR` and `BOARDSYNC_CHANNEL_CAPACITY`, falling back to
    /// defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(
            env::var("BOARDSYNC_ADDR").ok().as_deref(),
            env::var("BOARDSYNC_CHANNEL_CAPACITY").ok().as_deref(),
        )
    }

    fn from_vars(addr: Option<&str>, capacity: Option<&str>) -> Result<Self, ConfigError> {
        let addr_text = addr.unwrap_or(DEFAULT_ADDR);
        let addr = addr_text.parse().map_err(|source| ConfigError::Addr {
            value: addr_text.to_string(),
            source,
        })?;
        let channel_capacity = match capacity {
            None => DEFAULT_CHANNEL_CAPACITY,
            Some(text) => match text.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::Capacity(text.to_string())),
            },
        };
        Ok(Self {
            addr,
            channel_capacity,
        })
    }
}
