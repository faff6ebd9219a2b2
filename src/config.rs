use std::{env, fmt, net::SocketAddr, str::FromStr};

use thiserror::Error;

pub const DEFAULT_DESCRIPTION: &str = "Example MCP tool server";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stdio,
    Http,
}

impl FromStr for Transport {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(Self::Stdio),
            "http" => Ok(Self::Http),
            _ => Err(ConfigError::InvalidTransport),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdio => f.write_str("stdio"),
            Self::Http => f.write_str("http"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_name: String,
    pub server_version: String,
    pub server_description: String,
    pub transport: Transport,
    pub host: String,
    pub port: u16,
    pub debug: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("MCP_SERVER_NAME must not be empty")]
    EmptyServerName,
    #[error("PORT must be a valid u16")]
    InvalidPort,
    #[error("MCP_TRANSPORT must be one of: stdio, http")]
    InvalidTransport,
    #[error("invalid bind address or port")]
    InvalidSocket,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_name = match lookup("MCP_SERVER_NAME") {
            Some(value) => Some(value.trim().to_string())
                .filter(|name| !name.is_empty())
                .ok_or(ConfigError::EmptyServerName)?,
            None => env!("CARGO_PKG_NAME").to_string(),
        };
        let server_version = lookup("MCP_SERVER_VERSION")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
        let server_description = lookup("MCP_SERVER_DESCRIPTION")
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

        let transport = lookup("MCP_TRANSPORT")
            .map(|value| value.parse::<Transport>())
            .transpose()?
            .unwrap_or(Transport::Stdio);

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = lookup("PORT")
            .map(|value| value.trim().parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(8000);
        let debug = lookup("DEBUG")
            .map(|value| value.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let config = Self {
            server_name,
            server_version,
            server_description,
            transport,
            host,
            port,
            debug,
        };

        if config.transport == Transport::Http {
            let _ = config.bind_socket()?;
        }
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}
