//! Process configuration read from the environment (and `.env`, if present)

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_WS_SEND_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Only origin allowed by CORS. `None` mirrors the request origin.
    pub frontend_url: Option<String>,
    pub db_max_connections: u32,
    pub ws_send_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let bind_addr = parse_or(&lookup, "BIND_ADDR", DEFAULT_BIND_ADDR.parse().ok())?;
        let db_max_connections =
            parse_or(&lookup, "DB_MAX_CONNECTIONS", Some(DEFAULT_DB_MAX_CONNECTIONS))?;
        let send_timeout_ms =
            parse_or(&lookup, "WS_SEND_TIMEOUT_MS", Some(DEFAULT_WS_SEND_TIMEOUT_MS))?;
        // must be positive
        if send_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                name: "WS_SEND_TIMEOUT_MS",
                value: send_timeout_ms.to_string(),
            });
        }

        let frontend_url = lookup("FRONTEND_URL").filter(|v| !v.trim().is_empty());

        Ok(Config {
            database_url,
            bind_addr,
            frontend_url,
            db_max_connections,
            ws_send_timeout: Duration::from_millis(send_timeout_ms),
        })
    }
}

fn parse_or<T, F>(lookup: &F, name: &'static str, default: Option<T>) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => default.ok_or(ConfigError::Missing(name)),
    }
}
