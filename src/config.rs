use std::env;
use std::fmt::Display;
use std::str::FromStr;

use crate::error::AppError;

const DEFAULT_HTTP_PORT: u16 = 3000;
const DEFAULT_EVENT_BUFFER: usize = 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    /// Status events kept per websocket subscriber before it starts lagging.
    pub event_buffer_size: usize,
}

impl Config {
    /// Reads `.env` if present, then the process environment.
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let event_buffer_size =
            typed(&lookup, "EVENT_BUFFER_SIZE")?.unwrap_or(DEFAULT_EVENT_BUFFER);
        if event_buffer_size == 0 {
            return Err(AppError::Internal(
                "EVENT_BUFFER_SIZE must be > 0".to_string(),
            ));
        }

        Ok(Self {
            http_port: typed(&lookup, "HTTP_PORT")?.unwrap_or(DEFAULT_HTTP_PORT),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            event_buffer_size,
        })
    }
}

fn typed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|err| AppError::Internal(format!("{key}={raw:?} is invalid: {err}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::Config;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, crate::error::AppError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.http_port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.event_buffer_size, 1024);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config_from(&[("HTTP_PORT", "8080"), ("LOG_LEVEL", "debug")]).unwrap();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn malformed_port_is_an_error() {
        assert!(config_from(&[("HTTP_PORT", "eighty")]).is_err());
    }

    #[test]
    fn zero_event_buffer_is_rejected() {
        assert!(config_from(&[("EVENT_BUFFER_SIZE", "0")]).is_err());
    }
}
