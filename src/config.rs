use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    /// Legacy proximity matching treats `min_distance` as a second upper
    /// bound. Left as a switch rather than silently corrected; `false`
    /// ignores `min_distance` entirely.
    pub proximity_min_is_upper_bound: bool,
    pub review_max_len: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            proximity_min_is_upper_bound: parse_or_default("PROXIMITY_MIN_IS_UPPER_BOUND", true)?,
            review_max_len: parse_or_default("REVIEW_MAX_LEN", 1000)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            proximity_min_is_upper_bound: true,
            review_max_len: 1000,
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
