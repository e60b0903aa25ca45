use std::env;
use std::time::Duration;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub location_service_url: String,
    pub search_radius: f64,
    pub lookup_timeout: Duration,
    pub probe_timeout: Duration,
    pub probe_attempts: u32,
    pub confirm_deadline: Duration,
    pub trip_queue_size: usize,
    pub event_buffer_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            location_service_url: env::var("LOCATION_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8081".to_string()),
            search_radius: parse_or_default("SEARCH_RADIUS", 5.0)?,
            lookup_timeout: Duration::from_millis(parse_or_default("LOOKUP_TIMEOUT_MS", 3000)?),
            probe_timeout: Duration::from_millis(parse_or_default("PROBE_TIMEOUT_MS", 3000)?),
            probe_attempts: parse_or_default("PROBE_ATTEMPTS", 3)?,
            confirm_deadline: Duration::from_millis(parse_or_default(
                "CONFIRM_DEADLINE_MS",
                10_000,
            )?),
            trip_queue_size: parse_or_default("TRIP_QUEUE_SIZE", 1024)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
        })
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
