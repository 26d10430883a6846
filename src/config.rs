use std::path::PathBuf;
use std::time::Duration;

use chrono::{FixedOffset, NaiveTime, Offset, Utc};

use crate::error::{AppError, Result};

pub const UPSTREAM_API_URL: &str = "https://loteriascaixa-api.herokuapp.com/api";

/// Number of most-recent contests retained per game.
pub const DEFAULT_WINDOW_SIZE: usize = 500;

/// In-flight upstream requests per game during a synchronization pass.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 16;

pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Upper bound on a single game's fetch phase within one pass.
pub const DEFAULT_SYNC_DEADLINE_SECS: u64 = 900;

pub const DEFAULT_SYNC_TIME: &str = "21:00";

/// Brasilia time, where the draws are published.
pub const DEFAULT_SYNC_UTC_OFFSET: &str = "-03:00";

#[derive(Debug, Clone)]
pub struct Config {
    pub upstream_api_url: String,
    pub store_path: PathBuf,
    pub log_level: String,
    pub api_port: u16,
    pub window_size: usize,
    pub fetch_concurrency: usize,
    pub fetch_timeout: Duration,
    pub sync_deadline: Duration,
    pub schedule: ScheduleConfig,
}

/// Daily fire time for the incremental synchronizer (SYNC_TIME, SYNC_UTC_OFFSET).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub at: NaiveTime,
    pub offset: FixedOffset,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let window_size = parse_env("WINDOW_SIZE", DEFAULT_WINDOW_SIZE)?;
        if window_size == 0 {
            return Err(AppError::Config("WINDOW_SIZE must be at least 1".to_string()));
        }
        let fetch_concurrency = parse_env("FETCH_CONCURRENCY", DEFAULT_FETCH_CONCURRENCY)?;
        if fetch_concurrency == 0 {
            return Err(AppError::Config("FETCH_CONCURRENCY must be at least 1".to_string()));
        }

        Ok(Self {
            upstream_api_url: std::env::var("UPSTREAM_API_URL")
                .unwrap_or_else(|_| UPSTREAM_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            store_path: std::env::var("STORE_PATH")
                .unwrap_or_else(|_| "resultados.json".to_string())
                .into(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            window_size,
            fetch_concurrency,
            fetch_timeout: Duration::from_secs(parse_env("FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS)?),
            sync_deadline: Duration::from_secs(parse_env("SYNC_DEADLINE_SECS", DEFAULT_SYNC_DEADLINE_SECS)?),
            schedule: ScheduleConfig {
                at: parse_sync_time(
                    &std::env::var("SYNC_TIME").unwrap_or_else(|_| DEFAULT_SYNC_TIME.to_string()),
                )?,
                offset: parse_utc_offset(
                    &std::env::var("SYNC_UTC_OFFSET")
                        .unwrap_or_else(|_| DEFAULT_SYNC_UTC_OFFSET.to_string()),
                )?,
            },
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::Config(format!("{key} has an invalid value: {raw}"))),
        Err(_) => Ok(default),
    }
}

/// `HH:MM` or `HH:MM:SS`.
pub fn parse_sync_time(s: &str) -> Result<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| AppError::Config(format!("SYNC_TIME must be HH:MM, got {s:?}")))
}

/// `±HH:MM`, or `Z` / `UTC` for zero offset.
pub fn parse_utc_offset(s: &str) -> Result<FixedOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }
    let invalid = || AppError::Config(format!("SYNC_UTC_OFFSET must look like -03:00, got {s:?}"));

    let (sign, rest) = match s.as_bytes().first() {
        Some(b'+') => (1, &s[1..]),
        Some(b'-') => (-1, &s[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}
