use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use url::Url;

use crate::error::AppError;

const DEFAULT_DATABASE_URL: &str = "sqlite://timetable.db";
const DEFAULT_SCHEDULE_URL: &str = "https://xn--64-vlclonee7j.xn--p1ai/timetable/m.schedule.html";
const DEFAULT_SCHEDULE_BASE_URL: &str = "https://xn--64-vlclonee7j.xn--p1ai/timetable/";
const DEFAULT_CHECK_INTERVAL_MINUTES: u64 = 3;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Clone, Debug)]
pub struct SourceConfig {
    pub schedule_url: Url,
    /// Base for asset references that are not root-relative.
    pub base_url: Url,
    pub fetch_timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub source: SourceConfig,
    pub check_interval: Duration,
    pub bot_token: Option<String>,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let schedule_url = parse_url("SCHEDULE_URL", DEFAULT_SCHEDULE_URL)?;
        let base_url = parse_url("SCHEDULE_BASE_URL", DEFAULT_SCHEDULE_BASE_URL)?;

        let interval_minutes = parse_u64("CHECK_INTERVAL_MINUTES", DEFAULT_CHECK_INTERVAL_MINUTES)?;
        if interval_minutes == 0 {
            return Err(AppError::Config(
                "CHECK_INTERVAL_MINUTES must be greater than zero".to_string(),
            ));
        }
        let timeout_secs = parse_u64("FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS)?;

        let bot_token = env::var("BOT_TOKEN").ok().filter(|t| !t.trim().is_empty());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::Config(format!("BIND_ADDR is invalid: {}", e)))?;

        Ok(Self {
            database_url,
            source: SourceConfig {
                schedule_url,
                base_url,
                fetch_timeout: Duration::from_secs(timeout_secs),
            },
            check_interval: Duration::from_secs(interval_minutes * 60),
            bot_token,
            bind_addr,
        })
    }
}

fn parse_url(key: &str, default: &str) -> Result<Url, AppError> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| AppError::Config(format!("{} is not a valid URL: {}", key, e)))
}

fn parse_u64(key: &str, default: u64) -> Result<u64, AppError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| AppError::Config(format!("{} is not a number: {}", key, e))),
        Err(_) => Ok(default),
    }
}
