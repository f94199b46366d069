use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::heartbeat::{DEFAULT_PING_INTERVAL, DEFAULT_PONG_TIMEOUT};

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub ws_addr: SocketAddr,
    pub http_addr: SocketAddr,
    pub questions_path: PathBuf,
    pub final_questions_path: Option<PathBuf>,
    pub media_base_url: String,
    pub state_dir: Option<PathBuf>,
    pub ping_interval: Duration,
    pub pong_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            log::debug!("No .env loaded: {e}");
        }

        Ok(Self {
            ws_addr: parse_var("WS_ADDR", "0.0.0.0:9002")?,
            http_addr: parse_var("HTTP_ADDR", "0.0.0.0:8080")?,
            questions_path: PathBuf::from(var_or("QUESTIONS_PATH", "questions.json")),
            final_questions_path: optional_var("FINAL_QUESTIONS_PATH").map(PathBuf::from),
            media_base_url: var_or("MEDIA_BASE_URL", "/"),
            state_dir: optional_var("STATE_DIR").map(PathBuf::from),
            ping_interval: seconds_var("PING_INTERVAL_SECS", DEFAULT_PING_INTERVAL)?,
            pong_timeout: seconds_var("PONG_TIMEOUT_SECS", DEFAULT_PONG_TIMEOUT)?,
        })
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn var_or(name: &str, default: &str) -> String {
    optional_var(name).unwrap_or_else(|| default.to_string())
}

fn parse_var<T>(name: &str, default: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var_or(name, default)
        .parse()
        .with_context(|| format!("{name} is not valid"))
}

fn seconds_var(name: &str, default: Duration) -> Result<Duration> {
    let secs: u64 = parse_var(name, &default.as_secs().to_string())?;
    Ok(Duration::from_secs(secs))
}
