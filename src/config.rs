use anyhow::{anyhow, Result};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub database_url: String,
    pub http_port: u16,
    pub poll_window: Duration,
    pub first_choice_timeout: Duration,
    pub travel_speed_kmh: f64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let token = env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;

        if token.trim().is_empty() {
            return Err(anyhow!("TELEGRAM_BOT_TOKEN must be set"));
        }

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:./data/trains.db".to_string());
        let database_url = if database_url.trim().is_empty() {
            "sqlite:./data/trains.db".to_string()
        } else {
            database_url
        };

        let http_port = env::var("HTTP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid HTTP_PORT"))?;

        let poll_window = Duration::from_secs(parse_secs("POLL_WINDOW_SECS", 300)?);
        let first_choice_timeout =
            Duration::from_secs(parse_secs("FIRST_CHOICE_TIMEOUT_SECS", 120)?);

        let travel_speed_kmh: f64 = env::var("TRAVEL_SPEED_KMH")
            .unwrap_or_else(|_| "30".to_string())
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid TRAVEL_SPEED_KMH"))?;
        if travel_speed_kmh <= 0.0 {
            return Err(anyhow!("TRAVEL_SPEED_KMH must be positive"));
        }

        Ok(Config {
            telegram_bot_token: token,
            database_url,
            http_port,
            poll_window,
            first_choice_timeout,
            travel_speed_kmh,
        })
    }
}

fn parse_secs(var: &str, default: u64) -> Result<u64> {
    let raw = env::var(var).unwrap_or_else(|_| default.to_string());
    let secs: u64 = raw.trim().parse().map_err(|_| anyhow!("Invalid {var}"))?;
    if secs == 0 {
        return Err(anyhow!("{var} must be at least 1 second"));
    }
    Ok(secs)
}
