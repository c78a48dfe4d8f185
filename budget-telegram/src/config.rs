//! Minimal Telegram config: token, API URL, polling options. Loaded from BOT_TOKEN, TELEGRAM_API_URL,
//! POLL_TIMEOUT_SECS and DROP_PENDING_UPDATES.

use anyhow::Result;
use std::env;

/// Long-poll timeout Telegram holds a getUpdates request open for.
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 9;

/// Telegram connection and polling settings.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub telegram_api_url: Option<String>,
    pub poll_timeout_secs: u64,
    /// Skip updates that arrived while the bot was not running.
    pub drop_pending_updates: bool,
}

impl TelegramConfig {
    /// Loads from environment: BOT_TOKEN required; TELEGRAM_API_URL (or TELOXIDE_API_URL),
    /// POLL_TIMEOUT_SECS and DROP_PENDING_UPDATES optional.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Same as [`from_env`](Self::from_env), but `token` overrides BOT_TOKEN when given.
    pub fn load(token: Option<String>) -> Result<Self> {
        let bot_token = match token {
            Some(token) => token,
            None => env::var("BOT_TOKEN").map_err(|_| anyhow::anyhow!("BOT_TOKEN not set"))?,
        };
        let mut config = Self::with_token(bot_token);
        config.telegram_api_url = env::var("TELEGRAM_API_URL")
            .or_else(|_| env::var("TELOXIDE_API_URL"))
            .ok();
        config.poll_timeout_secs = env::var("POLL_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_POLL_TIMEOUT_SECS);
        config.drop_pending_updates = env::var("DROP_PENDING_UPDATES")
            .ok()
            .map(|s| parse_flag(&s))
            .unwrap_or(true);
        Ok(config)
    }

    /// Uses the given token; other fields take their defaults.
    pub fn with_token(bot_token: String) -> Self {
        Self {
            bot_token,
            telegram_api_url: None,
            poll_timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
            drop_pending_updates: true,
        }
    }
}

fn parse_flag(s: &str) -> bool {
    !matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
