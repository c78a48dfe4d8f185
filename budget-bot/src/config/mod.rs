//! Bot configuration: Telegram connection + logging + conversation settings. Loaded from env.

use anyhow::Result;
use budget_telegram::TelegramConfig;
use std::env;
use std::time::Duration;


/// Full bot config. Use [`BotConfig::load`] then [`BotConfig::validate`].
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub telegram: TelegramConfig,
    /// LOG_FILE
    pub log_file: String,
    /// CONVERSATION_TTL_SECS; None keeps conversations until they finish or are cancelled.
    pub conversation_ttl_secs: Option<u64>,
}

impl BotConfig {
    /// Load from environment variables. `token` overrides BOT_TOKEN if provided.
    pub fn load(token: Option<String>) -> Result<Self> {
        let telegram = TelegramConfig::load(token)?;
        let log_file =
            env::var("LOG_FILE").unwrap_or_else(|_| "logs/budget-bot.log".to_string());
        let conversation_ttl_secs = match env::var("CONVERSATION_TTL_SECS") {
            Ok(s) if !s.trim().is_empty() => Some(s.trim().parse().map_err(|_| {
                anyhow::anyhow!("CONVERSATION_TTL_SECS is not a number of seconds: {}", s)
            })?),
            _ => None,
        };
        Ok(Self {
            telegram,
            log_file,
            conversation_ttl_secs,
        })
    }

    /// Validate config (API URL must parse, durations must be non-zero). Call after load to fail fast.
    pub fn validate(&self) -> Result<()> {
        if let Some(ref url_str) = self.telegram.telegram_api_url {
            if reqwest::Url::parse(url_str).is_err() {
                anyhow::bail!(
                    "TELEGRAM_API_URL (or TELOXIDE_API_URL) is set but not a valid URL: {}",
                    url_str
                );
            }
        }
        if self.telegram.poll_timeout_secs == 0 {
            anyhow::bail!("POLL_TIMEOUT_SECS must be greater than 0");
        }
        if self.conversation_ttl_secs == Some(0) {
            anyhow::bail!("CONVERSATION_TTL_SECS must be greater than 0 when set");
        }
        Ok(())
    }

    pub fn bot_token(&self) -> &str {
        &self.telegram.bot_token
    }

    pub fn log_file(&self) -> &str {
        &self.log_file
    }

    pub fn conversation_ttl(&self) -> Option<Duration> {
        self.conversation_ttl_secs.map(Duration::from_secs)
    }
}
