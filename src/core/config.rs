//! Runtime configuration loaded from the environment and swappable at runtime.

use chrono_tz::Tz;
use std::env;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

use crate::errors::ScribeError;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Thresholds feeding the trigger policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerConfig {
    /// Minutes between time-based flushes, 0 disables.
    pub interval_minutes: u64,
    /// Buffered message count that forces a flush, 0 disables.
    pub message_count: usize,
    /// Substring that requests a summary on demand, empty disables.
    pub keyword: String,
    /// Hard floor below which nothing is summarized.
    pub min_messages: usize,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 30,
            message_count: 50,
            keyword: "@bot summary".to_string(),
            min_messages: 5,
        }
    }
}

/// Settings of the buffering/dispatch core. All of them may be hot-updated
/// through [`SharedConfig::update`].
#[derive(Debug, Clone)]
pub struct ScribeConfig {
    pub bot_name: String,
    /// Capacity of newly created group buffers.
    pub max_buffer_size: usize,
    pub summary_timeout_secs: u64,
    pub timer_tick_secs: u64,
    pub timezone: Tz,
    /// Case-insensitive group-name fragments to watch; empty watches all.
    pub target_groups: Vec<String>,
    pub trigger: TriggerConfig,
}

impl Default for ScribeConfig {
    fn default() -> Self {
        Self {
            bot_name: "meeting-minutes-bot".to_string(),
            max_buffer_size: 200,
            summary_timeout_secs: 120,
            timer_tick_secs: 60,
            timezone: Tz::UTC,
            target_groups: Vec::new(),
            trigger: TriggerConfig::default(),
        }
    }
}

impl ScribeConfig {
    pub fn from_env() -> Result<Self, ScribeError> {
        let defaults = Self::default();
        let config = Self {
            bot_name: env_or("BOT_NAME", &defaults.bot_name),
            max_buffer_size: env_parse("MAX_BUFFER_SIZE", defaults.max_buffer_size),
            summary_timeout_secs: env_parse("SUMMARY_TIMEOUT_SECS", defaults.summary_timeout_secs),
            timer_tick_secs: env_parse("TIMER_TICK_SECS", defaults.timer_tick_secs),
            timezone: match env::var("SCRIBE_TIMEZONE") {
                Ok(name) if !name.trim().is_empty() => name.trim().parse::<Tz>().map_err(|e| {
                    ScribeError::ConfigError(format!("SCRIBE_TIMEZONE: {e}"))
                })?,
                _ => defaults.timezone,
            },
            target_groups: parse_list(&env::var("TARGET_GROUPS").unwrap_or_default()),
            trigger: TriggerConfig {
                interval_minutes: env_parse(
                    "SUMMARY_INTERVAL_MINUTES",
                    defaults.trigger.interval_minutes,
                ),
                message_count: env_parse("SUMMARY_MESSAGE_COUNT", defaults.trigger.message_count),
                keyword: env_or("SUMMARY_KEYWORD", &defaults.trigger.keyword),
                min_messages: env_parse("MIN_MESSAGES_FOR_SUMMARY", defaults.trigger.min_messages),
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ScribeError> {
        if self.max_buffer_size == 0 {
            return Err(ScribeError::ConfigError(
                "MAX_BUFFER_SIZE must be at least 1".to_string(),
            ));
        }
        if self.summary_timeout_secs == 0 {
            return Err(ScribeError::ConfigError(
                "SUMMARY_TIMEOUT_SECS must be at least 1".to_string(),
            ));
        }
        if self.timer_tick_secs == 0 {
            return Err(ScribeError::ConfigError(
                "TIMER_TICK_SECS must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Logs the effective trigger setup, one line per trigger.
    pub fn log_summary(&self) {
        info!(
            bot_name = %self.bot_name,
            buffer_size = self.max_buffer_size,
            timezone = %self.timezone,
            "Configuration loaded"
        );
        if self.target_groups.is_empty() {
            info!("Target groups: all groups");
        } else {
            info!("Target groups: {}", self.target_groups.join(", "));
        }
        match self.trigger.interval_minutes {
            0 => info!("Time-based trigger: disabled"),
            n => info!("Time-based trigger: every {n} minutes"),
        }
        match self.trigger.message_count {
            0 => info!("Volume-based trigger: disabled"),
            n => info!("Volume-based trigger: every {n} messages"),
        }
        if self.trigger.keyword.is_empty() {
            info!("Keyword trigger: disabled");
        } else {
            info!("Keyword trigger: {}", self.trigger.keyword);
        }
    }
}

/// Connection settings for the OpenAI-compatible summarizer.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub system_prompt_file: String,
}

impl LlmConfig {
    pub fn from_env() -> Result<Self, ScribeError> {
        Ok(Self {
            api_key: env::var("LLM_API_KEY")
                .map_err(|e| ScribeError::ConfigError(format!("LLM_API_KEY: {e}")))?,
            base_url: env_or("LLM_BASE_URL", DEFAULT_BASE_URL),
            model: env_or("LLM_MODEL", DEFAULT_MODEL),
            system_prompt_file: env_or("SYSTEM_PROMPT_FILE", "system_prompt.txt"),
        })
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub scribe: ScribeConfig,
    pub llm: LlmConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ScribeError> {
        Ok(Self {
            scribe: ScribeConfig::from_env()?,
            llm: LlmConfig::from_env()?,
        })
    }
}

/// Cheaply cloneable handle to the live [`ScribeConfig`].
///
/// Readers take an `Arc` of the current value and never hold the lock while
/// using it.
#[derive(Debug, Clone)]
pub struct SharedConfig {
    inner: Arc<RwLock<Arc<ScribeConfig>>>,
}

impl SharedConfig {
    #[must_use]
    pub fn new(config: ScribeConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    #[must_use]
    pub fn current(&self) -> Arc<ScribeConfig> {
        Arc::clone(&self.inner.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replaces the live configuration. Existing group buffers keep their
    /// capacity; only groups created afterwards pick up a new size.
    pub fn update(&self, config: ScribeConfig) -> Result<(), ScribeError> {
        config.validate()?;
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(config);
        info!("Configuration updated");
        Ok(())
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self::new(ScribeConfig::default())
    }
}

fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value.trim().parse().unwrap_or_else(|_| {
            warn!("Invalid value for {key}: {value:?}, using default {default}");
            default
        }),
        _ => default,
    }
}

/// Splits a comma separated list, dropping blanks.
#[must_use]
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
