use std::env;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CHANNEL: &str = "aiagent";
pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";
pub const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-3.5-turbo-instruct";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set in the environment variables.")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

/// How answers reach the messaging channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Authenticated Web API: resolve the channel by name, then post.
    Api,
    /// Incoming webhook bound to a single channel.
    Webhook,
}

impl DeliveryMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "api" => Some(DeliveryMode::Api),
            "webhook" => Some(DeliveryMode::Webhook),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub token: String,
    pub api_url: String,
    pub webhook_url: Option<String>,
    pub channel: String,
    pub delivery: DeliveryMode,
}

#[derive(Debug, Clone)]
pub struct OpenAISettings {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub max_tokens: u16,
}

/// Process-wide settings, built once at startup and read-only afterwards.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub slack: SlackConfig,
    pub openai: OpenAISettings,
    pub request_timeout: Duration,
    pub max_upload_bytes: usize,
    pub max_concurrent_submissions: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let token = get("SLACK_TOKEN").ok_or(ConfigError::Missing("SLACK_TOKEN"))?;
        let api_key = get("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;
        let webhook_url = get("SLACK_WEBHOOK_URL");

        let delivery = match get("SLACK_DELIVERY") {
            Some(value) => DeliveryMode::parse(&value).ok_or(ConfigError::Invalid {
                key: "SLACK_DELIVERY",
                value,
            })?,
            None => DeliveryMode::Api,
        };
        if delivery == DeliveryMode::Webhook && webhook_url.is_none() {
            return Err(ConfigError::Missing("SLACK_WEBHOOK_URL"));
        }

        let max_tokens = parse_or(&get, "ANSWER_MAX_TOKENS", 150u16)?;
        let timeout_secs = parse_or(&get, "REQUEST_TIMEOUT_SECS", 30u64)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "REQUEST_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }
        let max_upload_bytes = parse_or(&get, "MAX_UPLOAD_BYTES", 20 * 1024 * 1024usize)?;
        let max_concurrent_submissions = parse_or(&get, "MAX_CONCURRENT_SUBMISSIONS", 1usize)?;
        if max_concurrent_submissions == 0 {
            return Err(ConfigError::Invalid {
                key: "MAX_CONCURRENT_SUBMISSIONS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            slack: SlackConfig {
                token,
                api_url: get("SLACK_API_URL").unwrap_or_else(|| DEFAULT_SLACK_API_URL.to_string()),
                webhook_url,
                channel: get("SLACK_CHANNEL").unwrap_or_else(|| DEFAULT_CHANNEL.to_string()),
                delivery,
            },
            openai: OpenAISettings {
                api_key,
                api_url: get("OPENAI_API_URL").unwrap_or_else(|| DEFAULT_OPENAI_API_URL.to_string()),
                model: get("OPENAI_COMPLETION_MODEL")
                    .unwrap_or_else(|| DEFAULT_COMPLETION_MODEL.to_string()),
                max_tokens,
            },
            request_timeout: Duration::from_secs(timeout_secs),
            max_upload_bytes,
            max_concurrent_submissions,
        })
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.slack.channel = channel.into();
        self
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}
