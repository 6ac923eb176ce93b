//! Archive client settings.

use std::time::Duration;

use crate::core::{
    ConfigError, DEFAULT_CONTROL_REQUEST_CHANNEL, DEFAULT_CONTROL_REQUEST_STREAM_ID,
    DEFAULT_CONTROL_RESPONSE_CHANNEL, DEFAULT_CONTROL_RESPONSE_STREAM_ID, DEFAULT_MESSAGE_TIMEOUT,
    DEFAULT_RETRY_ATTEMPTS, ENV_CONTROL_CHANNEL, ENV_CONTROL_RESPONSE_CHANNEL,
    ENV_CONTROL_RESPONSE_STREAM_ID, ENV_CONTROL_STREAM_ID, ENV_MESSAGE_TIMEOUT, FRAGMENT_LIMIT,
};

/// Channels, streams, and timing used by an archive client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveConfig {
    /// Channel requests are published on.
    pub control_request_channel: String,

    /// Stream id requests are published on.
    pub control_request_stream_id: i32,

    /// Channel responses arrive on.
    pub control_response_channel: String,

    /// Stream id responses arrive on.
    pub control_response_stream_id: i32,

    /// Bound on every blocking operation.
    pub message_timeout: Duration,

    /// Maximum fragments handled per poll.
    pub fragment_limit: usize,

    /// Offer attempts for requests sent with bounded retry.
    pub retry_attempts: u32,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            control_request_channel: DEFAULT_CONTROL_REQUEST_CHANNEL.to_owned(),
            control_request_stream_id: DEFAULT_CONTROL_REQUEST_STREAM_ID,
            control_response_channel: DEFAULT_CONTROL_RESPONSE_CHANNEL.to_owned(),
            control_response_stream_id: DEFAULT_CONTROL_RESPONSE_STREAM_ID,
            message_timeout: DEFAULT_MESSAGE_TIMEOUT,
            fragment_limit: FRAGMENT_LIMIT,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        }
    }
}

impl ArchiveConfig {
    /// Defaults overridden by `AERON_ARCHIVE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each setting.
    ///
    /// The message timeout is read as nanoseconds.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(channel) = lookup(ENV_CONTROL_CHANNEL) {
            config.control_request_channel = channel;
        }
        if let Some(raw) = lookup(ENV_CONTROL_STREAM_ID) {
            config.control_request_stream_id = parse(ENV_CONTROL_STREAM_ID, &raw)?;
        }
        if let Some(channel) = lookup(ENV_CONTROL_RESPONSE_CHANNEL) {
            config.control_response_channel = channel;
        }
        if let Some(raw) = lookup(ENV_CONTROL_RESPONSE_STREAM_ID) {
            config.control_response_stream_id = parse(ENV_CONTROL_RESPONSE_STREAM_ID, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MESSAGE_TIMEOUT) {
            config.message_timeout = Duration::from_nanos(parse(ENV_MESSAGE_TIMEOUT, &raw)?);
        }

        Ok(config)
    }

    /// Check the settings are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.control_request_channel.is_empty() {
            return Err(ConfigError::EmptyChannel("control request channel"));
        }
        if self.control_response_channel.is_empty() {
            return Err(ConfigError::EmptyChannel("control response channel"));
        }
        if self.message_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.fragment_limit == 0 {
            return Err(ConfigError::ZeroFragmentLimit);
        }
        Ok(())
    }
}

fn parse<V: std::str::FromStr>(key: &'static str, raw: &str) -> Result<V, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_owned(),
    })
}
