//! Settings plus the collaborators a session needs.

use std::sync::Arc;
use std::time::Duration;

use super::config::ArchiveConfig;
use crate::core::{Clock, ConfigError, IdleStrategy};
use crate::transport::{BackoffIdle, SystemClock};

/// Everything [`ArchiveClient::connect`](super::ArchiveClient::connect) needs.
///
/// Built with chainable setters, then finalised once by [`conclude`](Self::conclude).
///
/// ```ignore
/// let ctx = Context::new()
///     .transport(transport)
///     .message_timeout(Duration::from_secs(2))
///     .idle_strategy(YieldingIdle);
/// let archive = ArchiveClient::connect(ctx)?;
/// ```
pub struct Context<T> {
    config: ArchiveConfig,
    transport: Option<T>,
    idle: Option<Box<dyn IdleStrategy>>,
    clock: Option<Arc<dyn Clock>>,
    concluded: bool,
}

impl<T> Default for Context<T> {
    fn default() -> Self {
        Self::with_config(ArchiveConfig::default())
    }
}

impl<T> std::fmt::Debug for Context<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .field("has_transport", &self.transport.is_some())
            .field("idle", &self.idle.as_ref().map(|idle| idle.alias()))
            .field("concluded", &self.concluded)
            .finish()
    }
}

impl<T> Context<T> {
    /// Context with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context with the given settings.
    pub fn with_config(config: ArchiveConfig) -> Self {
        Self {
            config,
            transport: None,
            idle: None,
            clock: None,
            concluded: false,
        }
    }

    /// Set the transport client.
    pub fn transport(mut self, transport: T) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the idle strategy used by every blocking operation.
    pub fn idle_strategy<I: IdleStrategy + 'static>(mut self, idle: I) -> Self {
        self.idle = Some(Box::new(idle));
        self
    }

    /// Set the clock deadlines are measured against.
    pub fn clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Set the channel requests are published on.
    pub fn control_request_channel(mut self, channel: impl Into<String>) -> Self {
        self.config.control_request_channel = channel.into();
        self
    }

    /// Set the stream id requests are published on.
    pub fn control_request_stream_id(mut self, stream_id: i32) -> Self {
        self.config.control_request_stream_id = stream_id;
        self
    }

    /// Set the channel responses arrive on.
    pub fn control_response_channel(mut self, channel: impl Into<String>) -> Self {
        self.config.control_response_channel = channel.into();
        self
    }

    /// Set the stream id responses arrive on.
    pub fn control_response_stream_id(mut self, stream_id: i32) -> Self {
        self.config.control_response_stream_id = stream_id;
        self
    }

    /// Set the bound on every blocking operation.
    pub fn message_timeout(mut self, timeout: Duration) -> Self {
        self.config.message_timeout = timeout;
        self
    }

    /// Set the fragment limit per poll.
    pub fn fragment_limit(mut self, limit: usize) -> Self {
        self.config.fragment_limit = limit;
        self
    }

    /// Set the offer attempts for bounded-retry requests.
    pub fn retry_attempts(mut self, attempts: u32) -> Self {
        self.config.retry_attempts = attempts;
        self
    }

    /// Current settings.
    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// Check if [`conclude`](Self::conclude) has succeeded.
    pub fn is_concluded(&self) -> bool {
        self.concluded
    }

    /// Validate the settings and fill in default collaborators.
    ///
    /// May only succeed once.
    pub fn conclude(&mut self) -> Result<(), ConfigError> {
        if self.concluded {
            return Err(ConfigError::AlreadyConcluded);
        }
        self.config.validate()?;
        if self.transport.is_none() {
            return Err(ConfigError::MissingTransport);
        }

        if self.idle.is_none() {
            self.idle = Some(Box::new(BackoffIdle::default()));
        }
        if self.clock.is_none() {
            self.clock = Some(Arc::new(SystemClock));
        }

        self.concluded = true;
        Ok(())
    }

    /// Split a concluded context into its parts.
    pub(crate) fn into_parts(
        self,
    ) -> Result<(ArchiveConfig, T, Box<dyn IdleStrategy>, Arc<dyn Clock>), ConfigError> {
        if !self.concluded {
            return Err(ConfigError::NotConcluded);
        }
        match (self.transport, self.idle, self.clock) {
            (Some(transport), Some(idle), Some(clock)) => Ok((self.config, transport, idle, clock)),
            _ => Err(ConfigError::MissingTransport),
        }
    }
}
