use crate::providers::traits::{MessagingError, MessagingService, WebhookSink};
use std::fmt;
use std::sync::Arc;

/// What happened to one notification. Never raised, only reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Delivered { channel_id: Option<String>, ts: Option<String> },
    ChannelNotFound { channel: String },
    Rejected { code: String },
    Failed { reason: String },
}

impl NotifyOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, NotifyOutcome::Delivered { .. })
    }
}

impl fmt::Display for NotifyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyOutcome::Delivered { channel_id: Some(id), .. } => write!(f, "delivered to {}", id),
            NotifyOutcome::Delivered { channel_id: None, .. } => write!(f, "delivered via webhook"),
            NotifyOutcome::ChannelNotFound { channel } => write!(f, "Channel '{}' not found.", channel),
            NotifyOutcome::Rejected { code } => write!(f, "Error posting message to Slack: {}", code),
            NotifyOutcome::Failed { reason } => write!(f, "Unexpected error: {}", reason),
        }
    }
}

impl From<MessagingError> for NotifyOutcome {
    fn from(error: MessagingError) -> Self {
        match error {
            MessagingError::Api { code } => NotifyOutcome::Rejected { code },
            other => NotifyOutcome::Failed { reason: other.to_string() },
        }
    }
}

enum Transport {
    Api(Arc<dyn MessagingService>),
    Webhook(Arc<dyn WebhookSink>),
}

/// Delivers a finished message to a named channel.
pub struct Notifier {
    transport: Transport,
}

impl Notifier {
    pub fn api(service: Arc<dyn MessagingService>) -> Self {
        Self { transport: Transport::Api(service) }
    }

    pub fn webhook(sink: Arc<dyn WebhookSink>) -> Self {
        Self { transport: Transport::Webhook(sink) }
    }

    /// Resolves `channel` and posts `message` once. Failures are logged and
    /// returned as an outcome; this never errors.
    pub async fn notify(&self, channel: &str, message: &str) -> NotifyOutcome {
        let outcome = match &self.transport {
            Transport::Api(service) => Self::post_via_api(service.as_ref(), channel, message).await,
            Transport::Webhook(sink) => match sink.send(message).await {
                Ok(()) => NotifyOutcome::Delivered { channel_id: None, ts: None },
                Err(e) => e.into(),
            },
        };

        if outcome.is_delivered() {
            log::info!("Posted answers to #{} ({})", channel, outcome);
        } else {
            log::error!("{}", outcome);
        }
        outcome
    }

    async fn post_via_api(service: &dyn MessagingService, channel: &str, message: &str) -> NotifyOutcome {
        let channels = match service.list_channels().await {
            Ok(channels) => channels,
            Err(e) => return e.into(),
        };

        let channel_id = match channels.into_iter().find(|c| c.name == channel) {
            Some(found) => found.id,
            None => return NotifyOutcome::ChannelNotFound { channel: channel.to_string() },
        };

        match service.post_message(&channel_id, message).await {
            Ok(ts) => {
                log::debug!("chat.postMessage ok, ts={}", ts);
                NotifyOutcome::Delivered { channel_id: Some(channel_id), ts: Some(ts) }
            }
            Err(e) => e.into(),
        }
    }
}
