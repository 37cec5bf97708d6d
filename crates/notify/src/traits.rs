//! Channel adapter trait definition and shared delivery types.

use serde::Serialize;

use crate::payload::ChannelPayload;
use crate::registry::{AlarmId, ChannelType};

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Carries no request URL: webhook and bot URLs embed credentials.
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Delivery timed out after {0}ms")]
    Timeout(u64),

    #[error("Channel '{0}' has no built-in adapter")]
    Unsupported(String),

    #[error("Channel rejected the message (status {status}): {body}")]
    Rejected { status: u16, body: String },
}

impl NotifyError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            NotifyError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            NotifyError::RateLimited { .. } | NotifyError::Timeout(_) => true,
            NotifyError::Rejected { status, .. } => *status >= 500,
            NotifyError::Config(_) | NotifyError::Unsupported(_) => false,
        }
    }
}

impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        NotifyError::Http(e.without_url())
    }
}

/// Submits shaped payloads to one external messaging service.
#[async_trait::async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Deliver a payload through this channel.
    async fn deliver(&self, payload: &ChannelPayload) -> Result<(), NotifyError>;

    /// Human-readable name for this channel (e.g., "discord", "twilio").
    fn channel_name(&self) -> &str;
}

/// Where an alarm's delivery was when it finished or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStage {
    Pending,
    Rendering,
    Delivering,
}

/// Outcome of one alarm's delivery for one event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchResult {
    Delivered {
        alarm_id: AlarmId,
        channel: ChannelType,
        duration_ms: u64,
    },
    Failed {
        alarm_id: AlarmId,
        channel: ChannelType,
        stage: DeliveryStage,
        reason: String,
        duration_ms: u64,
    },
}

impl DispatchResult {
    pub fn alarm_id(&self) -> AlarmId {
        match self {
            DispatchResult::Delivered { alarm_id, .. } | DispatchResult::Failed { alarm_id, .. } => {
                *alarm_id
            }
        }
    }

    pub fn channel(&self) -> ChannelType {
        match self {
            DispatchResult::Delivered { channel, .. } | DispatchResult::Failed { channel, .. } => {
                *channel
            }
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, DispatchResult::Delivered { .. })
    }
}
