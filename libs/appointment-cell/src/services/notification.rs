// libs/appointment-cell/src/services/notification.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub channel: String,
    pub recipient: String,
    pub template_data: Value,
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Notification endpoint rejected delivery with status {0}")]
    Rejected(u16),
}

/// Delivery happens outside the booking engine; callers log failures and
/// carry on.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, notification: &Notification) -> Result<(), NotificationError>;
}

/// Default dispatcher when no webhook is configured.
#[derive(Debug, Default)]
pub struct LoggingNotificationDispatcher;

#[async_trait]
impl NotificationDispatcher for LoggingNotificationDispatcher {
    async fn dispatch(&self, notification: &Notification) -> Result<(), NotificationError> {
        info!(
            "Notification via {} to {}: {}",
            notification.channel, notification.recipient, notification.template_data
        );
        Ok(())
    }
}

/// POSTs each notification as JSON to an external delivery service.
pub struct WebhookNotificationDispatcher {
    client: Client,
    url: String,
}

impl WebhookNotificationDispatcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl NotificationDispatcher for WebhookNotificationDispatcher {
    async fn dispatch(&self, notification: &Notification) -> Result<(), NotificationError> {
        debug!("Posting {} notification to {}", notification.channel, self.url);

        let response = self.client.post(&self.url).json(notification).send().await?;
        if !response.status().is_success() {
            return Err(NotificationError::Rejected(response.status().as_u16()));
        }
        Ok(())
    }
}
