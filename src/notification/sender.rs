use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use uuid::Uuid;

use super::{CustomerNotification, SendResult};
use crate::error::{EngineError, EngineResult};

/// "Send to customer" capability
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send_to_customer(&self, notification: &CustomerNotification) -> EngineResult<SendResult>;
}

/// Posts notifications to the notification service over HTTP
pub struct HttpNotificationSender {
    endpoint: String,
    client: Client,
}

impl HttpNotificationSender {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            endpoint: format!("{}/api/notifications/customer", base_url.trim_end_matches('/')),
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl NotificationSender for HttpNotificationSender {
    async fn send_to_customer(&self, notification: &CustomerNotification) -> EngineResult<SendResult> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(notification)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::ExternalServiceError(format!(
                "Notification service returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        Ok(response.json::<SendResult>().await?)
    }
}

/// Writes notifications to the log instead of delivering them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotificationSender;

#[async_trait]
impl NotificationSender for LogNotificationSender {
    async fn send_to_customer(&self, notification: &CustomerNotification) -> EngineResult<SendResult> {
        let notification_id = Uuid::new_v4().to_string();

        tracing::info!(
            notification_id = %notification_id,
            customer_id = %notification.customer_id,
            reference_id = %notification.reference_id,
            channel = %notification.channel,
            title = %notification.title,
            "Notification recorded (no delivery service configured)"
        );

        Ok(SendResult {
            notification_id,
            status: "logged".to_string(),
        })
    }
}
