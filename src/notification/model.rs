use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery channel
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    Sms,
    Email,
    Push,
}

impl std::fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationChannel::Sms => write!(f, "sms"),
            NotificationChannel::Email => write!(f, "email"),
            NotificationChannel::Push => write!(f, "push"),
        }
    }
}

impl std::str::FromStr for NotificationChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sms" => Ok(NotificationChannel::Sms),
            "email" => Ok(NotificationChannel::Email),
            "push" => Ok(NotificationChannel::Push),
            other => Err(format!(
                "Invalid notification channel: '{}'. Expected: sms, email, or push",
                other
            )),
        }
    }
}

/// What the notification is about
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    PaymentReminder,
    OverdueWarning,
    ConfiscationWarning,
}

/// Entity a notification refers to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    Loan,
}

/// One outbound message to a customer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerNotification {
    pub customer_id: Uuid,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub channel: NotificationChannel,
    pub reference_type: ReferenceType,
    pub reference_id: Uuid,
}

/// Acknowledgement from the sender
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SendResult {
    pub notification_id: String,
    pub status: String,
}
