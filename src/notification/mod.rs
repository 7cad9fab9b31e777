//! Customer notification contract
//!
//! The engine decides what to tell a customer; delivery belongs to the
//! notification service behind [`NotificationSender`].

mod model;
mod sender;

pub use model::*;
pub use sender::{HttpNotificationSender, LogNotificationSender, NotificationSender};
