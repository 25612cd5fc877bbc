use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who a notification is addressed to. Admin-facing events fan out to the
/// whole role rather than a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "kind", content = "id")]
pub enum Recipient {
    User(Uuid),
    Admins,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    BookingRequested,
    BookingAccepted,
    BookingRejected,
    PaymentReceived,
    BookingCompleted,
    BookingCanceled,
    TourRequestSubmitted,
    TourRequestDecided,
    PayoutCredited,
    WithdrawalRequested,
    WithdrawalDecided,
}

/// A best-effort, fire-and-forget message. Delivery failure never affects
/// the state transition that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: Recipient,
    pub kind: NotificationKind,
    pub message: String,
    pub link: Option<String>,
}

impl Notification {
    pub fn to_user(user_id: Uuid, kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            recipient: Recipient::User(user_id),
            kind,
            message: message.into(),
            link: None,
        }
    }

    pub fn to_admins(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            recipient: Recipient::Admins,
            kind,
            message: message.into(),
            link: None,
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}
