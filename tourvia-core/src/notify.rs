use std::sync::Arc;

use async_trait::async_trait;
use tourvia_shared::Notification;

use crate::CoreResult;

/// Outbound port to whatever carries notifications (email, in-app feed).
/// At-most-once: the dispatcher makes a single attempt, no retry queue.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification) -> CoreResult<()>;
}

/// Default sink that just logs the notification. Useful locally and as a
/// stand-in when no transport is configured.
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, notification: Notification) -> CoreResult<()> {
        tracing::info!(
            kind = ?notification.kind,
            recipient = ?notification.recipient,
            message = %notification.message,
            "notification"
        );
        Ok(())
    }
}

/// Fire-and-forget wrapper around a `Notifier`. Runs detached from any
/// transaction boundary: a delivery failure is logged and dropped so it can
/// never roll back the state transition that triggered it.
#[derive(Clone)]
pub struct Dispatcher {
    notifier: Arc<dyn Notifier>,
}

impl Dispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub async fn dispatch(&self, notification: Notification) {
        if let Err(err) = self.notifier.notify(notification.clone()).await {
            tracing::warn!(
                kind = ?notification.kind,
                error = %err,
                "notification delivery failed, continuing"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CoreError;
    use tourvia_shared::NotificationKind;
    use uuid::Uuid;

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn notify(&self, _notification: Notification) -> CoreResult<()> {
            Err(CoreError::ExternalDependency("smtp down".into()))
        }
    }

    #[tokio::test]
    async fn dispatch_swallows_transport_failures() {
        let dispatcher = Dispatcher::new(Arc::new(FailingNotifier));
        // Must not panic or propagate: the caller has already committed.
        dispatcher
            .dispatch(Notification::to_user(
                Uuid::new_v4(),
                NotificationKind::BookingAccepted,
                "your booking was accepted",
            ))
            .await;
    }
}
