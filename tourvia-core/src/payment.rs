use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tourvia_shared::Money;
use uuid::Uuid;

use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentSessionStatus {
    Pending,
    Succeeded,
    Refunded,
}

/// The payment leg attached to a booking once the guide has accepted.
/// `session_id` is the gateway's idempotency key: capture callbacks are
/// deduplicated against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSession {
    pub session_id: String,
    pub gateway: String,
    pub status: PaymentSessionStatus,
}

/// Outbound port to the payment provider. The provider verifies webhook
/// signatures before anything reaches the engine, so this trait only
/// covers the calls the engine originates.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a checkout session for a booking. Returns the provider session
    /// the customer pays against.
    async fn open_session(&self, booking_id: Uuid, amount: Money) -> CoreResult<PaymentSession>;

    /// Refund a captured payment. Failures surface to the caller; the
    /// engine never swallows a refund error.
    async fn refund(&self, session_id: &str, amount: Money) -> CoreResult<()>;
}

/// Gateway stand-in for tests and local runs. A session id containing
/// "fail-refund" simulates a transport failure on the refund leg.
pub struct MockPaymentGateway;

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn open_session(&self, booking_id: Uuid, amount: Money) -> CoreResult<PaymentSession> {
        tracing::debug!(%booking_id, %amount, "opening mock payment session");
        Ok(PaymentSession {
            session_id: format!("mock_ps_{}", booking_id.simple()),
            gateway: "mock".to_string(),
            status: PaymentSessionStatus::Pending,
        })
    }

    async fn refund(&self, session_id: &str, amount: Money) -> CoreResult<()> {
        if session_id.contains("fail-refund") {
            return Err(CoreError::ExternalDependency(
                "simulated refund transport failure".into(),
            ));
        }
        tracing::debug!(session_id, %amount, "mock refund issued");
        Ok(())
    }
}
