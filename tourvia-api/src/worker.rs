use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tourvia_booking::BookingEngine;

/// Background sweep that cancels bookings stuck waiting on the guide or
/// on payment past their timeout.
pub fn spawn_sweeper(engine: Arc<BookingEngine>, interval_seconds: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(interval_seconds));
        loop {
            ticker.tick().await;
            match engine.sweep_stale(Utc::now()).await {
                Ok(0) => {}
                Ok(swept) => tracing::info!(swept, "stale bookings canceled"),
                Err(err) => tracing::error!(%err, "stale booking sweep failed"),
            }
        }
    })
}
