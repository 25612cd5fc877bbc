//! Postgres implementations of the repository ports. Domain aggregates are
//! stored as JSONB documents beside the columns the queries filter on;
//! every state transition is a row-locked read-modify-write or a
//! conditional UPDATE keyed on the expected status.

pub mod booking_repo;
pub mod busy_repo;
pub mod ledger_repo;
pub mod request_repo;
pub mod tour_repo;

pub use booking_repo::PgBookingRepository;
pub use busy_repo::PgBusyCalendar;
pub use ledger_repo::PgLedgerRepository;
pub use request_repo::PgTourRequestRepository;
pub use tour_repo::PgTourRepository;

use tourvia_core::CoreError;

pub(crate) fn db_err(err: sqlx::Error) -> CoreError {
    CoreError::Internal(format!("database error: {}", err))
}

pub(crate) fn codec_err(err: serde_json::Error) -> CoreError {
    CoreError::Internal(format!("document codec error: {}", err))
}
