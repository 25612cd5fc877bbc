use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tourvia_shared::Money;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Approved => "APPROVED",
            RequestStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(RequestStatus::Pending),
            "APPROVED" => Some(RequestStatus::Approved),
            "REJECTED" => Some(RequestStatus::Rejected),
            _ => None,
        }
    }
}

/// Proposed fields for a brand-new tour. Commission comes as a fraction
/// (e.g. 0.15); absent means the configured platform default applies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTourPayload {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    pub max_guests: u32,
    pub duration_days: u32,
    #[serde(default)]
    pub commission_fraction: Option<f64>,
}

/// What the guide is asking the admin for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "kind", content = "payload")]
pub enum RequestKind {
    /// Publish a new tour with the proposed fields.
    Create(CreateTourPayload),
    /// Unlock a time-boxed self-service edit window; the description tells
    /// the admin what the guide intends to change.
    Edit { description: String },
    /// Retire the tour. Only grantable when no non-canceled bookings exist.
    Delete { reason: String },
}

impl RequestKind {
    pub fn label(&self) -> &'static str {
        match self {
            RequestKind::Create(_) => "CREATE",
            RequestKind::Edit { .. } => "EDIT",
            RequestKind::Delete { .. } => "DELETE",
        }
    }
}

/// A guide's ask, adjudicated by an admin. `pending → {approved, rejected}`,
/// both terminal; a rejected request needs a fresh submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TourRequest {
    pub id: Uuid,
    /// The target tour for edit and delete requests; for create requests
    /// the id reserved for the tour that approval will publish.
    pub tour_id: Option<Uuid>,
    pub guide_id: Uuid,
    pub kind: RequestKind,
    pub status: RequestStatus,
    pub admin_notes: Option<String>,
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TourRequest {
    pub fn new(guide_id: Uuid, tour_id: Option<Uuid>, kind: RequestKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            tour_id,
            guide_id,
            kind,
            status: RequestStatus::Pending,
            admin_notes: None,
            decided_by: None,
            decided_at: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestOutcome {
    Approve,
    Reject,
}
