use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tourvia_shared::{CommissionRate, Money};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TourStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
    Active,
    Inactive,
}

impl TourStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TourStatus::Draft => "DRAFT",
            TourStatus::Pending => "PENDING",
            TourStatus::Approved => "APPROVED",
            TourStatus::Rejected => "REJECTED",
            TourStatus::Active => "ACTIVE",
            TourStatus::Inactive => "INACTIVE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(TourStatus::Draft),
            "PENDING" => Some(TourStatus::Pending),
            "APPROVED" => Some(TourStatus::Approved),
            "REJECTED" => Some(TourStatus::Rejected),
            "ACTIVE" => Some(TourStatus::Active),
            "INACTIVE" => Some(TourStatus::Inactive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuideRole {
    Lead,
    Assistant,
}

/// A guide attached to a tour, with the commission the platform takes on
/// that guide's completed bookings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuideAssignment {
    pub guide_id: Uuid,
    pub commission: CommissionRate,
    pub role: GuideRole,
}

/// A published (or publishable) tour listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tour {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub max_guests: u32,
    pub duration_days: u32,
    pub status: TourStatus,
    pub guides: Vec<GuideAssignment>,
    /// Self-service edit window granted by an approved edit request.
    pub edit_allowed_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tour {
    pub fn new(
        name: String,
        description: String,
        price: Money,
        max_guests: u32,
        duration_days: u32,
        guide: GuideAssignment,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            price,
            max_guests,
            duration_days,
            status: TourStatus::Active,
            guides: vec![guide],
            edit_allowed_until: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A tour with no approved guide cannot accept bookings, whatever its
    /// status says.
    pub fn is_bookable(&self) -> bool {
        matches!(self.status, TourStatus::Active | TourStatus::Approved)
            && !self.guides.is_empty()
    }

    pub fn assignment_for(&self, guide_id: Uuid) -> Option<&GuideAssignment> {
        self.guides.iter().find(|g| g.guide_id == guide_id)
    }

    pub fn has_guide(&self, guide_id: Uuid) -> bool {
        self.assignment_for(guide_id).is_some()
    }

    pub fn commission_for(&self, guide_id: Uuid) -> Option<CommissionRate> {
        self.assignment_for(guide_id).map(|g| g.commission)
    }

    pub fn edit_window_open(&self, now: DateTime<Utc>) -> bool {
        self.edit_allowed_until.map(|until| now < until).unwrap_or(false)
    }
}

/// Fields a guide may change through the self-service edit window.
/// Everything else (guides, commission, status) stays admin-controlled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TourChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub max_guests: Option<u32>,
}

impl TourChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.max_guests.is_none()
    }

    pub fn apply_to(&self, tour: &mut Tour) {
        if let Some(name) = &self.name {
            tour.name = name.clone();
        }
        if let Some(description) = &self.description {
            tour.description = description.clone();
        }
        if let Some(price) = self.price {
            tour.price = price;
        }
        if let Some(max_guests) = self.max_guests {
            tour.max_guests = max_guests;
        }
        tour.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn assignment(guide_id: Uuid) -> GuideAssignment {
        GuideAssignment {
            guide_id,
            commission: CommissionRate::from_bps(1500).unwrap(),
            role: GuideRole::Lead,
        }
    }

    fn tour() -> Tour {
        Tour::new(
            "Ha Long overnight cruise".into(),
            "Two days on the bay".into(),
            Money::new(500_000).unwrap(),
            10,
            2,
            assignment(Uuid::new_v4()),
        )
    }

    #[test]
    fn tour_without_guides_is_not_bookable() {
        let mut t = tour();
        assert!(t.is_bookable());
        t.guides.clear();
        assert!(!t.is_bookable());
    }

    #[test]
    fn inactive_tour_is_not_bookable() {
        let mut t = tour();
        t.status = TourStatus::Inactive;
        assert!(!t.is_bookable());
    }

    #[test]
    fn edit_window_is_exclusive_at_the_boundary() {
        let mut t = tour();
        let now = Utc::now();
        assert!(!t.edit_window_open(now));
        t.edit_allowed_until = Some(now + Duration::hours(48));
        assert!(t.edit_window_open(now));
        assert!(!t.edit_window_open(now + Duration::hours(48)));
    }
}
