pub mod approval;
pub mod pricing;
pub mod repository;
pub mod requests;
pub mod tour;

pub use approval::{ApprovalRules, ApprovalService};
pub use pricing::Participant;
pub use requests::{CreateTourPayload, RequestKind, RequestOutcome, RequestStatus, TourRequest};
pub use tour::{GuideAssignment, GuideRole, Tour, TourChanges, TourStatus};
