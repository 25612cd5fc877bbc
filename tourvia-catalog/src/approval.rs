use std::sync::Arc;

use chrono::{Duration, Utc};
use tourvia_core::identity::{Actor, Role};
use tourvia_core::notify::Dispatcher;
use tourvia_core::{CoreError, CoreResult};
use tourvia_shared::{CommissionRate, Notification, NotificationKind};
use uuid::Uuid;

use crate::repository::{BookingCounter, TourRepository, TourRequestRepository};
use crate::requests::{
    CreateTourPayload, RequestKind, RequestOutcome, RequestStatus, TourRequest,
};
use crate::tour::{GuideAssignment, GuideRole, Tour, TourChanges, TourStatus};

#[derive(Debug, Clone)]
pub struct ApprovalRules {
    pub max_tour_duration_days: u32,
    pub edit_window_hours: i64,
    pub default_commission_bps: i64,
}

/// Adjudication workflow for tour creation, edit, and delete requests.
/// Guides submit, admins decide; both sides go through here so the
/// request state machine is enforced in exactly one place.
pub struct ApprovalService {
    tours: Arc<dyn TourRepository>,
    requests: Arc<dyn TourRequestRepository>,
    bookings: Arc<dyn BookingCounter>,
    dispatcher: Dispatcher,
    rules: ApprovalRules,
}

impl ApprovalService {
    pub fn new(
        tours: Arc<dyn TourRepository>,
        requests: Arc<dyn TourRequestRepository>,
        bookings: Arc<dyn BookingCounter>,
        dispatcher: Dispatcher,
        rules: ApprovalRules,
    ) -> Self {
        Self {
            tours,
            requests,
            bookings,
            dispatcher,
            rules,
        }
    }

    /// Guide asks to publish a new tour.
    pub async fn submit_tour_request(
        &self,
        actor: Actor,
        payload: CreateTourPayload,
    ) -> CoreResult<TourRequest> {
        actor.require_role(Role::Guide)?;
        self.validate_create_payload(&payload)?;

        // The tour's id is reserved now, so publishing on approval is
        // replayable: a second run finds the tour already inserted.
        let reserved = Uuid::new_v4();
        let request = TourRequest::new(actor.user_id, Some(reserved), RequestKind::Create(payload));
        self.requests.insert(&request).await?;

        tracing::info!(request_id = %request.id, guide_id = %actor.user_id, "tour request submitted");
        self.dispatcher
            .dispatch(Notification::to_admins(
                NotificationKind::TourRequestSubmitted,
                format!("New tour request {} awaiting review", request.id),
            ))
            .await;
        Ok(request)
    }

    /// Guide asks for an edit window on an already-published tour.
    pub async fn submit_edit_request(
        &self,
        actor: Actor,
        tour_id: Uuid,
        description: String,
    ) -> CoreResult<TourRequest> {
        self.submit_change_request(actor, tour_id, RequestKind::Edit { description })
            .await
    }

    /// Guide asks to retire a tour.
    pub async fn submit_delete_request(
        &self,
        actor: Actor,
        tour_id: Uuid,
        reason: String,
    ) -> CoreResult<TourRequest> {
        self.submit_change_request(actor, tour_id, RequestKind::Delete { reason })
            .await
    }

    async fn submit_change_request(
        &self,
        actor: Actor,
        tour_id: Uuid,
        kind: RequestKind,
    ) -> CoreResult<TourRequest> {
        actor.require_role(Role::Guide)?;
        let tour = self
            .tours
            .get(tour_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("tour {}", tour_id)))?;
        if !tour.has_guide(actor.user_id) {
            return Err(CoreError::Permission(
                "only an assigned guide may request changes to a tour".into(),
            ));
        }

        let request = TourRequest::new(actor.user_id, Some(tour_id), kind);
        // The repository rejects a second pending request for the same
        // (tour, guide) pair.
        self.requests.insert(&request).await?;

        tracing::info!(request_id = %request.id, %tour_id, kind = request.kind.label(), "change request submitted");
        self.dispatcher
            .dispatch(Notification::to_admins(
                NotificationKind::TourRequestSubmitted,
                format!(
                    "{} request {} for tour {} awaiting review",
                    request.kind.label(),
                    request.id,
                    tour_id
                ),
            ))
            .await;
        Ok(request)
    }

    /// Admin verdict. The underlying write is conditional on the request
    /// still being pending, so two racing admins cannot both win.
    pub async fn decide(
        &self,
        actor: Actor,
        request_id: Uuid,
        outcome: RequestOutcome,
        notes: Option<String>,
    ) -> CoreResult<TourRequest> {
        actor.require_admin()?;
        let request = self
            .requests
            .get(request_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("tour request {}", request_id)))?;
        if request.status.is_terminal() {
            return Err(CoreError::Conflict("request already decided".into()));
        }

        // Delete approval is gated on the booking collection before the
        // request is consumed, so a blocked approval leaves it pending.
        if outcome == RequestOutcome::Approve {
            if let RequestKind::Delete { .. } = &request.kind {
                let tour_id = request
                    .tour_id
                    .ok_or_else(|| CoreError::Internal("delete request without tour".into()))?;
                let blocking = self.bookings.count_blocking(tour_id).await?;
                if blocking > 0 {
                    return Err(CoreError::Conflict(format!(
                        "tour has {} bookings that are not canceled",
                        blocking
                    )));
                }
            }
        }

        let status = match outcome {
            RequestOutcome::Approve => RequestStatus::Approved,
            RequestOutcome::Reject => RequestStatus::Rejected,
        };
        let decided = self
            .requests
            .decide(request_id, status, actor.user_id, notes)
            .await?;

        // The decision is already committed; if the side effect fails here
        // the request stays APPROVED and `redrive_approval` replays it.
        if outcome == RequestOutcome::Approve {
            self.apply_approval(&decided).await?;
        }

        tracing::info!(
            request_id = %request_id,
            admin_id = %actor.user_id,
            outcome = decided.status.as_str(),
            "tour request decided"
        );
        self.dispatcher
            .dispatch(Notification::to_user(
                decided.guide_id,
                NotificationKind::TourRequestDecided,
                format!(
                    "Your {} request was {}",
                    decided.kind.label(),
                    decided.status.as_str().to_lowercase()
                ),
            ))
            .await;
        Ok(decided)
    }

    /// Approval side effects. Every arm is idempotent so a replay after a
    /// partial failure converges instead of duplicating work.
    async fn apply_approval(&self, request: &TourRequest) -> CoreResult<()> {
        match &request.kind {
            RequestKind::Create(payload) => {
                let tour_id = request
                    .tour_id
                    .ok_or_else(|| CoreError::Internal("create request without a reserved tour id".into()))?;
                if self.tours.get(tour_id).await?.is_some() {
                    tracing::debug!(%tour_id, "tour already published, skipping");
                    return Ok(());
                }
                let commission = match payload.commission_fraction {
                    Some(fraction) => CommissionRate::from_fraction(fraction)?,
                    None => CommissionRate::from_bps(self.rules.default_commission_bps)?,
                };
                let mut tour = Tour::new(
                    payload.name.clone(),
                    payload.description.clone(),
                    payload.price,
                    payload.max_guests,
                    payload.duration_days,
                    GuideAssignment {
                        guide_id: request.guide_id,
                        commission,
                        role: GuideRole::Lead,
                    },
                );
                tour.id = tour_id;
                self.tours.insert(&tour).await?;
                tracing::info!(tour_id = %tour.id, guide_id = %request.guide_id, "tour published");
            }
            RequestKind::Edit { .. } => {
                let tour_id = request
                    .tour_id
                    .ok_or_else(|| CoreError::Internal("edit request without tour".into()))?;
                let until = Utc::now() + Duration::hours(self.rules.edit_window_hours);
                self.tours.set_edit_window(tour_id, until).await?;
                tracing::info!(%tour_id, %until, "edit window opened");
            }
            RequestKind::Delete { .. } => {
                let tour_id = request
                    .tour_id
                    .ok_or_else(|| CoreError::Internal("delete request without tour".into()))?;
                self.tours.set_status(tour_id, TourStatus::Inactive).await?;
                tracing::info!(%tour_id, "tour retired");
            }
        }
        Ok(())
    }

    /// Replay the side effects of an already-approved request. Covers the
    /// crash window between the decision write and the tour update; safe to
    /// run any number of times.
    pub async fn redrive_approval(&self, actor: Actor, request_id: Uuid) -> CoreResult<()> {
        actor.require_admin()?;
        let request = self
            .requests
            .get(request_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("tour request {}", request_id)))?;
        if request.status != RequestStatus::Approved {
            return Err(CoreError::Conflict(format!(
                "request is {}, only approved requests can be redriven",
                request.status.as_str()
            )));
        }
        self.apply_approval(&request).await
    }

    /// Review queue for the admin console.
    pub async fn list_pending(&self, actor: Actor) -> CoreResult<Vec<TourRequest>> {
        actor.require_admin()?;
        self.requests.list_pending().await
    }

    /// A guide's own submissions, decided or not.
    pub async fn list_for_guide(&self, actor: Actor) -> CoreResult<Vec<TourRequest>> {
        actor.require_role(Role::Guide)?;
        self.requests.list_for_guide(actor.user_id).await
    }

    /// Guide withdraws a still-pending request.
    pub async fn cancel_request(&self, actor: Actor, request_id: Uuid) -> CoreResult<()> {
        actor.require_role(Role::Guide)?;
        self.requests.cancel_pending(request_id, actor.user_id).await
    }

    /// Self-service edit inside an approved window. Applies immediately,
    /// no further review.
    pub async fn apply_tour_edit(
        &self,
        actor: Actor,
        tour_id: Uuid,
        changes: TourChanges,
    ) -> CoreResult<crate::tour::Tour> {
        let tour = self
            .tours
            .get(tour_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("tour {}", tour_id)))?;
        if !actor.is_admin() {
            actor.require_role(Role::Guide)?;
            if !tour.has_guide(actor.user_id) {
                return Err(CoreError::Permission(
                    "only an assigned guide may edit this tour".into(),
                ));
            }
            if !tour.edit_window_open(Utc::now()) {
                return Err(CoreError::Permission(
                    "no open edit window; submit an edit request first".into(),
                ));
            }
        }
        if changes.is_empty() {
            return Err(CoreError::Validation("no changes supplied".into()));
        }
        if let Some(price) = changes.price {
            if price.is_zero() {
                return Err(CoreError::Validation("price must be positive".into()));
            }
        }
        if let Some(max_guests) = changes.max_guests {
            if max_guests == 0 {
                return Err(CoreError::Validation("max_guests must be at least 1".into()));
            }
        }
        self.tours.apply_changes(tour_id, &changes).await
    }

    fn validate_create_payload(&self, payload: &CreateTourPayload) -> CoreResult<()> {
        if payload.name.trim().is_empty() {
            return Err(CoreError::Validation("tour name is required".into()));
        }
        if payload.price.is_zero() {
            return Err(CoreError::Validation("price must be positive".into()));
        }
        if payload.max_guests == 0 {
            return Err(CoreError::Validation("max_guests must be at least 1".into()));
        }
        if payload.duration_days == 0 {
            return Err(CoreError::Validation("duration is required".into()));
        }
        if payload.duration_days > self.rules.max_tour_duration_days {
            return Err(CoreError::Validation(format!(
                "duration of {} days exceeds the {} day maximum",
                payload.duration_days, self.rules.max_tour_duration_days
            )));
        }
        if let Some(fraction) = payload.commission_fraction {
            CommissionRate::from_fraction(fraction)?;
        }
        Ok(())
    }
}
