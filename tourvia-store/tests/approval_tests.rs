mod common;

use chrono::Utc;
use common::{adult, harness, vnd};
use tourvia_booking::models::DecisionOutcome;
use tourvia_catalog::repository::TourRepository;
use tourvia_catalog::requests::{CreateTourPayload, RequestOutcome, RequestStatus};
use tourvia_catalog::tour::{TourChanges, TourStatus};
use tourvia_core::CoreError;

fn payload() -> CreateTourPayload {
    CreateTourPayload {
        name: "Hoi An lantern walk".into(),
        description: "Old town by night".into(),
        price: vnd(350_000),
        max_guests: 12,
        duration_days: 1,
        commission_fraction: None,
    }
}

#[tokio::test]
async fn approved_create_request_publishes_the_tour() {
    let h = harness();
    let request = h
        .approvals
        .submit_tour_request(h.guide, payload())
        .await
        .unwrap();
    assert_eq!(request.status, RequestStatus::Pending);

    let decided = h
        .approvals
        .decide(h.admin, request.id, RequestOutcome::Approve, None)
        .await
        .unwrap();
    assert_eq!(decided.status, RequestStatus::Approved);
    assert_eq!(decided.decided_by, Some(h.admin.user_id));

    let published = h.tours.list_for_guide(h.guide.user_id).await.unwrap();
    assert_eq!(published.len(), 1);
    let tour = &published[0];
    assert_eq!(tour.name, "Hoi An lantern walk");
    assert_eq!(tour.status, TourStatus::Active);
    // No commission on the payload falls back to the configured 15%.
    assert_eq!(tour.commission_for(h.guide.user_id).unwrap().bps(), 1500);
}

#[tokio::test]
async fn rejected_create_request_publishes_nothing() {
    let h = harness();
    let request = h
        .approvals
        .submit_tour_request(h.guide, payload())
        .await
        .unwrap();

    let decided = h
        .approvals
        .decide(h.admin, request.id, RequestOutcome::Reject, Some("too vague".into()))
        .await
        .unwrap();
    assert_eq!(decided.status, RequestStatus::Rejected);
    assert_eq!(decided.admin_notes.as_deref(), Some("too vague"));

    assert!(h.tours.list_for_guide(h.guide.user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn create_payload_is_validated_before_it_is_queued() {
    let h = harness();

    let mut blank = payload();
    blank.name = "   ".into();
    let err = h.approvals.submit_tour_request(h.guide, blank).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    let mut long = payload();
    long.duration_days = 45; // cap is 30
    let err = h.approvals.submit_tour_request(h.guide, long).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    let mut full_cut = payload();
    full_cut.commission_fraction = Some(1.0);
    let err = h
        .approvals
        .submit_tour_request(h.guide, full_cut)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    // Customers cannot submit at all.
    let err = h
        .approvals
        .submit_tour_request(h.customer, payload())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Permission(_)));
}

#[tokio::test]
async fn only_admins_decide_and_only_once() {
    let h = harness();
    let request = h
        .approvals
        .submit_tour_request(h.guide, payload())
        .await
        .unwrap();

    let err = h
        .approvals
        .decide(h.guide, request.id, RequestOutcome::Approve, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Permission(_)));

    h.approvals
        .decide(h.admin, request.id, RequestOutcome::Approve, None)
        .await
        .unwrap();
    let err = h
        .approvals
        .decide(h.admin, request.id, RequestOutcome::Reject, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));
}

#[tokio::test]
async fn duplicate_pending_change_requests_conflict() {
    let h = harness();
    let tour = h.seed_tour().await;

    h.approvals
        .submit_edit_request(h.guide, tour.id, "new photos".into())
        .await
        .unwrap();
    let err = h
        .approvals
        .submit_edit_request(h.guide, tour.id, "again".into())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));
}

#[tokio::test]
async fn approved_edit_opens_a_window_the_guide_can_use() {
    let h = harness();
    let tour = h.seed_tour().await;

    // Outside a window the guide is locked out.
    let changes = TourChanges {
        price: Some(vnd(600_000)),
        ..TourChanges::default()
    };
    let err = h
        .approvals
        .apply_tour_edit(h.guide, tour.id, changes.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Permission(_)));

    let request = h
        .approvals
        .submit_edit_request(h.guide, tour.id, "seasonal price bump".into())
        .await
        .unwrap();
    h.approvals
        .decide(h.admin, request.id, RequestOutcome::Approve, None)
        .await
        .unwrap();

    let updated = h
        .approvals
        .apply_tour_edit(h.guide, tour.id, changes)
        .await
        .unwrap();
    assert_eq!(updated.price, vnd(600_000));
    assert!(updated.edit_window_open(Utc::now()));
}

#[tokio::test]
async fn admins_edit_without_a_window() {
    let h = harness();
    let tour = h.seed_tour().await;

    let updated = h
        .approvals
        .apply_tour_edit(
            h.admin,
            tour.id,
            TourChanges {
                max_guests: Some(20),
                ..TourChanges::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.max_guests, 20);
}

#[tokio::test]
async fn edits_reject_empty_and_invalid_changes() {
    let h = harness();
    let tour = h.seed_tour().await;

    let err = h
        .approvals
        .apply_tour_edit(h.admin, tour.id, TourChanges::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    let err = h
        .approvals
        .apply_tour_edit(
            h.admin,
            tour.id,
            TourChanges {
                max_guests: Some(0),
                ..TourChanges::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}

#[tokio::test]
async fn delete_approval_is_blocked_by_live_bookings() {
    let h = harness();
    let tour = h.seed_tour().await;

    let booking = h
        .engine
        .create(h.customer, h.draft(&tour, vec![adult("An")]))
        .await
        .unwrap();
    let booking = h
        .engine
        .decide(h.guide, booking.id, DecisionOutcome::Accept, None)
        .await
        .unwrap();
    let session_id = booking.payment.as_ref().unwrap().session_id.clone();
    h.engine
        .capture_payment(booking.id, &session_id, booking.total_price)
        .await
        .unwrap();

    let request = h
        .approvals
        .submit_delete_request(h.guide, tour.id, "moving abroad".into())
        .await
        .unwrap();
    let err = h
        .approvals
        .decide(h.admin, request.id, RequestOutcome::Approve, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));

    // Blocked approval leaves the request pending and the tour live.
    let pending = h.approvals.decide(h.admin, request.id, RequestOutcome::Reject, None).await;
    assert!(pending.is_ok(), "request should still be decidable");
    let tour = h.tours.get(tour.id).await.unwrap().unwrap();
    assert_eq!(tour.status, TourStatus::Active);
}

#[tokio::test]
async fn delete_approval_retires_a_tour_with_only_canceled_bookings() {
    let h = harness();
    let tour = h.seed_tour().await;

    let booking = h
        .engine
        .create(h.customer, h.draft(&tour, vec![adult("An")]))
        .await
        .unwrap();
    h.engine
        .cancel(h.customer, booking.id, Some("rain".into()))
        .await
        .unwrap();

    let request = h
        .approvals
        .submit_delete_request(h.guide, tour.id, "retiring the route".into())
        .await
        .unwrap();
    h.approvals
        .decide(h.admin, request.id, RequestOutcome::Approve, None)
        .await
        .unwrap();

    let tour = h.tours.get(tour.id).await.unwrap().unwrap();
    assert_eq!(tour.status, TourStatus::Inactive);
    assert!(!tour.is_bookable());
}

#[tokio::test]
async fn approval_side_effects_are_replayable() {
    use tourvia_catalog::repository::TourRequestRepository;

    let h = harness();
    let request = h
        .approvals
        .submit_tour_request(h.guide, payload())
        .await
        .unwrap();
    let tour_id = request.tour_id.unwrap();

    // Mark the request approved directly, as if the process died between
    // the decision write and the publish.
    h.requests
        .decide(request.id, RequestStatus::Approved, h.admin.user_id, None)
        .await
        .unwrap();
    assert!(h.tours.get(tour_id).await.unwrap().is_none());

    h.approvals.redrive_approval(h.admin, request.id).await.unwrap();
    let tour = h.tours.get(tour_id).await.unwrap().unwrap();
    assert_eq!(tour.status, TourStatus::Active);

    // Replaying a second time publishes nothing new.
    h.approvals.redrive_approval(h.admin, request.id).await.unwrap();
    assert_eq!(h.tours.list_for_guide(h.guide.user_id).await.unwrap().len(), 1);

    // A still-pending request has nothing to replay.
    let pending = h
        .approvals
        .submit_tour_request(h.guide, payload())
        .await
        .unwrap();
    let err = h
        .approvals
        .redrive_approval(h.admin, pending.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));
}

#[tokio::test]
async fn guides_can_withdraw_their_own_pending_request() {
    let h = harness();
    let tour = h.seed_tour().await;

    let request = h
        .approvals
        .submit_edit_request(h.guide, tour.id, "typo fix".into())
        .await
        .unwrap();

    // Someone else's request cannot be withdrawn.
    let stranger = tourvia_core::identity::Actor::new(
        uuid::Uuid::new_v4(),
        tourvia_core::identity::Role::Guide,
    );
    let err = h.approvals.cancel_request(stranger, request.id).await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Permission(_) | CoreError::NotFound(_)
    ));

    h.approvals.cancel_request(h.guide, request.id).await.unwrap();

    // Withdrawn means gone, and the pending slot is free again.
    let err = h
        .approvals
        .decide(h.admin, request.id, RequestOutcome::Approve, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
    h.approvals
        .submit_edit_request(h.guide, tour.id, "typo fix, take two".into())
        .await
        .unwrap();
}
