use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tourvia_api::middleware::auth::issue_token;
use tourvia_api::{app, AppState, AuthConfig};
use tourvia_booking::{BookingEngine, EngineRules, SettlementService};
use tourvia_catalog::repository::TourRepository;
use tourvia_catalog::tour::{GuideAssignment, GuideRole, Tour};
use tourvia_catalog::{ApprovalRules, ApprovalService};
use tourvia_core::identity::Role;
use tourvia_core::notify::{Dispatcher, TracingNotifier};
use tourvia_core::payment::MockPaymentGateway;
use tourvia_shared::{CommissionRate, Money};
use tourvia_store::memory::{
    InMemoryBookingRepository, InMemoryBusyCalendar, InMemoryLedgerRepository,
    InMemoryTourRepository, InMemoryTourRequestRepository,
};
use tourvia_store::BusinessRules;
use tower::ServiceExt; // for `oneshot`

const TEST_SECRET: &str = "test-secret-not-for-production";

struct TestServer {
    router: Router,
    tours: Arc<InMemoryTourRepository>,
}

fn test_server() -> TestServer {
    let tours = Arc::new(InMemoryTourRepository::new());
    let requests = Arc::new(InMemoryTourRequestRepository::new());
    let bookings = Arc::new(InMemoryBookingRepository::new());
    let ledger = Arc::new(InMemoryLedgerRepository::new());
    let busy = Arc::new(InMemoryBusyCalendar::new());
    let dispatcher = Dispatcher::new(Arc::new(TracingNotifier));

    let settlement = SettlementService::new(
        ledger,
        dispatcher.clone(),
        Money::new(100_000).unwrap(),
    );
    let engine = Arc::new(BookingEngine::new(
        bookings.clone(),
        tours.clone(),
        busy.clone(),
        Arc::new(MockPaymentGateway),
        settlement.clone(),
        dispatcher.clone(),
        EngineRules {
            guide_decision_timeout_hours: 48,
            payment_timeout_hours: 24,
        },
    ));
    let approvals = Arc::new(ApprovalService::new(
        tours.clone(),
        requests,
        bookings,
        dispatcher,
        ApprovalRules {
            max_tour_duration_days: 30,
            edit_window_hours: 48,
            default_commission_bps: 1500,
        },
    ));

    let state = AppState {
        engine,
        approvals,
        settlement,
        tours: tours.clone(),
        busy,
        auth: AuthConfig {
            secret: TEST_SECRET.to_string(),
            expiration: 3600,
        },
        business_rules: BusinessRules {
            max_tour_duration_days: 30,
            edit_window_hours: 48,
            default_commission_bps: 1500,
            min_withdrawal_vnd: 100_000,
            guide_decision_timeout_hours: 48,
            payment_timeout_hours: 24,
            sweep_interval_seconds: 300,
        },
    };

    TestServer {
        router: app(state),
        tours,
    }
}

impl TestServer {
    async fn seed_tour(&self, guide_id: uuid::Uuid) -> Tour {
        let tour = Tour::new(
            "Ha Long bay kayak".into(),
            "A day on the water".into(),
            Money::new(500_000).unwrap(),
            10,
            1,
            GuideAssignment {
                guide_id,
                commission: CommissionRate::from_bps(1500).unwrap(),
                role: GuideRole::Lead,
            },
        );
        self.tours.insert(&tour).await.unwrap();
        tour
    }

    async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }
}

fn token_for(role: Role) -> (String, uuid::Uuid) {
    let user_id = uuid::Uuid::new_v4();
    let token = issue_token(TEST_SECRET, user_id, role, 3600).unwrap();
    (token, user_id)
}

fn booking_body(tour: &Tour, guide_id: uuid::Uuid) -> Value {
    json!({
        "tour_id": tour.id,
        "guide_id": guide_id,
        "start_date": (Utc::now() + Duration::days(7)).date_naive(),
        "start_time": "08:00:00",
        "participants": [
            {"full_name": "An", "age": 30, "count_slot": true},
            {"full_name": "Binh", "age": 28, "count_slot": true},
        ],
    })
}

#[tokio::test]
async fn health_is_public() {
    let server = test_server();
    let (status, _) = server.request("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn protected_routes_reject_missing_and_bad_tokens() {
    let server = test_server();

    let (status, _) = server.request("GET", "/v1/bookings", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = server
        .request("GET", "/v1/bookings", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn booking_lifecycle_over_http() {
    let server = test_server();
    let (guide_token, guide_id) = token_for(Role::Guide);
    let (customer_token, _) = token_for(Role::Customer);
    let (admin_token, _) = token_for(Role::Admin);
    let tour = server.seed_tour(guide_id).await;

    // Customer opens the booking.
    let (status, booking) = server
        .request(
            "POST",
            "/v1/bookings",
            Some(&customer_token),
            Some(booking_body(&tour, guide_id)),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["status"], "WAITING_GUIDE");
    assert_eq!(booking["total_price"], 1_000_000);
    let booking_id = booking["id"].as_str().unwrap().to_string();

    // Guide accepts; a payment session opens.
    let (status, booking) = server
        .request(
            "POST",
            &format!("/v1/bookings/{}/decision", booking_id),
            Some(&guide_token),
            Some(json!({"outcome": "ACCEPT", "note": "see you at the dock"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(booking["status"], "AWAITING_PAYMENT");
    let session_id = booking["payment"]["session_id"].as_str().unwrap().to_string();

    // Gateway callback captures the payment.
    let capture = json!({
        "booking_id": booking_id,
        "session_id": session_id,
        "event": "payment.succeeded",
        "amount_vnd": 1_000_000,
    });
    let (status, body) = server
        .request("POST", "/v1/webhooks/payments", None, Some(capture.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "PAID");

    // Replay of the same callback is acknowledged, not double-captured.
    let (status, body) = server
        .request("POST", "/v1/webhooks/payments", None, Some(capture))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "PAID");

    // Admin completes, which settles the guide's share.
    let (status, booking) = server
        .request(
            "POST",
            &format!("/v1/bookings/{}/complete", booking_id),
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(booking["status"], "COMPLETED");

    // 15% of 1,000,000 goes to the platform.
    let (status, balance) = server
        .request("GET", "/v1/finance/balance", Some(&guide_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balance["balance"], 850_000);
}

#[tokio::test]
async fn error_taxonomy_maps_to_status_codes() {
    let server = test_server();
    let (guide_token, guide_id) = token_for(Role::Guide);
    let (customer_token, _) = token_for(Role::Customer);
    let (stranger_token, _) = token_for(Role::Guide);
    let tour = server.seed_tour(guide_id).await;

    // NotFound -> 404
    let (status, _) = server
        .request(
            "GET",
            &format!("/v1/bookings/{}", uuid::Uuid::new_v4()),
            Some(&customer_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, booking) = server
        .request(
            "POST",
            "/v1/bookings",
            Some(&customer_token),
            Some(booking_body(&tour, guide_id)),
        )
        .await;
    let booking_id = booking["id"].as_str().unwrap().to_string();

    // Permission -> 403: a different guide cannot decide.
    let (status, _) = server
        .request(
            "POST",
            &format!("/v1/bookings/{}/decision", booking_id),
            Some(&stranger_token),
            Some(json!({"outcome": "ACCEPT"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Validation -> 400: capture with the wrong amount.
    let (_, booking) = server
        .request(
            "POST",
            &format!("/v1/bookings/{}/decision", booking_id),
            Some(&guide_token),
            Some(json!({"outcome": "ACCEPT"})),
        )
        .await;
    let session_id = booking["payment"]["session_id"].as_str().unwrap().to_string();
    let (status, _) = server
        .request(
            "POST",
            "/v1/webhooks/payments",
            None,
            Some(json!({
                "booking_id": booking_id,
                "session_id": session_id,
                "event": "payment.succeeded",
                "amount_vnd": 1,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Conflict -> 409: deciding a booking that already left WAITING_GUIDE.
    let (status, _) = server
        .request(
            "POST",
            &format!("/v1/bookings/{}/decision", booking_id),
            Some(&guide_token),
            Some(json!({"outcome": "REJECT"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Permission -> 403: non-admin on the admin surface.
    let (status, _) = server
        .request("GET", "/v1/admin/requests", Some(&guide_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Permission -> 403: customers cannot submit tour requests.
    let (status, _) = server
        .request(
            "POST",
            "/v1/tours/requests",
            Some(&customer_token),
            Some(json!({
                "name": "Cu Chi tunnels",
                "description": "Half-day trip",
                "price_vnd": 400_000,
                "max_guests": 8,
                "duration_days": 1,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn dev_token_endpoint_issues_usable_tokens() {
    let server = test_server();

    let (status, body) = server
        .request(
            "POST",
            "/v1/auth/token",
            None,
            Some(json!({"role": "GUIDE"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, dates) = server
        .request("GET", "/v1/guides/busy-dates", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dates, json!([]));

    let (status, _) = server
        .request(
            "POST",
            "/v1/auth/token",
            None,
            Some(json!({"role": "WIZARD"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn busy_dates_are_an_idempotent_set() {
    let server = test_server();
    let (guide_token, _) = token_for(Role::Guide);
    let date = (Utc::now() + Duration::days(3)).date_naive();
    let uri = format!("/v1/guides/busy-dates/{}", date);

    for _ in 0..2 {
        let (status, _) = server.request("PUT", &uri, Some(&guide_token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    let (_, dates) = server
        .request("GET", "/v1/guides/busy-dates", Some(&guide_token), None)
        .await;
    assert_eq!(dates, json!([date.to_string()]));

    let (status, _) = server
        .request("DELETE", &uri, Some(&guide_token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, dates) = server
        .request("GET", "/v1/guides/busy-dates", Some(&guide_token), None)
        .await;
    assert_eq!(dates, json!([]));
}

#[tokio::test]
async fn tour_request_flow_over_http() {
    let server = test_server();
    let (guide_token, _) = token_for(Role::Guide);
    let (admin_token, _) = token_for(Role::Admin);

    let (status, request) = server
        .request(
            "POST",
            "/v1/tours/requests",
            Some(&guide_token),
            Some(json!({
                "name": "Sapa trek",
                "description": "Two days through the terraces",
                "price_vnd": 1_200_000,
                "max_guests": 6,
                "duration_days": 2,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let request_id = request["id"].as_str().unwrap().to_string();

    let (status, pending) = server
        .request("GET", "/v1/admin/requests", Some(&admin_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let (status, decided) = server
        .request(
            "POST",
            &format!("/v1/admin/requests/{}/decision", request_id),
            Some(&admin_token),
            Some(json!({"outcome": "APPROVE"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decided["status"], "APPROVED");

    // The tour is now publicly listed.
    let (status, tours) = server.request("GET", "/v1/tours", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let tours = tours.as_array().unwrap();
    assert_eq!(tours.len(), 1);
    assert_eq!(tours[0]["name"], "Sapa trek");
}
