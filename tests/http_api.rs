//! Integration tests for the REST API.
//!
//! Requests go through the full router (middleware included) over the
//! in-memory repositories and mock gateways:
//! 1. Health and request-id plumbing
//! 2. Caller identity and role checks
//! 3. Webhook verification and acknowledgement
//! 4. Ledger, payout and dispute endpoints

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use mentorship_ledger::adapters::currency::FixedRateConverter;
use mentorship_ledger::adapters::events::InMemoryEventBus;
use mentorship_ledger::adapters::http::{api_router, AppState, HttpOptions, ServiceSettings};
use mentorship_ledger::adapters::memory::{
    InMemoryBalanceRepository, InMemoryDisputeRepository, InMemoryPaymentRepository,
    InMemoryPayoutRepository, InMemorySessionDirectory, InMemoryWebhookEventRepository,
};
use mentorship_ledger::adapters::mock::MockPaymentGateway;
use mentorship_ledger::application::payments::PaymentGateways;
use mentorship_ledger::domain::foundation::{Currency, MentorId, Money, SessionId, UserId};
use mentorship_ledger::domain::payment::{CallbackStatus, PaymentProvider};
use mentorship_ledger::ports::{SessionSnapshot, SessionState};

// =============================================================================
// Test Infrastructure
// =============================================================================

struct TestApp {
    router: Router,
    sessions: InMemorySessionDirectory,
}

fn test_app() -> TestApp {
    let sessions = InMemorySessionDirectory::new();
    let state = AppState {
        payments: Arc::new(InMemoryPaymentRepository::new()),
        balances: Arc::new(InMemoryBalanceRepository::new()),
        payouts: Arc::new(InMemoryPayoutRepository::new()),
        disputes: Arc::new(InMemoryDisputeRepository::new()),
        webhook_events: Arc::new(InMemoryWebhookEventRepository::new()),
        sessions: Arc::new(sessions.clone()),
        gateways: PaymentGateways::new(
            Arc::new(MockPaymentGateway::new(PaymentProvider::Stripe)),
            Arc::new(MockPaymentGateway::new(PaymentProvider::Paymob)),
        ),
        converter: Arc::new(FixedRateConverter::new(50.0).unwrap()),
        event_publisher: Arc::new(InMemoryEventBus::new()),
        settings: ServiceSettings::default(),
    };
    TestApp {
        router: api_router(state, &HttpOptions::default()),
        sessions,
    }
}

async fn booked_session(app: &TestApp, mentor_id: MentorId, price: i64) -> SessionSnapshot {
    let session = SessionSnapshot {
        id: SessionId::new(),
        mentor_id,
        mentee_id: UserId::new(),
        price: Some(Money::new(price, Currency::Egp).unwrap()),
        state: SessionState::Booked,
        title: "Interview preparation".to_string(),
        mentee_email: Some("mentee@example.com".to_string()),
        mentee_name: Some("Nour Ali".to_string()),
        mentee_phone: Some("+201000000002".to_string()),
    };
    app.sessions.insert(session.clone()).await;
    session
}

fn request(method: &str, uri: &str, user: Option<(Uuid, &str)>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = user {
        builder = builder
            .header("X-User-Id", id.to_string())
            .header("X-User-Role", role);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &TestApp, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn paymob_webhook(event_id: &str, provider_payment_id: &str, amount: i64, hmac: &str) -> Request<Body> {
    let payload = MockPaymentGateway::callback_payload(
        event_id,
        provider_payment_id,
        CallbackStatus::Succeeded,
        amount,
        "EGP",
    );
    Request::builder()
        .method("POST")
        .uri(format!("/payments/webhooks/paymob?hmac={}", hmac))
        .header("content-type", "application/json")
        .body(Body::from(payload))
        .unwrap()
}

/// Creates an intent as the mentee and settles it by webhook.
async fn paid_session(app: &TestApp, mentor_id: MentorId, price: i64) -> (SessionSnapshot, Value) {
    let session = booked_session(app, mentor_id, price).await;
    let (status, payment) = send(
        app,
        request(
            "POST",
            "/payments/intents",
            Some((*session.mentee_id.as_uuid(), "mentee")),
            Some(json!({ "session_id": session.id.as_uuid(), "provider": "paymob" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let ppid = payment["provider_payment_id"].as_str().unwrap().to_string();
    let (status, _) = send(
        app,
        paymob_webhook(&format!("evt_{}", ppid), &ppid, price, MockPaymentGateway::SIGNATURE),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    (session, payment)
}

// =============================================================================
// Health and middleware
// =============================================================================

#[tokio::test]
async fn health_reports_ok_with_request_id() {
    let app = test_app();
    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/health", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
}

// =============================================================================
// Authentication and roles
// =============================================================================

#[tokio::test]
async fn missing_identity_is_unauthorized() {
    let app = test_app();
    let (status, body) = send(
        &app,
        request("GET", &format!("/payments/{}", Uuid::new_v4()), None, None),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn mentors_cannot_create_payment_intents() {
    let app = test_app();
    let session = booked_session(&app, MentorId::new(), 50_000).await;

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/payments/intents",
            Some((Uuid::new_v4(), "mentor")),
            Some(json!({ "session_id": session.id.as_uuid(), "provider": "paymob" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn payment_is_visible_only_to_its_parties() {
    let app = test_app();
    let mentor = MentorId::new();
    let (session, payment) = paid_session(&app, mentor, 50_000).await;
    let uri = format!("/payments/{}", payment["id"].as_str().unwrap());

    let (status, body) = send(
        &app,
        request("GET", &uri, Some((*session.mentee_id.as_uuid(), "mentee")), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "succeeded");

    let (status, _) = send(&app, request("GET", &uri, Some((Uuid::new_v4(), "mentee")), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// =============================================================================
// Webhooks
// =============================================================================

#[tokio::test]
async fn webhook_settles_and_duplicate_is_acknowledged() {
    let app = test_app();
    let session = booked_session(&app, MentorId::new(), 50_000).await;
    let (_, payment) = send(
        &app,
        request(
            "POST",
            "/payments/intents",
            Some((*session.mentee_id.as_uuid(), "mentee")),
            Some(json!({ "session_id": session.id.as_uuid(), "provider": "paymob" })),
        ),
    )
    .await;
    let ppid = payment["provider_payment_id"].as_str().unwrap();

    let (status, first) = send(&app, paymob_webhook("evt_1", ppid, 50_000, MockPaymentGateway::SIGNATURE)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["result"], "processed");
    assert_eq!(first["status"], "succeeded");

    let (status, second) = send(&app, paymob_webhook("evt_1", ppid, 50_000, MockPaymentGateway::SIGNATURE)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["result"], "duplicate");
}

#[tokio::test]
async fn webhook_with_bad_signature_is_rejected() {
    let app = test_app();
    let session = booked_session(&app, MentorId::new(), 50_000).await;
    let mentee = *session.mentee_id.as_uuid();
    let (_, payment) = send(
        &app,
        request(
            "POST",
            "/payments/intents",
            Some((mentee, "mentee")),
            Some(json!({ "session_id": session.id.as_uuid(), "provider": "paymob" })),
        ),
    )
    .await;
    let ppid = payment["provider_payment_id"].as_str().unwrap();

    let (status, body) = send(&app, paymob_webhook("evt_1", ppid, 50_000, "forged")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_SIGNATURE");

    let uri = format!("/payments/{}", payment["id"].as_str().unwrap());
    let (_, stored) = send(&app, request("GET", &uri, Some((mentee, "mentee")), None)).await;
    assert_eq!(stored["status"], "pending_confirmation");
}

#[tokio::test]
async fn webhook_for_unknown_provider_is_not_found() {
    let app = test_app();
    let req = Request::builder()
        .method("POST")
        .uri("/payments/webhooks/paypal")
        .body(Body::from("{}"))
        .unwrap();

    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "UNKNOWN_PROVIDER");
}

#[tokio::test]
async fn webhook_amount_mismatch_is_unprocessable() {
    let app = test_app();
    let session = booked_session(&app, MentorId::new(), 50_000).await;
    let (_, payment) = send(
        &app,
        request(
            "POST",
            "/payments/intents",
            Some((*session.mentee_id.as_uuid(), "mentee")),
            Some(json!({ "session_id": session.id.as_uuid(), "provider": "paymob" })),
        ),
    )
    .await;
    let ppid = payment["provider_payment_id"].as_str().unwrap();

    let (status, body) = send(&app, paymob_webhook("evt_1", ppid, 100, MockPaymentGateway::SIGNATURE)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "INVARIANT_VIOLATION");
}

// =============================================================================
// Ledger, payouts and disputes
// =============================================================================

#[tokio::test]
async fn mentor_reads_own_balance_only() {
    let app = test_app();
    let mentor = MentorId::new();
    paid_session(&app, mentor, 50_000).await;
    let uri = format!("/ledger/mentors/{}/balance", mentor.as_uuid());

    let (status, body) = send(&app, request("GET", &uri, Some((*mentor.as_uuid(), "mentor")), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available_balance"], 42_500);

    let (status, _) = send(&app, request("GET", &uri, Some((Uuid::new_v4(), "mentor")), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        request(
            "GET",
            &format!("/ledger/mentors/{}/entries", mentor.as_uuid()),
            Some((Uuid::new_v4(), "admin")),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entries"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn payout_overdraw_is_conflict_and_failure_restores_funds() {
    let app = test_app();
    let mentor = MentorId::new();
    let mentor_user = Some((*mentor.as_uuid(), "mentor"));
    let admin = Some((Uuid::new_v4(), "admin"));
    paid_session(&app, mentor, 50_000).await;

    let (status, payout) = send(&app, request("POST", "/payouts", mentor_user, Some(json!({ "amount": 40_000 })))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(payout["status"], "pending");

    let (status, body) = send(&app, request("POST", "/payouts", mentor_user, Some(json!({ "amount": 10_000 })))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INSUFFICIENT_BALANCE");

    let fail_uri = format!("/payouts/{}/fail", payout["id"].as_str().unwrap());
    let (status, _) = send(&app, request("POST", &fail_uri, mentor_user, Some(json!({ "reason": "x" })))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, failed) = send(
        &app,
        request("POST", &fail_uri, admin, Some(json!({ "reason": "bank rejected transfer" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(failed["status"], "failed");

    let (_, balance) = send(
        &app,
        request("GET", &format!("/ledger/mentors/{}/balance", mentor.as_uuid()), mentor_user, None),
    )
    .await;
    assert_eq!(balance["available_balance"], 42_500);
}

#[tokio::test]
async fn dispute_full_refund_through_api() {
    let app = test_app();
    let mentor = MentorId::new();
    let (session, payment) = paid_session(&app, mentor, 50_000).await;
    let mentee = Some((*session.mentee_id.as_uuid(), "mentee"));
    let admin = Some((Uuid::new_v4(), "admin"));

    // Disputes are only accepted once the session has taken place.
    let body = json!({ "session_id": session.id.as_uuid(), "reason": "no_show" });
    let (status, _) = send(&app, request("POST", "/disputes", mentee, Some(body.clone()))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    app.sessions.set_state(session.id, SessionState::Completed).await;
    let (status, dispute) = send(&app, request("POST", "/disputes", mentee, Some(body.clone()))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(dispute["status"], "pending");

    let (status, _) = send(&app, request("POST", "/disputes", mentee, Some(body))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let resolve_uri = format!("/disputes/{}/resolve", dispute["id"].as_str().unwrap());
    let (status, resolved) = send(
        &app,
        request("POST", &resolve_uri, admin, Some(json!({ "resolution": "full_refund" }))),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(resolved["code"], "VALIDATION_FAILED");

    let (status, resolved) = send(
        &app,
        request(
            "POST",
            &resolve_uri,
            admin,
            Some(json!({ "resolution": "full_refund", "refund_amount": 50_000 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["status"], "resolved");
    assert_eq!(resolved["refund_amount"], 50_000);

    let payment_uri = format!("/payments/{}", payment["id"].as_str().unwrap());
    let (_, refunded) = send(&app, request("GET", &payment_uri, admin, None)).await;
    assert_eq!(refunded["status"], "fully_refunded");

    let (_, balance) = send(
        &app,
        request("GET", &format!("/ledger/mentors/{}/balance", mentor.as_uuid()), admin, None),
    )
    .await;
    assert_eq!(balance["available_balance"], 0);
}

#[tokio::test]
async fn admin_refund_reduces_mentor_balance() {
    let app = test_app();
    let mentor = MentorId::new();
    let (_, payment) = paid_session(&app, mentor, 50_000).await;
    let admin = Some((Uuid::new_v4(), "admin"));
    let refund_uri = format!("/payments/{}/refunds", payment["id"].as_str().unwrap());
    let body = json!({ "amount": 50_000, "reference": "support-ticket-42" });

    let (status, _) = send(
        &app,
        request("POST", &refund_uri, Some((*mentor.as_uuid(), "mentor")), Some(body.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, request("POST", &refund_uri, admin, Some(body.clone()))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(&app, request("POST", &refund_uri, admin, Some(body))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, balance) = send(
        &app,
        request("GET", &format!("/ledger/mentors/{}/balance", mentor.as_uuid()), admin, None),
    )
    .await;
    assert_eq!(balance["available_balance"], 0);
    assert_eq!(balance["total_earnings"], 0);

    let (_, entries) = send(
        &app,
        request("GET", &format!("/ledger/mentors/{}/entries", mentor.as_uuid()), admin, None),
    )
    .await;
    let kinds: Vec<&str> = entries["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds.iter().filter(|k| **k == "refund_clawback").count(), 1);
}
