use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use waterline::api::rest::router;
use waterline::auth::roles::StaticAdminDirectory;
use waterline::auth::token::issue_token;
use waterline::config::Config;
use waterline::payments::checkout::{
    CheckoutProvider, CheckoutRequest, CheckoutSession, ProviderError,
};
use waterline::payments::signature::{sign, SIGNATURE_HEADER};
use waterline::state::AppState;

const JWT_SECRET: &str = "integration-secret";
const WEBHOOK_SECRET: &str = "whsec_integration";

struct StubCheckout;

#[async_trait]
impl CheckoutProvider for StubCheckout {
    fn name(&self) -> &str {
        "stripe"
    }

    async fn create_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, ProviderError> {
        Ok(CheckoutSession {
            session_id: format!("cs_{}", request.order_id.simple()),
            url: "https://checkout.test/session".to_string(),
        })
    }
}

struct DecliningCheckout;

#[async_trait]
impl CheckoutProvider for DecliningCheckout {
    fn name(&self) -> &str {
        "stripe"
    }

    async fn create_session(
        &self,
        _request: &CheckoutRequest,
    ) -> Result<CheckoutSession, ProviderError> {
        Err(ProviderError::UnexpectedResponse(
            "create session failed with status 401: invalid api key sk_live_leak".to_string(),
        ))
    }
}

struct TestApp {
    app: Router,
    admin: Uuid,
}

fn setup_with(webhook_secret: Option<&str>, checkout: Arc<dyn CheckoutProvider>) -> TestApp {
    let admin = Uuid::new_v4();
    let mut config = Config::for_secret(JWT_SECRET);
    config.webhook_secret = webhook_secret.map(str::to_string);
    config.admin_user_ids = vec![admin];

    let state = AppState::new(
        config,
        checkout,
        Arc::new(StaticAdminDirectory::new([admin])),
    );

    TestApp {
        app: router(Arc::new(state)),
        admin,
    }
}

fn setup() -> TestApp {
    setup_with(Some(WEBHOOK_SECRET), Arc::new(StubCheckout))
}

fn token_for(user_id: Uuid) -> String {
    issue_token(user_id, JWT_SECRET, 60).unwrap()
}

fn request(method: &str, uri: &str, user: Option<Uuid>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user_id) = user {
        builder = builder.header("authorization", format!("Bearer {}", token_for(user_id)));
    }

    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn webhook_request(header: Option<String>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/payments/webhook")
        .header("content-type", "application/json");
    if let Some(header) = header {
        builder = builder.header(SIGNATURE_HEADER, header);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn signed_header(body: &str, timestamp: i64) -> String {
    format!(
        "t={timestamp},v1={}",
        sign(WEBHOOK_SECRET, timestamp, body.as_bytes())
    )
}

fn completed_event(order_id: &str, session_id: &str) -> String {
    json!({
        "id": "evt_completed",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": session_id,
                "metadata": { "order_id": order_id },
                "amount_total": 23997
            }
        }
    })
    .to_string()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Zone, a 7999-cent pack and an address owned by `customer`.
async fn seed_catalog(t: &TestApp, customer: Uuid) -> (String, String, String) {
    let (status, zone) = send(
        &t.app,
        request("POST", "/admin/zones", Some(t.admin), Some(json!({ "name": "Centro" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, pack) = send(
        &t.app,
        request(
            "POST",
            "/admin/packs",
            Some(t.admin),
            Some(json!({ "name": "Garrafón 20L", "price_cents": 7999 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, address) = send(
        &t.app,
        request(
            "POST",
            "/addresses",
            Some(customer),
            Some(json!({
                "zone_id": zone["id"],
                "label": "home",
                "line": "Av. Juárez 10",
                "location": { "lat": 19.4326, "lng": -99.1332 }
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    (
        zone["id"].as_str().unwrap().to_string(),
        pack["id"].as_str().unwrap().to_string(),
        address["id"].as_str().unwrap().to_string(),
    )
}

async fn place_order(t: &TestApp, customer: Uuid, quantity: u32) -> (StatusCode, Value) {
    let (zone_id, pack_id, address_id) = seed_catalog(t, customer).await;
    send(
        &t.app,
        request(
            "POST",
            "/orders",
            Some(customer),
            Some(json!({
                "address_id": address_id,
                "zone_id": zone_id,
                "pack_id": pack_id,
                "quantity": quantity,
                "payment_method": "card"
            })),
        ),
    )
    .await
}

async fn online_rider(t: &TestApp) -> Uuid {
    let user = Uuid::new_v4();
    let (status, _) = send(
        &t.app,
        request("POST", "/riders", Some(user), Some(json!({ "name": "Rosa" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, rider) = send(
        &t.app,
        request("PATCH", "/riders/me/online", Some(user), Some(json!({ "online": true }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rider["is_online"], true);
    user
}

#[tokio::test]
async fn health_returns_ok() {
    let t = setup();
    let (status, body) = send(&t.app, request("GET", "/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["orders"], 0);
    assert_eq!(body["riders"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let t = setup();
    let response = t
        .app
        .clone()
        .oneshot(request("GET", "/metrics", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("active_orders"));
}

#[tokio::test]
async fn orders_require_a_token() {
    let t = setup();
    let (status, body) = send(&t.app, request("GET", "/orders", None, None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn create_order_computes_total() {
    let t = setup();
    let customer = Uuid::new_v4();
    let (status, order) = place_order(&t, customer, 3).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["total_cents"], 23997);
    assert_eq!(order["status"], "pending");
    assert_eq!(order["payment_status"], "unpaid");
    assert_eq!(order["customer_id"], customer.to_string());
}

#[tokio::test]
async fn zero_quantity_is_rejected() {
    let t = setup();
    let (status, _) = place_order(&t, Uuid::new_v4(), 0).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn second_active_order_is_rejected() {
    let t = setup();
    let customer = Uuid::new_v4();
    let (status, _) = place_order(&t, customer, 1).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = place_order(&t, customer, 1).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("active order"));
}

#[tokio::test]
async fn full_delivery_flow() {
    let t = setup();
    let customer = Uuid::new_v4();
    let (_, order) = place_order(&t, customer, 3).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    let (status, session) = send(
        &t.app,
        request(
            "POST",
            "/payments/checkout",
            Some(customer),
            Some(json!({ "order_id": order_id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let session_id = session["session_id"].as_str().unwrap().to_string();

    let body = completed_event(&order_id, &session_id);
    let header = signed_header(&body, Utc::now().timestamp());
    let (status, ack) = send(&t.app, webhook_request(Some(header.clone()), &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["received"], true);
    assert_eq!(ack["result"], "processed");

    // replay is harmless
    let (status, _) = send(&t.app, webhook_request(Some(header), &body)).await;
    assert_eq!(status, StatusCode::OK);

    let rider = online_rider(&t).await;
    let (status, available) = send(
        &t.app,
        request("GET", "/riders/me/orders/available", Some(rider), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(available.as_array().unwrap().len(), 1);

    let claim_uri = format!("/orders/{order_id}/claim");
    let (status, claimed) = send(&t.app, request("POST", &claim_uri, Some(rider), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(claimed["status"], "assigned");

    let other_rider = online_rider(&t).await;
    let (status, body) = send(&t.app, request("POST", &claim_uri, Some(other_rider), None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "order no longer available");

    let (status, update) = send(
        &t.app,
        request(
            "PUT",
            "/riders/me/location",
            Some(rider),
            Some(json!({ "lat": 19.43, "lng": -99.13 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(update["result"], "sampling_stopped");

    let (status, started) = send(
        &t.app,
        request("POST", &format!("/orders/{order_id}/start"), Some(rider), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["status"], "en_route");
    assert_eq!(started["eta_minutes"], 10);

    let (status, view) = send(
        &t.app,
        request("GET", &format!("/orders/{order_id}/tracking"), Some(customer), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["keep_polling"], true);
    assert!(view["location"].is_null());

    let (status, update) = send(
        &t.app,
        request(
            "PUT",
            "/riders/me/location",
            Some(rider),
            Some(json!({ "lat": 19.43, "lng": -99.13 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(update["result"], "recorded");

    let (_, view) = send(
        &t.app,
        request("GET", &format!("/orders/{order_id}/tracking"), Some(customer), None),
    )
    .await;
    assert_eq!(view["location"]["position"]["lat"], 19.43);

    let (status, delivered) = send(
        &t.app,
        request("POST", &format!("/orders/{order_id}/deliver"), Some(rider), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(delivered["status"], "delivered");
    assert!(delivered["delivered_at"].as_str().is_some());

    let (status, _) = send(
        &t.app,
        request("POST", &format!("/orders/{order_id}/cancel"), Some(customer), None),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, me) = send(&t.app, request("GET", "/riders/me", Some(rider), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(me["active_order_id"].is_null());
}

#[tokio::test]
async fn webhook_rejects_stale_timestamp() {
    let t = setup();
    let body = completed_event(&Uuid::new_v4().to_string(), "cs_stale");
    let header = signed_header(&body, Utc::now().timestamp() - 301);

    let (status, body) = send(&t.app, webhook_request(Some(header), &body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid webhook signature");
}

#[tokio::test]
async fn webhook_rejects_altered_body() {
    let t = setup();
    let body = completed_event(&Uuid::new_v4().to_string(), "cs_altered");
    let header = signed_header(&body, Utc::now().timestamp());
    let tampered = body.replace("23997", "1");

    let (status, _) = send(&t.app, webhook_request(Some(header), &tampered)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn webhook_requires_signature_header() {
    let t = setup();
    let body = completed_event(&Uuid::new_v4().to_string(), "cs_missing");

    let (status, _) = send(&t.app, webhook_request(None, &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_without_secret_is_refused() {
    let t = setup_with(None, Arc::new(StubCheckout));
    let body = completed_event(&Uuid::new_v4().to_string(), "cs_nosecret");
    let header = signed_header(&body, Utc::now().timestamp());

    let (status, _) = send(&t.app, webhook_request(Some(header), &body)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn webhook_for_unknown_order_is_acknowledged() {
    let t = setup();
    let body = completed_event(&Uuid::new_v4().to_string(), "cs_unknown");
    let header = signed_header(&body, Utc::now().timestamp());

    let (status, ack) = send(&t.app, webhook_request(Some(header), &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["result"], "ignored");
}

#[tokio::test]
async fn checkout_guards() {
    let t = setup();
    let customer = Uuid::new_v4();
    let (_, order) = place_order(&t, customer, 1).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &t.app,
        request(
            "POST",
            "/payments/checkout",
            Some(Uuid::new_v4()),
            Some(json!({ "order_id": order_id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &t.app,
        request(
            "POST",
            "/payments/checkout",
            Some(customer),
            Some(json!({ "order_id": Uuid::new_v4() })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &t.app,
        request("POST", &format!("/admin/orders/{order_id}/mark-paid"), Some(t.admin), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &t.app,
        request(
            "POST",
            "/payments/checkout",
            Some(customer),
            Some(json!({ "order_id": order_id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn checkout_below_minimum_charge_is_rejected() {
    let t = setup();
    let customer = Uuid::new_v4();
    let (status, zone) = send(
        &t.app,
        request("POST", "/admin/zones", Some(t.admin), Some(json!({ "name": "Norte" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, pack) = send(
        &t.app,
        request(
            "POST",
            "/admin/packs",
            Some(t.admin),
            Some(json!({ "name": "Sample", "price_cents": 50 })),
        ),
    )
    .await;
    let (_, address) = send(
        &t.app,
        request(
            "POST",
            "/addresses",
            Some(customer),
            Some(json!({
                "zone_id": zone["id"],
                "line": "Calle 5",
                "location": { "lat": 19.5, "lng": -99.1 }
            })),
        ),
    )
    .await;
    let (status, order) = send(
        &t.app,
        request(
            "POST",
            "/orders",
            Some(customer),
            Some(json!({
                "address_id": address["id"],
                "zone_id": zone["id"],
                "pack_id": pack["id"],
                "quantity": 1,
                "payment_method": "card"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &t.app,
        request(
            "POST",
            "/payments/checkout",
            Some(customer),
            Some(json!({ "order_id": order["id"] })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn claim_requires_rider_profile() {
    let t = setup();
    let customer = Uuid::new_v4();
    let (_, order) = place_order(&t, customer, 1).await;

    let (status, _) = send(
        &t.app,
        request(
            "POST",
            &format!("/orders/{}/claim", order["id"].as_str().unwrap()),
            Some(Uuid::new_v4()),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_routes_reject_non_admins() {
    let t = setup();
    let (status, _) = send(
        &t.app,
        request("GET", "/admin/orders", Some(Uuid::new_v4()), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn csv_export_has_expected_columns() {
    let t = setup();
    let response = t
        .app
        .clone()
        .oneshot(request("GET", "/admin/orders/export.csv", Some(t.admin), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert_eq!(
        body.lines().next(),
        Some("order_id,rider_id,user_id,total_cents,delivered_at")
    );
}

#[tokio::test]
async fn me_reports_role() {
    let t = setup();
    let (status, body) = send(&t.app, request("GET", "/me", Some(t.admin), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "admin");

    let rider = online_rider(&t).await;
    let (_, body) = send(&t.app, request("GET", "/me", Some(rider), None)).await;
    assert_eq!(body["role"], "rider");
    assert!(body["rider_id"].as_str().is_some());

    let (_, body) = send(&t.app, request("GET", "/me", Some(Uuid::new_v4()), None)).await;
    assert_eq!(body["role"], "client");
}

#[tokio::test]
async fn location_update_requires_rider_profile() {
    let t = setup();
    let (status, _) = send(
        &t.app,
        request(
            "PUT",
            "/riders/me/location",
            Some(Uuid::new_v4()),
            Some(json!({ "lat": 19.43, "lng": -99.13 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn checkout_requires_a_token() {
    let t = setup();
    let (status, _) = send(
        &t.app,
        request(
            "POST",
            "/payments/checkout",
            None,
            Some(json!({ "order_id": Uuid::new_v4() })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn checkout_for_cancelled_order_conflicts() {
    let t = setup();
    let customer = Uuid::new_v4();
    let (_, order) = place_order(&t, customer, 1).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &t.app,
        request("POST", &format!("/orders/{order_id}/cancel"), Some(customer), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/payments/checkout",
            Some(customer),
            Some(json!({ "order_id": order_id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("cancelled"));
}

#[tokio::test]
async fn provider_failure_is_a_bad_gateway_with_generic_message() {
    let t = setup_with(Some(WEBHOOK_SECRET), Arc::new(DecliningCheckout));
    let customer = Uuid::new_v4();
    let (_, order) = place_order(&t, customer, 1).await;

    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/payments/checkout",
            Some(customer),
            Some(json!({ "order_id": order["id"] })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "payment provider unavailable, please retry");
    assert!(!body.to_string().contains("sk_live_leak"));
}
