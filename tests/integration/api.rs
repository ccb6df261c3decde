//! API integration tests against a running server

use reqwest::Client;
use serde_json::{json, Value};

use rtt_booking::models::user::{Role, UserClaims};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Token signed with the server secret (JWT_SECRET or the default config)
fn token(user_id: i32, role: Role) -> String {
    let secret = std::env::var("JWT_SECRET")
        .unwrap_or_else(|_| "change-this-secret-in-production".to_string());
    UserClaims::new(user_id, "tester", role, 1)
        .create_token(&secret)
        .expect("Failed to sign token")
}

fn booking_body() -> Value {
    json!({
        "tour_name": "Machu Picchu Full Day",
        "tour_date": "2031-03-15",
        "price": "USD 150",
        "representative_name": "María Quispe",
        "email": "maria@example.com",
        "phone": "+51 984 000 111",
        "country": "Perú",
        "passenger_count": 1,
        "passengers": [{
            "document_type": "dni",
            "document_number": "45678912",
            "full_name": "María Quispe",
            "gender": "F",
            "nationality": "Peruana"
        }]
    })
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_public_booking() {
    let client = Client::new();

    let response = client
        .post(format!("{}/bookings", BASE_URL))
        .json(&booking_body())
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse response");
    let code = body["code"].as_str().expect("No code in response");
    assert!(code.starts_with("RTT-"));
    assert_eq!(body["reservation"]["status"], "pendiente");
    assert_eq!(body["reservation"]["passengers"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
#[ignore]
async fn test_booking_validation_error() {
    let client = Client::new();
    let mut body = booking_body();
    body["email"] = json!("not-an-email");

    let response = client
        .post(format!("{}/bookings", BASE_URL))
        .json(&body)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_tracking_event() {
    let client = Client::new();

    let response = client
        .post(format!("{}/tracking/events", BASE_URL))
        .header("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
        .json(&json!({
            "session_id": "it-session-1",
            "event_type": "form_open",
            "step_number": 1,
            "page_url": "https://rtt.example/tours/machu-picchu"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["id"].is_number());
}

#[tokio::test]
#[ignore]
async fn test_admin_routes_require_token() {
    let client = Client::new();

    let response = client
        .get(format!("{}/reservations", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 401);

    let response = client
        .get(format!("{}/reservations", BASE_URL))
        .bearer_auth(token(2, Role::Seller))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_list_reservations() {
    let client = Client::new();

    let response = client
        .get(format!("{}/reservations?per_page=5", BASE_URL))
        .bearer_auth(token(1, Role::Admin))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["items"].is_array());
    assert_eq!(body["per_page"], 5);
}

#[tokio::test]
#[ignore]
async fn test_seller_quotation() {
    let client = Client::new();
    let seller = token(42, Role::Seller);

    let response = client
        .post(format!("{}/quotations", BASE_URL))
        .bearer_auth(&seller)
        .json(&json!({
            "client_name": "Hiro Tanaka",
            "client_email": "hiro@example.jp",
            "tour_name": "Inca Trail 4D",
            "passenger_count": 2,
            "unit_price": "150.00"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["seller_id"], 42);
    assert_eq!(body["status"], "borrador");

    let id = body["id"].as_i64().expect("No id in response");
    let response = client
        .get(format!("{}/quotations/{}", BASE_URL, id))
        .bearer_auth(token(43, Role::Seller))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);
}
