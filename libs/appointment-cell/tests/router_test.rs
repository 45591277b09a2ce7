use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use appointment_cell::router::appointment_routes;
use scheduling_cell::services::SchedulingStore;
use shared_database::Database;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

struct TestApp {
    _dir: TempDir,
    config: TestConfig,
    app: Router,
    doctor_id: Uuid,
}

fn test_app() -> TestApp {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("clinic.db");
    let database = Database::at(&path);
    database.migrate().expect("migrate");

    let mut store = SchedulingStore::open(&database).expect("open store");
    let clinic_id = store.create_clinic("Central Clinic").unwrap();
    let doctor_id = store.create_doctor("Dr. Sara", clinic_id).unwrap();

    let config = TestConfig::with_database(path.to_string_lossy().to_string());
    let app = appointment_routes(config.to_arc());
    TestApp {
        _dir: dir,
        config,
        app,
        doctor_id,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn request(method: &str, uri: &str, bearer: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(bearer) = bearer {
        builder = builder.header("Authorization", bearer);
    }
    match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn booking(doctor_id: Uuid, time: &str) -> Value {
    json!({
        "full_name": "Ali Ahmed",
        "phone": "0500000001",
        "doctor_id": doctor_id,
        "date": "2025-03-10",
        "time": time,
        "duration_minutes": 30
    })
}

async fn book(t: &TestApp, time: &str) -> (StatusCode, Value) {
    send(&t.app, request("POST", "/", None, Some(booking(t.doctor_id, time)))).await
}

#[tokio::test]
async fn test_public_booking_and_conflict() {
    let t = test_app();

    let (status, body) = book(&t, "10:00").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["appointment"]["status"], "booked");
    assert_eq!(body["appointment"]["doctor_name"], "Dr. Sara");
    assert_eq!(body["appointment"]["clinic_name"], "Central Clinic");
    assert_eq!(body["appointment"]["start"], "2025-03-10T10:00:00");
    assert_eq!(body["appointment"]["end"], "2025-03-10T10:30:00");

    let (status, body) = book(&t, "10:15").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already taken"));

    // Touching slots are fine
    let (status, _) = book(&t, "10:30").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_invalid_booking_is_bad_request() {
    let t = test_app();

    let mut missing_phone = booking(t.doctor_id, "10:00");
    missing_phone["phone"] = json!("");
    let (status, body) = send(&t.app, request("POST", "/", None, Some(missing_phone))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("phone"));

    let (status, _) = book(&t, "noon").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut zero = booking(t.doctor_id, "10:00");
    zero["duration_minutes"] = json!(0);
    let (status, _) = send(&t.app, request("POST", "/", None, Some(zero))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &t.app,
        request("POST", "/", None, Some(booking(Uuid::new_v4(), "10:00"))),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_conflict_check_endpoint() {
    let t = test_app();
    book(&t, "10:00").await;

    let uri = |start: &str, end: &str| {
        format!(
            "/conflicts/check?doctor_id={}&start=2025-03-10T{}&end=2025-03-10T{}",
            t.doctor_id, start, end
        )
    };

    let (status, body) = send(&t.app, request("GET", &uri("10:15:00", "10:45:00"), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["has_conflict"], true);
    assert_eq!(body["conflicting_appointments"].as_array().unwrap().len(), 1);

    let (_, body) = send(&t.app, request("GET", &uri("10:30:00", "11:00:00"), None, None)).await;
    assert_eq!(body["has_conflict"], false);

    let (status, _) = send(&t.app, request("GET", &uri("11:00:00", "10:00:00"), None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) =
        send(&t.app, request("GET", &uri("09:30:00", "10:00:00.500"), None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("whole seconds"));
}

#[tokio::test]
async fn test_admin_lifecycle() {
    let t = test_app();
    let bearer = JwtTestUtils::admin_bearer(&t.config);

    let (_, body) = book(&t, "10:00").await;
    let id = body["appointment"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&t.app, request("GET", "/", Some(&bearer), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let (status, body) = send(
        &t.app,
        request("GET", "/?patient_name_contains=ali&status=booked", Some(&bearer), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let (status, body) = send(
        &t.app,
        request("POST", &format!("/{}/cancel", id), Some(&bearer), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointment"]["status"], "canceled");

    // Slot is free again
    let (status, body) = book(&t, "10:00").await;
    assert_eq!(status, StatusCode::CREATED);
    let rebooked = body["appointment"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &t.app,
        request("POST", &format!("/{}/complete", rebooked), Some(&bearer), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointment"]["status"], "completed");

    let (status, _) = send(
        &t.app,
        request("POST", &format!("/{}/cancel", rebooked), Some(&bearer), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&t.app, request("GET", "/consistency/check", Some(&bearer), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["healthy"], true);

    let (status, _) = send(&t.app, request("DELETE", &format!("/{}", id), Some(&bearer), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&t.app, request("GET", &format!("/{}", id), Some(&bearer), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dashboard_requires_admin() {
    let t = test_app();

    let (status, _) = send(&t.app, request("GET", "/", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let staff = format!(
        "Bearer {}",
        JwtTestUtils::create_test_token(&TestUser::staff(), &t.config.jwt_secret, None)
    );
    let (status, _) = send(&t.app, request("GET", "/", Some(&staff), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let expired = format!(
        "Bearer {}",
        JwtTestUtils::create_expired_token(&TestUser::admin(), &t.config.jwt_secret)
    );
    let (status, _) = send(&t.app, request("GET", "/", Some(&expired), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
