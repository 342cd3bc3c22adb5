use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::router::appointment_routes;
use shared_utils::test_utils::{JwtTestUtils, MockRows, TestConfig, TestUser};

struct TestContext {
    app: Router,
    token: String,
    patient_id: Uuid,
    mock_server: MockServer,
}

async fn setup() -> TestContext {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri());

    let patient_id = Uuid::new_v4();
    let patient = TestUser::with_id(patient_id);
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, None);

    let app = appointment_routes(config.to_state());

    TestContext {
        app,
        token,
        patient_id,
        mock_server,
    }
}

/// First Monday at least a week out; keeps booking dates in the future and
/// on a known weekday (day_of_week = 1).
fn next_monday() -> NaiveDate {
    let mut date = Utc::now().date_naive() + Duration::days(7);
    while date.weekday() != Weekday::Mon {
        date += Duration::days(1);
    }
    date
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("request failed");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body read failed");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body was not json")
    };
    (status, body)
}

fn request_with_json(method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request build failed")
}

fn request_empty(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .expect("request build failed")
}

async fn mount_schedule_block(ctx: &TestContext, doctor_id: Uuid, day: i32, start: &str, end: &str) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/schedules"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::schedule(Uuid::new_v4(), doctor_id, day, start, end, true)
        ])))
        .mount(&ctx.mock_server)
        .await;
}

async fn mount_doctor(ctx: &TestContext, doctor_id: Uuid) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::doctor(doctor_id, "Ana", "Torres", "Cardiology")
        ])))
        .mount(&ctx.mock_server)
        .await;
}

/// The conflict pre-check queries appointments with select=id.
async fn mount_conflict_check(ctx: &TestContext, doctor_id: Uuid, occupants: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("select", "id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(occupants))
        .mount(&ctx.mock_server)
        .await;
}

// ==============================================================================
// AVAILABLE SLOTS
// ==============================================================================

#[tokio::test]
async fn available_slots_for_open_morning() {
    let ctx = setup().await;
    let doctor_id = Uuid::new_v4();
    let monday = next_monday();

    mount_schedule_block(&ctx, doctor_id, 1, "09:00", "10:00").await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("select", "id,time,reason"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&ctx.mock_server)
        .await;

    let (status, body) = send(
        &ctx.app,
        request_empty(
            "GET",
            &format!(
                "/available-slots?doctor_id={}&date={}&slot_minutes=30",
                doctor_id, monday
            ),
            &ctx.token,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    let slots = data["slots"].as_array().expect("slots array");
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0]["time"], "09:00");
    assert_eq!(slots[1]["time"], "09:30");
    assert!(slots.iter().all(|s| s["state"] == "available"));
    assert_eq!(data["summary"]["total"], 2);
    assert_eq!(data["summary"]["available"], 2);
    assert_eq!(data["summary"]["occupied"], 0);
}

#[tokio::test]
async fn available_slots_mark_booked_times_occupied() {
    let ctx = setup().await;
    let doctor_id = Uuid::new_v4();
    let monday = next_monday();
    let booked_id = Uuid::new_v4();

    mount_schedule_block(&ctx, doctor_id, 1, "09:00", "10:00").await;

    // Database time columns carry seconds; the grid compares on HH:mm.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("select", "id,time,reason"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::appointment(
                booked_id,
                Uuid::new_v4(),
                doctor_id,
                &monday.to_string(),
                "09:30:00",
                "scheduled",
                "Routine checkup"
            )
        ])))
        .mount(&ctx.mock_server)
        .await;

    let (status, body) = send(
        &ctx.app,
        request_empty(
            "GET",
            &format!(
                "/available-slots?doctor_id={}&date={}&slot_minutes=30",
                doctor_id, monday
            ),
            &ctx.token,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    let slots = data["slots"].as_array().expect("slots array");
    assert_eq!(slots[0]["state"], "available");
    assert_eq!(slots[1]["state"], "occupied");
    assert_eq!(slots[1]["appointment_id"], json!(booked_id));
    assert_eq!(slots[1]["reason"], "Routine checkup");
    assert_eq!(data["summary"]["available"], 1);
    assert_eq!(data["summary"]["occupied"], 1);
}

#[tokio::test]
async fn available_slots_empty_when_no_block_matches_weekday() {
    let ctx = setup().await;
    let doctor_id = Uuid::new_v4();
    let monday = next_monday();

    // Doctor only works Fridays; a Monday query has nothing to offer.
    Mock::given(method("GET"))
        .and(path("/rest/v1/schedules"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::schedule(Uuid::new_v4(), doctor_id, 5, "09:00", "17:00", true)
        ])))
        .mount(&ctx.mock_server)
        .await;

    let (status, body) = send(
        &ctx.app,
        request_empty(
            "GET",
            &format!("/available-slots?doctor_id={}&date={}", doctor_id, monday),
            &ctx.token,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["slots"], json!([]));
    assert_eq!(data["summary"]["total"], 0);
    assert_eq!(data["summary"]["available"], 0);
    assert_eq!(data["summary"]["occupied"], 0);
}

#[tokio::test]
async fn available_slots_reject_zero_duration() {
    let ctx = setup().await;

    let (status, _) = send(
        &ctx.app,
        request_empty(
            "GET",
            &format!(
                "/available-slots?doctor_id={}&date={}&slot_minutes=0",
                Uuid::new_v4(),
                next_monday()
            ),
            &ctx.token,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ==============================================================================
// CREATE
// ==============================================================================

#[tokio::test]
async fn create_appointment_books_free_slot() {
    let ctx = setup().await;
    let doctor_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();
    let monday = next_monday();

    mount_schedule_block(&ctx, doctor_id, 1, "09:00", "12:00").await;
    mount_conflict_check(&ctx, doctor_id, json!([])).await;
    mount_doctor(&ctx, doctor_id).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({
            "patient_id": ctx.patient_id,
            "doctor_id": doctor_id,
            "time": "09:30",
            "status": "scheduled"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockRows::appointment(
                appointment_id,
                ctx.patient_id,
                doctor_id,
                &monday.to_string(),
                "09:30",
                "scheduled",
                "Annual physical"
            )
        ])))
        .expect(1)
        .mount(&ctx.mock_server)
        .await;

    let (status, body) = send(
        &ctx.app,
        request_with_json(
            "POST",
            "/create",
            &ctx.token,
            json!({
                "doctor_id": doctor_id,
                "date": monday,
                "time": "09:30",
                "reason": "Annual physical"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], json!(true));
    let data = &body["data"];
    assert_eq!(data["id"], json!(appointment_id));
    assert_eq!(data["status"], "scheduled");
    assert_eq!(data["doctor_name"], "Ana Torres");
    assert_eq!(data["specialty"], "Cardiology");
    assert_eq!(data["day_name"], "Monday");
    assert_eq!(data["status_label"], "Scheduled");
}

#[tokio::test]
async fn create_appointment_rejects_past_date_without_insert() {
    let ctx = setup().await;
    let yesterday = Utc::now().date_naive() - Duration::days(1);

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&ctx.mock_server)
        .await;

    let (status, body) = send(
        &ctx.app,
        request_with_json(
            "POST",
            "/create",
            &ctx.token,
            json!({
                "doctor_id": Uuid::new_v4(),
                "date": yesterday,
                "time": "09:30",
                "reason": "Annual physical"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap_or_default();
    assert!(message.contains("past"), "message was: {}", message);
}

#[tokio::test]
async fn create_appointment_rejects_malformed_time() {
    let ctx = setup().await;

    let (status, body) = send(
        &ctx.app,
        request_with_json(
            "POST",
            "/create",
            &ctx.token,
            json!({
                "doctor_id": Uuid::new_v4(),
                "date": next_monday(),
                "time": "9:30",
                "reason": "Annual physical"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap_or_default();
    assert!(message.contains("HH:mm"), "message was: {}", message);
}

#[tokio::test]
async fn create_appointment_rejects_time_outside_schedule() {
    let ctx = setup().await;
    let doctor_id = Uuid::new_v4();

    // Doctor works Monday mornings only; 18:00 is out of range.
    mount_schedule_block(&ctx, doctor_id, 1, "09:00", "12:00").await;

    let (status, body) = send(
        &ctx.app,
        request_with_json(
            "POST",
            "/create",
            &ctx.token,
            json!({
                "doctor_id": doctor_id,
                "date": next_monday(),
                "time": "18:00",
                "reason": "Annual physical"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap_or_default();
    assert!(message.contains("availability"), "message was: {}", message);
}

#[tokio::test]
async fn create_appointment_rejects_occupied_slot() {
    let ctx = setup().await;
    let doctor_id = Uuid::new_v4();

    mount_schedule_block(&ctx, doctor_id, 1, "09:00", "12:00").await;
    mount_conflict_check(&ctx, doctor_id, json!([{ "id": Uuid::new_v4() }])).await;

    let (status, body) = send(
        &ctx.app,
        request_with_json(
            "POST",
            "/create",
            &ctx.token,
            json!({
                "doctor_id": doctor_id,
                "date": next_monday(),
                "time": "09:30",
                "reason": "Annual physical"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    let message = body["message"].as_str().unwrap_or_default();
    assert!(message.contains("already booked"), "message was: {}", message);
}

/// Two racing requests both pass the pre-check; the storage unique index
/// accepts exactly one insert and answers the other with 409.
#[tokio::test]
async fn concurrent_creates_book_exactly_one() {
    let ctx = setup().await;
    let doctor_id = Uuid::new_v4();
    let monday = next_monday();

    mount_schedule_block(&ctx, doctor_id, 1, "09:00", "12:00").await;
    mount_conflict_check(&ctx, doctor_id, json!([])).await;
    mount_doctor(&ctx, doctor_id).await;

    // First insert wins...
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockRows::appointment(
                Uuid::new_v4(),
                ctx.patient_id,
                doctor_id,
                &monday.to_string(),
                "09:30",
                "scheduled",
                "Annual physical"
            )
        ])))
        .up_to_n_times(1)
        .mount(&ctx.mock_server)
        .await;

    // ...every later one violates the unique index.
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint"
        })))
        .mount(&ctx.mock_server)
        .await;

    let payload = json!({
        "doctor_id": doctor_id,
        "date": monday,
        "time": "09:30",
        "reason": "Annual physical"
    });

    let first = send(
        &ctx.app,
        request_with_json("POST", "/create", &ctx.token, payload.clone()),
    );
    let second = send(
        &ctx.app,
        request_with_json("POST", "/create", &ctx.token, payload),
    );

    let ((status_a, _), (status_b, _)) = futures::join!(first, second);

    let mut statuses = [status_a, status_b];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::CONFLICT]);
}

// ==============================================================================
// CONFIRM / CANCEL
// ==============================================================================

fn scoped_appointment_mock(
    ctx: &TestContext,
    appointment_id: Uuid,
    doctor_id: Uuid,
    status: &str,
) -> Mock {
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .and(query_param("patient_id", format!("eq.{}", ctx.patient_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::appointment(
                appointment_id,
                ctx.patient_id,
                doctor_id,
                "2025-06-02",
                "09:30",
                status,
                "Annual physical"
            )
        ])))
}

#[tokio::test]
async fn confirm_succeeds_once_then_rejects_repeat() {
    let ctx = setup().await;
    let doctor_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    // The row reads as scheduled for the first call, confirmed afterwards.
    scoped_appointment_mock(&ctx, appointment_id, doctor_id, "scheduled")
        .up_to_n_times(1)
        .mount(&ctx.mock_server)
        .await;
    scoped_appointment_mock(&ctx, appointment_id, doctor_id, "confirmed")
        .mount(&ctx.mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .and(body_partial_json(json!({ "status": "confirmed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::appointment(
                appointment_id,
                ctx.patient_id,
                doctor_id,
                "2025-06-02",
                "09:30",
                "confirmed",
                "Annual physical"
            )
        ])))
        .expect(1)
        .mount(&ctx.mock_server)
        .await;

    mount_doctor(&ctx, doctor_id).await;

    let (first_status, first_body) = send(
        &ctx.app,
        request_empty("PUT", &format!("/confirm/{}", appointment_id), &ctx.token),
    )
    .await;
    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(first_body["data"]["status"], "confirmed");

    let (second_status, second_body) = send(
        &ctx.app,
        request_empty("PUT", &format!("/confirm/{}", appointment_id), &ctx.token),
    )
    .await;
    assert_eq!(second_status, StatusCode::BAD_REQUEST);
    let message = second_body["message"].as_str().unwrap_or_default();
    assert!(message.contains("requires scheduled"), "message was: {}", message);
}

#[tokio::test]
async fn cancel_scheduled_appointment() {
    let ctx = setup().await;
    let doctor_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    scoped_appointment_mock(&ctx, appointment_id, doctor_id, "scheduled")
        .mount(&ctx.mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .and(body_partial_json(json!({ "status": "cancelled" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::appointment(
                appointment_id,
                ctx.patient_id,
                doctor_id,
                "2025-06-02",
                "09:30",
                "cancelled",
                "Annual physical"
            )
        ])))
        .expect(1)
        .mount(&ctx.mock_server)
        .await;

    let (status, body) = send(
        &ctx.app,
        request_empty("DELETE", &format!("/cancel/{}", appointment_id), &ctx.token),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
}

#[tokio::test]
async fn cancel_completed_appointment_is_rejected() {
    let ctx = setup().await;
    let appointment_id = Uuid::new_v4();

    scoped_appointment_mock(&ctx, appointment_id, Uuid::new_v4(), "completed")
        .mount(&ctx.mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&ctx.mock_server)
        .await;

    let (status, body) = send(
        &ctx.app,
        request_empty("DELETE", &format!("/cancel/{}", appointment_id), &ctx.token),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap_or_default();
    assert!(message.contains("completed"), "message was: {}", message);
}

// ==============================================================================
// UPDATE
// ==============================================================================

#[tokio::test]
async fn update_time_revalidates_and_patches() {
    let ctx = setup().await;
    let doctor_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();
    let monday = next_monday();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .and(query_param("patient_id", format!("eq.{}", ctx.patient_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::appointment(
                appointment_id,
                ctx.patient_id,
                doctor_id,
                &monday.to_string(),
                "09:00",
                "scheduled",
                "Annual physical"
            )
        ])))
        .mount(&ctx.mock_server)
        .await;

    mount_schedule_block(&ctx, doctor_id, 1, "09:00", "12:00").await;
    mount_doctor(&ctx, doctor_id).await;

    // Conflict re-check excludes the appointment's own row.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("select", "id"))
        .and(query_param("id", format!("neq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&ctx.mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .and(body_partial_json(json!({ "time": "10:00" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::appointment(
                appointment_id,
                ctx.patient_id,
                doctor_id,
                &monday.to_string(),
                "10:00",
                "scheduled",
                "Annual physical"
            )
        ])))
        .expect(1)
        .mount(&ctx.mock_server)
        .await;

    let (status, body) = send(
        &ctx.app,
        request_with_json(
            "PUT",
            &format!("/update/{}", appointment_id),
            &ctx.token,
            json!({ "time": "10:00" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["time"], "10:00");
}

#[tokio::test]
async fn update_rejected_once_confirmed() {
    let ctx = setup().await;
    let appointment_id = Uuid::new_v4();

    scoped_appointment_mock(&ctx, appointment_id, Uuid::new_v4(), "confirmed")
        .mount(&ctx.mock_server)
        .await;

    let (status, body) = send(
        &ctx.app,
        request_with_json(
            "PUT",
            &format!("/update/{}", appointment_id),
            &ctx.token,
            json!({ "reason": "Different reason" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap_or_default();
    assert!(message.contains("scheduled"), "message was: {}", message);
}

#[tokio::test]
async fn update_foreign_appointment_reads_as_not_found() {
    let ctx = setup().await;
    let appointment_id = Uuid::new_v4();

    // Ownership scoping: a row belonging to another patient never comes back.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .and(query_param("patient_id", format!("eq.{}", ctx.patient_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&ctx.mock_server)
        .await;

    let (status, _) = send(
        &ctx.app,
        request_with_json(
            "PUT",
            &format!("/update/{}", appointment_id),
            &ctx.token,
            json!({ "reason": "Different reason" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ==============================================================================
// READS
// ==============================================================================

#[tokio::test]
async fn list_appointments_pages_newest_first() {
    let ctx = setup().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("patient_id", format!("eq.{}", ctx.patient_id)))
        .and(query_param("status", "eq.scheduled"))
        .and(query_param("order", "date.desc,time.desc"))
        .and(query_param("limit", "10"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::appointment(
                Uuid::new_v4(),
                ctx.patient_id,
                doctor_id,
                "2025-06-09",
                "10:00",
                "scheduled",
                "Follow-up"
            ),
            MockRows::appointment(
                Uuid::new_v4(),
                ctx.patient_id,
                doctor_id,
                "2025-06-02",
                "09:30",
                "scheduled",
                "Annual physical"
            )
        ])))
        .expect(1)
        .mount(&ctx.mock_server)
        .await;

    // Both rows share a doctor; enrichment fetches it exactly once.
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::doctor(doctor_id, "Ana", "Torres", "Cardiology")
        ])))
        .expect(1)
        .mount(&ctx.mock_server)
        .await;

    let (status, body) = send(
        &ctx.app,
        request_empty("GET", "/user-appointments?status=scheduled", &ctx.token),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().expect("data array");
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["date"], "2025-06-09");
    assert_eq!(data[0]["day_name"], "Monday");
    assert_eq!(data[0]["status_label"], "Scheduled");
    assert_eq!(body["pagination"]["total"], 2);
}

#[tokio::test]
async fn list_appointments_clamps_oversized_page() {
    let ctx = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("patient_id", format!("eq.{}", ctx.patient_id)))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&ctx.mock_server)
        .await;

    let (status, _) = send(
        &ctx.app,
        request_empty("GET", "/user-appointments?limit=500", &ctx.token),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn get_appointment_returns_enriched_view() {
    let ctx = setup().await;
    let doctor_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    scoped_appointment_mock(&ctx, appointment_id, doctor_id, "confirmed")
        .mount(&ctx.mock_server)
        .await;
    mount_doctor(&ctx, doctor_id).await;

    let (status, body) = send(
        &ctx.app,
        request_empty("GET", &format!("/{}", appointment_id), &ctx.token),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["doctor_name"], "Ana Torres");
    assert_eq!(data["specialty"], "Cardiology");
    assert_eq!(data["status_label"], "Confirmed");
}

#[tokio::test]
async fn appointment_routes_require_authentication() {
    let ctx = setup().await;

    let request = Request::builder()
        .method("GET")
        .uri("/user-appointments")
        .body(Body::empty())
        .expect("request build failed");

    let (status, _) = send(&ctx.app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
