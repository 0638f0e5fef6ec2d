use axum::http::StatusCode;
use chrono::{DateTime, Utc, Weekday};
use serde_json::json;
use tower::ServiceExt;

use appointment_cell::router::appointment_routes;
use shared_utils::test_utils::{
    count_rows, json_request, next_weekday_at, response_json, seed_doctor, seed_patient,
    seed_schedule, test_state, time,
};

const PATIENT: &str = "1234567890123";

#[tokio::test]
async fn test_book_and_fetch_appointment() {
    let state = test_state().await;
    let doctor_id = seed_doctor(&state.db, "Dr. Grey", "Surgery").await;
    seed_schedule(&state.db, doctor_id, 0, time(9, 0), time(10, 0)).await;
    seed_patient(&state.db, PATIENT, true).await;
    let at = next_weekday_at(Weekday::Mon, 9, 15);

    let app = appointment_routes(state.clone());
    let response = app
        .oneshot(json_request(
            "POST",
            "/appointments",
            Some(json!({
                "doctor_id": doctor_id,
                "patient_id": PATIENT,
                "appointment_datetime": at.to_rfc3339(),
                "notes": "first visit"
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let created = response_json(response).await;
    assert_eq!(created["status"], "scheduled");
    assert_eq!(created["notes"], "first visit");
    let appointment_id = created["id"].as_i64().unwrap();

    let app = appointment_routes(state.clone());
    let response = app
        .oneshot(json_request("GET", &format!("/appointments/{}", appointment_id), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let fetched = response_json(response).await;
    let fetched_at: DateTime<Utc> = fetched["appointment_datetime"].as_str().unwrap().parse().unwrap();
    assert_eq!(fetched_at, at);
}

#[tokio::test]
async fn test_offset_timestamps_are_normalised_to_utc() {
    let state = test_state().await;
    let doctor_id = seed_doctor(&state.db, "Dr. Grey", "Surgery").await;
    seed_schedule(&state.db, doctor_id, 0, time(9, 0), time(10, 0)).await;
    seed_patient(&state.db, PATIENT, true).await;
    let at = next_weekday_at(Weekday::Mon, 9, 0);
    // Same instant expressed at +02:00.
    let local = format!("{}T11:00:00+02:00", at.date_naive());

    let app = appointment_routes(state.clone());
    let response = app
        .oneshot(json_request(
            "POST",
            "/appointments",
            Some(json!({
                "doctor_id": doctor_id,
                "patient_id": PATIENT,
                "appointment_datetime": local
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let created = response_json(response).await;
    let stored: DateTime<Utc> = created["appointment_datetime"].as_str().unwrap().parse().unwrap();
    assert_eq!(stored, at);
}

#[tokio::test]
async fn test_booking_outside_schedule_is_conflict() {
    let state = test_state().await;
    let doctor_id = seed_doctor(&state.db, "Dr. Grey", "Surgery").await;
    seed_schedule(&state.db, doctor_id, 0, time(9, 0), time(10, 0)).await;
    seed_patient(&state.db, PATIENT, true).await;

    let app = appointment_routes(state.clone());
    let response = app
        .oneshot(json_request(
            "POST",
            "/appointments",
            Some(json!({
                "doctor_id": doctor_id,
                "patient_id": PATIENT,
                "appointment_datetime": next_weekday_at(Weekday::Mon, 10, 0).to_rfc3339()
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = response_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("availability"));
    assert_eq!(count_rows(&state.db, "appointments").await, 0);
}

#[tokio::test]
async fn test_booking_unknown_doctor_is_not_found() {
    let state = test_state().await;
    seed_patient(&state.db, PATIENT, true).await;

    let app = appointment_routes(state.clone());
    let response = app
        .oneshot(json_request(
            "POST",
            "/appointments",
            Some(json!({
                "doctor_id": 999,
                "patient_id": PATIENT,
                "appointment_datetime": next_weekday_at(Weekday::Mon, 9, 0).to_rfc3339()
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancel_then_delete_appointment() {
    let state = test_state().await;
    let doctor_id = seed_doctor(&state.db, "Dr. Grey", "Surgery").await;
    seed_schedule(&state.db, doctor_id, 0, time(9, 0), time(10, 0)).await;
    seed_patient(&state.db, PATIENT, true).await;

    let app = appointment_routes(state.clone());
    let created = response_json(
        app.oneshot(json_request(
            "POST",
            "/appointments",
            Some(json!({
                "doctor_id": doctor_id,
                "patient_id": PATIENT,
                "appointment_datetime": next_weekday_at(Weekday::Mon, 9, 30).to_rfc3339()
            })),
        ))
        .await
        .unwrap(),
    )
    .await;
    let uri = format!("/appointments/{}", created["id"].as_i64().unwrap());

    let app = appointment_routes(state.clone());
    let response = app
        .oneshot(json_request("PATCH", &uri, Some(json!({ "status": "cancelled" }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["status"], "cancelled");

    let app = appointment_routes(state.clone());
    let response = app
        .oneshot(json_request("PATCH", &uri, Some(json!({ "status": "scheduled" }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let app = appointment_routes(state.clone());
    let response = app.oneshot(json_request("DELETE", &uri, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let app = appointment_routes(state.clone());
    let response = app.oneshot(json_request("GET", &uri, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_appointments_with_status_filter() {
    let state = test_state().await;

    let app = appointment_routes(state.clone());
    let response = app
        .oneshot(json_request("GET", "/appointments?status=scheduled", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await, json!([]));
}

#[tokio::test]
async fn test_unknown_status_filter_is_rejected() {
    let state = test_state().await;

    let app = appointment_routes(state.clone());
    let response = app
        .oneshot(json_request("GET", "/appointments?status=pending", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_booking_with_malformed_patient_id_is_unprocessable() {
    let state = test_state().await;
    let doctor_id = seed_doctor(&state.db, "Dr. Grey", "Surgery").await;
    seed_schedule(&state.db, doctor_id, 0, time(9, 0), time(10, 0)).await;

    let app = appointment_routes(state.clone());
    let response = app
        .oneshot(json_request(
            "POST",
            "/appointments",
            Some(json!({
                "doctor_id": doctor_id,
                "patient_id": "abc",
                "appointment_datetime": next_weekday_at(Weekday::Mon, 9, 0).to_rfc3339()
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("13 digits"));
    assert_eq!(count_rows(&state.db, "appointments").await, 0);
}

#[tokio::test]
async fn test_patient_filter_with_malformed_id_is_unprocessable() {
    let state = test_state().await;

    let app = appointment_routes(state.clone());
    let response = app
        .oneshot(json_request("GET", "/appointments?patient_id=abc", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_malformed_json_body_gets_json_error() {
    let state = test_state().await;

    let app = appointment_routes(state.clone());
    let response = app
        .oneshot(
            axum::http::Request::builder()
                .method("POST")
                .uri("/appointments")
                .header(axum::http::header::CONTENT_TYPE, "application/json")
                .body(axum::body::Body::from("{\"doctor_id\": "))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response_json(response).await["error"].is_string());

    let app = appointment_routes(state.clone());
    let response = app
        .oneshot(json_request("GET", "/appointments/not-a-number", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response_json(response).await["error"].is_string());
}
