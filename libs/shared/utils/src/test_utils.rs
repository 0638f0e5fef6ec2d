//! Fixtures shared by the cell test suites. Everything here panics on failure.

use std::path::Path;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
};
use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use serde_json::Value;

use shared_config::AppConfig;
use shared_database::{AppState, Database};

pub struct TestConfig {
    pub database_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            database_url: self.database_url.clone(),
            database_max_connections: 1,
            ..AppConfig::default()
        }
    }
}

/// Fresh in-memory store with the schema applied.
pub async fn test_state() -> Arc<AppState> {
    let db = Database::in_memory().await.expect("in-memory database");
    db.create_db_and_tables().await.expect("schema");
    Arc::new(AppState::new(TestConfig::default().to_app_config(), db))
}

/// WAL-mode store in `dir` behind a pool of several connections, for tests
/// where writers actually race.
pub async fn file_backed_state(dir: &Path) -> Arc<AppState> {
    let config = AppConfig {
        database_url: format!("sqlite://{}", dir.join("clinic.db").display()),
        database_max_connections: 8,
        ..AppConfig::default()
    };
    let db = Database::connect(&config).await.expect("file-backed database");
    db.create_db_and_tables().await.expect("schema");
    Arc::new(AppState::new(config, db))
}

pub async fn seed_doctor(db: &Database, name: &str, specialty: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO doctor (name, specialty, price_per_consultation) VALUES (?, ?, 50.0) RETURNING id",
    )
    .bind(name)
    .bind(specialty)
    .fetch_one(db.pool())
    .await
    .expect("seed doctor")
}

pub async fn seed_patient(db: &Database, id: &str, is_active: bool) {
    sqlx::query("INSERT INTO patient (id, name, age, is_active) VALUES (?, ?, 30, ?)")
        .bind(id)
        .bind(format!("Patient {}", id))
        .bind(is_active)
        .execute(db.pool())
        .await
        .expect("seed patient");
}

pub async fn seed_schedule(
    db: &Database,
    doctor_id: i64,
    weekday: i32,
    start: NaiveTime,
    end: NaiveTime,
) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO doctor_schedules (doctor_id, weekday, start_time, end_time) VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(doctor_id)
    .bind(weekday)
    .bind(start)
    .bind(end)
    .fetch_one(db.pool())
    .await
    .expect("seed schedule")
}

pub async fn seed_appointment(
    db: &Database,
    doctor_id: i64,
    patient_id: &str,
    at: DateTime<Utc>,
    status: &str,
) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO appointments (doctor_id, patient_id, appointment_datetime, status) VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(doctor_id)
    .bind(patient_id)
    .bind(at)
    .bind(status)
    .fetch_one(db.pool())
    .await
    .expect("seed appointment")
}

pub async fn count_rows(db: &Database, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(db.pool())
        .await
        .expect("count rows")
}

pub fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
}

/// Next occurrence (strictly after today, UTC) of `weekday` at `hour:minute`.
pub fn next_weekday_at(weekday: Weekday, hour: u32, minute: u32) -> DateTime<Utc> {
    let mut date = Utc::now().date_naive() + Duration::days(1);
    while date.weekday() != weekday {
        date += Duration::days(1);
    }
    date.and_time(time(hour, minute)).and_utc()
}

/// Most recent occurrence (strictly before today, UTC) of `weekday` at `hour:minute`.
pub fn previous_weekday_at(weekday: Weekday, hour: u32, minute: u32) -> DateTime<Utc> {
    let mut date = Utc::now().date_naive() - Duration::days(1);
    while date.weekday() != weekday {
        date -= Duration::days(1);
    }
    date.and_time(time(hour, minute)).and_utc()
}

pub fn json_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

pub async fn response_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&body).expect("json body")
}
