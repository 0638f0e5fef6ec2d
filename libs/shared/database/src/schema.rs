use sqlx::SqlitePool;
use tracing::debug;

use shared_models::error::SCHEDULE_OVERLAP_MARKER;

const CREATE_DOCTOR: &str = r#"
    CREATE TABLE IF NOT EXISTS doctor (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        specialty TEXT NOT NULL,
        phone TEXT,
        email TEXT,
        price_per_consultation REAL NOT NULL,
        CONSTRAINT uq_doctor_email UNIQUE (email),
        CONSTRAINT ck_doctor_price_nonneg CHECK (price_per_consultation >= 0)
    )
"#;

const CREATE_PATIENT: &str = r#"
    CREATE TABLE IF NOT EXISTS patient (
        id TEXT PRIMARY KEY NOT NULL,
        name TEXT NOT NULL,
        age INTEGER NOT NULL DEFAULT 0,
        phone TEXT,
        email TEXT,
        is_active INTEGER NOT NULL DEFAULT 1,
        CONSTRAINT uq_patient_email UNIQUE (email),
        CONSTRAINT ck_patient_age_nonneg CHECK (age >= 0),
        CONSTRAINT ck_patient_id_len_13 CHECK (length(id) = 13 AND id NOT GLOB '*[^0-9]*')
    )
"#;

const CREATE_APPOINTMENTS: &str = r#"
    CREATE TABLE IF NOT EXISTS appointments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        doctor_id INTEGER NOT NULL REFERENCES doctor(id) ON DELETE CASCADE,
        patient_id TEXT NOT NULL REFERENCES patient(id),
        appointment_datetime TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'scheduled',
        notes TEXT,
        CONSTRAINT ck_appt_status CHECK (status IN ('scheduled', 'cancelled', 'completed'))
    )
"#;

const CREATE_DOCTOR_SCHEDULES: &str = r#"
    CREATE TABLE IF NOT EXISTS doctor_schedules (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        doctor_id INTEGER NOT NULL REFERENCES doctor(id) ON DELETE CASCADE,
        weekday INTEGER NOT NULL,
        start_time TEXT NOT NULL,
        end_time TEXT NOT NULL,
        CONSTRAINT ck_schedule_weekday_range CHECK (weekday >= 0 AND weekday <= 6),
        CONSTRAINT ck_schedule_time_order CHECK (start_time < end_time)
    )
"#;

const INDEXES: [&str; 7] = [
    "CREATE INDEX IF NOT EXISTS ix_doctor_name ON doctor(name)",
    "CREATE INDEX IF NOT EXISTS ix_patient_name ON patient(name)",
    "CREATE INDEX IF NOT EXISTS ix_appt_doctor_dt ON appointments(doctor_id, appointment_datetime)",
    "CREATE INDEX IF NOT EXISTS ix_appt_patient_dt ON appointments(patient_id, appointment_datetime)",
    "CREATE UNIQUE INDEX IF NOT EXISTS uq_appt_doctor_dt_scheduled \
        ON appointments(doctor_id, appointment_datetime) WHERE status = 'scheduled'",
    "CREATE INDEX IF NOT EXISTS ix_schedule_doctor_weekday ON doctor_schedules(doctor_id, weekday)",
    "CREATE INDEX IF NOT EXISTS ix_schedule_doctor_id ON doctor_schedules(doctor_id)",
];

/// Store-level twin of the weekly-slot overlap check in doctor-cell. Catches the
/// writer that loses a race between two check-then-insert transactions.
fn overlap_triggers() -> [String; 2] {
    let insert = format!(
        r#"
        CREATE TRIGGER IF NOT EXISTS trg_doctor_schedules_no_overlap_insert
        BEFORE INSERT ON doctor_schedules
        WHEN EXISTS (
            SELECT 1 FROM doctor_schedules s
            WHERE s.doctor_id = NEW.doctor_id
              AND s.weekday = NEW.weekday
              AND s.start_time < NEW.end_time
              AND s.end_time > NEW.start_time
        )
        BEGIN
            SELECT RAISE(ABORT, '{marker}');
        END
        "#,
        marker = SCHEDULE_OVERLAP_MARKER
    );

    let update = format!(
        r#"
        CREATE TRIGGER IF NOT EXISTS trg_doctor_schedules_no_overlap_update
        BEFORE UPDATE OF doctor_id, weekday, start_time, end_time ON doctor_schedules
        WHEN EXISTS (
            SELECT 1 FROM doctor_schedules s
            WHERE s.id <> NEW.id
              AND s.doctor_id = NEW.doctor_id
              AND s.weekday = NEW.weekday
              AND s.start_time < NEW.end_time
              AND s.end_time > NEW.start_time
        )
        BEGIN
            SELECT RAISE(ABORT, '{marker}');
        END
        "#,
        marker = SCHEDULE_OVERLAP_MARKER
    );

    [insert, update]
}

pub async fn create_db_and_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    for table in [CREATE_DOCTOR, CREATE_PATIENT, CREATE_APPOINTMENTS, CREATE_DOCTOR_SCHEDULES] {
        sqlx::query(table).execute(&mut *tx).await?;
    }

    for index in INDEXES {
        sqlx::query(index).execute(&mut *tx).await?;
    }

    for trigger in overlap_triggers() {
        sqlx::query(&trigger).execute(&mut *tx).await?;
    }

    tx.commit().await?;
    debug!("Schema created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::Database;

    async fn fresh() -> Database {
        let db = Database::in_memory().await.unwrap();
        db.create_db_and_tables().await.unwrap();
        sqlx::query("INSERT INTO doctor (id, name, specialty, price_per_consultation) VALUES (1, 'Ada', 'GP', 10)")
            .execute(db.pool())
            .await
            .unwrap();
        db
    }

    async fn insert_slot(db: &Database, weekday: i64, start: &str, end: &str) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO doctor_schedules (doctor_id, weekday, start_time, end_time) VALUES (1, ?, ?, ?)")
            .bind(weekday)
            .bind(start)
            .bind(end)
            .execute(db.pool())
            .await
            .map(|_| ())
    }

    #[tokio::test]
    async fn trigger_rejects_overlapping_insert() {
        let db = fresh().await;
        insert_slot(&db, 0, "09:00:00", "10:00:00").await.unwrap();

        let err = insert_slot(&db, 0, "09:30:00", "10:30:00").await.unwrap_err();
        assert!(err.to_string().contains(shared_models::error::SCHEDULE_OVERLAP_MARKER));

        // touching and other weekdays are fine
        insert_slot(&db, 0, "10:00:00", "11:00:00").await.unwrap();
        insert_slot(&db, 1, "09:30:00", "10:30:00").await.unwrap();
    }

    #[tokio::test]
    async fn trigger_allows_updating_a_slot_over_itself() {
        let db = fresh().await;
        insert_slot(&db, 0, "09:00:00", "10:00:00").await.unwrap();
        insert_slot(&db, 0, "11:00:00", "12:00:00").await.unwrap();

        sqlx::query("UPDATE doctor_schedules SET end_time = '10:30:00' WHERE start_time = '09:00:00'")
            .execute(db.pool())
            .await
            .unwrap();

        let err = sqlx::query("UPDATE doctor_schedules SET end_time = '11:30:00' WHERE start_time = '09:00:00'")
            .execute(db.pool())
            .await
            .unwrap_err();
        assert!(err.to_string().contains(shared_models::error::SCHEDULE_OVERLAP_MARKER));
    }

    #[tokio::test]
    async fn check_constraints_hold() {
        let db = fresh().await;

        assert!(insert_slot(&db, 7, "09:00:00", "10:00:00").await.is_err());
        assert!(insert_slot(&db, 0, "10:00:00", "09:00:00").await.is_err());

        let bad_patient = sqlx::query("INSERT INTO patient (id, name) VALUES ('12345678901a3', 'Bob')")
            .execute(db.pool())
            .await;
        assert!(bad_patient.is_err());

        let negative_price = sqlx::query(
            "INSERT INTO doctor (name, specialty, price_per_consultation) VALUES ('Eve', 'GP', -1)",
        )
        .execute(db.pool())
        .await;
        assert!(negative_price.is_err());
    }
}
