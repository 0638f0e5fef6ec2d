use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use tracing::{debug, info};

use shared_config::AppConfig;

use crate::schema;

/// A writing statement as the first statement of a deferred transaction
/// takes SQLite's RESERVED lock (waiting out `busy_timeout`) before any read
/// snapshot exists. It matches no rows.
const TAKE_WRITE_LOCK: &str = "UPDATE doctor SET id = id WHERE 0";

/// Handle to the relational store. Cloning shares the underlying pool.
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        info!("Opening database at {}", config.database_url);

        let options = SqliteConnectOptions::from_str(&config.database_url)
            .with_context(|| format!("Invalid DATABASE_URL: {}", config.database_url))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect_with(options)
            .await
            .context("Failed to open database pool")?;

        Ok(Self { pool })
    }

    /// Private in-memory store. Pinned to a single connection so every
    /// session sees the same database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open in-memory database")?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Opens the per-request write session, equivalent to `BEGIN IMMEDIATE`.
    /// The write lock is held before the first read, so checks inside the
    /// session see every committed write and concurrent writers queue on the
    /// busy timeout. Dropping it without `commit` rolls back.
    pub async fn begin_immediate(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        debug!("Opening write transaction");
        let mut tx = self.pool.begin().await?;
        sqlx::query(TAKE_WRITE_LOCK).execute(&mut *tx).await?;
        Ok(tx)
    }

    pub async fn create_db_and_tables(&self) -> Result<()> {
        schema::create_db_and_tables(&self.pool)
            .await
            .context("Failed to create tables")?;
        info!("Database tables ready");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn table_names(db: &Database) -> Vec<String> {
        sqlx::query_scalar::<_, String>(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(db.pool())
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn file_backed_database_creates_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.db");
        let config = AppConfig {
            database_url: format!("sqlite://{}", path.display()),
            ..AppConfig::default()
        };

        let db = Database::connect(&config).await.unwrap();
        db.create_db_and_tables().await.unwrap();
        // second run must be a no-op
        db.create_db_and_tables().await.unwrap();

        assert!(path.exists());
        assert_eq!(
            table_names(&db).await,
            vec!["appointments", "doctor", "doctor_schedules", "patient"]
        );
    }

    #[tokio::test]
    async fn in_memory_database_survives_across_sessions() {
        let db = Database::in_memory().await.unwrap();
        db.create_db_and_tables().await.unwrap();

        let mut tx = db.begin_immediate().await.unwrap();
        sqlx::query("INSERT INTO doctor (name, specialty, price_per_consultation) VALUES ('Ada', 'GP', 10)")
            .execute(&mut *tx)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM doctor")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let db = Database::in_memory().await.unwrap();
        db.create_db_and_tables().await.unwrap();

        {
            let mut tx = db.begin_immediate().await.unwrap();
            sqlx::query("INSERT INTO doctor (name, specialty, price_per_consultation) VALUES ('Ada', 'GP', 10)")
                .execute(&mut *tx)
                .await
                .unwrap();
        }

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM doctor")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn second_writer_waits_for_the_first() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            database_url: format!("sqlite://{}", dir.path().join("clinic.db").display()),
            database_max_connections: 4,
            ..AppConfig::default()
        };
        let db = Database::connect(&config).await.unwrap();
        db.create_db_and_tables().await.unwrap();

        let mut first = db.begin_immediate().await.unwrap();
        sqlx::query("INSERT INTO doctor (name, specialty, price_per_consultation) VALUES ('Ada', 'GP', 10)")
            .execute(&mut *first)
            .await
            .unwrap();

        let other = db.clone();
        let second = tokio::spawn(async move {
            let mut tx = other.begin_immediate().await?;
            let seen: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM doctor")
                .fetch_one(&mut *tx)
                .await?;
            sqlx::query("INSERT INTO doctor (name, specialty, price_per_consultation) VALUES ('Grace', 'GP', 10)")
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok::<i64, sqlx::Error>(seen)
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        first.commit().await.unwrap();

        // the second session only started reading after the first committed
        assert_eq!(second.await.unwrap().unwrap(), 1);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM doctor")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 2);
    }
}
