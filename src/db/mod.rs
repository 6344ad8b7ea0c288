pub mod lock;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde_json::{Map, Value};
use sqlx::{migrate::MigrateDatabase, sqlite::{SqlitePool, SqlitePoolOptions}, Row, Sqlite, SqliteConnection};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::voting::PollError;

pub use lock::{LockId, LockOptions, LockTag};

/// Key-value document attached to a dropped asset.
pub type DataObject = Map<String, Value>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Lock {0} is already held")]
    LockConflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Malformed data object: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Data object must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    // The caller's reconciliation refused the change; nothing was written
    #[error(transparent)]
    Rejected(#[from] PollError),
}

#[derive(Debug, Clone, Default)]
pub struct AnalyticEvent {
    pub analytic_name: String,
    pub profile_id: Option<String>,
    pub url_slug: Option<String>,
    pub unique_key: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    pub lock: Option<LockOptions>,
    pub analytics: Vec<AnalyticEvent>,
}

pub struct Database {
    pool: SqlitePool,
    // Read-modify-write cycles on this handle run one at a time
    write_guard: Mutex<()>,
}

impl Database {
    pub async fn new(db_url: &str) -> Result<Self, StoreError> {
        // Create database if it doesn't exist
        if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            info!("Creating database at {}", db_url);
            Sqlite::create_database(db_url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await?;

        Self::init_schema(&pool).await?;

        Ok(Self {
            pool,
            write_guard: Mutex::new(()),
        })
    }

    // A single long-lived connection keeps the in-memory database alive
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Self::init_schema(&pool).await?;

        Ok(Self {
            pool,
            write_guard: Mutex::new(()),
        })
    }

    async fn init_schema(pool: &SqlitePool) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS data_objects (
                asset_id TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS data_object_locks (
                lock_id TEXT PRIMARY KEY,
                asset_id TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS analytics_events (
                id TEXT PRIMARY KEY,
                asset_id TEXT NOT NULL,
                analytic_name TEXT NOT NULL,
                profile_id TEXT,
                url_slug TEXT,
                unique_key TEXT,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    // Get the data object for an asset, if one has been written
    pub async fn fetch_data_object(&self, asset_id: &str) -> Result<Option<DataObject>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Self::read_data_object(&mut conn, asset_id).await
    }

    /// Writes `default` unless the asset already has an initialized data object
    /// (one carrying a `displayMode`). The lock is kept until its window passes,
    /// so concurrent first visits initialize the document only once.
    /// Returns whether the default was written.
    pub async fn set_data_object_if_absent(
        &self,
        asset_id: &str,
        default: DataObject,
        lock_id: &LockId,
    ) -> Result<bool, StoreError> {
        let _guard = self.write_guard.lock().await;
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        Self::acquire_lock(&mut tx, asset_id, lock_id, now).await?;

        let initialized = Self::read_data_object(&mut tx, asset_id)
            .await?
            .map(|data| data.contains_key("displayMode"))
            .unwrap_or(false);

        if !initialized {
            Self::write_data_object(&mut tx, asset_id, &default, now).await?;
        }

        tx.commit().await?;
        Ok(!initialized)
    }

    /// Shallow-merges `patch` into the stored object, creating it if needed.
    pub async fn update_data_object(
        &self,
        asset_id: &str,
        patch: DataObject,
        options: UpdateOptions,
    ) -> Result<DataObject, StoreError> {
        self.modify_data_object(asset_id, options, |mut data| {
            data.extend(patch);
            Ok(data)
        })
        .await
    }

    /// Reads the stored object (empty if there is none), lets `apply` build the
    /// next version and writes it back in the same transaction.
    ///
    /// `apply` always sees the latest committed document. If it fails, or the
    /// lock is already held, nothing is written and no analytics are recorded.
    pub async fn modify_data_object<F>(
        &self,
        asset_id: &str,
        options: UpdateOptions,
        apply: F,
    ) -> Result<DataObject, StoreError>
    where
        F: FnOnce(DataObject) -> Result<DataObject, StoreError>,
    {
        let _guard = self.write_guard.lock().await;
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        if let Some(lock) = &options.lock {
            Self::acquire_lock(&mut tx, asset_id, &lock.lock_id, now).await?;
        }

        let current = Self::read_data_object(&mut tx, asset_id)
            .await?
            .unwrap_or_default();
        let data = apply(current)?;

        Self::write_data_object(&mut tx, asset_id, &data, now).await?;

        for event in &options.analytics {
            Self::record_analytic(&mut tx, asset_id, event, now).await?;
        }

        if let Some(lock) = options.lock.as_ref().filter(|lock| lock.release_lock) {
            sqlx::query("DELETE FROM data_object_locks WHERE lock_id = ?")
                .bind(lock.lock_id.as_str())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(data)
    }

    // Overwrite the whole data object, no lock
    pub async fn replace_data_object(&self, asset_id: &str, data: DataObject) -> Result<(), StoreError> {
        let _guard = self.write_guard.lock().await;
        let mut conn = self.pool.acquire().await?;
        Self::write_data_object(&mut conn, asset_id, &data, Utc::now()).await
    }

    // Drop locks whose window has passed; returns how many were removed
    pub async fn purge_expired_locks(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM data_object_locks WHERE expires_at <= ?")
            .bind(now.timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    #[cfg(test)]
    pub async fn count_analytics(&self, asset_id: &str, analytic_name: &str) -> Result<i64, StoreError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total FROM analytics_events WHERE asset_id = ? AND analytic_name = ?",
        )
        .bind(asset_id)
        .bind(analytic_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>("total"))
    }

    #[cfg(test)]
    pub async fn count_locks(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM data_object_locks")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("total"))
    }

    async fn acquire_lock(
        conn: &mut SqliteConnection,
        asset_id: &str,
        lock_id: &LockId,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        // An expired holder of the same id no longer counts
        sqlx::query("DELETE FROM data_object_locks WHERE lock_id = ? AND expires_at <= ?")
            .bind(lock_id.as_str())
            .bind(now.timestamp_millis())
            .execute(&mut *conn)
            .await?;

        let expires_at = (now + lock_id.window()).timestamp_millis();
        let inserted = sqlx::query(
            r#"
            INSERT INTO data_object_locks (lock_id, asset_id, expires_at)
            VALUES (?, ?, ?)
            ON CONFLICT(lock_id) DO NOTHING
            "#,
        )
        .bind(lock_id.as_str())
        .bind(asset_id)
        .bind(expires_at)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if inserted == 0 {
            debug!("Lock {} rejected for asset {}", lock_id, asset_id);
            return Err(StoreError::LockConflict(lock_id.to_string()));
        }

        Ok(())
    }

    async fn read_data_object(
        conn: &mut SqliteConnection,
        asset_id: &str,
    ) -> Result<Option<DataObject>, StoreError> {
        let row = sqlx::query("SELECT data FROM data_objects WHERE asset_id = ?")
            .bind(asset_id)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => {
                let data = row.get::<String, _>("data");
                Ok(Some(serde_json::from_str(&data)?))
            }
            None => Ok(None),
        }
    }

    async fn write_data_object(
        conn: &mut SqliteConnection,
        asset_id: &str,
        data: &DataObject,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO data_objects (asset_id, data, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(asset_id)
            DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at
            "#,
        )
        .bind(asset_id)
        .bind(serde_json::to_string(data)?)
        .bind(now.to_rfc3339())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    async fn record_analytic(
        conn: &mut SqliteConnection,
        asset_id: &str,
        event: &AnalyticEvent,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO analytics_events (id, asset_id, analytic_name, profile_id, url_slug, unique_key, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(asset_id)
        .bind(&event.analytic_name)
        .bind(&event.profile_id)
        .bind(&event.url_slug)
        .bind(&event.unique_key)
        .bind(now.to_rfc3339())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
