//! Metadata store trait and the SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::repos::RoomRepo;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: RoomRepo + Send + Sync {
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply the schema.
    pub async fn new(path: impl AsRef<Path>, busy_timeout_secs: u64) -> MetadataResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(busy_timeout_secs));

        let pool = SqlitePoolOptions::new()
            // A single connection keeps writers from tripping over "database is locked".
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        tracing::debug!(path = %path.display(), "SQLite room store ready");

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Translate CHECK failures into constraint errors; everything else stays a database error.
fn map_constraint(err: sqlx::Error) -> MetadataError {
    match err {
        sqlx::Error::Database(db_err) if db_err.message().contains("CHECK constraint") => {
            MetadataError::Constraint(db_err.message().to_string())
        }
        other => other.into(),
    }
}

mod sqlite_impl {
    use super::*;
    use crate::models::{NewRoomRow, RoomRow};
    use lodge_core::RoomPatch;

    #[async_trait]
    impl RoomRepo for SqliteStore {
        async fn create_room(&self, room: &NewRoomRow) -> MetadataResult<RoomRow> {
            sqlx::query_as::<_, RoomRow>(
                r#"
                INSERT INTO rooms (name, description, capacity, facilities_count, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                RETURNING *
                "#,
            )
            .bind(&room.name)
            .bind(&room.description)
            .bind(room.capacity)
            .bind(room.facilities_count)
            .bind(&room.created_at)
            .bind(&room.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(map_constraint)
        }

        async fn get_room(&self, id: i64) -> MetadataResult<Option<RoomRow>> {
            let row = sqlx::query_as::<_, RoomRow>("SELECT * FROM rooms WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn list_rooms(&self) -> MetadataResult<Vec<RoomRow>> {
            let rows = sqlx::query_as::<_, RoomRow>("SELECT * FROM rooms ORDER BY id ASC")
                .fetch_all(&self.pool)
                .await?;
            Ok(rows)
        }

        async fn update_room(
            &self,
            id: i64,
            patch: &RoomPatch,
            updated_at: &str,
        ) -> MetadataResult<Option<RoomRow>> {
            sqlx::query_as::<_, RoomRow>(
                r#"
                UPDATE rooms SET
                    name = COALESCE(?, name),
                    description = COALESCE(?, description),
                    capacity = COALESCE(?, capacity),
                    facilities_count = COALESCE(?, facilities_count),
                    updated_at = ?
                WHERE id = ?
                RETURNING *
                "#,
            )
            .bind(&patch.name)
            .bind(&patch.description)
            .bind(patch.capacity)
            .bind(patch.facilities_count)
            .bind(updated_at)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_constraint)
        }

        async fn set_room_image(
            &self,
            id: i64,
            image_url: &str,
            updated_at: Option<&str>,
        ) -> MetadataResult<Option<RoomRow>> {
            let row = sqlx::query_as::<_, RoomRow>(
                "UPDATE rooms SET image_url = ?, updated_at = COALESCE(?, updated_at) \
                 WHERE id = ? RETURNING *",
            )
            .bind(image_url)
            .bind(updated_at)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn delete_room(&self, id: i64) -> MetadataResult<bool> {
            let result = sqlx::query("DELETE FROM rooms WHERE id = ?")
                .bind(id)
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected() > 0)
        }

        async fn count_rooms(&self) -> MetadataResult<i64> {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rooms")
                .fetch_one(&self.pool)
                .await?;
            Ok(count)
        }

        async fn list_image_urls(&self) -> MetadataResult<Vec<String>> {
            let urls: Vec<String> = sqlx::query_scalar(
                "SELECT DISTINCT image_url FROM rooms WHERE image_url IS NOT NULL",
            )
            .fetch_all(&self.pool)
            .await?;
            Ok(urls)
        }
    }
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS rooms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    capacity INTEGER NOT NULL CHECK (capacity > 0),
    facilities_count INTEGER NOT NULL DEFAULT 0 CHECK (facilities_count >= 0),
    image_url TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_rooms_image_url ON rooms (image_url);
"#;
