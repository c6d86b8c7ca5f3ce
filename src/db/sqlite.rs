use async_trait::async_trait;
use chrono::Utc;
use log::info;
use sqlx::{
    Row, Sqlite,
    migrate::MigrateDatabase,
    sqlite::{SqlitePool, SqlitePoolOptions},
};

use super::{RecordKind, RecordStore, StoreError};

// Keeps both records as JSON text rows in a single SQLite table.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(db_url: &str) -> Result<Self, StoreError> {
        // Create database if it doesn't exist
        if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            info!("Creating database {}", db_url);
            Sqlite::create_database(db_url).await?;
        }

        // Every in-memory connection is its own database
        let max_connections = if db_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(db_url)
            .await?;

        Self::init_schema(&pool).await?;

        Ok(Self { pool })
    }

    async fn init_schema(pool: &SqlitePool) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                kind TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn read(&self, kind: RecordKind) -> Result<Option<String>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT body
            FROM records
            WHERE kind = ?
            "#,
        )
        .bind(kind.key())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row.get::<String, _>("body")))
    }

    async fn write(&self, kind: RecordKind, body: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO records (kind, body, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(kind)
            DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at
            "#,
        )
        .bind(kind.key())
        .bind(body)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
