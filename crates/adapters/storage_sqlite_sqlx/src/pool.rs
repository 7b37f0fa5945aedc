//! Opening the brewery database.
//!
//! The schema is two tables: `programs`, one row per program keyed by its
//! position in the list, and `sensors`, the display-name catalogue keyed by
//! sensor id. Both are created by the embedded migrations.

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;

use crate::error::StorageError;

/// Where the brewery database lives.
#[derive(Debug, Clone)]
pub struct Config {
    /// `sqlite:brewery.db`, `sqlite::memory:` or any other sqlx `SQLite` URL.
    pub database_url: String,
}

impl Config {
    /// Open the database, creating the file and the schema on first use.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the URL is invalid, the file cannot be
    /// opened, or a migration fails.
    pub async fn build(self) -> Result<Database, StorageError> {
        Database::open(&self.database_url).await
    }
}

/// An open brewery database with an up-to-date schema.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    async fn open(database_url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::debug!(database_url, "brewery schema up to date");
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait for pending writes and close every connection.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("database closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory() -> Database {
        Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn should_create_program_and_sensor_tables_on_open() {
        let db = memory().await;

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations' ORDER BY name",
        )
        .fetch_all(db.pool())
        .await
        .unwrap();

        let names: Vec<&str> = tables.iter().map(|row| row.0.as_str()).collect();
        assert_eq!(names, vec!["programs", "sensors"]);
    }

    #[tokio::test]
    async fn should_reject_unknown_open_mode() {
        let result = Config {
            database_url: "sqlite:brewery.db?mode=sideways".to_string(),
        }
        .build()
        .await;
        assert!(matches!(result, Err(StorageError::Database(_))));
    }

    #[tokio::test]
    async fn should_close_pool() {
        let db = memory().await;
        db.close().await;
        assert!(db.pool().is_closed());
    }
}
