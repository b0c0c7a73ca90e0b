//! Pincode cache storage repository.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::model::PincodeCacheEntry;
use crate::Result;

/// Repository for the persistent pincode cache.
#[derive(Debug, Clone)]
pub struct PincodeCacheRepository {
    pool: SqlitePool,
}

impl PincodeCacheRepository {
    /// Create a new repository with the given database path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Create an in-memory repository for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS pincode_cache (
                pincode TEXT PRIMARY KEY,
                sorting_district TEXT NOT NULL,
                sorting_division TEXT NOT NULL,
                state TEXT NOT NULL,
                raw_lookup TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Look up a cached entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, pincode: &str) -> Result<Option<PincodeCacheEntry>> {
        let row = sqlx::query(
            r"
            SELECT pincode, sorting_district, sorting_division, state, raw_lookup, updated_at
            FROM pincode_cache
            WHERE pincode = ?
            ",
        )
        .bind(pincode)
        .fetch_optional(&self.pool)
        .await?;

        let entry = row.and_then(|row| {
            let updated_at_str: String = row.get("updated_at");
            let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
                .ok()?
                .with_timezone(&Utc);
            let raw_str: String = row.get("raw_lookup");
            let raw_lookup = serde_json::from_str(&raw_str).ok()?;

            Some(PincodeCacheEntry {
                pincode: row.get("pincode"),
                sorting_district: row.get("sorting_district"),
                sorting_division: row.get("sorting_division"),
                state: row.get("state"),
                raw_lookup,
                updated_at,
            })
        });

        Ok(entry)
    }

    /// Insert or refresh an entry.
    ///
    /// Concurrent resolvers can both miss the cache and both write; the
    /// upsert makes the second write a benign duplicate instead of a
    /// uniqueness failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails or the raw payload does
    /// not serialize.
    pub async fn upsert(&self, entry: &PincodeCacheEntry) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO pincode_cache
                (pincode, sorting_district, sorting_division, state, raw_lookup, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(pincode) DO UPDATE SET
                sorting_district = excluded.sorting_district,
                sorting_division = excluded.sorting_division,
                state = excluded.state,
                raw_lookup = excluded.raw_lookup,
                updated_at = excluded.updated_at
            ",
        )
        .bind(&entry.pincode)
        .bind(&entry.sorting_district)
        .bind(&entry.sorting_division)
        .bind(&entry.state)
        .bind(serde_json::to_string(&entry.raw_lookup)?)
        .bind(entry.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
