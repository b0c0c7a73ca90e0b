//! Mail record storage repository.

use chrono::{DateTime, Utc};
use pinroute_vision::Extraction;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};

use super::model::{MailId, MailRecord, OwnerId, ProcessingStatus};
use crate::Result;

/// Repository for mail record storage and retrieval.
#[derive(Debug, Clone)]
pub struct MailRepository {
    pool: SqlitePool,
}

impl MailRepository {
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
            CREATE TABLE IF NOT EXISTS mails (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id INTEGER NOT NULL,
                image_key TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                receiver_name TEXT,
                receiver_address TEXT,
                receiver_pincode TEXT,
                sender_name TEXT,
                sender_address TEXT,
                sender_pincode TEXT,
                raw_extraction TEXT,
                sorting_center TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_mails_owner
            ON mails(owner_id, created_at)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Persist a new record with status `pending`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn create(&self, owner_id: OwnerId, image_key: &str) -> Result<MailRecord> {
        let now = Utc::now();
        let result = sqlx::query(
            r"
            INSERT INTO mails (owner_id, image_key, status, created_at, updated_at)
            VALUES (?, ?, 'pending', ?, ?)
            ",
        )
        .bind(owner_id.0)
        .bind(image_key)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(MailRecord {
            id: MailId(result.last_insert_rowid()),
            owner_id,
            image_key: image_key.to_string(),
            status: ProcessingStatus::Pending,
            receiver_name: None,
            receiver_address: None,
            receiver_pincode: None,
            sender_name: None,
            sender_address: None,
            sender_pincode: None,
            raw_extraction: None,
            sorting_center: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Load a record by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: MailId) -> Result<Option<MailRecord>> {
        let row = sqlx::query(&format!("{SELECT_RECORD} WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().and_then(record_from_row))
    }

    /// Load a record by id, visible only to its owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_for_owner(&self, id: MailId, owner_id: OwnerId) -> Result<Option<MailRecord>> {
        let row = sqlx::query(&format!("{SELECT_RECORD} WHERE id = ? AND owner_id = ?"))
            .bind(id.0)
            .bind(owner_id.0)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().and_then(record_from_row))
    }

    /// List an owner's records, newest first by creation time.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        owner_id: OwnerId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<MailRecord>> {
        let rows = sqlx::query(&format!(
            "{SELECT_RECORD} WHERE owner_id = ? ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        ))
        .bind(owner_id.0)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(record_from_row).collect())
    }

    /// Claim a record for processing.
    ///
    /// A single conditional update doubles as the `PENDING → PROCESSING`
    /// transition and the per-id run lock: it only succeeds while no other
    /// run holds the record, so at most one pipeline run is in flight per
    /// id. Returns whether the claim won.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn claim_processing(&self, id: MailId) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE mails
            SET status = 'processing', updated_at = ?
            WHERE id = ? AND status != 'processing'
            ",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Write a run's successful outcome: all six extracted fields, the raw
    /// payload, the resolved sorting center, and status `completed`, in one
    /// update.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails or the raw payload does
    /// not serialize.
    pub async fn complete(
        &self,
        id: MailId,
        fields: &Extraction,
        raw: &serde_json::Value,
        sorting_center: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r"
            UPDATE mails
            SET status = 'completed',
                receiver_name = ?,
                receiver_address = ?,
                receiver_pincode = ?,
                sender_name = ?,
                sender_address = ?,
                sender_pincode = ?,
                raw_extraction = ?,
                sorting_center = ?,
                updated_at = ?
            WHERE id = ?
            ",
        )
        .bind(&fields.receiver_name)
        .bind(&fields.receiver_address)
        .bind(&fields.receiver_pincode)
        .bind(&fields.sender_name)
        .bind(&fields.sender_address)
        .bind(&fields.sender_pincode)
        .bind(serde_json::to_string(raw)?)
        .bind(sorting_center)
        .bind(Utc::now().to_rfc3339())
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Mark a run as failed. Extracted fields are left as they were before
    /// the run; only the status and `updated_at` move.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn fail(&self, id: MailId) -> Result<()> {
        sqlx::query(r"UPDATE mails SET status = 'failed', updated_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

const SELECT_RECORD: &str = r"
    SELECT id, owner_id, image_key, status,
           receiver_name, receiver_address, receiver_pincode,
           sender_name, sender_address, sender_pincode,
           raw_extraction, sorting_center, created_at, updated_at
    FROM mails
";

fn record_from_row(row: &SqliteRow) -> Option<MailRecord> {
    let created_at_str: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .ok()?
        .with_timezone(&Utc);
    let updated_at_str: String = row.get("updated_at");
    let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
        .ok()?
        .with_timezone(&Utc);

    let status: String = row.get("status");
    let raw_extraction: Option<String> = row.get("raw_extraction");

    Some(MailRecord {
        id: MailId(row.get::<i64, _>("id")),
        owner_id: OwnerId(row.get::<i64, _>("owner_id")),
        image_key: row.get("image_key"),
        status: ProcessingStatus::parse(&status),
        receiver_name: row.get("receiver_name"),
        receiver_address: row.get("receiver_address"),
        receiver_pincode: row.get("receiver_pincode"),
        sender_name: row.get("sender_name"),
        sender_address: row.get("sender_address"),
        sender_pincode: row.get("sender_pincode"),
        raw_extraction: raw_extraction.and_then(|s| serde_json::from_str(&s).ok()),
        sorting_center: row.get("sorting_center"),
        created_at,
        updated_at,
    })
}
