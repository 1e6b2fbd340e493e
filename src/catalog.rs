//! Durable document catalog — the dedup authority.
//!
//! A single SQLite table of document identities. The filename uniqueness
//! constraint is the only synchronization the catalog needs: two concurrent
//! registrations of the same name resolve to exactly one `Accepted` and one
//! `Duplicate`. The catalog knows nothing about the vector index; it is a
//! pure name ledger.

use anyhow::Result;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::config::StorageConfig;
use crate::models::DocumentRecord;

/// Result of an insert-if-absent registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Accepted,
    Duplicate,
}

#[derive(Clone)]
pub struct Catalog {
    pool: SqlitePool,
}

impl Catalog {
    /// Open (and create if missing) the catalog database.
    ///
    /// Idempotent: the schema is created with `IF NOT EXISTS`, so reopening
    /// an existing catalog is safe.
    pub async fn open(storage: &StorageConfig) -> Result<Self> {
        let db_path = storage.catalog_path();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                filename TEXT PRIMARY KEY,
                uploaded_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// Atomic insert-if-absent keyed by filename.
    pub async fn register(&self, filename: &str) -> Result<RegisterOutcome> {
        let result = sqlx::query(
            "INSERT INTO documents (filename, uploaded_at) VALUES (?, ?) \
             ON CONFLICT(filename) DO NOTHING",
        )
        .bind(filename)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            Ok(RegisterOutcome::Accepted)
        } else {
            Ok(RegisterOutcome::Duplicate)
        }
    }

    /// All catalogued filenames, newest upload first.
    pub async fn list(&self) -> Result<Vec<String>> {
        let rows: Vec<String> = sqlx::query_scalar(
            "SELECT filename FROM documents ORDER BY uploaded_at DESC, filename ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// All catalogued records, newest upload first.
    pub async fn records(&self) -> Result<Vec<DocumentRecord>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT filename, uploaded_at FROM documents ORDER BY uploaded_at DESC, filename ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(filename, uploaded_at)| DocumentRecord {
                filename,
                uploaded_at,
            })
            .collect())
    }

    /// Delete the row if present; returns whether anything was deleted.
    pub async fn remove(&self, filename: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE filename = ?")
            .bind(filename)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
