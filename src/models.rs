//! Core data types that flow through the indexing and retrieval pipeline.

use serde::{Deserialize, Serialize};

/// A catalogued document identity.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRecord {
    pub filename: String,
    /// Unix seconds.
    pub uploaded_at: i64,
}

/// A window of a document's text, before embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkDraft {
    pub text: String,
    pub source: String,
    /// 1-based page number the window was cut from.
    pub page: u32,
    /// SHA-256 of the window text.
    pub hash: String,
}

/// An embedded chunk as stored in the vector index artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub source: String,
    pub page: u32,
    pub hash: String,
    pub embedding: Vec<f32>,
}

/// A ranked retrieval result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub text: String,
    pub source: String,
    pub page: u32,
    pub score: f32,
}

/// Outcome of a background indexing job for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Succeeded,
    Failed { reason: String },
}
