//! Upload, delete, and list operations.
//!
//! These are the request-path mutations: they commit the catalog and blob
//! store synchronously, queue background index work on the coordinator, and
//! return immediately. Eventual searchability is a background outcome
//! observable through the job-status map, never something a caller waits on.

use anyhow::Result;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::blobs::sanitize_filename;
use crate::catalog::RegisterOutcome;
use crate::coordinator::Coordinator;
use crate::extract;

/// Result of an upload batch. `job` is the queued indexing task; the HTTP
/// surface drops it, the CLI and tests await it.
pub struct UploadOutcome {
    pub accepted: Vec<String>,
    pub duplicates: Vec<String>,
    /// (filename, reason) pairs for files rejected before registration or
    /// rolled back after a failed blob write.
    pub rejected: Vec<(String, String)>,
    pub job: Option<JoinHandle<()>>,
}

/// Result of a delete. `job` is the queued rebuild, present when either
/// store actually changed.
pub struct DeleteOutcome {
    pub removed: bool,
    pub job: Option<JoinHandle<()>>,
}

/// Register and persist a batch of uploaded files, then queue indexing.
///
/// Per file: sanitize the name, check the extension, register in the catalog
/// (the dedup gate — duplicates are skipped and reported, not errors), and
/// save the raw bytes. A failed blob write rolls the catalog row back so the
/// two stores never disagree about a file that was never stored.
pub async fn upload_documents(
    coordinator: &Coordinator,
    files: Vec<(String, Vec<u8>)>,
) -> Result<UploadOutcome> {
    let mut accepted = Vec::new();
    let mut duplicates = Vec::new();
    let mut rejected = Vec::new();

    for (raw_name, bytes) in files {
        let Some(filename) = sanitize_filename(&raw_name) else {
            rejected.push((raw_name, "invalid filename".to_string()));
            continue;
        };
        if !extract::is_supported(&filename) {
            rejected.push((filename, "unsupported file type".to_string()));
            continue;
        }

        match coordinator.catalog().register(&filename).await? {
            RegisterOutcome::Duplicate => {
                info!(file = %filename, "skipping duplicate upload");
                duplicates.push(filename);
            }
            RegisterOutcome::Accepted => {
                if let Err(e) = coordinator.blobs().save(&filename, &bytes) {
                    warn!(file = %filename, error = %e, "blob write failed; rolling back registration");
                    coordinator.catalog().remove(&filename).await?;
                    rejected.push((filename, e.to_string()));
                } else {
                    accepted.push(filename);
                }
            }
        }
    }

    let job = if accepted.is_empty() {
        None
    } else {
        Some(coordinator.schedule_index(accepted.clone()).await)
    };

    Ok(UploadOutcome {
        accepted,
        duplicates,
        rejected,
        job,
    })
}

/// Remove a document from the blob store and catalog, then queue a full
/// rebuild. The rebuild is the only way to evict the document's chunks from
/// the index artifact, which supports no targeted delete.
pub async fn delete_document(coordinator: &Coordinator, filename: &str) -> Result<DeleteOutcome> {
    let blob_removed = coordinator.blobs().delete(filename)?;
    let catalog_removed = coordinator.catalog().remove(filename).await?;
    let removed = blob_removed || catalog_removed;

    let job = if removed {
        info!(file = %filename, "deleted document; queueing index rebuild");
        Some(coordinator.schedule_rebuild())
    } else {
        None
    };

    Ok(DeleteOutcome { removed, job })
}

/// Current catalog contents, newest upload first.
pub async fn list_documents(coordinator: &Coordinator) -> Result<Vec<String>> {
    coordinator.catalog().list().await
}
