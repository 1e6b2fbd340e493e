//! Drift repair across the three stores.
//!
//! The blob directory is ground truth. Reconciliation computes the three
//! filename sets (blobs, catalog, index), registers blob files the catalog
//! lost, drops catalog rows with no backing blob, then rebuilds the index
//! artifact from the repaired catalog so all three sets converge.
//!
//! Idempotent: a second consecutive run finds nothing to repair and its
//! rebuild regenerates an index with the same filename set and chunk content.

use anyhow::Result;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use tracing::info;

use crate::coordinator::Coordinator;

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    /// Blob files that were missing from the catalog and got registered.
    pub added_to_catalog: Vec<String>,
    /// Catalog rows with no backing blob that got removed.
    pub removed_from_catalog: Vec<String>,
    /// Filenames the index artifact contained before the repair rebuild.
    pub index_before: Vec<String>,
    pub indexed_files: usize,
    pub indexed_chunks: usize,
}

pub async fn reconcile(coordinator: &Coordinator) -> Result<ReconcileReport> {
    let blob_set: BTreeSet<String> = coordinator.blobs().list()?.into_iter().collect();
    let catalog_set: BTreeSet<String> = coordinator.catalog().list().await?.into_iter().collect();
    let index_before: Vec<String> = coordinator.index_filenames().into_iter().collect();

    let mut added_to_catalog = Vec::new();
    for name in blob_set.difference(&catalog_set) {
        coordinator.catalog().register(name).await?;
        info!(file = %name, "reconcile: registered orphaned blob");
        added_to_catalog.push(name.clone());
    }

    let mut removed_from_catalog = Vec::new();
    for name in catalog_set.difference(&blob_set) {
        coordinator.catalog().remove(name).await?;
        info!(file = %name, "reconcile: removed catalog row with no backing file");
        removed_from_catalog.push(name.clone());
    }

    // Statuses for files that no longer exist are stale; drop them.
    let keep: HashSet<String> = coordinator.catalog().list().await?.into_iter().collect();
    coordinator.prune_statuses(&keep).await;

    // Always finish with a full rebuild so the index exactly reflects the
    // repaired catalog, even when no repair was needed but the artifact
    // itself had drifted or gone unreadable.
    let summary = coordinator.rebuild_now().await?;

    Ok(ReconcileReport {
        added_to_catalog,
        removed_from_catalog,
        index_before,
        indexed_files: summary.files,
        indexed_chunks: summary.chunks,
    })
}
