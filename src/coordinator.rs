//! Indexing coordinator — the single writer over the vector index artifact.
//!
//! All index-mutating work funnels through one `tokio::sync::Mutex`, so a
//! merge queued by an upload and a rebuild queued by a delete execute strictly
//! one after the other, never interleaved. Request-path operations commit the
//! catalog and blob mutation synchronously, then hand the index work to a
//! spawned task and return; nothing here ever propagates an error back to the
//! original caller.
//!
//! Background jobs are not cancellable. A delete issued while an upload's
//! merge is running simply queues a rebuild behind it; the rebuild supersedes
//! the stale content once it takes the lock.
//!
//! Every job records a per-filename status (pending / succeeded / failed) so
//! lost work is observable to callers and to the reconciliation job instead
//! of living only in the logs.

use anyhow::{bail, Result};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::blobs::BlobStore;
use crate::catalog::Catalog;
use crate::chunk::chunk_pages;
use crate::config::{ChunkingConfig, Config, RetrievalConfig};
use crate::embedding::{self, EmbeddingProvider};
use crate::extract::extract_pages;
use crate::index::IndexFile;
use crate::models::{Chunk, JobStatus, SearchHit};

/// What a full rebuild produced.
#[derive(Debug, Default, Clone, Copy)]
pub struct RebuildSummary {
    pub files: usize,
    pub chunks: usize,
}

#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

struct Inner {
    catalog: Catalog,
    blobs: BlobStore,
    index: IndexFile,
    provider: Arc<dyn EmbeddingProvider>,
    chunking: ChunkingConfig,
    retrieval: RetrievalConfig,
    embed_batch_size: usize,
    /// Single-writer lock over the index artifact.
    write_lock: Mutex<()>,
    statuses: RwLock<HashMap<String, JobStatus>>,
}

impl Coordinator {
    /// Open all three stores and bind the index artifact to the provider's
    /// pinned model.
    pub async fn open(config: &Config, provider: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let catalog = Catalog::open(&config.storage).await?;
        let blobs = BlobStore::open(config.storage.blob_dir())?;
        let index = IndexFile::new(
            config.storage.index_path(),
            provider.model_name(),
            provider.dims(),
        );

        Ok(Self {
            inner: Arc::new(Inner {
                catalog,
                blobs,
                index,
                provider,
                chunking: config.chunking.clone(),
                retrieval: config.retrieval.clone(),
                embed_batch_size: config.embedding.batch_size.max(1),
                write_lock: Mutex::new(()),
                statuses: RwLock::new(HashMap::new()),
            }),
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.inner.blobs
    }

    /// Queue a background merge of freshly uploaded documents.
    ///
    /// Marks every filename pending before the task starts so a status poll
    /// issued right after the upload response already sees the job. The
    /// returned handle is for callers that want to await completion (CLI,
    /// tests); the HTTP surface drops it.
    pub async fn schedule_index(&self, filenames: Vec<String>) -> JoinHandle<()> {
        {
            let mut statuses = self.inner.statuses.write().await;
            for name in &filenames {
                statuses.insert(name.clone(), JobStatus::Pending);
            }
        }

        let inner = self.inner.clone();
        tokio::spawn(async move {
            if let Err(e) = inner.run_index_job(&filenames).await {
                error!(error = %e, "background indexing job failed");
                inner.fail_pending(&filenames, &e.to_string()).await;
            }
        })
    }

    /// Queue a background rebuild from every catalogued document.
    pub fn schedule_rebuild(&self) -> JoinHandle<()> {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let _guard = inner.write_lock.lock().await;
            if let Err(e) = inner.rebuild_corpus().await {
                error!(error = %e, "background rebuild failed");
            }
        })
    }

    /// Run a full rebuild inline, serialized behind any in-flight job.
    /// Used by the reconciliation job.
    pub async fn rebuild_now(&self) -> Result<RebuildSummary> {
        let _guard = self.inner.write_lock.lock().await;
        self.inner.rebuild_corpus().await
    }

    /// Nearest-neighbor query over the published artifact.
    ///
    /// Reads never take the writer lock: the artifact is replaced by atomic
    /// rename, so a load observes either the previous or the next index. A
    /// missing or unreadable artifact serves an empty result set; the next
    /// mutation or reconciliation run repairs it.
    pub async fn query(
        &self,
        text: &str,
        k: usize,
        filter: Option<&HashSet<String>>,
    ) -> Result<Vec<SearchHit>> {
        let query_vec = embedding::embed_query(self.inner.provider.as_ref(), text).await?;

        let index = match self.inner.index.load() {
            Ok(Some(index)) => index,
            Ok(None) => return Ok(Vec::new()),
            Err(e) => {
                warn!(error = %e, "query served empty: index artifact unreadable");
                return Ok(Vec::new());
            }
        };

        Ok(index.search(
            &query_vec,
            k.max(1),
            filter,
            self.inner.retrieval.overfetch_factor,
        ))
    }

    /// Distinct filenames currently present in the published artifact.
    /// Empty when the artifact is missing or unreadable.
    pub fn index_filenames(&self) -> BTreeSet<String> {
        match self.inner.index.load() {
            Ok(Some(index)) => index.filenames(),
            Ok(None) => BTreeSet::new(),
            Err(e) => {
                warn!(error = %e, "index artifact unreadable while listing filenames");
                BTreeSet::new()
            }
        }
    }

    /// Snapshot of per-filename job statuses.
    pub async fn statuses(&self) -> HashMap<String, JobStatus> {
        self.inner.statuses.read().await.clone()
    }

    /// Drop status records for filenames no longer in the catalog.
    pub async fn prune_statuses(&self, keep: &HashSet<String>) {
        let mut statuses = self.inner.statuses.write().await;
        statuses.retain(|name, _| keep.contains(name));
    }
}

impl Inner {
    /// Chunk, embed, and merge one upload batch into the artifact.
    ///
    /// Per-document failures are logged and skipped; they never abort the
    /// batch. If the existing artifact cannot be loaded, merging only the
    /// incoming batch would discard every previously indexed document, so
    /// the job escalates to a rebuild from the full catalogued corpus.
    async fn run_index_job(&self, filenames: &[String]) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        info!(files = filenames.len(), "indexing uploaded batch");

        let mut fresh = Vec::new();
        let mut merged_files = Vec::new();
        for name in filenames {
            match self.process_document(name).await {
                Ok(chunks) => {
                    fresh.extend(chunks);
                    merged_files.push(name.clone());
                }
                Err(e) => {
                    warn!(file = %name, error = %e, "skipping document");
                    self.set_status(name, JobStatus::Failed {
                        reason: e.to_string(),
                    })
                    .await;
                }
            }
        }

        if merged_files.is_empty() {
            return Ok(());
        }

        match self.index.load() {
            Ok(Some(mut index)) => {
                index.append(fresh);
                self.index.save(&index)?;
                info!(
                    files = merged_files.len(),
                    total_chunks = index.chunks.len(),
                    "merged batch into index artifact"
                );
                self.mark_succeeded(&merged_files).await;
            }
            Ok(None) => {
                let mut index = self.index.empty();
                index.append(fresh);
                self.index.save(&index)?;
                info!(
                    files = merged_files.len(),
                    total_chunks = index.chunks.len(),
                    "built fresh index artifact"
                );
                self.mark_succeeded(&merged_files).await;
            }
            Err(e) => {
                warn!(error = %e, "cannot merge into existing index; rebuilding from full corpus");
                self.rebuild_corpus().await?;
            }
        }

        Ok(())
    }

    /// Rebuild the artifact from every catalogued document.
    ///
    /// Caller must hold `write_lock`. An empty corpus removes the artifact
    /// entirely; queries then serve empty results.
    async fn rebuild_corpus(&self) -> Result<RebuildSummary> {
        let files = self.catalog.list().await?;
        if files.is_empty() {
            if self.index.remove()? {
                info!("corpus empty; removed index artifact");
            }
            return Ok(RebuildSummary::default());
        }

        let mut index = self.index.empty();
        let mut indexed = 0usize;
        for name in &files {
            match self.process_document(name).await {
                Ok(chunks) => {
                    index.append(chunks);
                    indexed += 1;
                    self.set_status(name, JobStatus::Succeeded).await;
                }
                Err(e) => {
                    warn!(file = %name, error = %e, "skipping document during rebuild");
                    self.set_status(name, JobStatus::Failed {
                        reason: e.to_string(),
                    })
                    .await;
                }
            }
        }

        let chunks = index.chunks.len();
        self.index.save(&index)?;
        info!(files = indexed, chunks, "rebuilt index artifact");
        Ok(RebuildSummary {
            files: indexed,
            chunks,
        })
    }

    /// Read, extract, chunk, and embed a single document.
    async fn process_document(&self, filename: &str) -> Result<Vec<Chunk>> {
        let bytes = self.blobs.read(filename)?;
        let pages = extract_pages(&bytes, filename)?;
        let drafts = chunk_pages(filename, &pages, &self.chunking);

        let mut chunks = Vec::with_capacity(drafts.len());
        for batch in drafts.chunks(self.embed_batch_size) {
            let texts: Vec<String> = batch.iter().map(|d| d.text.clone()).collect();
            let vectors = self.provider.embed(&texts).await?;
            if vectors.len() != batch.len() {
                bail!(
                    "provider returned {} vectors for {} texts",
                    vectors.len(),
                    batch.len()
                );
            }
            for (draft, embedding) in batch.iter().zip(vectors) {
                chunks.push(Chunk {
                    id: Uuid::new_v4().to_string(),
                    text: draft.text.clone(),
                    source: draft.source.clone(),
                    page: draft.page,
                    hash: draft.hash.clone(),
                    embedding,
                });
            }
        }
        Ok(chunks)
    }

    async fn set_status(&self, filename: &str, status: JobStatus) {
        let mut statuses = self.statuses.write().await;
        statuses.insert(filename.to_string(), status);
    }

    async fn mark_succeeded(&self, filenames: &[String]) {
        let mut statuses = self.statuses.write().await;
        for name in filenames {
            statuses.insert(name.clone(), JobStatus::Succeeded);
        }
    }

    /// Fail every filename still pending; statuses already resolved by the
    /// job body are left alone.
    async fn fail_pending(&self, filenames: &[String], reason: &str) {
        let mut statuses = self.statuses.write().await;
        for name in filenames {
            if statuses.get(name) == Some(&JobStatus::Pending) {
                statuses.insert(
                    name.clone(),
                    JobStatus::Failed {
                        reason: reason.to_string(),
                    },
                );
            }
        }
    }
}
