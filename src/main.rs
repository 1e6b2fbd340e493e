//! # Doc Shelf CLI (`shelf`)
//!
//! The `shelf` binary is the primary interface for Doc Shelf. It provides
//! commands for initializing storage, uploading and deleting documents,
//! semantic queries, background job inspection, drift reconciliation, and
//! starting the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! shelf --config ./shelf.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `shelf init` | Create the storage layout (catalog, blob dir) |
//! | `shelf upload <paths...>` | Upload documents and index them |
//! | `shelf list` | List catalogued documents |
//! | `shelf delete <filename>` | Delete a document and rebuild the index |
//! | `shelf query "<text>"` | Query the indexed corpus |
//! | `shelf status` | Audit the three stores and show drift |
//! | `shelf reconcile` | Repair drift between files, catalog, and index |
//! | `shelf serve` | Start the JSON HTTP server |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use doc_shelf::config::{self, Config};
use doc_shelf::coordinator::Coordinator;
use doc_shelf::embedding;
use doc_shelf::models::JobStatus;
use doc_shelf::{ingest, reconcile, search, server};

/// Doc Shelf — a local-first document shelf with semantic retrieval.
#[derive(Parser)]
#[command(
    name = "shelf",
    about = "Doc Shelf — upload documents, keep them indexed, query them semantically",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Defaults apply when the file does
    /// not exist.
    #[arg(long, global = true, default_value = "./shelf.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the storage layout.
    ///
    /// Creates the data directory, the catalog database, and the blob
    /// directory. Idempotent — running it multiple times is safe.
    Init,

    /// Upload one or more documents.
    ///
    /// Registers each file in the catalog (duplicates are skipped), stores
    /// the raw bytes, and indexes the batch. The command waits for indexing
    /// to finish before exiting.
    Upload {
        /// Paths of the documents to upload (.pdf, .txt, .md).
        paths: Vec<PathBuf>,
    },

    /// List catalogued documents, newest first.
    List,

    /// Delete a document and rebuild the search index without it.
    Delete {
        /// Catalogued filename, as shown by `shelf list`.
        filename: String,
    },

    /// Query the indexed corpus.
    Query {
        /// The query text.
        text: String,

        /// Number of results to return.
        #[arg(long)]
        k: Option<usize>,

        /// Restrict results to these filenames (repeatable).
        #[arg(long = "doc")]
        documents: Vec<String>,
    },

    /// Audit the three stores: blob files, catalog rows, index contents.
    Status,

    /// Repair drift between the blob directory, catalog, and index.
    Reconcile,

    /// Start the JSON HTTP server.
    Serve,
}

fn load_or_default(path: &PathBuf) -> Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        Ok(Config::default())
    }
}

async fn open_coordinator(cfg: &Config) -> Result<Coordinator> {
    let provider = embedding::create_provider(&cfg.embedding)?;
    Coordinator::open(cfg, provider).await
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doc_shelf=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let cfg = load_or_default(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let _ = open_coordinator(&cfg).await?;
            println!("Storage initialized at {}", cfg.storage.root.display());
        }
        Commands::Upload { paths } => {
            if paths.is_empty() {
                anyhow::bail!("No files provided");
            }
            let coordinator = open_coordinator(&cfg).await?;

            let mut files = Vec::with_capacity(paths.len());
            for path in &paths {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .ok_or_else(|| anyhow::anyhow!("Not a file path: {}", path.display()))?;
                let bytes = std::fs::read(path)?;
                files.push((name, bytes));
            }

            let outcome = ingest::upload_documents(&coordinator, files).await?;

            println!("upload");
            println!("  accepted: {}", outcome.accepted.len());
            for name in &outcome.accepted {
                println!("    + {}", name);
            }
            if !outcome.duplicates.is_empty() {
                println!("  skipped duplicates: {}", outcome.duplicates.join(", "));
            }
            for (name, reason) in &outcome.rejected {
                println!("  rejected: {} ({})", name, reason);
            }

            // The HTTP surface returns before indexing finishes; a one-shot
            // CLI process would orphan the task, so wait for it here.
            if let Some(job) = outcome.job {
                println!("  indexing...");
                let _ = job.await;
                let statuses = coordinator.statuses().await;
                for name in &outcome.accepted {
                    match statuses.get(name) {
                        Some(JobStatus::Succeeded) => println!("    indexed {}", name),
                        Some(JobStatus::Failed { reason }) => {
                            println!("    failed {} ({})", name, reason)
                        }
                        _ => println!("    pending {}", name),
                    }
                }
            }
            println!("ok");
        }
        Commands::List => {
            let coordinator = open_coordinator(&cfg).await?;
            let documents = ingest::list_documents(&coordinator).await?;
            if documents.is_empty() {
                println!("No documents.");
            } else {
                for name in documents {
                    println!("{}", name);
                }
            }
        }
        Commands::Delete { filename } => {
            let coordinator = open_coordinator(&cfg).await?;
            let outcome = ingest::delete_document(&coordinator, &filename).await?;
            if !outcome.removed {
                anyhow::bail!("Unknown document: {}", filename);
            }
            println!("deleted {}", filename);
            if let Some(job) = outcome.job {
                println!("rebuilding index...");
                let _ = job.await;
            }
            println!("ok");
        }
        Commands::Query { text, k, documents } => {
            let coordinator = open_coordinator(&cfg).await?;
            let k = k.unwrap_or(cfg.retrieval.default_k);
            search::run_query(&coordinator, &text, k, documents).await?;
        }
        Commands::Status => {
            let coordinator = open_coordinator(&cfg).await?;

            let records = coordinator.catalog().records().await?;
            println!("catalog: {} document(s)", records.len());
            for record in &records {
                let when = chrono::DateTime::from_timestamp(record.uploaded_at, 0)
                    .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_default();
                println!("  {} (uploaded {})", record.filename, when);
            }

            let blobs = coordinator.blobs().list()?;
            println!("blob store: {} file(s)", blobs.len());

            let indexed = coordinator.index_filenames();
            println!("index: {} document(s)", indexed.len());

            let catalog_set: std::collections::BTreeSet<String> =
                records.into_iter().map(|r| r.filename).collect();
            let blob_set: std::collections::BTreeSet<String> = blobs.into_iter().collect();
            for name in blob_set.difference(&catalog_set) {
                println!("  drift: {} on disk but not catalogued", name);
            }
            for name in catalog_set.difference(&blob_set) {
                println!("  drift: {} catalogued but missing on disk", name);
            }
            for name in indexed.difference(&catalog_set) {
                println!("  drift: {} indexed but not catalogued", name);
            }
            for name in catalog_set.difference(&indexed) {
                println!("  lagging: {} catalogued but not yet searchable", name);
            }
        }
        Commands::Reconcile => {
            let coordinator = open_coordinator(&cfg).await?;
            let report = reconcile::reconcile(&coordinator).await?;
            println!("reconcile");
            println!("  added to catalog: {}", report.added_to_catalog.len());
            for name in &report.added_to_catalog {
                println!("    + {}", name);
            }
            println!("  removed from catalog: {}", report.removed_from_catalog.len());
            for name in &report.removed_from_catalog {
                println!("    - {}", name);
            }
            println!(
                "  indexed: {} files, {} chunks",
                report.indexed_files, report.indexed_chunks
            );
            println!("ok");
        }
        Commands::Serve => {
            let coordinator = open_coordinator(&cfg).await?;
            server::run_server(&cfg, coordinator).await?;
        }
    }

    Ok(())
}
