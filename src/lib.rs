//! # Doc Shelf
//!
//! A local-first document shelf: upload source documents, keep them indexed,
//! and query them semantically.
//!
//! The interesting part is not retrieval itself but keeping three
//! independently-mutable stores consistent under concurrent uploads, deletes,
//! and asynchronous indexing: a durable SQLite catalog of document
//! identities, a directory of raw document blobs, and a persisted vector
//! index artifact that supports only append or whole rebuild — never a
//! targeted delete.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐  register   ┌─────────┐        ┌─────────────┐
//! │ Upload / │────────────▶│ Catalog │◀──────▶│ Reconcile   │
//! │ Delete   │  save/del   ├─────────┤  repair└──────┬──────┘
//! │ (sync)   │────────────▶│  Blobs  │◀──────────────┘
//! └────┬─────┘             └─────────┘
//!      │ enqueue     ┌─────────────────────┐
//!      └────────────▶│ Coordinator          │  chunk ▸ embed ▸
//!                    │ (single-writer lock) │  merge / rebuild
//!                    └──────────┬───────────┘
//!                               ▼
//!                    ┌──────────────────────┐   ┌────────┐
//!                    │ Vector index artifact │◀──│ Query  │
//!                    │ (atomic publish)      │   └────────┘
//!                    └──────────────────────┘
//! ```
//!
//! Uploads and deletes mutate the catalog and blob store synchronously and
//! return at once; all index mutation happens on background tasks serialized
//! by the coordinator's writer lock. The reconciliation job repairs drift
//! between the three stores from ground truth (the blob directory).
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`catalog`] | Durable document catalog (dedup authority) |
//! | [`blobs`] | Raw content store |
//! | [`extract`] | Per-page text extraction |
//! | [`chunk`] | Overlapping window chunker |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Persisted vector index artifact |
//! | [`coordinator`] | Single-writer indexing coordinator |
//! | [`reconcile`] | Drift repair across the three stores |
//! | [`ingest`] | Upload / delete / list operations |
//! | [`search`] | Query entry points |
//! | [`server`] | JSON HTTP server |

pub mod blobs;
pub mod catalog;
pub mod chunk;
pub mod config;
pub mod coordinator;
pub mod embedding;
pub mod extract;
pub mod index;
pub mod ingest;
pub mod models;
pub mod reconcile;
pub mod search;
pub mod server;
