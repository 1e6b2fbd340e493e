//! Persisted vector index artifact.
//!
//! The index is one JSON artifact holding every embedded chunk together with
//! the model identity the vectors were produced under. The structure supports
//! exactly two mutations — append and rebuild-from-scratch — and no targeted
//! delete; removing a document's chunks requires rebuilding from the
//! remaining corpus.
//!
//! # Persistence discipline
//!
//! Writes are atomic from a reader's perspective: the artifact is serialized
//! to a sibling `.tmp` file and published with `fs::rename`, so a concurrent
//! reader sees either the old artifact or the new one, never a partial write.
//!
//! # Load failures
//!
//! A missing artifact is not an error (`Ok(None)`); an unreadable or
//! unparsable one, or one built under a different embedding model, is an
//! [`IndexLoadError`]. Callers must treat a load failure during a merge as a
//! signal to rebuild from the full corpus — building from only the incoming
//! batch would silently drop every previously indexed document.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;

use crate::embedding::cosine_similarity;
use crate::models::{Chunk, SearchHit};

const INDEX_FORMAT_VERSION: u32 = 1;

/// Artifact load failure. Both variants demand a full-corpus rebuild.
#[derive(Debug)]
pub enum IndexLoadError {
    Corrupt(String),
    ModelMismatch { expected: String, found: String },
}

impl std::fmt::Display for IndexLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexLoadError::Corrupt(e) => write!(f, "index artifact unreadable: {}", e),
            IndexLoadError::ModelMismatch { expected, found } => write!(
                f,
                "index built under model '{}' but provider is '{}'",
                found, expected
            ),
        }
    }
}

impl std::error::Error for IndexLoadError {}

/// In-memory form of the artifact.
#[derive(Debug, Serialize, Deserialize)]
pub struct VectorIndex {
    pub version: u32,
    pub model: String,
    pub dims: usize,
    pub chunks: Vec<Chunk>,
}

impl VectorIndex {
    pub fn new(model: &str, dims: usize) -> Self {
        Self {
            version: INDEX_FORMAT_VERSION,
            model: model.to_string(),
            dims,
            chunks: Vec::new(),
        }
    }

    pub fn append(&mut self, chunks: Vec<Chunk>) {
        self.chunks.extend(chunks);
    }

    /// Distinct source filenames present in the index.
    pub fn filenames(&self) -> BTreeSet<String> {
        self.chunks.iter().map(|c| c.source.clone()).collect()
    }

    /// Nearest-neighbor query, best score first.
    ///
    /// The structure has no native per-document restriction, so a filename
    /// filter is applied as a post-filter over an over-fetched candidate set
    /// (`k × overfetch` candidates before filtering).
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&HashSet<String>>,
        overfetch: usize,
    ) -> Vec<SearchHit> {
        let mut scored: Vec<(f32, &Chunk)> = self
            .chunks
            .iter()
            .map(|chunk| (cosine_similarity(query, &chunk.embedding), chunk))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let candidate_count = match filter {
            Some(_) => k.saturating_mul(overfetch.max(1)),
            None => k,
        };

        scored
            .into_iter()
            .take(candidate_count)
            .filter(|(_, chunk)| filter.map_or(true, |set| set.contains(&chunk.source)))
            .take(k)
            .map(|(score, chunk)| SearchHit {
                text: chunk.text.clone(),
                source: chunk.source.clone(),
                page: chunk.page,
                score,
            })
            .collect()
    }
}

/// Handle to the on-disk artifact, bound to the pinned embedding model.
#[derive(Clone)]
pub struct IndexFile {
    path: PathBuf,
    model: String,
    dims: usize,
}

impl IndexFile {
    pub fn new(path: impl Into<PathBuf>, model: &str, dims: usize) -> Self {
        Self {
            path: path.into(),
            model: model.to_string(),
            dims,
        }
    }

    /// A fresh, empty index under the pinned model.
    pub fn empty(&self) -> VectorIndex {
        VectorIndex::new(&self.model, self.dims)
    }

    /// Load the persisted artifact.
    ///
    /// `Ok(None)` means no artifact exists yet. Any other failure — I/O,
    /// parse, format version, or a model/dims mismatch — is an
    /// [`IndexLoadError`] and must escalate to a full rebuild.
    pub fn load(&self) -> Result<Option<VectorIndex>, IndexLoadError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(IndexLoadError::Corrupt(e.to_string())),
        };

        let index: VectorIndex = serde_json::from_slice(&bytes)
            .map_err(|e| IndexLoadError::Corrupt(e.to_string()))?;

        if index.version != INDEX_FORMAT_VERSION {
            return Err(IndexLoadError::Corrupt(format!(
                "unsupported artifact version {}",
                index.version
            )));
        }
        if index.model != self.model || index.dims != self.dims {
            return Err(IndexLoadError::ModelMismatch {
                expected: self.model.clone(),
                found: index.model,
            });
        }

        Ok(Some(index))
    }

    /// Atomically publish the artifact: write a sibling tmp file, then rename.
    pub fn save(&self, index: &VectorIndex) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let bytes = serde_json::to_vec(index)?;
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Delete the artifact; returns whether a file was removed.
    pub fn remove(&self) -> anyhow::Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn chunk(source: &str, text: &str, embedding: Vec<f32>) -> Chunk {
        Chunk {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.to_string(),
            source: source.to_string(),
            page: 1,
            hash: "h".to_string(),
            embedding,
        }
    }

    fn index_file(tmp: &TempDir) -> IndexFile {
        IndexFile::new(tmp.path().join("index").join("vectors.json"), "test-model", 3)
    }

    #[test]
    fn missing_artifact_loads_as_none() {
        let tmp = TempDir::new().unwrap();
        assert!(index_file(&tmp).load().unwrap().is_none());
    }

    #[test]
    fn save_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let file = index_file(&tmp);

        let mut index = file.empty();
        index.append(vec![chunk("a.txt", "alpha", vec![1.0, 0.0, 0.0])]);
        file.save(&index).unwrap();

        let loaded = file.load().unwrap().unwrap();
        assert_eq!(loaded.chunks.len(), 1);
        assert_eq!(loaded.chunks[0].source, "a.txt");
        assert_eq!(loaded.model, "test-model");
    }

    #[test]
    fn save_leaves_no_tmp_file_behind() {
        let tmp = TempDir::new().unwrap();
        let file = index_file(&tmp);
        file.save(&file.empty()).unwrap();

        let dir = tmp.path().join("index");
        let leftovers: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(leftovers, vec!["vectors.json".to_string()]);
    }

    #[test]
    fn corrupt_artifact_is_a_load_error() {
        let tmp = TempDir::new().unwrap();
        let file = index_file(&tmp);
        std::fs::create_dir_all(tmp.path().join("index")).unwrap();
        std::fs::write(tmp.path().join("index").join("vectors.json"), b"not json").unwrap();

        assert!(matches!(file.load(), Err(IndexLoadError::Corrupt(_))));
    }

    #[test]
    fn model_change_is_a_load_error() {
        let tmp = TempDir::new().unwrap();
        let old = IndexFile::new(tmp.path().join("index").join("vectors.json"), "old-model", 3);
        old.save(&old.empty()).unwrap();

        let new = index_file(&tmp);
        assert!(matches!(
            new.load(),
            Err(IndexLoadError::ModelMismatch { .. })
        ));
    }

    #[test]
    fn search_ranks_by_similarity() {
        let mut index = VectorIndex::new("test-model", 3);
        index.append(vec![
            chunk("a.txt", "close", vec![1.0, 0.0, 0.0]),
            chunk("b.txt", "far", vec![0.0, 1.0, 0.0]),
            chunk("c.txt", "closer", vec![0.9, 0.1, 0.0]),
        ]);

        let hits = index.search(&[1.0, 0.0, 0.0], 2, None, 4);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].source, "a.txt");
        assert_eq!(hits[1].source, "c.txt");
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn filename_filter_post_filters_candidates() {
        let mut index = VectorIndex::new("test-model", 3);
        index.append(vec![
            chunk("a.txt", "best", vec![1.0, 0.0, 0.0]),
            chunk("b.txt", "second", vec![0.9, 0.1, 0.0]),
            chunk("b.txt", "third", vec![0.5, 0.5, 0.0]),
        ]);

        let filter: HashSet<String> = ["b.txt".to_string()].into_iter().collect();
        let hits = index.search(&[1.0, 0.0, 0.0], 2, Some(&filter), 4);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.source == "b.txt"));
    }

    #[test]
    fn filenames_are_distinct() {
        let mut index = VectorIndex::new("test-model", 3);
        index.append(vec![
            chunk("a.txt", "one", vec![1.0, 0.0, 0.0]),
            chunk("a.txt", "two", vec![0.0, 1.0, 0.0]),
            chunk("b.txt", "three", vec![0.0, 0.0, 1.0]),
        ]);
        let names: Vec<String> = index.filenames().into_iter().collect();
        assert_eq!(names, vec!["a.txt".to_string(), "b.txt".to_string()]);
    }

    #[test]
    fn remove_reports_presence() {
        let tmp = TempDir::new().unwrap();
        let file = index_file(&tmp);
        file.save(&file.empty()).unwrap();
        assert!(file.remove().unwrap());
        assert!(!file.remove().unwrap());
    }
}
