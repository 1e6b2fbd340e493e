//! Shared test harness: an isolated data root plus a deterministic
//! embedding provider, so the full pipeline runs without any network.

use async_trait::async_trait;
use std::sync::Arc;
use tempfile::TempDir;

use doc_shelf::config::Config;
use doc_shelf::coordinator::Coordinator;
use doc_shelf::embedding::EmbeddingProvider;

/// Fixed vocabulary; one embedding dimension per word.
pub const VOCAB: &[&str] = &[
    "zebra", "quantum", "glacier", "magnet", "violin", "orchid", "turbine", "comet",
];

/// Counts vocabulary occurrences per text. Two texts sharing a word get a
/// positive cosine similarity; texts with disjoint vocabulary score zero.
pub struct KeywordProvider;

#[async_trait]
impl EmbeddingProvider for KeywordProvider {
    fn model_name(&self) -> &str {
        "keyword-count-v1"
    }

    fn dims(&self) -> usize {
        VOCAB.len()
    }

    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                VOCAB
                    .iter()
                    .map(|word| lower.matches(word).count() as f32)
                    .collect()
            })
            .collect())
    }
}

/// A coordinator over a fresh temp data root.
pub async fn open_shelf() -> (TempDir, Config, Coordinator) {
    let tmp = TempDir::new().unwrap();
    let config = Config::for_root(tmp.path());
    let coordinator = Coordinator::open(&config, Arc::new(KeywordProvider))
        .await
        .unwrap();
    (tmp, config, coordinator)
}

/// Document bytes built around one vocabulary word.
pub fn doc_about(word: &str) -> Vec<u8> {
    format!(
        "Field notes on the {word}.\n\nThe {word} appears repeatedly in this text: {word}, {word}.\n",
        word = word
    )
    .into_bytes()
}
