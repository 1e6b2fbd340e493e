//! Query entry points.
//!
//! The retrieval boundary consumed by answer/summary generators and the CLI:
//! everything outside this crate reaches the vector index only through
//! [`query_documents`] (or the HTTP wrapper around it).

use anyhow::Result;
use std::collections::HashSet;

use crate::coordinator::Coordinator;
use crate::models::SearchHit;

/// Semantic query over the indexed corpus.
///
/// `filter` restricts results to the given source filenames; `None` searches
/// everything. Results come back nearest first.
pub async fn query_documents(
    coordinator: &Coordinator,
    text: &str,
    k: usize,
    filter: Option<&HashSet<String>>,
) -> Result<Vec<SearchHit>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    coordinator.query(text, k, filter).await
}

/// CLI query command: print ranked hits.
pub async fn run_query(
    coordinator: &Coordinator,
    text: &str,
    k: usize,
    documents: Vec<String>,
) -> Result<()> {
    let filter: Option<HashSet<String>> = if documents.is_empty() {
        None
    } else {
        Some(documents.into_iter().collect())
    };

    let hits = query_documents(coordinator, text, k, filter.as_ref()).await?;

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        println!("{}. [{:.3}] {} (page {})", i + 1, hit.score, hit.source, hit.page);
        println!("    excerpt: \"{}\"", snippet(&hit.text, 160));
        println!();
    }

    Ok(())
}

fn snippet(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ");
    let trimmed = flat.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}
