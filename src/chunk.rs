//! Fixed-window overlapping text chunker.
//!
//! Splits each page of a document into character windows (window 1000,
//! overlap 100 by default). Windows overlap so context that straddles a
//! boundary stays retrievable; splitting is character-based and may cut
//! mid-word, an accepted simplicity tradeoff.
//!
//! Chunking is deterministic: the same page text and policy always produce
//! the same windows, so a document's chunk set can be regenerated wholesale
//! on every re-index. Each window carries a SHA-256 hash of its text.

use sha2::{Digest, Sha256};

use crate::config::ChunkingConfig;
use crate::models::ChunkDraft;

/// Split per-page text into overlapping windows for one document.
///
/// Page numbers are 1-based. Whitespace-only windows are dropped.
pub fn chunk_pages(source: &str, pages: &[String], policy: &ChunkingConfig) -> Vec<ChunkDraft> {
    let mut drafts = Vec::new();
    for (page_idx, page) in pages.iter().enumerate() {
        let page_number = (page_idx + 1) as u32;
        for window in split_windows(page, policy.window_chars, policy.overlap_chars) {
            let trimmed = window.trim();
            if trimmed.is_empty() {
                continue;
            }
            drafts.push(make_draft(source, page_number, trimmed));
        }
    }
    drafts
}

/// Cut `text` into windows of `window` chars advancing by `window - overlap`.
///
/// Boundaries are character boundaries, never byte offsets, so multi-byte
/// text cannot be split mid-codepoint. The final window ends exactly at the
/// end of the text; no trailing fragment shorter than the overlap is emitted
/// twice.
fn split_windows(text: &str, window: usize, overlap: usize) -> Vec<&str> {
    debug_assert!(window > overlap);

    // Byte offset of every char boundary, plus the end of the text.
    let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    boundaries.push(text.len());
    let total_chars = boundaries.len() - 1;

    if total_chars == 0 {
        return Vec::new();
    }
    if total_chars <= window {
        return vec![text];
    }

    let stride = window - overlap;
    let mut windows = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + window).min(total_chars);
        windows.push(&text[boundaries[start]..boundaries[end]]);
        if end == total_chars {
            break;
        }
        start += stride;
    }
    windows
}

fn make_draft(source: &str, page: u32, text: &str) -> ChunkDraft {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    ChunkDraft {
        text: text.to_string(),
        source: source.to_string(),
        page,
        hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(window: usize, overlap: usize) -> ChunkingConfig {
        ChunkingConfig {
            window_chars: window,
            overlap_chars: overlap,
        }
    }

    #[test]
    fn short_page_is_single_chunk() {
        let pages = vec!["Hello, world!".to_string()];
        let drafts = chunk_pages("a.txt", &pages, &policy(1000, 100));
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].text, "Hello, world!");
        assert_eq!(drafts[0].page, 1);
        assert_eq!(drafts[0].source, "a.txt");
    }

    #[test]
    fn consecutive_windows_share_the_overlap_region() {
        let text: String = (0..25).map(|i| format!("word{:03} ", i)).collect();
        let windows = split_windows(&text, 50, 10);
        assert!(windows.len() > 1);

        for pair in windows.windows(2) {
            let head_tail: String = pair[0].chars().skip(50 - 10).collect();
            assert!(
                pair[1].starts_with(&head_tail),
                "window {:?} does not continue {:?}",
                pair[1],
                pair[0]
            );
        }
    }

    #[test]
    fn windows_cover_the_entire_page() {
        let text: String = (0..500).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let windows = split_windows(&text, 120, 20);
        // stride 100: windows start at 0, 100, 200, 300, 400.
        assert_eq!(windows.len(), 5);
        assert_eq!(windows[0].len(), 120);
        assert_eq!(windows[4].len(), 100);
        assert!(text.starts_with(windows[0]));
        assert!(text.ends_with(windows[4]));
    }

    #[test]
    fn multibyte_text_never_splits_mid_codepoint() {
        let text = "é".repeat(300);
        let windows = split_windows(&text, 100, 10);
        assert!(windows.len() > 1);
        // Slicing mid-codepoint would have panicked inside split_windows;
        // verify every window still decodes cleanly.
        for w in &windows {
            assert!(w.chars().count() <= 100);
            assert!(w.chars().all(|c| c == 'é'));
        }
    }

    #[test]
    fn page_numbers_are_one_based_and_sequential() {
        let pages = vec!["first page".to_string(), "second page".to_string()];
        let drafts = chunk_pages("a.txt", &pages, &policy(1000, 100));
        assert_eq!(drafts[0].page, 1);
        assert_eq!(drafts[1].page, 2);
    }

    #[test]
    fn whitespace_windows_are_dropped() {
        let pages = vec!["   \n\t  ".to_string()];
        let drafts = chunk_pages("a.txt", &pages, &policy(1000, 100));
        assert!(drafts.is_empty());
    }

    #[test]
    fn chunking_is_deterministic() {
        let pages = vec!["alpha beta gamma delta epsilon".repeat(60)];
        let a = chunk_pages("a.txt", &pages, &policy(200, 40));
        let b = chunk_pages("a.txt", &pages, &policy(200, 40));
        assert_eq!(a, b);
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.hash, y.hash);
        }
    }
}
