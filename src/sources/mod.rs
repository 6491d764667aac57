//! Catalog adapters behind a common trait.
//!
//! Each supported catalog implements [`PaperSource`]:
//!
//! - `arxiv` - arXiv Atom API (search only)
//! - `biorxiv` - bioRxiv details API with client-side filtering, JATS full text
//! - `pubmed` - NCBI E-utilities, full text through PubMed Central
//!
//! Adapters own their request pacing ([`RateLimiter`](crate::utils::RateLimiter))
//! and receive the shared [`ContentCache`] by injection. Errors are kept inside
//! the adapter as [`SourceError`] and absorbed at the trait boundary: a failed
//! search is an empty list, a failed full-text lookup is `None`.

mod arxiv;
mod biorxiv;
mod pubmed;
mod registry;

pub use arxiv::ArxivSource;
pub use biorxiv::BiorxivSource;
pub use pubmed::PubMedSource;
pub use registry::{SourceCapabilities, SourceRegistry};

use crate::models::{PaperRecord, SourceType};
use crate::utils::{extract_text, ContentCache, Document};
use async_trait::async_trait;
use std::future::Future;

/// Interface shared by all catalog adapters.
///
/// # Implementing a New Source
///
/// 1. Create a struct holding an [`HttpClient`](crate::utils::HttpClient) and a
///    [`RateLimiter`](crate::utils::RateLimiter)
/// 2. Implement `source_type`, `search`, and `capabilities`
/// 3. Override `get_full_text` if the catalog serves structured full text
/// 4. Register it in [`SourceRegistry`]
#[async_trait]
pub trait PaperSource: Send + Sync + std::fmt::Debug {
    /// Fixed identity of this adapter; every record it returns carries it
    fn source_type(&self) -> SourceType;

    /// Unique identifier for this source (e.g. "arxiv", "pubmed")
    fn id(&self) -> &str {
        self.source_type().id()
    }

    /// Human-readable name of this source
    fn name(&self) -> &str {
        self.source_type().name()
    }

    /// Describe the capabilities of this source
    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH
    }

    /// Whether this source can return full text
    fn supports_full_text(&self) -> bool {
        self.capabilities().contains(SourceCapabilities::FULL_TEXT)
    }

    /// Search the catalog; upstream failures yield an empty list
    async fn search(&self, query: &str, max_results: usize) -> Vec<PaperRecord>;

    /// Fetch the body text of a record; `None` when unsupported or unavailable
    async fn get_full_text(&self, _record: &PaperRecord) -> Option<String> {
        None
    }
}

/// Errors that can occur when talking to a catalog
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (XML, JSON, Atom)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Upstream answered with a non-success status or an error payload
    #[error("API error: {0}")]
    Api(String),

    /// Paper or cross-reference not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// IO error (file system)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

impl From<crate::utils::ExtractError> for SourceError {
    fn from(err: crate::utils::ExtractError) -> Self {
        SourceError::Parse(format!("Document: {}", err))
    }
}

/// Parse a JATS payload and flatten it to text
pub(crate) fn jats_to_text(xml: &str) -> Result<String, SourceError> {
    let document = Document::from_jats(xml)?;
    Ok(extract_text(&document))
}

/// Serve full text from the cache, or fetch it and cache a non-empty result.
///
/// Every failure of `fetch` is logged and reported as `None`.
pub(crate) async fn fetch_full_text_cached<F, Fut>(
    cache: &dyn ContentCache,
    record: &PaperRecord,
    fetch: F,
) -> Option<String>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Option<String>, SourceError>>,
{
    let key = record.cache_key();

    if let Some(content) = cache.get(&key) {
        return Some(content);
    }

    match fetch().await {
        Ok(Some(content)) if !content.trim().is_empty() => {
            cache.put(&key, &content);
            Some(content)
        }
        Ok(_) => {
            tracing::debug!("No full text available for {}", key);
            None
        }
        Err(e) => {
            tracing::warn!("Full text fetch failed for {}: {}", key, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::MemoryCache;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_source_capabilities() {
        let caps = SourceCapabilities::SEARCH | SourceCapabilities::FULL_TEXT;

        assert!(caps.contains(SourceCapabilities::SEARCH));
        assert!(caps.contains(SourceCapabilities::FULL_TEXT));
        assert!(!SourceCapabilities::SEARCH.contains(SourceCapabilities::FULL_TEXT));
    }

    #[tokio::test]
    async fn test_cached_fetch_only_hits_network_once() {
        let cache = MemoryCache::default();
        let record = PaperRecord::new("12345", SourceType::PubMed);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let text = fetch_full_text_cached(&cache, &record, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Some("body".to_string()))
            })
            .await;
            assert_eq!(text.as_deref(), Some("body"));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get("PubMed_12345").as_deref(), Some("body"));
    }

    #[tokio::test]
    async fn test_failures_and_empty_results_are_not_cached() {
        let cache = MemoryCache::default();
        let record = PaperRecord::new("10.1101/x", SourceType::BioRxiv);

        let failed = fetch_full_text_cached(&cache, &record, || async {
            Err(SourceError::Network("down".to_string()))
        })
        .await;
        assert!(failed.is_none());

        let empty = fetch_full_text_cached(&cache, &record, || async {
            Ok(Some("   ".to_string()))
        })
        .await;
        assert!(empty.is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_jats_to_text() {
        let text = jats_to_text("<article><front><article-title>T</article-title></front></article>")
            .unwrap();
        assert_eq!(text, "T");
        assert!(jats_to_text("<article><p>").is_err());
    }
}
