//! Registry of the configured catalog adapters.

use std::collections::HashMap;
use std::sync::Arc;

use super::{ArxivSource, BiorxivSource, PaperSource, PubMedSource, SourceError};
use crate::config::Config;
use crate::models::{PaperRecord, SourceType};
use crate::utils::{cache_from_config, ContentCache, HttpClient};

bitflags::bitflags! {
    /// Capabilities that a source can support
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SourceCapabilities: u32 {
        const SEARCH = 1 << 0;
        const FULL_TEXT = 1 << 1;
    }
}

/// Registry for all available sources
///
/// Exposes the two operations the rest of an application needs:
/// [`search`](SourceRegistry::search) and
/// [`get_full_text`](SourceRegistry::get_full_text). Neither fails; upstream
/// problems surface as empty or absent results.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    sources: HashMap<SourceType, Arc<dyn PaperSource>>,
}

impl SourceRegistry {
    /// An empty registry
    pub fn empty() -> Self {
        Self {
            sources: HashMap::new(),
        }
    }

    /// Build every adapter from configuration, with the cache it describes
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        Self::with_cache(config, cache_from_config(&config.cache))
    }

    /// Build every adapter from configuration, sharing one HTTP client and the given cache
    pub fn with_cache(config: &Config, cache: Arc<dyn ContentCache>) -> Result<Self, SourceError> {
        let client = HttpClient::from_config(&config.http)?;

        let mut registry = Self::empty();
        registry.register(Arc::new(ArxivSource::from_config(client.clone(), config)));
        registry.register(Arc::new(BiorxivSource::from_config(
            client.clone(),
            config,
            Arc::clone(&cache),
        )));
        registry.register(Arc::new(PubMedSource::from_config(client, config, cache)));

        Ok(registry)
    }

    /// Register a source, replacing any source of the same type
    pub fn register(&mut self, source: Arc<dyn PaperSource>) {
        self.sources.insert(source.source_type(), source);
    }

    /// Get a source by type
    pub fn get(&self, source: SourceType) -> Option<&Arc<dyn PaperSource>> {
        self.sources.get(&source)
    }

    /// Get all registered sources, in display order
    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn PaperSource>> {
        SourceType::ALL
            .into_iter()
            .filter_map(move |source| self.sources.get(&source))
    }

    /// Get sources that support a specific capability
    pub fn with_capability(&self, capability: SourceCapabilities) -> Vec<&Arc<dyn PaperSource>> {
        self.all()
            .filter(|s| s.capabilities().contains(capability))
            .collect()
    }

    /// Get the number of registered sources
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Search one catalog; an unregistered source yields no records
    pub async fn search(
        &self,
        source: SourceType,
        query: &str,
        max_results: usize,
    ) -> Vec<PaperRecord> {
        match self.get(source) {
            Some(adapter) => adapter.search(query, max_results).await,
            None => {
                tracing::warn!("Source '{}' is not registered", source);
                Vec::new()
            }
        }
    }

    /// Full text of a record, from the adapter that produced it
    pub async fn get_full_text(&self, record: &PaperRecord) -> Option<String> {
        let adapter = self.get(record.source)?;
        if !adapter.supports_full_text() {
            tracing::debug!("{} does not offer full text", adapter.name());
            return None;
        }
        adapter.get_full_text(record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::MemoryCache;

    fn registry() -> SourceRegistry {
        SourceRegistry::with_cache(&Config::default(), Arc::new(MemoryCache::default())).unwrap()
    }

    #[test]
    fn test_registry_basic() {
        let registry = registry();
        assert_eq!(registry.len(), 3);
        assert!(!registry.is_empty());
        assert!(SourceRegistry::empty().is_empty());
    }

    #[test]
    fn test_get_source() {
        let registry = registry();

        for source in SourceType::ALL {
            let adapter = registry.get(source).unwrap();
            assert_eq!(adapter.source_type(), source);
            assert_eq!(adapter.id(), source.id());
            assert_eq!(adapter.name(), source.name());
        }

        let ids: Vec<&str> = registry.all().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["arxiv", "biorxiv", "pubmed"]);
    }

    #[test]
    fn test_capabilities() {
        let registry = registry();

        assert_eq!(registry.with_capability(SourceCapabilities::SEARCH).len(), 3);

        let full_text: Vec<SourceType> = registry
            .with_capability(SourceCapabilities::FULL_TEXT)
            .iter()
            .map(|s| s.source_type())
            .collect();
        assert_eq!(full_text, vec![SourceType::BioRxiv, SourceType::PubMed]);
    }

    #[tokio::test]
    async fn test_unregistered_source_is_empty() {
        let registry = SourceRegistry::empty();
        assert!(registry.search(SourceType::Arxiv, "anything", 5).await.is_empty());

        let record = PaperRecord::new("2401.00001", SourceType::Arxiv);
        assert!(registry.get_full_text(&record).await.is_none());
    }

    #[tokio::test]
    async fn test_arxiv_full_text_is_absent() {
        let registry = registry();
        let record = PaperRecord::new("2401.00001", SourceType::Arxiv);
        assert!(registry.get_full_text(&record).await.is_none());
    }
}
