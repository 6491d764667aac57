//! Paper record model shared by every catalog adapter.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Placeholder used when upstream omits a title
pub const NO_TITLE: &str = "No title";
/// Placeholder used when upstream omits the author list
pub const NO_AUTHORS: &str = "No authors";
/// Placeholder used when upstream omits the abstract
pub const NO_ABSTRACT: &str = "No abstract available";
/// Placeholder used when the publication date is missing or unparsable
pub const UNKNOWN_DATE: &str = "Unknown date";

/// The catalog a paper record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
    #[serde(rename = "arXiv")]
    Arxiv,
    #[serde(rename = "bioRxiv")]
    BioRxiv,
    #[serde(rename = "PubMed")]
    PubMed,
}

impl SourceType {
    /// All supported catalogs, in display order
    pub const ALL: [SourceType; 3] = [SourceType::Arxiv, SourceType::BioRxiv, SourceType::PubMed];

    /// Returns the display name of the source
    pub fn name(&self) -> &'static str {
        match self {
            SourceType::Arxiv => "arXiv",
            SourceType::BioRxiv => "bioRxiv",
            SourceType::PubMed => "PubMed",
        }
    }

    /// Returns the source identifier (for CLI arguments and config keys)
    pub fn id(&self) -> &'static str {
        match self {
            SourceType::Arxiv => "arxiv",
            SourceType::BioRxiv => "biorxiv",
            SourceType::PubMed => "pubmed",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Error returned when a string names no known source
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown source: {0}")]
pub struct UnknownSource(pub String);

impl FromStr for SourceType {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        SourceType::ALL
            .into_iter()
            .find(|source| source.id() == wanted)
            .ok_or_else(|| UnknownSource(s.to_string()))
    }
}

/// A paper found in one of the supported catalogs
///
/// Every adapter maps its upstream payload into this shape so callers can
/// treat all catalogs uniformly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Source-scoped identifier (arXiv entry id, DOI, or PMID).
    /// May be empty for bioRxiv entries without a DOI.
    pub id: String,

    /// Paper title
    pub title: String,

    /// Authors (comma-separated)
    pub authors: String,

    /// Abstract text
    pub summary: String,

    /// Publication date (`YYYY-MM-DD` where known, else [`UNKNOWN_DATE`] or the upstream string)
    pub published: String,

    /// PDF (or landing page) URL
    pub pdf_url: String,

    /// Catalog the record came from
    pub source: SourceType,

    /// Primary subject category
    pub primary_category: String,

    /// All subject categories, in upstream order
    pub categories: Vec<String>,

    /// Upstream payload, kept for traceability only
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub raw_data: serde_json::Value,

    /// PubMed Central identifier (`PMC…`), only for PubMed records with a cross-reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pmc_id: Option<String>,
}

impl PaperRecord {
    /// Create a record with the required fields and placeholder metadata
    pub fn new(id: impl Into<String>, source: SourceType) -> Self {
        Self {
            id: id.into(),
            title: NO_TITLE.to_string(),
            authors: String::new(),
            summary: NO_ABSTRACT.to_string(),
            published: UNKNOWN_DATE.to_string(),
            pdf_url: String::new(),
            source,
            primary_category: String::new(),
            categories: Vec::new(),
            raw_data: serde_json::Value::Null,
            pmc_id: None,
        }
    }

    /// Key under which this record's full text is cached
    pub fn cache_key(&self) -> String {
        format!("{}_{}", self.source.name(), self.id)
    }

    /// Whether a full-text lookup has any chance of succeeding without a network round trip
    /// to resolve identifiers first.
    pub fn has_full_text_hint(&self) -> bool {
        match self.source {
            SourceType::Arxiv => false,
            SourceType::BioRxiv => !self.id.is_empty(),
            SourceType::PubMed => !self.id.is_empty() && self.pmc_id.is_some(),
        }
    }
}

/// Builder for constructing PaperRecord objects
#[derive(Debug, Clone)]
pub struct PaperRecordBuilder {
    record: PaperRecord,
}

impl PaperRecordBuilder {
    /// Create a new builder with required fields
    pub fn new(id: impl Into<String>, source: SourceType) -> Self {
        Self {
            record: PaperRecord::new(id, source),
        }
    }

    /// Set title
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.record.title = title.into();
        self
    }

    /// Set authors
    pub fn authors(mut self, authors: impl Into<String>) -> Self {
        self.record.authors = authors.into();
        self
    }

    /// Set abstract
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.record.summary = summary.into();
        self
    }

    /// Set publication date
    pub fn published(mut self, published: impl Into<String>) -> Self {
        self.record.published = published.into();
        self
    }

    /// Set PDF URL
    pub fn pdf_url(mut self, url: impl Into<String>) -> Self {
        self.record.pdf_url = url.into();
        self
    }

    /// Set the primary category and the full category list
    pub fn categories(mut self, primary: impl Into<String>, categories: Vec<String>) -> Self {
        self.record.primary_category = primary.into();
        self.record.categories = categories;
        self
    }

    /// Attach the upstream payload
    pub fn raw_data(mut self, raw: serde_json::Value) -> Self {
        self.record.raw_data = raw;
        self
    }

    /// Set the PubMed Central cross-reference
    pub fn pmc_id(mut self, pmc_id: Option<String>) -> Self {
        self.record.pmc_id = pmc_id;
        self
    }

    /// Build the PaperRecord
    pub fn build(self) -> PaperRecord {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builder() {
        let record = PaperRecordBuilder::new("2301.12345v1", SourceType::Arxiv)
            .title("Test Paper")
            .authors("John Doe, Jane Smith")
            .summary("This is a test abstract.")
            .published("2023-01-15")
            .categories("cs.AI", vec!["cs.AI".to_string(), "cs.LG".to_string()])
            .build();

        assert_eq!(record.id, "2301.12345v1");
        assert_eq!(record.title, "Test Paper");
        assert_eq!(record.primary_category, "cs.AI");
        assert_eq!(record.categories.len(), 2);
        assert!(record.pmc_id.is_none());
    }

    #[test]
    fn test_placeholders() {
        let record = PaperRecord::new("", SourceType::BioRxiv);
        assert_eq!(record.title, NO_TITLE);
        assert_eq!(record.summary, NO_ABSTRACT);
        assert_eq!(record.published, UNKNOWN_DATE);
        assert!(!record.has_full_text_hint());
    }

    #[test]
    fn test_cache_key_is_namespaced() {
        let biorxiv = PaperRecord::new("10.1101/2024.01.01.123456", SourceType::BioRxiv);
        let pubmed = PaperRecord::new("12345", SourceType::PubMed);

        assert_eq!(biorxiv.cache_key(), "bioRxiv_10.1101/2024.01.01.123456");
        assert_eq!(pubmed.cache_key(), "PubMed_12345");
    }

    #[test]
    fn test_source_type_parse_and_serde() {
        assert_eq!("arxiv".parse::<SourceType>().unwrap(), SourceType::Arxiv);
        assert_eq!("bioRxiv".parse::<SourceType>().unwrap(), SourceType::BioRxiv);
        assert_eq!(" PubMed ".parse::<SourceType>().unwrap(), SourceType::PubMed);
        assert!("scholar".parse::<SourceType>().is_err());

        let json = serde_json::to_string(&SourceType::Arxiv).unwrap();
        assert_eq!(json, "\"arXiv\"");
    }

    #[test]
    fn test_full_text_hint_for_pubmed() {
        let without = PaperRecord::new("12345", SourceType::PubMed);
        assert!(!without.has_full_text_hint());

        let with = PaperRecordBuilder::new("12345", SourceType::PubMed)
            .pmc_id(Some("PMC777".to_string()))
            .build();
        assert!(with.has_full_text_hint());
    }
}
