//! arXiv source implementation.

use async_trait::async_trait;
use feed_rs::parser;

use crate::config::Config;
use crate::models::{PaperRecord, PaperRecordBuilder, SourceType, UNKNOWN_DATE};
use crate::sources::{PaperSource, SourceError};
use crate::utils::numerals::{contains_numeral, numeral_variants};
use crate::utils::{HttpClient, RateLimiter};

/// Base URL for arXiv API
const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";
/// Base URL for arXiv PDFs
const ARXIV_PDF_URL: &str = "https://arxiv.org/pdf";

/// arXiv source
///
/// Supports:
/// - Search by query (relevance order decided upstream)
///
/// Full text is not offered; `get_full_text` always returns `None`.
#[derive(Debug)]
pub struct ArxivSource {
    client: HttpClient,
    limiter: RateLimiter,
    base_url: String,
}

impl ArxivSource {
    /// Create a new arXiv source with default settings
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self::with_client(HttpClient::new()?, RateLimiter::unlimited()))
    }

    /// Create from configuration, sharing an HTTP client
    pub fn from_config(client: HttpClient, config: &Config) -> Self {
        Self::with_client(client, RateLimiter::new(config.rate_limits.arxiv()))
    }

    /// Create with a custom HTTP client and limiter
    pub fn with_client(client: HttpClient, limiter: RateLimiter) -> Self {
        Self {
            client,
            limiter,
            base_url: ARXIV_API_URL.to_string(),
        }
    }

    /// Point the adapter at another query endpoint (for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build the boolean search expression for a free-text query.
    ///
    /// Numeral tokens expand to their roman/arabic variants; every other token
    /// is lowercased and wildcarded in that form and its capitalized form.
    /// Tokens are AND-joined.
    pub fn build_query(query: &str) -> String {
        query
            .split_whitespace()
            .map(|word| {
                if contains_numeral(word) {
                    let variants: Vec<String> = numeral_variants(word).into_iter().collect();
                    format!("({})", variants.join(" OR "))
                } else {
                    let escaped = regex::escape(&word.to_lowercase());
                    format!("(*{}* OR *{}*)", escaped, capitalize(&escaped))
                }
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    async fn fetch_feed(&self, query: &str, max_results: usize) -> Result<Vec<PaperRecord>, SourceError> {
        let search_query = Self::build_query(query);
        let url = format!(
            "{}?search_query={}&max_results={}&sortBy=relevance&sortOrder=descending",
            self.base_url,
            urlencoding::encode(&search_query),
            max_results
        );
        tracing::debug!("arXiv request: {}", url);

        self.limiter.wait_if_needed().await;
        let response = self
            .client
            .send(
                self.client.get(&url).header("Accept", "application/atom+xml"),
                "arXiv results",
            )
            .await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read response: {}", e)))?;

        let feed = parser::parse(bytes.as_ref())
            .map_err(|e| SourceError::Parse(format!("Failed to parse Atom feed: {}", e)))?;

        Ok(feed
            .entries
            .iter()
            .filter_map(Self::parse_entry)
            .take(max_results)
            .collect())
    }

    /// Map an Atom entry to a record; entries without an identifier are skipped
    fn parse_entry(entry: &feed_rs::model::Entry) -> Option<PaperRecord> {
        let paper_id = entry
            .id
            .rsplit("abs/")
            .next()
            .map(str::trim)
            .filter(|id| !id.is_empty())?
            .to_string();

        let mut builder = PaperRecordBuilder::new(paper_id.clone(), SourceType::Arxiv);

        if let Some(title) = entry.title.as_ref().map(|t| collapse(&t.content)) {
            if !title.is_empty() {
                builder = builder.title(title);
            }
        }

        let authors = entry
            .authors
            .iter()
            .map(|a| a.name.trim())
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        if !authors.is_empty() {
            builder = builder.authors(authors);
        }

        if let Some(summary) = entry.summary.as_ref().map(|s| collapse(&s.content)) {
            if !summary.is_empty() {
                builder = builder.summary(summary);
            }
        }

        let published = entry
            .published
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| UNKNOWN_DATE.to_string());

        let pdf_url = entry
            .links
            .iter()
            .find(|link| {
                link.media_type.as_deref() == Some("application/pdf")
                    || link.title.as_deref() == Some("pdf")
            })
            .map(|link| link.href.clone())
            .unwrap_or_else(|| format!("{}/{}", ARXIV_PDF_URL, paper_id));

        let categories: Vec<String> = entry.categories.iter().map(|c| c.term.clone()).collect();
        let primary = categories.first().cloned().unwrap_or_default();

        Some(
            builder
                .published(published)
                .pdf_url(pdf_url)
                .categories(primary, categories)
                .build(),
        )
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[async_trait]
impl PaperSource for ArxivSource {
    fn source_type(&self) -> SourceType {
        SourceType::Arxiv
    }

    async fn search(&self, query: &str, max_results: usize) -> Vec<PaperRecord> {
        if max_results == 0 || query.trim().is_empty() {
            return Vec::new();
        }

        match self.fetch_feed(query, max_results).await {
            Ok(records) => {
                tracing::debug!("arXiv returned {} records for '{}'", records.len(), query);
                records
            }
            Err(e) => {
                tracing::warn!("arXiv search failed for '{}': {}", query, e);
                Vec::new()
            }
        }
    }
}
