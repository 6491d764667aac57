//! bioRxiv source implementation.
//!
//! The details API has no free-text search, so the adapter lists a bounded
//! window of recent preprints and filters it locally over title and abstract
//! (numeral-aware). Upstream order is preserved.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use serde_json::Value;
use std::sync::Arc;

use crate::config::Config;
use crate::models::{
    PaperRecord, PaperRecordBuilder, SourceType, NO_ABSTRACT, NO_AUTHORS, NO_TITLE, UNKNOWN_DATE,
};
use crate::sources::{
    fetch_full_text_cached, jats_to_text, PaperSource, SourceCapabilities, SourceError,
};
use crate::utils::numerals::matches_with_numerals;
use crate::utils::{ContentCache, HttpClient, RateLimiter};

const BIORXIV_API_URL: &str = "https://api.biorxiv.org";
const BIORXIV_CONTENT_URL: &str = "https://www.biorxiv.org";
const DEFAULT_CATEGORY: &str = "Biology";
/// Entries per page of the details listing
const PAGE_SIZE: usize = 100;

/// bioRxiv source
///
/// Supports:
/// - Search over a recent listing window
/// - Full text from the JATS source XML
#[derive(Debug)]
pub struct BiorxivSource {
    client: HttpClient,
    limiter: RateLimiter,
    cache: Arc<dyn ContentCache>,
    api_url: String,
    content_url: String,
    window_days: u32,
    window_size: usize,
}

impl BiorxivSource {
    /// Create with default settings and the given cache
    pub fn new(cache: Arc<dyn ContentCache>) -> Result<Self, SourceError> {
        Ok(Self::from_config(HttpClient::new()?, &Config::default(), cache))
    }

    /// Create from configuration, sharing an HTTP client and cache
    pub fn from_config(client: HttpClient, config: &Config, cache: Arc<dyn ContentCache>) -> Self {
        Self::with_client(client, RateLimiter::new(config.rate_limits.biorxiv()), cache)
            .with_window(config.biorxiv.window_days, config.biorxiv.window_size)
    }

    /// Create with a custom HTTP client, limiter and cache
    pub fn with_client(
        client: HttpClient,
        limiter: RateLimiter,
        cache: Arc<dyn ContentCache>,
    ) -> Self {
        Self {
            client,
            limiter,
            cache,
            api_url: BIORXIV_API_URL.to_string(),
            content_url: BIORXIV_CONTENT_URL.to_string(),
            window_days: 365,
            window_size: 200,
        }
    }

    /// Override the API and content hosts (for testing)
    pub fn with_base_urls(mut self, api_url: impl Into<String>, content_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self.content_url = content_url.into();
        self
    }

    /// Set the listing window length in days and the number of entries scanned
    pub fn with_window(mut self, days: u32, size: usize) -> Self {
        self.window_days = days;
        self.window_size = size;
        self
    }

    async fn fetch_page(&self, from: NaiveDate, to: NaiveDate, cursor: usize) -> Result<Vec<Value>, SourceError> {
        let url = format!(
            "{}/details/biorxiv/{}/{}/{}/json",
            self.api_url,
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d"),
            cursor
        );
        tracing::debug!("bioRxiv request: {}", url);

        self.limiter.wait_if_needed().await;
        let mut json: Value = self.client.get_json(self.client.get(&url), "bioRxiv listing").await?;

        match json.get_mut("collection").map(Value::take) {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(SourceError::Parse("bioRxiv listing has no collection".to_string())),
        }
    }

    /// Page through the listing until `window_size` entries are collected or the listing ends
    async fn fetch_window(&self) -> Result<Vec<Value>, SourceError> {
        let today = Utc::now().date_naive();
        let from = today - ChronoDuration::days(i64::from(self.window_days));

        let mut items = Vec::new();
        while items.len() < self.window_size {
            let page = match self.fetch_page(from, today, items.len()).await {
                Ok(page) => page,
                Err(e) if items.is_empty() => return Err(e),
                Err(e) => {
                    tracing::warn!("bioRxiv listing stopped at cursor {}: {}", items.len(), e);
                    break;
                }
            };

            let count = page.len();
            items.extend(page);
            if count < PAGE_SIZE {
                break;
            }
        }

        items.truncate(self.window_size);
        Ok(items)
    }

    /// Keep listed items whose title or abstract matches the query, in listing order
    fn filter_items(items: Vec<Value>, query: &str, max_results: usize) -> Vec<PaperRecord> {
        items
            .into_iter()
            .filter(|item| {
                let title = str_field(item, "title").unwrap_or_default();
                let summary = str_field(item, "abstract").unwrap_or_default();
                matches_with_numerals(title, query) || matches_with_numerals(summary, query)
            })
            .take(max_results)
            .map(Self::parse_item)
            .collect()
    }

    /// Map a listing item to a record; an item without a DOI keeps an empty id
    fn parse_item(item: Value) -> PaperRecord {
        let doi = str_field(&item, "doi").unwrap_or_default().to_string();

        let title = str_field(&item, "title").unwrap_or(NO_TITLE).to_string();
        let authors = str_field(&item, "authors").unwrap_or(NO_AUTHORS).to_string();
        let summary = str_field(&item, "abstract").unwrap_or(NO_ABSTRACT).to_string();
        let category = str_field(&item, "category").unwrap_or(DEFAULT_CATEGORY).to_string();
        let published = str_field(&item, "date")
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| UNKNOWN_DATE.to_string());

        let pdf_url = if doi.is_empty() {
            String::new()
        } else {
            format!("https://www.biorxiv.org/content/{}v1.full.pdf", doi)
        };

        PaperRecordBuilder::new(doi, SourceType::BioRxiv)
            .title(title)
            .authors(authors)
            .summary(summary)
            .published(published)
            .pdf_url(pdf_url)
            .categories(category.clone(), vec![category])
            .raw_data(item)
            .build()
    }

    /// Location of the JATS XML for a record
    fn jats_url(&self, record: &PaperRecord) -> String {
        record
            .raw_data
            .get("jatsxml")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}/content/{}v1.source.xml", self.content_url, record.id))
    }

    async fn fetch_jats(&self, record: &PaperRecord) -> Result<Option<String>, SourceError> {
        let url = self.jats_url(record);
        tracing::debug!("bioRxiv full text request: {}", url);

        self.limiter.wait_if_needed().await;
        let xml = self
            .client
            .get_text(self.client.get(&url), "bioRxiv full text")
            .await?;

        Ok(Some(jats_to_text(&xml)?))
    }
}

fn str_field<'a>(item: &'a Value, field: &str) -> Option<&'a str> {
    item.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[async_trait]
impl PaperSource for BiorxivSource {
    fn source_type(&self) -> SourceType {
        SourceType::BioRxiv
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::FULL_TEXT
    }

    async fn search(&self, query: &str, max_results: usize) -> Vec<PaperRecord> {
        if max_results == 0 || query.trim().is_empty() {
            return Vec::new();
        }

        match self.fetch_window().await {
            Ok(items) => {
                let scanned = items.len();
                let records = Self::filter_items(items, query, max_results);
                tracing::debug!(
                    "bioRxiv matched {} of {} listed items for '{}'",
                    records.len(),
                    scanned,
                    query
                );
                records
            }
            Err(e) => {
                tracing::warn!("bioRxiv search failed for '{}': {}", query, e);
                Vec::new()
            }
        }
    }

    async fn get_full_text(&self, record: &PaperRecord) -> Option<String> {
        if record.id.trim().is_empty() {
            return None;
        }
        fetch_full_text_cached(self.cache.as_ref(), record, || self.fetch_jats(record)).await
    }
}
