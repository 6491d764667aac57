//! PubMed source implementation using the NCBI E-utilities.
//!
//! Search is two-step: `esearch` returns PMIDs, then one `esummary` call per
//! PMID returns the metadata. Each record also gets a best-effort PubMed
//! Central cross-reference, taken from the summary's `articleids` or resolved
//! through `elink`. Full text is the PMC JATS article from `efetch`.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::config::{Config, PubMedConfig};
use crate::models::{
    PaperRecord, PaperRecordBuilder, SourceType, NO_ABSTRACT, NO_AUTHORS, NO_TITLE, UNKNOWN_DATE,
};
use crate::sources::{
    fetch_full_text_cached, jats_to_text, PaperSource, SourceCapabilities, SourceError,
};
use crate::utils::{ContentCache, HttpClient, RateLimiter};

/// E-utilities base URL
const EUTILS_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
/// Tool name reported to NCBI
const TOOL_NAME: &str = env!("CARGO_PKG_NAME");
const CATEGORY: &str = "Medicine";

/// PubMed source
///
/// Supports:
/// - Search by query (esearch + per-record esummary)
/// - Full text for records with a PubMed Central copy
#[derive(Debug)]
pub struct PubMedSource {
    client: HttpClient,
    limiter: RateLimiter,
    cache: Arc<dyn ContentCache>,
    base_url: String,
    api_key: Option<String>,
    email: Option<String>,
}

impl PubMedSource {
    /// Create with default settings and the given cache
    pub fn new(cache: Arc<dyn ContentCache>) -> Result<Self, SourceError> {
        Ok(Self::from_config(HttpClient::new()?, &Config::default(), cache))
    }

    /// Create from configuration, sharing an HTTP client and cache
    pub fn from_config(client: HttpClient, config: &Config, cache: Arc<dyn ContentCache>) -> Self {
        Self::with_client(client, RateLimiter::new(config.rate_limits.pubmed()), cache)
            .with_credentials(&config.pubmed)
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
            base_url: EUTILS_URL.to_string(),
            api_key: None,
            email: None,
        }
    }

    /// Point the adapter at another E-utilities host (for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Attach the NCBI API key and contact address
    pub fn with_credentials(mut self, config: &PubMedConfig) -> Self {
        self.api_key = config.api_key.clone().filter(|k| !k.trim().is_empty());
        self.email = config.email.clone().filter(|e| !e.trim().is_empty());
        self
    }

    /// Parameters sent with every E-utilities request
    fn base_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("tool", TOOL_NAME.to_string())];
        if let Some(email) = &self.email {
            params.push(("email", email.clone()));
        }
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }

    /// Rate-limited GET against one E-utilities endpoint
    async fn eutils_get(
        &self,
        endpoint: &str,
        params: &[(&'static str, String)],
    ) -> Result<String, SourceError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let mut all = self.base_params();
        all.extend_from_slice(params);
        tracing::debug!("PubMed request: {} {:?}", url, params);

        self.limiter.wait_if_needed().await;
        self.client
            .get_text(self.client.get(&url).query(&all), endpoint)
            .await
    }

    async fn eutils_json(
        &self,
        endpoint: &str,
        params: &[(&'static str, String)],
    ) -> Result<Value, SourceError> {
        let body = self.eutils_get(endpoint, params).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn esearch(&self, query: &str, max_results: usize) -> Result<Vec<String>, SourceError> {
        let json = self
            .eutils_json(
                "esearch.fcgi",
                &[
                    ("db", "pubmed".to_string()),
                    ("term", query.to_string()),
                    ("retmax", max_results.to_string()),
                    ("retmode", "json".to_string()),
                ],
            )
            .await?;

        Ok(Self::parse_id_list(&json))
    }

    async fn esummary(&self, pmid: &str) -> Result<Option<PaperRecord>, SourceError> {
        let json = self
            .eutils_json(
                "esummary.fcgi",
                &[
                    ("db", "pubmed".to_string()),
                    ("id", pmid.to_string()),
                    ("retmode", "json".to_string()),
                ],
            )
            .await?;

        Ok(Self::parse_summary(pmid, &json))
    }

    /// Look up the PMC identifier linked to a PMID; `None` when there is none
    async fn resolve_pmc(&self, pmid: &str) -> Result<Option<String>, SourceError> {
        let json = self
            .eutils_json(
                "elink.fcgi",
                &[
                    ("dbfrom", "pubmed".to_string()),
                    ("db", "pmc".to_string()),
                    ("id", pmid.to_string()),
                    ("retmode", "json".to_string()),
                ],
            )
            .await?;

        Ok(Self::parse_elink(&json))
    }

    async fn search_records(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<PaperRecord>, SourceError> {
        let pmids = self.esearch(query, max_results).await?;
        tracing::debug!("PubMed esearch returned {} PMIDs", pmids.len());

        let mut records = Vec::with_capacity(pmids.len());
        for pmid in pmids.iter().take(max_results) {
            let mut record = match self.esummary(pmid).await {
                Ok(Some(record)) => record,
                Ok(None) => {
                    tracing::debug!("PubMed summary for {} missing, skipping", pmid);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("PubMed summary for {} failed: {}", pmid, e);
                    continue;
                }
            };

            if record.pmc_id.is_none() {
                record.pmc_id = match self.resolve_pmc(pmid).await {
                    Ok(pmc) => pmc,
                    Err(e) => {
                        tracing::debug!("PMC lookup for {} failed: {}", pmid, e);
                        None
                    }
                };
            }

            records.push(record);
        }

        Ok(records)
    }

    async fn fetch_pmc_text(&self, record: &PaperRecord) -> Result<Option<String>, SourceError> {
        let pmc_id = match &record.pmc_id {
            Some(pmc) => pmc.clone(),
            None => match self.resolve_pmc(&record.id).await? {
                Some(pmc) => pmc,
                None => {
                    tracing::debug!("No PMC cross-reference for PMID {}", record.id);
                    return Ok(None);
                }
            },
        };

        let numeric = pmc_id.trim_start_matches("PMC").to_string();
        let xml = self
            .eutils_get(
                "efetch.fcgi",
                &[
                    ("db", "pmc".to_string()),
                    ("id", numeric),
                    ("retmode", "xml".to_string()),
                ],
            )
            .await?;

        if is_error_payload(&xml) {
            tracing::debug!("PMC has no article for {}", pmc_id);
            return Ok(None);
        }

        Ok(Some(jats_to_text(&xml)?))
    }

    /// PMIDs from an esearch response
    fn parse_id_list(json: &Value) -> Vec<String> {
        json.pointer("/esearchresult/idlist")
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Record for one PMID from an esummary response
    fn parse_summary(pmid: &str, json: &Value) -> Option<PaperRecord> {
        let summary = json.get("result")?.get(pmid)?;
        if !summary.is_object() || summary.get("error").is_some() {
            return None;
        }

        let title = summary
            .get("title")
            .and_then(Value::as_str)
            .map(|t| t.trim().trim_matches('.').trim())
            .filter(|t| !t.is_empty())
            .unwrap_or(NO_TITLE);

        let authors = summary
            .get("authors")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(|a| a.get("name").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| NO_AUTHORS.to_string());

        let summary_text = summary
            .get("abstract")
            .and_then(Value::as_str)
            .filter(|a| !a.trim().is_empty())
            .unwrap_or(NO_ABSTRACT);

        let published = summary
            .get("pubdate")
            .and_then(Value::as_str)
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(UNKNOWN_DATE);

        Some(
            PaperRecordBuilder::new(pmid, SourceType::PubMed)
                .title(title)
                .authors(authors)
                .summary(summary_text)
                .published(published)
                .pdf_url(format!("https://pubmed.ncbi.nlm.nih.gov/{}/", pmid))
                .categories(CATEGORY, vec![CATEGORY.to_string()])
                .pmc_id(Self::pmc_from_summary(summary))
                .raw_data(summary.clone())
                .build(),
        )
    }

    /// PMC identifier listed in a summary's `articleids`
    fn pmc_from_summary(summary: &Value) -> Option<String> {
        summary
            .get("articleids")?
            .as_array()?
            .iter()
            .find(|entry| entry.get("idtype").and_then(Value::as_str) == Some("pmc"))
            .and_then(|entry| entry.get("value").and_then(Value::as_str))
            .and_then(normalize_pmc)
    }

    /// First `pubmed_pmc` link of an elink response
    fn parse_elink(json: &Value) -> Option<String> {
        json.get("linksets")?
            .as_array()?
            .iter()
            .filter_map(|set| set.get("linksetdbs").and_then(Value::as_array))
            .flatten()
            .filter(|db| {
                db.get("linkname").and_then(Value::as_str) == Some("pubmed_pmc")
                    || db.get("dbto").and_then(Value::as_str) == Some("pmc")
            })
            .filter_map(|db| db.get("links").and_then(Value::as_array))
            .flatten()
            .find_map(|link| match link {
                Value::String(s) => normalize_pmc(s),
                Value::Number(n) => normalize_pmc(&n.to_string()),
                _ => None,
            })
    }
}

/// Canonical `PMC<digits>` form
fn normalize_pmc(value: &str) -> Option<String> {
    let digits = value.trim().trim_start_matches("PMC");
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("PMC{}", digits))
}

/// efetch answers unknown PMC ids with an `<error>` element instead of an article
fn is_error_payload(xml: &str) -> bool {
    xml.contains("<error") && !xml.contains("<article")
}

#[async_trait]
impl PaperSource for PubMedSource {
    fn source_type(&self) -> SourceType {
        SourceType::PubMed
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::FULL_TEXT
    }

    async fn search(&self, query: &str, max_results: usize) -> Vec<PaperRecord> {
        if max_results == 0 || query.trim().is_empty() {
            return Vec::new();
        }

        match self.search_records(query, max_results).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("PubMed search failed for '{}': {}", query, e);
                Vec::new()
            }
        }
    }

    async fn get_full_text(&self, record: &PaperRecord) -> Option<String> {
        if record.id.trim().is_empty() {
            return None;
        }
        fetch_full_text_cached(self.cache.as_ref(), record, || self.fetch_pmc_text(record)).await
    }
}
