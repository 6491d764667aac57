//! Utility modules supporting retrieval.
//!
//! - [`numerals`]: roman/arabic numeral-aware query matching
//! - [`document`]: JATS parsing and full-text extraction
//! - [`RateLimiter`]: per-adapter request pacing
//! - [`ContentCache`]: time-bounded full-text cache ([`FileCache`], [`MemoryCache`], [`NoCache`])
//! - [`HttpClient`]: shared HTTP client with status handling
//!
//! # Numeral-aware matching
//!
//! ```rust
//! use paper_scout::utils::numerals::matches_with_numerals;
//!
//! assert!(matches_with_numerals("Part II Results", "part 2"));
//! ```
//!
//! # Extracting text from a hand-built document
//!
//! ```rust
//! use paper_scout::utils::document::{extract_text, Document, Section};
//!
//! let document = Document {
//!     title: Some("Title".to_string()),
//!     abstract_text: None,
//!     body: Some(Section::new(Some("Intro")).paragraph("Hello.")),
//! };
//! assert_eq!(extract_text(&document), "Title\n\nIntro\n\nHello.");
//! ```

mod cache;
pub mod document;
mod http;
pub mod numerals;
mod rate_limit;

pub use cache::{
    cache_from_config, CacheEntry, CacheStats, ContentCache, FileCache, MemoryCache, NoCache,
    DEFAULT_TTL,
};
pub use document::{extract_blocks, extract_text, Document, ExtractError, Section};
pub use http::HttpClient;
pub use rate_limit::RateLimiter;
