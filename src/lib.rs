//! # Paper Scout
//!
//! Paper retrieval from arXiv, bioRxiv and PubMed behind one interface.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures ([`PaperRecord`], [`SourceType`])
//! - [`sources`]: Catalog adapters behind the [`PaperSource`] trait, and the [`SourceRegistry`]
//! - [`utils`]: Numeral-aware matching, JATS extraction, rate limiting, caching, HTTP
//! - [`config`]: Configuration management
//!
//! ## Example
//!
//! ```no_run
//! use paper_scout::{config::Config, SourceRegistry, SourceType};
//!
//! # async fn run() -> Result<(), paper_scout::sources::SourceError> {
//! let registry = SourceRegistry::from_config(&Config::default())?;
//! for record in registry.search(SourceType::PubMed, "stage II melanoma", 5).await {
//!     if let Some(text) = registry.get_full_text(&record).await {
//!         println!("{}: {} characters", record.title, text.len());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod models;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use models::{PaperRecord, SourceType};
pub use sources::{PaperSource, SourceRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
