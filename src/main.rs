use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use paper_scout::config::{find_config_file, get_config, load_config, Config};
use paper_scout::models::{PaperRecord, SourceType};
use paper_scout::sources::{SourceCapabilities, SourceRegistry};
use paper_scout::utils::FileCache;
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Paper Scout - Search arXiv, bioRxiv and PubMed and fetch full text
#[derive(Parser, Debug)]
#[command(name = "paper-scout")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "hongkongkiwi")]
#[command(about = "Search arXiv, bioRxiv and PubMed and fetch full text", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Plain)]
    output: OutputFormat,

    /// Log format (overrides the config file)
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormat>,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable the full-text cache for this command
    #[arg(long, global = true, default_value_t = false)]
    no_cache: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Plain text format
    Plain,
    /// JSON format (machine-readable)
    Json,
}

/// Log line format
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

/// Available sources
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Source {
    #[value(name = "arxiv")]
    Arxiv,
    #[value(name = "biorxiv")]
    Biorxiv,
    #[value(name = "pubmed")]
    Pubmed,
}

impl From<Source> for SourceType {
    fn from(source: Source) -> Self {
        match source {
            Source::Arxiv => SourceType::Arxiv,
            Source::Biorxiv => SourceType::BioRxiv,
            Source::Pubmed => SourceType::PubMed,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search one source by query string
    #[command(alias = "s")]
    Search {
        /// Search query string
        query: String,

        /// Source to search
        #[arg(long, short, value_enum)]
        source: Source,

        /// Maximum number of results
        #[arg(long, short, default_value_t = 5)]
        max_results: usize,

        /// Also fetch the full text of each result
        #[arg(long)]
        full_text: bool,
    },

    /// Fetch the full text of one paper
    #[command(alias = "ft")]
    FullText {
        /// Paper identifier (bioRxiv DOI or PubMed PMID)
        id: String,

        /// Source the identifier belongs to
        #[arg(long, short, value_enum)]
        source: Source,

        /// Known PubMed Central identifier, skips the cross-reference lookup
        #[arg(long)]
        pmc_id: Option<String>,
    },

    /// List available sources
    Sources,

    /// Manage the full-text cache
    Cache {
        /// Subcommand
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Subcommand, Debug)]
enum CacheCommands {
    /// Show cache statistics
    Stats,

    /// Clear all cached full text
    Clear,
}

/// A search hit with its optional full text, for JSON output
#[derive(Serialize)]
struct SearchHit<'a> {
    #[serde(flatten)]
    record: &'a PaperRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    full_text: Option<String>,
}

fn resolve_config(cli: &Cli) -> Result<(Config, Option<PathBuf>)> {
    let path = cli.config.clone().or_else(find_config_file);
    let mut config = match &path {
        Some(path) => load_config(path)?,
        None => get_config()?,
    };

    if cli.no_cache {
        config.cache.enabled = false;
    }

    Ok((config, path))
}

fn init_tracing(cli: &Cli, config: &Config) {
    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => config.logging.level.as_str(),
            1 => "debug",
            _ => "trace",
        }
    };

    let json = match cli.log_format {
        Some(format) => format == LogFormat::Json,
        None => config.logging.format.as_deref() == Some("json"),
    };

    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| format!("paper_scout={}", level));

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, config_path) = resolve_config(&cli)?;
    init_tracing(&cli, &config);

    if let Some(path) = &config_path {
        tracing::info!("Using config file: {}", path.display());
    }

    match &cli.command {
        Commands::Search {
            query,
            source,
            max_results,
            full_text,
        } => {
            let registry = SourceRegistry::from_config(&config)?;
            let records = registry
                .search(SourceType::from(*source), query, *max_results)
                .await;

            if !cli.quiet {
                eprintln!("Found {} papers", records.len());
            }

            let mut hits = Vec::with_capacity(records.len());
            for record in &records {
                let text = if *full_text && record.has_full_text_hint() {
                    registry.get_full_text(record).await
                } else {
                    None
                };
                hits.push(SearchHit {
                    record,
                    full_text: text,
                });
            }

            output_hits(&hits, cli.output, *full_text)?;
        }

        Commands::FullText { id, source, pmc_id } => {
            let registry = SourceRegistry::from_config(&config)?;
            let mut record = PaperRecord::new(id.trim(), SourceType::from(*source));
            record.pmc_id = pmc_id.clone();

            match registry.get_full_text(&record).await {
                Some(text) => match cli.output {
                    OutputFormat::Json => {
                        let hit = SearchHit {
                            record: &record,
                            full_text: Some(text),
                        };
                        println!("{}", serde_json::to_string_pretty(&hit)?);
                    }
                    OutputFormat::Plain => println!("{}", text),
                },
                None => {
                    eprintln!("No full text available for {} {}", record.source, record.id);
                    std::process::exit(1);
                }
            }
        }

        Commands::Sources => {
            let registry = SourceRegistry::from_config(&config)?;
            for source in registry.all() {
                let mut caps = vec!["search"];
                if source.capabilities().contains(SourceCapabilities::FULL_TEXT) {
                    caps.push("full-text");
                }
                println!("{:<10} {:<10} {}", source.id(), source.name(), caps.join(", "));
            }
        }

        Commands::Cache { command } => {
            let cache = FileCache::from_config(&config.cache);

            match command {
                CacheCommands::Stats => {
                    let stats = cache.stats();
                    match cli.output {
                        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
                        OutputFormat::Plain => {
                            println!(
                                "Cache: {}",
                                if config.cache.enabled { "enabled" } else { "disabled" }
                            );
                            println!("Directory: {}", stats.directory.display());
                            println!("Entries: {}", stats.entries);
                            println!("Total size: {} KB", stats.total_bytes / 1024);
                            println!("TTL: {} seconds", stats.ttl.as_secs());
                        }
                    }
                }
                CacheCommands::Clear => {
                    if !cli.quiet {
                        eprintln!("Clearing cached full text...");
                    }
                    cache.clear()?;
                    if !cli.quiet {
                        eprintln!("Cache cleared successfully.");
                    }
                }
            }
        }
    }

    Ok(())
}

fn output_hits(hits: &[SearchHit<'_>], format: OutputFormat, with_full_text: bool) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(hits)?);
        }
        OutputFormat::Plain => {
            for hit in hits {
                let paper = hit.record;
                println!("{} - {} ({})", paper.title, paper.authors, paper.source);
                println!("  ID: {}", paper.id);
                println!("  Published: {}", paper.published);
                if !paper.pdf_url.is_empty() {
                    println!("  PDF: {}", paper.pdf_url);
                }
                if let Some(pmc) = &paper.pmc_id {
                    println!("  PMC: {}", pmc);
                }
                if with_full_text {
                    match &hit.full_text {
                        Some(text) => println!("  Full text: {} characters", text.chars().count()),
                        None => println!("  Full text: not available"),
                    }
                }
                println!();
            }
        }
    }
    Ok(())
}
