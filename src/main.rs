mod settings;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use listingparse::{
    AgencyConfig, CompiledAgency, ListingMarker, ListingParser, NeighborhoodDictionary, TextVariant,
};
use settings::RunConfig;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "listingparse")]
#[command(about = "Extract structured records from free-form real-estate listings", long_about = None)]
struct Args {
    /// Agency rules file (defaults to agency_config from data/config.yaml)
    #[arg(long, global = true)]
    agency: Option<PathBuf>,

    /// Neighborhood dictionary file
    #[arg(long, global = true)]
    neighborhoods: Option<PathBuf>,

    /// Text variant: generic, serpecal or eugenia
    #[arg(long, global = true)]
    variant: Option<TextVariant>,

    /// Listing marker override: bullet, cue, uppercase or numbered
    #[arg(long, global = true)]
    marker: Option<ListingMarker>,

    /// Parse segments on the rayon thread pool
    #[arg(long, global = true)]
    parallel: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Segment and parse a file, printing one JSON record per listing
    Parse {
        file: PathBuf,
        /// Print a single pretty JSON array instead of JSON lines
        #[arg(long)]
        pretty: bool,
        /// Skip records without a price, an area or a bedroom count
        #[arg(long)]
        complete: bool,
    },
    /// Print the segments of a file without extracting fields
    Segment {
        file: PathBuf,
        /// Keep NUMBERED markers in the segment text
        #[arg(long)]
        keep_markers: bool,
    },
    /// Classify a piece of text and print the score breakdown
    Classify { text: String },
    /// Write default configuration files under data/
    Init,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Command::Init = args.command {
        RunConfig::create_default()?;
        eprintln!("Wrote data/config.yaml, data/agency.yaml and data/neighborhoods.yaml");
        return Ok(());
    }

    let config = RunConfig::load()?;
    init_logging(&config);

    let mut agency_config = load_agency(args.agency.as_deref(), &config)?;
    if let Some(marker) = args.marker {
        agency_config.listing_marker = marker;
    }
    let agency = CompiledAgency::new(agency_config).context("Invalid agency configuration")?;

    let dictionary = load_dictionary(args.neighborhoods.as_deref(), &config)?;
    let mut parser = ListingParser::new(&agency);
    if let Some(dictionary) = dictionary.as_ref() {
        parser = parser.with_dictionary(dictionary);
    }
    if let Some(variant) = args.variant {
        parser = parser.with_variant(variant);
    }

    match args.command {
        Command::Parse { file, pretty, complete } => {
            let lines = read_lines(&file)?;
            let mut records = if args.parallel || config.parallel {
                parser.parse_lines_parallel(&lines)
            } else {
                parser.parse_lines(&lines)
            };
            if complete {
                let before = records.len();
                records.retain(|r| r.has_sufficient_info());
                tracing::info!("Kept {} of {} records with sufficient information", records.len(), before);
            }

            if pretty {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for record in &records {
                    println!("{}", serde_json::to_string(record)?);
                }
            }
            tracing::info!("Parsed {} records from {}", records.len(), file.display());
        }
        Command::Segment { file, keep_markers } => {
            let lines = read_lines(&file)?;
            let segments = listingparse::segmenter::segment(
                &lines,
                agency.listing_marker(),
                &agency,
                keep_markers,
            );
            for segment in &segments {
                println!("{}", serde_json::to_string(segment)?);
            }
        }
        Command::Classify { text } => {
            let record = parser.parse_text(&text);
            println!("{}", serde_json::to_string_pretty(&record.classification)?);
        }
        // Already handled before any configuration was loaded
        Command::Init => {}
    }

    Ok(())
}

/// RUST_LOG wins when set; otherwise the level from data/config.yaml.
/// Logs go to stderr so stdout stays valid JSON.
fn init_logging(config: &RunConfig) {
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
        tracing::debug!("Logging level set from RUST_LOG environment variable");
    } else {
        let level = config.tracing_level.to_lowercase();
        let max_level = match level.as_str() {
            "trace" => tracing::Level::TRACE,
            "debug" => tracing::Level::DEBUG,
            "info" => tracing::Level::INFO,
            "warn" => tracing::Level::WARN,
            "error" => tracing::Level::ERROR,
            _ => {
                eprintln!("Invalid tracing level '{}', using 'info'", level);
                tracing::Level::INFO
            }
        };

        tracing_subscriber::fmt()
            .with_max_level(max_level)
            .with_writer(std::io::stderr)
            .init();

        tracing::debug!("Logging level set to: {} (from data/config.yaml)", level);
    }
}

fn load_agency(explicit: Option<&Path>, config: &RunConfig) -> Result<AgencyConfig> {
    if let Some(path) = explicit {
        return AgencyConfig::load(path)
            .with_context(|| format!("Failed to load agency configuration {}", path.display()));
    }

    let path = Path::new(&config.agency_config);
    if path.exists() {
        AgencyConfig::load(path)
            .with_context(|| format!("Failed to load agency configuration {}", path.display()))
    } else {
        tracing::info!(
            "No agency file at {}, using built-in defaults (run `listingparse init` to write one)",
            path.display()
        );
        Ok(AgencyConfig::default())
    }
}

fn load_dictionary(explicit: Option<&Path>, config: &RunConfig) -> Result<Option<NeighborhoodDictionary>> {
    if let Some(path) = explicit {
        let dictionary = NeighborhoodDictionary::load(path)
            .with_context(|| format!("Failed to load neighborhoods from {}", path.display()))?;
        return Ok(Some(dictionary));
    }

    match config.neighborhoods.as_deref().map(Path::new) {
        Some(path) if path.exists() => {
            let dictionary = NeighborhoodDictionary::load(path)
                .with_context(|| format!("Failed to load neighborhoods from {}", path.display()))?;
            Ok(Some(dictionary))
        }
        _ => {
            tracing::debug!("No neighborhood dictionary, fallback patterns only");
            Ok(None)
        }
    }
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    // Tolerate a UTF-8 BOM and CRLF line endings
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
    Ok(content.lines().map(str::to_string).collect())
}
