//! # textindex
//!
//! The `textindex` binary is the command-line front end for textblitz. It
//! indexes a document into a SimHash index file, looks up near-duplicate
//! chunks by fingerprint, and exports an index for inspection.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `textindex index -i <file> -o <file.idx>` | Chunk, fingerprint, and save an index |
//! | `textindex lookup -i <file.idx> -H <simhash>` | Find chunks within a Hamming distance |
//! | `textindex export -i <file.idx>` | Render an index as JSON or CSV |
//!
//! ## Examples
//!
//! ```bash
//! # Index a large text file with 8 workers and 8 KiB chunks
//! textindex index -i large_text.txt -o large_text.idx -s 8192 -w 8
//!
//! # Exact lookup
//! textindex lookup -i large_text.idx -H 14607312263354641902
//!
//! # Near-duplicate lookup within 3 bits
//! textindex lookup -i large_text.idx -H 14607312263354641902 -t 3
//!
//! # CSV export
//! textindex export -i large_text.idx --format csv -o large_text.csv
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use textblitz::config::{self, Config};
use textblitz::export::{self, ExportFormat};
use textblitz::features::FeatureConfig;
use textblitz::index::{self, IndexOptions};
use textblitz::lookup;
use textblitz::progress::ProgressMode;

/// textindex: chunked SimHash indexing and fuzzy lookup for large documents.
#[derive(Parser)]
#[command(
    name = "textindex",
    about = "Chunked SimHash indexing and fuzzy near-duplicate lookup",
    version,
    long_about = "textindex splits a document into fixed-size chunks, fingerprints every \
    chunk with SimHash on a pool of worker threads, and saves a fingerprint index. Lookups \
    return every chunk whose fingerprint lies within a Hamming distance of the query."
)]
struct Cli {
    /// Path to an optional configuration file (TOML).
    ///
    /// Values given on the command line override the file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Progress output on stderr. Defaults to human when stderr is a terminal.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProgressArg {
    Off,
    Human,
    Json,
}

impl From<ProgressArg> for ProgressMode {
    fn from(arg: ProgressArg) -> Self {
        match arg {
            ProgressArg::Off => ProgressMode::Off,
            ProgressArg::Human => ProgressMode::Human,
            ProgressArg::Json => ProgressMode::Json,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FeatureArg {
    Word,
    Ngram,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk a document, fingerprint every chunk, and save the index.
    ///
    /// Plain text is indexed as-is; PDF and DOCX are converted to text first.
    Index {
        /// Document to index.
        #[arg(short, long)]
        input: PathBuf,

        /// Index file to write. Defaults to the input path with an `.idx` extension.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Chunk size in bytes [default: 4096].
        #[arg(short = 's', long)]
        chunk_size: Option<usize>,

        /// Number of worker threads [default: 4].
        #[arg(short, long)]
        workers: Option<usize>,

        /// Feature extraction strategy [default: word].
        #[arg(long, value_enum)]
        features: Option<FeatureArg>,

        /// N-gram window in bytes (ngram strategy only) [default: 3].
        #[arg(long)]
        ngram_size: Option<usize>,

        /// N-gram step in bytes (ngram strategy only) [default: 1].
        #[arg(long)]
        ngram_step: Option<usize>,
    },

    /// Find indexed chunks whose fingerprint is near a query fingerprint.
    Lookup {
        /// Index file produced by `textindex index`.
        #[arg(short, long)]
        input: PathBuf,

        /// Query fingerprint (unsigned 64-bit decimal).
        #[arg(short = 'H', long = "simhash")]
        simhash: String,

        /// Maximum Hamming distance; 0 is an exact match.
        #[arg(short, long, default_value_t = 0)]
        threshold: u32,
    },

    /// Render an index file as JSON or CSV.
    Export {
        /// Index file produced by `textindex index`.
        #[arg(short, long)]
        input: PathBuf,

        /// Output path. Writes to stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "json")]
        format: FormatArg,
    },
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Merge index flags over the loaded configuration.
fn apply_index_overrides(
    mut cfg: Config,
    chunk_size: Option<usize>,
    workers: Option<usize>,
    features: Option<FeatureArg>,
    ngram_size: Option<usize>,
    ngram_step: Option<usize>,
) -> textblitz::Result<IndexOptions> {
    if let Some(size) = chunk_size {
        cfg.index.chunk_size = size;
    }
    if let Some(n) = workers {
        cfg.index.workers = n;
    }
    if let Some(strategy) = features {
        cfg.features.strategy = match strategy {
            FeatureArg::Word => "word",
            FeatureArg::Ngram => "ngram",
        }
        .to_string();
    }
    if let Some(n) = ngram_size {
        cfg.features.ngram_size = n;
    }
    if let Some(step) = ngram_step {
        cfg.features.ngram_step = step;
    }
    cfg.validate()?;
    IndexOptions::from_config(&cfg)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let progress = cli
        .progress
        .map(ProgressMode::from)
        .unwrap_or_else(ProgressMode::default_for_tty);

    match cli.command {
        Commands::Index {
            input,
            output,
            chunk_size,
            workers,
            features,
            ngram_size,
            ngram_step,
        } => {
            let cfg = config::load_config(cli.config.as_deref())?;
            let options =
                apply_index_overrides(cfg, chunk_size, workers, features, ngram_size, ngram_step)?;
            let output = output.unwrap_or_else(|| index::default_output_path(&input));
            let reporter = progress.reporter();

            let summary = index::index_file(&input, &output, &options, reporter.as_ref())
                .with_context(|| format!("Failed to index {}", input.display()))?;

            println!("Indexing complete!");
            println!("  input:        {}", summary.input.display());
            println!("  chunks:       {}", summary.chunks);
            println!("  fingerprints: {}", summary.fingerprints);
            println!("  features:     {}", describe_features(&options.features));
            println!("  output:       {}", summary.output.display());
        }
        Commands::Lookup {
            input,
            simhash,
            threshold,
        } => match index::run_lookup(&input, &simhash, threshold) {
            Ok(matches) => {
                let mut stdout = std::io::stdout().lock();
                lookup::write_report(&mut stdout, &simhash, &matches)?;
            }
            Err(e) if e.is_no_match() => {
                println!("No matches found.");
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Lookup in {} failed", input.display()));
            }
        },
        Commands::Export {
            input,
            output,
            format,
        } => {
            let format = match format {
                FormatArg::Json => ExportFormat::Json,
                FormatArg::Csv => ExportFormat::Csv,
            };
            export::run_export(&input, output.as_deref(), format)
                .with_context(|| format!("Failed to export {}", input.display()))?;
        }
    }

    Ok(())
}

fn describe_features(features: &FeatureConfig) -> String {
    match features {
        FeatureConfig::Word { normalize } => format!("word (normalize={})", normalize),
        FeatureConfig::Ngram { n, step, normalize } => {
            format!("ngram n={} step={} (normalize={})", n, step, normalize)
        }
    }
}
