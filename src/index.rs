//! Index and lookup orchestration.
//!
//! [`index_file`] runs the whole pipeline for one document:
//!
//! ```text
//!  chunk_file ──▶ submit (caller thread) ──▶ WorkerPool ──▶ consumer thread ──▶ save
//!                                                          (owns InMemoryIndex)
//! ```
//!
//! The consumer runs on a scoped thread and is the only writer of the index.
//! The caller thread submits every chunk and then stops the pool, which
//! closes the result stream and lets the consumer finish. Because results are
//! drained while tasks are still being submitted, the bounded queues never
//! deadlock no matter how many chunks the document has.
//!
//! A run that receives fewer fingerprints than it produced chunks fails
//! before anything is written, so a partial index is never persisted.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::chunk::chunk_file;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::features::FeatureConfig;
use crate::lookup::{fuzzy_lookup, parse_fingerprint, LookupMatch};
use crate::pool::{Task, WorkerPool};
use crate::progress::{report_interval, IndexProgressEvent, IndexProgressReporter};
use crate::store::{IndexEntry, IndexManager, InMemoryIndex};

/// Everything an indexing run needs besides the paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOptions {
    pub chunk_size: usize,
    pub workers: usize,
    pub features: FeatureConfig,
    pub associated_words: usize,
    pub stop_timeout: Duration,
}

impl Default for IndexOptions {
    fn default() -> Self {
        let config = Config::default();
        Self {
            chunk_size: config.index.chunk_size,
            workers: config.index.workers,
            features: FeatureConfig::default(),
            associated_words: config.index.associated_words,
            stop_timeout: config.index.stop_timeout(),
        }
    }
}

impl IndexOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            chunk_size: config.index.chunk_size,
            workers: config.index.workers,
            features: config.features.to_feature_config()?,
            associated_words: config.index.associated_words,
            stop_timeout: config.index.stop_timeout(),
        })
    }

    fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("chunk size must be at least 1 byte".to_string()));
        }
        if self.workers == 0 {
            return Err(Error::Config("worker count must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// What an indexing run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSummary {
    pub input: PathBuf,
    pub output: PathBuf,
    pub chunks: usize,
    /// Distinct fingerprints in the saved index.
    pub fingerprints: usize,
    pub entries: usize,
}

/// `input` with its extension replaced by `.idx`.
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("idx")
}

/// The first `n` whitespace-separated words of a chunk.
pub fn associated_words(data: &[u8], n: usize) -> Vec<String> {
    String::from_utf8_lossy(data)
        .split_whitespace()
        .take(n)
        .map(str::to_string)
        .collect()
}

/// Chunk `input`, fingerprint every chunk in parallel, and save the index
/// to `output`.
pub fn index_file(
    input: &Path,
    output: &Path,
    options: &IndexOptions,
    progress: &dyn IndexProgressReporter,
) -> Result<IndexSummary> {
    options.validate()?;
    let source_file = input.display().to_string();

    let chunks = chunk_file(input, options.chunk_size)?;
    let total = chunks.len();
    progress.report(IndexProgressEvent::Chunked {
        file: source_file.clone(),
        chunks: total as u64,
    });

    let mut pool = WorkerPool::new(options.workers, options.features.clone())?
        .with_stop_timeout(options.stop_timeout);
    pool.start()?;
    let stream = pool.results();
    let features = options.features.clone();
    let words = options.associated_words;
    let interval = report_interval(total as u64);

    let (index, received, submitted) = thread::scope(|scope| {
        let file = source_file.clone();
        let consumer = scope.spawn(move || {
            let mut index = InMemoryIndex::with_features(features);
            let mut received = 0u64;
            for result in stream {
                let entry = IndexEntry {
                    original_file: result.source_file,
                    size: result.data.len(),
                    position: result.offset,
                    associated_words: associated_words(&result.data, words),
                };
                index.add_fingerprint(result.fingerprint, entry);
                received += 1;
                if received % interval == 0 || received == total as u64 {
                    progress.report(IndexProgressEvent::Hashing {
                        file: file.clone(),
                        n: received,
                        total: total as u64,
                    });
                }
            }
            (index, received)
        });

        let mut submitted = Ok(());
        for (id, data) in chunks.into_iter().enumerate() {
            let task = Task {
                id,
                offset: (id * options.chunk_size) as u64,
                data,
                source_file: source_file.clone(),
            };
            if let Err(e) = pool.submit(task) {
                submitted = Err(e);
                break;
            }
        }

        let outcome = pool.stop();
        debug!(
            completed = outcome.completed,
            outstanding = outcome.outstanding,
            "worker pool stopped"
        );

        match consumer.join() {
            Ok((index, received)) => Ok((index, received, submitted)),
            Err(_) => Err(Error::Pool("index consumer panicked".to_string())),
        }
    })?;
    submitted?;

    if received != total as u64 {
        return Err(Error::Pool(format!(
            "expected {} fingerprints, received {}; index not saved",
            total, received
        )));
    }

    index.save(output)?;
    progress.report(IndexProgressEvent::Saved {
        output: output.display().to_string(),
        fingerprints: index.len() as u64,
    });

    let summary = IndexSummary {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        chunks: total,
        fingerprints: index.len(),
        entries: index.entry_count(),
    };
    info!(
        input = %summary.input.display(),
        output = %summary.output.display(),
        chunks = summary.chunks,
        fingerprints = summary.fingerprints,
        features = options.features.name(),
        "index complete"
    );
    Ok(summary)
}

/// Load the index at `index_path` and find entries within `threshold` bits
/// of `query`.
pub fn run_lookup(index_path: &Path, query: &str, threshold: u32) -> Result<Vec<LookupMatch>> {
    parse_fingerprint(query)?;
    let index = InMemoryIndex::load(index_path)?;
    debug!(
        index = %index_path.display(),
        fingerprints = index.len(),
        "index loaded"
    );
    fuzzy_lookup(index.map(), query, threshold)
}
