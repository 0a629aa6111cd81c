//! Error kinds shared by the indexing pipeline and the lookup engine.
//!
//! Library functions return [`Result<T>`]; the `textindex` binary wraps these
//! in `anyhow` for context and decides the exit code. [`Error::NoMatch`] is a
//! normal "nothing found" outcome and is reported as such by the CLI.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid arguments / configuration values.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Unsupported or unparseable input document or index file.
    #[error("unsupported format: {0}")]
    Format(String),

    /// File open/read/write failure; `op` names the stage that failed.
    #[error("failed to {op} {}: {source}", path.display())]
    Io {
        op: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Query fingerprint is not a decimal unsigned 64-bit integer.
    #[error("invalid query fingerprint '{0}': expected an unsigned 64-bit decimal integer")]
    InvalidQuery(String),

    /// Well-formed query with zero results.
    #[error("no matches for {query} within distance {threshold}")]
    NoMatch { query: String, threshold: u32 },

    /// Worker pool used out of order (submit after stop, double start).
    #[error("worker pool: {0}")]
    Pool(String),
}

impl Error {
    pub(crate) fn io(op: &str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            op: op.to_string(),
            path: path.into(),
            source,
        }
    }

    /// True for the "well-formed query, nothing found" outcome.
    pub fn is_no_match(&self) -> bool {
        matches!(self, Error::NoMatch { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
