//! Fixed-size byte chunker.
//!
//! Splits document content into `ceil(len / chunk_size)` contiguous chunks;
//! every chunk but the last is exactly `chunk_size` bytes. The copy runs in
//! parallel on the `rayon` pool, but the returned order is always byte-offset
//! order, so chunk `i` starts at `i * chunk_size`.
//!
//! [`chunk_file`] reads a document from disk first, converting PDF/DOCX to
//! text via [`crate::extract`].

use std::path::Path;

use rayon::prelude::*;
use tracing::debug;

use crate::error::{Error, Result};
use crate::extract::{extract_text, DocumentKind};

/// Split `data` into fixed-size chunks in offset order.
pub fn chunk_bytes(data: &[u8], chunk_size: usize) -> Result<Vec<Vec<u8>>> {
    if chunk_size == 0 {
        return Err(Error::Config("chunk size must be at least 1 byte".to_string()));
    }
    Ok(data.par_chunks(chunk_size).map(<[u8]>::to_vec).collect())
}

/// Number of chunks `chunk_bytes` produces for `len` bytes.
pub fn chunk_count(len: usize, chunk_size: usize) -> usize {
    if chunk_size == 0 {
        return 0;
    }
    len.div_ceil(chunk_size)
}

/// Read a document and split its (extracted) content into chunks.
///
/// Fails with [`Error::Format`] for unsupported extensions and
/// [`Error::Io`] when the file cannot be read.
pub fn chunk_file(path: &Path, chunk_size: usize) -> Result<Vec<Vec<u8>>> {
    if chunk_size == 0 {
        return Err(Error::Config("chunk size must be at least 1 byte".to_string()));
    }
    let kind = DocumentKind::from_path(path)?;
    let raw = std::fs::read(path).map_err(|e| Error::io("read", path, e))?;

    let chunks = match kind {
        DocumentKind::PlainText => chunk_bytes(&raw, chunk_size)?,
        other => {
            let text = extract_text(&raw, other)?;
            chunk_bytes(text.as_bytes(), chunk_size)?
        }
    };

    debug!(
        path = %path.display(),
        kind = ?kind,
        bytes = raw.len(),
        chunks = chunks.len(),
        "chunked document"
    );
    Ok(chunks)
}
