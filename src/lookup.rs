//! Fuzzy fingerprint lookup.
//!
//! [`fuzzy_lookup`] scans every key in an [`IndexMap`], parses it back into
//! a fingerprint, and keeps the entries of each key whose Hamming distance to
//! the query is at most the threshold. The scan is linear in the number of
//! keys. A threshold of 0 is an exact match.
//!
//! Keys that do not parse are skipped; one corrupt record must not make the
//! rest of the index unreachable. Zero matches is reported as
//! [`Error::NoMatch`], which callers treat as a normal outcome rather than
//! a failure.

use std::io::Write;

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::simhash::hamming_distance;
use crate::store::{IndexEntry, IndexMap};

/// Largest meaningful distance between two 64-bit fingerprints.
pub const MAX_DISTANCE: u32 = 64;

/// One matched entry and how far its fingerprint is from the query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupMatch {
    pub fingerprint: u64,
    pub distance: u32,
    pub entry: IndexEntry,
}

/// Canonical decimal digits only: no sign, whitespace or radix prefix.
fn parse_decimal(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Parse a query fingerprint (decimal `u64`, no surrounding whitespace).
pub fn parse_fingerprint(query: &str) -> Result<u64> {
    parse_decimal(query).ok_or_else(|| Error::InvalidQuery(query.to_string()))
}

/// All entries whose fingerprint is within `threshold` bits of `query`.
///
/// Keys are visited in the map's key order and each key's entries keep their
/// insertion order; no ranking by distance is applied.
pub fn fuzzy_lookup(index: &IndexMap, query: &str, threshold: u32) -> Result<Vec<LookupMatch>> {
    let target = parse_fingerprint(query)?;
    let threshold = threshold.min(MAX_DISTANCE);

    let mut matches = Vec::new();
    let mut skipped = 0usize;
    for (key, entries) in index {
        let fingerprint = match parse_decimal(key) {
            Some(fp) => fp,
            None => {
                skipped += 1;
                debug!(key = %key, "skipping index key that is not a fingerprint");
                continue;
            }
        };
        let distance = hamming_distance(target, fingerprint);
        if distance <= threshold {
            matches.extend(entries.iter().map(|entry| LookupMatch {
                fingerprint,
                distance,
                entry: entry.clone(),
            }));
        }
    }

    debug!(
        query,
        threshold,
        keys = index.len(),
        skipped,
        matched = matches.len(),
        "fuzzy lookup finished"
    );

    if matches.is_empty() {
        return Err(Error::NoMatch {
            query: query.to_string(),
            threshold,
        });
    }
    Ok(matches)
}

/// Write the human-readable lookup report, one block per match.
pub fn write_report<W: Write>(out: &mut W, query: &str, matches: &[LookupMatch]) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "Lookup Complete! {} match{}",
        matches.len(),
        if matches.len() == 1 { "" } else { "es" }
    )?;
    writeln!(out, "------------------------------------------------")?;
    for m in matches {
        writeln!(out, "| SimHash          : {}", query)?;
        writeln!(out, "| Matched SimHash  : {} (distance {})", m.fingerprint, m.distance)?;
        writeln!(out, "| Original File    : {}", m.entry.original_file)?;
        writeln!(out, "| Position         : Byte {}", m.entry.position)?;
        writeln!(out, "| Size             : {} bytes", m.entry.size)?;
        writeln!(
            out,
            "| Associated Words : \"{}\"",
            m.entry.associated_words.join(" ")
        )?;
        writeln!(out, "------------------------------------------------")?;
    }
    writeln!(out)
}
