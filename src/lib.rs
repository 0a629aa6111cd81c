//! # textblitz
//!
//! Chunked SimHash indexing and fuzzy near-duplicate lookup for large text
//! documents.
//!
//! A document is split into fixed-size byte chunks, each chunk is reduced to
//! a 64-bit SimHash fingerprint on a pool of worker threads, and the
//! fingerprints are stored in an index mapping each fingerprint to where its
//! chunk came from. Lookups return every chunk whose fingerprint lies within
//! a Hamming-distance threshold of a query.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────┐
//! │ extract  │──▶│    chunk     │──▶│  WorkerPool  │──▶│  store   │
//! │ PDF/DOCX │   │ fixed bytes  │   │   SimHash    │   │  .idx    │
//! └──────────┘   └──────────────┘   └──────────────┘   └────┬─────┘
//!                                                           │
//!                                      ┌────────────────────┤
//!                                      ▼                    ▼
//!                                 ┌──────────┐        ┌──────────┐
//!                                 │  lookup  │        │  export  │
//!                                 │ Hamming  │        │ JSON/CSV │
//!                                 └──────────┘        └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`features`] | Word and n-gram feature extraction |
//! | [`simhash`] | FNV-1a SimHash fingerprints and Hamming distance |
//! | [`extract`] | PDF / DOCX text extraction |
//! | [`chunk`] | Fixed-size byte chunking |
//! | [`pool`] | Bounded worker pool |
//! | [`store`] | Index entries, persistence |
//! | [`lookup`] | Fuzzy lookup and the lookup report |
//! | [`index`] | Index / lookup orchestration |
//! | [`export`] | JSON and CSV export |
//! | [`config`] | TOML configuration parsing |
//! | [`progress`] | Progress reporting on stderr |
//! | [`error`] | Error kinds |

pub mod chunk;
pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod features;
pub mod index;
pub mod lookup;
pub mod pool;
pub mod progress;
pub mod simhash;
pub mod store;

pub use error::{Error, Result};
pub use features::{FeatureConfig, FeatureSet};
pub use index::{index_file, run_lookup, IndexOptions, IndexSummary};
pub use lookup::{fuzzy_lookup, LookupMatch};
pub use simhash::{hamming_distance, SimHashGenerator};
pub use store::{IndexEntry, IndexManager, IndexMap, InMemoryIndex};
