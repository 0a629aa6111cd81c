//! Indexing progress reporting.
//!
//! Reports observable progress during `textindex index` so users see how
//! many chunks were produced and how many fingerprints have come back from
//! the worker pool. Progress is emitted on **stderr** so stdout remains
//! parseable for scripts.

use std::io::Write;

/// A single progress event for an indexing run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexProgressEvent {
    /// The input was split into `chunks` pieces.
    Chunked { file: String, chunks: u64 },
    /// `n` of `total` fingerprints have been added to the index.
    Hashing { file: String, n: u64, total: u64 },
    /// The index was written to `output`.
    Saved { output: String, fingerprints: u64 },
}

/// Reports indexing progress. Implementations write to stderr (human or JSON).
pub trait IndexProgressReporter: Send + Sync {
    fn report(&self, event: IndexProgressEvent);
}

/// Human-friendly progress on stderr: "index notes.txt  hashing  1,234 / 5,000 chunks".
pub struct StderrProgress;

impl IndexProgressReporter for StderrProgress {
    fn report(&self, event: IndexProgressEvent) {
        let line = match &event {
            IndexProgressEvent::Chunked { file, chunks } => {
                format!("index {}  chunked into {} chunks\n", file, format_number(*chunks))
            }
            IndexProgressEvent::Hashing { file, n, total } => format!(
                "index {}  hashing  {} / {} chunks\n",
                file,
                format_number(*n),
                format_number(*total)
            ),
            IndexProgressEvent::Saved {
                output,
                fingerprints,
            } => format!(
                "index saved {} fingerprints to {}\n",
                format_number(*fingerprints),
                output
            ),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl IndexProgressReporter for JsonProgress {
    fn report(&self, event: IndexProgressEvent) {
        let obj = match &event {
            IndexProgressEvent::Chunked { file, chunks } => serde_json::json!({
                "event": "progress",
                "file": file,
                "phase": "chunked",
                "total": chunks
            }),
            IndexProgressEvent::Hashing { file, n, total } => serde_json::json!({
                "event": "progress",
                "file": file,
                "phase": "hashing",
                "n": n,
                "total": total
            }),
            IndexProgressEvent::Saved {
                output,
                fingerprints,
            } => serde_json::json!({
                "event": "progress",
                "phase": "saved",
                "output": output,
                "fingerprints": fingerprints
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl IndexProgressReporter for NoProgress {
    fn report(&self, _event: IndexProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// How often (in results) the orchestrator emits a `Hashing` event.
pub fn report_interval(total: u64) -> u64 {
    (total / 100).max(1)
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn IndexProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
