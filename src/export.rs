//! Export a saved index in a human-readable form.
//!
//! JSON output is the entry map pretty-printed with keys in ascending order.
//! CSV output has one row per entry under the header
//! `SimHash,Original File,Position,Size,Associated Words`.

use std::io::Write;
use std::path::Path;

use crate::error::{Error, Result};
use crate::store::{IndexManager, IndexMap, InMemoryIndex};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl std::str::FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(Error::Config(format!(
                "unknown export format '{}'; must be json or csv",
                other
            ))),
        }
    }
}

struct ExportRow<'a> {
    simhash: &'a str,
    original_file: &'a str,
    position: u64,
    size: usize,
    associated_words: String,
}

pub fn render_json(map: &IndexMap) -> Result<String> {
    serde_json::to_string_pretty(map)
        .map_err(|e| Error::Format(format!("failed to encode index as JSON: {}", e)))
}

pub fn render_csv(map: &IndexMap) -> String {
    let mut out = String::from("SimHash,Original File,Position,Size,Associated Words\n");
    for row in rows(map) {
        let fields = [
            csv_field(row.simhash),
            csv_field(row.original_file),
            row.position.to_string(),
            row.size.to_string(),
            csv_field(&row.associated_words),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

fn rows(map: &IndexMap) -> impl Iterator<Item = ExportRow<'_>> {
    map.iter().flat_map(|(key, entries)| {
        entries.iter().map(move |entry| ExportRow {
            simhash: key,
            original_file: &entry.original_file,
            position: entry.position,
            size: entry.size,
            associated_words: entry.associated_words.join(" "),
        })
    })
}

/// Quote a field when it holds a comma, quote, or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn render(map: &IndexMap, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => render_json(map),
        ExportFormat::Csv => Ok(render_csv(map)),
    }
}

/// Export the index at `input`.
///
/// If `output` is `Some`, writes to that file path. Otherwise writes
/// to stdout for piping.
pub fn run_export(input: &Path, output: Option<&Path>, format: ExportFormat) -> Result<()> {
    let index = InMemoryIndex::load(input)?;
    let rendered = render(index.map(), format)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| Error::io("create directory", parent, e))?;
                }
            }
            std::fs::write(path, &rendered).map_err(|e| Error::io("write export", path, e))?;
            eprintln!(
                "Exported {} fingerprints, {} entries to {}",
                index.len(),
                index.entry_count(),
                path.display()
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(rendered.as_bytes())
                .and_then(|_| {
                    if rendered.ends_with('\n') {
                        Ok(())
                    } else {
                        stdout.write_all(b"\n")
                    }
                })
                .map_err(|e| Error::io("write export to", "<stdout>", e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::IndexEntry;

    fn map() -> IndexMap {
        let mut map = IndexMap::new();
        map.insert(
            "9".to_string(),
            vec![IndexEntry {
                original_file: "b, \"quoted\".txt".to_string(),
                size: 3,
                position: 4096,
                associated_words: vec!["x".to_string()],
            }],
        );
        map.insert(
            "10".to_string(),
            vec![IndexEntry {
                original_file: "a.txt".to_string(),
                size: 4096,
                position: 0,
                associated_words: vec!["hello".to_string(), "world".to_string()],
            }],
        );
        map
    }

    #[test]
    fn csv_has_header_and_quoted_fields() {
        let csv = render_csv(&map());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "SimHash,Original File,Position,Size,Associated Words");
        assert_eq!(lines[1], "10,a.txt,0,4096,hello world");
        assert_eq!(lines[2], "9,\"b, \"\"quoted\"\".txt\",4096,3,x");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn json_keys_are_sorted() {
        let json = render_json(&map()).unwrap();
        let first = json.find("\"10\"").unwrap();
        let second = json.find("\"9\"").unwrap();
        assert!(first < second);
        let parsed: IndexMap = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, map());
    }

    #[test]
    fn format_parses() {
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!("xml".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn run_export_writes_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let idx = dir.path().join("doc.idx");
        InMemoryIndex::from_map(map()).save(&idx).unwrap();
        let out = dir.path().join("out/doc.csv");
        run_export(&idx, Some(&out), ExportFormat::Csv).unwrap();
        let text = std::fs::read_to_string(&out).unwrap();
        assert!(text.starts_with("SimHash,"));
        assert_eq!(text.lines().count(), 3);
    }
}
