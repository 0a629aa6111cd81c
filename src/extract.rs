//! Plain-text extraction for rich document formats (PDF, DOCX).
//!
//! The chunker only ever works on bytes already in memory. Documents that are
//! not plain text are first converted here; anything this module cannot
//! handle is reported as [`Error::Format`] naming the extension.

use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Extensions indexed as-is, without conversion.
const PLAIN_TEXT_EXTENSIONS: &[&str] = &["txt", "text", "md", "log", "csv"];

/// Input document kind, decided from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    PlainText,
    Pdf,
    Docx,
}

impl DocumentKind {
    /// Classify by lower-cased extension. No extension counts as plain text.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = match path.extension() {
            Some(ext) => ext.to_string_lossy().to_lowercase(),
            None => return Ok(DocumentKind::PlainText),
        };
        match ext.as_str() {
            e if PLAIN_TEXT_EXTENSIONS.contains(&e) => Ok(DocumentKind::PlainText),
            "pdf" => Ok(DocumentKind::Pdf),
            "docx" => Ok(DocumentKind::Docx),
            other => Err(Error::Format(format!("unsupported file type: .{}", other))),
        }
    }
}

/// Convert document bytes to UTF-8 text.
///
/// Plain text is decoded lossily; PDF and DOCX go through their extractors.
pub fn extract_text(bytes: &[u8], kind: DocumentKind) -> Result<String> {
    match kind {
        DocumentKind::PlainText => Ok(String::from_utf8_lossy(bytes).into_owned()),
        DocumentKind::Pdf => extract_pdf(bytes),
        DocumentKind::Docx => extract_docx(bytes),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| Error::Format(format!("PDF extraction failed: {}", e)))
}

fn docx_err(e: impl std::fmt::Display) -> Error {
    Error::Format(format!("DOCX extraction failed: {}", e))
}

fn read_zip_entry_bounded(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>> {
    let entry = archive.by_name(name).map_err(docx_err)?;
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .map_err(docx_err)?;
    if out.len() as u64 >= max_bytes {
        return Err(docx_err(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, max_bytes
        )));
    }
    Ok(out)
}

fn extract_docx(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(docx_err)?;
    let xml = read_zip_entry_bounded(&mut archive, "word/document.xml", MAX_XML_ENTRY_BYTES)?;
    document_xml_text(&xml)
}

/// Concatenate `<w:t>` runs; paragraph ends and breaks become newlines.
fn document_xml_text(xml: &[u8]) -> Result<String> {
    use quick_xml::events::Event;

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_text = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Text(te)) if in_text => {
                let text = te.unescape().map_err(docx_err)?;
                out.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"br" | b"cr" => out.push('\n'),
                b"tab" => out.push('\t'),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(docx_err(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_extensions() {
        for name in ["a.txt", "a.TXT", "notes.md", "README", "x.log"] {
            assert_eq!(
                DocumentKind::from_path(Path::new(name)).unwrap(),
                DocumentKind::PlainText,
                "{}",
                name
            );
        }
    }

    #[test]
    fn rich_document_extensions() {
        assert_eq!(
            DocumentKind::from_path(Path::new("paper.PDF")).unwrap(),
            DocumentKind::Pdf
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("memo.docx")).unwrap(),
            DocumentKind::Docx
        );
    }

    #[test]
    fn unsupported_extension_is_named() {
        let err = DocumentKind::from_path(Path::new("image.png")).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
        assert!(err.to_string().contains(".png"));
    }

    #[test]
    fn plain_text_decodes_lossily() {
        let text = extract_text(&[b'h', b'i', 0xff], DocumentKind::PlainText).unwrap();
        assert!(text.starts_with("hi"));
    }

    #[test]
    fn invalid_pdf_returns_format_error() {
        let err = extract_text(b"not a pdf", DocumentKind::Pdf).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn invalid_zip_returns_format_error_for_docx() {
        let err = extract_text(b"not a zip", DocumentKind::Docx).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn document_xml_paragraphs_become_lines() {
        let xml = br#"<?xml version="1.0"?><w:document xmlns:w="urn:w"><w:body><w:p><w:r><w:t>first</w:t></w:r><w:r><w:t xml:space="preserve"> run</w:t></w:r></w:p><w:p><w:r><w:t>second &amp; last</w:t></w:r></w:p></w:body></w:document>"#;
        let text = document_xml_text(xml).unwrap();
        assert_eq!(text, "first run\nsecond & last\n");
    }
}
