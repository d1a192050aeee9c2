//! Format decoders: raw upload bytes → ordered source sections.
//!
//! The format is chosen from the filename extension alone. Everything after
//! decoding (chunking, batching, retry) is shared by all formats.

use capstone_core::document::{SourceDocument, SourceSection};
use capstone_core::error::IngestError;
use quick_xml::Reader as XmlReader;
use quick_xml::events::Event;
use sha2::{Digest, Sha256};
use std::io::{Cursor, Read};
use zip::ZipArchive;

const DOCX_BODY_PATH: &str = "word/document.xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    PlainText,
    Docx,
}

impl DocumentFormat {
    /// Resolve from the filename extension, case-insensitively.
    pub fn from_filename(filename: &str) -> Result<Self, IngestError> {
        let extension = std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(Self::Pdf),
            "txt" => Ok(Self::PlainText),
            "docx" => Ok(Self::Docx),
            "" => Err(IngestError::UnsupportedFormat(format!("'{filename}' has no extension"))),
            other => Err(IngestError::UnsupportedFormat(format!(".{other}"))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::PlainText => "txt",
            Self::Docx => "docx",
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Vec<SourceSection>, IngestError> {
        match self {
            Self::Pdf => decode_pdf(bytes),
            Self::PlainText => Ok(vec![SourceSection::text(String::from_utf8_lossy(bytes))]),
            Self::Docx => decode_docx(bytes).map(|text| vec![SourceSection::text(text)]),
        }
    }
}

/// Decode an upload into a document whose id is stable for identical
/// filename and content.
pub fn load_document(filename: &str, bytes: &[u8]) -> Result<SourceDocument, IngestError> {
    let format = DocumentFormat::from_filename(filename)?;
    let sections = format.decode(bytes)?;
    tracing::debug!(filename, format = format.as_str(), sections = sections.len(), "Decoded document");
    Ok(SourceDocument {
        id: document_id(filename, bytes),
        filename: filename.to_string(),
        sections,
    })
}

pub fn document_id(filename: &str, bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(filename.as_bytes());
    hasher.update([0u8]);
    hasher.update(bytes);
    let digest = hasher.finalize();
    hex::encode(&digest[..12])
}

fn decode_error(format: DocumentFormat, reason: impl std::fmt::Display) -> IngestError {
    IngestError::Decode {
        format: format.as_str().into(),
        reason: reason.to_string(),
    }
}

/// One section per page, in page order.
fn decode_pdf(bytes: &[u8]) -> Result<Vec<SourceSection>, IngestError> {
    let mut document =
        lopdf::Document::load_mem(bytes).map_err(|e| decode_error(DocumentFormat::Pdf, format!("failed to load: {e}")))?;

    if document.is_encrypted() && document.decrypt("").is_err() {
        return Err(decode_error(DocumentFormat::Pdf, "cannot decrypt password-protected file"));
    }

    let pages: Vec<u32> = document.get_pages().keys().copied().collect();
    let mut sections = Vec::with_capacity(pages.len());
    for page in pages {
        let text = document
            .extract_text(&[page])
            .map_err(|e| decode_error(DocumentFormat::Pdf, format!("page {page}: {e}")))?;
        sections.push(SourceSection::page(page, text));
    }
    Ok(sections)
}

fn decode_docx(bytes: &[u8]) -> Result<String, IngestError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| decode_error(DocumentFormat::Docx, format!("failed to open archive: {e}")))?;

    let mut body = archive
        .by_name(DOCX_BODY_PATH)
        .map_err(|e| decode_error(DocumentFormat::Docx, format!("missing {DOCX_BODY_PATH}: {e}")))?;

    let mut xml = String::new();
    body.read_to_string(&mut xml)
        .map_err(|e| decode_error(DocumentFormat::Docx, format!("failed to read {DOCX_BODY_PATH}: {e}")))?;

    Ok(paragraph_text(&xml))
}

/// Text runs (`w:t`) of each `w:p` paragraph, one paragraph per line.
fn paragraph_text(xml: &str) -> String {
    let mut reader = XmlReader::from_str(xml);
    let mut buf = Vec::new();
    let mut text = String::new();
    let mut first_paragraph = true;
    let mut in_run_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:p" => {
                    if !first_paragraph {
                        text.push('\n');
                    }
                    first_paragraph = false;
                }
                b"w:t" => in_run_text = true,
                _ => (),
            },
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"w:t" {
                    in_run_text = false;
                }
            }
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" => text.push('\n'),
                _ => (),
            },
            Ok(Event::Text(t)) if in_run_text => {
                if let Ok(content) = t.unescape() {
                    text.push_str(&content);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => (),
        }
        buf.clear();
    }

    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_bytes(document_xml: &str) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut out);
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file(DOCX_BODY_PATH, options).unwrap();
            writer.write_all(document_xml.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        out.into_inner()
    }

    #[test]
    fn extension_is_case_insensitive() {
        assert_eq!(DocumentFormat::from_filename("Report.PDF").unwrap(), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::from_filename("notes.TxT").unwrap(), DocumentFormat::PlainText);
        assert_eq!(DocumentFormat::from_filename("memo.docx").unwrap(), DocumentFormat::Docx);
    }

    #[test]
    fn csv_is_rejected() {
        let err = DocumentFormat::from_filename("data.csv").unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFormat(_)));
        assert!(err.to_string().contains(".csv"));
    }

    #[test]
    fn missing_extension_is_rejected() {
        assert!(matches!(
            DocumentFormat::from_filename("README"),
            Err(IngestError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn plain_text_is_one_section() {
        let doc = load_document("notes.txt", b"hello\nworld").unwrap();
        assert_eq!(doc.sections, vec![SourceSection::text("hello\nworld")]);
        assert_eq!(doc.filename, "notes.txt");
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let doc = load_document("notes.txt", &[b'o', b'k', 0xFF]).unwrap();
        assert!(doc.sections[0].text.starts_with("ok"));
    }

    #[test]
    fn document_id_is_stable_and_content_sensitive() {
        assert_eq!(document_id("a.txt", b"x"), document_id("a.txt", b"x"));
        assert_ne!(document_id("a.txt", b"x"), document_id("a.txt", b"y"));
        assert_ne!(document_id("a.txt", b"x"), document_id("b.txt", b"x"));
        assert_eq!(document_id("a.txt", b"x").len(), 24);
    }

    #[test]
    fn docx_paragraphs_become_lines() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>First paragraph.</w:t></w:r></w:p>
    <w:p><w:r><w:t xml:space="preserve">Second </w:t></w:r><w:r><w:t>&amp; last.</w:t></w:r></w:p>
  </w:body>
</w:document>"#;
        let doc = load_document("memo.docx", &docx_bytes(xml)).unwrap();
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].text, "First paragraph.\nSecond & last.");
    }

    #[test]
    fn corrupt_docx_is_decode_error() {
        let err = load_document("memo.docx", b"not a zip").unwrap_err();
        assert!(matches!(err, IngestError::Decode { .. }));
    }

    #[test]
    fn corrupt_pdf_is_decode_error() {
        let err = load_document("paper.pdf", b"%PDF-garbage").unwrap_err();
        assert!(matches!(err, IngestError::Decode { ref format, .. } if format == "pdf"));
    }
}
