//! Text extraction collaborator.
//!
//! Extraction is best-effort: a format-specific parser failure degrades to
//! sanitized raw text instead of an error. Only input with nothing usable in
//! it is rejected.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};

/// Why a document yielded no text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("document is empty")]
    Empty,

    #[error("document is corrupt: {reason}")]
    Corrupt { reason: String },

    #[error("extraction worker failed: {0}")]
    Worker(String),
}

pub type ExtractionResult<T> = std::result::Result<T, ExtractionError>;

/// Turns document bytes into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(
        &self,
        bytes: &[u8],
        mime_type: &str,
        filename: &str,
    ) -> ExtractionResult<String>;
}

/// Coarse document format, decided from MIME type and file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
    Word,
    Spreadsheet,
    Other,
}

impl DocumentKind {
    pub fn detect(mime_type: &str, filename: &str) -> Self {
        let mime = mime_type.to_ascii_lowercase();
        let ext = extension(filename);
        let ext = ext.as_deref();

        if mime == "application/pdf" || ext == Some("pdf") {
            DocumentKind::Pdf
        } else if mime.contains("text") || matches!(ext, Some("txt" | "md" | "csv")) {
            DocumentKind::Text
        } else if mime.contains("wordprocessing") || matches!(ext, Some("doc" | "docx")) {
            DocumentKind::Word
        } else if mime.contains("spreadsheet") || matches!(ext, Some("xls" | "xlsx")) {
            DocumentKind::Spreadsheet
        } else {
            DocumentKind::Other
        }
    }
}

/// Best guess at a MIME type from a file name.
pub fn mime_type_for(filename: &str) -> &'static str {
    match extension(filename).as_deref() {
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        Some("csv") => "text/csv",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("xls") => "application/vnd.ms-excel",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

fn extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Extractor for the formats evidence usually arrives in.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinExtractor;

impl BuiltinExtractor {
    pub fn new() -> Self {
        Self
    }

    async fn extract_pdf(&self, bytes: &[u8], filename: &str) -> ExtractionResult<String> {
        let owned = bytes.to_vec();
        let parsed = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&owned))
            .await;

        match parsed {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => {
                warn!(document = %filename, error = %e, "pdf parse failed, using raw text");
                raw_text(bytes)
            }
            Err(join) if join.is_panic() => {
                warn!(document = %filename, "pdf parser panicked, using raw text");
                raw_text(bytes)
            }
            Err(join) => Err(ExtractionError::Worker(join.to_string())),
        }
    }
}

#[async_trait]
impl TextExtractor for BuiltinExtractor {
    async fn extract_text(
        &self,
        bytes: &[u8],
        mime_type: &str,
        filename: &str,
    ) -> ExtractionResult<String> {
        if bytes.is_empty() {
            return Err(ExtractionError::Empty);
        }

        let kind = DocumentKind::detect(mime_type, filename);
        debug!(document = %filename, mime_type, ?kind, bytes = bytes.len(), "extracting text");

        match kind {
            DocumentKind::Pdf => self.extract_pdf(bytes, filename).await,
            DocumentKind::Text => Ok(String::from_utf8_lossy(bytes).into_owned()),
            DocumentKind::Word => match word_runs(bytes) {
                Some(text) => Ok(text),
                None => raw_text(bytes),
            },
            DocumentKind::Spreadsheet | DocumentKind::Other => raw_text(bytes),
        }
    }
}

fn word_run_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"<w:t[^>]*>([^<]*)</w:t>").ok())
        .as_ref()
}

/// Text of every `<w:t>` run, joined by spaces. `None` when there are no runs.
fn word_runs(bytes: &[u8]) -> Option<String> {
    let xml = String::from_utf8_lossy(bytes);
    let runs: Vec<&str> = word_run_pattern()?
        .captures_iter(&xml)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str()))
        .collect();
    if runs.is_empty() {
        None
    } else {
        Some(runs.join(" "))
    }
}

fn raw_text(bytes: &[u8]) -> ExtractionResult<String> {
    let text = sanitize(&String::from_utf8_lossy(bytes));
    if text.is_empty() {
        Err(ExtractionError::Corrupt {
            reason: "no printable text".to_string(),
        })
    } else {
        Ok(text)
    }
}

/// Replace anything outside printable ASCII (plus tab/newline) with a space
/// and collapse whitespace runs.
pub fn sanitize(text: &str) -> String {
    let printable: String = text
        .chars()
        .map(|c| {
            if c == ' ' || c.is_ascii_graphic() || matches!(c, '\n' | '\r' | '\t') {
                c
            } else {
                ' '
            }
        })
        .collect();
    printable.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split text into chunks of at most `max_chars` on paragraph boundaries.
///
/// A single paragraph longer than `max_chars` becomes its own chunk; it is
/// never split.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in split_paragraphs(text) {
        let needed = if current.is_empty() {
            paragraph.chars().count()
        } else {
            current.chars().count() + 2 + paragraph.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Non-blank paragraphs separated by one or more blank lines.
fn split_paragraphs(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    let mut end = 0;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let content = line.trim_end_matches(['\n', '\r']);
        if content.trim().is_empty() {
            if let Some(s) = start.take() {
                out.push(text[s..end].trim());
            }
        } else {
            if start.is_none() {
                start = Some(offset);
            }
            end = offset + content.len();
        }
        offset += line.len();
    }
    if let Some(s) = start {
        out.push(text[s..end].trim());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_input_is_an_error() {
        let err = BuiltinExtractor::new()
            .extract_text(b"", "text/plain", "empty.txt")
            .await
            .unwrap_err();
        assert_eq!(err, ExtractionError::Empty);
    }

    #[tokio::test]
    async fn plain_text_is_decoded_verbatim() {
        let text = BuiltinExtractor::new()
            .extract_text("Access policy\n\nv2".as_bytes(), "text/plain", "policy.txt")
            .await
            .unwrap();
        assert_eq!(text, "Access policy\n\nv2");
    }

    #[tokio::test]
    async fn markdown_detected_by_extension() {
        let text = BuiltinExtractor::new()
            .extract_text(b"# Incident plan", "application/octet-stream", "ir.MD")
            .await
            .unwrap();
        assert_eq!(text, "# Incident plan");
    }

    #[tokio::test]
    async fn word_runs_are_joined() {
        let xml = br#"<w:p><w:r><w:t>Backup</w:t></w:r><w:r><w:t xml:space="preserve">policy</w:t></w:r></w:p>"#;
        let text = BuiltinExtractor::new()
            .extract_text(xml, "", "backup.docx")
            .await
            .unwrap();
        assert_eq!(text, "Backup policy");
    }

    #[tokio::test]
    async fn word_without_runs_falls_back_to_raw() {
        let text = BuiltinExtractor::new()
            .extract_text(b"plain\x00\x01 words", "application/msword", "legacy.doc")
            .await
            .unwrap();
        assert_eq!(text, "plain words");
    }

    #[tokio::test]
    async fn corrupt_pdf_falls_back_to_raw_text() {
        let text = BuiltinExtractor::new()
            .extract_text(b"not really a pdf \xff\xfe", "application/pdf", "scan.pdf")
            .await
            .unwrap();
        assert!(text.starts_with("not really a pdf"));
    }

    #[tokio::test]
    async fn binary_noise_is_corrupt() {
        let err = BuiltinExtractor::new()
            .extract_text(&[0u8, 1, 2, 3, 0xff], "application/octet-stream", "blob.bin")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Corrupt { .. }));
    }

    #[test]
    fn detect_kinds() {
        assert_eq!(DocumentKind::detect("application/pdf", "x"), DocumentKind::Pdf);
        assert_eq!(DocumentKind::detect("", "sheet.XLSX"), DocumentKind::Spreadsheet);
        assert_eq!(
            DocumentKind::detect(mime_type_for("a.docx"), "a.docx"),
            DocumentKind::Word
        );
        assert_eq!(DocumentKind::detect("image/png", "a.png"), DocumentKind::Other);
    }

    #[test]
    fn sanitize_collapses_whitespace() {
        assert_eq!(sanitize("  a\u{2013}b\n\n c\t"), "a b c");
    }

    #[test]
    fn chunks_respect_paragraph_boundaries() {
        let text = "aaaa\n\nbbbb\n\ncccc";
        assert_eq!(chunk_text(text, 10), vec!["aaaa\n\nbbbb", "cccc"]);
        assert_eq!(chunk_text(text, 100), vec!["aaaa\n\nbbbb\n\ncccc"]);
    }

    #[test]
    fn oversized_paragraph_is_kept_whole() {
        let long = "x".repeat(50);
        let text = format!("short\n\n{long}\n\ntail");
        let chunks = chunk_text(&text, 10);
        assert_eq!(chunks, vec!["short".to_string(), long, "tail".to_string()]);
    }

    #[test]
    fn blank_text_has_no_chunks() {
        assert!(chunk_text(" \n\n \n", 100).is_empty());
    }
}
