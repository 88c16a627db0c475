//! Evidence corpus builder.
//!
//! Merges the text of every evidence document of an assessment into one
//! labelled corpus. A document that cannot be fetched or extracted is logged
//! and skipped; the build only fails when nothing usable is left.

pub mod extract;

use std::sync::Arc;

use evidence_store::{BlobHandle, BlobStore};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::error::{EngineError, Result};
use crate::obs;

pub use extract::{
    chunk_text, mime_type_for, sanitize, BuiltinExtractor, DocumentKind, ExtractionError,
    ExtractionResult, TextExtractor,
};

/// An evidence document supplied inline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceDocument {
    pub label: String,
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl EvidenceDocument {
    pub fn new(label: impl Into<String>, bytes: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }

    /// A plain-text document.
    pub fn text(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(label, text.into().into_bytes(), "text/plain")
    }
}

/// An evidence document already held in a [`BlobStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub label: String,
    pub handle: BlobHandle,
    pub mime_type: String,
}

/// Text of one surviving document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusSection {
    pub label: String,
    pub text: String,
}

impl CorpusSection {
    /// Header line that introduces this section in the concatenated view.
    pub fn header(&self) -> String {
        section_header(&self.label)
    }
}

pub(crate) fn section_header(label: &str) -> String {
    format!("--- Document: {label} ---")
}

/// A document left out of the corpus, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedDocument {
    pub label: String,
    pub reason: String,
}

/// The merged evidence of one assessment run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceCorpus {
    sections: Vec<CorpusSection>,
    skipped: Vec<SkippedDocument>,
    text: String,
}

impl EvidenceCorpus {
    fn new(sections: Vec<CorpusSection>, skipped: Vec<SkippedDocument>) -> Self {
        let text = sections
            .iter()
            .map(|s| format!("{}\n{}", s.header(), s.text))
            .collect::<Vec<_>>()
            .join("\n\n");
        Self {
            sections,
            skipped,
            text,
        }
    }

    /// Surviving documents in input order.
    pub fn sections(&self) -> &[CorpusSection] {
        &self.sections
    }

    pub fn skipped(&self) -> &[SkippedDocument] {
        &self.skipped
    }

    /// All sections, each preceded by its document header.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn document_count(&self) -> usize {
        self.sections.len()
    }
}

/// Builds an [`EvidenceCorpus`] through an injected [`TextExtractor`].
#[derive(Clone)]
pub struct CorpusBuilder {
    extractor: Arc<dyn TextExtractor>,
}

impl Default for CorpusBuilder {
    fn default() -> Self {
        Self::new(Arc::new(BuiltinExtractor::new()))
    }
}

impl CorpusBuilder {
    pub fn new(extractor: Arc<dyn TextExtractor>) -> Self {
        Self { extractor }
    }

    /// Extract every document concurrently and merge the survivors.
    ///
    /// Fails with [`EngineError::EmptyCorpus`] when no document yields
    /// non-whitespace text.
    #[instrument(skip_all, fields(documents = documents.len()))]
    pub async fn build(&self, documents: &[EvidenceDocument]) -> Result<EvidenceCorpus> {
        let outcomes = join_all(documents.iter().map(|doc| async move {
            let outcome = self
                .extractor
                .extract_text(&doc.bytes, &doc.mime_type, &doc.label)
                .await
                .map_err(|e| e.to_string());
            (doc.label.clone(), outcome)
        }))
        .await;

        merge(documents.len(), outcomes)
    }

    /// Fetch each document from `store`, then extract and merge as [`build`].
    ///
    /// A fetch failure is handled like an extraction failure.
    ///
    /// [`build`]: CorpusBuilder::build
    #[instrument(skip_all, fields(documents = documents.len()))]
    pub async fn build_from_store(
        &self,
        store: &dyn BlobStore,
        documents: &[StoredDocument],
    ) -> Result<EvidenceCorpus> {
        let outcomes = join_all(documents.iter().map(|doc| async move {
            let outcome = match store.fetch(&doc.handle).await {
                Ok(bytes) => self
                    .extractor
                    .extract_text(&bytes, &doc.mime_type, &doc.label)
                    .await
                    .map_err(|e| e.to_string()),
                Err(e) => Err(format!("fetch {}: {e}", doc.handle.short())),
            };
            (doc.label.clone(), outcome)
        }))
        .await;

        merge(documents.len(), outcomes)
    }
}

fn merge(
    supplied: usize,
    outcomes: Vec<(String, std::result::Result<String, String>)>,
) -> Result<EvidenceCorpus> {
    let mut sections = Vec::new();
    let mut skipped = Vec::new();

    for (label, outcome) in outcomes {
        let reason = match outcome {
            Ok(text) if !text.trim().is_empty() => {
                debug!(document = %label, chars = text.len(), "document extracted");
                sections.push(CorpusSection {
                    label,
                    text: text.trim().to_string(),
                });
                continue;
            }
            Ok(_) => "no usable text".to_string(),
            Err(reason) => reason,
        };
        obs::emit_document_skipped(&label, &reason);
        skipped.push(SkippedDocument { label, reason });
    }

    if sections.is_empty() {
        return Err(EngineError::EmptyCorpus {
            documents: supplied,
            skipped: skipped.len(),
        });
    }
    Ok(EvidenceCorpus::new(sections, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use evidence_store::MemoryBlobStore;

    /// Fails for any document whose label starts with "bad".
    struct PickyExtractor;

    #[async_trait]
    impl TextExtractor for PickyExtractor {
        async fn extract_text(
            &self,
            bytes: &[u8],
            _mime_type: &str,
            filename: &str,
        ) -> ExtractionResult<String> {
            if filename.starts_with("bad") {
                return Err(ExtractionError::Corrupt {
                    reason: "unreadable".to_string(),
                });
            }
            Ok(String::from_utf8_lossy(bytes).into_owned())
        }
    }

    fn builder() -> CorpusBuilder {
        CorpusBuilder::new(Arc::new(PickyExtractor))
    }

    #[tokio::test]
    async fn sections_keep_input_order_and_labels() {
        let corpus = builder()
            .build(&[
                EvidenceDocument::text("policy.txt", "Access control policy"),
                EvidenceDocument::text("plan.txt", "Incident response plan"),
            ])
            .await
            .unwrap();

        assert_eq!(corpus.document_count(), 2);
        assert_eq!(corpus.sections()[0].label, "policy.txt");
        assert_eq!(
            corpus.text(),
            "--- Document: policy.txt ---\nAccess control policy\n\n\
             --- Document: plan.txt ---\nIncident response plan"
        );
    }

    #[tokio::test]
    async fn failed_document_is_skipped() {
        let corpus = builder()
            .build(&[
                EvidenceDocument::text("bad.pdf", "x"),
                EvidenceDocument::text("good.txt", "Backup schedule"),
            ])
            .await
            .unwrap();

        assert_eq!(corpus.document_count(), 1);
        assert_eq!(corpus.skipped().len(), 1);
        assert_eq!(corpus.skipped()[0].label, "bad.pdf");
        assert!(corpus.skipped()[0].reason.contains("unreadable"));
        assert!(!corpus.text().contains("bad.pdf"));
    }

    #[tokio::test]
    async fn whitespace_only_document_is_skipped() {
        let corpus = builder()
            .build(&[
                EvidenceDocument::text("blank.txt", "  \n\t "),
                EvidenceDocument::text("ok.txt", "Risk register"),
            ])
            .await
            .unwrap();
        assert_eq!(corpus.skipped()[0].reason, "no usable text");
    }

    #[tokio::test]
    async fn no_documents_is_empty_corpus() {
        let err = builder().build(&[]).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::EmptyCorpus {
                documents: 0,
                skipped: 0
            }
        ));
    }

    #[tokio::test]
    async fn all_failures_is_empty_corpus() {
        let err = builder()
            .build(&[
                EvidenceDocument::text("bad-1.pdf", "x"),
                EvidenceDocument::text("blank.txt", "   "),
            ])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::EmptyCorpus {
                documents: 2,
                skipped: 2
            }
        ));
    }

    #[tokio::test]
    async fn build_from_store_skips_missing_blobs() {
        let store = MemoryBlobStore::new();
        let handle = store.store(b"Encryption standard").await.unwrap();
        let missing = BlobHandle::for_bytes(b"never stored");

        let corpus = builder()
            .build_from_store(
                &store,
                &[
                    StoredDocument {
                        label: "missing.txt".to_string(),
                        handle: missing,
                        mime_type: "text/plain".to_string(),
                    },
                    StoredDocument {
                        label: "crypto.txt".to_string(),
                        handle,
                        mime_type: "text/plain".to_string(),
                    },
                ],
            )
            .await
            .unwrap();

        assert_eq!(corpus.sections()[0].text, "Encryption standard");
        assert_eq!(corpus.skipped()[0].label, "missing.txt");
        assert!(corpus.skipped()[0].reason.starts_with("fetch"));
    }
}
