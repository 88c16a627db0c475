//! Engine-level error taxonomy.
//!
//! Only structural failures live here. Per-document extraction failures and
//! per-control judgment failures are recovered where they happen and never
//! reach the caller as errors.

use crate::catalog::CatalogError;
use crate::domain::assessment::AssessmentStatus;

/// Errors that end an assessment run.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("evidence corpus is empty: {documents} document(s) supplied, {skipped} skipped")]
    EmptyCorpus { documents: usize, skipped: usize },

    #[error("unknown framework: {0}")]
    UnknownFramework(String),

    #[error("verdict set invariant violated (expected {expected}, got {actual}): {detail}")]
    InvariantViolation {
        expected: usize,
        actual: usize,
        detail: String,
    },

    #[error("verdict for control {control_id} references unknown domain {domain_id}")]
    OrphanDomain {
        control_id: String,
        domain_id: String,
    },

    #[error("no controls to score")]
    NothingToScore,

    #[error("invalid assessment transition: {from} -> {to}")]
    InvalidTransition {
        from: AssessmentStatus,
        to: AssessmentStatus,
    },

    #[error("catalog error: {0}")]
    Catalog(#[source] CatalogError),
}

impl EngineError {
    /// Whether this error fails the run (as opposed to caller misuse).
    pub fn is_structural(&self) -> bool {
        !matches!(self, EngineError::InvalidTransition { .. })
    }
}

impl From<CatalogError> for EngineError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::UnknownFramework(id) => EngineError::UnknownFramework(id),
            other => EngineError::Catalog(other),
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_corpus_display() {
        let err = EngineError::EmptyCorpus {
            documents: 3,
            skipped: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("empty"));
        assert!(msg.contains("3 document(s)"));
    }

    #[test]
    fn test_unknown_framework_from_catalog_error() {
        let err: EngineError = CatalogError::UnknownFramework("iso9001".to_string()).into();
        assert!(matches!(err, EngineError::UnknownFramework(ref id) if id == "iso9001"));
        assert!(err.is_structural());
    }

    #[test]
    fn test_schema_error_wraps_as_catalog() {
        let err: EngineError = CatalogError::Schema {
            framework: "gdpr".to_string(),
            reason: "duplicate control id gdpr-lop-001".to_string(),
        }
        .into();
        assert!(matches!(err, EngineError::Catalog(_)));
        assert!(err.to_string().contains("gdpr-lop-001"));
    }

    #[test]
    fn test_invalid_transition_is_not_structural() {
        let err = EngineError::InvalidTransition {
            from: AssessmentStatus::Completed,
            to: AssessmentStatus::Analyzing,
        };
        assert!(!err.is_structural());
        assert!(err.to_string().contains("completed -> analyzing"));
    }
}
