//! Readiness Core
//!
//! Control evaluation engine for compliance readiness assessments: turns a
//! set of evidence documents and a framework's control catalog into one
//! verdict per control and an aggregate score.
//!
//! Layering, leaf first:
//! - [`corpus`]: evidence corpus builder and text extraction
//! - [`catalog`]: framework registry and control catalog accessor
//! - [`oracle`]: judgment oracle adapter, HTTP oracle and test stubs
//! - [`evaluator`]: one control, one verdict
//! - [`orchestrator`]: fan-out over a catalog, drives the assessment lifecycle
//! - [`scoring`]: per-domain and overall percentages
//! - [`reporting`]: JSON and Markdown artifacts

pub mod catalog;
pub mod config;
pub mod corpus;
pub mod domain;
pub mod evaluator;
pub mod metrics;
pub mod obs;
pub mod oracle;
pub mod orchestrator;
pub mod reporting;
pub mod scoring;
pub mod telemetry;

pub use catalog::{Catalog, CatalogError, ControlCatalog, FrameworkSummary};
pub use config::EngineConfig;
pub use corpus::{
    BuiltinExtractor, CorpusBuilder, EvidenceCorpus, EvidenceDocument, ExtractionError,
    SkippedDocument, StoredDocument, TextExtractor,
};
pub use domain::{
    AssessmentRun, AssessmentSnapshot, AssessmentStatus, ComplianceStatus, Control, Domain,
    EngineError, Framework, FrameworkCategory, FrameworkId, Judgment, Result, Verdict, VerdictSet,
    FALLBACK_RATIONALE,
};
pub use evaluator::ControlEvaluator;
pub use metrics::{EngineMetrics, MetricsSnapshot};
pub use oracle::{
    JudgmentFailure, JudgmentOracle, JudgmentRequest, OpenAiOracle, OpenAiOracleConfig,
    OracleAdapter, WindowConfig, WindowStrategy,
};
pub use orchestrator::{AssessmentOutcome, Orchestrator};
pub use reporting::{AssessmentReport, ReportSummary};
pub use scoring::{DomainScore, ScoreCard};

/// Crate version, as recorded in reports.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
