//! Domain model for the control evaluation engine.
//!
//! - `Framework` / `Control` / `Domain`: immutable catalog data
//! - `Verdict` / `VerdictSet`: per-control output of one run
//! - `AssessmentRun`: the observable lifecycle of one assessment
//! - `EngineError`: structural failures that end a run

pub mod assessment;
pub mod control;
pub mod error;
pub mod verdict;

pub use assessment::{AssessmentRun, AssessmentSnapshot, AssessmentStatus};
pub use control::{
    Control, ControlDefinition, Domain, Framework, FrameworkCategory, FrameworkDomain,
    FrameworkId, UnknownFrameworkId,
};
pub use error::{EngineError, Result};
pub use verdict::{ComplianceStatus, Judgment, Verdict, VerdictSet, FALLBACK_RATIONALE};
