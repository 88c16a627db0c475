//! Structured observability hooks for assessment lifecycle events.
//!
//! - Assessment-scoped tracing spans via the [`AssessmentSpan`] RAII guard
//! - Emitters for lifecycle events, each carrying a stable `event` field
//!
//! Events are emitted at `info!` level except skips and fallbacks, which are
//! warnings.

use tracing::{info, warn};

use crate::domain::verdict::Verdict;

/// RAII guard that enters an assessment-scoped span.
///
/// ```ignore
/// let _span = AssessmentSpan::enter("asmt-42");
/// // every event below carries assessment_id = "asmt-42"
/// ```
pub struct AssessmentSpan {
    _span: tracing::span::EnteredSpan,
}

impl AssessmentSpan {
    pub fn enter(assessment_id: &str) -> Self {
        Self {
            _span: assessment_span(assessment_id).entered(),
        }
    }
}

/// Span for instrumenting an assessment future.
///
/// [`AssessmentSpan`] holds an entered span and must not live across an
/// `.await`; async code attaches this span with `Instrument` instead.
pub fn assessment_span(assessment_id: &str) -> tracing::Span {
    tracing::info_span!("readiness.assessment", assessment_id = %assessment_id)
}

pub fn emit_assessment_started(assessment_id: &str, framework_id: &str, documents: usize) {
    info!(
        event = "assessment.started",
        assessment_id = %assessment_id,
        framework_id = %framework_id,
        documents = documents,
    );
}

pub fn emit_corpus_built(assessment_id: &str, sections: usize, skipped: usize, chars: usize) {
    info!(
        event = "assessment.corpus_built",
        assessment_id = %assessment_id,
        sections = sections,
        skipped = skipped,
        chars = chars,
    );
}

pub fn emit_document_skipped(document: &str, reason: &str) {
    warn!(event = "document.skipped", document = %document, reason = %reason);
}

pub fn emit_control_evaluated(verdict: &Verdict) {
    info!(
        event = "control.evaluated",
        control_id = %verdict.control_id,
        status = %verdict.status,
        confidence = verdict.confidence,
    );
}

/// A control fell back to the could-not-evaluate verdict.
pub fn emit_control_fallback(control_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "control.fallback", control_id = %control_id, error = %error);
}

pub fn emit_assessment_completed(
    assessment_id: &str,
    overall_score: u8,
    controls: usize,
    fallbacks: usize,
    duration_ms: u64,
) {
    info!(
        event = "assessment.completed",
        assessment_id = %assessment_id,
        overall_score = overall_score,
        controls = controls,
        fallbacks = fallbacks,
        duration_ms = duration_ms,
    );
}

pub fn emit_assessment_failed(assessment_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "assessment.failed", assessment_id = %assessment_id, error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assessment_span_enters() {
        let _span = AssessmentSpan::enter("asmt-span");
        emit_assessment_started("asmt-span", "soc2", 1);
    }
}
