use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::corpus::SkippedDocument;
use crate::domain::verdict::{ComplianceStatus, VerdictSet};
use crate::orchestrator::AssessmentOutcome;
use crate::scoring::ScoreCard;

pub const REPORT_SCHEMA_VERSION: &str = "1.0";

/// Headline counts of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub controls_analyzed: usize,
    pub met: usize,
    pub partial: usize,
    pub not_met: usize,
    /// Not-met verdicts that are the could-not-evaluate fallback.
    pub unevaluated: usize,
    pub overall_score: u8,
}

impl ReportSummary {
    pub fn new(verdicts: &VerdictSet, scores: &ScoreCard) -> Self {
        Self {
            controls_analyzed: verdicts.len(),
            met: verdicts.count(ComplianceStatus::Met),
            partial: verdicts.count(ComplianceStatus::Partial),
            not_met: verdicts.count(ComplianceStatus::NotMet),
            unevaluated: verdicts.fallbacks().count(),
            overall_score: scores.overall,
        }
    }
}

/// Canonical assessment report artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentReport {
    pub schema_version: String,
    pub engine_version: String,
    pub assessment_id: String,
    pub framework_id: String,
    pub framework_name: String,
    pub generated_at: DateTime<Utc>,
    pub summary: ReportSummary,
    pub scores: ScoreCard,
    pub verdicts: VerdictSet,
    pub skipped_documents: Vec<SkippedDocument>,
}

impl AssessmentReport {
    pub fn from_outcome(outcome: AssessmentOutcome) -> Self {
        Self::from_outcome_at(outcome, Utc::now())
    }

    pub fn from_outcome_at(outcome: AssessmentOutcome, generated_at: DateTime<Utc>) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            engine_version: crate::VERSION.to_string(),
            summary: ReportSummary::new(&outcome.verdicts, &outcome.scores),
            assessment_id: outcome.assessment_id,
            framework_id: outcome.framework_id,
            framework_name: outcome.framework_name,
            generated_at,
            scores: outcome.scores,
            verdicts: outcome.verdicts,
            skipped_documents: outcome.skipped_documents,
        }
    }
}

/// Write the report as pretty JSON.
pub fn write_report_json(path: &Path, report: &AssessmentReport) -> Result<()> {
    let content = serde_json::to_string_pretty(report).context("serialize assessment report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Render a Markdown summary of the report.
pub fn render_report_md(report: &AssessmentReport) -> String {
    let s = &report.summary;
    let mut out = String::new();
    out.push_str(&format!("# {} Readiness Report\n\n", report.framework_name));
    out.push_str(&format!(
        "- assessment: `{}`\n- generated: {}\n- overall score: **{}%**\n\n",
        report.assessment_id,
        report.generated_at.to_rfc3339(),
        s.overall_score
    ));

    out.push_str("## Summary\n");
    out.push_str(&format!(
        "- controls analyzed: {}\n- met: {}\n- partial: {}\n- not met: {}\n- could not evaluate: {}\n\n",
        s.controls_analyzed, s.met, s.partial, s.not_met, s.unevaluated
    ));

    out.push_str("## Domains\n\n");
    out.push_str("| Domain | Controls | Met | Partial | Not met | Score |\n");
    out.push_str("|---|---:|---:|---:|---:|---:|\n");
    for d in &report.scores.by_domain {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} | {}% |\n",
            d.name, d.total, d.met, d.partial, d.not_met, d.score
        ));
    }
    out.push('\n');

    if s.unevaluated > 0 {
        out.push_str("## Could Not Evaluate\n");
        for v in report.verdicts.fallbacks() {
            out.push_str(&format!("- `{}`\n", v.control_id));
        }
        out.push('\n');
    }

    if !report.skipped_documents.is_empty() {
        out.push_str("## Skipped Documents\n");
        for doc in &report.skipped_documents {
            out.push_str(&format!("- `{}`: {}\n", doc.label, doc.reason));
        }
        out.push('\n');
    }
    out
}

/// Write the Markdown summary.
pub fn write_report_md(path: &Path, report: &AssessmentReport) -> Result<()> {
    let md = render_report_md(report);
    std::fs::write(path, md).with_context(|| format!("write {:?}", path))?;
    Ok(())
}
