//! Judgment oracle adapter.
//!
//! The oracle is the external collaborator that reads evidence text and
//! returns a compliance opinion as JSON. [`OracleAdapter`] wraps any
//! [`JudgmentOracle`] with a bounded text window, an explicit timeout and a
//! strict response parser. Every failure comes back as a
//! [`JudgmentFailure`]; nothing here panics or retries.

pub mod fakes;
pub mod openai;
pub mod window;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::corpus::EvidenceCorpus;
use crate::domain::control::Control;
use crate::domain::verdict::{ComplianceStatus, Judgment};

pub use openai::{OpenAiOracle, OpenAiOracleConfig};
pub use window::{select_window, WindowConfig, WindowStrategy};

/// A failed oracle consultation. Recovered by the evaluator, never surfaced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JudgmentFailure {
    #[error("oracle call timed out after {0:?}")]
    Timeout(Duration),

    #[error("oracle transport error: {0}")]
    Transport(String),

    #[error("oracle returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("oracle protocol violation: {0}")]
    Protocol(String),
}

pub type JudgmentResult<T> = std::result::Result<T, JudgmentFailure>;

/// Everything the oracle needs to judge one control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgmentRequest {
    pub framework_name: String,
    pub control_id: String,
    pub control_name: String,
    pub control_description: String,
    pub required_evidence: Vec<String>,
    pub corpus_window: String,
}

impl JudgmentRequest {
    pub fn new(framework_name: &str, control: &Control, corpus_window: String) -> Self {
        Self {
            framework_name: framework_name.to_string(),
            control_id: control.id.clone(),
            control_name: control.name.clone(),
            control_description: control.description.clone(),
            required_evidence: control.required_evidence.clone(),
            corpus_window,
        }
    }

    /// Natural-language prompt anchored to this control.
    pub fn prompt(&self) -> String {
        format!(
            "You are a {framework} compliance auditor. Analyze this document for control {id}: \"{name}\".\n\
             \n\
             Requirement: {description}\n\
             Evidence needed: {evidence}\n\
             \n\
             Document:\n\
             {window}\n\
             \n\
             Respond ONLY with JSON:\n\
             {{\n  \"status\": \"met\" OR \"partial\" OR \"not_met\",\n  \"confidence\": 0-100,\n  \"rationale\": \"brief summary\"\n}}",
            framework = self.framework_name,
            id = self.control_id,
            name = self.control_name,
            description = self.control_description,
            evidence = self.required_evidence.join(", "),
            window = self.corpus_window,
        )
    }
}

/// The external judgment collaborator.
///
/// Implementations return the oracle's raw structured answer; validation is
/// the adapter's job.
#[async_trait]
pub trait JudgmentOracle: Send + Sync {
    async fn judge(&self, request: &JudgmentRequest) -> JudgmentResult<Value>;
}

/// One best-effort, time-bounded, strictly validated oracle call.
#[derive(Clone)]
pub struct OracleAdapter {
    oracle: Arc<dyn JudgmentOracle>,
    timeout: Duration,
    window: WindowConfig,
}

impl OracleAdapter {
    pub fn new(oracle: Arc<dyn JudgmentOracle>, timeout: Duration, window: WindowConfig) -> Self {
        Self {
            oracle,
            timeout,
            window,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Judge `control` against a window of `corpus`.
    pub async fn judge(
        &self,
        framework_name: &str,
        corpus: &EvidenceCorpus,
        control: &Control,
    ) -> JudgmentResult<Judgment> {
        let window = select_window(corpus, control, &self.window);
        debug!(
            control_id = %control.id,
            window_chars = window.chars().count(),
            "consulting oracle"
        );
        let request = JudgmentRequest::new(framework_name, control, window);

        let raw = tokio::time::timeout(self.timeout, self.oracle.judge(&request))
            .await
            .map_err(|_| JudgmentFailure::Timeout(self.timeout))??;

        parse_judgment(&raw)
    }
}

/// Strictly validate an oracle answer.
///
/// Requires `status` in the three-valued enum, a finite `confidence` in
/// `[0, 100]` (integer or float, rounded) and a string `rationale`
/// (`evidence_summary` is accepted as an alias).
pub fn parse_judgment(raw: &Value) -> JudgmentResult<Judgment> {
    let obj = raw
        .as_object()
        .ok_or_else(|| JudgmentFailure::Protocol("response is not a JSON object".to_string()))?;

    let status = match obj.get("status").and_then(Value::as_str) {
        Some("met") => ComplianceStatus::Met,
        Some("partial") => ComplianceStatus::Partial,
        Some("not_met") => ComplianceStatus::NotMet,
        Some(other) => {
            return Err(JudgmentFailure::Protocol(format!(
                "status {other:?} is not one of met, partial, not_met"
            )))
        }
        None => return Err(JudgmentFailure::Protocol("missing status".to_string())),
    };

    let confidence = obj
        .get("confidence")
        .and_then(Value::as_f64)
        .ok_or_else(|| JudgmentFailure::Protocol("missing or non-numeric confidence".to_string()))?;
    if !confidence.is_finite() || !(0.0..=100.0).contains(&confidence) {
        return Err(JudgmentFailure::Protocol(format!(
            "confidence {confidence} outside 0..=100"
        )));
    }

    let rationale = obj
        .get("rationale")
        .or_else(|| obj.get("evidence_summary"))
        .and_then(Value::as_str)
        .ok_or_else(|| JudgmentFailure::Protocol("missing rationale".to_string()))?;

    Ok(Judgment {
        status,
        confidence: confidence.round() as u8,
        rationale: rationale.to_string(),
    })
}
