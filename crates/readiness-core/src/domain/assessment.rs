//! Assessment lifecycle.
//!
//! `AssessmentRun` is the single owner of the externally observable state of
//! one assessment: its status and, once completed, its overall score.
//! Callers can read or subscribe; only the orchestrator (this crate) can
//! drive transitions.
//!
//! ```text
//! pending ──► analyzing ──► completed
//!                  │
//!                  └──────► failed
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::domain::error::{EngineError, Result};

/// Lifecycle status of an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    Pending,
    Analyzing,
    Completed,
    Failed,
}

impl AssessmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AssessmentStatus::Completed | AssessmentStatus::Failed)
    }

    /// Allowed edges of the lifecycle graph.
    pub fn can_transition_to(&self, next: AssessmentStatus) -> bool {
        matches!(
            (*self, next),
            (AssessmentStatus::Pending, AssessmentStatus::Analyzing)
                | (AssessmentStatus::Analyzing, AssessmentStatus::Completed)
                | (AssessmentStatus::Analyzing, AssessmentStatus::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentStatus::Pending => "pending",
            AssessmentStatus::Analyzing => "analyzing",
            AssessmentStatus::Completed => "completed",
            AssessmentStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for AssessmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of an assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentSnapshot {
    pub assessment_id: String,
    pub status: AssessmentStatus,
    /// Set only when `status == Completed`.
    pub overall_score: Option<u8>,
    /// Set only when `status == Failed`.
    pub failure: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Observable lifecycle of one assessment.
#[derive(Debug)]
pub struct AssessmentRun {
    state: watch::Sender<AssessmentSnapshot>,
}

impl AssessmentRun {
    /// Create a pending assessment.
    pub fn new(assessment_id: impl Into<String>) -> Self {
        let (state, _rx) = watch::channel(AssessmentSnapshot {
            assessment_id: assessment_id.into(),
            status: AssessmentStatus::Pending,
            overall_score: None,
            failure: None,
            updated_at: Utc::now(),
        });
        Self { state }
    }

    /// Create a pending assessment with a random id.
    pub fn generate() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    pub fn assessment_id(&self) -> String {
        self.state.borrow().assessment_id.clone()
    }

    pub fn status(&self) -> AssessmentStatus {
        self.state.borrow().status
    }

    /// Overall score, present only once the assessment has completed.
    pub fn overall_score(&self) -> Option<u8> {
        self.state.borrow().overall_score
    }

    pub fn snapshot(&self) -> AssessmentSnapshot {
        self.state.borrow().clone()
    }

    /// Watch every subsequent transition.
    pub fn subscribe(&self) -> watch::Receiver<AssessmentSnapshot> {
        self.state.subscribe()
    }

    pub(crate) fn begin_analysis(&self) -> Result<()> {
        self.transition(AssessmentStatus::Analyzing, None, None)
    }

    pub(crate) fn complete(&self, overall_score: u8) -> Result<()> {
        self.transition(AssessmentStatus::Completed, Some(overall_score), None)
    }

    pub(crate) fn fail(&self, reason: impl Into<String>) -> Result<()> {
        self.transition(AssessmentStatus::Failed, None, Some(reason.into()))
    }

    fn transition(
        &self,
        to: AssessmentStatus,
        overall_score: Option<u8>,
        failure: Option<String>,
    ) -> Result<()> {
        let mut outcome = Ok(());
        self.state.send_if_modified(|snap| {
            if !snap.status.can_transition_to(to) {
                outcome = Err(EngineError::InvalidTransition {
                    from: snap.status,
                    to,
                });
                return false;
            }
            debug!(
                assessment_id = %snap.assessment_id,
                from = %snap.status,
                to = %to,
                "assessment transition"
            );
            snap.status = to;
            snap.overall_score = overall_score;
            snap.failure = failure;
            snap.updated_at = Utc::now();
            true
        });
        outcome
    }
}
