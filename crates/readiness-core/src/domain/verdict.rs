//! Per-control verdicts and the verdict set of one run.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::control::Control;
use crate::domain::error::{EngineError, Result};

/// Rationale carried by every fallback verdict.
pub const FALLBACK_RATIONALE: &str = "Analysis failed";

/// Three-valued compliance status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Met,
    Partial,
    NotMet,
}

impl ComplianceStatus {
    /// Points contributed to a score: met 100, partial 50, not met 0.
    pub fn points(&self) -> u64 {
        match self {
            ComplianceStatus::Met => 100,
            ComplianceStatus::Partial => 50,
            ComplianceStatus::NotMet => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceStatus::Met => "met",
            ComplianceStatus::Partial => "partial",
            ComplianceStatus::NotMet => "not_met",
        }
    }
}

impl std::fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated oracle opinion about one control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Judgment {
    pub status: ComplianceStatus,
    /// 0–100.
    pub confidence: u8,
    pub rationale: String,
}

/// The engine's output for one control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub control_id: String,
    pub domain_id: String,
    pub status: ComplianceStatus,
    /// 0–100.
    pub confidence: u8,
    pub rationale: String,
}

impl Verdict {
    /// Carry a judgment through unchanged.
    pub fn from_judgment(control: &Control, judgment: Judgment) -> Self {
        Self {
            control_id: control.id.clone(),
            domain_id: control.domain_id.clone(),
            status: judgment.status,
            confidence: judgment.confidence,
            rationale: judgment.rationale,
        }
    }

    /// The defined result for a control that could not be evaluated.
    pub fn fallback(control: &Control) -> Self {
        Self {
            control_id: control.id.clone(),
            domain_id: control.domain_id.clone(),
            status: ComplianceStatus::NotMet,
            confidence: 0,
            rationale: FALLBACK_RATIONALE.to_string(),
        }
    }

    /// Whether this verdict is the could-not-evaluate sentinel.
    pub fn is_fallback(&self) -> bool {
        self.status == ComplianceStatus::NotMet
            && self.confidence == 0
            && self.rationale == FALLBACK_RATIONALE
    }
}

/// Exactly one verdict per catalog control.
///
/// The only constructor checks the 1:1 invariant against the catalog, so a
/// `VerdictSet` in hand is always complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerdictSet {
    verdicts: Vec<Verdict>,
}

impl VerdictSet {
    /// Assemble a verdict set, verifying one verdict per control id with no
    /// duplicates and no omissions. Verdicts are kept in catalog order.
    pub fn assemble(controls: &[Control], verdicts: Vec<Verdict>) -> Result<Self> {
        if verdicts.len() != controls.len() {
            return Err(EngineError::InvariantViolation {
                expected: controls.len(),
                actual: verdicts.len(),
                detail: "verdict count does not match catalog size".to_string(),
            });
        }

        {
            let mut seen = HashSet::with_capacity(verdicts.len());
            for verdict in &verdicts {
                if !seen.insert(verdict.control_id.as_str()) {
                    return Err(EngineError::InvariantViolation {
                        expected: controls.len(),
                        actual: verdicts.len(),
                        detail: format!("duplicate verdict for control {}", verdict.control_id),
                    });
                }
            }
        }

        let actual = verdicts.len();
        let mut ordered = Vec::with_capacity(controls.len());
        let mut remaining = verdicts;
        for control in controls {
            let pos = remaining
                .iter()
                .position(|v| v.control_id == control.id)
                .ok_or_else(|| EngineError::InvariantViolation {
                    expected: controls.len(),
                    actual,
                    detail: format!("missing verdict for control {}", control.id),
                })?;
            ordered.push(remaining.swap_remove(pos));
        }

        Ok(Self { verdicts: ordered })
    }

    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Verdict> {
        self.verdicts.iter()
    }

    pub fn get(&self, control_id: &str) -> Option<&Verdict> {
        self.verdicts.iter().find(|v| v.control_id == control_id)
    }

    pub fn count(&self, status: ComplianceStatus) -> usize {
        self.verdicts.iter().filter(|v| v.status == status).count()
    }

    /// Verdicts that are the could-not-evaluate sentinel.
    pub fn fallbacks(&self) -> impl Iterator<Item = &Verdict> {
        self.verdicts.iter().filter(|v| v.is_fallback())
    }
}

impl<'a> IntoIterator for &'a VerdictSet {
    type Item = &'a Verdict;
    type IntoIter = std::slice::Iter<'a, Verdict>;

    fn into_iter(self) -> Self::IntoIter {
        self.verdicts.iter()
    }
}
