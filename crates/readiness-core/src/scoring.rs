//! Scoring aggregator.
//!
//! Pure reduction of a [`VerdictSet`] into per-domain and overall integer
//! percentages: met = 100 points, partial = 50, not met = 0, score =
//! `round(points / count)` with halves rounded up.

use serde::{Deserialize, Serialize};

use crate::domain::control::Domain;
use crate::domain::error::{EngineError, Result};
use crate::domain::verdict::{ComplianceStatus, VerdictSet};

/// Roll-up of one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainScore {
    pub domain_id: String,
    pub name: String,
    pub total: usize,
    pub met: usize,
    pub partial: usize,
    pub not_met: usize,
    pub score: u8,
}

/// Overall and per-domain scores of one verdict set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub overall: u8,
    /// In catalog domain order; domains without verdicts are omitted.
    pub by_domain: Vec<DomainScore>,
}

/// Integer percentage with half-up rounding. `total` must be non-zero.
fn percentage(points: u64, total: u64) -> u8 {
    // Bounded by 100 because each control contributes at most 100 points.
    ((2 * points + total) / (2 * total)).min(100) as u8
}

/// Score `verdicts` against the framework's `domains`.
///
/// Fails with [`EngineError::NothingToScore`] for an empty set and with
/// [`EngineError::OrphanDomain`] if a verdict names a domain not in
/// `domains`.
pub fn score(verdicts: &VerdictSet, domains: &[Domain]) -> Result<ScoreCard> {
    if verdicts.is_empty() {
        return Err(EngineError::NothingToScore);
    }

    let mut by_domain: Vec<DomainScore> = domains
        .iter()
        .map(|d| DomainScore {
            domain_id: d.id.clone(),
            name: d.name.clone(),
            total: 0,
            met: 0,
            partial: 0,
            not_met: 0,
            score: 0,
        })
        .collect();

    let mut points: u64 = 0;
    for verdict in verdicts {
        let slot = by_domain
            .iter_mut()
            .find(|d| d.domain_id == verdict.domain_id)
            .ok_or_else(|| EngineError::OrphanDomain {
                control_id: verdict.control_id.clone(),
                domain_id: verdict.domain_id.clone(),
            })?;
        slot.total += 1;
        match verdict.status {
            ComplianceStatus::Met => slot.met += 1,
            ComplianceStatus::Partial => slot.partial += 1,
            ComplianceStatus::NotMet => slot.not_met += 1,
        }
        points += verdict.status.points();
    }

    by_domain.retain(|d| d.total > 0);
    for d in &mut by_domain {
        let domain_points = d.met as u64 * ComplianceStatus::Met.points()
            + d.partial as u64 * ComplianceStatus::Partial.points();
        d.score = percentage(domain_points, d.total as u64);
    }

    Ok(ScoreCard {
        overall: percentage(points, verdicts.len() as u64),
        by_domain,
    })
}
