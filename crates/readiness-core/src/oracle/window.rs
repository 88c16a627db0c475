//! Bounded corpus windows.
//!
//! The oracle only ever sees `max_chars` characters of evidence. `Prefix`
//! takes the start of the concatenated corpus. `KeywordFocused` ranks
//! paragraph chunks by how many of the control's terms they mention and
//! packs the best ones first, so evidence late in a large corpus is not
//! lost. Keywords only steer selection; they never affect scoring.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::corpus::{chunk_text, section_header, EvidenceCorpus};
use crate::domain::control::Control;

pub const DEFAULT_WINDOW_CHARS: usize = 3000;

/// Words of required evidence shorter than this are ignored when ranking
/// chunks. Catalog keywords are always kept.
const MIN_TERM_CHARS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowStrategy {
    #[default]
    Prefix,
    KeywordFocused,
}

impl FromStr for WindowStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prefix" => Ok(WindowStrategy::Prefix),
            "keyword" | "keyword_focused" | "keyword-focused" => Ok(WindowStrategy::KeywordFocused),
            other => Err(format!("unknown window strategy: {other}")),
        }
    }
}

impl fmt::Display for WindowStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowStrategy::Prefix => f.write_str("prefix"),
            WindowStrategy::KeywordFocused => f.write_str("keyword"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub max_chars: usize,
    pub strategy: WindowStrategy,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_WINDOW_CHARS,
            strategy: WindowStrategy::Prefix,
        }
    }
}

/// The slice of `corpus` sent to the oracle for `control`.
pub fn select_window(corpus: &EvidenceCorpus, control: &Control, config: &WindowConfig) -> String {
    match config.strategy {
        WindowStrategy::Prefix => prefix(corpus.text(), config.max_chars),
        WindowStrategy::KeywordFocused => keyword_focused(corpus, control, config.max_chars)
            .unwrap_or_else(|| prefix(corpus.text(), config.max_chars)),
    }
}

fn prefix(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

struct Candidate {
    order: usize,
    hits: usize,
    header_chars: usize,
    rendered: String,
}

/// `None` when no chunk mentions any term.
fn keyword_focused(corpus: &EvidenceCorpus, control: &Control, max_chars: usize) -> Option<String> {
    let terms = control_terms(control);
    if terms.is_empty() {
        return None;
    }

    let mut candidates = Vec::new();
    for section in corpus.sections() {
        let header = section_header(&section.label);
        let header_chars = header.chars().count();
        let budget = max_chars.saturating_sub(header_chars + 1).max(1);
        for chunk in chunk_text(&section.text, budget) {
            let lower = chunk.to_lowercase();
            let hits = terms.iter().filter(|t| lower.contains(t.as_str())).count();
            candidates.push(Candidate {
                order: candidates.len(),
                hits,
                header_chars,
                rendered: format!("{header}\n{chunk}"),
            });
        }
    }

    if candidates.iter().all(|c| c.hits == 0) {
        return None;
    }

    // Stable: equal hit counts keep corpus order.
    candidates.sort_by(|a, b| b.hits.cmp(&a.hits));

    let mut chosen: Vec<(usize, String)> = Vec::new();
    let mut used = 0;
    for candidate in candidates.iter().filter(|c| c.hits > 0) {
        let len = candidate.rendered.chars().count();
        let sep = if chosen.is_empty() { 0 } else { 2 };
        let room = max_chars.saturating_sub(used + sep);
        if len <= room {
            used += sep + len;
            chosen.push((candidate.order, candidate.rendered.clone()));
        } else if room > candidate.header_chars + 1 {
            // Over budget: keep the head of the chunk and stop, the window is full.
            chosen.push((candidate.order, prefix(&candidate.rendered, room)));
            break;
        }
    }

    if chosen.is_empty() {
        // Not even a header fits next to the best chunk: cut it down.
        return candidates.first().map(|c| prefix(&c.rendered, max_chars));
    }

    chosen.sort_by_key(|(order, _)| *order);
    Some(
        chosen
            .iter()
            .map(|(_, rendered)| rendered.as_str())
            .collect::<Vec<_>>()
            .join("\n\n"),
    )
}

/// Lowercased keywords and required-evidence words, deduplicated.
fn control_terms(control: &Control) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    let keywords = control
        .keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty());
    let evidence_words = control
        .required_evidence
        .iter()
        .flat_map(|e| e.split(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.chars().count() >= MIN_TERM_CHARS)
        .map(str::to_lowercase);

    for term in keywords.chain(evidence_words) {
        if !terms.contains(&term) {
            terms.push(term);
        }
    }
    terms
}
