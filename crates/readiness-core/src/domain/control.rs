//! Frameworks, domains and controls.
//!
//! A framework is a fixed tree of domains and controls. Controls are
//! immutable catalog data; the engine never creates or mutates them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed set of built-in compliance frameworks.
///
/// Declaration order is registry order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FrameworkId {
    #[serde(rename = "iso27001")]
    Iso27001,
    #[serde(rename = "nist-csf")]
    NistCsf,
    #[serde(rename = "soc2")]
    Soc2,
    #[serde(rename = "gdpr")]
    Gdpr,
    #[serde(rename = "hipaa")]
    Hipaa,
    #[serde(rename = "pci-dss")]
    PciDss,
    #[serde(rename = "nis")]
    Nis,
    #[serde(rename = "nist-ai")]
    NistAi,
    #[serde(rename = "hitrust")]
    Hitrust,
    #[serde(rename = "fedramp")]
    Fedramp,
    #[serde(rename = "iso42001")]
    Iso42001,
    #[serde(rename = "cmmc")]
    Cmmc,
    #[serde(rename = "tisax")]
    Tisax,
    #[serde(rename = "gli-19")]
    Gli19,
}

impl FrameworkId {
    pub const ALL: [FrameworkId; 14] = [
        FrameworkId::Iso27001,
        FrameworkId::NistCsf,
        FrameworkId::Soc2,
        FrameworkId::Gdpr,
        FrameworkId::Hipaa,
        FrameworkId::PciDss,
        FrameworkId::Nis,
        FrameworkId::NistAi,
        FrameworkId::Hitrust,
        FrameworkId::Fedramp,
        FrameworkId::Iso42001,
        FrameworkId::Cmmc,
        FrameworkId::Tisax,
        FrameworkId::Gli19,
    ];

    /// Registry key, e.g. `"pci-dss"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameworkId::Iso27001 => "iso27001",
            FrameworkId::NistCsf => "nist-csf",
            FrameworkId::Soc2 => "soc2",
            FrameworkId::Gdpr => "gdpr",
            FrameworkId::Hipaa => "hipaa",
            FrameworkId::PciDss => "pci-dss",
            FrameworkId::Nis => "nis",
            FrameworkId::NistAi => "nist-ai",
            FrameworkId::Hitrust => "hitrust",
            FrameworkId::Fedramp => "fedramp",
            FrameworkId::Iso42001 => "iso42001",
            FrameworkId::Cmmc => "cmmc",
            FrameworkId::Tisax => "tisax",
            FrameworkId::Gli19 => "gli-19",
        }
    }
}

impl fmt::Display for FrameworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an id outside the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown framework: {0}")]
pub struct UnknownFrameworkId(pub String);

impl FromStr for FrameworkId {
    type Err = UnknownFrameworkId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        FrameworkId::ALL
            .into_iter()
            .find(|id| id.as_str() == needle)
            .ok_or_else(|| UnknownFrameworkId(s.to_string()))
    }
}

/// Broad grouping used for listing frameworks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameworkCategory {
    Security,
    Privacy,
    Industry,
    Government,
    Ai,
}

impl FromStr for FrameworkCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "security" => Ok(FrameworkCategory::Security),
            "privacy" => Ok(FrameworkCategory::Privacy),
            "industry" => Ok(FrameworkCategory::Industry),
            "government" => Ok(FrameworkCategory::Government),
            "ai" => Ok(FrameworkCategory::Ai),
            other => Err(format!("unknown framework category: {other}")),
        }
    }
}

impl fmt::Display for FrameworkCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FrameworkCategory::Security => "security",
            FrameworkCategory::Privacy => "privacy",
            FrameworkCategory::Industry => "industry",
            FrameworkCategory::Government => "government",
            FrameworkCategory::Ai => "ai",
        };
        f.write_str(s)
    }
}

/// A control as it appears inside a framework definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Evidence descriptors, in the order an auditor would ask for them.
    pub required_evidence: Vec<String>,
    /// Search hints. Never used for scoring.
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// A domain as it appears inside a framework definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrameworkDomain {
    pub id: String,
    pub name: String,
    pub controls: Vec<ControlDefinition>,
}

/// A complete framework definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Framework {
    pub id: FrameworkId,
    pub name: String,
    pub short_name: String,
    pub description: String,
    pub version: String,
    pub category: FrameworkCategory,
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub industries: Vec<String>,
    pub domains: Vec<FrameworkDomain>,
}

impl Framework {
    /// Total number of controls across all domains.
    pub fn control_count(&self) -> usize {
        self.domains.iter().map(|d| d.controls.len()).sum()
    }

    /// Controls flattened in catalog order (domain-grouped).
    pub fn controls(&self) -> Vec<Control> {
        self.domains
            .iter()
            .flat_map(|domain| {
                domain.controls.iter().map(move |c| Control {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    description: c.description.clone(),
                    required_evidence: c.required_evidence.clone(),
                    keywords: c.keywords.clone(),
                    domain_id: domain.id.clone(),
                    domain_name: domain.name.clone(),
                })
            })
            .collect()
    }

    /// Domains in catalog order.
    pub fn domain_list(&self) -> Vec<Domain> {
        self.domains
            .iter()
            .map(|d| Domain {
                id: d.id.clone(),
                name: d.name.clone(),
                control_count: d.controls.len(),
            })
            .collect()
    }
}

/// A single auditable requirement, carrying its domain membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    pub id: String,
    pub name: String,
    pub description: String,
    pub required_evidence: Vec<String>,
    pub keywords: Vec<String>,
    pub domain_id: String,
    pub domain_name: String,
}

/// A named grouping of controls. Derived from the framework, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub id: String,
    pub name: String,
    pub control_count: usize,
}
