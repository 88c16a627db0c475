//! Control catalog accessor.
//!
//! The built-in registry is embedded JSON, parsed and validated once on first
//! use and shared read-only by every run in the process. Callers that need a
//! different registry (tests, private frameworks) build a [`Catalog`] from
//! their own [`Framework`] values; the same validation applies.

use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::control::{Control, Domain, Framework, FrameworkCategory, FrameworkId};

/// Catalog failures: unknown ids at lookup, schema violations at load.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("unknown framework: {0}")]
    UnknownFramework(String),

    #[error("framework {framework} failed validation: {reason}")]
    Schema { framework: String, reason: String },

    #[error("framework {framework} could not be parsed: {reason}")]
    Parse { framework: String, reason: String },
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Read-only view over a framework registry.
///
/// The orchestrator depends on this trait rather than on [`Catalog`] so a
/// run can be pointed at any registry.
pub trait ControlCatalog: Send + Sync {
    /// Look up a framework definition.
    fn framework(&self, framework_id: &str) -> CatalogResult<&Framework>;

    /// Controls of a framework in catalog order (domain-grouped).
    fn list_controls(&self, framework_id: &str) -> CatalogResult<Vec<Control>> {
        Ok(self.framework(framework_id)?.controls())
    }

    /// Domains of a framework in catalog order.
    fn list_domains(&self, framework_id: &str) -> CatalogResult<Vec<Domain>> {
        Ok(self.framework(framework_id)?.domain_list())
    }
}

impl<C: ControlCatalog + ?Sized> ControlCatalog for &C {
    fn framework(&self, framework_id: &str) -> CatalogResult<&Framework> {
        (**self).framework(framework_id)
    }
}

/// Listing row for one framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkSummary {
    pub id: FrameworkId,
    pub name: String,
    pub short_name: String,
    pub version: String,
    pub category: FrameworkCategory,
    pub domain_count: usize,
    pub control_count: usize,
    pub regions: Vec<String>,
    pub industries: Vec<String>,
}

impl From<&Framework> for FrameworkSummary {
    fn from(fw: &Framework) -> Self {
        Self {
            id: fw.id,
            name: fw.name.clone(),
            short_name: fw.short_name.clone(),
            version: fw.version.clone(),
            category: fw.category,
            domain_count: fw.domains.len(),
            control_count: fw.control_count(),
            regions: fw.regions.clone(),
            industries: fw.industries.clone(),
        }
    }
}

/// An in-memory, validated framework registry.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    frameworks: BTreeMap<FrameworkId, Framework>,
}

const BUILTIN_SOURCES: [(FrameworkId, &str); 14] = [
    (FrameworkId::Iso27001, include_str!("../data/frameworks/iso27001.json")),
    (FrameworkId::NistCsf, include_str!("../data/frameworks/nist-csf.json")),
    (FrameworkId::Soc2, include_str!("../data/frameworks/soc2.json")),
    (FrameworkId::Gdpr, include_str!("../data/frameworks/gdpr.json")),
    (FrameworkId::Hipaa, include_str!("../data/frameworks/hipaa.json")),
    (FrameworkId::PciDss, include_str!("../data/frameworks/pci-dss.json")),
    (FrameworkId::Nis, include_str!("../data/frameworks/nis.json")),
    (FrameworkId::NistAi, include_str!("../data/frameworks/nist-ai.json")),
    (FrameworkId::Hitrust, include_str!("../data/frameworks/hitrust.json")),
    (FrameworkId::Fedramp, include_str!("../data/frameworks/fedramp.json")),
    (FrameworkId::Iso42001, include_str!("../data/frameworks/iso42001.json")),
    (FrameworkId::Cmmc, include_str!("../data/frameworks/cmmc.json")),
    (FrameworkId::Tisax, include_str!("../data/frameworks/tisax.json")),
    (FrameworkId::Gli19, include_str!("../data/frameworks/gli-19.json")),
];

static BUILTIN: OnceLock<CatalogResult<Catalog>> = OnceLock::new();

impl Catalog {
    /// The built-in registry of fourteen frameworks.
    ///
    /// Parsed and validated on first call; later calls return the same
    /// instance (or the same load error).
    pub fn builtin() -> CatalogResult<&'static Catalog> {
        BUILTIN
            .get_or_init(Self::load_builtin)
            .as_ref()
            .map_err(Clone::clone)
    }

    fn load_builtin() -> CatalogResult<Catalog> {
        let mut frameworks = Vec::with_capacity(BUILTIN_SOURCES.len());
        for (key, source) in BUILTIN_SOURCES {
            let fw: Framework =
                serde_json::from_str(source).map_err(|e| CatalogError::Parse {
                    framework: key.to_string(),
                    reason: e.to_string(),
                })?;
            if fw.id != key {
                return Err(CatalogError::Schema {
                    framework: key.to_string(),
                    reason: format!("embedded id {} does not match registry key", fw.id),
                });
            }
            frameworks.push(fw);
        }
        let catalog = Self::from_frameworks(frameworks)?;
        debug!(
            frameworks = catalog.frameworks.len(),
            "built-in framework catalog loaded"
        );
        Ok(catalog)
    }

    /// Build a registry from explicit definitions, validating each one.
    pub fn from_frameworks(
        frameworks: impl IntoIterator<Item = Framework>,
    ) -> CatalogResult<Self> {
        let mut map = BTreeMap::new();
        for fw in frameworks {
            validate(&fw)?;
            let id = fw.id;
            if map.insert(id, fw).is_some() {
                return Err(CatalogError::Schema {
                    framework: id.to_string(),
                    reason: "framework registered twice".to_string(),
                });
            }
        }
        Ok(Self { frameworks: map })
    }

    /// All frameworks in registry order.
    pub fn frameworks(&self) -> impl Iterator<Item = &Framework> {
        self.frameworks.values()
    }

    pub fn frameworks_by_category(
        &self,
        category: FrameworkCategory,
    ) -> impl Iterator<Item = &Framework> {
        self.frameworks
            .values()
            .filter(move |fw| fw.category == category)
    }

    /// Look up a single control of a framework by id.
    pub fn control(&self, framework_id: &str, control_id: &str) -> CatalogResult<Option<Control>> {
        let fw = self.framework(framework_id)?;
        Ok(fw.controls().into_iter().find(|c| c.id == control_id))
    }

    pub fn control_count(&self, framework_id: &str) -> CatalogResult<usize> {
        Ok(self.framework(framework_id)?.control_count())
    }

    pub fn summaries(&self) -> Vec<FrameworkSummary> {
        self.frameworks.values().map(FrameworkSummary::from).collect()
    }

    pub fn len(&self) -> usize {
        self.frameworks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frameworks.is_empty()
    }
}

impl ControlCatalog for Catalog {
    fn framework(&self, framework_id: &str) -> CatalogResult<&Framework> {
        let id: FrameworkId = framework_id
            .parse()
            .map_err(|_| CatalogError::UnknownFramework(framework_id.to_string()))?;
        self.frameworks
            .get(&id)
            .ok_or_else(|| CatalogError::UnknownFramework(framework_id.to_string()))
    }
}

fn validate(fw: &Framework) -> CatalogResult<()> {
    let fail = |reason: String| CatalogError::Schema {
        framework: fw.id.to_string(),
        reason,
    };

    if fw.name.trim().is_empty() {
        return Err(fail("framework name is empty".to_string()));
    }
    if fw.domains.is_empty() {
        return Err(fail("framework has no domains".to_string()));
    }

    let mut domain_ids = HashSet::new();
    let mut control_ids = HashSet::new();
    for domain in &fw.domains {
        if !domain_ids.insert(domain.id.as_str()) {
            return Err(fail(format!("duplicate domain id {}", domain.id)));
        }
        if domain.controls.is_empty() {
            return Err(fail(format!("domain {} has no controls", domain.id)));
        }
        for control in &domain.controls {
            if control.id.trim().is_empty() {
                return Err(fail(format!("control with empty id in domain {}", domain.id)));
            }
            if !control_ids.insert(control.id.as_str()) {
                return Err(fail(format!("duplicate control id {}", control.id)));
            }
            if control.name.trim().is_empty() || control.description.trim().is_empty() {
                return Err(fail(format!(
                    "control {} is missing a name or description",
                    control.id
                )));
            }
            if control.required_evidence.is_empty() {
                return Err(fail(format!(
                    "control {} lists no required evidence",
                    control.id
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::control::{ControlDefinition, FrameworkDomain};

    fn control_def(id: &str) -> ControlDefinition {
        ControlDefinition {
            id: id.to_string(),
            name: format!("Control {id}"),
            description: "Requirement text".to_string(),
            required_evidence: vec!["Policy document".to_string()],
            keywords: vec!["policy".to_string()],
        }
    }

    fn framework(id: FrameworkId, domains: Vec<(&str, Vec<&str>)>) -> Framework {
        Framework {
            id,
            name: format!("Framework {id}"),
            short_name: id.to_string(),
            description: "test framework".to_string(),
            version: "1".to_string(),
            category: FrameworkCategory::Security,
            regions: vec![],
            industries: vec![],
            domains: domains
                .into_iter()
                .map(|(d, controls)| FrameworkDomain {
                    id: d.to_string(),
                    name: format!("Domain {d}"),
                    controls: controls.into_iter().map(control_def).collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn list_controls_and_domains() {
        let catalog = Catalog::from_frameworks(vec![framework(
            FrameworkId::Soc2,
            vec![("d1", vec!["c1", "c2"]), ("d2", vec!["c3"])],
        )])
        .unwrap();

        let controls = catalog.list_controls("soc2").unwrap();
        assert_eq!(controls.len(), 3);
        assert_eq!(controls[2].domain_id, "d2");

        let domains = catalog.list_domains("soc2").unwrap();
        assert_eq!(domains.len(), 2);
        assert_eq!(domains[0].control_count, 2);
    }

    #[test]
    fn unknown_framework_rejected() {
        let catalog =
            Catalog::from_frameworks(vec![framework(FrameworkId::Soc2, vec![("d", vec!["c"])])])
                .unwrap();
        assert_eq!(
            catalog.list_controls("iso9001").unwrap_err(),
            CatalogError::UnknownFramework("iso9001".to_string())
        );
        // Known id but not registered in this catalog.
        assert!(matches!(
            catalog.list_controls("gdpr").unwrap_err(),
            CatalogError::UnknownFramework(_)
        ));
    }

    #[test]
    fn duplicate_control_ids_rejected() {
        let err = Catalog::from_frameworks(vec![framework(
            FrameworkId::Gdpr,
            vec![("d1", vec!["c1"]), ("d2", vec!["c1"])],
        )])
        .unwrap_err();
        assert!(err.to_string().contains("duplicate control id c1"));
    }

    #[test]
    fn empty_domain_rejected() {
        let err = Catalog::from_frameworks(vec![framework(
            FrameworkId::Gdpr,
            vec![("d1", vec!["c1"]), ("d2", vec![])],
        )])
        .unwrap_err();
        assert!(matches!(err, CatalogError::Schema { .. }));
    }

    #[test]
    fn missing_evidence_rejected() {
        let mut fw = framework(FrameworkId::Hipaa, vec![("d1", vec!["c1"])]);
        fw.domains[0].controls[0].required_evidence.clear();
        let err = Catalog::from_frameworks(vec![fw]).unwrap_err();
        assert!(err.to_string().contains("no required evidence"));
    }

    #[test]
    fn control_lookup() {
        let catalog = Catalog::from_frameworks(vec![framework(
            FrameworkId::Soc2,
            vec![("d1", vec!["c1", "c2"])],
        )])
        .unwrap();
        let c = catalog.control("soc2", "c2").unwrap().unwrap();
        assert_eq!(c.domain_id, "d1");
        assert!(catalog.control("soc2", "nope").unwrap().is_none());
        assert_eq!(catalog.control_count("soc2").unwrap(), 2);
    }

    #[test]
    fn builtin_catalog_loads() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.len(), FrameworkId::ALL.len());
        for id in FrameworkId::ALL {
            assert!(catalog.control_count(id.as_str()).unwrap() > 0, "{id}");
        }
    }
}
