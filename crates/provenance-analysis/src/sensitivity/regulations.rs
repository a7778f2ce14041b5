//! Regulation mapping for sensitive data classes.

use provenance_core::config::ScoringConfig;
use provenance_core::types::collections::FxHashMap;
use provenance_core::SensitivityType;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Regulation {
    #[serde(rename = "gdpr")]
    Gdpr,
    #[serde(rename = "ccpa")]
    Ccpa,
    #[serde(rename = "hipaa")]
    Hipaa,
    #[serde(rename = "pci-dss")]
    PciDss,
    #[serde(rename = "sox")]
    Sox,
}

impl Regulation {
    pub const ALL: [Regulation; 5] = [Self::Gdpr, Self::Ccpa, Self::Hipaa, Self::PciDss, Self::Sox];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Gdpr => "gdpr",
            Self::Ccpa => "ccpa",
            Self::Hipaa => "hipaa",
            Self::PciDss => "pci-dss",
            Self::Sox => "sox",
        }
    }

    /// Accepts `pci-dss`, `pci_dss` and `pcidss` spellings, case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted: String = name
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Self::ALL
            .into_iter()
            .find(|r| r.name().replace('-', "") == wanted)
    }
}

impl std::fmt::Display for Regulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Which regulations a sensitivity class implicates.
#[derive(Debug, Clone)]
pub struct RegulationMapper {
    table: FxHashMap<SensitivityType, Vec<Regulation>>,
}

impl Default for RegulationMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl RegulationMapper {
    pub fn new() -> Self {
        let mut table = FxHashMap::default();
        table.insert(SensitivityType::Pii, vec![Regulation::Gdpr, Regulation::Ccpa]);
        table.insert(SensitivityType::Health, vec![Regulation::Hipaa, Regulation::Gdpr]);
        table.insert(SensitivityType::Financial, vec![Regulation::PciDss, Regulation::Sox]);
        table.insert(SensitivityType::Credentials, vec![Regulation::PciDss]);
        Self { table }
    }

    /// Defaults with `scoring.regulation_overrides` replacing whole entries.
    pub fn from_config(config: &ScoringConfig) -> Self {
        let mut mapper = Self::new();
        for (class, names) in &config.regulation_overrides {
            let Some(sensitivity) = SensitivityType::from_name(class) else {
                warn!(class = %class, "ignoring regulation override for unknown sensitivity");
                continue;
            };
            let mut regulations = Vec::with_capacity(names.len());
            for name in names {
                match Regulation::from_name(name) {
                    Some(r) if !regulations.contains(&r) => regulations.push(r),
                    Some(_) => {}
                    None => warn!(regulation = %name, "ignoring unknown regulation"),
                }
            }
            mapper.table.insert(sensitivity, regulations);
        }
        mapper
    }

    pub fn regulations_for(&self, sensitivity: SensitivityType) -> &[Regulation] {
        self.table
            .get(&sensitivity)
            .map(|r| r.as_slice())
            .unwrap_or(&[])
    }

    /// Distinct regulations implicated by any of `classes`, sorted.
    pub fn regulations_for_all<I>(&self, classes: I) -> Vec<Regulation>
    where
        I: IntoIterator<Item = SensitivityType>,
    {
        let mut out: Vec<Regulation> = classes
            .into_iter()
            .flat_map(|s| self.regulations_for(s).iter().copied())
            .collect();
        out.sort();
        out.dedup();
        out
    }
}
