//! Mandatory-standard rule tables.

use crate::config::{read_json, ConfigError};
use quxat_model::{AccreditationType, ImpactTier};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Hospital accreditations recognized worldwide as equivalent to JCI.
pub const GLOBAL_HOSPITAL_ACCREDITATIONS: [&str; 9] = [
    "JOINT-COMMISSION-US",
    "DNV-HEALTHCARE",
    "ACCREDITATION-CANADA",
    "CQC-UK",
    "HAS-FRANCE",
    "G-BA-GERMANY",
    "ACHS-AUSTRALIA",
    "JCQHC-JAPAN",
    "TJCHA-TAIWAN",
];

/// Scales a standard's penalty down when another type is confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyReduction {
    pub when_confirmed: AccreditationType,
    /// Multiplier in `0.0..=1.0`
    pub factor: f64,
}

/// A standard an organization is expected to hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MandatoryStandard {
    pub standard: AccreditationType,
    pub penalty_points: f64,
    pub impact_tier: ImpactTier,

    /// Types accepted in place of `standard`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub satisfied_by: Vec<AccreditationType>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reductions: Vec<PenaltyReduction>,
}

impl MandatoryStandard {
    pub fn new(standard: AccreditationType, penalty_points: f64, impact_tier: ImpactTier) -> Self {
        Self {
            standard,
            penalty_points,
            impact_tier,
            satisfied_by: Vec::new(),
            reductions: Vec::new(),
        }
    }

    pub fn satisfied_by(mut self, equivalents: impl IntoIterator<Item = AccreditationType>) -> Self {
        self.satisfied_by.extend(equivalents);
        self
    }

    pub fn reduced_when(mut self, when_confirmed: AccreditationType, factor: f64) -> Self {
        self.reductions.push(PenaltyReduction {
            when_confirmed,
            factor,
        });
        self
    }

    /// The standard itself followed by its equivalents.
    pub fn accepted_types(&self) -> impl Iterator<Item = &AccreditationType> {
        std::iter::once(&self.standard).chain(&self.satisfied_by)
    }

    pub fn is_satisfied(&self, confirmed: &BTreeSet<AccreditationType>) -> bool {
        self.accepted_types().any(|t| confirmed.contains(t))
    }

    /// Penalty after the strongest applicable reduction. Reductions do not stack.
    pub fn effective_penalty(&self, confirmed: &BTreeSet<AccreditationType>) -> f64 {
        let factor = self
            .reductions
            .iter()
            .filter(|r| confirmed.contains(&r.when_confirmed))
            .map(|r| r.factor)
            .fold(1.0, f64::min);
        self.penalty_points * factor
    }

    fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check(format!("penalty_points.{}", self.standard), self.penalty_points)?;
        for reduction in &self.reductions {
            ConfigError::check_fraction(
                format!("reductions.{}.{}", self.standard, reduction.when_confirmed),
                reduction.factor,
            )?;
        }
        Ok(())
    }
}

/// Ordered mandatory-standard table.
///
/// Serialized as a JSON array of standards. Every construction path
/// validates penalties and reduction factors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<MandatoryStandard>", into = "Vec<MandatoryStandard>")]
pub struct MandatoryRules {
    standards: Vec<MandatoryStandard>,
}

impl Default for MandatoryRules {
    fn default() -> Self {
        let global = GLOBAL_HOSPITAL_ACCREDITATIONS.map(AccreditationType::from);
        Self {
            standards: vec![
                MandatoryStandard::new(AccreditationType::Jci, 20.0, ImpactTier::Critical)
                    .satisfied_by(global),
                MandatoryStandard::new(AccreditationType::Iso9001, 12.0, ImpactTier::High)
                    .reduced_when(AccreditationType::from("JOINT-COMMISSION-US"), 0.5),
                MandatoryStandard::new(AccreditationType::Iso15189, 8.0, ImpactTier::Medium)
                    .satisfied_by([AccreditationType::Cap, AccreditationType::Nabl]),
            ],
        }
    }
}

impl TryFrom<Vec<MandatoryStandard>> for MandatoryRules {
    type Error = ConfigError;

    fn try_from(standards: Vec<MandatoryStandard>) -> Result<Self, Self::Error> {
        Self::new(standards)
    }
}

impl From<MandatoryRules> for Vec<MandatoryStandard> {
    fn from(rules: MandatoryRules) -> Self {
        rules.standards
    }
}

impl MandatoryRules {
    pub fn new(standards: Vec<MandatoryStandard>) -> Result<Self, ConfigError> {
        for standard in &standards {
            standard.validate()?;
        }
        Ok(Self { standards })
    }

    pub fn empty() -> Self {
        Self {
            standards: Vec::new(),
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let standards: Vec<MandatoryStandard> =
            serde_json::from_str(text).map_err(|source| ConfigError::Json {
                path: PathBuf::from("<inline>"),
                source,
            })?;
        Self::new(standards)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::new(read_json(path)?)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MandatoryStandard> {
        self.standards.iter()
    }

    pub fn len(&self) -> usize {
        self.standards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.standards.is_empty()
    }

    /// True when `accreditation_type` is itself one of the standards.
    pub fn requires(&self, accreditation_type: &AccreditationType) -> bool {
        self.standards.iter().any(|s| &s.standard == accreditation_type)
    }

    /// Every type the table needs validated: standards, equivalents and
    /// reduction triggers.
    pub fn referenced_types(&self) -> BTreeSet<AccreditationType> {
        self.standards
            .iter()
            .flat_map(|standard| {
                standard
                    .accepted_types()
                    .chain(standard.reductions.iter().map(|r| &r.when_confirmed))
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_table() {
        let rules = MandatoryRules::default();
        assert_eq!(rules.len(), 3);

        let referenced = rules.referenced_types();
        for known in [
            AccreditationType::Jci,
            AccreditationType::Nabl,
            AccreditationType::Iso9001,
            AccreditationType::Iso15189,
            AccreditationType::Cap,
        ] {
            assert!(referenced.contains(&known), "{known}");
        }
        assert!(referenced.contains(&AccreditationType::from("DNV Healthcare")));
        assert_eq!(referenced.len(), 5 + GLOBAL_HOSPITAL_ACCREDITATIONS.len());
        assert!(rules.requires(&AccreditationType::Jci));
        assert!(!rules.requires(&AccreditationType::Cap));
    }

    #[test]
    fn test_global_group_satisfies_jci() {
        let rules = MandatoryRules::default();
        let jci = rules.iter().next().unwrap();
        let confirmed: BTreeSet<_> = [AccreditationType::from("Accreditation Canada")]
            .into_iter()
            .collect();
        assert!(jci.is_satisfied(&confirmed));
    }

    #[test]
    fn test_reduction_halves_iso_9001() {
        let rules = MandatoryRules::default();
        let iso = rules
            .iter()
            .find(|s| s.standard == AccreditationType::Iso9001)
            .unwrap();

        assert_eq!(iso.effective_penalty(&BTreeSet::new()), 12.0);
        let confirmed: BTreeSet<_> = [AccreditationType::from("JOINT_COMMISSION_US")]
            .into_iter()
            .collect();
        assert_eq!(iso.effective_penalty(&confirmed), 6.0);
    }

    #[test]
    fn test_strongest_reduction_applies_once() {
        let standard = MandatoryStandard::new(AccreditationType::Iso9001, 10.0, ImpactTier::High)
            .reduced_when(AccreditationType::Jci, 0.5)
            .reduced_when(AccreditationType::Nabh, 0.8);
        let confirmed: BTreeSet<_> = [AccreditationType::Jci, AccreditationType::Nabh]
            .into_iter()
            .collect();
        assert_eq!(standard.effective_penalty(&confirmed), 5.0);
    }

    #[test]
    fn test_equivalents_satisfy() {
        let standard = MandatoryStandard::new(AccreditationType::Iso15189, 8.0, ImpactTier::Medium)
            .satisfied_by([AccreditationType::Cap]);
        let confirmed: BTreeSet<_> = [AccreditationType::Cap].into_iter().collect();
        assert!(standard.is_satisfied(&confirmed));
        assert!(!standard.is_satisfied(&BTreeSet::new()));
    }

    #[test]
    fn test_rules_from_json() {
        let rules = MandatoryRules::from_json_str(
            r#"[
                {"standard": "NABH", "penalty_points": 15, "impact_tier": "critical"},
                {"standard": "ISO-15189", "penalty_points": 5, "impact_tier": "low", "satisfied_by": ["CAP"]}
            ]"#,
        )
        .unwrap();
        let standards: Vec<_> = rules.iter().collect();
        assert_eq!(standards[0].standard, AccreditationType::Nabh);
        assert_eq!(standards[0].impact_tier, ImpactTier::Critical);
        assert_eq!(standards[1].satisfied_by, vec![AccreditationType::Cap]);
    }

    #[test]
    fn test_negative_penalty_rejected() {
        let err = MandatoryRules::from_json_str(
            r#"[{"standard": "JCI", "penalty_points": -20, "impact_tier": "critical"}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Negative { .. }));

        let built = MandatoryRules::new(vec![MandatoryStandard::new(
            AccreditationType::Nabh,
            -40.0,
            ImpactTier::Critical,
        )]);
        assert!(matches!(built, Err(ConfigError::Negative { ref field, .. }) if field == "penalty_points.NABH"));

        let nan = MandatoryRules::new(vec![MandatoryStandard::new(
            AccreditationType::Nabh,
            f64::NAN,
            ImpactTier::Critical,
        )]);
        assert!(nan.is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let direct: Result<MandatoryRules, _> = serde_json::from_str(
            r#"[{"standard": "NABH", "penalty_points": -40, "impact_tier": "critical"}]"#,
        );
        assert!(direct.is_err());

        let factor = MandatoryRules::from_json_str(
            r#"[{"standard": "ISO-9001", "penalty_points": 12, "impact_tier": "high",
                 "reductions": [{"when_confirmed": "JCI", "factor": 1.5}]}]"#,
        )
        .unwrap_err();
        assert!(matches!(factor, ConfigError::OutOfRange { .. }));
    }
}
