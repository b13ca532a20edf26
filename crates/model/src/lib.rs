//! Core domain model for QuXAT accreditation scoring.
//!
//! This crate defines the fundamental types used throughout the system:
//! - `AccreditationType`: JCI, NABH, NABL, the ISO family, CAP, ...
//! - `RegistryRecord`: One entry of an accreditation registry
//! - `OrganizationQuery`: The organization being scored
//! - `MatchResult` / `ConfirmedAccreditation`: Name resolution and validation output
//! - `ScoreBreakdown`: The itemized, bounded composite score

use serde::{Deserialize, Serialize};
use std::fmt;

/// A certification scheme tracked as an independent registry.
///
/// Serialized as its label (`"JCI"`, `"ISO-9001"`, ...). Unknown labels are
/// kept in `Other`, uppercased with separators folded to single hyphens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AccreditationType {
    /// Joint Commission International
    Jci,
    /// National Accreditation Board for Hospitals & Healthcare Providers (India)
    Nabh,
    /// National Accreditation Board for Testing and Calibration Laboratories (India)
    Nabl,
    /// Quality management systems
    Iso9001,
    /// Medical devices quality management
    Iso13485,
    /// Environmental management
    Iso14001,
    /// Medical laboratories quality and competence
    Iso15189,
    /// Information security management
    Iso27001,
    /// Occupational health and safety
    Iso45001,
    /// College of American Pathologists
    Cap,
    /// Any other scheme, by label
    Other(String),
}

impl AccreditationType {
    /// Every scheme with a dedicated variant, in canonical order.
    pub const KNOWN: [AccreditationType; 10] = [
        Self::Jci,
        Self::Nabh,
        Self::Nabl,
        Self::Iso9001,
        Self::Iso13485,
        Self::Iso14001,
        Self::Iso15189,
        Self::Iso27001,
        Self::Iso45001,
        Self::Cap,
    ];

    /// Display label, e.g. `ISO-9001`.
    pub fn label(&self) -> &str {
        match self {
            Self::Jci => "JCI",
            Self::Nabh => "NABH",
            Self::Nabl => "NABL",
            Self::Iso9001 => "ISO-9001",
            Self::Iso13485 => "ISO-13485",
            Self::Iso14001 => "ISO-14001",
            Self::Iso15189 => "ISO-15189",
            Self::Iso27001 => "ISO-27001",
            Self::Iso45001 => "ISO-45001",
            Self::Cap => "CAP",
            Self::Other(label) => label,
        }
    }

    /// File-name friendly form of the label, e.g. `iso-9001`.
    pub fn slug(&self) -> String {
        self.label()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Long-form name of the scheme.
    pub fn description(&self) -> &str {
        match self {
            Self::Jci => "Joint Commission International",
            Self::Nabh => "National Accreditation Board for Hospitals & Healthcare Providers",
            Self::Nabl => "National Accreditation Board for Testing and Calibration Laboratories",
            Self::Iso9001 => "ISO 9001 Quality Management Systems",
            Self::Iso13485 => "ISO 13485 Medical Devices Quality Management",
            Self::Iso14001 => "ISO 14001 Environmental Management Systems",
            Self::Iso15189 => "ISO 15189 Medical Laboratories Quality and Competence",
            Self::Iso27001 => "ISO 27001 Information Security Management",
            Self::Iso45001 => "ISO 45001 Occupational Health and Safety Management",
            Self::Cap => "College of American Pathologists",
            Self::Other(label) => label,
        }
    }
}

impl From<&str> for AccreditationType {
    fn from(s: &str) -> Self {
        let compact: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_' && *c != ':')
            .collect::<String>()
            .to_uppercase();

        match compact.as_str() {
            "JCI" => Self::Jci,
            "NABH" => Self::Nabh,
            "NABL" => Self::Nabl,
            "ISO9001" => Self::Iso9001,
            "ISO13485" => Self::Iso13485,
            "ISO14001" => Self::Iso14001,
            "ISO15189" => Self::Iso15189,
            "ISO27001" => Self::Iso27001,
            "ISO45001" => Self::Iso45001,
            "CAP" => Self::Cap,
            _ => Self::Other(other_label(s)),
        }
    }
}

/// `"iso 50001"`, `"ISO_50001"` and `"ISO50001"` all become `"ISO-50001"`.
fn other_label(s: &str) -> String {
    let label = s
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_' || c == ':')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
        .to_uppercase();

    if let Some(rest) = label.strip_prefix("ISO") {
        if rest.starts_with(|c: char| c.is_ascii_digit()) {
            return format!("ISO-{}", rest);
        }
    }
    label
}

impl From<String> for AccreditationType {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<AccreditationType> for String {
    fn from(value: AccreditationType) -> Self {
        match value {
            AccreditationType::Other(label) => label,
            known => known.label().to_string(),
        }
    }
}

impl fmt::Display for AccreditationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Physical location of a facility. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    /// State, province or region
    #[serde(default, alias = "region", skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Location {
    pub fn city(city: impl Into<String>) -> Self {
        Self {
            city: Some(city.into()),
            ..Default::default()
        }
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// True when no field carries any non-blank text.
    pub fn is_empty(&self) -> bool {
        [&self.city, &self.state, &self.country]
            .iter()
            .all(|field| field.as_deref().map_or(true, |v| v.trim().is_empty()))
    }
}

/// A certification already attached to an organization, e.g. from scraping.
///
/// Claims never confirm an accreditation by themselves; the registry does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificationClaim {
    /// Free text such as "ISO 9001:2015 Quality Management"
    pub name: String,

    /// Active, Valid, Current, In Progress, Expired, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
}

impl CertificationClaim {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: None,
            issuer: None,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Whether the claim is in force. A claim without status counts as active.
    pub fn is_active(&self) -> bool {
        match self.status.as_deref() {
            None => true,
            Some(status) => matches!(
                status.trim().to_lowercase().as_str(),
                "active" | "valid" | "current"
            ),
        }
    }
}

/// A numeric quality-initiative contribution (patient feedback, reported programs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitySignal {
    pub name: String,
    pub points: f64,
}

impl QualitySignal {
    pub fn new(name: impl Into<String>, points: f64) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }
}

/// The organization being scored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganizationQuery {
    /// Organization name as supplied by the caller
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,

    /// Certifications already attached to the organization
    #[serde(default)]
    pub known_certifications: Vec<CertificationClaim>,

    /// Inputs for the quality-initiative sub-score
    #[serde(default)]
    pub quality_signals: Vec<QualitySignal>,
}

impl OrganizationQuery {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_claim(mut self, claim: CertificationClaim) -> Self {
        self.known_certifications.push(claim);
        self
    }

    pub fn with_signal(mut self, signal: QualitySignal) -> Self {
        self.quality_signals.push(signal);
        self
    }
}

fn default_true() -> bool {
    true
}

/// One accreditation-granting entry of a registry.
///
/// Produced by offline ingestion, read-only during scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRecord {
    /// Organization name as published by the registry
    pub organization_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,

    /// Not yet confirmed against an authoritative source. Such records never
    /// back a positive decision.
    #[serde(default = "default_true")]
    pub verification_required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_note: Option<String>,

    pub accreditation_type: AccreditationType,
}

impl RegistryRecord {
    /// Create an unverified record.
    pub fn new(accreditation_type: AccreditationType, organization_name: impl Into<String>) -> Self {
        Self {
            organization_name: organization_name.into(),
            location: None,
            verification_required: true,
            source_url: None,
            source_note: None,
            accreditation_type,
        }
    }

    pub fn verified(mut self) -> Self {
        self.verification_required = false;
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_source_note(mut self, note: impl Into<String>) -> Self {
        self.source_note = Some(note.into());
        self
    }

    pub fn city(&self) -> Option<&str> {
        self.location.as_ref().and_then(|l| l.city.as_deref())
    }
}

/// How a registry candidate relates to the queried name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchType {
    /// Normalized full-string equality
    Exact,
    /// Similar above a configured threshold; never auto-confirmed
    Fuzzy,
    /// Related only by containment; surfaced for audit
    Rejected,
}

/// Trust tier of a match. Ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Outcome of comparing two locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LocationConsistency {
    Consistent,
    Inconsistent,
    /// Location data missing on either side
    #[default]
    Unknown,
}

/// A registry candidate produced by name resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub candidate: RegistryRecord,

    pub match_type: MatchType,

    pub confidence: Confidence,

    /// Normalized edit similarity (1.0 for exact)
    pub similarity: f64,

    /// Filled in by the validator; `Unknown` until then
    #[serde(default)]
    pub location: LocationConsistency,

    /// Position of the candidate in the registry slice
    pub position: usize,
}

/// A signal that corroborated a confirmed accreditation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchBasis {
    NameExact,
    CityAgreement,
    StateAgreement,
    CountryAgreement,
    LocationUnknown,
    ClaimCorroborated,
    AmbiguousTieBreak,
}

impl MatchBasis {
    pub fn label(&self) -> &'static str {
        match self {
            Self::NameExact => "name-exact",
            Self::CityAgreement => "city-agreement",
            Self::StateAgreement => "state-agreement",
            Self::CountryAgreement => "country-agreement",
            Self::LocationUnknown => "location-unknown",
            Self::ClaimCorroborated => "claim-corroborated",
            Self::AmbiguousTieBreak => "ambiguous-tie-break",
        }
    }
}

/// A registry record that passed validation for one query.
///
/// Transient; recomputed per query and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmedAccreditation {
    pub accreditation_type: AccreditationType,
    pub confidence: Confidence,
    pub match_basis: Vec<MatchBasis>,
    pub record: RegistryRecord,
}

impl ConfirmedAccreditation {
    pub fn is_tie_break(&self) -> bool {
        self.match_basis.contains(&MatchBasis::AmbiguousTieBreak)
    }
}

/// How strongly a missing mandatory standard weighs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactTier {
    Low,
    Medium,
    High,
    Critical,
}

impl ImpactTier {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

/// A mandatory standard the organization lacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingStandard {
    pub standard: AccreditationType,
    pub penalty_points: f64,
    pub impact_tier: ImpactTier,
}

/// Points contributed by one confirmed accreditation type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificationItem {
    pub accreditation_type: AccreditationType,
    pub points: f64,
}

/// Letter grade of a final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "B+")]
    BPlus,
    B,
    C,
    F,
}

impl Grade {
    /// Grade for a score expressed as a percentage of the maximum.
    pub fn from_percentage(percent: f64) -> Self {
        if percent >= 90.0 {
            Self::APlus
        } else if percent >= 80.0 {
            Self::A
        } else if percent >= 70.0 {
            Self::BPlus
        } else if percent >= 60.0 {
            Self::B
        } else if percent >= 50.0 {
            Self::C
        } else {
            Self::F
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::BPlus => "B+",
            Self::B => "B",
            Self::C => "C",
            Self::F => "F",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::APlus => "Exceptional Quality Recognition",
            Self::A => "Excellent - Quality Recognition",
            Self::BPlus => "Good - Quality Recognition",
            Self::B => "Adequate - Quality Recognition",
            Self::C => "Average - Quality Recognition",
            Self::F => "Below Average - Needs Improvement",
        }
    }
}

/// Audit notes attached to a score breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail", rename_all = "kebab-case")]
pub enum AuditFlag {
    /// Several equally valid exact candidates; one chosen by tie-break
    AmbiguousTieBreak {
        accreditation_type: AccreditationType,
        candidates: usize,
        chosen: String,
    },

    /// Exact candidates at conflicting locations; nothing confirmed
    AmbiguousConflict {
        accreditation_type: AccreditationType,
        candidates: Vec<String>,
    },

    /// Exact name match rejected because the locations disagree
    LocationCollision {
        accreditation_type: AccreditationType,
        record_name: String,
        record_city: Option<String>,
    },

    /// Fuzzy candidate left for manual curation
    CurationCandidate {
        accreditation_type: AccreditationType,
        record_name: String,
        confidence: Confidence,
        similarity: f64,
    },

    /// Name related only by containment
    ContainmentRejected {
        accreditation_type: AccreditationType,
        record_name: String,
    },
}

impl AuditFlag {
    pub fn label(&self) -> &'static str {
        match self {
            Self::AmbiguousTieBreak { .. } => "Ambiguous Tie-Break",
            Self::AmbiguousConflict { .. } => "Ambiguous Conflict",
            Self::LocationCollision { .. } => "Location Collision",
            Self::CurationCandidate { .. } => "Needs Curation",
            Self::ContainmentRejected { .. } => "Containment Rejected",
        }
    }

    pub fn accreditation_type(&self) -> &AccreditationType {
        match self {
            Self::AmbiguousTieBreak { accreditation_type, .. }
            | Self::AmbiguousConflict { accreditation_type, .. }
            | Self::LocationCollision { accreditation_type, .. }
            | Self::CurationCandidate { accreditation_type, .. }
            | Self::ContainmentRejected { accreditation_type, .. } => accreditation_type,
        }
    }
}

/// A registry that could not be consulted while scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryWarning {
    pub accreditation_type: AccreditationType,
    pub reason: String,
}

/// Itemized result of scoring one organization.
///
/// `final_score = clamp(certification_score + quality_initiative_score - mandatory_penalty, 0, max_score)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub organization: String,

    /// 0..certification cap, diversity bonus included
    pub certification_score: f64,

    /// 0..initiative cap
    pub quality_initiative_score: f64,

    /// Sum of penalties for missing mandatory standards; not capped
    pub mandatory_penalty: f64,

    pub final_score: f64,

    pub max_score: f64,

    /// In mandatory table order
    pub missing_mandatory_standards: Vec<MissingStandard>,

    /// True iff no mandatory standard is missing
    pub compliant: bool,

    pub grade: Grade,

    /// In accreditation type order
    #[serde(default)]
    pub confirmed: Vec<ConfirmedAccreditation>,

    #[serde(default)]
    pub certification_items: Vec<CertificationItem>,

    #[serde(default)]
    pub diversity_bonus: f64,

    /// Active claims the registries did not back
    #[serde(default)]
    pub unconfirmed_claims: Vec<CertificationClaim>,

    #[serde(default)]
    pub audit_flags: Vec<AuditFlag>,

    /// Degraded registries
    #[serde(default)]
    pub warnings: Vec<RegistryWarning>,
}

impl ScoreBreakdown {
    pub fn is_confirmed(&self, accreditation_type: &AccreditationType) -> bool {
        self.confirmed
            .iter()
            .any(|c| &c.accreditation_type == accreditation_type)
    }

    pub fn is_missing(&self, standard: &AccreditationType) -> bool {
        self.missing_mandatory_standards
            .iter()
            .any(|m| &m.standard == standard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_accreditation_type_from_str() {
        assert_eq!(AccreditationType::from("JCI"), AccreditationType::Jci);
        assert_eq!(AccreditationType::from("iso 9001"), AccreditationType::Iso9001);
        assert_eq!(AccreditationType::from("ISO_15189"), AccreditationType::Iso15189);
        assert_eq!(AccreditationType::from("iso-27001"), AccreditationType::Iso27001);
        assert_eq!(
            AccreditationType::from("Magnet Recognition"),
            AccreditationType::Other("MAGNET-RECOGNITION".to_string())
        );
    }

    #[test]
    fn test_other_labels_fold_separators() {
        let expected = AccreditationType::Other("ISO-50001".to_string());
        assert_eq!(AccreditationType::from("ISO 50001"), expected);
        assert_eq!(AccreditationType::from("ISO-50001"), expected);
        assert_eq!(AccreditationType::from("iso_50001"), expected);
        assert_eq!(AccreditationType::from("ISO50001"), expected);

        assert_eq!(
            AccreditationType::from("Joint Commission US"),
            AccreditationType::from("JOINT_COMMISSION_US")
        );
        assert_eq!(AccreditationType::from(" dnv  healthcare ").label(), "DNV-HEALTHCARE");
        assert_eq!(AccreditationType::from("ISOTOPE").label(), "ISOTOPE");
    }

    #[test]
    fn test_accreditation_type_serializes_as_label() {
        let json = serde_json::to_string(&AccreditationType::Iso9001).unwrap();
        assert_eq!(json, "\"ISO-9001\"");
        let parsed: AccreditationType = serde_json::from_str("\"cap\"").unwrap();
        assert_eq!(parsed, AccreditationType::Cap);
    }

    #[test]
    fn test_slug() {
        assert_eq!(AccreditationType::Iso45001.slug(), "iso-45001");
        assert_eq!(AccreditationType::Jci.slug(), "jci");
        assert_eq!(
            AccreditationType::Other("MAGNET-RECOGNITION".into()).slug(),
            "magnet-recognition"
        );
    }

    #[test]
    fn test_registry_record_defaults_to_verification_required() {
        let record: RegistryRecord = serde_json::from_str(
            r#"{"organization_name": "Apollo Hospitals Chennai", "accreditation_type": "JCI"}"#,
        )
        .unwrap();
        assert!(record.verification_required);
        assert_eq!(record.location, None);
    }

    #[test]
    fn test_location_is_empty() {
        assert!(Location::default().is_empty());
        assert!(Location::city("  ").is_empty());
        assert!(!Location::default().with_country("India").is_empty());
    }

    #[test]
    fn test_claim_activity() {
        assert!(CertificationClaim::new("JCI").is_active());
        assert!(CertificationClaim::new("JCI").with_status("Valid").is_active());
        assert!(!CertificationClaim::new("JCI").with_status("In Progress").is_active());
        assert!(!CertificationClaim::new("JCI").with_status("Expired").is_active());
    }

    #[test]
    fn test_grade_boundaries() {
        assert_eq!(Grade::from_percentage(90.0), Grade::APlus);
        assert_eq!(Grade::from_percentage(89.9), Grade::A);
        assert_eq!(Grade::from_percentage(70.0), Grade::BPlus);
        assert_eq!(Grade::from_percentage(60.0), Grade::B);
        assert_eq!(Grade::from_percentage(50.0), Grade::C);
        assert_eq!(Grade::from_percentage(49.9), Grade::F);
        assert_eq!(Grade::APlus.label(), "A+");
    }

    #[test]
    fn test_confidence_ordering() {
        assert!(Confidence::High > Confidence::Medium);
        assert!(Confidence::Medium > Confidence::Low);
    }

    #[test]
    fn test_audit_flag_serialization() {
        let flag = AuditFlag::ContainmentRejected {
            accreditation_type: AccreditationType::Jci,
            record_name: "Apollo Hospitals".into(),
        };
        let json = serde_json::to_value(&flag).unwrap();
        assert_eq!(json["type"], "containment-rejected");
        assert_eq!(json["detail"]["accreditation_type"], "JCI");
    }
}
