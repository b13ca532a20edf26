//! Explanation generation for accreditation scores.
//!
//! Converts a `ScoreBreakdown` into human-readable explanations suitable
//! for reports and the command line.

use quxat_model::{
    AuditFlag, ConfirmedAccreditation, ImpactTier, MissingStandard, RegistryWarning,
    ScoreBreakdown,
};
use serde::{Deserialize, Serialize};

/// A structured explanation of one scoring decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    /// Short summary (1 line)
    pub summary: String,

    /// Detailed explanation (1-2 sentences)
    pub detail: String,

    /// How much attention this needs (0.0 - 1.0)
    pub severity: f32,

    /// Evidence items supporting this explanation
    pub evidence: Vec<EvidenceItem>,
}

/// A piece of evidence behind an explanation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub kind: String,

    pub value: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl EvidenceItem {
    fn new(kind: &str, value: impl Into<String>) -> Self {
        Self {
            kind: kind.to_string(),
            value: value.into(),
            context: None,
        }
    }

    fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Explanations for a breakdown: confirmations, missing standards,
/// degraded registries, then audit flags.
pub fn explain_breakdown(breakdown: &ScoreBreakdown) -> Vec<Explanation> {
    let confirmed = breakdown.confirmed.iter().map(|c| {
        let points = breakdown
            .certification_items
            .iter()
            .find(|item| item.accreditation_type == c.accreditation_type)
            .map_or(0.0, |item| item.points);
        explain_confirmed(c, points)
    });
    let missing = breakdown.missing_mandatory_standards.iter().map(explain_missing);
    let warnings = breakdown.warnings.iter().map(explain_warning);
    let flags = breakdown.audit_flags.iter().map(explain_flag);

    confirmed.chain(missing).chain(warnings).chain(flags).collect()
}

pub fn explain_confirmed(confirmed: &ConfirmedAccreditation, points: f64) -> Explanation {
    let record = &confirmed.record;
    let mut evidence: Vec<EvidenceItem> = confirmed
        .match_basis
        .iter()
        .map(|basis| EvidenceItem::new("match_basis", basis.label()))
        .collect();
    if let Some(url) = &record.source_url {
        evidence.push(EvidenceItem::new("source_url", url.as_str()));
    }
    if let Some(note) = &record.source_note {
        evidence.push(EvidenceItem::new("source_note", note.as_str()));
    }

    let place = record
        .city()
        .map(|city| format!(" ({})", city))
        .unwrap_or_default();

    Explanation {
        summary: format!("{} confirmed (+{} points)", confirmed.accreditation_type, points),
        detail: format!(
            "The {} registry lists '{}'{} as a verified entry matching this organization's name exactly.",
            confirmed.accreditation_type.description(),
            record.organization_name,
            place
        ),
        severity: if confirmed.is_tie_break() { 0.4 } else { 0.0 },
        evidence,
    }
}

pub fn explain_missing(missing: &MissingStandard) -> Explanation {
    let severity = match missing.impact_tier {
        ImpactTier::Critical => 1.0,
        ImpactTier::High => 0.8,
        ImpactTier::Medium => 0.5,
        ImpactTier::Low => 0.3,
    };

    Explanation {
        summary: format!(
            "Missing {} (-{} points)",
            missing.standard, missing.penalty_points
        ),
        detail: format!(
            "No registry confirms {}, a mandatory standard of {} impact. \
             A penalty of {} points was applied.",
            missing.standard.description(),
            missing.impact_tier.label().to_lowercase(),
            missing.penalty_points
        ),
        severity,
        evidence: vec![EvidenceItem::new("impact_tier", missing.impact_tier.label())],
    }
}

pub fn explain_warning(warning: &RegistryWarning) -> Explanation {
    Explanation {
        summary: format!("{} registry unavailable", warning.accreditation_type),
        detail: format!(
            "The {} registry could not be consulted, so {} was treated as unconfirmed.",
            warning.accreditation_type, warning.accreditation_type
        ),
        severity: 0.6,
        evidence: vec![EvidenceItem::new("registry_error", warning.reason.as_str())],
    }
}

pub fn explain_flag(flag: &AuditFlag) -> Explanation {
    match flag {
        AuditFlag::AmbiguousTieBreak {
            accreditation_type,
            candidates,
            chosen,
        } => Explanation {
            summary: format!("{}: {} equal registry entries", accreditation_type, candidates),
            detail: format!(
                "Several verified {} entries matched equally well. '{}' was chosen as the entry \
                 with the smallest source note, then source URL, then name.",
                accreditation_type, chosen
            ),
            severity: 0.4,
            evidence: vec![EvidenceItem::new("chosen", chosen.as_str())],
        },

        AuditFlag::AmbiguousConflict {
            accreditation_type,
            candidates,
        } => Explanation {
            summary: format!("{}: conflicting registry entries", accreditation_type),
            detail: format!(
                "{} verified {} entries share this name at different locations. \
                 Add a city to the query to disambiguate.",
                candidates.len(),
                accreditation_type
            ),
            severity: 0.7,
            evidence: candidates
                .iter()
                .map(|name| EvidenceItem::new("candidate", name.as_str()))
                .collect(),
        },

        AuditFlag::LocationCollision {
            accreditation_type,
            record_name,
            record_city,
        } => {
            let mut item = EvidenceItem::new("record", record_name.as_str());
            if let Some(city) = record_city {
                item = item.with_context(format!("Listed in {}", city));
            }
            Explanation {
                summary: format!("{}: same name, different location", accreditation_type),
                detail: format!(
                    "The {} entry '{}' matches the name but is located elsewhere. \
                     It belongs to a different facility and was not counted.",
                    accreditation_type, record_name
                ),
                severity: 0.5,
                evidence: vec![item],
            }
        }

        AuditFlag::CurationCandidate {
            accreditation_type,
            record_name,
            confidence,
            similarity,
        } => Explanation {
            summary: format!("{}: possible match '{}'", accreditation_type, record_name),
            detail: format!(
                "'{}' is spelled similarly ({:.0}% similar) but not identically. \
                 Similar names are left for manual review and never counted.",
                record_name,
                similarity * 100.0
            ),
            severity: 0.3,
            evidence: vec![EvidenceItem::new("similarity", format!("{:.2}", similarity))
                .with_context(format!("{:?} confidence", confidence))],
        },

        AuditFlag::ContainmentRejected {
            accreditation_type,
            record_name,
        } => Explanation {
            summary: format!("{}: related name '{}' ignored", accreditation_type, record_name),
            detail: format!(
                "'{}' only contains or is contained in the organization's name, \
                 which usually indicates another branch of the same chain.",
                record_name
            ),
            severity: 0.2,
            evidence: vec![EvidenceItem::new("record", record_name.as_str())],
        },
    }
}

/// A suggested next step for improving the score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: ImpactTier,
    pub action: String,
    pub impact: String,
}

/// Improvement steps, most urgent first: one per missing mandatory
/// standard, then one per claim the registries did not back.
pub fn recommendations(breakdown: &ScoreBreakdown) -> Vec<Recommendation> {
    let mut missing: Vec<&MissingStandard> = breakdown.missing_mandatory_standards.iter().collect();
    missing.sort_by(|a, b| {
        b.impact_tier
            .cmp(&a.impact_tier)
            .then(b.penalty_points.total_cmp(&a.penalty_points))
    });

    let standards = missing.into_iter().map(|m| Recommendation {
        priority: m.impact_tier,
        action: format!("Pursue {} ({})", m.standard.description(), m.standard),
        impact: format!("removes a {} point penalty", m.penalty_points),
    });

    let claims = breakdown.unconfirmed_claims.iter().map(|claim| Recommendation {
        priority: ImpactTier::Low,
        action: format!("Get '{}' listed in its accreditation registry", claim.name),
        impact: "claims are never scored until a registry confirms them".to_string(),
    });

    standards.chain(claims).collect()
}

/// One-line summary, e.g. `B 64/100: 2 confirmed (JCI, NABH); missing ISO-9001`.
pub fn summarize(breakdown: &ScoreBreakdown) -> String {
    let mut parts = Vec::new();

    if breakdown.confirmed.is_empty() {
        parts.push("no confirmed accreditations".to_string());
    } else {
        let labels: Vec<String> = breakdown
            .confirmed
            .iter()
            .map(|c| c.accreditation_type.to_string())
            .collect();
        parts.push(format!("{} confirmed ({})", labels.len(), labels.join(", ")));
    }

    if !breakdown.missing_mandatory_standards.is_empty() {
        let labels: Vec<String> = breakdown
            .missing_mandatory_standards
            .iter()
            .map(|m| m.standard.to_string())
            .collect();
        parts.push(format!("missing {}", labels.join(", ")));
    }

    if !breakdown.warnings.is_empty() {
        let labels: Vec<String> = breakdown
            .warnings
            .iter()
            .map(|w| w.accreditation_type.to_string())
            .collect();
        parts.push(format!("unverifiable {}", labels.join(", ")));
    }

    format!(
        "{} {}/{}: {}",
        breakdown.grade.label(),
        breakdown.final_score,
        breakdown.max_score,
        parts.join("; ")
    )
}
