//! Accreditation scoring engine.
//!
//! Turns registry-confirmed accreditations into an itemized score:
//! certification points (weights plus a diversity bonus, capped), a
//! quality-initiative sub-score, and penalties for missing mandatory
//! standards. Only the registry can confirm an accreditation; claims on the
//! query are reported, never scored.

pub mod config;
pub mod initiative;
pub mod rules;

pub use config::{ConfigError, ScoringConfig};
pub use initiative::{InitiativeScorer, SignalSum};
pub use rules::{MandatoryRules, MandatoryStandard, PenaltyReduction, GLOBAL_HOSPITAL_ACCREDITATIONS};

use quxat_model::{
    AccreditationType, CertificationItem, Grade, MissingStandard, OrganizationQuery,
    RegistryWarning, ScoreBreakdown,
};
use quxat_query::{PreparedQuery, QueryError};
use quxat_registry::RegistryStore;
use quxat_validate::{AccreditationValidator, ValidationReport};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

pub struct ScoringEngine {
    validator: AccreditationValidator,
    config: ScoringConfig,
    initiatives: Box<dyn InitiativeScorer>,
}

impl ScoringEngine {
    /// Build an engine over a frozen store. The configuration is validated
    /// here, so caps and weights are finite and non-negative from then on.
    pub fn new(store: Arc<RegistryStore>, config: ScoringConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let validator = AccreditationValidator::new(store)
            .with_resolver(config.resolver.clone())
            .with_aliases(config.place_aliases.clone());
        Ok(Self {
            validator,
            config,
            initiatives: Box::new(SignalSum),
        })
    }

    pub fn with_initiative_scorer(mut self, scorer: impl InitiativeScorer + 'static) -> Self {
        self.initiatives = Box::new(scorer);
        self
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn validator(&self) -> &AccreditationValidator {
        &self.validator
    }

    /// Score one organization.
    ///
    /// Only an invalid query is an error. Unavailable registries degrade
    /// their type to unconfirmed and are reported in `warnings`.
    pub fn score(
        &self,
        query: &OrganizationQuery,
        rules: &MandatoryRules,
    ) -> Result<ScoreBreakdown, QueryError> {
        let prepared = PreparedQuery::prepare(query)?;

        let mut types: BTreeSet<AccreditationType> = self.config.weights.keys().cloned().collect();
        types.extend(rules.referenced_types());
        let types: Vec<AccreditationType> = types.into_iter().collect();

        let reports: Vec<ValidationReport> = types
            .par_iter()
            .map(|accreditation_type| self.validator.report(&prepared, accreditation_type))
            .collect();

        Ok(self.aggregate(query, &prepared, reports, rules))
    }

    /// Score many organizations in parallel; results keep input order.
    pub fn score_batch(
        &self,
        queries: &[OrganizationQuery],
        rules: &MandatoryRules,
    ) -> Vec<Result<ScoreBreakdown, QueryError>> {
        queries
            .par_iter()
            .map(|query| self.score(query, rules))
            .collect()
    }

    fn aggregate(
        &self,
        query: &OrganizationQuery,
        prepared: &PreparedQuery,
        reports: Vec<ValidationReport>,
        rules: &MandatoryRules,
    ) -> ScoreBreakdown {
        let config = &self.config;
        let mut confirmed = Vec::new();
        let mut audit_flags = Vec::new();
        let mut warnings = Vec::new();

        for report in reports {
            // Types only named as equivalents or reduction triggers may
            // legitimately have no registry.
            let named = config.weights.contains_key(&report.accreditation_type)
                || rules.requires(&report.accreditation_type);
            if let Some(reason) = report.unavailable_reason() {
                if report.is_configured() || named {
                    warnings.push(RegistryWarning {
                        accreditation_type: report.accreditation_type.clone(),
                        reason: reason.to_string(),
                    });
                }
            }
            audit_flags.extend(report.audit_flags.iter().cloned());
            if let Some(accreditation) = report.into_confirmed() {
                confirmed.push(accreditation);
            }
        }

        let confirmed_types: BTreeSet<AccreditationType> = confirmed
            .iter()
            .map(|c| c.accreditation_type.clone())
            .collect();

        // Certification
        let certification_items: Vec<CertificationItem> = confirmed_types
            .iter()
            .filter_map(|accreditation_type| {
                let points = config.weight(accreditation_type);
                (points > 0.0).then(|| CertificationItem {
                    accreditation_type: accreditation_type.clone(),
                    points,
                })
            })
            .collect();
        let base: f64 = certification_items.iter().map(|item| item.points).sum();
        let diversity_bonus = if certification_items.len() >= config.diversity_min_types {
            (config.diversity_bonus_per_type * certification_items.len() as f64)
                .min(config.diversity_bonus_cap)
        } else {
            0.0
        };
        let certification_score = (base + diversity_bonus).min(config.certification_cap);

        // Quality initiatives
        let initiative = self.initiatives.score(query);
        let quality_initiative_score = if initiative.is_finite() && initiative > 0.0 {
            initiative.min(config.initiative_cap)
        } else {
            0.0
        };

        // Mandatory standards, in table order
        let missing_mandatory_standards: Vec<MissingStandard> = rules
            .iter()
            .filter(|standard| !standard.is_satisfied(&confirmed_types))
            .map(|standard| MissingStandard {
                standard: standard.standard.clone(),
                penalty_points: standard.effective_penalty(&confirmed_types),
                impact_tier: standard.impact_tier,
            })
            .collect();
        let mandatory_penalty: f64 = missing_mandatory_standards
            .iter()
            .map(|m| m.penalty_points)
            .sum();

        let final_score = (certification_score + quality_initiative_score - mandatory_penalty)
            .max(0.0)
            .min(config.max_score);
        let percent = if config.max_score > 0.0 {
            final_score / config.max_score * 100.0
        } else {
            0.0
        };
        let grade = Grade::from_percentage(percent);

        let unconfirmed_claims = prepared
            .claims
            .iter()
            .filter(|c| {
                c.accreditation_type
                    .as_ref()
                    .map_or(true, |t| !confirmed_types.contains(t))
            })
            .map(|c| c.claim.clone())
            .collect();

        tracing::info!(
            organization = %prepared.name,
            final_score,
            grade = grade.label(),
            confirmed = confirmed.len(),
            missing = missing_mandatory_standards.len(),
            degraded = warnings.len(),
            initiative_scorer = self.initiatives.name(),
            "Scored organization"
        );

        ScoreBreakdown {
            organization: prepared.name.clone(),
            certification_score,
            quality_initiative_score,
            mandatory_penalty,
            final_score,
            max_score: config.max_score,
            compliant: missing_mandatory_standards.is_empty(),
            missing_mandatory_standards,
            grade,
            confirmed,
            certification_items,
            diversity_bonus,
            unconfirmed_claims,
            audit_flags,
            warnings,
        }
    }
}
