//! Accreditation validation.
//!
//! Decides whether one organization holds one accreditation type, using only
//! the registry as evidence. The rule is fail-closed: unverified records,
//! location collisions, fuzzy names and unavailable registries never confirm.

use quxat_features::{normalize_name, PlaceAliases};
use quxat_model::{
    AccreditationType, AuditFlag, Confidence, ConfirmedAccreditation, LocationConsistency,
    MatchBasis, MatchResult, MatchType, OrganizationQuery,
};
use quxat_query::{PreparedQuery, QueryError};
use quxat_registry::{LoadError, RegistryStore};
use quxat_resolver::{LocationDisambiguator, NameResolver, ResolverConfig};
use serde::Serialize;
use std::sync::Arc;

/// Why an exact name match was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectionReason {
    VerificationRequired,
    LocationInconsistent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub record_name: String,
    pub position: usize,
    pub reason: RejectionReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum ValidationOutcome {
    Confirmed(ConfirmedAccreditation),
    /// No acceptable registry entry; the normal "not found" result
    NotAccredited,
    /// Several exact entries at mutually conflicting locations
    Conflict,
    /// Registry missing or unreadable
    RegistryUnavailable { reason: String },
    /// No registry was ever set up for the type
    NotConfigured { reason: String },
}

/// Outcome of validating one accreditation type, with the evidence behind it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub accreditation_type: AccreditationType,
    pub outcome: ValidationOutcome,
    pub rejections: Vec<Rejection>,
    /// Fuzzy candidates for manual curation
    pub curation: Vec<MatchResult>,
    pub audit_flags: Vec<AuditFlag>,
}

impl ValidationReport {
    fn new(accreditation_type: AccreditationType, outcome: ValidationOutcome) -> Self {
        Self {
            accreditation_type,
            outcome,
            rejections: Vec::new(),
            curation: Vec::new(),
            audit_flags: Vec::new(),
        }
    }

    pub fn confirmed(&self) -> Option<&ConfirmedAccreditation> {
        match &self.outcome {
            ValidationOutcome::Confirmed(confirmed) => Some(confirmed),
            _ => None,
        }
    }

    pub fn into_confirmed(self) -> Option<ConfirmedAccreditation> {
        match self.outcome {
            ValidationOutcome::Confirmed(confirmed) => Some(confirmed),
            _ => None,
        }
    }

    /// Why the registry could not be consulted, configured or not.
    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.outcome {
            ValidationOutcome::RegistryUnavailable { reason }
            | ValidationOutcome::NotConfigured { reason } => Some(reason),
            _ => None,
        }
    }

    pub fn is_configured(&self) -> bool {
        !matches!(self.outcome, ValidationOutcome::NotConfigured { .. })
    }
}

/// Exact candidate that survived verification and location checks.
struct Survivor {
    matched: MatchResult,
    agreements: Vec<MatchBasis>,
}

#[derive(Debug, Clone)]
pub struct AccreditationValidator {
    store: Arc<RegistryStore>,
    resolver: NameResolver,
    locations: LocationDisambiguator,
}

impl AccreditationValidator {
    pub fn new(store: Arc<RegistryStore>) -> Self {
        Self {
            store,
            resolver: NameResolver::default(),
            locations: LocationDisambiguator::default(),
        }
    }

    pub fn with_resolver(mut self, config: ResolverConfig) -> Self {
        self.resolver = NameResolver::new(config);
        self
    }

    pub fn with_aliases(mut self, aliases: PlaceAliases) -> Self {
        self.locations = LocationDisambiguator::new(aliases);
        self
    }

    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    /// Confirmed accreditation, or `None` when the registry does not back it.
    pub fn validate(
        &self,
        query: &OrganizationQuery,
        accreditation_type: &AccreditationType,
    ) -> Result<Option<ConfirmedAccreditation>, QueryError> {
        let prepared = PreparedQuery::prepare(query)?;
        Ok(self.report(&prepared, accreditation_type).into_confirmed())
    }

    /// Validate one type and keep every rejection and audit note.
    pub fn report(
        &self,
        query: &PreparedQuery,
        accreditation_type: &AccreditationType,
    ) -> ValidationReport {
        let records = match self.store.records_for(accreditation_type) {
            Ok(records) => records,
            Err(error @ LoadError::NotConfigured(_)) => {
                tracing::debug!(registry = %accreditation_type, "No registry configured; cannot confirm");
                return ValidationReport::new(
                    accreditation_type.clone(),
                    ValidationOutcome::NotConfigured {
                        reason: error.to_string(),
                    },
                );
            }
            Err(error) => {
                tracing::warn!(
                    registry = %accreditation_type,
                    error = %error,
                    "Registry unavailable; cannot confirm"
                );
                return ValidationReport::new(
                    accreditation_type.clone(),
                    ValidationOutcome::RegistryUnavailable {
                        reason: error.to_string(),
                    },
                );
            }
        };

        let mut report =
            ValidationReport::new(accreditation_type.clone(), ValidationOutcome::NotAccredited);

        // Unverified entries never reach name resolution.
        let mut positions = Vec::with_capacity(records.len());
        let mut verified = Vec::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            if !record.verification_required {
                positions.push(position);
                verified.push(record.clone());
            } else if normalize_name(&record.organization_name) == query.normalized_name {
                tracing::debug!(
                    registry = %accreditation_type,
                    record = %record.organization_name,
                    "Verification required"
                );
                report.rejections.push(Rejection {
                    record_name: record.organization_name.clone(),
                    position,
                    reason: RejectionReason::VerificationRequired,
                });
            }
        }
        let registry_position = |index: usize| positions.get(index).copied().unwrap_or(index);

        let mut survivors = Vec::new();
        let mut had_exact = false;

        for mut matched in self.resolver.resolve_normalized(&query.normalized_name, &verified) {
            matched.position = registry_position(matched.position);
            if matched.match_type != MatchType::Exact {
                note_inexact(&mut report, matched);
                continue;
            }
            had_exact = true;

            let record_name = matched.candidate.organization_name.clone();
            let check = self
                .locations
                .check(query.location.as_ref(), matched.candidate.location.as_ref());
            matched.location = check.consistency;

            if check.consistency == LocationConsistency::Inconsistent {
                tracing::debug!(
                    registry = %accreditation_type,
                    record = %record_name,
                    record_city = matched.candidate.city().unwrap_or(""),
                    "Location collision"
                );
                report.audit_flags.push(AuditFlag::LocationCollision {
                    accreditation_type: accreditation_type.clone(),
                    record_name: record_name.clone(),
                    record_city: matched.candidate.city().map(str::to_string),
                });
                report.rejections.push(Rejection {
                    record_name,
                    position: matched.position,
                    reason: RejectionReason::LocationInconsistent,
                });
                continue;
            }

            survivors.push(Survivor {
                matched,
                agreements: check.agreements,
            });
        }

        // Every exact entry was ruled out; near misses still go to curation.
        if had_exact && survivors.is_empty() {
            for mut matched in self.resolver.resolve_inexact(&query.normalized_name, &verified) {
                matched.position = registry_position(matched.position);
                note_inexact(&mut report, matched);
            }
        }

        if survivors
            .iter()
            .any(|s| s.matched.location == LocationConsistency::Consistent)
        {
            survivors.retain(|s| s.matched.location == LocationConsistency::Consistent);
        }

        report.outcome = match survivors.len() {
            0 => ValidationOutcome::NotAccredited,
            1 => {
                let survivor = survivors.remove(0);
                ValidationOutcome::Confirmed(self.confirm(query, accreditation_type, survivor, false))
            }
            count if self.conflicting(&survivors) => {
                let candidates: Vec<String> = survivors
                    .iter()
                    .map(|s| s.matched.candidate.organization_name.clone())
                    .collect();
                tracing::info!(
                    registry = %accreditation_type,
                    candidates = count,
                    "Exact candidates disagree on location; not confirmed"
                );
                report.audit_flags.push(AuditFlag::AmbiguousConflict {
                    accreditation_type: accreditation_type.clone(),
                    candidates,
                });
                ValidationOutcome::Conflict
            }
            count => {
                let chosen = tie_break(&survivors);
                let survivor = survivors.swap_remove(chosen);
                report.audit_flags.push(AuditFlag::AmbiguousTieBreak {
                    accreditation_type: accreditation_type.clone(),
                    candidates: count,
                    chosen: survivor.matched.candidate.organization_name.clone(),
                });
                ValidationOutcome::Confirmed(self.confirm(query, accreditation_type, survivor, true))
            }
        };

        report
    }

    fn confirm(
        &self,
        query: &PreparedQuery,
        accreditation_type: &AccreditationType,
        survivor: Survivor,
        tie_break: bool,
    ) -> ConfirmedAccreditation {
        let mut match_basis = vec![MatchBasis::NameExact];
        match_basis.extend(survivor.agreements);
        if survivor.matched.location == LocationConsistency::Unknown {
            match_basis.push(MatchBasis::LocationUnknown);
        }
        if query.has_claim(accreditation_type) {
            match_basis.push(MatchBasis::ClaimCorroborated);
        }
        if tie_break {
            match_basis.push(MatchBasis::AmbiguousTieBreak);
        }

        tracing::info!(
            registry = %accreditation_type,
            organization = %query.name,
            record = %survivor.matched.candidate.organization_name,
            position = survivor.matched.position,
            "Accreditation confirmed"
        );

        ConfirmedAccreditation {
            accreditation_type: accreditation_type.clone(),
            confidence: Confidence::High,
            match_basis,
            record: survivor.matched.candidate,
        }
    }

    /// True when some pair of survivors sits at different places.
    fn conflicting(&self, survivors: &[Survivor]) -> bool {
        survivors.iter().enumerate().any(|(i, a)| {
            survivors[i + 1..].iter().any(|b| {
                self.locations.is_consistent(
                    a.matched.candidate.location.as_ref(),
                    b.matched.candidate.location.as_ref(),
                ) == LocationConsistency::Inconsistent
            })
        })
    }
}

/// Record a FUZZY candidate for curation or a REJECTED containment.
fn note_inexact(report: &mut ValidationReport, matched: MatchResult) {
    let accreditation_type = report.accreditation_type.clone();
    let record_name = matched.candidate.organization_name.clone();
    match matched.match_type {
        MatchType::Fuzzy => {
            tracing::debug!(
                registry = %accreditation_type,
                record = %record_name,
                similarity = matched.similarity,
                "Fuzzy candidate left for curation"
            );
            report.audit_flags.push(AuditFlag::CurationCandidate {
                accreditation_type,
                record_name,
                confidence: matched.confidence,
                similarity: matched.similarity,
            });
            report.curation.push(matched);
        }
        MatchType::Rejected => {
            tracing::debug!(registry = %accreditation_type, record = %record_name, "Containment only");
            report.audit_flags.push(AuditFlag::ContainmentRejected {
                accreditation_type,
                record_name,
            });
        }
        MatchType::Exact => {}
    }
}

/// Index of the survivor with the smallest
/// (source note, source url, organization name, registry position).
fn tie_break(survivors: &[Survivor]) -> usize {
    survivors
        .iter()
        .enumerate()
        .min_by_key(|(_, s)| {
            let record = &s.matched.candidate;
            (
                record.source_note.as_deref(),
                record.source_url.as_deref(),
                record.organization_name.as_str(),
                s.matched.position,
            )
        })
        .map(|(index, _)| index)
        .unwrap_or(0)
}
