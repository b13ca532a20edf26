//! Name resolution against accreditation registries.
//!
//! Every organization-name comparison in the system goes through
//! `NameResolver`. Exact matches require normalized full-string equality;
//! fuzzy matches are bounded by similarity thresholds and only ever produce
//! lower-confidence candidates. Names related to the query purely by
//! containment ("Apollo Hospitals" vs "Apollo Hospitals Chennai") are never
//! positive matches.

pub mod location;
pub mod suggest;

pub use location::{LocationCheck, LocationDisambiguator};
pub use suggest::{RegistrySuggestions, Suggestion, SuggestionKind, SuggestionSource};

use quxat_features::{is_containment, normalize_name, phonetic_tokens_match, similarity_ratio};
use quxat_model::{Confidence, LocationConsistency, MatchResult, MatchType, RegistryRecord};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Configuration for name resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Look for fuzzy candidates when nothing matches exactly
    pub fuzzy_enabled: bool,
    /// Minimum edit similarity for a MEDIUM fuzzy candidate
    pub fuzzy_medium: f64,
    /// Minimum edit similarity for a LOW fuzzy candidate
    pub fuzzy_low: f64,
    /// Accept token-wise phonetic agreement as a LOW fuzzy candidate
    pub phonetic: bool,
    /// Report containment-only candidates as REJECTED
    pub report_containment: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            fuzzy_enabled: true,
            fuzzy_medium: 0.92,
            fuzzy_low: 0.85,
            phonetic: true,
            report_containment: true,
        }
    }
}

/// Matches organization names against registry records.
#[derive(Debug, Clone, Default)]
pub struct NameResolver {
    config: ResolverConfig,
}

impl NameResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve a raw query name against registry records.
    pub fn resolve(&self, query_name: &str, records: &[RegistryRecord]) -> Vec<MatchResult> {
        self.resolve_normalized(&normalize_name(query_name), records)
    }

    /// Resolve an already normalized name.
    ///
    /// Results are ordered EXACT, FUZZY, REJECTED; then by confidence,
    /// similarity and registry position. When any exact match exists only
    /// exact matches are returned.
    pub fn resolve_normalized(&self, query: &str, records: &[RegistryRecord]) -> Vec<MatchResult> {
        if query.is_empty() {
            return Vec::new();
        }

        let normalized: Vec<String> = records
            .iter()
            .map(|record| normalize_name(&record.organization_name))
            .collect();

        let exact: Vec<MatchResult> = records
            .iter()
            .zip(&normalized)
            .enumerate()
            .filter(|(_, (_, candidate))| candidate.as_str() == query)
            .map(|(position, (record, _))| MatchResult {
                candidate: record.clone(),
                match_type: MatchType::Exact,
                confidence: Confidence::High,
                similarity: 1.0,
                location: LocationConsistency::Unknown,
                position,
            })
            .collect();

        if !exact.is_empty() {
            tracing::debug!(query = %query, matches = exact.len(), "Exact name match");
            return exact;
        }

        let results = self.rank_inexact(query, records, &normalized);
        if !results.is_empty() {
            tracing::debug!(query = %query, candidates = results.len(), "No exact match; inexact candidates found");
        }
        results
    }

    /// FUZZY and REJECTED candidates only, ignoring exact matches.
    ///
    /// Used when every exact match was ruled out downstream and the
    /// near misses still need to reach curation.
    pub fn resolve_inexact(&self, query: &str, records: &[RegistryRecord]) -> Vec<MatchResult> {
        if query.is_empty() {
            return Vec::new();
        }
        let normalized: Vec<String> = records
            .iter()
            .map(|record| normalize_name(&record.organization_name))
            .collect();
        self.rank_inexact(query, records, &normalized)
    }

    fn rank_inexact(&self, query: &str, records: &[RegistryRecord], normalized: &[String]) -> Vec<MatchResult> {
        let mut results: Vec<MatchResult> = records
            .iter()
            .zip(normalized)
            .enumerate()
            .filter(|(_, (_, candidate))| candidate.as_str() != query)
            .filter_map(|(position, (record, candidate))| {
                self.classify(query, candidate).map(|(match_type, confidence, similarity)| {
                    MatchResult {
                        candidate: record.clone(),
                        match_type,
                        confidence,
                        similarity,
                        location: LocationConsistency::Unknown,
                        position,
                    }
                })
            })
            .collect();

        results.sort_by(|a, b| {
            match_rank(a.match_type)
                .cmp(&match_rank(b.match_type))
                .then(Reverse(a.confidence).cmp(&Reverse(b.confidence)))
                .then(b.similarity.total_cmp(&a.similarity))
                .then(a.position.cmp(&b.position))
        });

        results
    }

    /// Classify a non-exact candidate.
    fn classify(&self, query: &str, candidate: &str) -> Option<(MatchType, Confidence, f64)> {
        if candidate.is_empty() {
            return None;
        }

        let similarity = similarity_ratio(query, candidate);

        // Containment is checked before any similarity threshold.
        if is_containment(query, candidate) {
            return self
                .config
                .report_containment
                .then_some((MatchType::Rejected, Confidence::Low, similarity));
        }

        if !self.config.fuzzy_enabled {
            return None;
        }

        if similarity >= self.config.fuzzy_medium {
            Some((MatchType::Fuzzy, Confidence::Medium, similarity))
        } else if similarity >= self.config.fuzzy_low
            || (self.config.phonetic && phonetic_tokens_match(query, candidate))
        {
            Some((MatchType::Fuzzy, Confidence::Low, similarity))
        } else {
            None
        }
    }
}

fn match_rank(match_type: MatchType) -> u8 {
    match match_type {
        MatchType::Exact => 0,
        MatchType::Fuzzy => 1,
        MatchType::Rejected => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quxat_model::AccreditationType;

    fn jci(name: &str) -> RegistryRecord {
        RegistryRecord::new(AccreditationType::Jci, name).verified()
    }

    #[test]
    fn test_exact_match_is_case_and_whitespace_insensitive() {
        let resolver = NameResolver::default();
        let records = vec![jci("Apollo Hospitals Chennai")];

        let a = resolver.resolve("Apollo Hospitals Chennai", &records);
        let b = resolver.resolve(" apollo   hospitals chennai ", &records);

        assert_eq!(a, b);
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].match_type, MatchType::Exact);
        assert_eq!(a[0].confidence, Confidence::High);
    }

    #[test]
    fn test_substring_never_exact() {
        let resolver = NameResolver::default();

        let shorter_in_registry = resolver.resolve("Apollo Hospitals Chennai", &[jci("Apollo Hospitals")]);
        assert!(shorter_in_registry.iter().all(|m| m.match_type != MatchType::Exact));
        assert!(shorter_in_registry.iter().all(|m| m.match_type != MatchType::Fuzzy));

        let longer_in_registry = resolver.resolve("Apollo Hospitals", &[jci("Apollo Hospitals Chennai")]);
        assert!(longer_in_registry.iter().all(|m| m.match_type != MatchType::Exact));
        assert!(longer_in_registry.iter().all(|m| m.match_type != MatchType::Fuzzy));
    }

    #[test]
    fn test_containment_reported_as_rejected() {
        let resolver = NameResolver::default();
        let results = resolver.resolve("Apollo Hospitals Chennai", &[jci("Apollo Hospitals")]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].match_type, MatchType::Rejected);
        assert_eq!(results[0].confidence, Confidence::Low);

        let quiet = NameResolver::new(ResolverConfig {
            report_containment: false,
            ..Default::default()
        });
        assert!(quiet.resolve("Apollo Hospitals Chennai", &[jci("Apollo Hospitals")]).is_empty());
    }

    #[test]
    fn test_sibling_branch_is_not_a_candidate() {
        let resolver = NameResolver::default();
        let results = resolver.resolve("Apollo Hospitals Secunderabad", &[jci("Apollo Hospitals Chennai")]);
        assert!(results.is_empty(), "{results:?}");
    }

    #[test]
    fn test_fuzzy_candidates() {
        let resolver = NameResolver::default();
        let records = vec![
            jci("Kokilaben Dhirubhai Ambani Hospital"),
            jci("Kokilaben Dhirubai Ambani Hospital"),
        ];
        let results = resolver.resolve("Kokilaben Dhirubhai Ambani Hospitl", &records);

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|m| m.match_type == MatchType::Fuzzy));
        assert!(results.iter().all(|m| m.confidence == Confidence::Medium));
        assert!(results[0].similarity > results[1].similarity);
        assert_eq!(results[0].position, 0);
    }

    #[test]
    fn test_phonetic_candidate_is_low() {
        let resolver = NameResolver::default();
        let results = resolver.resolve("Smith Clinic", &[jci("Smyth Clinic")]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].match_type, MatchType::Fuzzy);
        assert_eq!(results[0].confidence, Confidence::Low);
    }

    #[test]
    fn test_exact_suppresses_inexact() {
        let resolver = NameResolver::default();
        let records = vec![
            jci("Apollo Hospitals"),
            jci("Apollo Hospitals Chennai"),
            jci("apollo hospitals, chennai"),
        ];
        let results = resolver.resolve("Apollo Hospitals Chennai", &records);
        assert_eq!(results.iter().map(|m| m.position).collect::<Vec<_>>(), vec![1, 2]);
        assert!(results.iter().all(|m| m.match_type == MatchType::Exact));
    }

    #[test]
    fn test_resolve_inexact_skips_exact() {
        let resolver = NameResolver::default();
        let records = vec![
            jci("Kokilaben Dhirubhai Ambani Hospital"),
            jci("Kokilaben Dhirubhai Ambani Hospitl"),
            jci("Kokilaben Dhirubhai Ambani"),
        ];
        let results = resolver.resolve_inexact("kokilaben dhirubhai ambani hospitl", &records);
        assert_eq!(
            results.iter().map(|m| (m.position, m.match_type)).collect::<Vec<_>>(),
            vec![(0, MatchType::Fuzzy), (2, MatchType::Rejected)]
        );
    }

    #[test]
    fn test_empty_inputs() {
        let resolver = NameResolver::default();
        assert!(resolver.resolve("Apollo", &[]).is_empty());
        assert!(resolver.resolve("  ", &[jci("Apollo")]).is_empty());
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: ResolverConfig = serde_json::from_str(r#"{"fuzzy_medium": 0.95}"#).unwrap();
        assert_eq!(config.fuzzy_medium, 0.95);
        assert_eq!(config.fuzzy_low, 0.85);
        assert!(config.fuzzy_enabled);
    }
}
