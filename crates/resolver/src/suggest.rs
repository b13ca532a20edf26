//! Organization-name suggestions for interactive lookup.
//!
//! Suggestions only help a user find the registry spelling of a name.
//! They are never used for scoring.

use quxat_features::{normalize_name, tokens};
use quxat_model::{AccreditationType, Location};
use quxat_registry::RegistryStore;
use serde::Serialize;
use std::collections::BTreeMap;

/// Shortest normalized input that produces suggestions.
pub const MIN_PARTIAL_LEN: usize = 2;

/// How a suggestion matched the partial input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuggestionKind {
    /// The whole name starts with the input
    NameStart,
    /// Some later word of the name starts with the input
    TokenStart,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Registries listing this name, in type order
    pub accreditation_types: Vec<AccreditationType>,
    pub kind: SuggestionKind,
}

/// Source of name suggestions.
pub trait SuggestionSource {
    /// Up to `limit` suggestions for a partial name.
    fn suggest(&self, partial: &str, limit: usize) -> Vec<Suggestion>;

    /// Source name for logging.
    fn name(&self) -> &'static str;
}

/// Suggestions drawn from the loaded registries.
#[derive(Debug, Clone, Copy)]
pub struct RegistrySuggestions<'a> {
    store: &'a RegistryStore,
}

impl<'a> RegistrySuggestions<'a> {
    pub fn new(store: &'a RegistryStore) -> Self {
        Self { store }
    }
}

impl SuggestionSource for RegistrySuggestions<'_> {
    fn suggest(&self, partial: &str, limit: usize) -> Vec<Suggestion> {
        let partial = normalize_name(partial);
        if partial.chars().count() < MIN_PARTIAL_LEN || limit == 0 {
            return Vec::new();
        }

        // Keyed by normalized name so spelling variants collapse.
        let mut found: BTreeMap<String, Suggestion> = BTreeMap::new();

        for record in self.store.iter_records() {
            let normalized = normalize_name(&record.organization_name);
            let kind = if normalized.starts_with(&partial) {
                SuggestionKind::NameStart
            } else if tokens(&normalized).iter().any(|t| t.starts_with(&partial)) {
                SuggestionKind::TokenStart
            } else {
                continue;
            };

            let entry = found.entry(normalized).or_insert_with(|| Suggestion {
                name: record.organization_name.trim().to_string(),
                location: record.location.clone(),
                accreditation_types: Vec::new(),
                kind,
            });
            if !entry.accreditation_types.contains(&record.accreditation_type) {
                entry.accreditation_types.push(record.accreditation_type.clone());
            }
        }

        let mut suggestions: Vec<Suggestion> = found.into_values().collect();
        // Stable sort keeps name order within each kind.
        suggestions.sort_by_key(|s| s.kind);
        suggestions.truncate(limit);

        tracing::debug!(
            source = self.name(),
            partial = %partial,
            count = suggestions.len(),
            "Suggestions"
        );

        suggestions
    }

    fn name(&self) -> &'static str {
        "registry"
    }
}
