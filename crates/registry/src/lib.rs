//! Accreditation registry store.
//!
//! Registries are loaded once through a `RegistryStoreBuilder` and frozen into
//! a read-only `RegistryStore` that validators share. A registry that fails to
//! load is remembered as failed for its accreditation type only; lookups for
//! that type return the `LoadError` so callers can treat it as unconfirmable.

mod error;
pub mod ingest;

pub use error::LoadError;
pub use ingest::{ParsedRegistry, SkippedRecord};

use quxat_model::{AccreditationType, RegistryRecord};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Load state of one accreditation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryStatus<'a> {
    Loaded(&'a [RegistryRecord]),
    Failed(&'a LoadError),
    NotConfigured,
}

/// Per-type load summary for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrySummary {
    pub accreditation_type: AccreditationType,
    pub records: usize,
    pub verified: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Collects registries before the store is frozen.
#[derive(Debug, Default)]
pub struct RegistryStoreBuilder {
    registries: BTreeMap<AccreditationType, Result<Vec<RegistryRecord>, LoadError>>,
}

impl RegistryStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one record to the registry of its accreditation type.
    pub fn record(mut self, record: RegistryRecord) -> Self {
        let entry = self
            .registries
            .entry(record.accreditation_type.clone())
            .or_insert_with(|| Ok(Vec::new()));
        match entry {
            Ok(records) => records.push(record),
            Err(error) => tracing::warn!(
                registry = %record.accreditation_type,
                record = %record.organization_name,
                error = %error,
                "Registry already failed; dropping record"
            ),
        }
        self
    }

    /// Set the registry for a type, replacing anything loaded before.
    ///
    /// Records are retagged with `accreditation_type`.
    pub fn records(
        mut self,
        accreditation_type: AccreditationType,
        records: impl IntoIterator<Item = RegistryRecord>,
    ) -> Self {
        let records = records
            .into_iter()
            .map(|mut record| {
                record.accreditation_type = accreditation_type.clone();
                record
            })
            .collect();
        self.registries.insert(accreditation_type, Ok(records));
        self
    }

    /// Mark a type as failed.
    pub fn failed(mut self, accreditation_type: AccreditationType, error: LoadError) -> Self {
        self.registries.insert(accreditation_type, Err(error));
        self
    }

    /// Load one registry file. Failures are recorded, not returned.
    pub fn load_file(self, accreditation_type: AccreditationType, path: &Path) -> Self {
        match read_registry_file(&accreditation_type, path) {
            Ok(parsed) => {
                for skipped in &parsed.skipped {
                    tracing::warn!(
                        registry = %accreditation_type,
                        path = %path.display(),
                        index = skipped.index,
                        reason = %skipped.reason,
                        "Skipping registry entry"
                    );
                }
                tracing::info!(
                    registry = %accreditation_type,
                    path = %path.display(),
                    records = parsed.records.len(),
                    skipped = parsed.skipped.len(),
                    "Loaded registry"
                );
                self.records(accreditation_type, parsed.records)
            }
            Err(error) => {
                tracing::warn!(
                    registry = %accreditation_type,
                    error = %error,
                    "Registry unavailable; type will be treated as unconfirmable"
                );
                self.failed(accreditation_type, error)
            }
        }
    }

    /// Load `<dir>/<slug>.json` for each type, e.g. `jci.json`, `iso-9001.json`.
    pub fn load_dir<'a>(
        self,
        dir: &Path,
        types: impl IntoIterator<Item = &'a AccreditationType>,
    ) -> Self {
        types.into_iter().fold(self, |builder, accreditation_type| {
            let path = registry_path(dir, accreditation_type);
            builder.load_file(accreditation_type.clone(), &path)
        })
    }

    /// Freeze the store. No registry changes after this point.
    pub fn build(self) -> RegistryStore {
        RegistryStore {
            registries: self.registries,
        }
    }
}

/// Read-only accreditation registries, keyed by accreditation type.
#[derive(Debug, Clone, Default)]
pub struct RegistryStore {
    registries: BTreeMap<AccreditationType, Result<Vec<RegistryRecord>, LoadError>>,
}

impl RegistryStore {
    pub fn builder() -> RegistryStoreBuilder {
        RegistryStoreBuilder::new()
    }

    /// Records of one registry, or why they are unavailable.
    pub fn records_for(
        &self,
        accreditation_type: &AccreditationType,
    ) -> Result<&[RegistryRecord], LoadError> {
        match self.registries.get(accreditation_type) {
            Some(Ok(records)) => Ok(records.as_slice()),
            Some(Err(error)) => Err(error.clone()),
            None => Err(LoadError::NotConfigured(accreditation_type.clone())),
        }
    }

    pub fn status(&self, accreditation_type: &AccreditationType) -> RegistryStatus<'_> {
        match self.registries.get(accreditation_type) {
            Some(Ok(records)) => RegistryStatus::Loaded(records.as_slice()),
            Some(Err(error)) => RegistryStatus::Failed(error),
            None => RegistryStatus::NotConfigured,
        }
    }

    /// Types whose registry loaded.
    pub fn all_types(&self) -> BTreeSet<AccreditationType> {
        self.registries
            .iter()
            .filter(|(_, registry)| registry.is_ok())
            .map(|(accreditation_type, _)| accreditation_type.clone())
            .collect()
    }

    /// Types whose registry failed to load.
    pub fn failures(&self) -> Vec<(&AccreditationType, &LoadError)> {
        self.registries
            .iter()
            .filter_map(|(accreditation_type, registry)| {
                registry.as_ref().err().map(|error| (accreditation_type, error))
            })
            .collect()
    }

    /// All loaded records in type order.
    pub fn iter_records(&self) -> impl Iterator<Item = &RegistryRecord> {
        self.registries
            .values()
            .filter_map(|registry| registry.as_ref().ok())
            .flatten()
    }

    pub fn summary(&self) -> Vec<RegistrySummary> {
        self.registries
            .iter()
            .map(|(accreditation_type, registry)| match registry {
                Ok(records) => RegistrySummary {
                    accreditation_type: accreditation_type.clone(),
                    records: records.len(),
                    verified: records.iter().filter(|r| !r.verification_required).count(),
                    error: None,
                },
                Err(error) => RegistrySummary {
                    accreditation_type: accreditation_type.clone(),
                    records: 0,
                    verified: 0,
                    error: Some(error.to_string()),
                },
            })
            .collect()
    }
}

/// Conventional file location of a registry inside a registry directory.
pub fn registry_path(dir: &Path, accreditation_type: &AccreditationType) -> PathBuf {
    dir.join(format!("{}.json", accreditation_type.slug()))
}

fn read_registry_file(
    accreditation_type: &AccreditationType,
    path: &Path,
) -> Result<ParsedRegistry, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|e| LoadError::io(path, &e))?;
    ingest::parse_registry(accreditation_type, &text, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quxat_model::Location;
    use std::fs;

    #[test]
    fn test_load_dir_mixed_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("jci.json"),
            r#"[{"name": "Apollo Hospitals Chennai", "city": "Chennai", "verification_required": false}]"#,
        )
        .unwrap();
        fs::write(dir.path().join("nabh.json"), "{ this is not json").unwrap();

        let store = RegistryStore::builder()
            .load_dir(
                dir.path(),
                [&AccreditationType::Jci, &AccreditationType::Nabh, &AccreditationType::Cap],
            )
            .build();

        assert_eq!(store.records_for(&AccreditationType::Jci).unwrap().len(), 1);
        assert!(matches!(
            store.records_for(&AccreditationType::Nabh),
            Err(LoadError::Malformed { .. })
        ));
        assert!(matches!(
            store.records_for(&AccreditationType::Cap),
            Err(LoadError::Missing { .. })
        ));
        assert!(matches!(
            store.records_for(&AccreditationType::Iso9001),
            Err(LoadError::NotConfigured(_))
        ));
        assert_eq!(
            store.all_types().into_iter().collect::<Vec<_>>(),
            vec![AccreditationType::Jci]
        );
        assert_eq!(store.failures().len(), 2);
    }

    #[test]
    fn test_builder_retags_records() {
        let store = RegistryStore::builder()
            .records(
                AccreditationType::Nabl,
                vec![RegistryRecord::new(AccreditationType::Jci, "Apex Labs")],
            )
            .build();

        let records = store.records_for(&AccreditationType::Nabl).unwrap();
        assert_eq!(records[0].accreditation_type, AccreditationType::Nabl);
        assert!(store.records_for(&AccreditationType::Jci).is_err());
    }

    #[test]
    fn test_record_appends_by_type() {
        let store = RegistryStore::builder()
            .record(RegistryRecord::new(AccreditationType::Jci, "A").verified())
            .record(
                RegistryRecord::new(AccreditationType::Jci, "B")
                    .with_location(Location::city("Pune")),
            )
            .record(RegistryRecord::new(AccreditationType::Cap, "C"))
            .build();

        assert_eq!(store.records_for(&AccreditationType::Jci).unwrap().len(), 2);
        assert_eq!(store.iter_records().count(), 3);

        let summary = store.summary();
        assert_eq!(summary[0].accreditation_type, AccreditationType::Jci);
        assert_eq!(summary[0].verified, 1);
    }

    #[test]
    fn test_record_for_failed_type_is_dropped() {
        let store = RegistryStore::builder()
            .failed(
                AccreditationType::Nabh,
                LoadError::Missing {
                    path: PathBuf::from("nabh.json"),
                },
            )
            .record(RegistryRecord::new(AccreditationType::Nabh, "Apollo Hospitals").verified())
            .build();

        assert!(matches!(
            store.records_for(&AccreditationType::Nabh),
            Err(LoadError::Missing { .. })
        ));
        assert_eq!(store.iter_records().count(), 0);
    }

    #[test]
    fn test_status() {
        let store = RegistryStore::builder()
            .failed(
                AccreditationType::Iso9001,
                LoadError::Missing {
                    path: PathBuf::from("iso-9001.json"),
                },
            )
            .build();
        assert!(matches!(
            store.status(&AccreditationType::Iso9001),
            RegistryStatus::Failed(_)
        ));
        assert_eq!(store.status(&AccreditationType::Jci), RegistryStatus::NotConfigured);
    }

    #[test]
    fn test_registry_path() {
        let path = registry_path(Path::new("/data"), &AccreditationType::Iso15189);
        assert_eq!(path, PathBuf::from("/data/iso-15189.json"));
    }
}
