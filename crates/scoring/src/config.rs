//! Scoring configuration.

use quxat_features::PlaceAliases;
use quxat_model::AccreditationType;
use quxat_resolver::ResolverConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{field} must be a non-negative number, got {value}")]
    Negative { field: String, value: f64 },

    #[error("{field} must be between 0 and 1, got {value}")]
    OutOfRange { field: String, value: f64 },
}

impl ConfigError {
    pub(crate) fn check(field: impl Into<String>, value: f64) -> Result<(), Self> {
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(Self::Negative {
                field: field.into(),
                value,
            })
        }
    }

    pub(crate) fn check_fraction(field: impl Into<String>, value: f64) -> Result<(), Self> {
        if (0.0..=1.0).contains(&value) {
            Ok(())
        } else {
            Err(Self::OutOfRange {
                field: field.into(),
                value,
            })
        }
    }
}

/// Read and parse a JSON configuration file.
pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Caps, weights and matching parameters of the scoring engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub max_score: f64,
    pub certification_cap: f64,
    pub initiative_cap: f64,

    /// Points per confirmed accreditation type
    pub weights: BTreeMap<AccreditationType, f64>,

    /// Bonus per confirmed weighted type once `diversity_min_types` are confirmed
    pub diversity_bonus_per_type: f64,
    pub diversity_bonus_cap: f64,
    pub diversity_min_types: usize,

    pub resolver: ResolverConfig,
    pub place_aliases: PlaceAliases,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let weights = [
            (AccreditationType::Jci, 30.0),
            (AccreditationType::Nabh, 20.0),
            (AccreditationType::Nabl, 12.0),
            (AccreditationType::Cap, 12.0),
            (AccreditationType::Iso15189, 12.0),
            (AccreditationType::Iso9001, 12.0),
            (AccreditationType::Iso13485, 6.0),
            (AccreditationType::Iso27001, 6.0),
            (AccreditationType::Iso45001, 5.0),
            (AccreditationType::Iso14001, 5.0),
        ]
        .into_iter()
        .collect();

        Self {
            max_score: 100.0,
            certification_cap: 75.0,
            initiative_cap: 35.0,
            weights,
            diversity_bonus_per_type: 2.0,
            diversity_bonus_cap: 10.0,
            diversity_min_types: 2,
            resolver: ResolverConfig::default(),
            place_aliases: PlaceAliases::default(),
        }
    }
}

impl ScoringConfig {
    /// Parse and validate a JSON configuration; omitted keys keep defaults.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(|source| ConfigError::Json {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config: Self = read_json(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check("max_score", self.max_score)?;
        ConfigError::check("certification_cap", self.certification_cap)?;
        ConfigError::check("initiative_cap", self.initiative_cap)?;
        ConfigError::check("diversity_bonus_per_type", self.diversity_bonus_per_type)?;
        ConfigError::check("diversity_bonus_cap", self.diversity_bonus_cap)?;
        for (accreditation_type, weight) in &self.weights {
            ConfigError::check(format!("weights.{}", accreditation_type), *weight)?;
        }
        Ok(())
    }

    /// Weight of a type; unlisted types are worth nothing.
    pub fn weight(&self, accreditation_type: &AccreditationType) -> f64 {
        self.weights.get(accreditation_type).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ScoringConfig::default();
        assert_eq!(config.weight(&AccreditationType::Jci), 30.0);
        assert_eq!(config.weight(&AccreditationType::Other("MAGNET".into())), 0.0);
        assert_eq!(config.weights.len(), 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_override() {
        let config = ScoringConfig::from_json_str(
            r#"{"certification_cap": 60, "weights": {"JCI": 40, "iso 9001": 10}}"#,
        )
        .unwrap();
        assert_eq!(config.certification_cap, 60.0);
        assert_eq!(config.max_score, 100.0);
        assert_eq!(config.weight(&AccreditationType::Jci), 40.0);
        assert_eq!(config.weight(&AccreditationType::Iso9001), 10.0);
        assert_eq!(config.weight(&AccreditationType::Nabh), 0.0);
    }

    #[test]
    fn test_negative_values_rejected() {
        let err = ScoringConfig::from_json_str(r#"{"initiative_cap": -5}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Negative { ref field, .. } if field == "initiative_cap"));

        let err = ScoringConfig::from_json_str(r#"{"weights": {"NABH": -1}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Negative { ref field, .. } if field == "weights.NABH"));
    }

    #[test]
    fn test_nan_max_score_rejected() {
        let config = ScoringConfig {
            max_score: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Negative { ref field, .. }) if field == "max_score"
        ));
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ScoringConfig::load(&dir.path().join("missing.json")),
            Err(ConfigError::Io { .. })
        ));

        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(ScoringConfig::load(&path), Err(ConfigError::Json { .. })));
    }
}
