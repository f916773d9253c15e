//! The set of known aircraft model configurations.

use std::collections::BTreeMap;
use std::path::Path;

use broker_sheet_config_models::ModelConfiguration;
use serde_json::Value;

use crate::ConfigError;

/// A configuration entry that was excluded during loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedConfiguration {
    /// Model name the entry was stored under.
    pub model: String,
    /// Why it was rejected.
    pub reason: String,
}

impl std::fmt::Display for RejectedConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.model, self.reason)
    }
}

/// Validated model configurations keyed by model name.
///
/// The registry is read by identification, extraction, and placement and
/// is only ever changed through explicit [`insert`](Self::insert) or
/// [`merge`](Self::merge) calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigRegistry {
    models: BTreeMap<String, ModelConfiguration>,
}

impl ConfigRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration JSON document.
    ///
    /// Each entry is deserialized and validated independently; entries
    /// that fail are returned as [`RejectedConfiguration`]s and left out of
    /// the registry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if the document is not a JSON object.
    pub fn from_json_str(json: &str) -> Result<(Self, Vec<RejectedConfiguration>), ConfigError> {
        let entries: serde_json::Map<String, Value> = serde_json::from_str(json)?;

        let mut registry = Self::new();
        let mut rejected = Vec::new();

        for (model, value) in entries {
            let parsed = serde_json::from_value::<ModelConfiguration>(value)
                .map_err(|e| e.to_string())
                .and_then(|config| config.validate().map(|()| config).map_err(|e| e.reason));

            match parsed {
                Ok(config) => {
                    log::debug!(
                        "Loaded configuration for {model}: {} fields, {} upgrades",
                        config.row_mappings.len(),
                        config.upgrades.len()
                    );
                    registry.models.insert(model, config);
                }
                Err(reason) => {
                    log::warn!("Skipping invalid configuration for {model}: {reason}");
                    rejected.push(RejectedConfiguration { model, reason });
                }
            }
        }

        Ok((registry, rejected))
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Json`] if it is not a JSON object.
    pub fn load(path: &Path) -> Result<(Self, Vec<RejectedConfiguration>), ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let loaded = Self::from_json_str(&json)?;
        log::info!(
            "Loaded {} model configuration(s) from {}",
            loaded.0.len(),
            path.display()
        );
        Ok(loaded)
    }

    /// Adds or replaces the configuration for `model`, returning the
    /// previous one.
    pub fn insert(
        &mut self,
        model: impl Into<String>,
        config: ModelConfiguration,
    ) -> Option<ModelConfiguration> {
        self.models.insert(model.into(), config)
    }

    /// Adds every configuration from `other`, replacing same-named ones.
    pub fn merge(&mut self, other: Self) {
        self.models.extend(other.models);
    }

    /// Returns the configuration for `model`.
    #[must_use]
    pub fn get(&self, model: &str) -> Option<&ModelConfiguration> {
        self.models.get(model)
    }

    /// Model names in sorted order.
    #[must_use]
    pub fn model_names(&self) -> Vec<&str> {
        self.models.keys().map(String::as_str).collect()
    }

    /// Iterates over `(model, configuration)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModelConfiguration)> {
        self.models.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of configured models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns `true` if no model is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Serializes the registry to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(&self.models)?)
    }

    /// Writes the registry to `path` as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_json_pretty()?)?;
        log::info!(
            "Saved {} model configuration(s) to {}",
            self.len(),
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use broker_sheet_config_models::CoreField;

    use super::*;

    const CONFIGS: &str = r#"{
        "Citation Excel": {
            "row_mappings": {"year_model": 3, "total_hours": 4, "engine_overhaul": 5},
            "upgrades": {"WIFI": {"keywords": ["wifi"], "row": 40}}
        },
        "Phenom 300": {
            "row_mappings": {"year_model": 3}
        },
        "Broken": {
            "upgrades": {}
        },
        "Zero Row": {
            "row_mappings": {"total_hours": 0}
        },
        "Unknown Field": {
            "row_mappings": {"wingspan": 9}
        }
    }"#;

    #[test]
    fn loads_valid_entries_and_rejects_invalid_ones() {
        let (registry, rejected) = ConfigRegistry::from_json_str(CONFIGS).unwrap();
        assert_eq!(registry.model_names(), vec!["Citation Excel", "Phenom 300"]);

        let mut rejected_names: Vec<_> = rejected.iter().map(|r| r.model.as_str()).collect();
        rejected_names.sort_unstable();
        assert_eq!(rejected_names, vec!["Broken", "Unknown Field", "Zero Row"]);
        assert!(rejected.iter().all(|r| !r.reason.is_empty()));
    }

    #[test]
    fn non_object_document_is_an_error() {
        assert!(ConfigRegistry::from_json_str("[1, 2, 3]").is_err());
        assert!(ConfigRegistry::from_json_str("not json").is_err());
    }

    #[test]
    fn merge_replaces_same_named_models() {
        let (mut registry, _) = ConfigRegistry::from_json_str(CONFIGS).unwrap();
        let (other, _) = ConfigRegistry::from_json_str(
            r#"{"Phenom 300": {"row_mappings": {"total_hours": 7}}, "Lear 45": {"row_mappings": {}}}"#,
        )
        .unwrap();
        registry.merge(other);

        assert_eq!(registry.len(), 3);
        let phenom = registry.get("Phenom 300").unwrap();
        assert_eq!(phenom.row_for(CoreField::TotalHours), Some(7));
        assert_eq!(phenom.row_for(CoreField::YearModel), None);
    }

    #[test]
    fn json_roundtrip_preserves_registry() {
        let (registry, _) = ConfigRegistry::from_json_str(CONFIGS).unwrap();
        let json = registry.to_json_pretty().unwrap();
        let (reloaded, rejected) = ConfigRegistry::from_json_str(&json).unwrap();
        assert!(rejected.is_empty());
        assert_eq!(reloaded, registry);
    }
}
