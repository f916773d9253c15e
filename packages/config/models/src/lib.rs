#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Aircraft model configuration types.
//!
//! A [`ModelConfiguration`] describes where each extracted value lives in a
//! model's comparison spreadsheet: a row per [`CoreField`], a row per
//! upgrade flag, and an optional avionics block whose formulas are copied
//! into every newly inserted broker column.
//!
//! The layout constants in this crate are the contract every configured
//! spreadsheet follows: serial numbers in row 1, labels in column 12 (`L`),
//! and broker column pairs (data, Y/N) starting at column 16 (`P`).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Row holding each broker column's serial number. Only the column
/// insertion step may write here.
pub const SERIAL_ROW: u32 = 1;

/// Column holding the human-readable row labels.
pub const LABEL_COLUMN: u32 = 12;

/// First broker data column.
pub const FIRST_BROKER_COLUMN: u32 = 16;

/// Distance between consecutive broker data columns (data + Y/N).
pub const BROKER_COLUMN_STEP: u32 = 2;

/// Broker-name row used when no label mentions "broker".
pub const DEFAULT_BROKER_ROW: u32 = 5;

/// Fixed aircraft attributes extracted from a listing.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CoreField {
    /// Year of manufacture.
    YearModel,
    /// Airframe total time since new, in hours.
    TotalHours,
    /// Engine time since overhaul, in hours.
    EngineOverhaul,
    /// Engine maintenance program (JSSI, MSP GOLD, ...).
    EngineProgram,
    /// APU maintenance program. Always populated when configured.
    ApuProgram,
    /// Avionics model summary. Always populated when configured.
    AvionicsSection,
    /// Passenger seat count, optionally with a lavatory suffix.
    NumberOfSeats,
    /// Comma-joined seating layout abbreviations.
    SeatConfiguration,
    /// Year the exterior was last painted.
    PaintExteriorYear,
    /// Year the interior was last refurbished.
    InteriorYear,
}

impl CoreField {
    /// Returns the human-readable label for this field.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::YearModel => "Year Model",
            Self::TotalHours => "Total Hours Since New",
            Self::EngineOverhaul => "Engine Time Since Overhaul",
            Self::EngineProgram => "Engine Program",
            Self::ApuProgram => "APU Program",
            Self::AvionicsSection => "Avionics Section",
            Self::NumberOfSeats => "Number of Seats",
            Self::SeatConfiguration => "Seat Configuration",
            Self::PaintExteriorYear => "Paint Exterior Year",
            Self::InteriorYear => "Interior Year",
        }
    }

    /// Whether a model configuration may leave this field unmapped without
    /// being considered incomplete.
    #[must_use]
    pub const fn is_optional(self) -> bool {
        matches!(self, Self::ApuProgram | Self::AvionicsSection)
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::YearModel,
            Self::TotalHours,
            Self::EngineOverhaul,
            Self::EngineProgram,
            Self::ApuProgram,
            Self::AvionicsSection,
            Self::NumberOfSeats,
            Self::SeatConfiguration,
            Self::PaintExteriorYear,
            Self::InteriorYear,
        ]
    }
}

/// A boolean upgrade detected by keyword presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeConfig {
    /// Lowercase substrings or regex fragments, tried in order.
    pub keywords: Vec<String>,
    /// Row receiving the Y/N flag (written to the broker's Y/N column).
    pub row: u32,
}

/// Contiguous block of rows whose template formulas are copied into every
/// newly inserted broker column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvionicsSection {
    /// First row of the block (inclusive).
    pub start: u32,
    /// Last row of the block (inclusive).
    pub end: u32,
}

impl AvionicsSection {
    /// Returns `true` if `row` lies inside the block.
    #[must_use]
    pub const fn contains(self, row: u32) -> bool {
        row >= self.start && row <= self.end
    }
}

/// Spreadsheet layout for one aircraft model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfiguration {
    /// Row for each configured core field.
    pub row_mappings: BTreeMap<CoreField, u32>,
    /// Upgrade flags keyed by upgrade name (e.g. `"WIFI"`, `"TCAS_7.1"`).
    #[serde(default)]
    pub upgrades: BTreeMap<String, UpgradeConfig>,
    /// Optional avionics block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avionics_section: Option<AvionicsSection>,
}

impl ModelConfiguration {
    /// Returns the row mapped to `field`, if configured.
    #[must_use]
    pub fn row_for(&self, field: CoreField) -> Option<u32> {
        self.row_mappings.get(&field).copied()
    }

    /// Returns `true` if `field` has a row mapping.
    #[must_use]
    pub fn maps(&self, field: CoreField) -> bool {
        self.row_mappings.contains_key(&field)
    }

    /// Rows written by core field mappings.
    #[must_use]
    pub fn data_rows(&self) -> BTreeSet<u32> {
        self.row_mappings.values().copied().collect()
    }

    /// Rows written by upgrade flags.
    #[must_use]
    pub fn upgrade_rows(&self) -> BTreeSet<u32> {
        self.upgrades.values().map(|u| u.row).collect()
    }

    /// Returns the name of the upgrade configured on `row`, if any.
    #[must_use]
    pub fn upgrade_on_row(&self, row: u32) -> Option<&str> {
        self.upgrades
            .iter()
            .find(|(_, u)| u.row == row)
            .map(|(name, _)| name.as_str())
    }

    /// Checks structural constraints that deserialization alone cannot
    /// express.
    ///
    /// Row-1 mappings are deliberately accepted here: they are rejected
    /// per field at write time so the rest of the configuration stays
    /// usable.
    ///
    /// # Errors
    ///
    /// Returns an error if any row is 0, if an upgrade has no keywords, or
    /// if the avionics block is inverted.
    pub fn validate(&self) -> Result<(), InvalidConfigurationError> {
        if let Some((field, _)) = self.row_mappings.iter().find(|(_, row)| **row == 0) {
            return Err(InvalidConfigurationError::new(format!(
                "{field} is mapped to row 0 (rows are 1-based)"
            )));
        }
        for (name, upgrade) in &self.upgrades {
            if upgrade.row == 0 {
                return Err(InvalidConfigurationError::new(format!(
                    "upgrade {name} is mapped to row 0 (rows are 1-based)"
                )));
            }
            if upgrade.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(InvalidConfigurationError::new(format!(
                    "upgrade {name} has no keywords"
                )));
            }
        }
        if let Some(section) = self.avionics_section
            && (section.start == 0 || section.start > section.end)
        {
            return Err(InvalidConfigurationError::new(format!(
                "avionics section {}..={} is not a valid row range",
                section.start, section.end
            )));
        }
        Ok(())
    }
}

/// Error returned when a [`ModelConfiguration`] violates a structural
/// constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidConfigurationError {
    /// Why the configuration was rejected.
    pub reason: String,
}

impl InvalidConfigurationError {
    fn new(reason: String) -> Self {
        Self { reason }
    }
}

impl std::fmt::Display for InvalidConfigurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid configuration: {}", self.reason)
    }
}

impl std::error::Error for InvalidConfigurationError {}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn sample() -> ModelConfiguration {
        serde_json::from_str(
            r#"{
                "row_mappings": {"year_model": 3, "total_hours": 4},
                "upgrades": {"WIFI": {"keywords": ["wifi", "gogo"], "row": 40}},
                "avionics_section": {"start": 30, "end": 35}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn core_field_names_are_snake_case() {
        for field in CoreField::all() {
            let name = field.to_string();
            assert_eq!(CoreField::from_str(&name).unwrap(), *field);
            assert_eq!(name, name.to_lowercase());
        }
        assert_eq!(CoreField::PaintExteriorYear.as_ref(), "paint_exterior_year");
    }

    #[test]
    fn deserializes_full_configuration() {
        let config = sample();
        assert_eq!(config.row_for(CoreField::YearModel), Some(3));
        assert!(!config.maps(CoreField::ApuProgram));
        assert_eq!(config.upgrade_on_row(40), Some("WIFI"));
        assert!(config.avionics_section.unwrap().contains(35));
        assert!(!config.avionics_section.unwrap().contains(36));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_row_mappings_fails_to_deserialize() {
        let result: Result<ModelConfiguration, _> =
            serde_json::from_str(r#"{"upgrades": {}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn row_one_mapping_is_structurally_valid() {
        let mut config = sample();
        config.row_mappings.insert(CoreField::YearModel, SERIAL_ROW);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_row_zero_and_inverted_avionics() {
        let mut config = sample();
        config.row_mappings.insert(CoreField::TotalHours, 0);
        assert!(config.validate().is_err());

        let mut config = sample();
        config.avionics_section = Some(AvionicsSection { start: 40, end: 30 });
        assert!(config.validate().is_err());
    }

    #[test]
    fn data_and_upgrade_rows() {
        let config = sample();
        assert_eq!(config.data_rows().into_iter().collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(config.upgrade_rows().into_iter().collect::<Vec<_>>(), vec![40]);
    }
}
