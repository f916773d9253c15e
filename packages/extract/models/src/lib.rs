#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Typed record produced by field extraction.
//!
//! An [`ExtractedRecord`] holds one optional value per
//! [`CoreField`](broker_sheet_config_models::CoreField) plus a Y/N flag per
//! configured upgrade. A field is either present with a best-guess value or
//! absent; absence always means "no rule matched", never "errored". Every
//! found, defaulted, or missing field is also recorded as an
//! [`ExtractionNote`] so an operator can audit the automated guesses.

use std::collections::BTreeMap;

use broker_sheet_config_models::CoreField;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Prefix used for upgrade keys in the flat record rendering.
pub const UPGRADE_KEY_PREFIX: &str = "upgrade_";

/// A single extracted value, as written into a spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Numeric value (years, hours).
    Integer(u32),
    /// Text value (programs, seat descriptions).
    Text(String),
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Integer(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

/// Y/N upgrade flag.
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
pub enum UpgradeFlag {
    /// The upgrade was detected.
    #[serde(rename = "Y")]
    #[strum(serialize = "Y")]
    Yes,
    /// The upgrade was not detected.
    #[serde(rename = "N")]
    #[strum(serialize = "N")]
    No,
}

impl From<bool> for UpgradeFlag {
    fn from(found: bool) -> Self {
        if found { Self::Yes } else { Self::No }
    }
}

/// How a field's value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NoteKind {
    /// A rule matched.
    Found,
    /// No rule matched and a documented fallback was applied.
    Defaulted,
    /// No rule matched and the field was left absent.
    NotFound,
}

/// Audit trail entry for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionNote {
    /// Field or upgrade key the note is about.
    pub field: String,
    /// Outcome.
    pub kind: NoteKind,
    /// Which rule matched, or which fallback was used.
    pub detail: String,
}

impl std::fmt::Display for ExtractionNote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.field, self.kind, self.detail)
    }
}

/// Fields extracted from one listing for one aircraft model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    /// Serial number found in the text (not a configured row).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    /// Four-digit model year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_model: Option<u32>,
    /// Airframe total time in hours.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_hours: Option<u32>,
    /// Engine hours since overhaul; defaults to total hours.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_overhaul: Option<u32>,
    /// Engine maintenance program.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_program: Option<String>,
    /// APU maintenance program, or `NONE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apu_program: Option<String>,
    /// Connectivity/avionics model, or `NONE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avionics_section: Option<String>,
    /// Seat count text, e.g. `8 SEATS + BLTD LAV`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_seats: Option<String>,
    /// Comma-joined configuration tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat_configuration: Option<String>,
    /// Year of the last exterior paint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paint_exterior_year: Option<u32>,
    /// Year of the last interior refurbishment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interior_year: Option<u32>,
    /// One flag per configured upgrade.
    #[serde(default)]
    pub upgrades: BTreeMap<String, UpgradeFlag>,
    /// Audit notes in extraction order.
    #[serde(default)]
    pub notes: Vec<ExtractionNote>,
}

impl ExtractedRecord {
    /// Returns the value extracted for `field`, if any.
    #[must_use]
    pub fn get(&self, field: CoreField) -> Option<FieldValue> {
        match field {
            CoreField::YearModel => self.year_model.map(FieldValue::from),
            CoreField::TotalHours => self.total_hours.map(FieldValue::from),
            CoreField::EngineOverhaul => self.engine_overhaul.map(FieldValue::from),
            CoreField::EngineProgram => self.engine_program.as_deref().map(FieldValue::from),
            CoreField::ApuProgram => self.apu_program.as_deref().map(FieldValue::from),
            CoreField::AvionicsSection => self.avionics_section.as_deref().map(FieldValue::from),
            CoreField::NumberOfSeats => self.number_of_seats.as_deref().map(FieldValue::from),
            CoreField::SeatConfiguration => {
                self.seat_configuration.as_deref().map(FieldValue::from)
            }
            CoreField::PaintExteriorYear => self.paint_exterior_year.map(FieldValue::from),
            CoreField::InteriorYear => self.interior_year.map(FieldValue::from),
        }
    }

    /// Returns the flag recorded for the upgrade named `name`.
    #[must_use]
    pub fn upgrade(&self, name: &str) -> Option<UpgradeFlag> {
        self.upgrades.get(name).copied()
    }

    /// Core fields that carry a value.
    #[must_use]
    pub fn present_fields(&self) -> Vec<CoreField> {
        CoreField::all()
            .iter()
            .copied()
            .filter(|f| self.get(*f).is_some())
            .collect()
    }

    /// Notes for fields that were defaulted or not found.
    pub fn unresolved_notes(&self) -> impl Iterator<Item = &ExtractionNote> {
        self.notes.iter().filter(|n| n.kind != NoteKind::Found)
    }

    /// Appends an audit note.
    pub fn note(&mut self, field: impl Into<String>, kind: NoteKind, detail: impl Into<String>) {
        self.notes.push(ExtractionNote {
            field: field.into(),
            kind,
            detail: detail.into(),
        });
    }

    /// Renders the record as a flat key/value map: core fields by name and
    /// upgrades as `upgrade_<name>` → `"Y"`/`"N"`.
    #[must_use]
    pub fn to_flat_map(&self) -> BTreeMap<String, FieldValue> {
        let mut map = BTreeMap::new();
        for field in CoreField::all() {
            if let Some(value) = self.get(*field) {
                map.insert(field.to_string(), value);
            }
        }
        for (name, flag) in &self.upgrades {
            map.insert(upgrade_key(name), FieldValue::Text(flag.to_string()));
        }
        map
    }
}

/// Returns the flat-map key for the upgrade named `name`.
#[must_use]
pub fn upgrade_key(name: &str) -> String {
    format!("{UPGRADE_KEY_PREFIX}{name}")
}
