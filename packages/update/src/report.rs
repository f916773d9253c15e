//! Safe-mode update plans.
//!
//! An [`UpdatePlan`] lists the cell writes the mutator would make for a
//! record, without touching the workbook, so the operator can apply them
//! by hand. Plans render as JSON, CSV, or a plain-text instruction sheet.

use std::fmt::Write as _;

use broker_sheet_config_models::{ModelConfiguration, SERIAL_ROW};
use broker_sheet_extract_models::{ExtractedRecord, FieldValue};
use broker_sheet_workbook::{cell_reference, column_letters};
use serde::Serialize;
use strum_macros::{AsRefStr, Display};

use crate::UpdateError;
use crate::locate::BrokerColumnInfo;

/// Kind of a planned cell write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
pub enum EntryKind {
    /// A core field value in the data column.
    #[serde(rename = "Core Field")]
    #[strum(serialize = "Core Field")]
    CoreField,
    /// A Y/N flag in the flag column.
    #[serde(rename = "Upgrade")]
    #[strum(serialize = "Upgrade")]
    Upgrade,
}

/// One planned cell write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    /// Core field or upgrade.
    pub kind: EntryKind,
    /// Field or upgrade name.
    pub name: String,
    /// 1-based row.
    pub row: u32,
    /// 1-based column.
    pub column: u32,
    /// A1-style reference.
    pub reference: String,
    /// Value to write.
    pub value: String,
}

/// Context of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanMetadata {
    /// Configured model name.
    pub aircraft_model: String,
    /// Sheet holding the target column.
    pub sheet: String,
    /// 1-based data column; flags go one column to the right.
    pub target_column: u32,
    /// Letters of `target_column`.
    pub target_column_letter: String,
    /// Broker the column belongs to.
    pub broker: String,
    /// Serial number of the listing.
    pub serial_number: String,
    /// UTC time the plan was built.
    pub generated_at: String,
}

/// Entry counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    /// Number of core field entries.
    pub core_field_updates: usize,
    /// Number of upgrade flag entries.
    pub upgrade_updates: usize,
    /// Number of all entries.
    pub total_updates: usize,
}

/// The full set of planned writes for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdatePlan {
    /// Where and for whom the plan applies.
    pub metadata: PlanMetadata,
    /// Core field entries in configuration order, then upgrade entries.
    pub entries: Vec<PlanEntry>,
    /// Entry counts.
    pub summary: PlanSummary,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    #[serde(rename = "Type")]
    kind: EntryKind,
    #[serde(rename = "Field/Upgrade")]
    name: &'a str,
    #[serde(rename = "Excel Reference")]
    reference: &'a str,
    #[serde(rename = "Row")]
    row: u32,
    #[serde(rename = "Column")]
    column: u32,
    #[serde(rename = "Value")]
    value: &'a str,
}

fn is_blank(value: &FieldValue) -> bool {
    matches!(value, FieldValue::Text(s) if s.trim().is_empty())
}

impl UpdatePlan {
    /// Plans the writes for `record` at `placement`. Rows mapped to the
    /// serial row are left out.
    #[must_use]
    pub fn build(
        record: &ExtractedRecord,
        config: &ModelConfiguration,
        placement: &BrokerColumnInfo,
        aircraft_model: &str,
        broker: &str,
        serial: &str,
    ) -> Self {
        let column = placement.column;
        let mut entries = Vec::new();

        for (field, row) in &config.row_mappings {
            if *row == SERIAL_ROW {
                continue;
            }
            let Some(value) = record.get(*field).filter(|v| !is_blank(v)) else {
                continue;
            };
            entries.push(PlanEntry {
                kind: EntryKind::CoreField,
                name: field.to_string(),
                row: *row,
                column,
                reference: cell_reference(column, *row),
                value: value.to_string(),
            });
        }

        for (name, upgrade) in &config.upgrades {
            if upgrade.row == SERIAL_ROW {
                continue;
            }
            let Some(flag) = record.upgrade(name) else {
                continue;
            };
            entries.push(PlanEntry {
                kind: EntryKind::Upgrade,
                name: name.clone(),
                row: upgrade.row,
                column: column + 1,
                reference: cell_reference(column + 1, upgrade.row),
                value: flag.to_string(),
            });
        }

        let core_field_updates = entries
            .iter()
            .filter(|e| e.kind == EntryKind::CoreField)
            .count();
        let summary = PlanSummary {
            core_field_updates,
            upgrade_updates: entries.len() - core_field_updates,
            total_updates: entries.len(),
        };

        Self {
            metadata: PlanMetadata {
                aircraft_model: aircraft_model.to_owned(),
                sheet: placement.sheet.clone(),
                target_column: column,
                target_column_letter: column_letters(column),
                broker: broker.to_owned(),
                serial_number: serial.to_owned(),
                generated_at: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            },
            entries,
            summary,
        }
    }

    /// `"<name> - <reference>: <value>"` per entry.
    #[must_use]
    pub fn descriptions(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| format!("{} - {}: {}", e.name, e.reference, e.value))
            .collect()
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, UpdateError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// One CSV row per entry, with a header row.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Csv`] if a row cannot be written.
    pub fn to_csv(&self) -> Result<String, UpdateError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for entry in &self.entries {
            writer.serialize(CsvRow {
                kind: entry.kind,
                name: &entry.name,
                reference: &entry.reference,
                row: entry.row,
                column: entry.column,
                value: &entry.value,
            })?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| UpdateError::Io(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| UpdateError::Report(e.to_string()))
    }

    /// Plain-text manual update instructions.
    #[must_use]
    pub fn to_text(&self) -> String {
        let meta = &self.metadata;
        let mut text = String::new();

        let _ = writeln!(text, "AIRCRAFT DATA EXTRACTION REPORT");
        let _ = writeln!(text, "===============================");
        let _ = writeln!(text);
        let _ = writeln!(text, "Aircraft Model: {}", meta.aircraft_model);
        let _ = writeln!(
            text,
            "Target Column: {} ({})",
            meta.target_column, meta.target_column_letter
        );
        let _ = writeln!(text, "Broker: {}", meta.broker);
        let _ = writeln!(text, "Serial Number: {}", meta.serial_number);
        let _ = writeln!(text, "Generated: {}", meta.generated_at);
        let _ = writeln!(text);
        let _ = writeln!(text, "SUMMARY");
        let _ = writeln!(text, "-------");
        let _ = writeln!(text, "Core Field Updates: {}", self.summary.core_field_updates);
        let _ = writeln!(text, "Upgrade Updates: {}", self.summary.upgrade_updates);
        let _ = writeln!(text, "Total Updates: {}", self.summary.total_updates);

        for (kind, heading) in [
            (EntryKind::CoreField, "CORE FIELD UPDATES"),
            (EntryKind::Upgrade, "UPGRADE UPDATES"),
        ] {
            let _ = writeln!(text);
            let _ = writeln!(text, "{heading}");
            let _ = writeln!(text, "{}", "-".repeat(heading.len()));
            for entry in self.entries.iter().filter(|e| e.kind == kind) {
                let _ = writeln!(
                    text,
                    "- {}: Cell {} = {}",
                    entry.name, entry.reference, entry.value
                );
            }
        }

        let _ = writeln!(text);
        let _ = writeln!(text, "MANUAL UPDATE INSTRUCTIONS");
        let _ = writeln!(text, "--------------------------");
        let _ = writeln!(text, "1. Open the {} sheet", meta.sheet);
        let _ = writeln!(
            text,
            "2. Go to column {} (the {} column)",
            meta.target_column_letter, meta.broker
        );
        let _ = writeln!(text, "3. Enter each value listed above in its cell");
        let _ = writeln!(
            text,
            "4. Enter upgrade flags in column {} (Y/N column)",
            column_letters(meta.target_column + 1)
        );

        text
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use broker_sheet_config_models::{CoreField, UpgradeConfig};
    use broker_sheet_extract_models::UpgradeFlag;

    use super::*;
    use crate::locate::PlacementMode;

    fn plan() -> UpdatePlan {
        let mut upgrades = BTreeMap::new();
        upgrades.insert(
            "WIFI".to_owned(),
            UpgradeConfig {
                keywords: vec!["wifi".to_owned()],
                row: 40,
            },
        );
        let config = ModelConfiguration {
            row_mappings: [
                (CoreField::YearModel, 3),
                (CoreField::TotalHours, 4),
                (CoreField::EngineProgram, SERIAL_ROW),
            ]
            .into_iter()
            .collect(),
            upgrades,
            avionics_section: None,
        };
        let mut record = ExtractedRecord {
            year_model: Some(2015),
            total_hours: Some(1234),
            engine_program: Some("JSSI".to_owned()),
            ..ExtractedRecord::default()
        };
        record.upgrades.insert("WIFI".to_owned(), UpgradeFlag::Yes);

        let placement = BrokerColumnInfo {
            column: 26,
            sheet: "EXCEL FOR SALE".to_owned(),
            mode: PlacementMode::Update,
            serial_positions: vec![(26, 5123)],
            matched_serial: Some("560-5123".to_owned()),
        };
        UpdatePlan::build(&record, &config, &placement, "Citation Excel", "Jet Co", "560-5123")
    }

    #[test]
    fn plans_entries_with_references() {
        let plan = plan();
        assert_eq!(plan.metadata.target_column_letter, "Z");
        assert_eq!(plan.summary.core_field_updates, 2);
        assert_eq!(plan.summary.upgrade_updates, 1);
        assert_eq!(
            plan.descriptions(),
            vec!["year_model - Z3: 2015", "total_hours - Z4: 1234", "WIFI - AA40: Y"]
        );
    }

    #[test]
    fn serial_row_mappings_are_excluded() {
        let plan = plan();
        assert!(plan.entries.iter().all(|e| e.row != SERIAL_ROW));
        assert!(plan.entries.iter().all(|e| e.name != "engine_program"));
    }

    #[test]
    fn csv_has_header_and_one_row_per_entry() {
        let csv = plan().to_csv().unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Type,Field/Upgrade,Excel Reference,Row,Column,Value");
        assert_eq!(lines[1], "Core Field,year_model,Z3,3,26,2015");
        assert_eq!(lines[3], "Upgrade,WIFI,AA40,40,27,Y");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn json_carries_metadata_and_summary() {
        let json: serde_json::Value = serde_json::from_str(&plan().to_json().unwrap()).unwrap();
        assert_eq!(json["metadata"]["serial_number"], "560-5123");
        assert_eq!(json["summary"]["total_updates"], 3);
        assert_eq!(json["entries"][2]["kind"], "Upgrade");
    }

    #[test]
    fn text_lists_cells_and_flag_column() {
        let text = plan().to_text();
        assert!(text.contains("Target Column: 26 (Z)"));
        assert!(text.contains("- total_hours: Cell Z4 = 1234"));
        assert!(text.contains("column AA (Y/N column)"));
    }
}
