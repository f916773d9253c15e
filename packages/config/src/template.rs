//! Configuration discovery from a model's template spreadsheet.
//!
//! Template sheets carry a human-readable label for every row in column
//! `L`. Matching those labels against known phrasings gives a first guess
//! at each core field's row and at the upgrade rows; the operator then
//! confirms or corrects the guess before it is saved.

use std::collections::BTreeMap;

use broker_sheet_config_models::{
    AvionicsSection, CoreField, LABEL_COLUMN, ModelConfiguration, SERIAL_ROW, UpgradeConfig,
};
use broker_sheet_workbook::{Grid, Workbook};
use serde::Serialize;

use crate::ConfigError;

/// Only the first rows of a template carry labels worth scanning.
const MAX_LABEL_ROW: u32 = 100;

/// Default rows for fields commonly missing a recognizable label.
const DEFAULT_ROWS: &[(CoreField, u32)] = &[
    (CoreField::PaintExteriorYear, 60),
    (CoreField::InteriorYear, 61),
];

/// Uppercase label phrasings per core field.
const FIELD_LABELS: &[(CoreField, &[&str])] = &[
    (
        CoreField::YearModel,
        &["YEAR MODEL", "YEAR & MODEL", "MODEL YEAR"],
    ),
    (
        CoreField::TotalHours,
        &["TOTAL TIME SINCE NEW", "TOTAL HOURS", "HOURS SINCE NEW", "TTSN"],
    ),
    (
        CoreField::EngineOverhaul,
        &["ENGINE TIME SINCE OVERHAUL", "ENGINE OVERHAUL", "TSOH"],
    ),
    (
        CoreField::EngineProgram,
        &["ENGINE PROGRAM", "ENGINE WARRANTY", "ENGINE PLAN"],
    ),
    (
        CoreField::ApuProgram,
        &["APU PROGRAM", "APU WARRANTY", "APU PLAN"],
    ),
    (
        CoreField::AvionicsSection,
        &["AVIONICS", "AVIONICS UPGRADES", "MISC AVIONICS"],
    ),
    (
        CoreField::NumberOfSeats,
        &["NUMBER OF SEATS", "SEATS", "SEATING"],
    ),
    (
        CoreField::SeatConfiguration,
        &["SEAT CONFIGURATION", "SEATING CONFIG", "INTERIOR CONFIG"],
    ),
    (
        CoreField::PaintExteriorYear,
        &["PAINT EXTERIOR", "EXTERIOR PAINT", "PAINT YEAR", "PAINT COMPLETED"],
    ),
    (
        CoreField::InteriorYear,
        &[
            "INTERIOR YEAR",
            "INTERIOR COMPLETED",
            "NEW INTERIOR",
            "INTERIOR REFURBISHMENT",
        ],
    ),
];

/// Uppercase label keywords that propose an upgrade row.
const UPGRADE_LABELS: &[&str] = &[
    "NXI",
    "G1000",
    "G3000",
    "WIFI",
    "TCAS",
    "WAAS",
    "FANS",
    "DUAL FMS",
    "HF",
    "AHRS",
    "FDR",
    "7.1 UPGRADE",
    "TCAS 7.1",
    "FLIGHT DATA RECORDER",
    "SYNTHETIC VISION",
    "SVT",
    "GOGO",
    "IRIDIUM",
    "CPDLC",
    "MTOW",
    "MZFW",
    "PREBUY INSPECTION",
    "PREBUY",
    "PRE-BUY",
    "INSPECTION",
];

/// A label row matched to a core field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedRow {
    /// 1-based row number.
    pub row: u32,
    /// The label text as written in the template.
    pub label: String,
}

/// A label row proposed as an upgrade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedUpgrade {
    /// 1-based row number.
    pub row: u32,
    /// The label text as written in the template.
    pub label: String,
    /// Lowercase keywords proposed for detection.
    pub keywords: Vec<String>,
}

/// Everything detected in a template sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateAnalysis {
    /// Model name derived from the sheet name.
    pub aircraft_model: String,
    /// Sheet that was analyzed.
    pub sheet_name: String,
    /// First matching row per core field.
    pub fields: BTreeMap<CoreField, DetectedRow>,
    /// Proposed upgrades keyed by upgrade name.
    pub upgrades: BTreeMap<String, DetectedUpgrade>,
}

impl TemplateAnalysis {
    /// Required fields neither detected nor covered by a default row.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<CoreField> {
        CoreField::all()
            .iter()
            .copied()
            .filter(|f| !f.is_optional())
            .filter(|f| !self.fields.contains_key(f))
            .filter(|f| !DEFAULT_ROWS.iter().any(|(d, _)| d == f))
            .collect()
    }

    /// Builds a configuration from the detected rows.
    ///
    /// Undetected paint/interior rows fall back to their conventional
    /// defaults; other undetected fields are left unmapped rather than
    /// pointed at the protected serial row.
    #[must_use]
    pub fn to_configuration(
        &self,
        avionics_section: Option<AvionicsSection>,
    ) -> ModelConfiguration {
        let mut row_mappings: BTreeMap<CoreField, u32> = self
            .fields
            .iter()
            .map(|(field, detected)| (*field, detected.row))
            .collect();
        for (field, row) in DEFAULT_ROWS {
            row_mappings.entry(*field).or_insert(*row);
        }

        let upgrades = self
            .upgrades
            .iter()
            .map(|(name, detected)| {
                (
                    name.clone(),
                    UpgradeConfig {
                        keywords: detected.keywords.clone(),
                        row: detected.row,
                    },
                )
            })
            .collect();

        ModelConfiguration {
            row_mappings,
            upgrades,
            avionics_section,
        }
    }
}

/// Analyzes the first sheet of `workbook`.
///
/// # Errors
///
/// Returns [`ConfigError::Workbook`] if the workbook has no sheets.
pub fn analyze_template(workbook: &Workbook) -> Result<TemplateAnalysis, ConfigError> {
    let sheet_name = workbook.first_sheet_name()?;
    let sheet = workbook.sheet(&sheet_name)?;
    Ok(analyze_sheet(sheet, &sheet_name))
}

/// Analyzes the label column of `grid`. The serial row is never a
/// candidate for a field or upgrade, whatever its label says.
#[must_use]
pub fn analyze_sheet<G: Grid>(grid: &G, sheet_name: &str) -> TemplateAnalysis {
    let mut fields = BTreeMap::new();
    let mut upgrades = BTreeMap::new();

    let last_row = grid.max_row().min(MAX_LABEL_ROW);
    for row in (SERIAL_ROW + 1)..=last_row {
        let Some(label) = grid.text(LABEL_COLUMN, row) else {
            continue;
        };
        let upper = label.to_uppercase();

        for (field, phrasings) in FIELD_LABELS {
            if phrasings.iter().any(|p| upper.contains(p)) && !fields.contains_key(field) {
                log::debug!("Template row {row} ({label}) → {field}");
                fields.insert(
                    *field,
                    DetectedRow {
                        row,
                        label: label.clone(),
                    },
                );
            }
        }

        for keyword in UPGRADE_LABELS {
            if upper.contains(keyword) {
                let name = keyword.replace(' ', "_");
                upgrades.entry(name).or_insert_with(|| {
                    log::debug!("Template row {row} ({label}) → upgrade {keyword}");
                    DetectedUpgrade {
                        row,
                        label: label.clone(),
                        keywords: vec![keyword.to_lowercase()],
                    }
                });
            }
        }
    }

    let analysis = TemplateAnalysis {
        aircraft_model: model_name_from_sheet(sheet_name),
        sheet_name: sheet_name.to_owned(),
        fields,
        upgrades,
    };

    log::info!(
        "Template {sheet_name}: detected {} field rows and {} upgrades",
        analysis.fields.len(),
        analysis.upgrades.len()
    );

    analysis
}

fn model_name_from_sheet(sheet_name: &str) -> String {
    let trimmed = sheet_name.trim();
    trimmed
        .strip_suffix("FOR SALE")
        .unwrap_or(trimmed)
        .trim()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use broker_sheet_workbook::MemoryGrid;

    use super::*;

    fn template() -> MemoryGrid {
        MemoryGrid::new()
            .with_text(LABEL_COLUMN, 3, "Year Model")
            .with_text(LABEL_COLUMN, 4, "Total Time Since New")
            .with_text(LABEL_COLUMN, 5, "Engine Time Since Overhaul (TSOH)")
            .with_text(LABEL_COLUMN, 6, "Engine Program")
            .with_text(LABEL_COLUMN, 8, "Number of Seats")
            .with_text(LABEL_COLUMN, 9, "Seat Configuration")
            .with_text(LABEL_COLUMN, 40, "WiFi")
            .with_text(LABEL_COLUMN, 41, "TCAS 7.1 Upgrade")
            .with_text(LABEL_COLUMN, 50, "Prebuy Inspection")
    }

    #[test]
    fn detects_field_rows() {
        let analysis = analyze_sheet(&template(), "CITATION EXCEL FOR SALE");
        assert_eq!(analysis.aircraft_model, "CITATION EXCEL");
        assert_eq!(analysis.fields[&CoreField::YearModel].row, 3);
        assert_eq!(analysis.fields[&CoreField::TotalHours].row, 4);
        assert_eq!(analysis.fields[&CoreField::EngineOverhaul].row, 5);
        assert_eq!(analysis.fields[&CoreField::NumberOfSeats].row, 8);
        assert_eq!(analysis.fields[&CoreField::SeatConfiguration].row, 9);
    }

    #[test]
    fn serial_row_label_is_never_detected() {
        let grid = MemoryGrid::new()
            .with_text(LABEL_COLUMN, SERIAL_ROW, "Total Hours / WiFi")
            .with_text(LABEL_COLUMN, 7, "Total Hours");
        let analysis = analyze_sheet(&grid, "X");
        assert_eq!(analysis.fields[&CoreField::TotalHours].row, 7);
        assert!(!analysis.upgrades.contains_key("WIFI"));

        let config = analysis.to_configuration(None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn first_detection_per_field_wins() {
        let grid = template().with_text(LABEL_COLUMN, 70, "Total Hours (second)");
        let analysis = analyze_sheet(&grid, "X");
        assert_eq!(analysis.fields[&CoreField::TotalHours].row, 4);
    }

    #[test]
    fn proposes_upgrades_from_labels() {
        let analysis = analyze_sheet(&template(), "X");
        assert_eq!(analysis.upgrades["WIFI"].row, 40);
        assert_eq!(analysis.upgrades["WIFI"].keywords, vec!["wifi"]);
        assert_eq!(analysis.upgrades["TCAS"].row, 41);
        assert_eq!(analysis.upgrades["TCAS_7.1"].row, 41);
        assert_eq!(analysis.upgrades["PREBUY_INSPECTION"].row, 50);
        assert_eq!(analysis.upgrades["PREBUY_INSPECTION"].keywords, vec!["prebuy inspection"]);
    }

    #[test]
    fn configuration_uses_defaults_and_never_row_one() {
        let analysis = analyze_sheet(&template(), "X");
        let config = analysis.to_configuration(Some(AvionicsSection { start: 30, end: 35 }));

        assert_eq!(config.row_for(CoreField::PaintExteriorYear), Some(60));
        assert_eq!(config.row_for(CoreField::InteriorYear), Some(61));
        assert!(!config.maps(CoreField::ApuProgram));
        assert!(config.row_mappings.values().all(|row| *row != SERIAL_ROW));
        assert_eq!(config.upgrades["WIFI"].row, 40);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn reports_missing_required_fields() {
        let grid = MemoryGrid::new().with_text(LABEL_COLUMN, 3, "Year Model");
        let analysis = analyze_sheet(&grid, "X");
        let missing = analysis.missing_fields();
        assert!(missing.contains(&CoreField::TotalHours));
        assert!(!missing.contains(&CoreField::YearModel));
        assert!(!missing.contains(&CoreField::PaintExteriorYear));
        assert!(!missing.contains(&CoreField::ApuProgram));
    }

    #[test]
    fn analyzes_xlsx_first_sheet() {
        let mut workbook = Workbook::new();
        Grid::set_cell(
            workbook.sheet_mut("Sheet1").unwrap(),
            LABEL_COLUMN,
            4,
            broker_sheet_workbook::Cell::Text("TTSN".to_owned()),
        );
        let analysis = analyze_template(&workbook).unwrap();
        assert_eq!(analysis.sheet_name, "Sheet1");
        assert_eq!(analysis.fields[&CoreField::TotalHours].row, 4);
    }
}
