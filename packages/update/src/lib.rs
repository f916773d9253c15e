#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Writes extracted listings into broker comparison workbooks.
//!
//! [`update_workbook`] is the whole operation on one workbook: the input
//! bytes are kept as the backup, the serial is placed with
//! [`locate::locate_in_workbook`], and the record is written either into
//! the existing column or into a freshly inserted one. Any failure returns
//! an error and no output bytes; the input remains the source of truth.
//!
//! [`report::UpdatePlan`] describes the same writes without performing
//! them, for operators who prefer to apply changes by hand.

pub mod locate;
pub mod mutate;
pub mod report;

use broker_sheet_config_models::ModelConfiguration;
use broker_sheet_extract_models::ExtractedRecord;
use broker_sheet_workbook::{Workbook, WorkbookError};

pub use locate::{BrokerColumnInfo, PlacementMode, locate_column, locate_in_workbook};
pub use mutate::{Mutation, ProtectedRowViolation, insert_broker_column, write_record};
pub use report::UpdatePlan;

/// Errors raised while updating a workbook.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    /// The workbook could not be read, saved, or navigated.
    #[error("Workbook error: {0}")]
    Workbook(#[from] WorkbookError),

    /// No serial number was supplied or extracted.
    #[error("No serial number available for the listing")]
    MissingSerial,

    /// A CSV report could not be written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A JSON report could not be written.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A report could not be rendered.
    #[error("Report error: {0}")]
    Report(String),
}

/// One listing to write into a workbook.
#[derive(Debug, Clone, Copy)]
pub struct UpdateRequest<'a> {
    /// Serial number heading the broker column.
    pub serial: &'a str,
    /// Broker name written into a newly inserted column.
    pub broker: &'a str,
    /// Sheet receiving new columns; the first sheet when `None`.
    pub sheet: Option<&'a str>,
    /// Extracted values.
    pub record: &'a ExtractedRecord,
    /// Row layout of the aircraft model.
    pub config: &'a ModelConfiguration,
}

/// Result of a successful update.
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    /// The mutated workbook.
    pub updated: Vec<u8>,
    /// Byte-identical copy of the input workbook.
    pub backup: Vec<u8>,
    /// Where the listing went.
    pub placement: BrokerColumnInfo,
    /// `"<field> - Row <n>: <value>"` for every cell written.
    pub updates: Vec<String>,
    /// Fields skipped because they target the serial row.
    pub violations: Vec<ProtectedRowViolation>,
}

/// Places and writes one listing into the xlsx workbook `bytes`.
///
/// # Errors
///
/// * [`UpdateError::MissingSerial`] if `request.serial` is blank
/// * [`UpdateError::Workbook`] if the bytes cannot be parsed, the insert
///   sheet does not exist, or the mutated workbook cannot be saved
pub fn update_workbook(bytes: &[u8], request: &UpdateRequest<'_>) -> Result<UpdateOutcome, UpdateError> {
    let serial = request.serial.trim();
    if serial.is_empty() {
        return Err(UpdateError::MissingSerial);
    }

    let backup = bytes.to_vec();
    let mut workbook = Workbook::from_bytes(bytes)?;
    let placement = locate_in_workbook(&workbook, serial, request.sheet)?;
    let sheet = workbook.sheet_mut(&placement.sheet)?;

    let mutation = match placement.mode {
        PlacementMode::Update => {
            write_record(sheet, placement.column, request.record, request.config)
        }
        PlacementMode::Insert => insert_broker_column(
            sheet,
            placement.column,
            serial,
            request.broker,
            request.record,
            request.config,
        ),
    };

    let updated = workbook.to_bytes()?;
    log::info!(
        "{} {} cells in column {} of {}",
        placement.mode,
        mutation.updates.len(),
        placement.column,
        placement.sheet
    );

    Ok(UpdateOutcome {
        updated,
        backup,
        placement,
        updates: mutation.updates,
        violations: mutation.violations,
    })
}

#[cfg(test)]
mod tests {
    use broker_sheet_config_models::{CoreField, SERIAL_ROW};
    use broker_sheet_workbook::{Cell, Grid};

    use super::*;

    fn config() -> ModelConfiguration {
        ModelConfiguration {
            row_mappings: [(CoreField::YearModel, 3), (CoreField::TotalHours, 4)]
                .into_iter()
                .collect(),
            upgrades: std::collections::BTreeMap::new(),
            avionics_section: None,
        }
    }

    fn record(year: u32) -> ExtractedRecord {
        ExtractedRecord {
            year_model: Some(year),
            total_hours: Some(1234),
            ..ExtractedRecord::default()
        }
    }

    fn empty_workbook() -> Vec<u8> {
        Workbook::new().to_bytes().unwrap()
    }

    fn apply(bytes: &[u8], serial: &str, record: &ExtractedRecord) -> UpdateOutcome {
        let config = config();
        let request = UpdateRequest {
            serial,
            broker: "jet co",
            sheet: None,
            record,
            config: &config,
        };
        update_workbook(bytes, &request).unwrap()
    }

    fn header(bytes: &[u8], column: u32) -> Option<String> {
        let workbook = Workbook::from_bytes(bytes).unwrap();
        workbook.sheet("Sheet1").unwrap().text(column, SERIAL_ROW)
    }

    #[test]
    fn backup_is_the_input() {
        let input = empty_workbook();
        let outcome = apply(&input, "0050", &record(2015));
        assert_eq!(outcome.backup, input);
        assert_ne!(outcome.updated, input);
    }

    #[test]
    fn inserts_then_updates_the_same_serial() {
        let first = apply(&empty_workbook(), "0050", &record(2015));
        assert_eq!(first.placement.mode, PlacementMode::Insert);
        assert_eq!(first.placement.column, 16);
        assert_eq!(first.updates[0], "serial_number - Row 1: 0050");
        assert!(first.updates.contains(&"year_model - Row 3: 2015".to_owned()));

        let second = apply(&first.updated, "0050", &record(2016));
        assert_eq!(second.placement.mode, PlacementMode::Update);
        assert_eq!(second.placement.column, 16);

        let workbook = Workbook::from_bytes(&second.updated).unwrap();
        let sheet = workbook.sheet("Sheet1").unwrap();
        assert_eq!(sheet.cell(16, 3), Some(Cell::Number(2016.0)));
        assert_eq!(sheet.text(16, 5).as_deref(), Some("JET CO"));
    }

    #[test]
    fn serial_order_is_independent_of_insertion_order() {
        let low_first = apply(&empty_workbook(), "0010", &record(2015));
        let low_first = apply(&low_first.updated, "0090", &record(2015));

        let high_first = apply(&empty_workbook(), "0090", &record(2015));
        let high_first = apply(&high_first.updated, "0010", &record(2015));

        for bytes in [&low_first.updated, &high_first.updated] {
            assert_eq!(header(bytes, 16).as_deref(), Some("0010"));
            assert_eq!(header(bytes, 18).as_deref(), Some("0090"));
        }
    }

    /// Broker 0010 in P with `P4*2` shared across P10:R10, as spreadsheet
    /// applications save a formula filled to the right.
    fn shared_formula_workbook() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.sheet_mut("Sheet1").unwrap();
        Grid::set_cell(sheet, 16, SERIAL_ROW, Cell::Text("0010".to_owned()));
        Grid::set_cell(sheet, 16, 4, Cell::Number(100.0));
        Grid::set_cell(sheet, 18, 4, Cell::Number(300.0));

        let anchor = sheet.get_cell_value_mut((16, 10));
        anchor.set_value_number(200);
        anchor.set_formula("P4*2");
        anchor.set_formula_attributes(vec![
            ("t".to_owned(), "shared".to_owned()),
            ("ref".to_owned(), "P10:R10".to_owned()),
            ("si".to_owned(), "0".to_owned()),
        ]);
        let member = sheet.get_cell_value_mut((18, 10));
        member.set_value_number(600);
        member.set_formula_attributes(vec![
            ("t".to_owned(), "shared".to_owned()),
            ("si".to_owned(), "0".to_owned()),
        ]);
        workbook.to_bytes().unwrap()
    }

    #[test]
    fn shifted_shared_formula_stays_a_formula() {
        let outcome = apply(&shared_formula_workbook(), "0050", &record(2015));
        assert_eq!(outcome.placement.mode, PlacementMode::Insert);
        assert_eq!(outcome.placement.column, 18);

        let workbook = Workbook::from_bytes(&outcome.updated).unwrap();
        let sheet = workbook.sheet("Sheet1").unwrap();
        assert_eq!(sheet.cell(20, 10), Some(Cell::Formula("=T4*2".to_owned())));
        assert_eq!(sheet.cell(20, 4), Some(Cell::Number(300.0)));
        assert_eq!(sheet.cell(16, 10), Some(Cell::Formula("=P4*2".to_owned())));
        assert_eq!(sheet.cell(18, 10), Some(Cell::Formula("=R4*2".to_owned())));
    }

    #[test]
    fn blank_serial_is_rejected() {
        let config = config();
        let record = record(2015);
        let request = UpdateRequest {
            serial: "  ",
            broker: "jet co",
            sheet: None,
            record: &record,
            config: &config,
        };
        assert!(matches!(
            update_workbook(&empty_workbook(), &request),
            Err(UpdateError::MissingSerial)
        ));
    }

    #[test]
    fn unreadable_bytes_produce_no_output() {
        let config = config();
        let record = record(2015);
        let request = UpdateRequest {
            serial: "0050",
            broker: "jet co",
            sheet: None,
            record: &record,
            config: &config,
        };
        assert!(matches!(
            update_workbook(b"not a workbook", &request),
            Err(UpdateError::Workbook(WorkbookError::Read(_)))
        ));
    }
}
