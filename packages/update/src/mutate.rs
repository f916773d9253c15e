//! Cell writes for one broker column.
//!
//! Row 1 holds the serial number and is written only when a new column is
//! inserted. A configuration mapping anything else to row 1 produces a
//! [`ProtectedRowViolation`] for that field while the rest of the record is
//! still written.

use broker_sheet_config_models::{
    BROKER_COLUMN_STEP, DEFAULT_BROKER_ROW, FIRST_BROKER_COLUMN, LABEL_COLUMN, ModelConfiguration,
    SERIAL_ROW,
};
use broker_sheet_extract_models::{ExtractedRecord, FieldValue, UpgradeFlag, upgrade_key};
use broker_sheet_workbook::{Cell, Grid};
use serde::Serialize;

/// A field mapped to the protected serial row; its write was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtectedRowViolation {
    /// Core field name or `upgrade_<name>`.
    pub field: String,
    /// The offending row (always the serial row).
    pub row: u32,
}

impl std::fmt::Display for ProtectedRowViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Refusing to write {} to row {} (serial number row)",
            self.field, self.row
        )
    }
}

/// What a mutation did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mutation {
    /// `"<field> - Row <n>: <value>"` for every cell written.
    pub updates: Vec<String>,
    /// Fields skipped because they target the serial row.
    pub violations: Vec<ProtectedRowViolation>,
}

impl Mutation {
    fn record(&mut self, field: &str, row: u32, value: impl std::fmt::Display) {
        self.updates.push(format!("{field} - Row {row}: {value}"));
    }

    fn protect(&mut self, field: String, row: u32) {
        let violation = ProtectedRowViolation { field, row };
        log::warn!("{violation}");
        self.violations.push(violation);
    }
}

fn cell_for(value: &FieldValue) -> Cell {
    match value {
        FieldValue::Integer(n) => Cell::Number(f64::from(*n)),
        FieldValue::Text(s) => Cell::Text(s.clone()),
    }
}

/// Writes the record's configured fields into `column` and its upgrade
/// flags into `column + 1`. Writing the same record twice leaves the same
/// cell values.
pub fn write_record<G: Grid>(
    grid: &mut G,
    column: u32,
    record: &ExtractedRecord,
    config: &ModelConfiguration,
) -> Mutation {
    let mut mutation = Mutation::default();

    for (field, row) in &config.row_mappings {
        let Some(value) = record.get(*field) else {
            continue;
        };
        let name = field.to_string();
        if *row == SERIAL_ROW {
            mutation.protect(name, *row);
            continue;
        }
        grid.set_cell(column, *row, cell_for(&value));
        mutation.record(&name, *row, &value);
    }

    for (name, upgrade) in &config.upgrades {
        let Some(flag) = record.upgrade(name) else {
            continue;
        };
        if upgrade.row == SERIAL_ROW {
            mutation.protect(upgrade_key(name), upgrade.row);
            continue;
        }
        grid.set_cell(column + 1, upgrade.row, Cell::Text(flag.to_string()));
        mutation.record(name, upgrade.row, flag);
    }

    log::info!(
        "Wrote {} cells to column {column} ({} protected-row skips)",
        mutation.updates.len(),
        mutation.violations.len()
    );
    mutation
}

/// Moves every column from `from` rightward by `by`, rightmost first,
/// relocating formulas as they move.
pub fn shift_columns<G: Grid>(grid: &mut G, from: u32, by: u32) {
    let last_column = grid.max_column();
    let last_row = grid.max_row();
    if last_column < from || by == 0 {
        return;
    }

    for column in (from..=last_column).rev() {
        for row in 1..=last_row {
            grid.move_cell((column, row), (column + by, row));
        }
    }
    log::debug!("Shifted columns {from}..={last_column} right by {by}");
}

/// Row whose label mentions "broker", or the conventional default.
#[must_use]
pub fn find_broker_row<G: Grid>(grid: &G) -> u32 {
    (1..=grid.max_row())
        .find(|row| {
            grid.text(LABEL_COLUMN, *row)
                .is_some_and(|label| label.to_lowercase().contains("broker"))
        })
        .unwrap_or(DEFAULT_BROKER_ROW)
}

/// An existing broker column next to `column` to copy summary formulas
/// from: the one to its left, else the one to its right.
fn template_column<G: Grid>(grid: &G, column: u32) -> Option<u32> {
    let left = column.checked_sub(BROKER_COLUMN_STEP);
    let right = column + BROKER_COLUMN_STEP;
    left.filter(|c| *c >= FIRST_BROKER_COLUMN)
        .into_iter()
        .chain(std::iter::once(right))
        .find(|c| grid.text(*c, SERIAL_ROW).is_some())
}

fn copy_template_rows<G: Grid>(
    grid: &mut G,
    column: u32,
    template: u32,
    broker_row: u32,
    record: &ExtractedRecord,
    config: &ModelConfiguration,
) -> usize {
    let delta = i64::from(column) - i64::from(template);
    let data_rows = config.data_rows();
    let upgrade_rows = config.upgrade_rows();
    let mut copied = 0;

    for row in (SERIAL_ROW + 1)..=grid.max_row() {
        if row == broker_row {
            continue;
        }

        if config.avionics_section.is_some_and(|s| s.contains(row)) {
            if let Some(formula) = grid.cell(template, row).filter(|c| c.formula().is_some()) {
                grid.set_cell(column, row, formula.relocated(delta));
                copied += 1;
            }
            let flag = config
                .upgrade_on_row(row)
                .and_then(|name| record.upgrade(name))
                .unwrap_or(UpgradeFlag::No);
            grid.set_cell(column + 1, row, Cell::Text(flag.to_string()));
            continue;
        }

        if data_rows.contains(&row) || upgrade_rows.contains(&row) {
            continue;
        }

        for offset in 0..2 {
            let source = grid.cell(template + offset, row);
            if let Some(formula) = source.filter(|c| c.formula().is_some()) {
                grid.set_cell(column + offset, row, formula.relocated(delta));
                copied += 1;
            }
        }
    }

    copied
}

/// Inserts a new broker column pair at `column`.
///
/// Existing columns at or right of `column` move two columns right. The
/// new column gets the serial in row 1, the uppercased broker name in the
/// broker row, summary formulas copied from a neighbouring broker column,
/// and finally the record itself.
pub fn insert_broker_column<G: Grid>(
    grid: &mut G,
    column: u32,
    serial: &str,
    broker: &str,
    record: &ExtractedRecord,
    config: &ModelConfiguration,
) -> Mutation {
    shift_columns(grid, column, BROKER_COLUMN_STEP);

    let mut mutation = Mutation::default();
    let serial = serial.trim();
    grid.set_cell(column, SERIAL_ROW, Cell::Text(serial.to_owned()));
    mutation.record("serial_number", SERIAL_ROW, serial);

    let broker_row = find_broker_row(grid);
    let broker = broker.trim().to_uppercase();
    if !broker.is_empty() {
        grid.set_cell(column, broker_row, Cell::Text(broker.clone()));
        mutation.record("broker", broker_row, &broker);
    }

    if let Some(template) = template_column(grid, column) {
        let copied = copy_template_rows(grid, column, template, broker_row, record, config);
        log::debug!("Copied {copied} template cells from column {template}");
    } else {
        log::debug!("No neighbouring broker column to copy formulas from");
    }

    let written = write_record(grid, column, record, config);
    mutation.updates.extend(written.updates);
    mutation.violations.extend(written.violations);
    mutation
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use broker_sheet_config_models::{AvionicsSection, CoreField, UpgradeConfig};
    use broker_sheet_workbook::MemoryGrid;

    use super::*;

    fn config() -> ModelConfiguration {
        let mut upgrades = BTreeMap::new();
        upgrades.insert(
            "WIFI".to_owned(),
            UpgradeConfig {
                keywords: vec!["wifi".to_owned()],
                row: 40,
            },
        );
        ModelConfiguration {
            row_mappings: [(CoreField::YearModel, 3), (CoreField::TotalHours, 4)]
                .into_iter()
                .collect(),
            upgrades,
            avionics_section: None,
        }
    }

    fn record() -> ExtractedRecord {
        let mut record = ExtractedRecord {
            year_model: Some(2015),
            total_hours: Some(1234),
            ..ExtractedRecord::default()
        };
        record.upgrades.insert("WIFI".to_owned(), UpgradeFlag::Yes);
        record
    }

    #[test]
    fn writes_fields_and_upgrade_flags() {
        let mut grid = MemoryGrid::new();
        let mutation = write_record(&mut grid, 16, &record(), &config());

        assert_eq!(grid.cell(16, 3), Some(Cell::Number(2015.0)));
        assert_eq!(grid.cell(16, 4), Some(Cell::Number(1234.0)));
        assert_eq!(grid.text(17, 40).as_deref(), Some("Y"));
        assert_eq!(
            mutation.updates,
            vec![
                "year_model - Row 3: 2015",
                "total_hours - Row 4: 1234",
                "WIFI - Row 40: Y",
            ]
        );
    }

    #[test]
    fn row_one_mapping_is_skipped_and_reported() {
        let mut config = config();
        config.row_mappings.insert(CoreField::YearModel, SERIAL_ROW);
        let mut grid = MemoryGrid::new().with_text(16, SERIAL_ROW, "0050");

        let mutation = write_record(&mut grid, 16, &record(), &config);

        assert_eq!(grid.text(16, SERIAL_ROW).as_deref(), Some("0050"));
        assert_eq!(grid.cell(16, 4), Some(Cell::Number(1234.0)));
        assert_eq!(
            mutation.violations,
            vec![ProtectedRowViolation {
                field: "year_model".to_owned(),
                row: SERIAL_ROW,
            }]
        );
    }

    #[test]
    fn upgrade_on_row_one_is_skipped() {
        let mut config = config();
        config.upgrades.get_mut("WIFI").unwrap().row = SERIAL_ROW;
        let mut grid = MemoryGrid::new();

        let mutation = write_record(&mut grid, 16, &record(), &config);

        assert_eq!(grid.cell(17, SERIAL_ROW), None);
        assert_eq!(mutation.violations[0].field, "upgrade_WIFI");
    }

    #[test]
    fn writing_twice_is_idempotent() {
        let mut grid = MemoryGrid::new();
        write_record(&mut grid, 16, &record(), &config());
        let once = grid.clone();
        write_record(&mut grid, 16, &record(), &config());
        assert_eq!(grid, once);
    }

    #[test]
    fn shift_moves_rightmost_first_and_relocates() {
        let mut grid = MemoryGrid::new()
            .with_text(16, 1, "0010")
            .with_text(18, 1, "0090")
            .with_text(19, 40, "Y")
            .with_formula(18, 10, "=R4-$L4");

        shift_columns(&mut grid, 18, 2);

        assert_eq!(grid.text(16, 1).as_deref(), Some("0010"));
        assert_eq!(grid.text(18, 1), None);
        assert_eq!(grid.text(20, 1).as_deref(), Some("0090"));
        assert_eq!(grid.text(21, 40).as_deref(), Some("Y"));
        assert_eq!(grid.cell(20, 10), Some(Cell::Formula("=T4-$L4".to_owned())));
    }

    #[test]
    fn broker_row_from_label_or_default() {
        let grid = MemoryGrid::new().with_text(LABEL_COLUMN, 7, "Broker / Dealer");
        assert_eq!(find_broker_row(&grid), 7);
        assert_eq!(find_broker_row(&MemoryGrid::new()), DEFAULT_BROKER_ROW);
    }

    #[test]
    fn insert_between_existing_serials() {
        let mut grid = MemoryGrid::new()
            .with_text(LABEL_COLUMN, 5, "Broker")
            .with_text(16, 1, "0010")
            .with_text(18, 1, "0090")
            .with_text(18, 5, "ACME")
            .with_formula(16, 20, "=P4/P3")
            .with_formula(18, 20, "=R4/R3");

        let mutation =
            insert_broker_column(&mut grid, 18, "0050", "Jet Brokers", &record(), &config());

        assert_eq!(grid.text(16, 1).as_deref(), Some("0010"));
        assert_eq!(grid.text(18, 1).as_deref(), Some("0050"));
        assert_eq!(grid.text(20, 1).as_deref(), Some("0090"));
        assert_eq!(grid.text(20, 5).as_deref(), Some("ACME"));
        assert_eq!(grid.text(18, 5).as_deref(), Some("JET BROKERS"));
        assert_eq!(grid.cell(18, 20), Some(Cell::Formula("=R4/R3".to_owned())));
        assert_eq!(grid.cell(20, 20), Some(Cell::Formula("=T4/T3".to_owned())));
        assert_eq!(grid.cell(18, 3), Some(Cell::Number(2015.0)));
        assert_eq!(mutation.updates[0], "serial_number - Row 1: 0050");
        assert!(mutation.violations.is_empty());
    }

    #[test]
    fn insert_copies_avionics_section_with_flags() {
        let mut config = config();
        config.avionics_section = Some(AvionicsSection { start: 39, end: 41 });
        let mut grid = MemoryGrid::new()
            .with_text(16, 1, "0010")
            .with_formula(16, 39, "=P38")
            .with_formula(16, 40, "=P39")
            .with_formula(16, 41, "=P40");

        insert_broker_column(&mut grid, 18, "0050", "", &record(), &config);

        assert_eq!(grid.cell(18, 39), Some(Cell::Formula("=R38".to_owned())));
        assert_eq!(grid.cell(18, 41), Some(Cell::Formula("=R40".to_owned())));
        assert_eq!(grid.text(19, 39).as_deref(), Some("N"));
        assert_eq!(grid.text(19, 40).as_deref(), Some("Y"));
        assert_eq!(grid.text(19, 41).as_deref(), Some("N"));
    }

    #[test]
    fn avionics_literals_stay_with_their_broker() {
        let mut config = config();
        config.avionics_section = Some(AvionicsSection { start: 30, end: 32 });
        let mut grid = MemoryGrid::new()
            .with_text(16, 1, "0010")
            .with_formula(16, 30, "=P29")
            .with_text(16, 31, "GARMIN G1000 NXI");

        insert_broker_column(&mut grid, 18, "0050", "", &record(), &config);

        assert_eq!(grid.cell(18, 30), Some(Cell::Formula("=R29".to_owned())));
        assert_eq!(grid.cell(18, 31), None);
        assert_eq!(grid.text(16, 31).as_deref(), Some("GARMIN G1000 NXI"));
        assert_eq!(grid.text(19, 31).as_deref(), Some("N"));
    }

    #[test]
    fn insert_never_copies_into_data_rows() {
        let mut grid = MemoryGrid::new()
            .with_text(16, 1, "0010")
            .with_formula(16, 3, "=P2");
        let record = ExtractedRecord::default();

        insert_broker_column(&mut grid, 18, "0050", "", &record, &config());

        assert_eq!(grid.cell(18, 3), None);
    }
}
