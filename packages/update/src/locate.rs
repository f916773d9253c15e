//! Broker column placement.
//!
//! Broker data columns sit on even column indices from `P` (16) onward,
//! each followed by its Y/N column, with the serial number in row 1. A
//! serial already on the sheet is updated in place; a new serial is
//! inserted so that numeric serials stay in ascending order.

use broker_sheet_config_models::{BROKER_COLUMN_STEP, FIRST_BROKER_COLUMN, SERIAL_ROW};
use broker_sheet_workbook::{Grid, Workbook};
use serde::Serialize;
use strum_macros::{AsRefStr, Display};

use crate::UpdateError;

/// Whether a listing updates an existing broker column or adds a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PlacementMode {
    /// The serial already has a column.
    Update,
    /// A new column pair is inserted.
    Insert,
}

/// Where a listing's values go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokerColumnInfo {
    /// Data column; the Y/N column is `column + 1`.
    pub column: u32,
    /// Sheet holding the column.
    pub sheet: String,
    /// Update or insert.
    pub mode: PlacementMode,
    /// `(column, numeric serial)` of existing broker columns, ascending by
    /// serial.
    pub serial_positions: Vec<(u32, u64)>,
    /// Header text that matched on the update path.
    pub matched_serial: Option<String>,
}

/// Numeric value of a serial: its trailing digits, or failing that the
/// leading digits after the last dash.
#[must_use]
pub fn numeric_serial(serial: &str) -> Option<u64> {
    let serial = serial.trim();
    let trailing_start = serial
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i);
    if let Some(start) = trailing_start {
        return serial[start..].parse().ok();
    }

    let (_, after_dash) = serial.rsplit_once('-')?;
    let digits: String = after_dash
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Header text of every occupied broker column, left to right.
#[must_use]
pub fn broker_headers<G: Grid>(grid: &G) -> Vec<(u32, String)> {
    (FIRST_BROKER_COLUMN..=grid.max_column())
        .step_by(BROKER_COLUMN_STEP as usize)
        .filter_map(|column| grid.text(column, SERIAL_ROW).map(|header| (column, header)))
        .collect()
}

fn serial_positions(headers: &[(u32, String)]) -> Vec<(u32, u64)> {
    let mut positions: Vec<(u32, u64)> = headers
        .iter()
        .filter_map(|(column, header)| numeric_serial(header).map(|n| (*column, n)))
        .collect();
    positions.sort_by_key(|(column, n)| (*n, *column));
    positions
}

fn exact_match(headers: &[(u32, String)], serial: &str) -> Option<(u32, String)> {
    let serial = serial.trim();
    headers.iter().find(|(_, header)| header == serial).cloned()
}

fn numeric_match(headers: &[(u32, String)], serial: &str) -> Option<(u32, String)> {
    let wanted = numeric_serial(serial)?;
    headers
        .iter()
        .find(|(_, header)| numeric_serial(header) == Some(wanted))
        .cloned()
}

fn update_info(
    grid_headers: &[(u32, String)],
    sheet: &str,
    (column, header): (u32, String),
) -> BrokerColumnInfo {
    log::info!("Serial matches existing column {column} ({header}) on {sheet}");
    BrokerColumnInfo {
        column,
        sheet: sheet.to_owned(),
        mode: PlacementMode::Update,
        serial_positions: serial_positions(grid_headers),
        matched_serial: Some(header),
    }
}

fn insert_info(headers: &[(u32, String)], sheet: &str, serial: &str) -> BrokerColumnInfo {
    let positions = serial_positions(headers);
    let new_serial = numeric_serial(serial);

    let before = new_serial.and_then(|n| positions.iter().find(|(_, existing)| *existing > n));
    let column = match before {
        Some((column, existing)) => {
            log::debug!("Inserting before column {column} (serial {existing})");
            *column
        }
        None => headers
            .iter()
            .map(|(column, _)| *column)
            .max()
            .map_or(FIRST_BROKER_COLUMN, |last| last + BROKER_COLUMN_STEP),
    };

    log::info!("New serial {serial} goes to column {column} on {sheet}");
    BrokerColumnInfo {
        column,
        sheet: sheet.to_owned(),
        mode: PlacementMode::Insert,
        serial_positions: positions,
        matched_serial: None,
    }
}

/// Places `serial` on a single sheet.
#[must_use]
pub fn locate_column<G: Grid>(grid: &G, sheet: &str, serial: &str) -> BrokerColumnInfo {
    let headers = broker_headers(grid);
    exact_match(&headers, serial)
        .or_else(|| numeric_match(&headers, serial))
        .map_or_else(
            || insert_info(&headers, sheet, serial),
            |found| update_info(&headers, sheet, found),
        )
}

/// Places `serial` in a workbook.
///
/// Every sheet is searched for an existing column, first by exact header
/// and then by equal numeric serial. A new column goes to `insert_sheet`,
/// or the first sheet when none is given.
///
/// # Errors
///
/// Returns [`UpdateError::Workbook`] if `insert_sheet` does not exist or
/// the workbook has no sheets.
pub fn locate_in_workbook(
    workbook: &Workbook,
    serial: &str,
    insert_sheet: Option<&str>,
) -> Result<BrokerColumnInfo, UpdateError> {
    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let headers = broker_headers(workbook.sheet(&name)?);
        sheets.push((name, headers));
    }

    for matcher in [exact_match, numeric_match] {
        for (name, headers) in &sheets {
            if let Some(found) = matcher(headers, serial) {
                return Ok(update_info(headers, name, found));
            }
        }
    }

    let target = match insert_sheet {
        Some(name) => name.to_owned(),
        None => workbook.first_sheet_name()?,
    };
    let sheet = workbook.sheet(&target)?;
    Ok(insert_info(&broker_headers(sheet), &target, serial))
}
