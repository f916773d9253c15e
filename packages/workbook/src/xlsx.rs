//! `.xlsx` workbooks backed by [`umya_spreadsheet`].
//!
//! A [`Workbook`] is parsed from and serialized to byte buffers so that
//! callers can keep the untouched input around as a backup and chain the
//! output of one update into the next.

use std::collections::BTreeMap;
use std::io::Cursor;

use umya_spreadsheet::{Spreadsheet, Worksheet};

use crate::formula::offset_formula;
use crate::{Cell, Grid, WorkbookError};

/// An in-memory xlsx workbook.
pub struct Workbook {
    book: Spreadsheet,
}

impl std::fmt::Debug for Workbook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workbook")
            .field("sheets", &self.sheet_names())
            .finish()
    }
}

impl Workbook {
    /// Creates a workbook with a single empty sheet named `Sheet1`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            book: umya_spreadsheet::new_file(),
        }
    }

    /// Parses xlsx bytes.
    ///
    /// # Errors
    ///
    /// Returns [`WorkbookError::Read`] if the bytes are not a valid xlsx
    /// workbook, including when the parser itself gives up mid-read.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WorkbookError> {
        // umya-spreadsheet panics on some truncated or malformed parts.
        let mut book = std::panic::catch_unwind(|| {
            umya_spreadsheet::reader::xlsx::read_reader(Cursor::new(bytes), true)
        })
        .map_err(|_| WorkbookError::Read("workbook parser aborted on malformed input".to_owned()))?
        .map_err(|e| WorkbookError::Read(e.to_string()))?;
        for sheet in book.get_sheet_collection_mut() {
            expand_shared_formulas(sheet);
        }
        log::debug!("Read workbook ({} bytes)", bytes.len());
        Ok(Self { book })
    }

    /// Reads and parses an xlsx file.
    ///
    /// # Errors
    ///
    /// Returns [`WorkbookError::Io`] if the file cannot be read, or
    /// [`WorkbookError::Read`] if it is not a valid workbook.
    pub fn open(path: &std::path::Path) -> Result<Self, WorkbookError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Serializes the workbook to xlsx bytes.
    ///
    /// # Errors
    ///
    /// Returns [`WorkbookError::Save`] if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WorkbookError> {
        let mut buf = Cursor::new(Vec::new());
        umya_spreadsheet::writer::xlsx::write_writer(&self.book, &mut buf)
            .map_err(|e| WorkbookError::Save(e.to_string()))?;
        Ok(buf.into_inner())
    }

    /// Sheet names in workbook order.
    #[must_use]
    pub fn sheet_names(&self) -> Vec<String> {
        self.book
            .get_sheet_collection()
            .iter()
            .map(|ws| ws.get_name().to_owned())
            .collect()
    }

    /// Name of the first sheet.
    ///
    /// # Errors
    ///
    /// Returns [`WorkbookError::NoSheets`] for a workbook without sheets.
    pub fn first_sheet_name(&self) -> Result<String, WorkbookError> {
        self.sheet_names()
            .into_iter()
            .next()
            .ok_or(WorkbookError::NoSheets)
    }

    /// Borrows the sheet called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkbookError::SheetNotFound`] if no such sheet exists.
    pub fn sheet(&self, name: &str) -> Result<&Worksheet, WorkbookError> {
        self.book
            .get_sheet_by_name(name)
            .ok_or_else(|| WorkbookError::SheetNotFound(name.to_owned()))
    }

    /// Mutably borrows the sheet called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkbookError::SheetNotFound`] if no such sheet exists.
    pub fn sheet_mut(&mut self, name: &str) -> Result<&mut Worksheet, WorkbookError> {
        self.book
            .get_sheet_by_name_mut(name)
            .ok_or_else(|| WorkbookError::SheetNotFound(name.to_owned()))
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

fn shared_index(cell: &umya_spreadsheet::Cell) -> Option<String> {
    let attributes = cell.get_cell_value().get_formula_attributes();
    if !attributes.iter().any(|(k, v)| *k == "t" && *v == "shared") {
        return None;
    }
    attributes
        .iter()
        .find(|(k, _)| *k == "si")
        .map(|(_, v)| (*v).to_owned())
}

fn coordinates(cell: &umya_spreadsheet::Cell) -> (u32, u32) {
    let coordinate = cell.get_coordinate();
    (*coordinate.get_col_num(), *coordinate.get_row_num())
}

/// Fills an anchor's formula into a member `(column, row)` of its group.
fn fill_from(anchor: &umya_spreadsheet::Cell, column: u32, row: u32) -> String {
    let (anchor_column, anchor_row) = coordinates(anchor);
    offset_formula(
        &format!("={}", anchor.get_formula()),
        i64::from(column) - i64::from(anchor_column),
        i64::from(row) - i64::from(anchor_row),
    )
}

/// Expands a shared formula member (an `<f t="shared" si=".."/>` without
/// text) from the anchor cell that carries the formula for its group.
fn shared_formula(sheet: &Worksheet, column: u32, row: u32) -> Option<String> {
    let index = shared_index(sheet.get_cell((column, row))?)?;
    let anchor = sheet.get_cell_collection().into_iter().find(|c| {
        !c.get_formula().is_empty() && shared_index(c).as_deref() == Some(index.as_str())
    })?;
    Some(fill_from(anchor, column, row))
}

/// Gives every member of a shared formula group its own formula text and
/// drops the group attributes, so cells can be moved or overwritten one at
/// a time without orphaning the rest of the group.
fn expand_shared_formulas(sheet: &mut Worksheet) {
    let members: Vec<(String, &umya_spreadsheet::Cell)> = sheet
        .get_cell_collection()
        .into_iter()
        .filter_map(|c| shared_index(c).map(|index| (index, c)))
        .collect();
    let anchors: BTreeMap<&str, &umya_spreadsheet::Cell> = members
        .iter()
        .filter(|(_, c)| !c.get_formula().is_empty())
        .map(|(index, c)| (index.as_str(), *c))
        .collect();

    let expanded: Vec<(u32, u32, String)> = members
        .iter()
        .filter_map(|(index, c)| {
            let (column, row) = coordinates(c);
            let anchor = anchors.get(index.as_str())?;
            Some((column, row, fill_from(anchor, column, row)))
        })
        .collect();

    if !expanded.is_empty() {
        log::debug!(
            "Expanded {} shared formula cells on {}",
            expanded.len(),
            sheet.get_name()
        );
    }
    for (column, row, formula) in expanded {
        let value = sheet.get_cell_value_mut((column, row));
        value.remove_formula();
        value.set_formula(formula.trim_start_matches('='));
    }
}

impl Grid for Worksheet {
    fn cell(&self, column: u32, row: u32) -> Option<Cell> {
        let cell = self.get_cell((column, row))?;

        let formula = cell.get_formula();
        if !formula.is_empty() {
            return Some(Cell::Formula(format!("={formula}")));
        }
        if let Some(formula) = shared_formula(self, column, row) {
            return Some(Cell::Formula(formula));
        }

        let value = cell.get_value();
        if value.is_empty() {
            return None;
        }
        if cell.get_data_type() == "n"
            && let Ok(n) = value.parse::<f64>()
        {
            return Some(Cell::Number(n));
        }
        Some(Cell::Text(value.into_owned()))
    }

    fn set_cell(&mut self, column: u32, row: u32, cell: Cell) {
        let target = self.get_cell_mut((column, row));
        match cell {
            Cell::Text(s) => {
                target.set_value_string(s);
            }
            Cell::Number(n) => {
                target.set_value_number(n);
            }
            Cell::Formula(f) => {
                // A plain formula never keeps shared-formula attributes.
                target.get_cell_value_mut().remove_formula();
                target.set_formula(f.trim_start_matches('='));
            }
        }
    }

    fn clear_cell(&mut self, column: u32, row: u32) {
        if self.get_cell((column, row)).is_some() {
            self.get_cell_mut((column, row)).set_value_string("");
        }
    }

    fn max_column(&self) -> u32 {
        self.get_highest_column()
    }

    fn max_row(&self) -> u32 {
        self.get_highest_row()
    }
}
