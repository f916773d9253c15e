#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Spreadsheet access for the broker comparison workbooks.
//!
//! The placement logic only needs a handful of cell operations, captured
//! by the [`Grid`] trait. Two implementations are provided:
//!
//! - [`MemoryGrid`], a sparse in-memory sheet used by tests and dry runs
//! - [`umya_spreadsheet::Worksheet`], via the [`xlsx`] module, which also
//!   owns reading and writing whole `.xlsx` workbooks as bytes
//!
//! Cell coordinates are always `(column, row)`, both 1-based.

pub mod address;
pub mod formula;
pub mod memory;
pub mod xlsx;

pub use address::{cell_reference, column_index, column_letters};
pub use formula::{offset_formula, relocate_formula};
pub use memory::MemoryGrid;
pub use xlsx::Workbook;

/// Errors raised while reading or writing a workbook.
#[derive(Debug, thiserror::Error)]
pub enum WorkbookError {
    /// The bytes could not be parsed as an xlsx workbook.
    #[error("Failed to read workbook: {0}")]
    Read(String),

    /// The workbook could not be serialized.
    #[error("Failed to save workbook: {0}")]
    Save(String),

    /// The requested sheet does not exist.
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// The workbook has no sheets at all.
    #[error("Workbook has no sheets")]
    NoSheets,

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Contents of one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// A literal string.
    Text(String),
    /// A literal number.
    Number(f64),
    /// Formula text, including the leading `=`.
    Formula(String),
}

impl Cell {
    /// Display text for a literal cell; `None` for formulas.
    ///
    /// Whole numbers render without a fractional part so that numeric
    /// serials and years compare as written.
    #[must_use]
    pub fn literal_text(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Number(n) => Some(format_number(*n)),
            Self::Formula(_) => None,
        }
    }

    /// Returns the formula text if this is a formula cell.
    #[must_use]
    pub fn formula(&self) -> Option<&str> {
        match self {
            Self::Formula(f) => Some(f),
            Self::Text(_) | Self::Number(_) => None,
        }
    }

    /// Returns this cell as it should appear `column_delta` columns away:
    /// formulas are relocated, literals are unchanged.
    #[must_use]
    pub fn relocated(&self, column_delta: i64) -> Self {
        match self {
            Self::Formula(f) => Self::Formula(relocate_formula(f, column_delta)),
            other => other.clone(),
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) | Self::Formula(s) => f.write_str(s),
            Self::Number(n) => f.write_str(&format_number(*n)),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Minimal cell access needed to locate and mutate broker columns.
pub trait Grid {
    /// Returns the cell at `(column, row)`, or `None` if it is empty.
    fn cell(&self, column: u32, row: u32) -> Option<Cell>;

    /// Overwrites the cell at `(column, row)`.
    fn set_cell(&mut self, column: u32, row: u32, cell: Cell);

    /// Empties the cell at `(column, row)`.
    fn clear_cell(&mut self, column: u32, row: u32);

    /// Highest column holding any cell.
    fn max_column(&self) -> u32;

    /// Highest row holding any cell.
    fn max_row(&self) -> u32;

    /// Trimmed display text of a literal cell, `None` when empty or a
    /// formula.
    fn text(&self, column: u32, row: u32) -> Option<String> {
        self.cell(column, row)
            .and_then(|c| c.literal_text())
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
    }

    /// Moves a cell, relocating formulas by the column distance travelled.
    /// The source cell is left empty.
    fn move_cell(&mut self, from: (u32, u32), to: (u32, u32)) {
        let delta = i64::from(to.0) - i64::from(from.0);
        match self.cell(from.0, from.1) {
            Some(cell) => self.set_cell(to.0, to.1, cell.relocated(delta)),
            None => self.clear_cell(to.0, to.1),
        }
        self.clear_cell(from.0, from.1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_text_formats_whole_numbers() {
        assert_eq!(Cell::Number(50.0).literal_text().as_deref(), Some("50"));
        assert_eq!(Cell::Number(1.5).literal_text().as_deref(), Some("1.5"));
        assert_eq!(Cell::Formula("=A1".to_owned()).literal_text(), None);
    }

    #[test]
    fn relocated_only_touches_formulas() {
        let formula = Cell::Formula("=N5+$O5".to_owned());
        assert_eq!(formula.relocated(2), Cell::Formula("=P5+$O5".to_owned()));
        let text = Cell::Text("N5".to_owned());
        assert_eq!(text.relocated(2), text);
    }

    #[test]
    fn move_cell_relocates_and_clears_source() {
        let mut grid = MemoryGrid::new();
        grid.set_cell(16, 7, Cell::Formula("=P6*2".to_owned()));
        grid.move_cell((16, 7), (18, 7));
        assert_eq!(grid.cell(16, 7), None);
        assert_eq!(grid.cell(18, 7), Some(Cell::Formula("=R6*2".to_owned())));
    }

    #[test]
    fn move_of_empty_cell_clears_destination() {
        let mut grid = MemoryGrid::new();
        grid.set_cell(18, 3, Cell::Text("stale".to_owned()));
        grid.move_cell((16, 3), (18, 3));
        assert_eq!(grid.cell(18, 3), None);
    }
}
