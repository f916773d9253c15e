//! Sparse in-memory [`Grid`].

use std::collections::BTreeMap;

use crate::{Cell, Grid};

/// A sheet held entirely in memory, keyed by `(column, row)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryGrid {
    cells: BTreeMap<(u32, u32), Cell>,
}

impl MemoryGrid {
    /// Creates an empty grid.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style text cell insertion.
    #[must_use]
    pub fn with_text(mut self, column: u32, row: u32, text: &str) -> Self {
        self.set_cell(column, row, Cell::Text(text.to_owned()));
        self
    }

    /// Builder-style formula cell insertion.
    #[must_use]
    pub fn with_formula(mut self, column: u32, row: u32, formula: &str) -> Self {
        self.set_cell(column, row, Cell::Formula(formula.to_owned()));
        self
    }

    /// Number of non-empty cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if no cell holds a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterates over non-empty cells in `(column, row)` order.
    pub fn iter(&self) -> impl Iterator<Item = (&(u32, u32), &Cell)> {
        self.cells.iter()
    }
}

impl Grid for MemoryGrid {
    fn cell(&self, column: u32, row: u32) -> Option<Cell> {
        self.cells.get(&(column, row)).cloned()
    }

    fn set_cell(&mut self, column: u32, row: u32, cell: Cell) {
        self.cells.insert((column, row), cell);
    }

    fn clear_cell(&mut self, column: u32, row: u32) {
        self.cells.remove(&(column, row));
    }

    fn max_column(&self) -> u32 {
        self.cells.keys().map(|(c, _)| *c).max().unwrap_or(0)
    }

    fn max_row(&self) -> u32 {
        self.cells.keys().map(|(_, r)| *r).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_extent() {
        let grid = MemoryGrid::new()
            .with_text(12, 40, "WIFI")
            .with_text(18, 1, "0090");
        assert_eq!(grid.max_column(), 18);
        assert_eq!(grid.max_row(), 40);
        assert_eq!(grid.len(), 2);
    }

    #[test]
    fn text_trims_and_skips_blank() {
        let grid = MemoryGrid::new()
            .with_text(16, 1, "  0010 ")
            .with_text(16, 2, "   ")
            .with_formula(16, 3, "=P2");
        assert_eq!(grid.text(16, 1).as_deref(), Some("0010"));
        assert_eq!(grid.text(16, 2), None);
        assert_eq!(grid.text(16, 3), None);
    }

    #[test]
    fn empty_grid_has_zero_extent() {
        let grid = MemoryGrid::new();
        assert!(grid.is_empty());
        assert_eq!(grid.max_column(), 0);
        assert_eq!(grid.max_row(), 0);
    }
}
