//! Formula relocation for column moves.
//!
//! When a broker column is shifted or used as a template for a new
//! column, the formulas it carries must keep pointing at "their own"
//! cells. Relative column references move by the shift amount;
//! `$`-anchored columns stay put. Column moves never touch row numbers;
//! only [`offset_formula`], used to expand shared formulas, moves rows.
//!
//! Formulas are never evaluated, only rewritten as text.

use std::sync::LazyLock;

use regex::Regex;

use crate::address::{MAX_COLUMN, column_index, column_letters};

const MAX_ROW: u32 = 1_048_576;

static CELL_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\$?)([A-Z]{1,3})(\$?)([0-9]+)").expect("valid regex")
});

/// Rewrites every relative column reference in `formula` by
/// `column_delta` columns.
///
/// Text inside double-quoted string literals is left alone, as are tokens
/// that only look like references (function names such as `LOG10(`,
/// sheet names such as `DAT1!`). A reference pushed off the sheet becomes
/// `#REF!`, as a spreadsheet application would render it.
#[must_use]
pub fn relocate_formula(formula: &str, column_delta: i64) -> String {
    offset_formula(formula, column_delta, 0)
}

/// Rewrites relative references by both a column and a row offset.
///
/// This is what a spreadsheet does when it fills a formula from one cell
/// into another, and is how shared formulas are expanded from their
/// anchor cell.
#[must_use]
pub fn offset_formula(formula: &str, column_delta: i64, row_delta: i64) -> String {
    if column_delta == 0 && row_delta == 0 {
        return formula.to_owned();
    }

    let mut out = String::with_capacity(formula.len() + 4);
    let mut last = 0;

    for caps in CELL_REF_RE.captures_iter(formula) {
        let Some(whole) = caps.get(0) else { continue };
        if !is_reference_token(formula, whole.start(), whole.end()) {
            continue;
        }
        let column_fixed = !caps[1].is_empty();
        let row_fixed = !caps[3].is_empty();
        if (column_fixed || column_delta == 0) && (row_fixed || row_delta == 0) {
            continue;
        }
        let (Some(column), Ok(row)) = (column_index(&caps[2]), caps[4].parse::<u32>()) else {
            continue;
        };

        let column = if column_fixed {
            Some(column)
        } else {
            shift(column, column_delta, MAX_COLUMN)
        };
        let row = if row_fixed || row_delta == 0 {
            Some(caps[4].to_owned())
        } else {
            shift(row, row_delta, MAX_ROW).map(|r| r.to_string())
        };

        out.push_str(&formula[last..whole.start()]);
        match (column, row) {
            (Some(column), Some(row)) => {
                out.push_str(&caps[1]);
                out.push_str(&column_letters(column));
                out.push_str(&caps[3]);
                out.push_str(&row);
            }
            _ => out.push_str("#REF!"),
        }
        last = whole.end();
    }

    out.push_str(&formula[last..]);
    out
}

fn shift(index: u32, delta: i64, max: u32) -> Option<u32> {
    let shifted = i64::from(index) + delta;
    u32::try_from(shifted).ok().filter(|i| (1..=max).contains(i))
}

fn is_reference_token(formula: &str, start: usize, end: usize) -> bool {
    if inside_string_literal(&formula[..start]) {
        return false;
    }
    let before = formula[..start].chars().next_back();
    if before.is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') {
        return false;
    }
    let after = formula[end..].chars().next();
    !after.is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '(' | '!'))
}

fn inside_string_literal(prefix: &str) -> bool {
    prefix.bytes().filter(|b| *b == b'"').count() % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_moves_absolute_stays() {
        assert_eq!(relocate_formula("=N5+$O5", 2), "=P5+$O5");
    }

    #[test]
    fn anchored_row_keeps_row() {
        assert_eq!(relocate_formula("=P$3*2", 2), "=R$3*2");
        assert_eq!(relocate_formula("=$P$3*2", 2), "=$P$3*2");
    }

    #[test]
    fn ranges_and_functions() {
        assert_eq!(relocate_formula("=SUM(P10:P20)", 2), "=SUM(R10:R20)");
        assert_eq!(
            relocate_formula("=IF(Q30=\"Y\",P31,0)", -2),
            "=IF(O30=\"Y\",N31,0)"
        );
    }

    #[test]
    fn function_names_and_strings_are_not_references() {
        assert_eq!(relocate_formula("=LOG10(A1)", 1), "=LOG10(B1)");
        assert_eq!(relocate_formula("=\"AB12\"&C3", 1), "=\"AB12\"&D3");
        assert_eq!(relocate_formula("=DAT1!A1", 1), "=DAT1!B1");
    }

    #[test]
    fn crosses_letter_boundary() {
        assert_eq!(relocate_formula("=Z1+AA1", 2), "=AB1+AC1");
        assert_eq!(relocate_formula("=AB1", -2), "=Z1");
    }

    #[test]
    fn shifting_off_sheet_is_ref_error() {
        assert_eq!(relocate_formula("=A1+B1", -1), "=#REF!+A1");
    }

    #[test]
    fn offset_moves_relative_rows_and_columns() {
        assert_eq!(offset_formula("=P4*2", 2, 0), "=R4*2");
        assert_eq!(offset_formula("=P4+P$4+$P4", 1, 3), "=Q7+Q$4+$P7");
        assert_eq!(offset_formula("=SUM(A2:A9)", 0, -1), "=SUM(A1:A8)");
        assert_eq!(offset_formula("=A1", 0, -1), "=#REF!");
    }

    #[test]
    fn zero_delta_is_identity() {
        assert_eq!(relocate_formula("=N5+$O5", 0), "=N5+$O5");
    }
}
