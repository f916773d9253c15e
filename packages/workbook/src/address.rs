//! A1-style cell addressing.
//!
//! Columns use the standard spreadsheet base-26 letter encoding:
//! 1 → `A`, 26 → `Z`, 27 → `AA`, 16384 → `XFD`.

/// Highest column index a worksheet can address (`XFD`).
pub const MAX_COLUMN: u32 = 16_384;

/// Converts a 1-based column index to its letters.
///
/// Returns an empty string for column 0.
#[must_use]
pub fn column_letters(column: u32) -> String {
    let mut n = column;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + u8::try_from(rem).unwrap_or(0)));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Parses column letters (case-insensitive) back to a 1-based index.
///
/// Returns `None` for empty input, non-letters, or columns past
/// [`MAX_COLUMN`].
#[must_use]
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut index: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = u32::from(c.to_ascii_uppercase()) - u32::from('A') + 1;
        index = index * 26 + digit;
    }
    (index <= MAX_COLUMN).then_some(index)
}

/// Renders an A1 reference such as `P12`.
#[must_use]
pub fn cell_reference(column: u32, row: u32) -> String {
    format!("{}{row}", column_letters(column))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_letters() {
        assert_eq!(column_letters(1), "A");
        assert_eq!(column_letters(12), "L");
        assert_eq!(column_letters(16), "P");
        assert_eq!(column_letters(26), "Z");
    }

    #[test]
    fn multi_letters() {
        assert_eq!(column_letters(27), "AA");
        assert_eq!(column_letters(52), "AZ");
        assert_eq!(column_letters(53), "BA");
        assert_eq!(column_letters(702), "ZZ");
        assert_eq!(column_letters(703), "AAA");
        assert_eq!(column_letters(MAX_COLUMN), "XFD");
    }

    #[test]
    fn parses_letters() {
        assert_eq!(column_index("A"), Some(1));
        assert_eq!(column_index("p"), Some(16));
        assert_eq!(column_index("AA"), Some(27));
        assert_eq!(column_index("XFD"), Some(MAX_COLUMN));
        assert_eq!(column_index("XFE"), None);
        assert_eq!(column_index("A1"), None);
        assert_eq!(column_index(""), None);
    }

    #[test]
    fn letters_roundtrip_across_boundaries() {
        for column in [1, 25, 26, 27, 51, 52, 701, 702, 703, MAX_COLUMN] {
            assert_eq!(column_index(&column_letters(column)), Some(column));
        }
    }

    #[test]
    fn renders_reference() {
        assert_eq!(cell_reference(18, 5), "R5");
        assert_eq!(cell_reference(28, 100), "AB100");
    }
}
