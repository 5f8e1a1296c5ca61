//! Board coordinates.
//!
//! Scripts address cells with spreadsheet-style references (`A1`, `C12`, `AA3`).
//! Columns are bijective base-26 with `A = 1` shifted to zero-based, so `Z` is
//! column 25 and `AA` is column 26. Whether the numeric row is zero- or one-based
//! has historically varied between tools, so it is a [`RowBase`] setting rather
//! than a constant.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the numeric part of a cell reference maps onto a zero-based row index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowBase {
    /// `A0` is the top-left cell.
    Zero,
    /// `A1` is the top-left cell.
    #[default]
    One,
}

impl RowBase {
    /// Value of the first row as written in a reference.
    pub fn offset(self) -> u32 {
        match self {
            RowBase::Zero => 0,
            RowBase::One => 1,
        }
    }
}

/// Zero-based `(col, row)` position on the board.
///
/// Serialized as the `"col,row"` string used for height-map keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Cell {
    pub col: u32,
    pub row: u32,
}

impl Cell {
    pub fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }

    /// Render as a script reference, e.g. `C3`.
    pub fn to_ref(self, base: RowBase) -> Option<String> {
        index_to_ref(self.col, self.row, base)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.col, self.row)
    }
}

/// Failure to read a `"col,row"` key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid cell key '{0}' (expected \"col,row\")")]
pub struct CellKeyError(pub String);

impl FromStr for Cell {
    type Err = CellKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (col, row) = s.split_once(',').ok_or_else(|| CellKeyError(s.to_string()))?;
        let col = col.trim().parse().map_err(|_| CellKeyError(s.to_string()))?;
        let row = row.trim().parse().map_err(|_| CellKeyError(s.to_string()))?;
        Ok(Cell { col, row })
    }
}

impl From<Cell> for String {
    fn from(cell: Cell) -> Self {
        cell.to_string()
    }
}

impl TryFrom<String> for Cell {
    type Error = CellKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Decode a reference such as `B7` or `aa12` into a zero-based cell.
///
/// Returns `None` if the text is not `<letters><digits>`, if a component
/// overflows, or if the row falls below the first row for `base`.
///
/// ```
/// use skirmish_data::coord::{Cell, RowBase, ref_to_index};
///
/// assert_eq!(ref_to_index("C3", RowBase::One), Some(Cell::new(2, 2)));
/// assert_eq!(ref_to_index("AA0", RowBase::Zero), Some(Cell::new(26, 0)));
/// assert_eq!(ref_to_index("3C", RowBase::One), None);
/// ```
pub fn ref_to_index(reference: &str, base: RowBase) -> Option<Cell> {
    let text = reference.trim();
    let split = text.find(|c: char| !c.is_ascii_alphabetic())?;
    let (letters, digits) = text.split_at(split);
    if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut col: u32 = 0;
    for ch in letters.bytes() {
        let value = u32::from(ch.to_ascii_uppercase() - b'A') + 1;
        col = col.checked_mul(26)?.checked_add(value)?;
    }
    let row: u32 = digits.parse().ok()?;
    Some(Cell {
        col: col - 1,
        row: row.checked_sub(base.offset())?,
    })
}

/// Encode a zero-based cell as a reference string.
pub fn index_to_ref(col: u32, row: u32, base: RowBase) -> Option<String> {
    let row = row.checked_add(base.offset())?;
    let mut letters = Vec::new();
    let mut n = u64::from(col) + 1;
    while n > 0 {
        n -= 1;
        // n % 26 < 26, so the narrowing cannot truncate
        #[allow(clippy::cast_possible_truncation)]
        letters.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    letters.reverse();
    let letters = String::from_utf8(letters).ok()?;
    Some(format!("{letters}{row}"))
}

/// Encode a fractional board position (e.g. a token mid-animation) by rounding
/// to the nearest cell. Fails on non-finite or negative input.
pub fn point_to_ref(col: f64, row: f64, base: RowBase) -> Option<String> {
    let cell = point_to_cell(col, row)?;
    index_to_ref(cell.col, cell.row, base)
}

/// Round a fractional position to the nearest cell.
pub fn point_to_cell(col: f64, row: f64) -> Option<Cell> {
    if !col.is_finite() || !row.is_finite() {
        return None;
    }
    let (col, row) = (col.round(), row.round());
    if col < 0.0 || row < 0.0 || col > f64::from(u32::MAX) || row > f64::from(u32::MAX) {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Some(Cell::new(col as u32, row as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_letter_columns() {
        assert_eq!(ref_to_index("A1", RowBase::One), Some(Cell::new(0, 0)));
        assert_eq!(ref_to_index("Z1", RowBase::One), Some(Cell::new(25, 0)));
        assert_eq!(ref_to_index("c3", RowBase::One), Some(Cell::new(2, 2)));
    }

    #[test]
    fn multi_letter_columns() {
        assert_eq!(ref_to_index("AA1", RowBase::One), Some(Cell::new(26, 0)));
        assert_eq!(ref_to_index("AZ1", RowBase::One), Some(Cell::new(51, 0)));
        assert_eq!(ref_to_index("BA1", RowBase::One), Some(Cell::new(52, 0)));
        assert_eq!(index_to_ref(26, 0, RowBase::One).as_deref(), Some("AA1"));
        assert_eq!(index_to_ref(701, 0, RowBase::One).as_deref(), Some("ZZ1"));
        assert_eq!(index_to_ref(702, 0, RowBase::One).as_deref(), Some("AAA1"));
    }

    #[test]
    fn one_based_rows_round_trip() {
        for reference in ["A1", "B2", "Z26", "AA10", "ZZ99", "ABC123"] {
            let cell = ref_to_index(reference, RowBase::One).unwrap();
            assert_eq!(index_to_ref(cell.col, cell.row, RowBase::One).as_deref(), Some(reference));
        }
    }

    #[test]
    fn zero_based_rows_round_trip() {
        for reference in ["A0", "B2", "Z25", "AA0", "ZZ99"] {
            let cell = ref_to_index(reference, RowBase::Zero).unwrap();
            assert_eq!(index_to_ref(cell.col, cell.row, RowBase::Zero).as_deref(), Some(reference));
        }
    }

    #[test]
    fn row_base_changes_meaning_of_digits() {
        assert_eq!(ref_to_index("B2", RowBase::Zero), Some(Cell::new(1, 2)));
        assert_eq!(ref_to_index("B2", RowBase::One), Some(Cell::new(1, 1)));
        assert_eq!(ref_to_index("A0", RowBase::One), None);
    }

    #[test]
    fn rejects_malformed_references() {
        for bad in ["", "A", "12", "1A", "A1B", "A-1", "??", "A 1", "É1"] {
            assert_eq!(ref_to_index(bad, RowBase::One), None, "{bad}");
        }
        assert_eq!(ref_to_index("A99999999999", RowBase::One), None);
    }

    #[test]
    fn fractional_points_round_to_cells() {
        assert_eq!(point_to_ref(1.4, 2.6, RowBase::One).as_deref(), Some("B4"));
        assert_eq!(point_to_ref(f64::NAN, 0.0, RowBase::One), None);
        assert_eq!(point_to_ref(-1.0, 0.0, RowBase::One), None);
    }

    #[test]
    fn cell_key_serializes_as_string() {
        let cell = Cell::new(3, 4);
        assert_eq!(cell.to_string(), "3,4");
        assert_eq!("3,4".parse::<Cell>(), Ok(cell));
        assert!("3;4".parse::<Cell>().is_err());
        assert_eq!(serde_json::to_string(&cell).unwrap(), "\"3,4\"");
    }
}
