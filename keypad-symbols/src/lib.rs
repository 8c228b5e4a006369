//! Symbol tables for switch matrices.
//!
//! This crate is `no_std` (with `alloc`) so the same layout definitions can
//! be shared by the scanning engine and the host-side console tool.

#![no_std]

extern crate alloc;

use alloc::vec::Vec;
use core::fmt;

/// Number of rows on the reference keypad.
pub const REFERENCE_ROWS: usize = 6;
/// Number of columns on the reference keypad.
pub const REFERENCE_COLS: usize = 4;

/// Label attached to one switch intersection.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Symbol(&'static str);

impl Symbol {
    /// Placeholder for an intersection with no switch fitted.
    pub const UNUSED: Symbol = Symbol("null");

    pub const fn new(label: &'static str) -> Self {
        Symbol(label)
    }

    pub fn label(self) -> &'static str {
        self.0
    }

    /// Check if this is the placeholder for an unused intersection.
    pub fn is_unused(self) -> bool {
        self == Self::UNUSED
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Rejected symbol table shapes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("symbol map has no cells")]
    Empty,
    #[error("symbol map row {row} has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// Unused intersection.
const ___: Symbol = Symbol::UNUSED;

/// Reference keypad layout (salvaged numeric keypad, 6 rows × 4 columns).
///
/// Row 0 is the top of the pad, column 0 the leftmost column.
pub static REFERENCE: [[Symbol; REFERENCE_COLS]; REFERENCE_ROWS] = [
    // NumLock, Calculator, -, Backspace
    [Symbol("NL"), Symbol("Calc"), ___, Symbol("BP")],
    [Symbol("Clear"), Symbol("/"), Symbol("*"), Symbol("-")],
    [Symbol("7"), Symbol("8"), Symbol("9"), Symbol("+")],
    [Symbol("4"), Symbol("5"), Symbol("6"), ___],
    [Symbol("1"), Symbol("2"), Symbol("3"), Symbol("Enter")],
    [___, Symbol("0"), Symbol("."), ___],
];

/// Immutable (row, col) → symbol lookup with fixed dimensions.
///
/// Cells are stored row-major; every intersection has a symbol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolMap {
    rows: usize,
    cols: usize,
    cells: Vec<Symbol>,
}

impl SymbolMap {
    /// Build a map from a table of rows. All rows must have the same,
    /// non-zero length.
    pub fn from_rows<R: AsRef<[Symbol]>>(table: &[R]) -> Result<Self, ShapeError> {
        let cols = table.first().map(|r| r.as_ref().len()).unwrap_or(0);
        if cols == 0 {
            return Err(ShapeError::Empty);
        }

        let mut cells = Vec::with_capacity(table.len() * cols);
        for (row, symbols) in table.iter().enumerate() {
            let symbols = symbols.as_ref();
            if symbols.len() != cols {
                return Err(ShapeError::Ragged {
                    row,
                    expected: cols,
                    found: symbols.len(),
                });
            }
            cells.extend_from_slice(symbols);
        }

        Ok(Self {
            rows: table.len(),
            cols,
            cells,
        })
    }

    /// A map of the given size where every cell is the placeholder.
    pub fn blank(rows: usize, cols: usize) -> Result<Self, ShapeError> {
        if rows == 0 || cols == 0 {
            return Err(ShapeError::Empty);
        }
        Ok(Self {
            rows,
            cols,
            cells: alloc::vec![Symbol::UNUSED; rows * cols],
        })
    }

    /// The reference 6×4 keypad.
    pub fn reference() -> Self {
        Self {
            rows: REFERENCE_ROWS,
            cols: REFERENCE_COLS,
            cells: REFERENCE.iter().flatten().copied().collect(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Look up the symbol at a matrix position.
    pub fn get(&self, row: usize, col: usize) -> Option<Symbol> {
        if row < self.rows && col < self.cols {
            Some(self.cells[row * self.cols + col])
        } else {
            None
        }
    }

    /// Find the first fitted switch carrying `label`.
    pub fn position(&self, label: &str) -> Option<(usize, usize)> {
        self.cells
            .iter()
            .position(|s| !s.is_unused() && s.label() == label)
            .map(|i| (i / self.cols, i % self.cols))
    }

    /// Iterate `(row, col, symbol)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, Symbol)> + '_ {
        let cols = self.cols;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, &s)| (i / cols, i % cols, s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_map_has_every_cell() {
        let map = SymbolMap::reference();
        assert_eq!(map.rows(), 6);
        assert_eq!(map.cols(), 4);
        assert_eq!(map.iter().count(), 24);
        assert_eq!(map.get(4, 3), Some(Symbol::new("Enter")));
        assert_eq!(map.get(0, 2), Some(Symbol::UNUSED));
        assert_eq!(map.get(6, 0), None);
        assert_eq!(map.get(0, 4), None);
    }

    #[test]
    fn position_skips_placeholders() {
        let map = SymbolMap::reference();
        assert_eq!(map.position("Enter"), Some((4, 3)));
        assert_eq!(map.position("0"), Some((5, 1)));
        assert_eq!(map.position("null"), None);
        assert_eq!(map.position("F13"), None);
    }

    #[test]
    fn ragged_table_is_rejected() {
        let table: [&[Symbol]; 2] = [&[Symbol::new("a"), Symbol::new("b")], &[Symbol::new("c")]];
        assert_eq!(
            SymbolMap::from_rows(&table),
            Err(ShapeError::Ragged {
                row: 1,
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn empty_tables_are_rejected() {
        let none: [[Symbol; 0]; 0] = [];
        assert_eq!(SymbolMap::from_rows(&none), Err(ShapeError::Empty));
        let no_cols: [[Symbol; 0]; 3] = [[], [], []];
        assert_eq!(SymbolMap::from_rows(&no_cols), Err(ShapeError::Empty));
        assert_eq!(SymbolMap::blank(0, 3), Err(ShapeError::Empty));
    }

    #[test]
    fn from_rows_matches_reference() {
        assert_eq!(SymbolMap::from_rows(&REFERENCE), Ok(SymbolMap::reference()));
    }
}
