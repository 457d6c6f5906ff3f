//! # Spreadsheet Documents Module
//!
//! This module defines the capabilities a backend must provide for its documents
//! to be matched by patterns: grids of cells, workbooks of named sheets, and the
//! coordinate windows, lines and cursors the pattern engine walks over them.
//! Backends that read physical files live outside this crate; an in-memory
//! backend is provided in [`array`].
use thiserror::Error;

pub mod array;
pub mod cell;
pub mod cursor;
pub mod range;

/// Errors related to grid windows and cursors.
#[derive(Error, Debug)]
pub enum RangeError {
    /// A range string that is not in A1 notation
    #[error("Invalid range format '{0}'")]
    FormatError(String),

    /// A window whose far edge lies before its near edge
    #[error("Invalid bounds ({top}, {left}, {bottom}, {right})")]
    InvalidBounds {
        top: usize,
        left: usize,
        bottom: usize,
        right: usize,
    },

    /// `advance` called on a complete cursor, at the given cursor position
    #[error("Cursor exhausted at index {0}")]
    Exhausted(usize),
}

/// A rectangular space of cells exposed by a backend document.
///
/// The extent is `[0, height) x [0, width)`. Implementations should return a
/// neutral empty cell for coordinates of ragged rows rather than failing.
pub trait Grid {
    /// Number of rows in the grid.
    fn height(&self) -> usize;

    /// Number of columns in the grid.
    fn width(&self) -> usize;

    /// Returns the cell at the given 0-based coordinates.
    fn cell(&self, row: usize, col: usize) -> cell::Cell;

    /// Returns true if the whole document is hidden (hidden sheets).
    fn is_hidden(&self) -> bool {
        false
    }

    /// Returns true if the given row is hidden.
    fn is_hidden_row(&self, _row: usize) -> bool {
        false
    }

    /// Sheet name when the grid is a named sheet of a workbook.
    fn name(&self) -> Option<&str> {
        None
    }
}

/// An ordered collection of named sheets, in file-declaration order.
pub trait WorkbookDocument {
    /// Number of sheets in the workbook.
    fn sheet_count(&self) -> usize;

    /// Returns the sheet at the given 0-based position.
    fn sheet_at(&self, index: usize) -> Option<&dyn Grid>;

    /// Returns the first sheet with the given name.
    fn sheet(&self, name: &str) -> Option<&dyn Grid> {
        (0..self.sheet_count())
            .filter_map(|index| self.sheet_at(index))
            .find(|sheet| sheet.name() == Some(name))
    }

    /// Returns the names of all sheets in order. Unnamed sheets yield an empty string.
    fn sheet_names(&self) -> Vec<String> {
        (0..self.sheet_count())
            .filter_map(|index| self.sheet_at(index))
            .map(|sheet| sheet.name().unwrap_or_default().to_owned())
            .collect()
    }
}

pub use array::{ArraySheet, ArrayWorkbook};
pub use cell::{
    Cell, CellValue, BORDERS_HORIZONTAL, BORDERS_VERTICAL, BORDER_BOTTOM, BORDER_LEFT,
    BORDER_RIGHT, BORDER_TOP,
};
pub use cursor::{Cursor, Layout, RollbackScope};
pub use range::{Axis, Bounds, CellLine, CellRange};
