use crate::error::SheetParserError;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::Grid;
use crate::spreadsheet::RangeError;
use regex::Regex;
use std::fmt::Debug;

/// Direction along which a range is read line by line.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Axis {
    /// Lines are rows, read top to bottom
    #[default]
    Rows,
    /// Lines are columns, read left to right
    Columns,
}

impl TryFrom<&str> for Axis {
    type Error = SheetParserError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_ascii_lowercase().as_str() {
            "rows" | "row" => Ok(Self::Rows),
            "columns" | "column" | "cols" => Ok(Self::Columns),
            _ => Err(SheetParserError::configuration(format!(
                "axis must be 'rows' or 'columns' - got '{value}'"
            ))),
        }
    }
}

/// Optional half-open window `[top, bottom) x [left, right)` relative to a parent range.
/// Missing edges default to the parent's extent.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Bounds {
    /// First row (0-based, inclusive), None for the parent's first row
    pub top: Option<usize>,
    /// First column (0-based, inclusive), None for the parent's first column
    pub left: Option<usize>,
    /// Last row (0-based, exclusive), None for the parent's height
    pub bottom: Option<usize>,
    /// Last column (0-based, exclusive), None for the parent's width
    pub right: Option<usize>,
}

impl Bounds {
    /// Creates fully specified bounds.
    pub fn new(top: usize, left: usize, bottom: usize, right: usize) -> Self {
        Bounds {
            top: Some(top),
            left: Some(left),
            bottom: Some(bottom),
            right: Some(right),
        }
    }

    /// Checks that explicit far edges do not lie before explicit near edges.
    pub fn validate(&self) -> Result<(), RangeError> {
        let rows_ok = self.top.zip(self.bottom).map(|(top, bottom)| top <= bottom).unwrap_or(true);
        let cols_ok = self.left.zip(self.right).map(|(left, right)| left <= right).unwrap_or(true);
        if rows_ok && cols_ok {
            Ok(())
        } else {
            Err(RangeError::InvalidBounds {
                top: self.top.unwrap_or(0),
                left: self.left.unwrap_or(0),
                bottom: self.bottom.unwrap_or(0),
                right: self.right.unwrap_or(0),
            })
        }
    }

    /// Parses column letters to a 0-based column index: A = 0, Z = 25, AA = 26, ...
    /// No letters means no column.
    fn parse_column(letters: &str) -> Result<Option<usize>, RangeError> {
        if letters.is_empty() {
            return Ok(None);
        }
        letters
            .bytes()
            .try_fold(0usize, |index, letter| {
                index.checked_mul(26)?.checked_add(usize::from(letter - b'A') + 1)
            })
            .map(|column| Some(column - 1))
            .ok_or_else(|| RangeError::FormatError(letters.to_owned()))
    }

    /// Parses a 1-based row number to a 0-based row index. No digits means no row.
    fn parse_row(number: &str) -> Result<Option<usize>, RangeError> {
        if number.is_empty() {
            return Ok(None);
        }
        number
            .parse::<usize>()
            .ok()
            .filter(|row| *row > 0)
            .map(|row| Some(row - 1))
            .ok_or_else(|| RangeError::FormatError(number.to_owned()))
    }
}

impl TryFrom<&str> for Bounds {
    type Error = RangeError;

    /// Parses an A1-style range string (e.g. "B2:E6", "B2:", "A:C", "2:5", "C3").
    /// The end cell is inclusive, as in spreadsheet applications.
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let pattern = Regex::new(r"^([A-Z]*)([0-9]*)(:([A-Z]*)([0-9]*))?$").expect("Hardcode regex pattern");
        let value = value.trim().to_ascii_uppercase();
        let captures = pattern
            .captures(value.as_str())
            .filter(|_| !value.is_empty())
            .ok_or(RangeError::FormatError(value.to_owned()))?;
        let text = |index: usize| captures.get(index).map_or("", |matcher| matcher.as_str());
        let left = Self::parse_column(text(1))?;
        let top = Self::parse_row(text(2))?;
        let (right, bottom) = if captures.get(3).is_some() {
            (
                Self::parse_column(text(4))?.map(|col| col + 1),
                Self::parse_row(text(5))?.map(|row| row + 1),
            )
        } else {
            // Single cell or single column/row reference
            (left.map(|col| col + 1), top.map(|row| row + 1))
        };
        let bounds = Bounds { top, left, bottom, right };
        bounds.validate()?;
        Ok(bounds)
    }
}

/// A non-owning rectangular window over a grid.
///
/// Coordinates passed to [`CellRange::cell`] are relative to the window; the
/// window itself stores its absolute position in the grid so that nested
/// windows compose their offsets once, at construction.
#[derive(Copy, Clone)]
pub struct CellRange<'a> {
    grid: &'a dyn Grid,
    top: usize,
    left: usize,
    bottom: usize,
    right: usize,
}

impl<'a> CellRange<'a> {
    /// Creates a window covering the full extent of `grid`.
    pub fn new(grid: &'a dyn Grid) -> Self {
        CellRange {
            grid,
            top: 0,
            left: 0,
            bottom: grid.height(),
            right: grid.width(),
        }
    }

    /// Creates a window inside this one. `bounds` are relative to this window
    /// and may extend past its extent: the grid answers with empty cells there.
    pub fn sub_range(&self, bounds: Bounds) -> Result<CellRange<'a>, RangeError> {
        let top = bounds.top.unwrap_or(0);
        let left = bounds.left.unwrap_or(0);
        let bottom = bounds.bottom.unwrap_or(self.height());
        let right = bounds.right.unwrap_or(self.width());
        if bottom < top || right < left {
            return Err(RangeError::InvalidBounds { top, left, bottom, right });
        }
        Ok(CellRange {
            grid: self.grid,
            top: self.top + top,
            left: self.left + left,
            bottom: self.top + bottom,
            right: self.left + right,
        })
    }

    /// The underlying grid.
    pub fn grid(&self) -> &'a dyn Grid {
        self.grid
    }

    /// Absolute position in the grid as `(top, left, bottom, right)`.
    pub fn bounds(&self) -> (usize, usize, usize, usize) {
        (self.top, self.left, self.bottom, self.right)
    }

    pub fn width(&self) -> usize {
        self.right - self.left
    }

    pub fn height(&self) -> usize {
        self.bottom - self.top
    }

    /// Returns the cell at window-relative coordinates.
    pub fn cell(&self, row: usize, col: usize) -> Cell {
        self.grid.cell(self.top + row, self.left + col)
    }

    /// Returns true if the window-relative row is hidden in the grid.
    pub fn is_hidden_row(&self, row: usize) -> bool {
        self.grid.is_hidden_row(self.top + row)
    }

    /// Returns the line at `index` along `axis`.
    pub fn line(&self, axis: Axis, index: usize) -> CellLine<'a> {
        CellLine {
            range: *self,
            axis,
            index,
        }
    }

    pub fn row(&self, index: usize) -> CellLine<'a> {
        self.line(Axis::Rows, index)
    }

    pub fn column(&self, index: usize) -> CellLine<'a> {
        self.line(Axis::Columns, index)
    }

    /// Number of lines along `axis`.
    pub fn extent(&self, axis: Axis) -> usize {
        match axis {
            Axis::Rows => self.height(),
            Axis::Columns => self.width(),
        }
    }
}

impl Debug for CellRange<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellRange")
            .field("grid", &self.grid.name())
            .field("top", &self.top)
            .field("left", &self.left)
            .field("bottom", &self.bottom)
            .field("right", &self.right)
            .finish()
    }
}

/// A single row or column of a [`CellRange`].
#[derive(Copy, Clone, Debug)]
pub struct CellLine<'a> {
    range: CellRange<'a>,
    axis: Axis,
    index: usize,
}

impl<'a> CellLine<'a> {
    /// Orientation of the line.
    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// Position of the line inside its range.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of cells in the line.
    pub fn len(&self) -> usize {
        match self.axis {
            Axis::Rows => self.range.width(),
            Axis::Columns => self.range.height(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the cell at `position`; negative positions count from the end.
    pub fn get(&self, position: isize) -> Option<Cell> {
        let len = self.len() as isize;
        let position = if position < 0 { len + position } else { position };
        if (0..len).contains(&position) {
            Some(self.cell_at(position as usize))
        } else {
            None
        }
    }

    fn cell_at(&self, position: usize) -> Cell {
        match self.axis {
            Axis::Rows => self.range.cell(self.index, position),
            Axis::Columns => self.range.cell(position, self.index),
        }
    }

    /// Iterates over the cells of the line.
    pub fn iter(&self) -> impl Iterator<Item = Cell> + 'a {
        let line = *self;
        (0..line.len()).map(move |position| line.cell_at(position))
    }

    pub fn cells(&self) -> Vec<Cell> {
        self.iter().collect()
    }

    /// Raw values of the cells, merged cells included.
    pub fn values(&self) -> Vec<CellValue> {
        self.iter().map(|cell| cell.value).collect()
    }

    /// Returns true if every cell of the line is empty.
    pub fn is_blank(&self) -> bool {
        self.iter().all(|cell| cell.is_empty())
    }

    /// Returns true for hidden rows. Columns are never hidden.
    pub fn is_hidden(&self) -> bool {
        self.axis == Axis::Rows && self.range.is_hidden_row(self.index)
    }

    /// Area covered by the line, relative to its range, as `(top, left, bottom, right)`.
    pub fn extent(&self) -> (usize, usize, usize, usize) {
        match self.axis {
            Axis::Rows => (self.index, 0, self.index + 1, self.range.width()),
            Axis::Columns => (0, self.index, self.range.height(), self.index + 1),
        }
    }
}
