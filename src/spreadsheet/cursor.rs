use crate::error::SheetParserError;
use crate::spreadsheet::range::{Axis, CellLine, CellRange};
use crate::spreadsheet::RangeError;
use std::ops::{Deref, DerefMut};

/// How a range is walked by the line-level patterns matched against it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Layout {
    /// Row by row, top to bottom
    #[default]
    Rows,
    /// Column by column, left to right
    Columns,
    /// Row by row, transparently skipping hidden rows
    VisibleRows,
}

impl Layout {
    /// Creates a cursor over `range` walking it in this layout.
    pub fn cursor<'a>(&self, range: CellRange<'a>) -> Cursor<'a> {
        match self {
            Layout::Rows => Cursor::new(range, Axis::Rows),
            Layout::Columns => Cursor::new(range, Axis::Columns),
            Layout::VisibleRows => Cursor::new(range, Axis::Rows).skip_hidden(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Layout::Rows => "rows",
            Layout::Columns => "columns",
            Layout::VisibleRows => "visible_rows",
        }
    }
}

impl TryFrom<&str> for Layout {
    type Error = SheetParserError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_ascii_lowercase().as_str() {
            "rows" => Ok(Layout::Rows),
            "columns" => Ok(Layout::Columns),
            "visible_rows" | "visible" => Ok(Layout::VisibleRows),
            _ => Err(SheetParserError::configuration(format!(
                "layout must be one of 'rows', 'columns' or 'visible_rows' - got '{value}'"
            ))),
        }
    }
}

/// Position of a reader over the lines of a range.
///
/// The only mutable state is the line index, which makes saving and restoring
/// a position trivial: see [`Cursor::begin_scope`] and [`Cursor::rollback_if_fail`].
#[derive(Copy, Clone, Debug)]
pub struct Cursor<'a> {
    range: CellRange<'a>,
    axis: Axis,
    skip_hidden: bool,
    index: usize,
}

impl<'a> Cursor<'a> {
    /// Creates a cursor at the first line of `range`.
    pub fn new(range: CellRange<'a>, axis: Axis) -> Self {
        Cursor {
            range,
            axis,
            skip_hidden: false,
            index: 0,
        }
    }

    /// Makes the cursor step over hidden rows. No effect on column cursors.
    pub fn skip_hidden(mut self) -> Self {
        self.skip_hidden = self.axis == Axis::Rows;
        self
    }

    pub fn range(&self) -> CellRange<'a> {
        self.range
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// Index in the range of the line after the last one consumed. Hidden rows
    /// count like any other line, so a skipping cursor may report the index of
    /// a hidden row that the next `advance` will step over.
    pub fn position(&self) -> usize {
        self.index
    }

    fn next_visible(&self) -> usize {
        let extent = self.range.extent(self.axis);
        let mut index = self.index;
        while self.skip_hidden && index < extent && self.range.is_hidden_row(index) {
            index += 1;
        }
        index
    }

    /// Returns true if no lines are left to read.
    pub fn is_complete(&self) -> bool {
        self.next_visible() >= self.range.extent(self.axis)
    }

    /// Returns the next line without consuming it.
    pub fn peek(&self) -> Option<CellLine<'a>> {
        let index = self.next_visible();
        (index < self.range.extent(self.axis)).then(|| self.range.line(self.axis, index))
    }

    /// Consumes and returns the next line. Fails with the current
    /// [`Cursor::position`] once no visible line is left.
    pub fn advance(&mut self) -> Result<CellLine<'a>, RangeError> {
        let index = self.next_visible();
        if index >= self.range.extent(self.axis) {
            return Err(RangeError::Exhausted(self.index));
        }
        self.index = index + 1;
        Ok(self.range.line(self.axis, index))
    }

    /// Saves the current position. The position is restored when the returned
    /// scope is dropped, unless [`RollbackScope::commit`] was called first.
    pub fn begin_scope(&mut self) -> RollbackScope<'_, 'a> {
        RollbackScope {
            saved: self.index,
            cursor: self,
            committed: false,
        }
    }

    /// Runs `body` and restores the position if it fails.
    pub fn rollback_if_fail<T, E, F>(&mut self, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut Cursor<'a>) -> Result<T, E>,
    {
        let mut scope = self.begin_scope();
        let result = body(&mut *scope);
        if result.is_ok() {
            scope.commit();
        }
        result
    }
}

/// A saved cursor position, restored on drop unless committed.
pub struct RollbackScope<'c, 'a> {
    cursor: &'c mut Cursor<'a>,
    saved: usize,
    committed: bool,
}

impl RollbackScope<'_, '_> {
    /// Keeps the lines consumed inside the scope.
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl<'a> Deref for RollbackScope<'_, 'a> {
    type Target = Cursor<'a>;

    fn deref(&self) -> &Self::Target {
        self.cursor
    }
}

impl DerefMut for RollbackScope<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.cursor
    }
}

impl Drop for RollbackScope<'_, '_> {
    fn drop(&mut self) {
        if !self.committed {
            self.cursor.index = self.saved;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::array::ArraySheet;
    use crate::spreadsheet::cell::CellValue;
    use proptest::prelude::*;

    fn sheet(rows: usize, cols: usize) -> ArraySheet {
        ArraySheet::new(
            "sheet",
            (0..rows)
                .map(|row| (0..cols).map(|col| CellValue::from((row * cols + col) as i64)).collect())
                .collect(),
        )
    }

    #[test]
    fn walks_rows_then_completes() {
        let sheet = sheet(2, 3);
        let mut cursor = Cursor::new(CellRange::new(&sheet), Axis::Rows);
        assert_eq!(cursor.advance().unwrap().index(), 0);
        assert_eq!(cursor.peek().unwrap().index(), 1);
        assert_eq!(cursor.advance().unwrap().index(), 1);
        assert!(cursor.is_complete());
        assert!(cursor.peek().is_none());
        assert!(matches!(cursor.advance(), Err(RangeError::Exhausted(2))));
    }

    #[test]
    fn walks_columns() {
        let sheet = sheet(2, 3);
        let mut cursor = Layout::Columns.cursor(CellRange::new(&sheet));
        let column = cursor.advance().unwrap();
        assert_eq!(column.values(), vec![CellValue::from(0), CellValue::from(3)]);
        cursor.advance().unwrap();
        cursor.advance().unwrap();
        assert!(cursor.is_complete());
    }

    #[test]
    fn visible_rows_skip_hidden() {
        let sheet = sheet(4, 1).hide_row(0).hide_row(2);
        let mut cursor = Layout::VisibleRows.cursor(CellRange::new(&sheet));
        assert_eq!(cursor.advance().unwrap().index(), 1);
        assert_eq!(cursor.advance().unwrap().index(), 3);
        assert!(cursor.is_complete());

        let mut cursor = Layout::Rows.cursor(CellRange::new(&sheet));
        assert_eq!(cursor.advance().unwrap().index(), 0);
    }

    #[test]
    fn hidden_tail_completes_cursor() {
        let sheet = sheet(3, 1).hide_row(1).hide_row(2);
        let mut cursor = Layout::VisibleRows.cursor(CellRange::new(&sheet));
        cursor.advance().unwrap();
        assert!(cursor.is_complete());
        assert_eq!(cursor.position(), 1);
        assert!(matches!(cursor.advance(), Err(RangeError::Exhausted(1))));
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn scope_restores_on_drop() {
        let sheet = sheet(3, 1);
        let mut cursor = Cursor::new(CellRange::new(&sheet), Axis::Rows);
        {
            let mut scope = cursor.begin_scope();
            scope.advance().unwrap();
            scope.advance().unwrap();
        }
        assert_eq!(cursor.position(), 0);
        {
            let mut scope = cursor.begin_scope();
            scope.advance().unwrap();
            scope.commit();
        }
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn layout_from_str() {
        assert_eq!(Layout::try_from("visible_rows").unwrap(), Layout::VisibleRows);
        assert_eq!(Layout::try_from(Layout::Columns.as_str()).unwrap(), Layout::Columns);
        assert!(Layout::try_from("spiral").is_err());
    }

    proptest! {
        #[test]
        fn failed_bodies_leave_position_unchanged(start in 0usize..6, steps in 0usize..10) {
            let sheet = sheet(6, 2);
            let mut cursor = Cursor::new(CellRange::new(&sheet), Axis::Rows);
            for _ in 0..start {
                cursor.advance().unwrap();
            }
            let result: Result<(), RangeError> = cursor.rollback_if_fail(|cursor| {
                for _ in 0..steps {
                    cursor.advance()?;
                }
                Err(RangeError::Exhausted(usize::MAX))
            });
            prop_assert!(result.is_err());
            prop_assert_eq!(cursor.position(), start);
        }

        #[test]
        fn successful_bodies_keep_consumed_lines(steps in 0usize..6) {
            let sheet = sheet(6, 2);
            let mut cursor = Cursor::new(CellRange::new(&sheet), Axis::Rows);
            let consumed = cursor.rollback_if_fail(|cursor| {
                (0..steps).map(|_| cursor.advance().map(|line| line.index())).collect::<Result<Vec<_>, _>>()
            }).unwrap();
            prop_assert_eq!(consumed.len(), steps);
            prop_assert_eq!(cursor.position(), steps);
        }
    }
}
