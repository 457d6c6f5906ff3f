use crate::error::SheetParserError;
use crate::pattern::LineItems;
use crate::result::ResultTable;
use crate::spreadsheet::CellValue;
use crate::transform::{TableTransform, TransformError};
use std::fmt::Debug;
use std::sync::Arc;

/// Turns lines of cells into lines of values.
#[derive(Copy, Clone, Debug, Default)]
pub struct ValueExtraction {
    /// Keep the raw value of merged cells instead of the empty sentinel
    pub keep_merged: bool,
}

impl ValueExtraction {
    pub fn keep_merged() -> Self {
        ValueExtraction { keep_merged: true }
    }
}

impl TableTransform for ValueExtraction {
    fn process_line(
        &mut self,
        _table: &mut ResultTable,
        line: LineItems,
    ) -> Result<Option<LineItems>, SheetParserError> {
        let values = match line {
            LineItems::Cells(cells) if self.keep_merged => cells.into_iter().map(|cell| cell.value).collect(),
            line => line.into_values(),
        };
        Ok(Some(LineItems::Values(values)))
    }
}

/// Drops the lines for which the predicate holds.
#[derive(Clone)]
pub struct VetoIf {
    predicate: Arc<dyn Fn(&LineItems) -> bool + Send + Sync>,
}

impl VetoIf {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&LineItems) -> bool + Send + Sync + 'static,
    {
        VetoIf {
            predicate: Arc::new(predicate),
        }
    }
}

impl Debug for VetoIf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("VetoIf")
    }
}

impl TableTransform for VetoIf {
    fn process_line(
        &mut self,
        _table: &mut ResultTable,
        line: LineItems,
    ) -> Result<Option<LineItems>, SheetParserError> {
        Ok(if (self.predicate)(&line) { None } else { Some(line) })
    }
}

/// Appends every line reaching it to the table body.
#[derive(Copy, Clone, Debug, Default)]
pub struct FillData;

impl TableTransform for FillData {
    fn process_line(
        &mut self,
        table: &mut ResultTable,
        line: LineItems,
    ) -> Result<Option<LineItems>, SheetParserError> {
        let values: Vec<CellValue> = line.into_values();
        table.rows_mut()?.push(values);
        Ok(None)
    }
}

/// Vetoes blank lines and fails tables whose body ends up empty.
#[derive(Copy, Clone, Debug, Default)]
pub struct NonEmptyGuard;

impl TableTransform for NonEmptyGuard {
    fn process_line(
        &mut self,
        _table: &mut ResultTable,
        line: LineItems,
    ) -> Result<Option<LineItems>, SheetParserError> {
        Ok(if line.is_blank() { None } else { Some(line) })
    }

    fn wrap(&mut self, table: &mut ResultTable) -> Result<(), SheetParserError> {
        if table.data.is_empty() {
            return Err(TransformError::EmptyTable(table.name.clone()).into());
        }
        Ok(())
    }
}
