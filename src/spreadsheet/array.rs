use crate::error::SheetParserError;
use crate::spreadsheet::cell::{Cell, CellValue};
use crate::spreadsheet::{Grid, WorkbookDocument};
use chrono::NaiveDate;
use std::collections::HashSet;

/// An in-memory sheet built from rows of values.
///
/// Rows may be ragged: cells past the end of a row, or past the last row,
/// read as neutral empty cells.
#[derive(Clone, Debug, Default)]
pub struct ArraySheet {
    /// Sheet name
    name: String,
    /// Cells, row by row
    rows: Vec<Vec<Cell>>,
    /// Length of the longest row
    width: usize,
    /// Whether the whole sheet is hidden
    hidden: bool,
    /// Indices of hidden rows
    hidden_rows: HashSet<usize>,
}

impl ArraySheet {
    /// Creates a sheet from rows of values. Empty strings become the empty sentinel.
    pub fn new(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(Self::normalize).map(Cell::new).collect())
            .collect();
        Self::from_cells(name, rows)
    }

    /// Creates a sheet from rows of fully described cells.
    pub fn from_cells(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        ArraySheet {
            name: name.into(),
            rows,
            width,
            hidden: false,
            hidden_rows: HashSet::new(),
        }
    }

    /// Parses delimited text held in memory, one row per record.
    ///
    /// Fields may be quoted to hold delimiters or line breaks. Blank lines
    /// become empty rows. Numbers, `true`/`false` and ISO dates (`YYYY-MM-DD`)
    /// are converted to typed values; everything else stays text.
    pub fn from_delimited(
        name: impl Into<String>,
        text: &str,
        delimiter: char,
    ) -> Result<Self, SheetParserError> {
        let delimiter = u8::try_from(delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| SheetParserError::configuration(format!("Delimiter '{delimiter}' is not ASCII")))?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());
        let mut records = reader.records();
        let mut rows = Vec::new();
        // The reader skips blank lines, so they are put back from the raw text
        for blank in Self::blank_records(text) {
            if blank {
                rows.push(Vec::new());
                continue;
            }
            match records.next() {
                Some(record) => rows.push(record?.iter().map(Self::parse_value).collect()),
                None => break,
            }
        }
        Ok(Self::new(name, rows))
    }

    /// Flags every record of `text` as blank or not. Line breaks inside a
    /// quoted field do not start a record.
    fn blank_records(text: &str) -> Vec<bool> {
        let mut blanks = Vec::new();
        let mut quoted = false;
        for line in text.lines() {
            if !quoted {
                blanks.push(line.is_empty());
            }
            quoted ^= line.matches('"').count() % 2 == 1;
        }
        blanks
    }

    fn parse_value(text: &str) -> CellValue {
        let text = text.trim();
        if text.is_empty() {
            CellValue::Empty
        } else if text.eq_ignore_ascii_case("true") {
            CellValue::Boolean(true)
        } else if text.eq_ignore_ascii_case("false") {
            CellValue::Boolean(false)
        } else if let Some(number) = text.parse::<f64>().ok().filter(|number| number.is_finite()) {
            CellValue::Number(number)
        } else if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            CellValue::from(date)
        } else {
            CellValue::from(text)
        }
    }

    fn normalize(value: CellValue) -> CellValue {
        match value {
            CellValue::Text(text) if text.is_empty() => CellValue::Empty,
            value => value,
        }
    }

    fn cell_mut(&mut self, row: usize, col: usize) -> &mut Cell {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize_with(col + 1, Cell::empty);
        }
        self.width = self.width.max(col + 1);
        &mut cells[col]
    }

    /// Marks the whole sheet as hidden.
    pub fn hide(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Marks a row as hidden.
    pub fn hide_row(mut self, row: usize) -> Self {
        self.hidden_rows.insert(row);
        self
    }

    /// Replaces the cell at the given coordinates, growing the sheet if needed.
    pub fn set(mut self, row: usize, col: usize, cell: Cell) -> Self {
        *self.cell_mut(row, col) = cell;
        self
    }

    /// Adds border bits to every cell of `[top, bottom) x [left, right)`.
    pub fn set_borders(mut self, top: usize, left: usize, bottom: usize, right: usize, mask: u8) -> Self {
        for row in top..bottom {
            for col in left..right {
                self.cell_mut(row, col).border_mask |= mask;
            }
        }
        self
    }

    /// Sets the fill of a single cell.
    pub fn fill(mut self, row: usize, col: usize, fill: impl Into<String>) -> Self {
        self.cell_mut(row, col).fill = Some(fill.into());
        self
    }

    /// Merges `[top, bottom) x [left, right)`: the top-left cell keeps its value,
    /// every other cell becomes a merged empty cell.
    pub fn merge(mut self, top: usize, left: usize, bottom: usize, right: usize) -> Self {
        for row in top..bottom {
            for col in left..right {
                if (row, col) != (top, left) {
                    let cell = self.cell_mut(row, col);
                    cell.value = CellValue::Empty;
                    cell.is_merged = true;
                }
            }
        }
        self
    }
}

impl Grid for ArraySheet {
    fn height(&self) -> usize {
        self.rows.len()
    }

    fn width(&self) -> usize {
        self.width
    }

    fn cell(&self, row: usize, col: usize) -> Cell {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .cloned()
            .unwrap_or_default()
    }

    fn is_hidden(&self) -> bool {
        self.hidden
    }

    fn is_hidden_row(&self, row: usize) -> bool {
        self.hidden_rows.contains(&row)
    }

    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

/// An in-memory workbook: sheets in declaration order.
#[derive(Clone, Debug, Default)]
pub struct ArrayWorkbook {
    sheets: Vec<ArraySheet>,
}

impl ArrayWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sheet.
    pub fn with_sheet(mut self, sheet: ArraySheet) -> Self {
        self.sheets.push(sheet);
        self
    }

    pub fn sheets(&self) -> &[ArraySheet] {
        &self.sheets
    }
}

impl FromIterator<ArraySheet> for ArrayWorkbook {
    fn from_iter<T: IntoIterator<Item = ArraySheet>>(iter: T) -> Self {
        ArrayWorkbook {
            sheets: iter.into_iter().collect(),
        }
    }
}

impl WorkbookDocument for ArrayWorkbook {
    fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    fn sheet_at(&self, index: usize) -> Option<&dyn Grid> {
        self.sheets.get(index).map(|sheet| sheet as &dyn Grid)
    }
}
