use crate::error::SheetParserError;
use crate::pattern::LineItems;
use crate::result::ResultTable;
use crate::spreadsheet::CellValue;
use crate::transform::{HeaderAxis, TableTransform, TransformError};
use chrono::format::{Parsed, StrftimeItems};
use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::Arc;

/// Splits the first lines of a table into top headers, and the first values
/// of every line into the corner block (for header lines) or left headers.
///
/// Header lines are consumed; body lines continue without their leading values.
#[derive(Copy, Clone, Debug)]
pub struct HeaderSplit {
    /// Number of header rows
    top: usize,
    /// Number of header columns
    left: usize,
    /// Lines seen so far by this table
    seen: usize,
    /// Shortest line seen so far
    narrowest: Option<usize>,
}

impl HeaderSplit {
    pub fn new(top: usize, left: usize) -> Self {
        HeaderSplit {
            top,
            left,
            seen: 0,
            narrowest: None,
        }
    }
}

impl Default for HeaderSplit {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl TableTransform for HeaderSplit {
    fn init(&mut self, table: &mut ResultTable) -> Result<(), SheetParserError> {
        self.seen = 0;
        self.narrowest = None;
        table.top_headers = Vec::new();
        table.left_headers = vec![Vec::new(); self.left];
        table.top_left = vec![Vec::new(); self.left];
        Ok(())
    }

    fn process_line(
        &mut self,
        table: &mut ResultTable,
        line: LineItems,
    ) -> Result<Option<LineItems>, SheetParserError> {
        let mut values = line.into_values();
        if values.is_empty() {
            return Ok(None);
        }
        self.narrowest = Some(self.narrowest.map_or(values.len(), |width| width.min(values.len())));
        let body = values.split_off(self.left.min(values.len()));
        let is_header = self.seen < self.top;
        self.seen += 1;
        let leading = if is_header {
            &mut table.top_left
        } else {
            &mut table.left_headers
        };
        for (header, value) in leading.iter_mut().zip(values) {
            header.push(value);
        }
        if is_header {
            table.top_headers.push(body);
            Ok(None)
        } else {
            Ok(Some(LineItems::Values(body)))
        }
    }

    fn wrap(&mut self, table: &mut ResultTable) -> Result<(), SheetParserError> {
        if table.top_headers.len() < self.top {
            return Err(TransformError::MissingHeaderRows {
                name: table.name.clone(),
                expected: self.top,
                found: table.top_headers.len(),
            }
            .into());
        }
        let found = self.narrowest.unwrap_or(0);
        if found < self.left {
            return Err(TransformError::MissingHeaderColumns {
                name: table.name.clone(),
                expected: self.left,
                found,
            }
            .into());
        }
        Ok(())
    }
}

/// Replaces empty values of header lines with the last non-empty value to
/// their left. Used for headers spread over merged cells.
#[derive(Clone, Debug, Default)]
pub struct FillHeaderBlanks {
    /// Header lines to fill, all of them when `None`
    indices: Option<Vec<usize>>,
    side: HeaderAxis,
}

impl FillHeaderBlanks {
    /// Fills every top header line.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(mut self, indices: Vec<usize>) -> Self {
        self.indices = Some(indices);
        self
    }

    pub fn on(mut self, side: HeaderAxis) -> Self {
        self.side = side;
        self
    }
}

impl TableTransform for FillHeaderBlanks {
    fn wrap(&mut self, table: &mut ResultTable) -> Result<(), SheetParserError> {
        let len = self.side.headers_mut(table).len();
        let indices = self.indices.clone().unwrap_or_else(|| (0..len).collect());
        if let Some(&index) = indices.iter().find(|&&index| index >= len) {
            return Err(self.side.index_error(table, index, len).into());
        }
        let headers = self.side.headers_mut(table);
        for index in indices {
            let mut current = CellValue::Empty;
            for value in headers[index].iter_mut() {
                if value.is_empty() {
                    *value = current.clone();
                } else {
                    current = value.clone();
                }
            }
        }
        Ok(())
    }
}

/// Joins several header lines into one, position by position.
///
/// The joined line comes first, followed by the lines left out of the merge.
#[derive(Clone, Debug)]
pub struct MergeHeaderRows {
    ids: Vec<usize>,
    join: String,
    side: HeaderAxis,
}

impl MergeHeaderRows {
    pub fn new(ids: Vec<usize>, join: &str, side: HeaderAxis) -> Result<Self, SheetParserError> {
        if ids.is_empty() {
            return Err(SheetParserError::configuration("MergeHeaderRows needs at least one header line"));
        }
        let unique: HashSet<&usize> = ids.iter().collect();
        if unique.len() != ids.len() {
            return Err(SheetParserError::configuration(format!(
                "MergeHeaderRows got duplicate header lines {ids:?}"
            )));
        }
        Ok(MergeHeaderRows {
            ids,
            join: join.to_owned(),
            side,
        })
    }
}

impl TableTransform for MergeHeaderRows {
    fn wrap(&mut self, table: &mut ResultTable) -> Result<(), SheetParserError> {
        let len = self.side.headers_mut(table).len();
        if let Some(&index) = self.ids.iter().find(|&&index| index >= len) {
            return Err(self.side.index_error(table, index, len).into());
        }
        let headers = std::mem::take(self.side.headers_mut(table));
        let selected: Vec<&Vec<CellValue>> = self.ids.iter().map(|&index| &headers[index]).collect();
        let width = selected.iter().map(|line| line.len()).min().unwrap_or(0);
        let joined = (0..width)
            .map(|position| {
                let parts: Vec<String> = selected.iter().map(|line| line[position].to_string()).collect();
                CellValue::Text(parts.join(&self.join))
            })
            .collect();
        let mut merged = vec![joined];
        merged.extend(
            headers
                .iter()
                .enumerate()
                .filter(|(index, _)| !self.ids.contains(index))
                .map(|(_, line)| line.clone()),
        );
        *self.side.headers_mut(table) = merged;
        Ok(())
    }
}

/// Reduces the header blocks to the given lines, in the given order.
#[derive(Clone, Debug, Default)]
pub struct KeepOnlyHeaders {
    top: Option<Vec<usize>>,
    left: Option<Vec<usize>>,
}

impl KeepOnlyHeaders {
    pub fn new(top: Option<Vec<usize>>, left: Option<Vec<usize>>) -> Self {
        KeepOnlyHeaders { top, left }
    }

    fn keep(table: &mut ResultTable, side: HeaderAxis, indices: &[usize]) -> Result<(), SheetParserError> {
        let len = side.headers_mut(table).len();
        if let Some(&index) = indices.iter().find(|&&index| index >= len) {
            return Err(side.index_error(table, index, len).into());
        }
        let headers = side.headers_mut(table);
        *headers = indices.iter().map(|&index| headers[index].clone()).collect();
        Ok(())
    }
}

impl TableTransform for KeepOnlyHeaders {
    fn wrap(&mut self, table: &mut ResultTable) -> Result<(), SheetParserError> {
        if let Some(indices) = &self.top {
            Self::keep(table, HeaderAxis::Top, indices)?;
        }
        if let Some(indices) = &self.left {
            Self::keep(table, HeaderAxis::Left, indices)?;
        }
        Ok(())
    }
}

/// How `ParseDate` turns header text into dates.
#[derive(Clone)]
pub enum DateParser {
    /// strftime formats, tried in order
    Formats(Vec<String>),
    /// A custom parser; an error leaves the text unchanged
    Custom(Arc<dyn Fn(&str) -> anyhow::Result<NaiveDateTime> + Send + Sync>),
}

impl Debug for DateParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateParser::Formats(formats) => f.debug_tuple("Formats").field(formats).finish(),
            DateParser::Custom(_) => f.write_str("Custom"),
        }
    }
}

impl DateParser {
    fn parse(&self, text: &str) -> Option<NaiveDateTime> {
        match self {
            DateParser::Formats(formats) => formats.iter().find_map(|format| parse_with_format(text, format)),
            DateParser::Custom(parser) => parser(text).ok(),
        }
    }
}

/// Parses `text` with a strftime format; missing fields default to the first
/// day of the first month at midnight.
fn parse_with_format(text: &str, format: &str) -> Option<NaiveDateTime> {
    let mut parsed = Parsed::new();
    chrono::format::parse(&mut parsed, text, StrftimeItems::new(format)).ok()?;
    // Setters keep a value the format already provided
    let _ = parsed.set_month(1);
    let _ = parsed.set_day(1);
    let _ = parsed.set_hour(0);
    let _ = parsed.set_minute(0);
    let _ = parsed.set_second(0);
    parsed.to_naive_datetime_with_offset(0).ok()
}

/// Replaces the text values of one header line with dates, in place.
/// Values no parser accepts are left unchanged.
#[derive(Clone, Debug)]
pub struct ParseDate {
    index: usize,
    parser: DateParser,
    side: HeaderAxis,
}

impl ParseDate {
    /// Parses header line `index` with a single strftime format.
    pub fn new(index: usize, format: &str) -> Self {
        Self::with_formats(index, vec![format.to_owned()])
    }

    /// Parses header line `index` with the first format that accepts each value.
    pub fn with_formats(index: usize, formats: Vec<String>) -> Self {
        ParseDate {
            index,
            parser: DateParser::Formats(formats),
            side: HeaderAxis::Top,
        }
    }

    /// Parses header line `index` with a custom parser.
    pub fn with_parser<F>(index: usize, parser: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<NaiveDateTime> + Send + Sync + 'static,
    {
        ParseDate {
            index,
            parser: DateParser::Custom(Arc::new(parser)),
            side: HeaderAxis::Top,
        }
    }

    pub fn on(mut self, side: HeaderAxis) -> Self {
        self.side = side;
        self
    }
}

impl TableTransform for ParseDate {
    fn wrap(&mut self, table: &mut ResultTable) -> Result<(), SheetParserError> {
        let len = self.side.headers_mut(table).len();
        if self.index >= len {
            return Err(self.side.index_error(table, self.index, len).into());
        }
        for value in self.side.headers_mut(table)[self.index].iter_mut() {
            let date = value.as_text().and_then(|text| self.parser.parse(text));
            if let Some(date) = date {
                *value = CellValue::Date(date);
            }
        }
        Ok(())
    }
}
