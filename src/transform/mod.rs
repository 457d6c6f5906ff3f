//! # Table Transform Module
//!
//! Transforms shape the lines read by a `Table` pattern into headers and a
//! body. Each transform sees every accepted line through
//! [`TableTransform::process_line`], in pipeline order, and gets a final
//! [`TableTransform::wrap`] call once the table is closed. A transform that
//! returns `None` from `process_line` consumes the line: later transforms do
//! not see it.
use crate::error::SheetParserError;
use crate::pattern::LineItems;
use crate::result::ResultTable;
use crate::spreadsheet::CellValue;
use std::fmt::Debug;
use std::sync::Arc;
use thiserror::Error;

pub mod basic;
pub mod header;
pub mod shape;

pub use basic::{FillData, NonEmptyGuard, ValueExtraction, VetoIf};
pub use header::{FillHeaderBlanks, HeaderSplit, KeepOnlyHeaders, MergeHeaderRows, ParseDate};
pub use shape::{RemoveEmptyLines, ToMap, Transpose};

/// Errors raised while shaping a table.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Table '{0}' has no data")]
    EmptyTable(String),

    #[error("Table '{name}' has {found} header rows, expected {expected}")]
    MissingHeaderRows {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Table '{name}' has {found} header columns, expected {expected}")]
    MissingHeaderColumns {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Header index {index} out of range for the {side} headers of '{name}' ({len} lines)")]
    HeaderIndex {
        name: String,
        side: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Table '{0}' data is a map, not a grid")]
    NotAGrid(String),
}

/// Which header block a header transform works on.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum HeaderAxis {
    /// Header rows above the body
    #[default]
    Top,
    /// Header columns left of the body
    Left,
}

impl HeaderAxis {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeaderAxis::Top => "top",
            HeaderAxis::Left => "left",
        }
    }

    /// Selects the header block of `table` this axis refers to.
    pub fn headers_mut<'t>(&self, table: &'t mut ResultTable) -> &'t mut Vec<Vec<CellValue>> {
        match self {
            HeaderAxis::Top => &mut table.top_headers,
            HeaderAxis::Left => &mut table.left_headers,
        }
    }

    /// Error for an out-of-range header line.
    pub(crate) fn index_error(&self, table: &ResultTable, index: usize, len: usize) -> TransformError {
        TransformError::HeaderIndex {
            name: table.name.clone(),
            side: self.as_str(),
            index,
            len,
        }
    }
}

impl TryFrom<&str> for HeaderAxis {
    type Error = SheetParserError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_ascii_lowercase().as_str() {
            "top" => Ok(HeaderAxis::Top),
            "left" => Ok(HeaderAxis::Left),
            _ => Err(SheetParserError::configuration(format!(
                "header axis must be 'top' or 'left' - got '{value}'"
            ))),
        }
    }
}

/// A stage of a table's pipeline. A fresh instance is created for every table match.
pub trait TableTransform: Send {
    /// Called once when the table frame is opened.
    fn init(&mut self, _table: &mut ResultTable) -> Result<(), SheetParserError> {
        Ok(())
    }

    /// Called for every line read by the table. Returning `None` vetoes the line
    /// for the remaining transforms.
    fn process_line(
        &mut self,
        _table: &mut ResultTable,
        line: LineItems,
    ) -> Result<Option<LineItems>, SheetParserError> {
        Ok(Some(line))
    }

    /// Called once the table has stopped reading lines.
    fn wrap(&mut self, _table: &mut ResultTable) -> Result<(), SheetParserError> {
        Ok(())
    }
}

type TransformFactory = Arc<dyn Fn() -> Box<dyn TableTransform> + Send + Sync>;

/// Ordered list of transforms run by a table.
#[derive(Clone)]
pub struct Pipeline {
    factories: Vec<TransformFactory>,
}

impl Pipeline {
    /// Creates an empty pipeline: every line is read and nothing is stored.
    pub fn new() -> Self {
        Pipeline { factories: Vec::new() }
    }

    /// The conventional pipeline: values, one header row and one header column,
    /// body rows, and a guard against empty tables.
    pub fn conventional() -> Self {
        Self::new()
            .then(ValueExtraction::default())
            .then(HeaderSplit::new(1, 1))
            .then(FillData)
            .then(NonEmptyGuard)
    }

    /// Appends a transform. Each table match works on its own clone.
    pub fn then<T>(mut self, transform: T) -> Self
    where
        T: TableTransform + Clone + Sync + 'static,
    {
        self.factories.push(Arc::new(move || Box::new(transform.clone()) as Box<dyn TableTransform>));
        self
    }

    /// Appends a transform created by `factory` for every table match.
    pub fn then_with<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn TableTransform> + Send + Sync + 'static,
    {
        self.factories.push(Arc::new(factory));
        self
    }

    /// Creates the transforms for one table match.
    pub fn instantiate(&self) -> Vec<Box<dyn TableTransform>> {
        self.factories.iter().map(|factory| factory()).collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::conventional()
    }
}

impl Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Pipeline({} transforms)", self.factories.len())
    }
}

/// Swaps rows and columns of a list of lists, truncating to the shortest list.
pub(crate) fn transpose<T: Clone>(lines: &[Vec<T>]) -> Vec<Vec<T>> {
    let width = lines.iter().map(Vec::len).min().unwrap_or(0);
    (0..width)
        .map(|col| lines.iter().map(|line| line[col].clone()).collect())
        .collect()
}
