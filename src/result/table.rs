use crate::spreadsheet::CellValue;
use crate::transform::TransformError;
use indexmap::IndexMap;

/// Body of a table: a grid of rows until `ToMap` turns it into a mapping.
#[derive(Clone, Debug, PartialEq)]
pub enum TableData {
    /// Rows of values
    Grid(Vec<Vec<CellValue>>),
    /// Header tuple (left headers then top headers) to cell value
    Map(IndexMap<Vec<CellValue>, CellValue>),
}

impl Default for TableData {
    fn default() -> Self {
        TableData::Grid(Vec::new())
    }
}

impl TableData {
    pub fn len(&self) -> usize {
        match self {
            TableData::Grid(rows) => rows.len(),
            TableData::Map(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_grid(&self) -> Option<&Vec<Vec<CellValue>>> {
        match self {
            TableData::Grid(rows) => Some(rows),
            TableData::Map(_) => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<Vec<CellValue>, CellValue>> {
        match self {
            TableData::Map(map) => Some(map),
            TableData::Grid(_) => None,
        }
    }
}

/// Accumulator of a matched `Table`, shaped by its transform pipeline.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultTable {
    /// Name of the table pattern
    pub name: String,
    /// Table body
    pub data: TableData,
    /// Header rows above the body, one list per header row
    pub top_headers: Vec<Vec<CellValue>>,
    /// Header columns left of the body, one list per header column
    pub left_headers: Vec<Vec<CellValue>>,
    /// Corner block, one list per header column, holding the header-row values
    pub top_left: Vec<Vec<CellValue>>,
    /// Number of lines read by the table so far
    pub count: usize,
}

impl ResultTable {
    pub fn new(name: &str) -> Self {
        ResultTable {
            name: name.to_owned(),
            ..Self::default()
        }
    }

    /// Body rows, or `None` once the body is a mapping.
    pub fn rows(&self) -> Option<&Vec<Vec<CellValue>>> {
        self.data.as_grid()
    }

    /// Mutable body rows; fails once the body is a mapping.
    pub fn rows_mut(&mut self) -> Result<&mut Vec<Vec<CellValue>>, TransformError> {
        match &mut self.data {
            TableData::Grid(rows) => Ok(rows),
            TableData::Map(_) => Err(TransformError::NotAGrid(self.name.clone())),
        }
    }
}
