use crate::error::SheetParserError;
use crate::result::{ResultTable, TableData};
use crate::spreadsheet::{Axis, CellValue};
use crate::transform::{transpose, TableTransform};
use indexmap::IndexMap;

/// Swaps rows and columns of the body, and top and left headers.
#[derive(Copy, Clone, Debug, Default)]
pub struct Transpose;

impl Transpose {
    fn apply(table: &mut ResultTable) -> Result<(), SheetParserError> {
        let rows = table.rows_mut()?;
        *rows = transpose(rows);
        std::mem::swap(&mut table.top_headers, &mut table.left_headers);
        Ok(())
    }
}

impl TableTransform for Transpose {
    fn wrap(&mut self, table: &mut ResultTable) -> Result<(), SheetParserError> {
        Self::apply(table)
    }
}

/// Drops body rows, or body columns, holding only empty values.
/// Left headers follow the rows they label.
#[derive(Copy, Clone, Debug, Default)]
pub struct RemoveEmptyLines {
    axis: Axis,
}

impl RemoveEmptyLines {
    pub fn new(axis: Axis) -> Self {
        RemoveEmptyLines { axis }
    }

    pub fn rows() -> Self {
        Self::new(Axis::Rows)
    }

    pub fn columns() -> Self {
        Self::new(Axis::Columns)
    }

    fn remove_empty_rows(table: &mut ResultTable) -> Result<(), SheetParserError> {
        let rows = table.rows_mut()?;
        let kept: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.iter().any(|value| !value.is_empty()))
            .map(|(index, _)| index)
            .collect();
        *rows = kept.iter().map(|&index| rows[index].clone()).collect();
        for header in table.left_headers.iter_mut() {
            *header = kept.iter().filter_map(|&index| header.get(index).cloned()).collect();
        }
        Ok(())
    }
}

impl TableTransform for RemoveEmptyLines {
    fn wrap(&mut self, table: &mut ResultTable) -> Result<(), SheetParserError> {
        match self.axis {
            Axis::Rows => Self::remove_empty_rows(table),
            Axis::Columns => {
                Transpose::apply(table)?;
                Self::remove_empty_rows(table)?;
                Transpose::apply(table)
            }
        }
    }
}

/// Turns the body into a mapping keyed by the left header values of each row
/// followed by the top header values of each column. Missing header values
/// read as the empty sentinel.
#[derive(Copy, Clone, Debug, Default)]
pub struct ToMap;

impl TableTransform for ToMap {
    fn wrap(&mut self, table: &mut ResultTable) -> Result<(), SheetParserError> {
        let rows = std::mem::take(table.rows_mut()?);
        let header_at = |headers: &Vec<Vec<CellValue>>, index: usize| -> Vec<CellValue> {
            headers
                .iter()
                .map(|line| line.get(index).cloned().unwrap_or_default())
                .collect()
        };
        let mut map = IndexMap::new();
        for (row_index, row) in rows.into_iter().enumerate() {
            let lefts = header_at(&table.left_headers, row_index);
            for (col_index, value) in row.into_iter().enumerate() {
                let mut key = lefts.clone();
                key.extend(header_at(&table.top_headers, col_index));
                map.insert(key, value);
            }
        }
        table.data = TableData::Map(map);
        Ok(())
    }
}
