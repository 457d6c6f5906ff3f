use crate::error::{ResultMessage, SheetParserError};
use crate::result::{FrameKind, ResultContext};
use crate::spreadsheet::{Cell, CellValue, Cursor};
use regex::Regex;
use std::fmt::Debug;
use std::sync::Arc;

/// Content of a line while it flows through line or table transforms.
#[derive(Clone, Debug, PartialEq)]
pub enum LineItems {
    /// Cells as read from the grid
    Cells(Vec<Cell>),
    /// Values, once extracted
    Values(Vec<CellValue>),
}

impl LineItems {
    pub fn len(&self) -> usize {
        match self {
            LineItems::Cells(cells) => cells.len(),
            LineItems::Values(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if every item is empty. Merged cells count as empty.
    pub fn is_blank(&self) -> bool {
        match self {
            LineItems::Cells(cells) => cells.iter().all(|cell| cell.effective_value().is_empty()),
            LineItems::Values(values) => values.iter().all(CellValue::is_empty),
        }
    }

    /// Value at `position`; negative positions count from the end.
    pub fn value_at(&self, position: isize) -> Option<CellValue> {
        let len = self.len() as isize;
        let position = if position < 0 { len + position } else { position };
        if !(0..len).contains(&position) {
            return None;
        }
        let position = position as usize;
        Some(match self {
            LineItems::Cells(cells) => cells[position].effective_value(),
            LineItems::Values(values) => values[position].clone(),
        })
    }

    /// Values of the line. Merged cells become the empty sentinel.
    pub fn values(&self) -> Vec<CellValue> {
        match self {
            LineItems::Cells(cells) => cells.iter().map(Cell::effective_value).collect(),
            LineItems::Values(values) => values.clone(),
        }
    }

    pub fn into_values(self) -> Vec<CellValue> {
        match self {
            LineItems::Cells(cells) => cells.iter().map(Cell::effective_value).collect(),
            LineItems::Values(values) => values,
        }
    }

    fn emptiness(&self) -> Vec<bool> {
        match self {
            LineItems::Cells(cells) => cells.iter().map(Cell::is_empty).collect(),
            LineItems::Values(values) => values.iter().map(CellValue::is_empty).collect(),
        }
    }

    fn slice(self, start: usize, end: usize) -> Self {
        match self {
            LineItems::Cells(cells) => LineItems::Cells(cells[start..end].to_vec()),
            LineItems::Values(values) => LineItems::Values(values[start..end].to_vec()),
        }
    }
}

impl From<Vec<Cell>> for LineItems {
    fn from(cells: Vec<Cell>) -> Self {
        LineItems::Cells(cells)
    }
}

impl From<Vec<CellValue>> for LineItems {
    fn from(values: Vec<CellValue>) -> Self {
        LineItems::Values(values)
    }
}

/// How the per-position results of a `Match` transform are combined.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Combine {
    /// At least one selected value matches
    #[default]
    Any,
    /// Every selected value matches
    All,
}

type LineFunction = Arc<dyn Fn(LineItems) -> Result<LineItems, SheetParserError> + Send + Sync>;

/// A step applied by a `Line` pattern to the line it reads.
#[derive(Clone)]
pub enum LineTransform {
    /// Drops leading and/or trailing empty items; an all-empty line becomes empty
    Strip { left: bool, right: bool },
    /// Fails on an empty line
    NonEmpty,
    /// Turns cells into values
    Values,
    /// Fails unless the regex matches at the start of the selected values
    Match {
        regex: Regex,
        positions: Option<Vec<isize>>,
        combine: Combine,
    },
    /// Any other step
    Custom(LineFunction),
}

impl Debug for LineTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineTransform::Strip { left, right } => {
                f.debug_struct("Strip").field("left", left).field("right", right).finish()
            }
            LineTransform::NonEmpty => f.write_str("NonEmpty"),
            LineTransform::Values => f.write_str("Values"),
            LineTransform::Match {
                regex,
                positions,
                combine,
            } => f
                .debug_struct("Match")
                .field("regex", &regex.as_str())
                .field("positions", positions)
                .field("combine", combine)
                .finish(),
            LineTransform::Custom(_) => f.write_str("Custom"),
        }
    }
}

impl LineTransform {
    /// Strips empty items at both ends.
    pub fn strip() -> Self {
        LineTransform::Strip { left: true, right: true }
    }

    /// Requires a value of the line to start with a match of `pattern`.
    pub fn matching(pattern: &str) -> Result<Self, SheetParserError> {
        Self::matching_at(pattern, None, Combine::Any)
    }

    /// Requires the values at `positions` (all values when `None`) to start
    /// with a match of `pattern`, combined with `combine`.
    pub fn matching_at(
        pattern: &str,
        positions: Option<Vec<isize>>,
        combine: Combine,
    ) -> Result<Self, SheetParserError> {
        Ok(LineTransform::Match {
            regex: Regex::new(pattern)?,
            positions,
            combine,
        })
    }

    pub fn custom<F>(function: F) -> Self
    where
        F: Fn(LineItems) -> Result<LineItems, SheetParserError> + Send + Sync + 'static,
    {
        LineTransform::Custom(Arc::new(function))
    }

    /// The transforms applied by a `Line` unless configured otherwise.
    pub fn defaults() -> Vec<LineTransform> {
        vec![Self::strip(), LineTransform::NonEmpty, LineTransform::Values]
    }

    /// Applies this step to a line.
    pub fn apply(&self, line: LineItems) -> Result<LineItems, SheetParserError> {
        match self {
            LineTransform::Strip { left, right } => {
                let empties = line.emptiness();
                let Some(first) = empties.iter().position(|empty| !empty) else {
                    return Ok(line.slice(0, 0));
                };
                let last = empties.iter().rposition(|empty| !empty).unwrap_or(first);
                let start = if *left { first } else { 0 };
                let end = if *right { last + 1 } else { empties.len() };
                Ok(line.slice(start, end))
            }
            LineTransform::NonEmpty => {
                if line.is_empty() {
                    Err(SheetParserError::no_match("Empty line"))
                } else {
                    Ok(line)
                }
            }
            LineTransform::Values => Ok(LineItems::Values(line.into_values())),
            LineTransform::Match {
                regex,
                positions,
                combine,
            } => {
                let selected: Vec<Option<CellValue>> = match positions {
                    Some(positions) => positions.iter().map(|&position| line.value_at(position)).collect(),
                    None => line.values().into_iter().map(Some).collect(),
                };
                let matches = |value: &Option<CellValue>| {
                    value
                        .as_ref()
                        .and_then(|value| regex.find(&value.to_string()).map(|found| found.start() == 0))
                        .unwrap_or(false)
                };
                let matched = match combine {
                    Combine::Any => selected.iter().any(matches),
                    Combine::All => selected.iter().all(matches),
                };
                if matched {
                    Ok(line)
                } else {
                    Err(SheetParserError::no_match(format!(
                        "Line does not match /{}/",
                        regex.as_str()
                    )))
                }
            }
            LineTransform::Custom(function) => function(line),
        }
    }
}

/// Matches one line and stores its transformed values.
#[derive(Clone, Debug)]
pub struct Line {
    pub(crate) name: String,
    transforms: Vec<LineTransform>,
}

impl Default for Line {
    fn default() -> Self {
        Self::new()
    }
}

impl Line {
    pub fn new() -> Self {
        Line {
            name: "line".to_owned(),
            transforms: LineTransform::defaults(),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_owned();
        self
    }

    /// Replaces the transforms. An empty list stores the cell values as read,
    /// with the secondary cells of merged regions blanked.
    pub fn with_transforms(mut self, transforms: Vec<LineTransform>) -> Self {
        self.transforms = transforms;
        self
    }

    pub(crate) fn match_lines(&self, cursor: &mut Cursor<'_>, context: &mut ResultContext) -> Result<(), SheetParserError> {
        let line = cursor.peek().ok_or_else(|| {
            SheetParserError::no_match(format!("Line '{}' does not match (end of range)", self.name))
        })?;
        context.scoped(&self.name, FrameKind::Line, |context| {
            let items = self
                .transforms
                .iter()
                .try_fold(LineItems::Cells(line.cells()), |items, transform| transform.apply(items))
                .no_match_context(|| format!("Line '{}' does not match", self.name))?;
            context.line_mut()?.values = items.into_values();
            Ok(())
        })?;
        cursor.advance()?;
        Ok(())
    }
}

/// Matches a single all-empty line without storing anything.
pub(crate) fn match_empty(cursor: &mut Cursor<'_>) -> Result<(), SheetParserError> {
    match cursor.peek() {
        None => Err(SheetParserError::no_match("Empty expects a line")),
        Some(line) if !line.is_blank() => Err(SheetParserError::no_match(format!(
            "Empty not matched by {:?}",
            line.values().iter().map(ToString::to_string).collect::<Vec<_>>()
        ))),
        Some(_) => {
            cursor.advance()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Pattern;
    use crate::spreadsheet::{ArraySheet, CellRange, Layout};
    use rstest::rstest;

    fn cells(values: &[&str]) -> LineItems {
        LineItems::Cells(
            values
                .iter()
                .map(|value| if value.is_empty() { Cell::empty() } else { Cell::new(*value) })
                .collect(),
        )
    }

    fn values(values: &[&str]) -> LineItems {
        cells(values).into_values().into()
    }

    #[rstest]
    #[case(true, true, &["a", "", "b"])]
    #[case(true, false, &["a", "", "b", ""])]
    #[case(false, true, &["", "a", "", "b"])]
    fn strip_ends(#[case] left: bool, #[case] right: bool, #[case] expected: &[&str]) {
        let line = values(&["", "a", "", "b", ""]);
        assert_eq!(LineTransform::Strip { left, right }.apply(line).unwrap(), values(expected));
    }

    #[test]
    fn strip_blank_line_to_empty() {
        let line = LineTransform::strip().apply(cells(&["", ""])).unwrap();
        assert!(line.is_empty());
        assert!(LineTransform::NonEmpty.apply(line).unwrap_err().is_no_match());
    }

    #[test]
    fn values_blank_merged_cells() {
        let merged = Cell {
            is_merged: true,
            ..Cell::new("x")
        };
        let line = LineItems::Cells(vec![Cell::new("a"), merged]);
        assert_eq!(
            LineTransform::Values.apply(line).unwrap(),
            LineItems::Values(vec![CellValue::from("a"), CellValue::Empty])
        );
    }

    #[test]
    fn line_without_transforms_blanks_merged_cells() {
        let merged = Cell {
            is_merged: true,
            ..Cell::new("b")
        };
        let sheet = ArraySheet::new("sheet", vec![vec![CellValue::from("a"), CellValue::from("b")]]).set(0, 2, merged);
        let pattern = Pattern::from(Line::new().with_transforms(Vec::new()));
        let mut cursor = Layout::Rows.cursor(CellRange::new(&sheet));
        let mut context = ResultContext::object_tree();
        context
            .scoped("root", FrameKind::Dict, |context| pattern.match_cursor(&mut cursor, context))
            .unwrap();
        let root = context.into_root().unwrap();
        assert_eq!(
            root["line"].as_line().unwrap().values,
            vec![CellValue::from("a"), CellValue::from("b"), CellValue::Empty]
        );
    }

    #[rstest]
    #[case("Res", None, Combine::Any, true)]
    #[case("sult", None, Combine::Any, false)]
    #[case("Res", Some(vec![1]), Combine::Any, false)]
    #[case("[A-Z]", None, Combine::All, false)]
    #[case("[A-Z]", Some(vec![0, -1]), Combine::All, true)]
    #[case("[A-Z]", Some(vec![7]), Combine::Any, false)]
    fn match_positions(
        #[case] pattern: &str,
        #[case] positions: Option<Vec<isize>>,
        #[case] combine: Combine,
        #[case] expected: bool,
    ) {
        let line = values(&["Result:", "12", "End"]);
        let transform = LineTransform::matching_at(pattern, positions, combine).unwrap();
        assert_eq!(transform.apply(line).is_ok(), expected);
    }

    #[test]
    fn bad_regex_is_a_configuration_error() {
        assert!(LineTransform::matching("(").unwrap_err().is_configuration());
    }

    #[test]
    fn custom_transform_can_reject() {
        let filled_first = LineTransform::custom(|line| {
            if matches!(&line, LineItems::Cells(cells) if cells.first().is_some_and(Cell::is_filled)) {
                Ok(line)
            } else {
                Err(SheetParserError::no_match("first cell is not filled"))
            }
        });
        let filled = LineItems::Cells(vec![Cell::new(1).with_fill("yellow")]);
        assert!(filled_first.apply(filled).is_ok());
        assert!(filled_first.apply(cells(&["a"])).is_err());
    }
}
