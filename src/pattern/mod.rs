//! # Pattern Module
//!
//! Declarative description of a sheet layout, matched by backtracking
//! recursive descent over the lines of a range.
//!
//! Line-level patterns ([`Pattern`]) walk a [`Cursor`]: every pattern that can
//! fail part-way restores the cursor before reporting a recoverable no-match,
//! so alternatives and repetitions always resume from a consistent position.
//! Range-level patterns ([`RangePattern`]) pick the window and layout the
//! line-level patterns are matched against, and [`Workbook`] dispatches
//! range-level patterns to the sheets of a document.
use crate::error::SheetParserError;
use crate::result::ResultContext;
use crate::spreadsheet::{CellLine, Cursor, BORDERS_HORIZONTAL, BORDERS_VERTICAL};
use std::fmt::{Debug, Display};
use std::ops::{Add, BitOr};
use std::sync::Arc;

pub mod combinator;
pub mod line;
pub mod range;
pub mod table;
pub mod workbook;

pub use combinator::{Many, Or, Sequence};
pub use line::{Combine, Line, LineItems, LineTransform};
pub use range::{FlexibleRange, Range, RangeGroup, RangePattern, Sheet};
pub use table::{FailurePolicy, Table};
pub use workbook::Workbook;

type StopFunction = Arc<dyn Fn(&CellLine<'_>, usize) -> bool + Send + Sync>;

/// Predicate deciding whether a table or flexible range stops before a line.
///
/// It receives the next line and the number of lines consumed so far.
#[derive(Clone)]
pub struct Stop(StopFunction);

impl Stop {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&CellLine<'_>, usize) -> bool + Send + Sync + 'static,
    {
        Stop(Arc::new(predicate))
    }

    /// Stops before a line whose cells are all empty.
    pub fn empty_line() -> Self {
        Self::new(|line, _| line.is_blank())
    }

    /// Stops before a line where no cell has a top or bottom border.
    pub fn no_horizontal_border() -> Self {
        Self::new(|line, _| line.iter().all(|cell| !cell.has_borders(BORDERS_HORIZONTAL)))
    }

    /// Stops before a line where no cell has a left or right border.
    pub fn no_vertical_border() -> Self {
        Self::new(|line, _| line.iter().all(|cell| !cell.has_borders(BORDERS_VERTICAL)))
    }

    pub fn test(&self, line: &CellLine<'_>, consumed: usize) -> bool {
        (self.0)(line, consumed)
    }
}

impl Default for Stop {
    fn default() -> Self {
        Self::empty_line()
    }
}

impl Debug for Stop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Stop")
    }
}

/// A line-level pattern.
#[derive(Clone, Debug)]
pub enum Pattern {
    Sequence(Sequence),
    Many(Many),
    Or(Or),
    Line(Line),
    /// A single all-empty line, stored nowhere
    Empty,
    Table(Table),
    FlexibleRange(FlexibleRange),
}

impl Pattern {
    pub fn empty() -> Self {
        Pattern::Empty
    }

    /// Zero or one occurrence of `pattern`.
    pub fn maybe(pattern: impl Into<Pattern>) -> Self {
        Pattern::Many(Many::maybe(pattern))
    }

    fn kind(&self) -> &'static str {
        match self {
            Pattern::Sequence(_) => "Sequence",
            Pattern::Many(_) => "Many",
            Pattern::Or(_) => "Or",
            Pattern::Line(_) => "Line",
            Pattern::Empty => "Empty",
            Pattern::Table(_) => "Table",
            Pattern::FlexibleRange(_) => "FlexibleRange",
        }
    }

    /// Name under which the pattern's result is stored.
    pub fn name(&self) -> &str {
        match self {
            Pattern::Sequence(sequence) => &sequence.name,
            Pattern::Many(many) => &many.name,
            Pattern::Or(or) => or.name.as_deref().unwrap_or("or"),
            Pattern::Line(line) => &line.name,
            Pattern::Empty => "empty",
            Pattern::Table(table) => &table.name,
            Pattern::FlexibleRange(flexible) => &flexible.name,
        }
    }

    /// Checks the pattern tree for inconsistent parameters.
    pub fn validate(&self) -> Result<(), SheetParserError> {
        match self {
            Pattern::Sequence(sequence) => sequence.patterns.iter().try_for_each(Pattern::validate),
            Pattern::Many(many) => many.validate(),
            Pattern::Or(or) => or.validate(),
            Pattern::FlexibleRange(flexible) => flexible.validate(),
            Pattern::Line(_) | Pattern::Empty | Pattern::Table(_) => Ok(()),
        }
    }

    /// Validates the pattern, then matches it at the cursor position.
    ///
    /// On a recoverable failure the cursor is left where it was.
    pub fn match_cursor(&self, cursor: &mut Cursor<'_>, context: &mut ResultContext) -> Result<(), SheetParserError> {
        self.validate()?;
        self.match_lines(cursor, context)
    }

    pub(crate) fn match_lines(&self, cursor: &mut Cursor<'_>, context: &mut ResultContext) -> Result<(), SheetParserError> {
        context.trace_match(self, cursor);
        match self {
            Pattern::Sequence(sequence) => sequence.match_lines(cursor, context),
            Pattern::Many(many) => many.match_lines(cursor, context),
            Pattern::Or(or) => or.match_lines(cursor, context),
            Pattern::Line(line) => line.match_lines(cursor, context),
            Pattern::Empty => line::match_empty(cursor),
            Pattern::Table(table) => table.match_lines(cursor, context),
            Pattern::FlexibleRange(flexible) => flexible.match_lines(cursor, context),
        }
    }

    /// `self | other`. An unnamed alternation on the left is extended.
    pub fn either(self, other: Pattern) -> Pattern {
        match self {
            Pattern::Or(mut or) if or.name.is_none() => {
                or.alternatives.push(other);
                Pattern::Or(or)
            }
            pattern => Pattern::Or(Or::new(vec![pattern, other])),
        }
    }

    /// `self + other`. A sequence on the left is extended.
    pub fn followed_by(self, other: Pattern) -> Pattern {
        match self {
            Pattern::Sequence(mut sequence) => {
                sequence.patterns.push(other);
                Pattern::Sequence(sequence)
            }
            pattern => Pattern::Sequence(Sequence::new(vec![pattern, other])),
        }
    }
}

impl Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pattern::Empty => f.write_str("<Empty>"),
            pattern => write!(f, "<{} {}>", pattern.kind(), pattern.name()),
        }
    }
}

macro_rules! into_pattern {
    ($($kind:ident),*) => {$(
        impl From<$kind> for Pattern {
            fn from(pattern: $kind) -> Self {
                Pattern::$kind(pattern)
            }
        }
    )*};
}

into_pattern!(Sequence, Many, Or, Line, Table, FlexibleRange);

macro_rules! pattern_operators {
    ($($kind:ty),*) => {$(
        impl<T: Into<Pattern>> BitOr<T> for $kind {
            type Output = Pattern;

            fn bitor(self, other: T) -> Pattern {
                Pattern::from(self).either(other.into())
            }
        }

        impl<T: Into<Pattern>> Add<T> for $kind {
            type Output = Pattern;

            fn add(self, other: T) -> Pattern {
                Pattern::from(self).followed_by(other.into())
            }
        }
    )*};
}

pattern_operators!(Pattern, Sequence, Many, Or, Line, Table, FlexibleRange);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{FrameKind, Meta, ResultNode, ResultTable, META_KEY};
    use crate::spreadsheet::{ArraySheet, CellRange, CellValue, Layout};
    use crate::transform::tests::row;
    use crate::transform::{FillData, ParseDate, Pipeline, TableTransform, TransformError, ValueExtraction};
    use proptest::prelude::*;

    fn sheet(rows: &[&[&str]]) -> ArraySheet {
        ArraySheet::new("sheet", rows.iter().map(|values| row(values)).collect())
    }

    fn column(lines: usize) -> ArraySheet {
        ArraySheet::new("sheet", (0..lines).map(|index| vec![CellValue::from(index as i64)]).collect())
    }

    fn run(sheet: &ArraySheet, range: Range) -> Result<ResultNode, SheetParserError> {
        let mut context = ResultContext::object_tree();
        RangePattern::from(range).match_range(CellRange::new(sheet), &mut context)?;
        Ok(context.into_root().expect("a matched range leaves a root"))
    }

    fn values(node: &ResultNode) -> Vec<CellValue> {
        node.as_line().expect("a line result").values.clone()
    }

    #[test]
    fn alternation_falls_back_when_repetition_count_fails() {
        let sheet = sheet(&[&["1", "1", "1", "1", "1"]]);
        let pattern = Many::new(Line::new()).min(2) | Line::new().named("line");
        let root = run(&sheet, Range::new("range", Layout::Rows).then(pattern)).unwrap();
        assert_eq!(values(&root["line"]), row(&["1", "1", "1", "1", "1"]));
        assert!(root.get("many").is_none());
    }

    #[test]
    fn failed_sequence_leaves_no_trace() {
        let sheet = sheet(&[&["a"], &["b"], &[""]]);
        let three = Line::new().named("x") + Line::new().named("y") + Line::new().named("z");
        let pattern = (three | Line::new().named("first")) + Line::new().named("second");
        let root = run(&sheet, Range::new("range", Layout::Rows).then(pattern)).unwrap();
        let sequence = &root["sequence"];
        assert_eq!(sequence.keys(), vec!["first", "second"]);
        assert_eq!(values(&sequence["first"]), row(&["a"]));
        assert_eq!(values(&sequence["second"]), row(&["b"]));
    }

    #[test]
    fn repetition_stops_at_max() {
        let sheet = column(4);
        let range = Range::new("range", Layout::Rows)
            .then(Many::new(Line::new()).max(3))
            .then(Line::new().named("rest"));
        let root = run(&sheet, range).unwrap();
        assert_eq!(root["many"].len(), 3);
        assert_eq!(values(&root["many"][2]), vec![CellValue::from(2)]);
        assert_eq!(values(&root["rest"]), vec![CellValue::from(3)]);
    }

    #[test]
    fn zero_width_repetition_terminates() {
        let sheet = sheet(&[&["a"]]);
        let never = Line::new().with_transforms(vec![LineTransform::matching("x").unwrap()]);
        let pattern = Pattern::from(Many::new(Pattern::maybe(never)));
        let mut cursor = Layout::Rows.cursor(CellRange::new(&sheet));
        let mut context = ResultContext::object_tree();
        context
            .scoped("root", FrameKind::Dict, |context| pattern.match_cursor(&mut cursor, context))
            .unwrap();
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn empty_matches_a_blank_line_only() {
        let sheet = sheet(&[&["", ""], &["a"]]);
        let mut cursor = Layout::Rows.cursor(CellRange::new(&sheet));
        let mut context = ResultContext::object_tree();
        Pattern::empty().match_cursor(&mut cursor, &mut context).unwrap();
        assert_eq!(cursor.position(), 1);
        assert!(Pattern::empty().match_cursor(&mut cursor, &mut context).unwrap_err().is_no_match());
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn table_splits_headers_and_stops_on_empty_line() {
        let sheet = sheet(&[
            &["", "a", "b"],
            &["1", "x", "y"],
            &["2", "z", "w"],
            &["", "", ""],
            &["end"],
        ]);
        let range = Range::new("range", Layout::Rows)
            .then(Table::new())
            .then(Pattern::empty())
            .then(Line::new().named("end"));
        let root = run(&sheet, range).unwrap();
        let table = root["table"].as_table().unwrap();
        assert_eq!(table.top_headers, vec![row(&["a", "b"])]);
        assert_eq!(table.left_headers, vec![row(&["1", "2"])]);
        assert_eq!(table.top_left, vec![row(&[""])]);
        assert_eq!(table.rows().unwrap(), &vec![row(&["x", "y"]), row(&["z", "w"])]);
        assert_eq!(table.count, 3);
        assert_eq!(values(&root["end"]), row(&["end"]));
        assert_eq!(
            root[META_KEY].as_meta(),
            Some(&Meta::Range {
                top: 0,
                left: 0,
                bottom: 5,
                right: 3
            })
        );
    }

    #[test]
    fn table_failure_policy() {
        let sheet = sheet(&[&["", "header"]]);
        let lenient = Table::new() | Line::new().named("fallback");
        let root = run(&sheet, Range::new("range", Layout::Rows).then(lenient)).unwrap();
        assert_eq!(values(&root["fallback"]), row(&["header"]));
        assert!(root.get("table").is_none());

        let strict = Table::new().on_failure(FailurePolicy::Fail) | Line::new().named("fallback");
        let error = run(&sheet, Range::new("range", Layout::Rows).then(strict)).unwrap_err();
        assert!(!error.is_no_match());
        assert!(matches!(
            error,
            SheetParserError::TableFailed { ref source, .. }
                if matches!(**source, SheetParserError::TransformError(TransformError::EmptyTable(_)))
        ));
    }

    #[derive(Clone)]
    struct TextOnly;

    impl TableTransform for TextOnly {
        fn process_line(
            &mut self,
            _table: &mut ResultTable,
            line: LineItems,
        ) -> Result<Option<LineItems>, SheetParserError> {
            if line.values().iter().all(|value| value.as_text().is_some()) {
                Ok(Some(line))
            } else {
                Err(SheetParserError::no_match("not a text table"))
            }
        }
    }

    #[test]
    fn strict_table_line_failures_stay_recoverable() {
        let sheet = ArraySheet::new("sheet", vec![vec![CellValue::from(1)], vec![CellValue::from(2)]]);
        let strict = || {
            Table::new()
                .with_pipeline(Pipeline::new().then(TextOnly))
                .on_failure(FailurePolicy::Fail)
        };
        let root = run(
            &sheet,
            Range::new("range", Layout::Rows).then(strict() | Line::new().named("fallback")),
        )
        .unwrap();
        assert_eq!(values(&root["fallback"]), vec![CellValue::from(1)]);
        assert!(root.get("table").is_none());

        let repeated = Many::new(strict() | Line::new().named("line"));
        let root = run(&sheet, Range::new("range", Layout::Rows).then(repeated)).unwrap();
        assert_eq!(values(&root["many"][0]), vec![CellValue::from(1)]);
        assert_eq!(values(&root["many"][1]), vec![CellValue::from(2)]);
    }

    #[test]
    fn bad_header_index_is_not_swallowed_by_alternatives() {
        let sheet = sheet(&[&["", "2017-01-31"], &["a", "1"]]);
        let table = Table::new().with_pipeline(Pipeline::default().then(ParseDate::new(5, "%Y-%m-%d")));
        let error = run(
            &sheet,
            Range::new("range", Layout::Rows).then(table | Line::new().named("fallback")),
        )
        .unwrap_err();
        assert!(error.is_configuration());
        assert!(matches!(
            error,
            SheetParserError::TransformError(TransformError::HeaderIndex { index: 5, .. })
        ));
    }

    #[test]
    fn flexible_range_covers_the_bordered_block() {
        let sheet = sheet(&[&["title"], &["a", "b"], &["1", "2"], &["3", "4"], &["after"]]).set_borders(
            1,
            0,
            4,
            2,
            BORDERS_HORIZONTAL,
        );
        let block = || {
            FlexibleRange::new(Layout::Rows)
                .named("block")
                .stop(Stop::no_horizontal_border())
                .then(
                    Table::new()
                        .with_pipeline(Pipeline::new().then(ValueExtraction::default()).then(FillData))
                        .stop(Stop::new(|_, _| false)),
                )
        };
        let range = |block: FlexibleRange| {
            Range::new("range", Layout::Rows)
                .then(Line::new().named("title"))
                .then(block)
                .then(Line::new().named("after"))
        };

        let root = run(&sheet, range(block())).unwrap();
        let found = &root["block"];
        assert_eq!(
            found[META_KEY].as_meta(),
            Some(&Meta::Flexible {
                name: "block".to_owned()
            })
        );
        let table = found["table"].as_table().unwrap();
        assert_eq!(table.rows().unwrap(), &vec![row(&["a", "b"]), row(&["1", "2"]), row(&["3", "4"])]);
        assert_eq!(values(&root["after"]), row(&["after"]));

        assert!(run(&sheet, range(block().min(4))).unwrap_err().is_no_match());
        assert!(run(&sheet, range(block().max(2))).unwrap_err().is_no_match());
    }

    #[test]
    fn flexible_range_needs_a_non_empty_first_line() {
        let sheet = sheet(&[&[""], &["a"]]);
        let mut cursor = Layout::Rows.cursor(CellRange::new(&sheet));
        let mut context = ResultContext::object_tree();
        let pattern = Pattern::from(FlexibleRange::new(Layout::Rows).then(Line::new()));
        assert!(pattern.match_cursor(&mut cursor, &mut context).unwrap_err().is_no_match());
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn layouts_change_the_reading_direction() {
        let sheet = sheet(&[&["h1", "h2"], &["1", "2"], &["3", "4"]]).hide_row(1);
        let root = run(&sheet, Range::new("range", Layout::Columns).then(Line::new())).unwrap();
        assert_eq!(values(&root["line"]), row(&["h1", "1", "3"]));

        let root = run(&sheet, Range::new("range", Layout::VisibleRows).then(Many::new(Line::new()))).unwrap();
        assert_eq!(root["many"].len(), 2);
        assert_eq!(values(&root["many"][1]), row(&["3", "4"]));
    }

    #[test]
    fn grouped_results_collect_lines_by_name() {
        let sheet = column(3);
        let range = RangePattern::from(Range::new("range", Layout::Rows).then(Many::new(Line::new())));
        let mut context = ResultContext::grouped();
        range.match_range(CellRange::new(&sheet), &mut context).unwrap();
        let root = context.root().unwrap();
        assert_eq!(root.get_all("line").len(), 3);
        assert!(root.get(META_KEY).is_some());
    }

    #[test]
    fn matching_is_repeatable() {
        let sheet = sheet(&[&["a", "b"], &["1", "2"], &[""], &["x"]]);
        let range = Range::new("range", Layout::Rows)
            .then(Table::new().with_pipeline(Pipeline::new().then(ValueExtraction::default()).then(FillData)))
            .then(Pattern::empty())
            .then(Many::new(Line::new()));
        assert_eq!(run(&sheet, range.clone()).unwrap(), run(&sheet, range).unwrap());
    }

    #[test]
    fn operators_build_flat_trees() {
        let or = Line::new() | Line::new() | Line::new();
        assert!(matches!(&or, Pattern::Or(or) if or.alternatives.len() == 3));
        let named = Or::new(vec![Line::new().into()]).named("choice") | Line::new();
        assert!(matches!(&named, Pattern::Or(or) if or.alternatives.len() == 2 && or.name.is_none()));
        let sequence = Line::new() + Line::new() + Table::new();
        assert!(matches!(&sequence, Pattern::Sequence(sequence) if sequence.patterns.len() == 3));
        assert_eq!(Pattern::from(Line::new().named("total")).to_string(), "<Line total>");
        assert_eq!(Pattern::empty().to_string(), "<Empty>");
    }

    #[test]
    fn inconsistent_parameters_are_rejected_before_matching() {
        let sheet = column(2);
        for pattern in [
            Pattern::from(Many::new(Line::new()).max(0)),
            Pattern::from(Many::new(Line::new()).min(3).max(2)),
            Pattern::from(Or::new(vec![])),
            Pattern::from(FlexibleRange::new(Layout::Rows).min(2).max(1)),
            Line::new() + Many::new(Line::new()).max(0),
        ] {
            let error = run(&sheet, Range::new("range", Layout::Rows).then(pattern)).unwrap_err();
            assert!(error.is_configuration(), "{error}");
        }
    }

    #[test]
    fn custom_stop_sees_the_consumed_count() {
        let sheet = column(5);
        let table = Table::new()
            .with_pipeline(Pipeline::new().then(ValueExtraction::default()).then(FillData))
            .stop(Stop::new(|_, consumed| consumed == 2));
        let root = run(&sheet, Range::new("range", Layout::Rows).then(table).then(Many::new(Line::new()))).unwrap();
        assert_eq!(root["table"].len(), 2);
        assert_eq!(root["many"].len(), 3);
    }

    proptest! {
        #[test]
        fn sequence_consumes_all_or_nothing(lines in 0usize..6, length in 1usize..8) {
            let sheet = column(lines);
            let pattern = Pattern::from(Sequence::new(vec![Pattern::from(Line::new()); length]));
            let mut cursor = Layout::Rows.cursor(CellRange::new(&sheet));
            let mut context = ResultContext::object_tree();
            let result = pattern.match_cursor(&mut cursor, &mut context);
            if length <= lines {
                prop_assert!(result.is_ok());
                prop_assert_eq!(cursor.position(), length);
            } else {
                prop_assert!(result.unwrap_err().is_no_match());
                prop_assert_eq!(cursor.position(), 0);
                prop_assert!(context.root().is_none());
            }
        }

        #[test]
        fn repetition_count_respects_bounds(lines in 0usize..6, min in 0usize..4, extra in 0usize..3) {
            let max = min.max(1) + extra;
            let sheet = column(lines);
            let pattern = Pattern::from(Many::new(Line::new()).min(min).max(max));
            let mut cursor = Layout::Rows.cursor(CellRange::new(&sheet));
            let mut context = ResultContext::object_tree();
            let result = pattern.match_cursor(&mut cursor, &mut context);
            let count = lines.min(max);
            if count >= min {
                prop_assert!(result.is_ok());
                prop_assert_eq!(cursor.position(), count);
                prop_assert_eq!(context.root().map(ResultNode::len), Some(count));
            } else {
                prop_assert!(result.unwrap_err().is_no_match());
                prop_assert_eq!(cursor.position(), 0);
            }
        }

        #[test]
        fn failed_alternatives_do_not_move_the_cursor(lines in 1usize..6, skip in 0usize..6) {
            let sheet = column(lines);
            let long = Sequence::new(vec![Pattern::from(Line::new()); lines + 1 + skip]);
            let pattern = long | Line::new().named("short");
            let mut cursor = Layout::Rows.cursor(CellRange::new(&sheet));
            let mut context = ResultContext::object_tree();
            pattern.match_cursor(&mut cursor, &mut context).unwrap();
            prop_assert_eq!(cursor.position(), 1);
            prop_assert_eq!(context.root().map(ResultNode::name), Some("short"));
        }
    }
}
