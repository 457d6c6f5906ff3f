//! # Spreadsheet Table Parser
//!
//! A pattern-matching engine for extracting tables from spreadsheets whose
//! layout is irregular and human-authored: several tables per sheet, merged
//! cells, decorative borders, variable header depth.
//!
//! ## Features
//!
//! - **Declarative layouts**: describe a sheet with sequences, repetitions,
//!   alternatives, lines, empty lines and tables, combined with `+` and `|`
//! - **Backtracking**: every failed alternative restores the cursor and leaves
//!   no partial result behind
//! - **Flexible windows**: fixed ranges, whole sheets, or ranges discovered by
//!   scanning until an empty line or a missing border
//! - **Layouts**: read a range by rows, by columns, or by visible rows only
//! - **Table pipelines**: split headers, fill merged header blanks, merge
//!   header rows, parse header dates, transpose, drop empty lines, build maps
//! - **Pluggable results**: nested object tree, grouped by pattern name, or
//!   grouped with debug tracing through the `log` facade
//! - **Workbook dispatch**: select sheet patterns by name, by regex or by position
//!
//! ## Usage
//!
//! Build a pattern tree once, then match it against as many documents as
//! needed, each time with a fresh [`ResultContext`]:
//!
//! ```
//! use rusty_sheet_parser::{ArraySheet, ArrayWorkbook, Layout, Line, ResultContext, Sheet, Table, Workbook};
//! use rusty_sheet_parser::pattern::Pattern;
//!
//! let sheet = ArraySheet::from_delimited("Sales", "Sales report\n\n,Q1,Q2\nEast,10,12\nWest,7,9", ',').unwrap();
//! let workbook = ArrayWorkbook::new().with_sheet(sheet);
//! let pattern = Workbook::new().sheet(
//!     "Sales",
//!     Sheet::new("sales", Layout::Rows)
//!         .then(Line::new().named("title"))
//!         .then(Pattern::empty())
//!         .then(Table::new().named("figures")),
//! );
//!
//! let mut context = ResultContext::object_tree();
//! pattern.match_workbook(&workbook, &mut context).unwrap();
//! let root = context.root().unwrap();
//! let figures = root[0]["figures"].as_table().unwrap();
//! assert_eq!(figures.left_headers[0].len(), 2);
//! ```
pub mod error;
pub mod pattern;
pub mod result;
pub mod spreadsheet;
pub mod transform;

pub use error::{ResultMessage, SheetParserError};
pub use pattern::{
    FailurePolicy, FlexibleRange, Line, LineTransform, Many, Or, Pattern, Range, RangePattern, Sequence, Sheet,
    Stop, Table, Workbook,
};
pub use result::{FrameKind, ResultContext, ResultNode, ResultTable};
pub use spreadsheet::{ArraySheet, ArrayWorkbook, Bounds, Cell, CellRange, CellValue, Grid, Layout, WorkbookDocument};
pub use transform::{Pipeline, TableTransform};
