//! # Result Context Module
//!
//! Builds the result tree while patterns match. Every pattern that produces a
//! result pushes a frame of an explicit [`FrameKind`]; when its match succeeds
//! the frame is committed into its parent through the context's
//! [`CommitPolicy`], and when it fails the frame is discarded so no partial
//! result of a failed scope reaches the tree.
use crate::error::SheetParserError;
use crate::spreadsheet::Cursor;
use log::debug;
use std::fmt::Display;

pub mod node;
pub mod policy;
pub mod table;

pub use node::{Meta, ResultDict, ResultGroup, ResultLine, ResultList, ResultNode, META_KEY};
pub use policy::{CommitPolicy, GroupedPolicy, ObjectTreePolicy};
pub use table::{ResultTable, TableData};

/// Kind of frame a pattern opens.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameKind {
    /// Named group of children (Sequence, Range, Sheet)
    Dict,
    /// Ordered group of repeated children (Many, Workbook)
    List,
    /// Values of a single line
    Line,
    /// Table accumulator
    Table,
}

impl FrameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameKind::Dict => "dict",
            FrameKind::List => "list",
            FrameKind::Line => "line",
            FrameKind::Table => "table",
        }
    }
}

/// Frame stack and finished result of one top-level match.
pub struct ResultContext {
    policy: Box<dyn CommitPolicy>,
    stack: Vec<ResultNode>,
    root: Option<ResultNode>,
    trace: bool,
}

impl ResultContext {
    /// Creates a context with a custom commit policy.
    pub fn new(policy: Box<dyn CommitPolicy>) -> Self {
        ResultContext {
            policy,
            stack: Vec::new(),
            root: None,
            trace: false,
        }
    }

    /// Results as nested dicts and lists mirroring the pattern tree.
    pub fn object_tree() -> Self {
        Self::new(Box::new(ObjectTreePolicy))
    }

    /// Results grouped by pattern name.
    pub fn grouped() -> Self {
        Self::new(Box::new(GroupedPolicy))
    }

    /// Grouped results, tracing every frame and pattern entry at debug level.
    pub fn debug() -> Self {
        ResultContext {
            trace: true,
            ..Self::grouped()
        }
    }

    fn indent(&self) -> String {
        " ".repeat(self.stack.len())
    }

    /// Opens a new frame on top of the stack.
    pub fn push_named(&mut self, name: &str, kind: FrameKind) {
        if self.trace {
            debug!(target: "sheetparser", "{}push {} '{}'", self.indent(), kind.as_str(), name);
        }
        let frame = self.policy.open(name, kind);
        self.stack.push(frame);
    }

    /// Closes the top frame. A committed frame merges into its parent, or
    /// becomes the root when it was the outermost frame; otherwise it is dropped.
    pub fn pop_named(&mut self, committed: bool) -> Result<(), SheetParserError> {
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| SheetParserError::configuration("pop on an empty result stack"))?;
        if !committed {
            if self.trace {
                debug!(target: "sheetparser", "{}-- '{}'", self.indent(), frame.name());
            }
            return Ok(());
        }
        if self.trace {
            debug!(target: "sheetparser", "{}++ '{}'", self.indent(), frame.name());
        }
        match self.stack.last_mut() {
            Some(parent) => self.policy.commit(parent, frame),
            None => {
                self.root = Some(frame);
                Ok(())
            }
        }
    }

    /// Runs `body` inside a frame, committing it on success and discarding it on failure.
    pub fn scoped<T, F>(&mut self, name: &str, kind: FrameKind, body: F) -> Result<T, SheetParserError>
    where
        F: FnOnce(&mut ResultContext) -> Result<T, SheetParserError>,
    {
        self.push_named(name, kind);
        let result = body(self);
        if let (true, Err(error)) = (self.trace, &result) {
            debug!(target: "sheetparser", "{}'{}' failed: {}", self.indent(), name, error);
        }
        self.pop_named(result.is_ok())?;
        result
    }

    /// Adds `value` to the current frame under `name`.
    pub fn emit(&mut self, name: &str, value: ResultNode) -> Result<(), SheetParserError> {
        let frame = self
            .stack
            .last_mut()
            .ok_or_else(|| SheetParserError::configuration(format!("'{name}' emitted outside any frame")))?;
        self.policy.emit(frame, name, value)
    }

    /// The current frame as a line accumulator.
    pub fn line_mut(&mut self) -> Result<&mut ResultLine, SheetParserError> {
        match self.stack.last_mut() {
            Some(ResultNode::Line(line)) => Ok(line),
            _ => Err(SheetParserError::configuration("current frame is not a line")),
        }
    }

    /// The current frame as a table accumulator.
    pub fn table_mut(&mut self) -> Result<&mut ResultTable, SheetParserError> {
        match self.stack.last_mut() {
            Some(ResultNode::Table(table)) => Ok(table),
            _ => Err(SheetParserError::configuration("current frame is not a table")),
        }
    }

    /// Number of open frames.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Logs a pattern entry with the line it is about to read.
    pub fn trace_match(&self, pattern: &dyn Display, cursor: &Cursor<'_>) {
        if self.trace {
            let peeked = cursor
                .peek()
                .map(|line| line.values().iter().map(ToString::to_string).collect::<Vec<_>>());
            debug!(
                target: "sheetparser",
                "{}{} {:?} {}",
                self.indent(),
                pattern,
                peeked,
                cursor.position()
            );
        }
    }

    /// The finished result tree, once the outermost frame has been committed.
    pub fn root(&self) -> Option<&ResultNode> {
        self.root.as_ref()
    }

    pub fn into_root(self) -> Option<ResultNode> {
        self.root
    }

    /// Looks up a child of the root.
    pub fn get(&self, key: &str) -> Option<&ResultNode> {
        self.root.as_ref().and_then(|root| root.get(key))
    }
}

impl Default for ResultContext {
    fn default() -> Self {
        Self::object_tree()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::CellValue;
    use std::cell::RefCell;

    thread_local! {
        static TRACE: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    }

    /// Collects the `sheetparser` records logged by the current thread.
    struct TraceLogger;

    impl log::Log for TraceLogger {
        fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
            metadata.target() == "sheetparser"
        }

        fn log(&self, record: &log::Record<'_>) {
            if self.enabled(record.metadata()) {
                TRACE.with(|trace| trace.borrow_mut().push(record.args().to_string()));
            }
        }

        fn flush(&self) {}
    }

    static LOGGER: TraceLogger = TraceLogger;

    fn traced<F: FnOnce()>(body: F) -> Vec<String> {
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Debug);
        TRACE.with(|trace| trace.borrow_mut().clear());
        body();
        TRACE.with(|trace| trace.take())
    }

    fn nested_failure(context: &mut ResultContext) {
        context
            .scoped("sheet", FrameKind::Dict, |context| {
                let _ = context.scoped("table", FrameKind::Table, |_| {
                    Err::<(), _>(SheetParserError::no_match("no data"))
                });
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn debug_context_traces_frames() {
        let trace = traced(|| nested_failure(&mut ResultContext::debug()));
        assert_eq!(
            trace,
            vec![
                "push dict 'sheet'",
                " push table 'table'",
                "  'table' failed: no data",
                " -- 'table'",
                "++ 'sheet'",
            ]
        );
    }

    #[test]
    fn other_contexts_stay_silent() {
        assert!(traced(|| nested_failure(&mut ResultContext::grouped())).is_empty());
        assert!(traced(|| nested_failure(&mut ResultContext::object_tree())).is_empty());
    }

    #[test]
    fn committed_frames_reach_the_root() {
        let mut context = ResultContext::object_tree();
        context
            .scoped("sheet", FrameKind::Dict, |context| {
                context.scoped("line", FrameKind::Line, |context| {
                    context.line_mut()?.values = vec![CellValue::from("x")];
                    Ok(())
                })
            })
            .unwrap();
        assert_eq!(context.depth(), 0);
        let line = context.get("line").and_then(ResultNode::as_line).unwrap();
        assert_eq!(line.values, vec![CellValue::from("x")]);
    }

    #[test]
    fn failed_frames_are_discarded() {
        let mut context = ResultContext::object_tree();
        context
            .scoped("sheet", FrameKind::Dict, |context| {
                let failed: Result<(), SheetParserError> = context.scoped("table", FrameKind::Table, |context| {
                    context.table_mut()?.count = 3;
                    Err(SheetParserError::no_match("no"))
                });
                assert!(failed.is_err());
                Ok(())
            })
            .unwrap();
        assert!(context.get("table").is_none());
        assert!(context.root().unwrap().is_empty());
    }

    #[test]
    fn failed_outermost_frame_leaves_no_root() {
        let mut context = ResultContext::grouped();
        let result: Result<(), SheetParserError> =
            context.scoped("sheet", FrameKind::Dict, |_| Err(SheetParserError::no_match("no")));
        assert!(result.is_err());
        assert!(context.root().is_none());
    }

    #[test]
    fn frame_kind_is_checked() {
        let mut context = ResultContext::debug();
        context.push_named("sheet", FrameKind::Dict);
        assert!(context.line_mut().unwrap_err().is_configuration());
        assert!(context.table_mut().is_err());
        context.pop_named(false).unwrap();
        assert!(context.pop_named(true).is_err());
        assert!(context.emit("x", ResultNode::Meta(Meta::Sheet { name: "x".to_owned() })).is_err());
    }
}
