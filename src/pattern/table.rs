use crate::error::SheetParserError;
use crate::pattern::{LineItems, Stop};
use crate::result::{FrameKind, ResultContext, ResultTable};
use crate::spreadsheet::Cursor;
use crate::transform::{Pipeline, TableTransform};

/// What a table does when one of its transforms fails while closing the table.
/// Failures raised while lines are read always leave the table unmatched.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// The table does not match; enclosing alternatives may still be tried
    #[default]
    NoMatch,
    /// The failure aborts the whole match
    Fail,
}

impl FailurePolicy {
    /// Maps a failure raised while filling table `name` according to this policy.
    /// Configuration errors, bad header indices included, are never reinterpreted.
    fn reinterpret(&self, name: &str, error: SheetParserError) -> SheetParserError {
        let shaping_failure = !error.is_configuration()
            && matches!(
                error,
                SheetParserError::DoesNotMatch { .. }
                    | SheetParserError::TransformError(_)
                    | SheetParserError::AnyhowError(_)
            );
        match self {
            _ if !shaping_failure => error,
            FailurePolicy::NoMatch => {
                SheetParserError::no_match_caused_by(format!("Table '{name}' does not match"), error)
            }
            FailurePolicy::Fail => SheetParserError::TableFailed {
                name: name.to_owned(),
                source: Box::new(error),
            },
        }
    }
}

/// Reads lines until the stop predicate fires, shaping them through a pipeline.
#[derive(Clone, Debug)]
pub struct Table {
    pub(crate) name: String,
    pipeline: Pipeline,
    stop: Stop,
    on_failure: FailurePolicy,
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl Table {
    /// A table with the conventional pipeline that stops before an empty line.
    pub fn new() -> Self {
        Table {
            name: "table".to_owned(),
            pipeline: Pipeline::default(),
            stop: Stop::default(),
            on_failure: FailurePolicy::default(),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_owned();
        self
    }

    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn stop(mut self, stop: Stop) -> Self {
        self.stop = stop;
        self
    }

    pub fn on_failure(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    pub(crate) fn match_lines(&self, cursor: &mut Cursor<'_>, context: &mut ResultContext) -> Result<(), SheetParserError> {
        cursor.rollback_if_fail(|cursor| {
            context.scoped(&self.name, FrameKind::Table, |context| {
                let table = context.table_mut()?;
                let mut transforms = self
                    .fill(cursor, table)
                    .map_err(|error| FailurePolicy::NoMatch.reinterpret(&self.name, error))?;
                transforms
                    .iter_mut()
                    .try_for_each(|transform| transform.wrap(table))
                    .map_err(|error| self.on_failure.reinterpret(&self.name, error))
            })
        })
    }

    /// Reads the lines of the table and returns the transforms, ready to be wrapped.
    fn fill(
        &self,
        cursor: &mut Cursor<'_>,
        table: &mut ResultTable,
    ) -> Result<Vec<Box<dyn TableTransform>>, SheetParserError> {
        let mut transforms = self.pipeline.instantiate();
        for transform in transforms.iter_mut() {
            transform.init(table)?;
        }
        let mut consumed = 0;
        while cursor.peek().is_some() {
            let line = cursor.advance()?;
            let mut items = Some(LineItems::Cells(line.cells()));
            for transform in transforms.iter_mut() {
                match items.take() {
                    Some(line) => items = transform.process_line(table, line)?,
                    None => break,
                }
            }
            table.count += 1;
            consumed += 1;
            match cursor.peek() {
                Some(next) if !self.stop.test(&next, consumed) => {}
                _ => break,
            }
        }
        Ok(transforms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::TransformError;

    #[test]
    fn shaping_failures_follow_the_policy() {
        let error = || SheetParserError::from(TransformError::EmptyTable("t".to_owned()));
        assert!(FailurePolicy::NoMatch.reinterpret("t", error()).is_no_match());
        let fatal = FailurePolicy::Fail.reinterpret("t", error());
        assert!(matches!(fatal, SheetParserError::TableFailed { ref name, .. } if name == "t"));
        assert!(!fatal.is_no_match());
    }

    #[test]
    fn configuration_errors_are_never_reinterpreted() {
        let error = FailurePolicy::NoMatch.reinterpret("t", SheetParserError::configuration("bad"));
        assert!(error.is_configuration());
        let error = FailurePolicy::Fail.reinterpret("t", SheetParserError::configuration("bad"));
        assert!(error.is_configuration());
    }

    #[test]
    fn bad_header_indices_are_never_reinterpreted() {
        let error = || {
            SheetParserError::from(TransformError::HeaderIndex {
                name: "t".to_owned(),
                side: "top",
                index: 5,
                len: 1,
            })
        };
        for policy in [FailurePolicy::NoMatch, FailurePolicy::Fail] {
            let error = policy.reinterpret("t", error());
            assert!(error.is_configuration());
            assert!(!error.is_no_match());
        }
    }
}
