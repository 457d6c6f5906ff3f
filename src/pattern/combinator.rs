use crate::error::{ResultMessage, SheetParserError};
use crate::pattern::Pattern;
use crate::result::{FrameKind, ResultContext};
use crate::spreadsheet::Cursor;

/// Matches its children in order, all or nothing.
#[derive(Clone, Debug)]
pub struct Sequence {
    pub(crate) name: String,
    pub(crate) patterns: Vec<Pattern>,
}

impl Sequence {
    pub fn new(patterns: Vec<Pattern>) -> Self {
        Sequence {
            name: "sequence".to_owned(),
            patterns,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_owned();
        self
    }

    /// Appends a child.
    pub fn then(mut self, pattern: impl Into<Pattern>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    pub(crate) fn match_lines(&self, cursor: &mut Cursor<'_>, context: &mut ResultContext) -> Result<(), SheetParserError> {
        cursor.rollback_if_fail(|cursor| {
            context.scoped(&self.name, FrameKind::Dict, |context| {
                for pattern in &self.patterns {
                    pattern
                        .match_lines(cursor, context)
                        .no_match_context(|| format!("Sequence '{}' does not match", self.name))?;
                }
                Ok(())
            })
        })
    }
}

/// Matches its child repeatedly, between `min` and `max` times.
#[derive(Clone, Debug)]
pub struct Many {
    pub(crate) name: String,
    pub(crate) pattern: Box<Pattern>,
    pub(crate) min: usize,
    pub(crate) max: Option<usize>,
}

impl Many {
    /// Zero or more repetitions.
    pub fn new(pattern: impl Into<Pattern>) -> Self {
        Many {
            name: "many".to_owned(),
            pattern: Box::new(pattern.into()),
            min: 0,
            max: None,
        }
    }

    /// Zero or one occurrence.
    pub fn maybe(pattern: impl Into<Pattern>) -> Self {
        Many {
            name: "maybe".to_owned(),
            max: Some(1),
            ..Self::new(pattern)
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_owned();
        self
    }

    pub fn min(mut self, min: usize) -> Self {
        self.min = min;
        self
    }

    pub fn max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), SheetParserError> {
        match self.max {
            Some(0) => Err(SheetParserError::configuration(format!(
                "Many '{}' has a maximum of 0 repetitions",
                self.name
            ))),
            Some(max) if max < self.min => Err(SheetParserError::configuration(format!(
                "Many '{}' has a maximum ({max}) below its minimum ({})",
                self.name, self.min
            ))),
            _ => self.pattern.validate(),
        }
    }

    fn bad_count(&self, count: usize) -> String {
        let max = self.max.map_or("unbounded".to_owned(), |max| max.to_string());
        format!(
            "Bad count ({count}) for '{}' (expected between {} and {max})",
            self.name, self.min
        )
    }

    pub(crate) fn match_lines(&self, cursor: &mut Cursor<'_>, context: &mut ResultContext) -> Result<(), SheetParserError> {
        cursor.rollback_if_fail(|cursor| {
            context.scoped(&self.name, FrameKind::List, |context| {
                let mut count = 0;
                while self.max.map_or(true, |max| count < max) {
                    let before = cursor.position();
                    match cursor.rollback_if_fail(|cursor| self.pattern.match_lines(cursor, context)) {
                        Ok(()) => {
                            count += 1;
                            // A match that consumed nothing would repeat forever
                            if cursor.position() == before {
                                count = count.max(self.min);
                                break;
                            }
                        }
                        Err(error) if error.is_no_match() => {
                            if count < self.min {
                                return Err(SheetParserError::no_match_caused_by(self.bad_count(count), error));
                            }
                            break;
                        }
                        Err(error) => return Err(error),
                    }
                }
                if count < self.min {
                    return Err(SheetParserError::no_match(self.bad_count(count)));
                }
                Ok(())
            })
        })
    }
}

/// First-match alternation.
#[derive(Clone, Debug)]
pub struct Or {
    pub(crate) name: Option<String>,
    pub(crate) alternatives: Vec<Pattern>,
}

impl Or {
    pub fn new(alternatives: Vec<Pattern>) -> Self {
        Or {
            name: None,
            alternatives,
        }
    }

    /// Names the alternation. Named alternations are not extended by `|`.
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_owned());
        self
    }

    pub(crate) fn validate(&self) -> Result<(), SheetParserError> {
        if self.alternatives.is_empty() {
            return Err(SheetParserError::configuration("Or needs at least one alternative"));
        }
        self.alternatives.iter().try_for_each(Pattern::validate)
    }

    pub(crate) fn match_lines(&self, cursor: &mut Cursor<'_>, context: &mut ResultContext) -> Result<(), SheetParserError> {
        let mut last_failure = None;
        for alternative in &self.alternatives {
            match cursor.rollback_if_fail(|cursor| alternative.match_lines(cursor, context)) {
                Ok(()) => return Ok(()),
                Err(error) if error.is_no_match() => last_failure = Some(error),
                Err(error) => return Err(error),
            }
        }
        let message = format!("No alternative of '{}' matches", self.name.as_deref().unwrap_or("or"));
        Err(match last_failure {
            Some(cause) => SheetParserError::no_match_caused_by(message, cause),
            None => SheetParserError::no_match(message),
        })
    }
}
