use crate::error::{ResultMessage, SheetParserError};
use crate::pattern::{Pattern, Stop};
use crate::result::{FrameKind, Meta, ResultContext, ResultNode, META_KEY};
use crate::spreadsheet::{Bounds, CellRange, Cursor, Layout};
use std::ops::{Add, BitOr};

/// Matches `patterns` in order against `window`, read with `layout`, inside a
/// dict frame that first records `meta`.
fn match_window(
    name: &str,
    layout: Layout,
    window: CellRange<'_>,
    patterns: &[Pattern],
    meta: Meta,
    context: &mut ResultContext,
) -> Result<(), SheetParserError> {
    let mut cursor = layout.cursor(window);
    context.scoped(name, FrameKind::Dict, |context| {
        context.emit(META_KEY, ResultNode::Meta(meta))?;
        for pattern in patterns {
            pattern
                .match_lines(&mut cursor, context)
                .no_match_context(|| format!("Range '{name}' does not match"))?;
        }
        Ok(())
    })
}

/// A window at fixed bounds of the range it is matched against.
#[derive(Clone, Debug)]
pub struct Range {
    name: String,
    layout: Layout,
    bounds: Bounds,
    patterns: Vec<Pattern>,
}

impl Range {
    /// A window covering the whole range, read with `layout`.
    pub fn new(name: &str, layout: Layout) -> Self {
        Range {
            name: name.to_owned(),
            layout,
            bounds: Bounds::default(),
            patterns: Vec::new(),
        }
    }

    /// Restricts the window. Bounds are relative to the matched range.
    pub fn bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn then(mut self, pattern: impl Into<Pattern>) -> Self {
        self.patterns.push(pattern.into());
        self
    }
}

/// The full extent of a named sheet.
#[derive(Clone, Debug)]
pub struct Sheet {
    name: String,
    layout: Layout,
    patterns: Vec<Pattern>,
}

impl Sheet {
    pub fn new(name: &str, layout: Layout) -> Self {
        Sheet {
            name: name.to_owned(),
            layout,
            patterns: Vec::new(),
        }
    }

    pub fn then(mut self, pattern: impl Into<Pattern>) -> Self {
        self.patterns.push(pattern.into());
        self
    }
}

/// Range-level patterns combined under one name.
#[derive(Clone, Debug)]
pub struct RangeGroup {
    name: String,
    patterns: Vec<RangePattern>,
}

/// A pattern matched against a whole range rather than a cursor.
#[derive(Clone, Debug)]
pub enum RangePattern {
    Range(Range),
    Sheet(Sheet),
    /// Every pattern matches the same range, inside one frame
    And(RangeGroup),
    /// The first pattern matching the range wins
    Or(RangeGroup),
}

impl RangePattern {
    pub fn and(name: &str, patterns: Vec<RangePattern>) -> Self {
        RangePattern::And(RangeGroup {
            name: name.to_owned(),
            patterns,
        })
    }

    pub fn or(patterns: Vec<RangePattern>) -> Self {
        RangePattern::Or(RangeGroup {
            name: "or".to_owned(),
            patterns,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            RangePattern::Range(range) => &range.name,
            RangePattern::Sheet(sheet) => &sheet.name,
            RangePattern::And(group) | RangePattern::Or(group) => &group.name,
        }
    }

    /// Checks the whole pattern tree for inconsistent parameters.
    pub fn validate(&self) -> Result<(), SheetParserError> {
        match self {
            RangePattern::Range(range) => {
                range.bounds.validate().map_err(|error| {
                    SheetParserError::configuration(format!("Range '{}': {error}", range.name))
                })?;
                range.patterns.iter().try_for_each(Pattern::validate)
            }
            RangePattern::Sheet(sheet) => sheet.patterns.iter().try_for_each(Pattern::validate),
            RangePattern::And(group) => group.patterns.iter().try_for_each(RangePattern::validate),
            RangePattern::Or(group) => {
                if group.patterns.is_empty() {
                    return Err(SheetParserError::configuration("Or needs at least one alternative"));
                }
                group.patterns.iter().try_for_each(RangePattern::validate)
            }
        }
    }

    /// Matches this pattern against `range`, committing its results into `context`.
    pub fn match_range(&self, range: CellRange<'_>, context: &mut ResultContext) -> Result<(), SheetParserError> {
        self.validate()?;
        self.matches(range, context)
    }

    pub(crate) fn matches(&self, range: CellRange<'_>, context: &mut ResultContext) -> Result<(), SheetParserError> {
        match self {
            RangePattern::Range(pattern) => {
                let window = range.sub_range(pattern.bounds)?;
                let (top, left, bottom, right) = window.bounds();
                let meta = Meta::Range {
                    top,
                    left,
                    bottom,
                    right,
                };
                match_window(&pattern.name, pattern.layout, window, &pattern.patterns, meta, context)
            }
            RangePattern::Sheet(pattern) => {
                let grid = range.grid();
                let sheet_name = grid.name().ok_or_else(|| {
                    SheetParserError::configuration(format!("Sheet '{}' expects a named sheet", pattern.name))
                })?;
                let meta = Meta::Sheet {
                    name: sheet_name.to_owned(),
                };
                match_window(
                    &pattern.name,
                    pattern.layout,
                    CellRange::new(grid),
                    &pattern.patterns,
                    meta,
                    context,
                )
            }
            RangePattern::And(group) => context.scoped(&group.name, FrameKind::Dict, |context| {
                for pattern in &group.patterns {
                    pattern
                        .matches(range, context)
                        .no_match_context(|| format!("'{}' does not match", group.name))?;
                }
                Ok(())
            }),
            RangePattern::Or(group) => {
                let mut last_failure = None;
                for pattern in &group.patterns {
                    match pattern.matches(range, context) {
                        Ok(()) => return Ok(()),
                        Err(error) if error.is_no_match() => last_failure = Some(error),
                        Err(error) => return Err(error),
                    }
                }
                let message = format!("No alternative of '{}' matches", group.name);
                Err(match last_failure {
                    Some(cause) => SheetParserError::no_match_caused_by(message, cause),
                    None => SheetParserError::no_match(message),
                })
            }
        }
    }

    /// `self | other`, extending an existing alternation.
    pub fn either(self, other: RangePattern) -> RangePattern {
        match self {
            RangePattern::Or(mut group) => {
                group.patterns.push(other);
                RangePattern::Or(group)
            }
            pattern => RangePattern::or(vec![pattern, other]),
        }
    }

    /// `self + other`, extending an existing conjunction.
    pub fn and_then(self, other: RangePattern) -> RangePattern {
        match self {
            RangePattern::And(mut group) => {
                group.patterns.push(other);
                RangePattern::And(group)
            }
            pattern => RangePattern::and("and", vec![pattern, other]),
        }
    }
}

impl From<Range> for RangePattern {
    fn from(range: Range) -> Self {
        RangePattern::Range(range)
    }
}

impl From<Sheet> for RangePattern {
    fn from(sheet: Sheet) -> Self {
        RangePattern::Sheet(sheet)
    }
}

macro_rules! range_operators {
    ($($kind:ty),*) => {$(
        impl<T: Into<RangePattern>> BitOr<T> for $kind {
            type Output = RangePattern;

            fn bitor(self, other: T) -> RangePattern {
                RangePattern::from(self).either(other.into())
            }
        }

        impl<T: Into<RangePattern>> Add<T> for $kind {
            type Output = RangePattern;

            fn add(self, other: T) -> RangePattern {
                RangePattern::from(self).and_then(other.into())
            }
        }
    )*};
}

range_operators!(RangePattern, Range, Sheet);

/// A window discovered by scanning lines until the stop predicate fires, then
/// matched like a `Range` with its own layout.
#[derive(Clone, Debug)]
pub struct FlexibleRange {
    pub(crate) name: String,
    layout: Layout,
    patterns: Vec<Pattern>,
    stop: Stop,
    min: usize,
    max: Option<usize>,
}

impl FlexibleRange {
    /// At least one line, stopping before an empty line.
    pub fn new(layout: Layout) -> Self {
        FlexibleRange {
            name: "flexible".to_owned(),
            layout,
            patterns: Vec::new(),
            stop: Stop::default(),
            min: 1,
            max: None,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_owned();
        self
    }

    pub fn then(mut self, pattern: impl Into<Pattern>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    pub fn stop(mut self, stop: Stop) -> Self {
        self.stop = stop;
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
        if let Some(max) = self.max.filter(|max| *max < self.min) {
            return Err(SheetParserError::configuration(format!(
                "Flexible range '{}' has a maximum ({max}) below its minimum ({})",
                self.name, self.min
            )));
        }
        self.patterns.iter().try_for_each(Pattern::validate)
    }

    pub(crate) fn match_lines(&self, cursor: &mut Cursor<'_>, context: &mut ResultContext) -> Result<(), SheetParserError> {
        cursor.rollback_if_fail(|cursor| {
            let first = cursor.peek().filter(|line| !line.is_blank()).ok_or_else(|| {
                SheetParserError::no_match(format!("Flexible range '{}' needs a non-empty first line", self.name))
            })?;
            let (mut top, mut left, mut bottom, mut right) = first.extent();
            let mut consumed = 0;
            loop {
                let line = cursor.advance()?;
                let (line_top, line_left, line_bottom, line_right) = line.extent();
                top = top.min(line_top);
                left = left.min(line_left);
                bottom = bottom.max(line_bottom);
                right = right.max(line_right);
                consumed += 1;
                match cursor.peek() {
                    Some(next) if !self.stop.test(&next, consumed) => {}
                    _ => break,
                }
            }
            if consumed < self.min {
                return Err(SheetParserError::no_match(format!(
                    "Flexible range '{}' has {consumed} lines, min is {}",
                    self.name, self.min
                )));
            }
            if let Some(max) = self.max.filter(|max| consumed > *max) {
                return Err(SheetParserError::no_match(format!(
                    "Flexible range '{}' has {consumed} lines, max is {max}",
                    self.name
                )));
            }
            let window = cursor.range().sub_range(Bounds::new(top, left, bottom, right))?;
            let meta = Meta::Flexible {
                name: self.name.clone(),
            };
            match_window(&self.name, self.layout, window, &self.patterns, meta, context)
        })
    }
}
