use crate::error::{ResultMessage, SheetParserError};
use crate::pattern::RangePattern;
use crate::result::{FrameKind, ResultContext};
use crate::spreadsheet::{CellRange, WorkbookDocument};
use indexmap::IndexMap;
use log::debug;
use regex::Regex;
use std::collections::HashSet;

/// Top-level pattern dispatching range patterns to the sheets of a workbook.
///
/// Each visible sheet is matched by the pattern registered under its exact
/// name, else by the first pattern whose regex matches the start of its name,
/// else by the next positional pattern. Positional patterns left over once
/// every sheet was visited fail the match.
#[derive(Clone, Debug)]
pub struct Workbook {
    name: String,
    by_name: IndexMap<String, RangePattern>,
    by_regex: Vec<(Regex, RangePattern)>,
    positional: Vec<RangePattern>,
    include_hidden: bool,
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

impl Workbook {
    pub fn new() -> Self {
        Workbook {
            name: "workbook".to_owned(),
            by_name: IndexMap::new(),
            by_regex: Vec::new(),
            positional: Vec::new(),
            include_hidden: false,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_owned();
        self
    }

    /// Matches the sheet called `name` with `pattern`.
    pub fn sheet(mut self, name: &str, pattern: impl Into<RangePattern>) -> Self {
        self.by_name.insert(name.to_owned(), pattern.into());
        self
    }

    /// Matches sheets whose name starts with a match of `regex`.
    pub fn sheet_matching(mut self, regex: &str, pattern: impl Into<RangePattern>) -> Result<Self, SheetParserError> {
        self.by_regex.push((Regex::new(regex)?, pattern.into()));
        Ok(self)
    }

    /// Appends a positional pattern, used for the next sheet no other rule selects.
    pub fn then(mut self, pattern: impl Into<RangePattern>) -> Self {
        self.positional.push(pattern.into());
        self
    }

    pub fn include_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    pub fn validate(&self) -> Result<(), SheetParserError> {
        self.by_name
            .values()
            .chain(self.by_regex.iter().map(|(_, pattern)| pattern))
            .chain(self.positional.iter())
            .try_for_each(RangePattern::validate)
    }

    fn by_regex(&self, sheet_name: &str) -> Option<&RangePattern> {
        self.by_regex
            .iter()
            .find(|(regex, _)| regex.find(sheet_name).is_some_and(|found| found.start() == 0))
            .map(|(_, pattern)| pattern)
    }

    /// Matches the sheets of `workbook` in order, in a list frame named after this pattern.
    pub fn match_workbook(
        &self,
        workbook: &dyn WorkbookDocument,
        context: &mut ResultContext,
    ) -> Result<(), SheetParserError> {
        self.validate()?;
        context.scoped(&self.name, FrameKind::List, |context| {
            let mut positional = self.positional.iter();
            let mut named_used = HashSet::new();
            for sheet in (0..workbook.sheet_count()).filter_map(|index| workbook.sheet_at(index)) {
                let sheet_name = sheet.name().unwrap_or_default();
                if sheet.is_hidden() && !self.include_hidden {
                    debug!(target: "sheetparser", "Skipping hidden sheet '{sheet_name}'");
                    continue;
                }
                let pattern = self
                    .by_name
                    .get(sheet_name)
                    .filter(|_| named_used.insert(sheet_name.to_owned()))
                    .or_else(|| self.by_regex(sheet_name))
                    .or_else(|| positional.next());
                let Some(pattern) = pattern else {
                    debug!(target: "sheetparser", "No pattern for sheet '{sheet_name}'");
                    continue;
                };
                pattern
                    .matches(CellRange::new(sheet), context)
                    .no_match_context(|| format!("Sheet '{sheet_name}' does not match"))?;
            }
            if positional.next().is_some() {
                return Err(SheetParserError::no_match("Some sheets were not visited"));
            }
            Ok(())
        })
    }
}
