use chrono::NaiveDate;
use chrono::NaiveDateTime;
use std::fmt::Display;
use std::hash::Hash;
use std::hash::Hasher;

/// Border bit for the top edge of a cell.
pub const BORDER_TOP: u8 = 1;
/// Border bit for the left edge of a cell.
pub const BORDER_LEFT: u8 = 1 << 1;
/// Border bit for the bottom edge of a cell.
pub const BORDER_BOTTOM: u8 = 1 << 2;
/// Border bit for the right edge of a cell.
pub const BORDER_RIGHT: u8 = 1 << 3;
/// Left and right borders.
pub const BORDERS_VERTICAL: u8 = BORDER_LEFT | BORDER_RIGHT;
/// Top and bottom borders.
pub const BORDERS_HORIZONTAL: u8 = BORDER_TOP | BORDER_BOTTOM;

/// Value held by a cell.
///
/// `Empty` is the sentinel for blank cells and secondary cells of merged
/// regions. It is distinct from a missing cell.
#[derive(Clone, Debug, Default)]
pub enum CellValue {
    #[default]
    Empty,
    /// Text values
    Text(String),
    /// Numeric values, integers included
    Number(f64),
    /// Boolean values (true/false)
    Boolean(bool),
    /// Date/time values
    Date(NaiveDateTime),
}

impl CellValue {
    /// Returns true for the empty sentinel.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns the text if the value is textual.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the number if the value is numeric.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(number) => Some(*number),
            _ => None,
        }
    }

    /// Returns the date/time if the value is a date.
    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Date(date) => Some(*date),
            _ => None,
        }
    }

    /// Bits used for equality and hashing of numbers: `-0.0` equals `0.0` and all NaNs are equal.
    fn canonical_bits(number: f64) -> u64 {
        if number.is_nan() {
            f64::NAN.to_bits()
        } else {
            (number + 0.0).to_bits()
        }
    }
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Empty, Self::Empty) => true,
            (Self::Text(left), Self::Text(right)) => left == right,
            (Self::Number(left), Self::Number(right)) => {
                Self::canonical_bits(*left) == Self::canonical_bits(*right)
            }
            (Self::Boolean(left), Self::Boolean(right)) => left == right,
            (Self::Date(left), Self::Date(right)) => left == right,
            _ => false,
        }
    }
}

impl Eq for CellValue {}

impl Hash for CellValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Empty => (),
            Self::Text(text) => text.hash(state),
            Self::Number(number) => Self::canonical_bits(*number).hash(state),
            Self::Boolean(boolean) => boolean.hash(state),
            Self::Date(date) => date.hash(state),
        }
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(text) => write!(f, "{text}"),
            Self::Number(number) if number.fract() == 0.0 && number.abs() < 1e15 => {
                write!(f, "{}", *number as i64)
            }
            Self::Number(number) => write!(f, "{number}"),
            Self::Boolean(boolean) => write!(f, "{boolean}"),
            Self::Date(date) if date.time() == chrono::NaiveTime::MIN => {
                write!(f, "{}", date.format("%Y-%m-%d"))
            }
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        Self::Number(value as f64)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value.and_time(chrono::NaiveTime::MIN))
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

/// A single cell of a grid with its value and formatting.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cell {
    /// Cell value
    pub value: CellValue,
    /// True for secondary members of a merged region
    pub is_merged: bool,
    /// Bitset of `BORDER_*` flags
    pub border_mask: u8,
    /// Backend-specific fill description, only read by user predicates
    pub fill: Option<String>,
}

impl Cell {
    /// Creates an unformatted cell holding `value`.
    pub fn new(value: impl Into<CellValue>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    /// Creates a neutral empty cell.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if the cell holds the empty sentinel.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Returns true if any border in `mask` is set on this cell.
    pub fn has_borders(&self, mask: u8) -> bool {
        self.border_mask & mask != 0
    }

    /// Returns true if the cell carries a fill.
    pub fn is_filled(&self) -> bool {
        self.fill.is_some()
    }

    /// Value as seen by default transforms: merged cells read as empty.
    pub fn effective_value(&self) -> CellValue {
        if self.is_merged {
            CellValue::Empty
        } else {
            self.value.clone()
        }
    }

    pub fn with_borders(mut self, mask: u8) -> Self {
        self.border_mask |= mask;
        self
    }

    pub fn with_fill(mut self, fill: impl Into<String>) -> Self {
        self.fill = Some(fill.into());
        self
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}
