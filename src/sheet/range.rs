use crate::error::SheetLiftError;
use regex::Regex;
use thiserror::Error;

/// Errors related to A1-notation range parsing.
#[derive(Error, Debug)]
pub enum RangeError {
    #[error("Invalid A1 range '{0}'")]
    FormatError(String),
}

/// An A1-notation cell range with optional boundaries.
///
/// Covers single cells ("B3"), rectangles ("A2:C6"), column spans ("A:C")
/// and row spans ("1:10"). Bounds are 0-based indexes, `None` when the
/// corresponding dimension is unbounded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Range {
    /// A1 text as supplied by the caller, trimmed
    text: String,
    /// Lower row bound (0-based index), None for unbounded
    pub row_lower_bound: Option<usize>,
    /// Upper row bound (0-based index), None for unbounded
    pub row_upper_bound: Option<usize>,
    /// Lower column bound (0-based index), None for unbounded
    pub col_lower_bound: Option<usize>,
    /// Upper column bound (0-based index), None for unbounded
    pub col_upper_bound: Option<usize>,
}

impl TryFrom<&str> for Range {
    type Error = SheetLiftError;

    /// Parses an A1-style range string (e.g., "A1", "B2:C5", "A:C", "1:10").
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let pattern = Regex::new(r"^([A-Z]*)(\d*)(:([A-Z]*)(\d*))?$").expect("Hardcode regex pattern");
        let text = value.trim().to_owned();
        let normalized = text.to_ascii_uppercase();
        let captures = pattern
            .captures(normalized.as_str())
            .ok_or_else(|| RangeError::FormatError(text.clone()))?;
        let range = Range {
            col_lower_bound: captures
                .get(1)
                .map(|matcher| matcher.as_str())
                .and_then(col_to_index),
            row_lower_bound: captures
                .get(2)
                .map(|matcher| matcher.as_str())
                .and_then(row_to_index),
            col_upper_bound: captures
                .get(4)
                .map(|matcher| matcher.as_str())
                .and_then(col_to_index),
            row_upper_bound: captures
                .get(5)
                .map(|matcher| matcher.as_str())
                .and_then(row_to_index),
            text,
        };
        // The pattern matches the empty string; an anchor-less spec is not a range
        if range.col_lower_bound.is_none() && range.row_lower_bound.is_none() {
            return Err(RangeError::FormatError(range.text).into());
        }
        Ok(range)
    }
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl Range {
    /// Returns the A1 text of the range as supplied by the caller.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Converts column letters ("A", "AA") to a 0-based index.
/// Empty input yields None (unbounded dimension).
fn col_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut index = 0usize;
    for letter in letters.bytes() {
        index = index * 26 + (letter - b'A' + 1) as usize;
    }
    Some(index - 1)
}

/// Converts a 1-based row number string to a 0-based index.
/// Empty input yields None (unbounded dimension).
fn row_to_index(digits: &str) -> Option<usize> {
    digits
        .parse::<usize>()
        .ok()
        .filter(|row| *row > 0)
        .map(|row| row - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_span() {
        let range = Range::try_from("A:C").unwrap();
        assert_eq!(range.col_lower_bound, Some(0));
        assert_eq!(range.col_upper_bound, Some(2));
        assert_eq!(range.row_lower_bound, None);
        assert_eq!(range.row_upper_bound, None);
        assert_eq!(range.as_str(), "A:C");
    }

    #[test]
    fn rectangle() {
        let range = Range::try_from("A2:C6").unwrap();
        assert_eq!(range.col_lower_bound, Some(0));
        assert_eq!(range.row_lower_bound, Some(1));
        assert_eq!(range.col_upper_bound, Some(2));
        assert_eq!(range.row_upper_bound, Some(5));
    }

    #[test]
    fn single_cell() {
        let range = Range::try_from("B3").unwrap();
        assert_eq!(range.col_lower_bound, Some(1));
        assert_eq!(range.row_lower_bound, Some(2));
        assert_eq!(range.col_upper_bound, None);
        assert_eq!(range.row_upper_bound, None);
    }

    #[test]
    fn row_span() {
        let range = Range::try_from("1:10").unwrap();
        assert_eq!(range.row_lower_bound, Some(0));
        assert_eq!(range.row_upper_bound, Some(9));
        assert_eq!(range.col_lower_bound, None);
    }

    #[test]
    fn lowercase_and_whitespace_are_accepted() {
        let range = Range::try_from(" a2:c6 ").unwrap();
        assert_eq!(range.col_upper_bound, Some(2));
        assert_eq!(range.as_str(), "a2:c6");
    }

    #[test]
    fn wide_columns() {
        let range = Range::try_from("AA1:AB2").unwrap();
        assert_eq!(range.col_lower_bound, Some(26));
        assert_eq!(range.col_upper_bound, Some(27));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(Range::try_from("").is_err());
        assert!(Range::try_from(":").is_err());
        assert!(Range::try_from("1A").is_err());
        assert!(Range::try_from("A1:B2:C3").is_err());
        assert!(Range::try_from("Sheet1!A1").is_err());
        assert!(Range::try_from("0").is_err());
    }
}
