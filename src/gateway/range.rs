//! A1-style range addressing.

use std::fmt;

/// A sheet name plus an optional A1 span, rendered as `Sheet!A1:B2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SheetRange {
    pub sheet: String,
    pub span: Option<String>,
}

impl SheetRange {
    pub fn new(sheet: impl Into<String>, span: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            span: Some(span.into()),
        }
    }

    /// The whole sheet.
    pub fn sheet(sheet: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            span: None,
        }
    }

    /// One row, columns `A` through the `width`-th column.
    pub fn row(sheet: impl Into<String>, row: u32, width: usize) -> Self {
        Self::new(sheet, format!("A{row}:{}{row}", column_letter(width.max(1))))
    }

    /// Splits `Sheet!A1:B2`. A string without `!` addresses the whole sheet.
    pub fn parse(range: &str) -> Self {
        match range.split_once('!') {
            Some((sheet, span)) if !span.is_empty() => Self::new(sheet, span),
            Some((sheet, _)) => Self::sheet(sheet),
            None => Self::sheet(range),
        }
    }

    /// First row number of the span, if the span names one.
    pub fn start_row(&self) -> Option<u32> {
        let span = self.span.as_deref()?;
        let start = span.split(':').next()?;
        let digits: String = start.chars().skip_while(char::is_ascii_alphabetic).collect();
        digits.parse().ok()
    }
}

impl fmt::Display for SheetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.span {
            Some(span) => write!(f, "{}!{}", self.sheet, span),
            None => f.write_str(&self.sheet),
        }
    }
}

/// 1-based column index to letters: 1 is `A`, 27 is `AA`. Zero yields an
/// empty string.
pub fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let remainder = (index - 1) % 26;
        #[allow(clippy::cast_possible_truncation)]
        letters.push(char::from(b'A' + remainder as u8));
        index = (index - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Inverse of [`column_letter`]. Case-insensitive.
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0usize, |acc, c| {
        let c = c.to_ascii_uppercase();
        if c.is_ascii_uppercase() {
            Some(acc * 26 + (c as usize - 'A' as usize + 1))
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(25), "Y");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(702), "ZZ");
        assert_eq!(column_letter(703), "AAA");
        assert_eq!(column_letter(0), "");
    }

    #[test]
    fn test_column_index_inverts_letters() {
        for i in [1, 26, 27, 52, 702, 703] {
            assert_eq!(column_index(&column_letter(i)), Some(i));
        }
        assert_eq!(column_index("ab"), Some(28));
        assert_eq!(column_index("A1"), None);
        assert_eq!(column_index(""), None);
    }

    #[test]
    fn test_parse_and_display() {
        let range = SheetRange::parse("Ученики!A:Z");
        assert_eq!(range.sheet, "Ученики");
        assert_eq!(range.span.as_deref(), Some("A:Z"));
        assert_eq!(range.to_string(), "Ученики!A:Z");

        assert_eq!(SheetRange::parse("SERV"), SheetRange::sheet("SERV"));
        assert_eq!(SheetRange::sheet("SERV").to_string(), "SERV");
    }

    #[test]
    fn test_row_range() {
        let range = SheetRange::row("Ученики", 7, 25);
        assert_eq!(range.to_string(), "Ученики!A7:Y7");
        assert_eq!(range.start_row(), Some(7));
        assert_eq!(SheetRange::new("S", "A:Z").start_row(), None);
    }
}
