//! CSV text extraction
//!
//! Deliberately simple line/comma splitting: quoted fields containing
//! commas or newlines are not supported. Uploads are expected to hold one
//! short text per line.

use thiserror::Error;

/// Header name of the column holding the texts
pub const TEXT_COLUMN: &str = "texto";

/// Structural problems with an uploaded CSV
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CsvError {
    /// Fewer than two non-blank lines (header plus one data row)
    #[error("The CSV file is empty or has no data rows")]
    EmptyInput,

    #[error("The CSV file must have a column named \"{0}\"")]
    MissingColumn(String),
}

/// Extracts the values of one named column from raw CSV text
#[derive(Debug, Clone)]
pub struct CsvTextParser {
    /// Lower-case header name to look for
    column: String,
}

impl Default for CsvTextParser {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvTextParser {
    /// Parser for the `texto` column
    pub fn new() -> Self {
        Self {
            column: TEXT_COLUMN.to_string(),
        }
    }

    /// Look for a different header name (matched case-insensitively)
    pub fn with_column(mut self, column: &str) -> Self {
        self.column = column.trim().to_lowercase();
        self
    }

    /// Extract the non-empty values of the text column, in row order
    ///
    /// Values are trimmed and have one leading and one trailing `"`
    /// removed. Rows whose value ends up empty, or that are too short to
    /// reach the column, are skipped. No deduplication and no row limit.
    pub fn parse(&self, contents: &str) -> Result<Vec<String>, CsvError> {
        let lines: Vec<&str> = contents
            .split('\n')
            .filter(|line| !line.trim().is_empty())
            .collect();

        if lines.len() < 2 {
            return Err(CsvError::EmptyInput);
        }

        let column_index = lines[0]
            .split(',')
            .map(|field| field.trim().to_lowercase())
            .position(|field| field == self.column)
            .ok_or_else(|| CsvError::MissingColumn(self.column.clone()))?;

        let mut texts = Vec::with_capacity(lines.len() - 1);
        let mut skipped = 0usize;

        for line in &lines[1..] {
            let value = line
                .split(',')
                .nth(column_index)
                .map(|field| strip_quotes(field.trim()))
                .unwrap_or("");

            if value.is_empty() {
                skipped += 1;
                continue;
            }
            texts.push(value.to_string());
        }

        tracing::debug!(
            rows = lines.len() - 1,
            texts = texts.len(),
            skipped,
            "Parsed CSV input"
        );

        Ok(texts)
    }
}

/// Remove one leading and one trailing double quote, if present
fn strip_quotes(value: &str) -> &str {
    let value = value.strip_prefix('"').unwrap_or(value);
    value.strip_suffix('"').unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_csv() {
        let texts = CsvTextParser::new()
            .parse("texto\nI love this\nI hate this\n")
            .unwrap();
        assert_eq!(texts, vec!["I love this", "I hate this"]);
    }

    #[test]
    fn test_column_found_anywhere_in_header() {
        let csv = "id, Texto ,score\n1,  \"Great stuff\" ,5\n2,,3\n3,meh,2\n";
        let texts = CsvTextParser::new().parse(csv).unwrap();
        assert_eq!(texts, vec!["Great stuff", "meh"]);
    }

    #[test]
    fn test_blank_lines_and_crlf() {
        let csv = "\n\ntexto\r\n\r\nfirst\r\n   \r\nsecond\r\n";
        let texts = CsvTextParser::new().parse(csv).unwrap();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn test_missing_column() {
        let err = CsvTextParser::new()
            .parse("comment,score\nnice,5\n")
            .unwrap_err();
        assert_eq!(err, CsvError::MissingColumn("texto".to_string()));
    }

    #[test]
    fn test_header_only_is_empty_input() {
        assert_eq!(
            CsvTextParser::new().parse("texto\n\n  \n").unwrap_err(),
            CsvError::EmptyInput
        );
        assert_eq!(CsvTextParser::new().parse("").unwrap_err(), CsvError::EmptyInput);
    }

    #[test]
    fn test_empty_input_checked_before_header() {
        assert_eq!(
            CsvTextParser::new().parse("comment\n").unwrap_err(),
            CsvError::EmptyInput
        );
    }

    #[test]
    fn test_short_rows_and_empty_quotes_skipped() {
        let csv = "id,texto\n1\n2,\"\"\n3,kept\n";
        let texts = CsvTextParser::new().parse(csv).unwrap();
        assert_eq!(texts, vec!["kept"]);
    }

    #[test]
    fn test_only_one_quote_stripped_each_side() {
        let texts = CsvTextParser::new()
            .parse("texto\n\"\"quoted\"\"\n")
            .unwrap();
        assert_eq!(texts, vec!["\"quoted\""]);
    }

    #[test]
    fn test_quoted_commas_are_not_supported() {
        let texts = CsvTextParser::new()
            .parse("texto\n\"good, really good\"\n")
            .unwrap();
        assert_eq!(texts, vec!["good"]);
    }

    #[test]
    fn test_duplicates_kept_in_order() {
        let texts = CsvTextParser::new().parse("texto\na b\nc d\na b\n").unwrap();
        assert_eq!(texts, vec!["a b", "c d", "a b"]);
    }

    #[test]
    fn test_custom_column() {
        let texts = CsvTextParser::new()
            .with_column("Comment")
            .parse("COMMENT\nhello there\n")
            .unwrap();
        assert_eq!(texts, vec!["hello there"]);
    }
}
