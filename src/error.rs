use std::fmt;

/// Unrecoverable fixture, parsing and assertion errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid grid configuration: {0}")]
    ConfigurationError(String),

    #[error("Scenario error: {0}")]
    FixtureError(String),

    #[error("Unparsable geometry '{input}': {reason}")]
    GeometryParseError { input: String, reason: String },

    #[error("{0}")]
    AssertionMismatch(Mismatch),
}

impl Error {
    pub(crate) fn geometry(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::GeometryParseError {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

/// Why a row-set assertion failed
///
/// Every variant carries the full rendered content of the actual rows so
/// that a failure can be diagnosed without re-running the scenario.
#[derive(Debug, Clone, PartialEq)]
pub enum Mismatch {
    /// The expected row at `line` (1-based) had no matching actual row
    MissingRow {
        line: usize,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    /// Rows left over after all expected rows were matched in exact mode
    UnexpectedRows { actual: Vec<String> },

    /// The number of rows differs from the expected count
    RowCount {
        table: String,
        expected: usize,
        actual: usize,
    },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::MissingRow {
                line,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "{line}. entry not found in table: [{}]\nFull content:",
                    expected.join(", ")
                )?;
                write_rows(f, actual)
            }
            Mismatch::UnexpectedRows { actual } => {
                write!(f, "Unexpected lines in row:")?;
                write_rows(f, actual)
            }
            Mismatch::RowCount {
                table,
                expected,
                actual,
            } => write!(f, "Table {table}: expected {expected} rows, got {actual}"),
        }
    }
}

fn write_rows(f: &mut fmt::Formatter<'_>, rows: &[String]) -> fmt::Result {
    if rows.is_empty() {
        return write!(f, "\n(no rows)");
    }
    for row in rows {
        write!(f, "\n{row}")?;
    }
    Ok(())
}

impl From<Mismatch> for Error {
    fn from(mismatch: Mismatch) -> Self {
        Error::AssertionMismatch(mismatch)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn missing_row_lists_actual_content() {
        let err = Error::from(Mismatch::MissingRow {
            line: 2,
            expected: vec!["3".into(), "bar".into()],
            actual: vec!["[1, foo]".into(), "[2, NULL]".into()],
        });
        assert_snapshot!(err, @r"
        2. entry not found in table: [3, bar]
        Full content:
        [1, foo]
        [2, NULL]
        ");
    }

    #[test]
    fn unexpected_rows_without_content() {
        let err = Error::from(Mismatch::UnexpectedRows { actual: vec![] });
        assert_snapshot!(err, @r"
        Unexpected lines in row:
        (no rows)
        ");
    }

    #[test]
    fn geometry_error_names_input() {
        let err = Error::geometry("POINT(1)", "expected a number");
        assert_snapshot!(err, @"Unparsable geometry 'POINT(1)': expected a number");
    }
}
