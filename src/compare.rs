//! Row-set assertions against expected tables

use crate::error::{Mismatch, Result};
use crate::grid::Grid;
use crate::table::{DbRow, Table};
use tracing::debug;

/// Check that every expected row matches a distinct actual row
///
/// Each match consumes the actual row, so one actual row can never satisfy
/// two expected rows. With `exact`, rows left over afterwards are an error
/// as well.
pub fn assert_table_contains(
    mut actual: Vec<DbRow>,
    expected: &Table,
    grid: &Grid,
    exact: bool,
) -> Result<()> {
    for (line, row) in expected.rows().iter().enumerate() {
        let mut found = None;
        for (i, candidate) in actual.iter().enumerate() {
            if candidate.matches(row, grid)? {
                found = Some(i);
                break;
            }
        }

        match found {
            Some(i) => {
                actual.remove(i);
            }
            None => return Err(missing_row(line + 1, row, &actual).into()),
        }
    }

    if exact && !actual.is_empty() {
        debug!(rows = actual.len(), "unexpected rows left in table");
        return Err(Mismatch::UnexpectedRows {
            actual: render(&actual),
        }
        .into());
    }

    Ok(())
}

/// Check that every expected row matches at least one actual row
///
/// Expected rows are checked independently; a single actual row may
/// satisfy several of them.
pub fn assert_query_contains(actual: &[DbRow], expected: &Table, grid: &Grid) -> Result<()> {
    for (line, row) in expected.rows().iter().enumerate() {
        let mut found = false;
        for candidate in actual {
            if candidate.matches(row, grid)? {
                found = true;
                break;
            }
        }

        if !found {
            return Err(missing_row(line + 1, row, actual).into());
        }
    }

    Ok(())
}

/// Check the number of rows in a table
pub fn assert_row_count(table: &str, actual: usize, expected: usize) -> Result<()> {
    if actual == expected {
        return Ok(());
    }

    Err(Mismatch::RowCount {
        table: table.to_string(),
        expected,
        actual,
    }
    .into())
}

fn missing_row(line: usize, expected: &[String], actual: &[DbRow]) -> Mismatch {
    debug!(line, rows = actual.len(), "expected row not found");
    Mismatch::MissingRow {
        line,
        expected: expected.to_vec(),
        actual: render(actual),
    }
}

fn render(rows: &[DbRow]) -> Vec<String> {
    rows.iter().map(DbRow::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::table::DbValue;
    use claims::{assert_err, assert_ok};
    use insta::assert_snapshot;

    fn table(rows: &[[&str; 2]]) -> Table {
        Table::new(["osm_id", "name"], rows.iter().map(|row| row.to_vec())).unwrap()
    }

    fn actual(table: &Table, rows: &[(i64, Option<&str>)]) -> Vec<DbRow> {
        table
            .actual_rows(
                rows.iter()
                    .map(|&(id, name)| [DbValue::Int(id), DbValue::from(name)]),
            )
            .unwrap()
    }

    #[test]
    fn contains_exactly_same_rows() {
        let expected = table(&[["1", "A"], ["2", "B"]]);
        let rows = actual(&expected, &[(2, Some("B")), (1, Some("A"))]);
        assert_ok!(assert_table_contains(rows, &expected, &Grid::default(), true));
    }

    #[test]
    fn one_actual_row_cannot_match_twice() {
        let expected = table(&[["1", "A"], ["1", "A"]]);
        let rows = actual(&expected, &[(1, Some("A")), (2, Some("B"))]);

        let err = assert_err!(assert_table_contains(rows, &expected, &Grid::default(), false));
        assert_snapshot!(err, @r"
        2. entry not found in table: [1, A]
        Full content:
        [2, B]
        ");
    }

    #[test]
    fn leftover_rows_only_fail_in_exact_mode() {
        let expected = table(&[["1", "A"]]);
        let rows = actual(&expected, &[(1, Some("A")), (2, None)]);
        assert_ok!(assert_table_contains(rows.clone(), &expected, &Grid::default(), false));

        let err = assert_err!(assert_table_contains(rows, &expected, &Grid::default(), true));
        assert_snapshot!(err, @r"
        Unexpected lines in row:
        [2, NULL]
        ");
    }

    #[test]
    fn null_expectation() {
        let expected = table(&[["2", "NULL"]]);
        let rows = actual(&expected, &[(2, Some("x"))]);
        assert_err!(assert_table_contains(rows, &expected, &Grid::default(), false));

        let rows = actual(&expected, &[(2, None)]);
        assert_ok!(assert_table_contains(rows, &expected, &Grid::default(), true));
    }

    #[test]
    fn query_rows_may_be_reused() {
        let expected = table(&[["1", "A"], ["1", "A"]]);
        let rows = actual(&expected, &[(1, Some("A"))]);
        assert_ok!(assert_query_contains(&rows, &expected, &Grid::default()));

        let expected = table(&[["1", "A"], ["3", "C"]]);
        let err = assert_err!(assert_query_contains(&rows, &expected, &Grid::default()));
        assert!(matches!(
            err,
            Error::AssertionMismatch(Mismatch::MissingRow { line: 2, .. })
        ));
    }

    #[test]
    fn fixture_errors_abort_comparison() {
        let expected = Table::new(["st_astext(way)"], [["1, 99"]]).unwrap();
        let grid = Grid::from_rows([["1"]]).unwrap();
        let rows = expected
            .actual_rows([["LINESTRING(20 20,20.1 20)"]])
            .unwrap();

        let err = assert_err!(assert_table_contains(rows, &expected, &grid, false));
        assert!(matches!(err, Error::FixtureError(_)));
    }

    #[test]
    fn row_count() {
        assert_ok!(assert_row_count("planet_osm_point", 3, 3));
        let err = assert_err!(assert_row_count("planet_osm_point", 2, 3));
        assert_snapshot!(err, @"Table planet_osm_point: expected 3 rows, got 2");
    }
}
