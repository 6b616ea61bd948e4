//! Typed result rows and expected-value tables
//!
//! Column headings of an expected table may carry an annotation after the
//! last `@`, which is resolved once into a [`ColumnKind`]:
//!
//! - `st_astext(way)` or `ST_AsText(geom)@0.01`: geometry column, compared
//!   against fixture notation, optionally with a custom tolerance
//! - `area@0.01`: float column with a custom relative tolerance
//! - `name@fullmatch`: the expected value is a regular expression that
//!   must match the whole actual value

use crate::error::{Error, Result};
use crate::geometry::{self, DEFAULT_TOLERANCE, Geometry, fixture, wkt};
use crate::grid::Grid;
use regex::Regex;
use std::fmt;
use tracing::trace;

/// Expected value that requires an SQL `NULL`
pub const NULL: &str = "NULL";

/// How the values of a column are compared
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnKind {
    /// Plain text comparison; float values still use the default tolerance
    Text,
    /// Float comparison with the given relative tolerance
    Float { tolerance: f64 },
    /// WKT geometry compared against fixture notation
    Geometry { tolerance: f64 },
    /// Expected value is a regular expression matching the whole value
    FullMatch,
}

impl ColumnKind {
    /// Relative tolerance for float and geometry comparisons
    pub fn tolerance(&self) -> f64 {
        match self {
            ColumnKind::Float { tolerance } | ColumnKind::Geometry { tolerance } => *tolerance,
            ColumnKind::Text | ColumnKind::FullMatch => DEFAULT_TOLERANCE,
        }
    }
}

/// Column of a result table with its resolved comparison kind
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    kind: ColumnKind,
}

impl Column {
    /// Resolve a column heading with an optional `@` annotation
    pub fn parse(heading: &str) -> Result<Self> {
        let (name, annotation) = match heading.rsplit_once('@') {
            Some((name, annotation)) => (name.trim(), Some(annotation.trim())),
            None => (heading.trim(), None),
        };

        let tolerance = |annotation: &str| {
            annotation.parse::<f64>().map_err(|_| {
                Error::FixtureError(format!("Unknown column annotation in '{heading}'"))
            })
        };

        let kind = if name.to_lowercase().starts_with("st_astext(") {
            ColumnKind::Geometry {
                tolerance: annotation.map(tolerance).transpose()?.unwrap_or(DEFAULT_TOLERANCE),
            }
        } else {
            match annotation {
                None => ColumnKind::Text,
                Some("fullmatch") => ColumnKind::FullMatch,
                Some(annotation) => ColumnKind::Float {
                    tolerance: tolerance(annotation)?,
                },
            }
        };

        Ok(Self {
            name: name.to_string(),
            kind,
        })
    }

    /// Column expression without annotation, as used in the select list
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    /// Build the select list for the given columns, e.g. `name, st_astext(way)`
    pub fn select_list(columns: &[Column]) -> String {
        columns
            .iter()
            .map(Column::name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Raw value of a result cell as returned by the database
#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for DbValue {
    fn from(value: &str) -> Self {
        DbValue::Text(value.to_string())
    }
}

impl From<String> for DbValue {
    fn from(value: String) -> Self {
        DbValue::Text(value)
    }
}

impl From<i64> for DbValue {
    fn from(value: i64) -> Self {
        DbValue::Int(value)
    }
}

impl From<f64> for DbValue {
    fn from(value: f64) -> Self {
        DbValue::Float(value)
    }
}

impl From<bool> for DbValue {
    fn from(value: bool) -> Self {
        DbValue::Bool(value)
    }
}

impl<T: Into<DbValue>> From<Option<T>> for DbValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(DbValue::Null, Into::into)
    }
}

/// Comparison-ready result cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Text(String),
    Float { value: f64, tolerance: f64 },
    Geometry {
        geometry: Geometry,
        wkt: String,
        tolerance: f64,
    },
    Pattern(String),
}

impl Cell {
    /// Type a raw value according to its column
    ///
    /// Geometry columns parse their WKT immediately, so malformed database
    /// output is reported before any comparison happens.
    pub fn new(value: DbValue, column: &Column) -> Result<Self> {
        let tolerance = column.kind().tolerance();
        let text = match value {
            DbValue::Null => return Ok(Cell::Null),
            DbValue::Float(value) => return Ok(Cell::Float { value, tolerance }),
            DbValue::Text(text) if matches!(column.kind(), ColumnKind::Geometry { .. }) => {
                return Ok(Cell::Geometry {
                    geometry: wkt::parse(&text)?,
                    wkt: text,
                    tolerance,
                });
            }
            DbValue::Bool(true) => "True".to_string(),
            DbValue::Bool(false) => "False".to_string(),
            DbValue::Int(value) => value.to_string(),
            DbValue::Text(text) => text,
        };

        Ok(match column.kind() {
            ColumnKind::FullMatch => Cell::Pattern(text),
            ColumnKind::Float { .. } => match text.trim().parse() {
                Ok(value) => Cell::Float { value, tolerance },
                Err(_) => Cell::Text(text),
            },
            _ => Cell::Text(text),
        })
    }

    /// Compare against an expected value from a fixture table
    ///
    /// `NULL` only matches an SQL NULL. Errors are reserved for broken
    /// fixtures, such as an invalid regular expression or unknown grid node.
    pub fn matches(&self, expected: &str, grid: &Grid) -> Result<bool> {
        if expected == NULL {
            return Ok(matches!(self, Cell::Null));
        }

        Ok(match self {
            Cell::Null => false,
            Cell::Text(text) => text == expected,
            Cell::Float { value, tolerance } => expected
                .trim()
                .parse::<f64>()
                .is_ok_and(|expected| geometry::is_close(*value, expected, *tolerance)),
            Cell::Geometry {
                geometry,
                tolerance,
                ..
            } => match geometry.diff(&fixture::parse(expected, grid)?, *tolerance) {
                Some(difference) => {
                    trace!(%difference, expected, "geometry does not match");
                    false
                }
                None => true,
            },
            Cell::Pattern(text) => {
                let pattern = Regex::new(&format!("^(?:{expected})$")).map_err(|err| {
                    Error::FixtureError(format!("Invalid pattern '{expected}': {err}"))
                })?;
                pattern.is_match(text)
            }
        })
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => f.write_str(NULL),
            Cell::Text(text) | Cell::Pattern(text) => f.write_str(text),
            Cell::Float { value, .. } => write!(f, "{value:?}"),
            Cell::Geometry { wkt, .. } => f.write_str(wkt),
        }
    }
}

/// One typed row of an actual query result
#[derive(Debug, Clone, PartialEq)]
pub struct DbRow {
    cells: Vec<Cell>,
}

impl DbRow {
    /// Type a raw row using the columns of the expected table
    ///
    /// Surplus values or columns are ignored.
    pub fn new<I>(values: I, columns: &[Column]) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<DbValue>,
    {
        let cells = values
            .into_iter()
            .zip(columns)
            .map(|(value, column)| Cell::new(value.into(), column))
            .collect::<Result<_>>()?;
        Ok(Self { cells })
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Compare element-wise against one expected row
    pub fn matches<S: AsRef<str>>(&self, expected: &[S], grid: &Grid) -> Result<bool> {
        for (cell, expected) in self.cells.iter().zip(expected) {
            if !cell.matches(expected.as_ref(), grid)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl fmt::Display for DbRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, cell) in self.cells.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{cell}")?;
        }
        f.write_str("]")
    }
}

/// Expected rows of a scenario table with resolved column kinds
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<H, R, C>(headings: H, rows: R) -> Result<Self>
    where
        H: IntoIterator,
        H::Item: AsRef<str>,
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let columns = headings
            .into_iter()
            .map(|heading| Column::parse(heading.as_ref()))
            .collect::<Result<_>>()?;
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Select list for querying the actual values of this table
    pub fn select_list(&self) -> String {
        Column::select_list(&self.columns)
    }

    /// Type raw database rows using this table's columns
    pub fn actual_rows<R>(&self, rows: R) -> Result<Vec<DbRow>>
    where
        R: IntoIterator,
        R::Item: IntoIterator,
        <R::Item as IntoIterator>::Item: Into<DbValue>,
    {
        rows.into_iter()
            .map(|row| DbRow::new(row, &self.columns))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_err, assert_ok};
    use insta::assert_snapshot;

    fn column(heading: &str) -> Column {
        Column::parse(heading).unwrap()
    }

    #[test]
    fn column_kinds() {
        assert_eq!(column("name").kind(), ColumnKind::Text);
        assert_eq!(column("name@fullmatch").kind(), ColumnKind::FullMatch);
        assert_eq!(column("area@0.01").kind(), ColumnKind::Float { tolerance: 0.01 });
        assert_eq!(
            column("ST_AsText(way)").kind(),
            ColumnKind::Geometry {
                tolerance: DEFAULT_TOLERANCE
            }
        );
        assert_eq!(
            column("st_astext(geom)@0.1").kind(),
            ColumnKind::Geometry { tolerance: 0.1 }
        );
        assert_eq!(column("tags->'a@b'@fullmatch").name(), "tags->'a@b'");
    }

    #[test]
    fn bad_annotation() {
        let err = assert_err!(Column::parse("name@exact"));
        assert_snapshot!(err, @"Scenario error: Unknown column annotation in 'name@exact'");
        assert_err!(Column::parse("st_astext(way)@fullmatch"));
    }

    #[test]
    fn select_list_strips_annotations() {
        let table = Table::new(
            ["osm_id", "area@0.1", "st_astext(way)@0.001"],
            Vec::<Vec<String>>::new(),
        )
        .unwrap();
        assert_eq!(table.select_list(), "osm_id, area, st_astext(way)");
    }

    #[test]
    fn null_only_matches_null() {
        let grid = Grid::default();
        let text = column("name");

        let null = Cell::new(DbValue::Null, &text).unwrap();
        assert!(null.matches("NULL", &grid).unwrap());
        assert!(!null.matches("", &grid).unwrap());

        let value = Cell::new("NULL".into(), &text).unwrap();
        assert!(!value.matches("NULL", &grid).unwrap());
    }

    #[test]
    fn float_tolerance() {
        let grid = Grid::default();

        let cell = Cell::new(DbValue::Float(1000.05), &column("area")).unwrap();
        assert!(cell.matches("1000", &grid).unwrap());
        assert!(!cell.matches("1001", &grid).unwrap());
        assert!(!cell.matches("large", &grid).unwrap());

        let cell = Cell::new(DbValue::Float(1000.05), &column("area@0.01")).unwrap();
        assert!(cell.matches("1005", &grid).unwrap());
    }

    #[test]
    fn integers_compare_as_text() {
        let cell = Cell::new(DbValue::Int(42), &column("osm_id")).unwrap();
        assert!(cell.matches("42", &Grid::default()).unwrap());
        assert!(!cell.matches("42.0", &Grid::default()).unwrap());
    }

    #[test]
    fn booleans_render_capitalized() {
        let grid = Grid::default();
        let table = Table::new(["flag"], [["True"]]).unwrap();
        let row = assert_ok!(DbRow::new([DbValue::Bool(true)], table.columns()));

        assert_snapshot!(row, @"[True]");
        assert!(row.matches(&table.rows()[0], &grid).unwrap());
        assert!(!row.matches(&["true"], &grid).unwrap());

        let cell = Cell::new(DbValue::Bool(false), &column("flag")).unwrap();
        assert!(cell.matches("False", &grid).unwrap());
    }

    #[test]
    fn full_match_patterns() {
        let grid = Grid::default();
        let cell = Cell::new("residential road".into(), &column("tags@fullmatch")).unwrap();

        assert!(cell.matches("res.* road", &grid).unwrap());
        assert!(cell.matches("(residential|path) road", &grid).unwrap());
        assert!(!cell.matches("residential", &grid).unwrap());

        let err = assert_err!(cell.matches("(unclosed", &grid));
        assert!(matches!(err, Error::FixtureError(_)));
    }

    #[test]
    fn geometry_cells() {
        let grid = Grid::from_rows([["1", "2"]]).unwrap();
        let column = column("st_astext(way)");

        let cell = Cell::new("LINESTRING(20 20,20.1 20)".into(), &column).unwrap();
        assert!(cell.matches("1,2", &grid).unwrap());
        assert!(cell.matches("20 20, 20.1 20", &grid).unwrap());
        assert!(!cell.matches("2,1", &grid).unwrap());
        assert!(!cell.matches("1", &grid).unwrap());
        assert_err!(cell.matches("1,7", &grid));

        let err = assert_err!(Cell::new("CIRCLE(1 2)".into(), &column));
        assert!(matches!(err, Error::GeometryParseError { .. }));
    }

    #[test]
    fn row_display() {
        let table = Table::new(
            ["osm_id", "name", "area", "st_astext(way)"],
            Vec::<Vec<String>>::new(),
        )
        .unwrap();
        let row = DbRow::new(
            [
                DbValue::Int(3),
                DbValue::Null,
                DbValue::Float(2.0),
                "POINT(1 2)".into(),
            ],
            table.columns(),
        )
        .unwrap();
        assert_snapshot!(row, @"[3, NULL, 2.0, POINT(1 2)]");
    }

    #[test]
    fn row_matches_elementwise() {
        let grid = Grid::default();
        let table = Table::new(["osm_id", "name"], [["1", "foo"]]).unwrap();
        let row = assert_ok!(DbRow::new(
            [DbValue::Int(1), DbValue::from(Some("foo"))],
            table.columns()
        ));

        assert!(row.matches(&table.rows()[0], &grid).unwrap());
        assert!(!row.matches(&["1", "bar"], &grid).unwrap());
        assert!(!row.matches(&["2", "foo"], &grid).unwrap());
    }
}
