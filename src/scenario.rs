//! Fixture state of a single test scenario

use crate::compare;
use crate::error::Result;
use crate::geometry::fixture;
use crate::grid::{Grid, GridBuilder};
use crate::opl::{self, OplStore};
use crate::table::{DbValue, Table};
use indexmap::IndexMap;
use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;

/// Grid and import data collected while setting up one scenario
///
/// Every scenario starts with an empty grid and no import data. Redefining
/// the grid replaces it as a whole; the import data keeps accumulating
/// until it is taken with [`Scenario::take_import_payload`].
///
/// # Example
///
/// ```
/// use geo_fixture::Scenario;
/// use geo_fixture::grid::GridBuilder;
///
/// let mut scenario = Scenario::new();
/// scenario.set_grid(GridBuilder::new(), [["1", "2"]])?;
/// scenario.add_data("w10 Thighway=residential Nn1,n2")?;
///
/// assert_eq!(
///     scenario.take_import_payload(),
///     "n1 x20.0 y20.0\nn2 x20.1 y20.0\nw10 Thighway=residential Nn1,n2\n"
/// );
/// # Ok::<(), geo_fixture::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Scenario {
    grid: Grid,
    data: OplStore,
}

impl Scenario {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn data(&self) -> &OplStore {
        &self.data
    }

    /// Replace the grid and add a node line for each of its points
    pub fn set_grid<R, C, T>(&mut self, builder: GridBuilder, rows: R) -> Result<()>
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let grid = builder.build(rows)?;
        self.data.add_grid(&grid)?;
        self.grid = grid;
        Ok(())
    }

    /// Add a block of OPL lines
    pub fn add_data(&mut self, text: &str) -> Result<()> {
        self.data.add_lines(text.lines(), &self.grid)
    }

    /// Add a block of OPL lines after substituting `{name}` placeholders,
    /// see [`opl::format_template`]
    pub fn add_formatted_data<K, V>(&mut self, text: &str, vars: &IndexMap<K, V>) -> Result<()>
    where
        K: Borrow<str> + Hash + Eq,
        V: fmt::Display,
    {
        let text = opl::format_template(text, vars)?;
        self.add_data(&text)
    }

    /// Take the OPL payload for the importer, see [`OplStore::take_payload`]
    pub fn take_import_payload(&mut self) -> String {
        self.data.take_payload()
    }

    /// Render fixture geometry notation as an SQL geometry literal
    pub fn geometry_literal(&self, text: &str) -> Result<String> {
        fixture::to_sql_literal(text, &self.grid)
    }

    /// Compare raw table content against expected rows, see
    /// [`compare::assert_table_contains`]
    pub fn check_table<R>(&self, rows: R, expected: &Table, exact: bool) -> Result<()>
    where
        R: IntoIterator,
        R::Item: IntoIterator,
        <R::Item as IntoIterator>::Item: Into<DbValue>,
    {
        let actual = expected.actual_rows(rows)?;
        compare::assert_table_contains(actual, expected, &self.grid, exact)
    }

    /// Compare raw query results against expected rows, see
    /// [`compare::assert_query_contains`]
    pub fn check_query<R>(&self, rows: R, expected: &Table) -> Result<()>
    where
        R: IntoIterator,
        R::Item: IntoIterator,
        <R::Item as IntoIterator>::Item: Into<DbValue>,
    {
        let actual = expected.actual_rows(rows)?;
        compare::assert_query_contains(&actual, expected, &self.grid)
    }
}
