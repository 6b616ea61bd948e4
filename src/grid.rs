//! Symbolic node grids for fixture authoring
//!
//! A grid is a small rectangular table of node ids. Each id is placed at a
//! coordinate derived from its row/column position, so scenarios can refer
//! to `3` instead of `20.2 19.9`.

use crate::error::{Error, Result};
use crate::geometry::Coord;
use indexmap::IndexMap;
use tracing::debug;

/// Distance between two neighbouring grid cells, in degrees
pub const DEFAULT_GRID_STEP: f64 = 0.1;

/// Coordinate of the top-left grid cell, in degrees
pub const DEFAULT_GRID_ORIGIN: (f64, f64) = (20.0, 20.0);

/// Builder for [`Grid`] values
///
/// Defaults to a step of `0.1` degrees with the top-left cell at `20 20`.
///
/// # Example
///
/// ```
/// use geo_fixture::grid::GridBuilder;
///
/// let grid = GridBuilder::new()
///     .with_step(1.0)
///     .with_origin(0.0, 10.0)
///     .build([["1", "", "2"], ["", "3", ""]])?;
///
/// assert_eq!(grid.lookup(3).map(|c| (c.x, c.y)), Some((1.0, 9.0)));
/// # Ok::<(), geo_fixture::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridBuilder {
    step: f64,
    origin_x: f64,
    origin_y: f64,
}

impl Default for GridBuilder {
    fn default() -> Self {
        Self {
            step: DEFAULT_GRID_STEP,
            origin_x: DEFAULT_GRID_ORIGIN.0,
            origin_y: DEFAULT_GRID_ORIGIN.1,
        }
    }
}

impl GridBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the distance between neighbouring cells
    ///
    /// The step may be negative, which mirrors the grid around its origin.
    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    /// Set the coordinate of the top-left cell
    pub fn with_origin(mut self, x: f64, y: f64) -> Self {
        self.origin_x = x;
        self.origin_y = y;
        self
    }

    /// Lay out the given rows and build the grid
    ///
    /// Rows are walked top to bottom, starting at the origin's y and moving
    /// down by one step per row. Within a row, columns are walked left to
    /// right starting at the origin's x. The first row is a regular grid
    /// row, not a header. Tokens that are not plain non-negative integers
    /// (blanks, dots, ...) only occupy their column.
    ///
    /// Fails with [`Error::ConfigurationError`] if the origin or any
    /// resulting node lies outside longitude/latitude bounds.
    pub fn build<R, C, T>(self, rows: R) -> Result<Grid>
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        if !self.step.is_finite() {
            return Err(Error::ConfigurationError(format!(
                "grid step must be a finite number, got {}",
                self.step
            )));
        }
        check_bounds(self.origin_x, self.origin_y)?;

        let mut points = IndexMap::new();
        for (row, cells) in rows.into_iter().enumerate() {
            let y = self.origin_y - row as f64 * self.step;
            for (col, cell) in cells.into_iter().enumerate() {
                let Some(id) = parse_node_id(cell.as_ref())? else {
                    continue;
                };
                let x = self.origin_x + col as f64 * self.step;
                check_bounds(x, y)?;
                points.insert(id, Coord::new(x, y));
            }
        }

        let precision = precision_for_step(self.step);
        debug!(points = points.len(), precision, "built node grid");

        Ok(Grid { points, precision })
    }
}

fn check_bounds(x: f64, y: f64) -> Result<()> {
    if (-180.0..=180.0).contains(&x) && (-90.0..=90.0).contains(&y) {
        Ok(())
    } else {
        Err(Error::ConfigurationError(format!(
            "coordinate {x} {y} outside of longitude/latitude bounds"
        )))
    }
}

fn parse_node_id(cell: &str) -> Result<Option<u64>> {
    let cell = cell.trim();
    if cell.is_empty() || !cell.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(None);
    }
    cell.parse()
        .map(Some)
        .map_err(|_| Error::FixtureError(format!("grid node id '{cell}' is too large")))
}

/// Number of decimals used when rendering grid coordinates
///
/// Only a negative step adds digits: the running value is divided by ten
/// while it is below zero, which stops once it underflows to `-0.0`.
/// Existing fixtures rely on these exact values.
fn precision_for_step(step: f64) -> usize {
    let mut precision = 1;
    let mut step = step;
    while step < 0.0 {
        precision += 1;
        step /= 10.0;
    }
    precision
}

/// Immutable mapping from node ids to coordinates
///
/// Iteration order is the order in which ids appeared in the grid rows
/// (row-major). A grid is replaced as a whole, never merged.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    points: IndexMap<u64, Coord>,
    precision: usize,
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            points: IndexMap::new(),
            precision: precision_for_step(DEFAULT_GRID_STEP),
        }
    }
}

impl Grid {
    /// Build a grid with default step and origin
    pub fn from_rows<R, C, T>(rows: R) -> Result<Self>
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        GridBuilder::new().build(rows)
    }

    /// Coordinate of the given node, if the grid has it
    pub fn lookup(&self, id: u64) -> Option<Coord> {
        self.points.get(&id).copied()
    }

    /// Coordinate of the given node, failing if the grid doesn't have it
    pub fn node(&self, id: u64) -> Result<Coord> {
        self.lookup(id)
            .ok_or_else(|| Error::FixtureError(format!("Point '{id}' not found in grid")))
    }

    /// Number of decimals used by [`Grid::render_as_lines`] and [`Grid::complete`]
    pub fn precision(&self) -> usize {
        self.precision
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate over all `(id, coordinate)` pairs in grid order
    pub fn iter(&self) -> impl Iterator<Item = (u64, Coord)> + '_ {
        self.points.iter().map(|(&id, &coord)| (id, coord))
    }

    /// Render every grid node as an OPL node line `n<id> x<x> y<y>`
    pub fn render_as_lines(&self) -> Vec<String> {
        self.iter()
            .map(|(id, coord)| format!("n{id}{}", self.coordinate_fields(coord)))
            .collect()
    }

    /// Append grid coordinates to a node line that has none
    ///
    /// Lines that are not node lines, or already carry an ` x` field, are
    /// returned unchanged. A coordinate-less node that is missing from the
    /// grid is a [`Error::FixtureError`].
    pub fn complete(&self, line: &str) -> Result<String> {
        if !line.starts_with('n') || line.contains(" x") {
            return Ok(line.to_string());
        }

        let head = line.split(' ').next().unwrap_or(line);
        let id: u64 = head[1..]
            .parse()
            .map_err(|_| Error::FixtureError(format!("Bad node id in OPL line '{line}'")))?;

        let coord = self
            .lookup(id)
            .ok_or_else(|| Error::FixtureError(format!("Coordinates missing for node {id}")))?;

        Ok(format!("{line}{}", self.coordinate_fields(coord)))
    }

    fn coordinate_fields(&self, coord: Coord) -> String {
        let p = self.precision;
        format!(" x{:.p$} y{:.p$}", coord.x, coord.y)
    }
}
