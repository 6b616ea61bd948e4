//! Comparison-ready geometry model
//!
//! Both the WKT text returned by the database and the compact fixture
//! notation written in scenarios are parsed into [`Geometry`] values, which
//! can then be compared under a relative floating-point tolerance.

pub mod fixture;
pub mod wkt;

use std::fmt;

/// Relative tolerance used when a column doesn't override it
pub const DEFAULT_TOLERANCE: f64 = 0.0001;

/// Spatial reference id attached to rendered geometries (WGS 84)
pub const DEFAULT_SRID: u32 = 4326;

/// Two-dimensional coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Check whether both ordinates are within `tolerance` of each other
    pub fn is_close(&self, other: &Coord, tolerance: f64) -> bool {
        is_close(self.x, other.x, tolerance) && is_close(self.y, other.y, tolerance)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.x, self.y)
    }
}

/// Relative float comparison: `|a - b| <= tolerance * max(|a|, |b|)`
pub fn is_close(a: f64, b: f64, tolerance: f64) -> bool {
    a == b || (a - b).abs() <= tolerance * a.abs().max(b.abs())
}

/// Normalized geometry value
///
/// Rings and point sequences are kept in the order they were written.
/// Comparisons are order-sensitive and never normalize winding direction.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Coord),
    Line(Vec<Coord>),
    /// Outer ring followed by zero or more inner rings
    Polygon(Vec<Vec<Coord>>),
    MultiPoint(Vec<Coord>),
    MultiLine(Vec<Vec<Coord>>),
    MultiPolygon(Vec<Vec<Vec<Coord>>>),
    Collection(Vec<Geometry>),
}

/// Variant tag of a [`Geometry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Point,
    Line,
    Polygon,
    MultiPoint,
    MultiLine,
    MultiPolygon,
    Collection,
}

impl GeometryKind {
    /// WKT keyword of this geometry kind
    pub fn wkt_name(self) -> &'static str {
        match self {
            GeometryKind::Point => "POINT",
            GeometryKind::Line => "LINESTRING",
            GeometryKind::Polygon => "POLYGON",
            GeometryKind::MultiPoint => "MULTIPOINT",
            GeometryKind::MultiLine => "MULTILINESTRING",
            GeometryKind::MultiPolygon => "MULTIPOLYGON",
            GeometryKind::Collection => "GEOMETRYCOLLECTION",
        }
    }
}

/// First difference found between two geometries
#[derive(Debug, Clone, PartialEq)]
pub enum Difference {
    /// The geometries are of different kinds
    Kind {
        actual: GeometryKind,
        expected: GeometryKind,
    },

    /// A point sequence, ring list or member list differs in length
    Count { actual: usize, expected: usize },

    /// A coordinate differs by more than the tolerance
    Coord { actual: Coord, expected: Coord },
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difference::Kind { actual, expected } => write!(
                f,
                "geometry type mismatch: got {}, expected {}",
                actual.wkt_name(),
                expected.wkt_name()
            ),
            Difference::Count { actual, expected } => {
                write!(f, "got {actual} elements, expected {expected}")
            }
            Difference::Coord { actual, expected } => {
                write!(f, "coordinate {actual} differs from expected {expected}")
            }
        }
    }
}

impl Geometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point(_) => GeometryKind::Point,
            Geometry::Line(_) => GeometryKind::Line,
            Geometry::Polygon(_) => GeometryKind::Polygon,
            Geometry::MultiPoint(_) => GeometryKind::MultiPoint,
            Geometry::MultiLine(_) => GeometryKind::MultiLine,
            Geometry::MultiPolygon(_) => GeometryKind::MultiPolygon,
            Geometry::Collection(_) => GeometryKind::Collection,
        }
    }

    /// Find the first difference between `self` and `expected`
    ///
    /// Returns `None` if both geometries have the same structure and all
    /// coordinates agree within the relative `tolerance`.
    pub fn diff(&self, expected: &Geometry, tolerance: f64) -> Option<Difference> {
        use Geometry::*;

        match (self, expected) {
            (Point(a), Point(b)) => diff_coord(a, b, tolerance),
            (Line(a), Line(b)) | (MultiPoint(a), MultiPoint(b)) => diff_coords(a, b, tolerance),
            (Polygon(a), Polygon(b)) | (MultiLine(a), MultiLine(b)) => {
                diff_seq(a, b, |a, b| diff_coords(a, b, tolerance))
            }
            (MultiPolygon(a), MultiPolygon(b)) => diff_seq(a, b, |a, b| {
                diff_seq(a, b, |a, b| diff_coords(a, b, tolerance))
            }),
            (Collection(a), Collection(b)) => diff_seq(a, b, |a, b| a.diff(b, tolerance)),
            _ => Some(Difference::Kind {
                actual: self.kind(),
                expected: expected.kind(),
            }),
        }
    }

    /// Structural equality with coordinates compared under `tolerance`
    pub fn approx_eq(&self, other: &Geometry, tolerance: f64) -> bool {
        self.diff(other, tolerance).is_none()
    }

    /// Render as extended WKT with an explicit SRID, e.g. `SRID=4326;POINT(1 2)`
    pub fn to_ewkt(&self) -> String {
        format!("SRID={DEFAULT_SRID};{self}")
    }

    /// Render as a SQL literal cast to `geometry`
    pub fn to_sql_literal(&self) -> String {
        format!("'{}'::geometry", self.to_ewkt())
    }
}

fn diff_coord(actual: &Coord, expected: &Coord, tolerance: f64) -> Option<Difference> {
    if actual.is_close(expected, tolerance) {
        None
    } else {
        Some(Difference::Coord {
            actual: *actual,
            expected: *expected,
        })
    }
}

fn diff_coords(actual: &[Coord], expected: &[Coord], tolerance: f64) -> Option<Difference> {
    diff_seq(actual, expected, |a, b| diff_coord(a, b, tolerance))
}

fn diff_seq<T>(
    actual: &[T],
    expected: &[T],
    diff: impl Fn(&T, &T) -> Option<Difference>,
) -> Option<Difference> {
    if actual.len() != expected.len() {
        return Some(Difference::Count {
            actual: actual.len(),
            expected: expected.len(),
        });
    }
    actual.iter().zip(expected).find_map(|(a, b)| diff(a, b))
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind().wkt_name())?;
        match self {
            Geometry::Point(coord) => write!(f, "({coord})"),
            Geometry::Line(coords) | Geometry::MultiPoint(coords) => write_coords(f, coords),
            Geometry::Polygon(rings) | Geometry::MultiLine(rings) => write_rings(f, rings),
            Geometry::MultiPolygon(polygons) => {
                write_list(f, polygons, |f, polygon| write_rings(f, polygon))
            }
            Geometry::Collection(members) => {
                write_list(f, members, |f, member| write!(f, "{member}"))
            }
        }
    }
}

fn write_list<T>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    write_item: impl Fn(&mut fmt::Formatter<'_>, &T) -> fmt::Result,
) -> fmt::Result {
    f.write_str("(")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write_item(f, item)?;
    }
    f.write_str(")")
}

fn write_coords(f: &mut fmt::Formatter<'_>, coords: &[Coord]) -> fmt::Result {
    write_list(f, coords, |f, coord| write!(f, "{coord}"))
}

fn write_rings(f: &mut fmt::Formatter<'_>, rings: &[Vec<Coord>]) -> fmt::Result {
    write_list(f, rings, |f, ring| write_coords(f, ring))
}
