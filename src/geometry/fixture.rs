//! Compact geometry notation used in scenario tables
//!
//! ```text
//! <P>                    point
//! <P>,<P>,...            line
//! (<P>,...),(<P>,...)    polygon, outer ring first
//! [<G>; <G>; ...]        multi geometry, all members of one simple kind
//! {<G>; <G>; ...}        geometry collection, any members
//! ```
//!
//! A point `<P>` is either `<x> <y>` or the id of a node in the current
//! [`Grid`].

use crate::error::{Error, Result};
use crate::geometry::{Coord, Geometry, GeometryKind};
use crate::grid::Grid;

/// Parse fixture notation into a [`Geometry`], resolving node ids in `grid`
///
/// # Example
///
/// ```
/// use geo_fixture::geometry::{fixture, Coord, Geometry};
/// use geo_fixture::grid::Grid;
///
/// let grid = Grid::from_rows([["1", "2"]])?;
/// let geom = fixture::parse("1, 20.5 20", &grid)?;
/// assert_eq!(
///     geom,
///     Geometry::Line(vec![Coord::new(20.0, 20.0), Coord::new(20.5, 20.0)])
/// );
/// # Ok::<(), geo_fixture::Error>(())
/// ```
pub fn parse(text: &str, grid: &Grid) -> Result<Geometry> {
    FixtureParser { input: text, grid }.term(text)
}

/// Parse fixture notation and render it as `'SRID=4326;<WKT>'::geometry`
pub fn to_sql_literal(text: &str, grid: &Grid) -> Result<String> {
    Ok(parse(text, grid)?.to_sql_literal())
}

struct FixtureParser<'a> {
    input: &'a str,
    grid: &'a Grid,
}

impl FixtureParser<'_> {
    fn error(&self, reason: impl Into<String>) -> Error {
        Error::geometry(self.input, reason)
    }

    fn term(&self, text: &str) -> Result<Geometry> {
        let text = text.trim();

        if let Some(inner) = text.strip_prefix('[') {
            let inner = inner
                .strip_suffix(']')
                .ok_or_else(|| self.error("unterminated '['"))?;
            self.multi(inner)
        } else if let Some(inner) = text.strip_prefix('{') {
            let inner = inner
                .strip_suffix('}')
                .ok_or_else(|| self.error("unterminated '{'"))?;
            Ok(Geometry::Collection(self.members(inner)?))
        } else if text.contains('(') {
            Ok(Geometry::Polygon(self.rings(text)?))
        } else if text.contains(',') {
            Ok(Geometry::Line(self.line(text)?))
        } else {
            Ok(Geometry::Point(self.point(text)?))
        }
    }

    fn members(&self, text: &str) -> Result<Vec<Geometry>> {
        split_top_level(text)
            .ok_or_else(|| self.error("unbalanced brackets"))?
            .into_iter()
            .map(|member| self.term(member))
            .collect()
    }

    fn multi(&self, text: &str) -> Result<Geometry> {
        let members = self.members(text)?;
        let kind = members
            .first()
            .map(Geometry::kind)
            .ok_or_else(|| self.error("empty multi geometry"))?;
        if !matches!(
            kind,
            GeometryKind::Point | GeometryKind::Line | GeometryKind::Polygon
        ) {
            return Err(self.error(format!(
                "{} cannot be a member of a multi geometry",
                kind.wkt_name()
            )));
        }

        let mut points = Vec::new();
        let mut lines = Vec::new();
        let mut polygons = Vec::new();
        for member in members {
            match (kind, member) {
                (GeometryKind::Point, Geometry::Point(coord)) => points.push(coord),
                (GeometryKind::Line, Geometry::Line(line)) => lines.push(line),
                (GeometryKind::Polygon, Geometry::Polygon(rings)) => polygons.push(rings),
                (_, member) => {
                    return Err(self.error(format!(
                        "cannot mix {} and {} in a multi geometry",
                        kind.wkt_name(),
                        member.kind().wkt_name()
                    )));
                }
            }
        }

        Ok(match kind {
            GeometryKind::Point => Geometry::MultiPoint(points),
            GeometryKind::Line => Geometry::MultiLine(lines),
            _ => Geometry::MultiPolygon(polygons),
        })
    }

    fn rings(&self, text: &str) -> Result<Vec<Vec<Coord>>> {
        let mut rings = Vec::new();
        let mut rest = text;
        loop {
            let inner = rest
                .strip_prefix('(')
                .ok_or_else(|| self.error("expected '(' at start of ring"))?;
            let end = inner
                .find(')')
                .ok_or_else(|| self.error("unterminated ring"))?;
            rings.push(self.line(&inner[..end])?);

            rest = inner[end + 1..].trim_start();
            if rest.is_empty() {
                return Ok(rings);
            }
            rest = rest
                .strip_prefix(',')
                .ok_or_else(|| self.error("expected ',' between rings"))?
                .trim_start();
        }
    }

    fn line(&self, text: &str) -> Result<Vec<Coord>> {
        text.split(',').map(|point| self.point(point)).collect()
    }

    fn point(&self, text: &str) -> Result<Coord> {
        let parts: Vec<_> = text.split_whitespace().collect();
        match parts[..] {
            [id] => {
                let id = id.parse().map_err(|_| {
                    Error::FixtureError(format!("Point '{id}' is not a number"))
                })?;
                self.grid.node(id)
            }
            [x, y] => Ok(Coord::new(self.number(x)?, self.number(y)?)),
            _ => Err(self.error(format!("bad coordinate '{}'", text.trim()))),
        }
    }

    fn number(&self, text: &str) -> Result<f64> {
        text.parse()
            .map_err(|_| self.error(format!("invalid number '{text}'")))
    }
}

/// Split at `;` outside of any brackets, `None` if brackets are unbalanced
fn split_top_level(text: &str) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '[' | '{' | '(' => depth += 1,
            ']' | '}' | ')' => depth = depth.checked_sub(1)?,
            ';' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    parts.push(&text[start..]);
    Some(parts)
}
