//! Parser for the WKT subset returned by `ST_AsText()`
//!
//! Supported are `POINT`, `LINESTRING`, `POLYGON`, their `MULTI` forms and
//! `GEOMETRYCOLLECTION`, all two-dimensional. Anything else, including
//! `EMPTY` geometries, Z/M ordinates and trailing text, is rejected.

use crate::error::{Error, Result};
use crate::geometry::{Coord, Geometry, GeometryKind};

/// Parse a WKT string into a [`Geometry`]
///
/// # Example
///
/// ```
/// use geo_fixture::geometry::{wkt, Coord, Geometry};
///
/// let geom = wkt::parse("POINT(20 20.5)")?;
/// assert_eq!(geom, Geometry::Point(Coord::new(20.0, 20.5)));
/// # Ok::<(), geo_fixture::Error>(())
/// ```
pub fn parse(input: &str) -> Result<Geometry> {
    let mut parser = Parser::new(input);
    let geometry = parser.geometry()?;
    match parser.next_token()? {
        Token::End => Ok(geometry),
        token => Err(parser.error(format!("unexpected {} after geometry", token.describe()))),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    Word(&'a str),
    Number(f64),
    Open,
    Close,
    Comma,
    End,
}

impl Token<'_> {
    fn describe(&self) -> String {
        match self {
            Token::Word(word) => format!("'{word}'"),
            Token::Number(n) => format!("number {n}"),
            Token::Open => "'('".into(),
            Token::Close => "')'".into(),
            Token::Comma => "','".into(),
            Token::End => "end of input".into(),
        }
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    /// Start offset of the most recently lexed token
    start: usize,
    peeked: Option<Token<'a>>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            start: 0,
            peeked: None,
        }
    }

    fn error(&self, reason: impl AsRef<str>) -> Error {
        Error::geometry(
            self.input,
            format!("{} at offset {}", reason.as_ref(), self.start),
        )
    }

    fn lex(&mut self) -> Result<Token<'a>> {
        let input = self.input;
        let rest = &input[self.pos..];
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
        self.start = self.pos;

        let Some(c) = trimmed.chars().next() else {
            return Ok(Token::End);
        };

        let token = match c {
            '(' => Token::Open,
            ')' => Token::Close,
            ',' => Token::Comma,
            c if c.is_ascii_alphabetic() => {
                let len = trimmed
                    .find(|c: char| !c.is_ascii_alphabetic())
                    .unwrap_or(trimmed.len());
                let word = &trimmed[..len];
                self.pos += len;
                return Ok(Token::Word(word));
            }
            c if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => {
                let len = trimmed
                    .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '.')))
                    .unwrap_or(trimmed.len());
                let text = &trimmed[..len];
                let value = text
                    .parse()
                    .ok()
                    .filter(|_| is_numeric_literal(text))
                    .ok_or_else(|| self.error(format!("invalid number '{text}'")))?;
                self.pos += len;
                return Ok(Token::Number(value));
            }
            c => return Err(self.error(format!("unexpected character '{c}'"))),
        };

        self.pos += 1;
        Ok(token)
    }

    fn peek(&mut self) -> Result<&Token<'a>> {
        let token = self.next_token()?;
        Ok(self.peeked.insert(token))
    }

    fn next_token(&mut self) -> Result<Token<'a>> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.lex(),
        }
    }

    fn expect(&mut self, expected: Token<'static>) -> Result<()> {
        let token = self.next_token()?;
        if token == expected {
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {}, found {}",
                expected.describe(),
                token.describe()
            )))
        }
    }

    /// Parse a comma-separated list enclosed in parentheses
    fn list<T>(&mut self, mut item: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        self.expect(Token::Open)?;
        let mut items = vec![item(self)?];
        loop {
            match self.next_token()? {
                Token::Comma => items.push(item(self)?),
                Token::Close => return Ok(items),
                token => {
                    return Err(self.error(format!(
                        "expected ',' or ')', found {}",
                        token.describe()
                    )));
                }
            }
        }
    }

    fn geometry(&mut self) -> Result<Geometry> {
        let kind = match self.next_token()? {
            Token::Word(word) => keyword(word).ok_or_else(|| {
                self.error(format!("unsupported geometry type '{word}'"))
            })?,
            token => {
                return Err(self.error(format!(
                    "expected geometry type, found {}",
                    token.describe()
                )));
            }
        };

        Ok(match kind {
            GeometryKind::Point => {
                self.expect(Token::Open)?;
                let coord = self.coord()?;
                self.expect(Token::Close)?;
                Geometry::Point(coord)
            }
            GeometryKind::Line => Geometry::Line(self.coords()?),
            GeometryKind::Polygon => Geometry::Polygon(self.rings()?),
            GeometryKind::MultiPoint => Geometry::MultiPoint(self.list(Self::multi_point_member)?),
            GeometryKind::MultiLine => Geometry::MultiLine(self.rings()?),
            GeometryKind::MultiPolygon => Geometry::MultiPolygon(self.list(Self::rings)?),
            GeometryKind::Collection => Geometry::Collection(self.list(Self::geometry)?),
        })
    }

    fn number(&mut self) -> Result<f64> {
        match self.next_token()? {
            Token::Number(value) => Ok(value),
            token => Err(self.error(format!("expected a number, found {}", token.describe()))),
        }
    }

    fn coord(&mut self) -> Result<Coord> {
        let x = self.number()?;
        let y = self.number()?;
        Ok(Coord::new(x, y))
    }

    fn coords(&mut self) -> Result<Vec<Coord>> {
        self.list(Self::coord)
    }

    fn rings(&mut self) -> Result<Vec<Vec<Coord>>> {
        self.list(Self::coords)
    }

    /// `MULTIPOINT` members may be written as `1 2` or `(1 2)`
    fn multi_point_member(&mut self) -> Result<Coord> {
        if *self.peek()? == Token::Open {
            self.next_token()?;
            let coord = self.coord()?;
            self.expect(Token::Close)?;
            Ok(coord)
        } else {
            self.coord()
        }
    }
}

/// Decimal or exponent notation, no `inf` or `NaN`
fn is_numeric_literal(text: &str) -> bool {
    text.bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E'))
}

fn keyword(word: &str) -> Option<GeometryKind> {
    [
        GeometryKind::Point,
        GeometryKind::Line,
        GeometryKind::Polygon,
        GeometryKind::MultiPoint,
        GeometryKind::MultiLine,
        GeometryKind::MultiPolygon,
        GeometryKind::Collection,
    ]
    .into_iter()
    .find(|kind| kind.wkt_name().eq_ignore_ascii_case(word))
}
