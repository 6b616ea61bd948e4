//! Assembly of OPL import data from scenario fixtures
//!
//! Object lines are collected across several scenario steps and handed to
//! the importer as a single payload. A later line for the same object
//! replaces the earlier one.

use crate::error::{Error, Result};
use crate::grid::Grid;
use indexmap::IndexMap;
use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use tracing::{debug, trace};

/// OSM object type, identified by the first character of an OPL line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectType {
    Node,
    Way,
    Relation,
}

impl ObjectType {
    /// All object types in payload order
    pub const ALL: [ObjectType; 3] = [ObjectType::Node, ObjectType::Way, ObjectType::Relation];

    pub fn from_tag(tag: char) -> Option<Self> {
        match tag {
            'n' => Some(ObjectType::Node),
            'w' => Some(ObjectType::Way),
            'r' => Some(ObjectType::Relation),
            _ => None,
        }
    }

    pub fn tag(self) -> char {
        match self {
            ObjectType::Node => 'n',
            ObjectType::Way => 'w',
            ObjectType::Relation => 'r',
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Type and numeric id of an OPL object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub object_type: ObjectType,
    pub id: i64,
}

impl ObjectKey {
    /// Extract the key from the leading `<type><id>` field of an OPL line
    pub fn parse(line: &str) -> Result<Self> {
        let head = line.split(' ').next().unwrap_or(line);
        let mut chars = head.chars();
        let object_type = chars
            .next()
            .and_then(ObjectType::from_tag)
            .ok_or_else(|| {
                Error::FixtureError(format!("OPL line must start with n, w or r: '{line}'"))
            })?;
        let id = chars
            .as_str()
            .parse()
            .map_err(|_| Error::FixtureError(format!("Bad object id in OPL line '{line}'")))?;

        Ok(Self { object_type, id })
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.object_type, self.id)
    }
}

/// Ordered store of OPL object lines
///
/// Lines are kept in insertion order; replacing an object keeps its
/// original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OplStore {
    objects: IndexMap<ObjectKey, String>,
}

impl OplStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add object lines, completing coordinate-less nodes from `grid`
    ///
    /// Blank lines are ignored, surrounding whitespace is trimmed. Every
    /// other line must start with `n`, `w` or `r` followed by the object id.
    pub fn add_lines<I, S>(&mut self, lines: I, grid: &Grid) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            let line = line.as_ref().trim();
            if line.is_empty() {
                continue;
            }

            let key = ObjectKey::parse(line)?;
            let line = grid.complete(line)?;
            if let Some(previous) = self.objects.insert(key, line) {
                trace!(%key, %previous, "replaced OPL object");
            }
        }
        Ok(())
    }

    /// Add a node line for every point of the grid
    pub fn add_grid(&mut self, grid: &Grid) -> Result<()> {
        self.add_lines(grid.render_as_lines(), grid)
    }

    /// Current line for the given object
    pub fn get(&self, object_type: ObjectType, id: i64) -> Option<&str> {
        self.objects
            .get(&ObjectKey { object_type, id })
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterate over all lines in insertion order
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.objects.values().map(String::as_str)
    }

    /// Materialize the import payload and empty the store
    ///
    /// The payload lists nodes, then ways, then relations, each sorted by id
    /// ascending, one newline-terminated line per object.
    pub fn take_payload(&mut self) -> String {
        let mut objects = std::mem::take(&mut self.objects);
        objects.sort_keys();

        let mut payload = String::new();
        for object_type in ObjectType::ALL {
            let lines = objects
                .iter()
                .filter(|(key, _)| key.object_type == object_type)
                .map(|(_, line)| line);

            let mut count = 0;
            for line in lines {
                payload.push_str(line);
                payload.push('\n');
                count += 1;
            }
            debug!(object_type = %object_type, count, "added objects to OPL payload");
        }
        payload
    }
}

/// Substitute `{name}` placeholders in a block of OPL data
///
/// `{{` and `}}` produce literal braces. Placeholder names are trimmed;
/// format specs like `{id:03}` are not supported. An unknown name or an
/// unmatched brace is a [`Error::FixtureError`].
///
/// # Example
///
/// ```
/// use geo_fixture::opl::format_template;
/// use indexmap::IndexMap;
///
/// let vars = IndexMap::from([("id", 42)]);
/// let text = format_template("w{id} Nn1,n2", &vars)?;
/// assert_eq!(text, "w42 Nn1,n2");
/// # Ok::<(), geo_fixture::Error>(())
/// ```
pub fn format_template<K, V>(text: &str, vars: &IndexMap<K, V>) -> Result<String>
where
    K: Borrow<str> + Hash + Eq,
    V: fmt::Display,
{
    let mut output = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(i) = rest.find(['{', '}']) {
        output.push_str(&rest[..i]);
        let tail = &rest[i..];

        if let Some(after) = tail.strip_prefix("{{") {
            output.push('{');
            rest = after;
        } else if let Some(after) = tail.strip_prefix("}}") {
            output.push('}');
            rest = after;
        } else if tail.starts_with('}') {
            return Err(Error::FixtureError(format!(
                "Single '}}' in formatted OSM data at offset {}",
                text.len() - tail.len()
            )));
        } else {
            let end = tail.find('}').ok_or_else(|| {
                Error::FixtureError(format!(
                    "Unbalanced '{{' in formatted OSM data at offset {}",
                    text.len() - tail.len()
                ))
            })?;
            let name = tail[1..end].trim();
            let value = vars.get(name).ok_or_else(|| {
                Error::FixtureError(format!("Unknown placeholder '{name}' in formatted OSM data"))
            })?;
            output.push_str(&value.to_string());
            rest = &tail[end + 1..];
        }
    }

    output.push_str(rest);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_err, assert_none, assert_ok, assert_some_eq};
    use insta::{assert_debug_snapshot, assert_snapshot};

    fn grid() -> Grid {
        Grid::from_rows([["1", "2"], ["3", ""]]).unwrap()
    }

    #[test]
    fn parse_key() {
        let key = assert_ok!(ObjectKey::parse("w12 Thighway=primary Nn1,n2"));
        assert_eq!(key.object_type, ObjectType::Way);
        assert_eq!(key.id, 12);
        assert_eq!(key.to_string(), "w12");

        let key = assert_ok!(ObjectKey::parse("n-3"));
        assert_eq!(key.id, -3);
    }

    #[test]
    fn bad_prefix() {
        let mut store = OplStore::new();
        let err = assert_err!(store.add_lines(["x1 Tfoo=bar"], &grid()));
        assert_snapshot!(err, @"Scenario error: OPL line must start with n, w or r: 'x1 Tfoo=bar'");

        assert_err!(store.add_lines(["nfoo"], &grid()));
        assert!(store.is_empty());
    }

    #[test]
    fn blank_lines_are_ignored() {
        let mut store = OplStore::new();
        assert_ok!(store.add_lines(["", "   ", "  w1 Nn1,n2  ", ""], &grid()));
        assert_eq!(store.len(), 1);
        assert_some_eq!(store.get(ObjectType::Way, 1), "w1 Nn1,n2");
    }

    #[test]
    fn nodes_are_completed_from_grid() {
        let mut store = OplStore::new();
        store
            .add_lines(["n2 Tamenity=cafe", "n5 x1.5 y2.5"], &grid())
            .unwrap();
        assert_some_eq!(store.get(ObjectType::Node, 2), "n2 Tamenity=cafe x20.1 y20.0");
        assert_some_eq!(store.get(ObjectType::Node, 5), "n5 x1.5 y2.5");
        assert_none!(store.get(ObjectType::Node, 1));
    }

    #[test]
    fn missing_grid_node() {
        let mut store = OplStore::new();
        let err = assert_err!(store.add_lines(["n42"], &grid()));
        assert!(matches!(err, Error::FixtureError(_)));
    }

    #[test]
    fn later_definition_replaces_earlier() {
        let mut store = OplStore::new();
        let grid = grid();
        store.add_grid(&grid).unwrap();
        store
            .add_lines(["w1 Nn1,n2", "n2 Tshop=bakery", "w1 Thighway=path Nn1,n3"], &grid)
            .unwrap();

        assert_eq!(store.len(), 4);
        assert_debug_snapshot!(store.lines().collect::<Vec<_>>(), @r#"
        [
            "n1 x20.0 y20.0",
            "n2 Tshop=bakery x20.1 y20.0",
            "n3 x20.0 y19.9",
            "w1 Thighway=path Nn1,n3",
        ]
        "#);
    }

    #[test]
    fn payload_is_grouped_and_sorted() {
        let mut store = OplStore::new();
        let grid = grid();
        store
            .add_lines(
                [
                    "r1 Mw10@,w2@",
                    "w10 Nn3,n1",
                    "n3",
                    "w2 Nn1,n2",
                    "n1",
                    "n10 x0 y0",
                    "n2",
                ],
                &grid,
            )
            .unwrap();

        let payload = store.take_payload();
        assert_snapshot!(payload, @r"
        n1 x20.0 y20.0
        n2 x20.1 y20.0
        n3 x20.0 y19.9
        n10 x0 y0
        w2 Nn1,n2
        w10 Nn3,n1
        r1 Mw10@,w2@
        ");

        assert!(store.is_empty());
        assert_eq!(store.take_payload(), "");
    }

    #[test]
    fn template_substitution() {
        let vars = IndexMap::from([("way", "10".to_string()), ("name", "Main St".to_string())]);
        let text = assert_ok!(format_template(
            "w{way} Tname={ name } Nn1,n2\nr1 Mw{way}@{{outer}}",
            &vars
        ));
        assert_snapshot!(text, @r"
        w10 Tname=Main St Nn1,n2
        r1 Mw10@{outer}
        ");

        assert_eq!(format_template("n1 x1 y2", &vars).unwrap(), "n1 x1 y2");
    }

    #[test]
    fn template_errors() {
        let vars = IndexMap::from([("way", 10)]);

        let err = assert_err!(format_template("w{node} Nn1", &vars));
        assert_snapshot!(err, @"Scenario error: Unknown placeholder 'node' in formatted OSM data");

        let err = assert_err!(format_template("w{way Nn1", &vars));
        assert_snapshot!(err, @"Scenario error: Unbalanced '{' in formatted OSM data at offset 1");

        let err = assert_err!(format_template("w1 Tfoo=}", &vars));
        assert!(matches!(err, Error::FixtureError(_)));
    }

    #[test]
    fn negative_ids_sort_first() {
        let mut store = OplStore::new();
        store
            .add_lines(["n5 x1 y1", "n-1 x0 y0", "n0 x2 y2"], &Grid::default())
            .unwrap();
        assert_eq!(store.take_payload(), "n-1 x0 y0\nn0 x2 y2\nn5 x1 y1\n");
    }
}
