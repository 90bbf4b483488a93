use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

use super::value::kind;

/// Where a path starts: the document root (`$`) or the current row (`@`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRoot {
    Document,
    Row,
}

/// One step of a path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// `.name` or `['name']`
    Key(String),
    /// `[3]`
    Index(usize),
    /// `.*` or `[*]`: every member of an object or element of an array.
    Wildcard,
}

/// A concrete step into a document, produced by resolving a [`Segment`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Step {
    Key(String),
    Index(usize),
}

/// The concrete position of one node within a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Location {
    steps: Vec<Step>,
}

/// Errors raised while parsing, reading or writing paths.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("invalid path '{path}': {reason}")]
    Syntax { path: String, reason: String },

    #[error("path '{path}' matched {count} nodes where one was expected")]
    Ambiguous { path: String, count: usize },

    #[error("cannot write to '{path}': {reason}")]
    Write { path: String, reason: String },
}

/// How many `null` elements a write may insert to reach an array index.
const MAX_INDEX_GAP: usize = 1024;

/// A parsed path expression such as `$.orders[*]` or `@.customer.tier`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    source: String,
    root: PathRoot,
    segments: Vec<Segment>,
}

impl Location {
    /// The document root.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    #[must_use]
    pub fn child(&self, step: Step) -> Self {
        let mut steps = self.steps.clone();
        steps.push(step);
        Self { steps }
    }

    /// Look up the node at this location.
    #[must_use]
    pub fn resolve<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        self.steps
            .iter()
            .try_fold(document, |node, step| match (step, node) {
                (Step::Key(key), Value::Object(map)) => map.get(key),
                (Step::Index(index), Value::Array(items)) => items.get(*index),
                _ => None,
            })
    }

    /// RFC 6901 JSON pointer for this location (`""` for the root).
    #[must_use]
    pub fn pointer(&self) -> String {
        let mut out = String::new();
        for step in &self.steps {
            out.push('/');
            match step {
                Step::Key(key) => out.push_str(&key.replace('~', "~0").replace('/', "~1")),
                Step::Index(index) => out.push_str(&index.to_string()),
            }
        }
        out
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for step in &self.steps {
            match step {
                Step::Key(key) => write!(f, "['{key}']")?,
                Step::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl JsonPath {
    /// Parse a path expression. The path must start with `$` or `@`.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::Syntax`] if the text is not a valid path.
    pub fn parse(source: &str) -> Result<Self, PathError> {
        let (root, segments) =
            crate::parse::parse_path(source).map_err(|e| PathError::Syntax {
                path: source.to_owned(),
                reason: e.message().to_owned(),
            })?;
        Ok(Self::from_parts(source, root, segments))
    }

    pub(crate) fn from_parts(source: &str, root: PathRoot, segments: Vec<Segment>) -> Self {
        Self {
            source: source.trim().to_owned(),
            root,
            segments,
        }
    }

    #[must_use]
    pub fn root(&self) -> PathRoot {
        self.root
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the path can select more than one node.
    #[must_use]
    pub fn has_wildcard(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Wildcard))
    }

    fn base(&self, row: &Location) -> Location {
        match self.root {
            PathRoot::Document => Location::root(),
            PathRoot::Row => row.clone(),
        }
    }

    /// Every node the path selects, with its location. Relative paths start
    /// at `row`; absolute paths ignore it.
    #[must_use]
    pub fn select_nodes<'a>(&self, document: &'a Value, row: &Location) -> Vec<(Location, &'a Value)> {
        let base = self.base(row);
        let Some(start) = base.resolve(document) else {
            return Vec::new();
        };
        let mut frontier = vec![(base, start)];
        for segment in &self.segments {
            let mut next = Vec::new();
            for (location, node) in frontier {
                match (segment, node) {
                    (Segment::Key(key), Value::Object(map)) => {
                        if let Some(child) = map.get(key) {
                            next.push((location.child(Step::Key(key.clone())), child));
                        }
                    }
                    (Segment::Index(index), Value::Array(items)) => {
                        if let Some(child) = items.get(*index) {
                            next.push((location.child(Step::Index(*index)), child));
                        }
                    }
                    (Segment::Wildcard, Value::Object(map)) => {
                        for (key, child) in map {
                            next.push((location.child(Step::Key(key.clone())), child));
                        }
                    }
                    (Segment::Wildcard, Value::Array(items)) => {
                        for (index, child) in items.iter().enumerate() {
                            next.push((location.child(Step::Index(index)), child));
                        }
                    }
                    _ => {}
                }
            }
            frontier = next;
        }
        frontier
    }

    /// Locations of every node the path selects.
    #[must_use]
    pub fn select(&self, document: &Value, row: &Location) -> Vec<Location> {
        self.select_nodes(document, row)
            .into_iter()
            .map(|(location, _)| location)
            .collect()
    }

    /// The single node the path selects, or `None` when nothing matches.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::Ambiguous`] when more than one node matches.
    pub fn select_one<'a>(&self, document: &'a Value, row: &Location) -> Result<Option<&'a Value>, PathError> {
        let mut nodes = self.select_nodes(document, row);
        match nodes.len() {
            0 => Ok(None),
            1 => Ok(nodes.pop().map(|(_, node)| node)),
            count => Err(PathError::Ambiguous {
                path: self.source.clone(),
                count,
            }),
        }
    }

    /// Write `value` at this path, creating intermediate objects and arrays
    /// and replacing whatever was there.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::Write`] if the path contains a wildcard, or an
    /// intermediate node exists but is of the wrong type.
    pub fn write(&self, document: &mut Value, row: &Location, value: Value) -> Result<(), PathError> {
        let mut steps = self.base(row).steps;
        for segment in &self.segments {
            steps.push(match segment {
                Segment::Key(key) => Step::Key(key.clone()),
                Segment::Index(index) => Step::Index(*index),
                Segment::Wildcard => {
                    return Err(PathError::Write {
                        path: self.source.clone(),
                        reason: "wildcards cannot be written to".to_owned(),
                    });
                }
            });
        }
        write_steps(document, &steps, value).map_err(|reason| PathError::Write {
            path: self.source.clone(),
            reason,
        })
    }
}

fn write_steps(document: &mut Value, steps: &[Step], value: Value) -> Result<(), String> {
    let mut node = document;
    for step in steps {
        node = match step {
            Step::Key(key) => {
                if node.is_null() {
                    *node = Value::Object(Map::new());
                }
                match node {
                    Value::Object(map) => map.entry(key.clone()).or_insert(Value::Null),
                    other => {
                        return Err(format!("expected an object before '{key}', found {}", kind(other)));
                    }
                }
            }
            Step::Index(index) => {
                let len = node.as_array().map_or(0, Vec::len);
                if *index > len + MAX_INDEX_GAP {
                    return Err(format!(
                        "index {index} is more than {MAX_INDEX_GAP} past the end of the array"
                    ));
                }
                if node.is_null() {
                    *node = Value::Array(Vec::new());
                }
                match node {
                    Value::Array(items) => {
                        if items.len() <= *index {
                            items.resize(index + 1, Value::Null);
                        }
                        &mut items[*index]
                    }
                    other => {
                        return Err(format!("expected an array before [{index}], found {}", kind(other)));
                    }
                }
            }
        };
    }
    *node = value;
    Ok(())
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn path(source: &str) -> JsonPath {
        JsonPath::parse(source).unwrap()
    }

    fn sample() -> Value {
        json!({
            "store": "north",
            "orders": [
                {"id": 1, "customer": {"tier": "gold"}},
                {"id": 2, "customer": {"tier": "silver"}}
            ]
        })
    }

    #[test]
    fn select_absolute_member() {
        let doc = sample();
        let hit = path("$.store").select_one(&doc, &Location::root()).unwrap();
        assert_eq!(hit, Some(&json!("north")));
    }

    #[test]
    fn select_wildcard_rows() {
        let doc = sample();
        let rows = path("$.orders[*]").select(&doc, &Location::root());
        let pointers: Vec<String> = rows.iter().map(Location::pointer).collect();
        assert_eq!(pointers, vec!["/orders/0", "/orders/1"]);
    }

    #[test]
    fn select_relative_to_row() {
        let doc = sample();
        let row = Location::root()
            .child(Step::Key("orders".into()))
            .child(Step::Index(1));
        let hit = path("@.customer.tier").select_one(&doc, &row).unwrap();
        assert_eq!(hit, Some(&json!("silver")));
    }

    #[test]
    fn relative_path_ignores_row_for_absolute() {
        let doc = sample();
        let row = Location::root().child(Step::Key("orders".into()));
        let hit = path("$.store").select_one(&doc, &row).unwrap();
        assert_eq!(hit, Some(&json!("north")));
    }

    #[test]
    fn select_missing_is_none() {
        let doc = sample();
        assert_eq!(path("$.nope").select_one(&doc, &Location::root()).unwrap(), None);
        assert_eq!(path("$.orders[9]").select_one(&doc, &Location::root()).unwrap(), None);
    }

    #[test]
    fn select_one_rejects_many() {
        let doc = sample();
        let err = path("$.orders[*].id").select_one(&doc, &Location::root()).unwrap_err();
        assert_eq!(
            err,
            PathError::Ambiguous {
                path: "$.orders[*].id".into(),
                count: 2
            }
        );
    }

    #[test]
    fn write_creates_intermediates() {
        let mut doc = json!({});
        path("$.a.b[2].c")
            .write(&mut doc, &Location::root(), json!(5))
            .unwrap();
        assert_eq!(doc, json!({"a": {"b": [null, null, {"c": 5}]}}));
    }

    #[test]
    fn write_overwrites_existing() {
        let mut doc = sample();
        let row = Location::root()
            .child(Step::Key("orders".into()))
            .child(Step::Index(0));
        path("@.customer.tier").write(&mut doc, &row, json!("platinum")).unwrap();
        assert_eq!(doc["orders"][0]["customer"]["tier"], json!("platinum"));
        assert_eq!(doc["orders"][1]["customer"]["tier"], json!("silver"));
    }

    #[test]
    fn write_through_scalar_fails() {
        let mut doc = sample();
        let err = path("$.store.name")
            .write(&mut doc, &Location::root(), json!(1))
            .unwrap_err();
        assert!(matches!(err, PathError::Write { .. }));
    }

    #[test]
    fn write_far_past_array_end_fails() {
        let mut doc = json!({"a": [1]});
        let err = path("$.a[4294967295]")
            .write(&mut doc, &Location::root(), json!(true))
            .unwrap_err();
        assert!(matches!(err, PathError::Write { .. }));
        assert_eq!(doc, json!({"a": [1]}));

        let mut doc = json!({});
        assert!(path("$.b[4294967295]")
            .write(&mut doc, &Location::root(), json!(true))
            .is_err());
        path(&format!("$.c[{MAX_INDEX_GAP}]"))
            .write(&mut doc, &Location::root(), json!(true))
            .unwrap();
        assert_eq!(doc["c"].as_array().unwrap().len(), MAX_INDEX_GAP + 1);
    }

    #[test]
    fn write_wildcard_fails() {
        let mut doc = sample();
        let err = path("$.orders[*].flag")
            .write(&mut doc, &Location::root(), json!(true))
            .unwrap_err();
        assert!(matches!(err, PathError::Write { .. }));
    }

    #[test]
    fn pointer_escapes() {
        let location = Location::root().child(Step::Key("a/b~c".into()));
        assert_eq!(location.pointer(), "/a~1b~0c");
        assert_eq!(Location::root().pointer(), "");
    }

    #[test]
    fn location_display() {
        let location = Location::root()
            .child(Step::Key("orders".into()))
            .child(Step::Index(0));
        assert_eq!(location.to_string(), "$['orders'][0]");
    }
}
