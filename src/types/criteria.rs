use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::value::{as_number, parse_number, text_form};

/// Comparison operators supported in criteria strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    /// Whether the operator orders values (`>`, `>=`, `<`, `<=`).
    #[must_use]
    pub fn is_relational(self) -> bool {
        matches!(
            self,
            CompareOp::Gt | CompareOp::Gte | CompareOp::Lt | CompareOp::Lte
        )
    }

    /// Apply the operator to `tested.cmp(literal)`.
    fn holds(self, ord: Ordering) -> bool {
        match self {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Neq => ord != Ordering::Equal,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Gte => ord != Ordering::Less,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Lte => ord != Ordering::Greater,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => Ok(()),
            CompareOp::Neq => write!(f, "!="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Gte => write!(f, ">="),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Lte => write!(f, "<="),
        }
    }
}

/// The right-hand side of a single comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Plain text that parses as a number; compared numerically when the
    /// tested value is numeric too.
    Number { value: f64, text: String },
    /// Plain text compared against the tested value's string form.
    Text(String),
    /// Single-quoted text, compared verbatim. Never numeric, never a wildcard.
    Quoted(String),
    /// Plain text containing `*`, matched as a glob.
    Wildcard(String),
    /// Nothing at all: matches a null/absent value or an empty string.
    Empty,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number { text, .. } => write!(f, "{text}"),
            Literal::Text(text) | Literal::Wildcard(text) => write!(f, "{text}"),
            Literal::Quoted(text) => write!(f, "'{text}'"),
            Literal::Empty => Ok(()),
        }
    }
}

/// One `op? literal` fragment of a criteria string.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    Test { op: CompareOp, literal: Literal },
    /// A fragment that cannot be evaluated. Always false.
    Malformed(String),
}

/// A parsed criteria expression: the boolean predicate a rule condition
/// applies to one extracted input value.
///
/// Built once per distinct criteria source and shared (behind `Arc`) by every
/// rule and row that uses it.
#[derive(Debug, Clone, PartialEq)]
pub enum Criteria {
    /// AND-groups joined by OR: `a && b || c` is `[[a, b], [c]]`.
    Expr(Vec<Vec<Comparison>>),
    /// Satisfied when the tested value equals any element.
    Membership(Vec<Value>),
    /// Satisfied only by a null or absent value.
    IsNull,
    /// Never satisfied.
    Malformed(String),
}

/// Policy knobs for criteria evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CriteriaOptions {
    /// Whether `*` patterns compare case-sensitively. Defaults to `true`.
    pub wildcard_case_sensitive: bool,
}

impl Default for CriteriaOptions {
    fn default() -> Self {
        Self {
            wildcard_case_sensitive: true,
        }
    }
}

impl Criteria {
    /// Parse a criteria string. Never fails: fragments that cannot be
    /// evaluated are kept as [`Comparison::Malformed`] and evaluate to false.
    #[must_use]
    pub fn parse(source: &str) -> Self {
        crate::parse::parse_criteria(source).unwrap_or_else(|e| Criteria::Malformed(e.to_string()))
    }

    /// Build criteria from a JSON condition value. Strings are parsed, arrays
    /// become membership tests, numbers and booleans are parsed from their
    /// text form and `null` only matches null.
    #[must_use]
    pub fn from_json(criteria: &Value) -> Self {
        match criteria {
            Value::String(source) => Self::parse(source),
            Value::Array(items) => Criteria::Membership(items.clone()),
            Value::Number(n) => Self::parse(&n.to_string()),
            Value::Bool(b) => Self::parse(if *b { "true" } else { "false" }),
            Value::Null => Criteria::IsNull,
            Value::Object(_) => Criteria::Malformed("object criteria are not supported".to_owned()),
        }
    }

    /// Test a value against this criteria. `None` and `Some(Value::Null)` are
    /// both treated as "no value".
    #[must_use]
    pub fn matches(&self, tested: Option<&Value>, options: &CriteriaOptions) -> bool {
        let tested = tested.filter(|v| !v.is_null());
        match self {
            Criteria::Expr(groups) => groups
                .iter()
                .any(|group| group.iter().all(|c| c.matches(tested, options))),
            Criteria::Membership(items) => items.iter().any(|item| member_equals(item, tested)),
            Criteria::IsNull => tested.is_none(),
            Criteria::Malformed(_) => false,
        }
    }

    /// Whether the whole criteria, or any fragment of it, is malformed.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        match self {
            Criteria::Malformed(_) => true,
            Criteria::Expr(groups) => groups
                .iter()
                .flatten()
                .any(|c| matches!(c, Comparison::Malformed(_))),
            Criteria::Membership(_) | Criteria::IsNull => false,
        }
    }
}

impl Comparison {
    fn matches(&self, tested: Option<&Value>, options: &CriteriaOptions) -> bool {
        let (op, literal) = match self {
            Comparison::Test { op, literal } => (*op, literal),
            Comparison::Malformed(_) => return false,
        };
        match literal {
            Literal::Empty => {
                let empty = tested.map_or(true, |v| text_form(v).map_or(true, |t| t.is_empty()));
                match op {
                    CompareOp::Eq => empty,
                    CompareOp::Neq => !empty,
                    _ => false,
                }
            }
            Literal::Wildcard(pattern) => {
                let text = tested.and_then(text_form).unwrap_or_default();
                let hit = glob_match(pattern, &text, options.wildcard_case_sensitive);
                match op {
                    CompareOp::Eq => hit,
                    CompareOp::Neq => !hit,
                    _ => false,
                }
            }
            concrete => {
                let Some(value) = tested else {
                    return false;
                };
                match op {
                    CompareOp::Eq => literal_equals(concrete, value),
                    CompareOp::Neq => !literal_equals(concrete, value),
                    relational => literal_order(concrete, value).is_some_and(|o| relational.holds(o)),
                }
            }
        }
    }
}

fn literal_equals(literal: &Literal, value: &Value) -> bool {
    match literal {
        Literal::Number { value: n, text } => match as_number(value) {
            Some(tested) => tested == *n,
            None => text_form(value).is_some_and(|t| t == text.as_str()),
        },
        Literal::Text(text) | Literal::Quoted(text) => {
            text_form(value).is_some_and(|t| t == text.as_str())
        }
        Literal::Wildcard(_) | Literal::Empty => false,
    }
}

/// `tested.cmp(literal)` under the literal's coercion rule.
fn literal_order(literal: &Literal, value: &Value) -> Option<Ordering> {
    match literal {
        Literal::Number { value: n, .. } => as_number(value)?.partial_cmp(n),
        Literal::Text(text) | Literal::Quoted(text) => {
            Some(text_form(value)?.as_ref().cmp(text.as_str()))
        }
        Literal::Wildcard(_) | Literal::Empty => None,
    }
}

fn member_equals(item: &Value, tested: Option<&Value>) -> bool {
    let Some(value) = tested else {
        return item.is_null();
    };
    match item {
        Value::Null => false,
        Value::Number(n) => match (n.as_f64(), as_number(value)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        Value::String(s) => match (parse_number(s), as_number(value)) {
            (Some(a), Some(b)) => a == b,
            _ => text_form(value).is_some_and(|t| t == s.as_str()),
        },
        Value::Bool(_) => text_form(item) == text_form(value),
        Value::Array(_) | Value::Object(_) => item == value,
    }
}

/// Glob match where `*` matches any run of characters.
fn glob_match(pattern: &str, text: &str, case_sensitive: bool) -> bool {
    if !case_sensitive {
        return glob_match(&pattern.to_lowercase(), &text.to_lowercase(), true);
    }
    let parts: Vec<&str> = pattern.split('*').collect();
    let Some((first, rest)) = parts.split_first() else {
        return text.is_empty();
    };
    let Some(mut remaining) = text.strip_prefix(first) else {
        return false;
    };
    let Some((last, middle)) = rest.split_last() else {
        return remaining.is_empty();
    };
    for part in middle {
        match remaining.find(part) {
            Some(at) => remaining = &remaining[at + part.len()..],
            None => return false,
        }
    }
    remaining.len() >= last.len() && remaining.ends_with(last)
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::Test { op, literal } => write!(f, "{op}{literal}"),
            Comparison::Malformed(reason) => write!(f, "<malformed: {reason}>"),
        }
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criteria::Expr(groups) => {
                let rendered: Vec<String> = groups
                    .iter()
                    .map(|group| {
                        group
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join(" && ")
                    })
                    .collect();
                write!(f, "{}", rendered.join(" || "))
            }
            Criteria::Membership(items) => write!(f, "{}", Value::Array(items.clone())),
            Criteria::IsNull => write!(f, "null"),
            Criteria::Malformed(reason) => write!(f, "<malformed: {reason}>"),
        }
    }
}

/// Parsed criteria keyed by their JSON source, so identical condition text is
/// parsed once per table.
#[derive(Debug, Default)]
pub struct CriteriaCache {
    entries: HashMap<String, Arc<Criteria>>,
}

impl CriteriaCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached criteria for `criteria`, parsing it on first use.
    pub fn get_or_parse(&mut self, criteria: &Value) -> Arc<Criteria> {
        let key = criteria.to_string();
        Arc::clone(
            self.entries
                .entry(key)
                .or_insert_with(|| Arc::new(Criteria::from_json(criteria))),
        )
    }

    /// Number of distinct criteria parsed so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Evaluate a criteria string against a single value with default options.
///
/// ```
/// use jsonrules::evaluate_criteria;
/// use serde_json::json;
///
/// assert!(evaluate_criteria(">=18", Some(&json!(20))));
/// assert!(!evaluate_criteria(">=18", Some(&json!(10))));
/// assert!(evaluate_criteria("!=clothing", Some(&json!("electronics"))));
/// ```
#[must_use]
pub fn evaluate_criteria(source: &str, tested: Option<&Value>) -> bool {
    Criteria::parse(source).matches(tested, &CriteriaOptions::default())
}

/// Evaluate a JSON criteria value (string, or array for a membership test).
///
/// ```
/// use jsonrules::evaluate_criteria_json;
/// use serde_json::json;
///
/// let tiers = json!(["gold", "silver"]);
/// assert!(evaluate_criteria_json(&tiers, Some(&json!("gold"))));
/// assert!(!evaluate_criteria_json(&tiers, Some(&json!("bronze"))));
/// ```
#[must_use]
pub fn evaluate_criteria_json(criteria: &Value, tested: Option<&Value>) -> bool {
    Criteria::from_json(criteria).matches(tested, &CriteriaOptions::default())
}
