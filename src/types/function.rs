use std::collections::HashMap;
use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use super::path::{JsonPath, Location, PathError};
use super::value::text_form;
use crate::parse::ParseError;

/// What a function can see while it runs: the whole document and the row
/// being evaluated.
#[derive(Debug, Clone, Copy)]
pub struct FunctionContext<'a> {
    pub document: &'a Value,
    pub row: &'a Location,
}

/// A named producer of computed output values.
///
/// Implementations are registered in a [`FunctionRegistry`] and invoked from
/// result values written as `#name(arg, ...)`. Arguments arrive already
/// evaluated.
pub trait Function: Send + Sync + fmt::Debug {
    /// Lowercase name the function is called by.
    fn name(&self) -> &str;

    fn min_args(&self) -> usize {
        0
    }

    /// `None` for variadic functions.
    fn max_args(&self) -> Option<usize> {
        None
    }

    /// # Errors
    ///
    /// Returns [`FunctionError::Failed`] (or a path error) when the value
    /// cannot be produced.
    fn call(&self, args: &[Value], context: &FunctionContext<'_>) -> Result<Value, FunctionError>;
}

/// Errors raised while checking or running a function call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FunctionError {
    #[error("unknown function '{0}'")]
    Unknown(String),

    #[error("function '{name}' expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("function '{name}' failed: {reason}")]
    Failed { name: String, reason: String },
}

/// Name → function map, populated by explicit [`register`](Self::register)
/// calls.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn Function>>,
}

impl FunctionRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding `guid`, `now`, `valueof` and `concat`.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Guid);
        registry.register(Now);
        registry.register(ValueOf);
        registry.register(Concat);
        registry
    }

    /// Add or replace a function, keyed by its lowercased name.
    pub fn register(&mut self, function: impl Function + 'static) {
        self.functions
            .insert(function.name().to_ascii_lowercase(), Arc::new(function));
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Function>> {
        self.functions.get(&name.to_ascii_lowercase())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn check_arity(function: &dyn Function, got: usize) -> Result<(), FunctionError> {
    let min = function.min_args();
    let max = function.max_args();
    if got >= min && max.map_or(true, |max| got <= max) {
        return Ok(());
    }
    let expected = match max {
        Some(max) if max == min => format!("exactly {min}"),
        Some(max) if min == 0 => format!("at most {max}"),
        Some(max) => format!("{min} to {max}"),
        None => format!("at least {min}"),
    };
    Err(FunctionError::Arity {
        name: function.name().to_owned(),
        expected,
        got,
    })
}

/// One argument of a [`FunctionCall`].
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Literal(Value),
    /// Resolved against the document (or row) when the call runs. A path
    /// that selects nothing evaluates to `null`.
    Path(JsonPath),
    Call(FunctionCall),
}

/// A parsed `#name(args)` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    name: String,
    args: Vec<Argument>,
}

impl FunctionCall {
    pub(crate) fn new(name: String, args: Vec<Argument>) -> Self {
        Self { name, args }
    }

    /// # Errors
    ///
    /// Returns [`ParseError`] if `source` is not a `#name(args)` expression.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        crate::parse::parse_call(source)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn args(&self) -> &[Argument] {
        &self.args
    }

    /// Check that this call and every nested call name a registered function
    /// with an acceptable number of arguments.
    ///
    /// # Errors
    ///
    /// Returns [`FunctionError::Unknown`] or [`FunctionError::Arity`].
    pub fn validate(&self, registry: &FunctionRegistry) -> Result<(), FunctionError> {
        let function = registry
            .get(&self.name)
            .ok_or_else(|| FunctionError::Unknown(self.name.clone()))?;
        check_arity(function.as_ref(), self.args.len())?;
        for arg in &self.args {
            if let Argument::Call(inner) = arg {
                inner.validate(registry)?;
            }
        }
        Ok(())
    }

    /// Evaluate arguments left to right, then invoke the function.
    ///
    /// # Errors
    ///
    /// Returns a [`FunctionError`] if any function is missing, an argument
    /// path is ambiguous, or a function fails.
    pub fn evaluate(
        &self,
        registry: &FunctionRegistry,
        context: &FunctionContext<'_>,
    ) -> Result<Value, FunctionError> {
        let function = registry
            .get(&self.name)
            .ok_or_else(|| FunctionError::Unknown(self.name.clone()))?;
        check_arity(function.as_ref(), self.args.len())?;
        let args = self
            .args
            .iter()
            .map(|arg| match arg {
                Argument::Literal(value) => Ok(value.clone()),
                Argument::Path(path) => Ok(path
                    .select_one(context.document, context.row)?
                    .cloned()
                    .unwrap_or(Value::Null)),
                Argument::Call(inner) => inner.evaluate(registry, context),
            })
            .collect::<Result<Vec<_>, _>>()?;
        function.call(&args, context)
    }
}

/// A rule result or default result: a fixed JSON value, or a function call
/// computed per row.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    Literal(Value),
    Computed { source: String, call: FunctionCall },
}

/// `#name(` with a non-empty identifier.
fn looks_like_call(text: &str) -> bool {
    let Some(rest) = text.strip_prefix('#') else {
        return false;
    };
    let name_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    name_len > 0 && rest[name_len..].trim_start().starts_with('(')
}

impl ResultValue {
    /// Interpret a configured result. Strings shaped like `#name(...)` are
    /// calls; a leading `##` stands for a literal `#`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when a string looks like a call but does not
    /// parse as one.
    pub fn from_json(value: &Value) -> Result<Self, ParseError> {
        match value {
            Value::String(text) if text.starts_with("##") => {
                Ok(ResultValue::Literal(Value::String(text[1..].to_owned())))
            }
            Value::String(text) if looks_like_call(text) => Ok(ResultValue::Computed {
                source: text.clone(),
                call: FunctionCall::parse(text)?,
            }),
            other => Ok(ResultValue::Literal(other.clone())),
        }
    }

    /// The configured form, suitable for [`from_json`](Self::from_json).
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            ResultValue::Literal(Value::String(text)) if text.starts_with('#') => {
                Value::String(format!("#{text}"))
            }
            ResultValue::Literal(value) => value.clone(),
            ResultValue::Computed { source, .. } => Value::String(source.clone()),
        }
    }

    #[must_use]
    pub fn call(&self) -> Option<&FunctionCall> {
        match self {
            ResultValue::Literal(_) => None,
            ResultValue::Computed { call, .. } => Some(call),
        }
    }

    /// Produce the concrete value for one row.
    ///
    /// # Errors
    ///
    /// Propagates [`FunctionError`] from computed values.
    pub fn resolve(
        &self,
        registry: &FunctionRegistry,
        context: &FunctionContext<'_>,
    ) -> Result<Value, FunctionError> {
        match self {
            ResultValue::Literal(value) => Ok(value.clone()),
            ResultValue::Computed { call, .. } => call.evaluate(registry, context),
        }
    }
}

impl fmt::Display for ResultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultValue::Literal(value) => write!(f, "{value}"),
            ResultValue::Computed { source, .. } => write!(f, "{source}"),
        }
    }
}

// -- Builtins ---------------------------------------------------------------

/// `#guid()`: a fresh random UUID.
#[derive(Debug)]
struct Guid;

impl Function for Guid {
    fn name(&self) -> &str {
        "guid"
    }

    fn max_args(&self) -> Option<usize> {
        Some(0)
    }

    fn call(&self, _: &[Value], _: &FunctionContext<'_>) -> Result<Value, FunctionError> {
        Ok(Value::String(uuid::Uuid::new_v4().to_string()))
    }
}

/// `#now()` or `#now('%Y-%m-%d')`: the current UTC time, RFC 3339 unless a
/// strftime format is given.
#[derive(Debug)]
struct Now;

impl Function for Now {
    fn name(&self) -> &str {
        "now"
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }

    fn call(&self, args: &[Value], _: &FunctionContext<'_>) -> Result<Value, FunctionError> {
        let now = chrono::Utc::now();
        let Some(format) = args.first() else {
            return Ok(Value::String(now.to_rfc3339()));
        };
        let format = text_form(format).unwrap_or_default();
        let mut out = String::new();
        write!(out, "{}", now.format(&format)).map_err(|_| FunctionError::Failed {
            name: self.name().to_owned(),
            reason: format!("invalid time format '{format}'"),
        })?;
        Ok(Value::String(out))
    }
}

/// `#valueof(x)`: `x` itself, or, when `x` is a string holding a path, the
/// node that path selects.
#[derive(Debug)]
struct ValueOf;

impl Function for ValueOf {
    fn name(&self) -> &str {
        "valueof"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }

    fn call(&self, args: &[Value], context: &FunctionContext<'_>) -> Result<Value, FunctionError> {
        let arg = args.first().cloned().unwrap_or(Value::Null);
        let Value::String(text) = &arg else {
            return Ok(arg);
        };
        if !text.starts_with(['$', '@']) {
            return Ok(arg);
        }
        let path = JsonPath::parse(text)?;
        Ok(path
            .select_one(context.document, context.row)?
            .cloned()
            .unwrap_or(Value::Null))
    }
}

/// `#concat(a, b, ...)`: the text forms of all arguments joined, nulls as
/// empty.
#[derive(Debug)]
struct Concat;

impl Function for Concat {
    fn name(&self) -> &str {
        "concat"
    }

    fn call(&self, args: &[Value], _: &FunctionContext<'_>) -> Result<Value, FunctionError> {
        let joined: String = args
            .iter()
            .map(|arg| text_form(arg).unwrap_or_default())
            .collect();
        Ok(Value::String(joined))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn run(source: &str, document: &Value) -> Result<Value, FunctionError> {
        let call = FunctionCall::parse(source).unwrap();
        let row = Location::root();
        let context = FunctionContext {
            document,
            row: &row,
        };
        call.evaluate(&FunctionRegistry::with_builtins(), &context)
    }

    #[test]
    fn builtin_names() {
        let registry = FunctionRegistry::with_builtins();
        assert_eq!(registry.names(), vec!["concat", "guid", "now", "valueof"]);
        assert!(registry.contains("GUID"));
    }

    #[test]
    fn guid_is_unique_uuid() {
        let doc = json!({});
        let a = run("#guid()", &doc).unwrap();
        let b = run("#guid()", &doc).unwrap();
        assert_ne!(a, b);
        assert!(uuid::Uuid::parse_str(a.as_str().unwrap()).is_ok());
    }

    #[test]
    fn now_formats() {
        let doc = json!({});
        let stamp = run("#now()", &doc).unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(stamp.as_str().unwrap()).is_ok());
        let year = run("#now('%Y')", &doc).unwrap();
        assert_eq!(year.as_str().unwrap().len(), 4);
    }

    #[test]
    fn valueof_reads_paths() {
        let doc = json!({"price": 12, "ref": "$.price"});
        assert_eq!(run("#valueof($.price)", &doc).unwrap(), json!(12));
        assert_eq!(run("#valueof('$.price')", &doc).unwrap(), json!(12));
        assert_eq!(run("#valueof($.missing)", &doc).unwrap(), Value::Null);
        assert_eq!(run("#valueof(7)", &doc).unwrap(), json!(7));
    }

    #[test]
    fn concat_joins_text_forms() {
        let doc = json!({"first": "Ada", "age": 36});
        assert_eq!(
            run("#concat($.first, '-', $.age, $.none)", &doc).unwrap(),
            json!("Ada-36")
        );
    }

    #[test]
    fn validate_reports_unknown_and_arity() {
        let registry = FunctionRegistry::with_builtins();
        let unknown = FunctionCall::parse("#nope()").unwrap();
        assert_eq!(
            unknown.validate(&registry).unwrap_err(),
            FunctionError::Unknown("nope".into())
        );
        let arity = FunctionCall::parse("#concat(#guid(1))").unwrap();
        assert_eq!(
            arity.validate(&registry).unwrap_err().to_string(),
            "function 'guid' expects exactly 0 argument(s), got 1"
        );
    }

    #[test]
    fn ambiguous_path_argument_fails() {
        let doc = json!({"a": [1, 2]});
        let err = run("#valueof($.a[*])", &doc).unwrap_err();
        assert!(matches!(err, FunctionError::Path(PathError::Ambiguous { .. })));
    }

    #[test]
    fn result_value_forms() {
        assert_eq!(
            ResultValue::from_json(&json!("gold")).unwrap(),
            ResultValue::Literal(json!("gold"))
        );
        assert_eq!(
            ResultValue::from_json(&json!("##tag")).unwrap(),
            ResultValue::Literal(json!("#tag"))
        );
        assert_eq!(
            ResultValue::from_json(&json!("#1 pick")).unwrap(),
            ResultValue::Literal(json!("#1 pick"))
        );
        let computed = ResultValue::from_json(&json!("#guid()")).unwrap();
        assert_eq!(computed.call().map(FunctionCall::name), Some("guid"));
        assert!(ResultValue::from_json(&json!("#guid(")).is_err());
    }

    #[test]
    fn result_value_to_json_escapes() {
        let literal = ResultValue::Literal(json!("#tag"));
        assert_eq!(literal.to_json(), json!("##tag"));
        assert_eq!(ResultValue::from_json(&literal.to_json()).unwrap(), literal);
        let computed = ResultValue::from_json(&json!("#now()")).unwrap();
        assert_eq!(computed.to_json(), json!("#now()"));
    }

    #[derive(Debug)]
    struct Double;

    impl Function for Double {
        fn name(&self) -> &str {
            "Double"
        }

        fn min_args(&self) -> usize {
            1
        }

        fn max_args(&self) -> Option<usize> {
            Some(1)
        }

        fn call(&self, args: &[Value], _: &FunctionContext<'_>) -> Result<Value, FunctionError> {
            let n = args[0].as_f64().ok_or_else(|| FunctionError::Failed {
                name: "double".into(),
                reason: "not a number".into(),
            })?;
            Ok(json!(n * 2.0))
        }
    }

    #[test]
    fn custom_function_registration() {
        let mut registry = FunctionRegistry::new();
        registry.register(Double);
        let call = FunctionCall::parse("#double($.n)").unwrap();
        let doc = json!({"n": 4});
        let row = Location::root();
        let context = FunctionContext {
            document: &doc,
            row: &row,
        };
        assert_eq!(call.evaluate(&registry, &context).unwrap(), json!(8.0));
    }
}
