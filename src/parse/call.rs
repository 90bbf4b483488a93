use serde_json::Value;
use winnow::combinator::{alt, cut_err, delimited, separated};
use winnow::error::{ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{take_till, take_while};

use crate::types::function::{Argument, FunctionCall};
use crate::types::path::JsonPath;
use crate::types::value::{number_value, parse_number};

use super::path::path;

fn ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., |c: char| c.is_whitespace())
        .void()
        .parse_next(input)
}

fn ident<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        take_while(1.., |c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

fn path_argument(input: &mut &str) -> ModalResult<Argument> {
    path.with_taken()
        .map(|((root, segments), text)| Argument::Path(JsonPath::from_parts(text, root, segments)))
        .parse_next(input)
}

fn quoted_argument(input: &mut &str) -> ModalResult<Argument> {
    delimited('\'', take_till(0.., '\''), '\'')
        .map(|text: &str| Argument::Literal(Value::String(text.to_owned())))
        .parse_next(input)
}

fn bare_argument(input: &mut &str) -> ModalResult<Argument> {
    take_till(1.., (',', ')'))
        .map(|text: &str| {
            let text = text.trim();
            Argument::Literal(match text {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                "null" => Value::Null,
                _ => parse_number(text).map_or_else(|| Value::String(text.to_owned()), number_value),
            })
        })
        .parse_next(input)
}

fn argument(input: &mut &str) -> ModalResult<Argument> {
    alt((
        call.map(Argument::Call),
        path_argument,
        quoted_argument,
        bare_argument,
    ))
    .parse_next(input)
}

/// `#name(arg, ...)`. Function names are case-insensitive and stored lowercase.
pub(crate) fn call(input: &mut &str) -> ModalResult<FunctionCall> {
    '#'.parse_next(input)?;
    let name = cut_err(ident)
        .context(StrContext::Expected(StrContextValue::Description(
            "function name",
        )))
        .parse_next(input)?;
    ws.parse_next(input)?;
    cut_err('(')
        .context(StrContext::Expected(StrContextValue::CharLiteral('(')))
        .parse_next(input)?;
    ws.parse_next(input)?;
    let args: Vec<Argument> = separated(0.., delimited(ws, argument, ws), ',').parse_next(input)?;
    cut_err(')')
        .context(StrContext::Expected(StrContextValue::CharLiteral(')')))
        .parse_next(input)?;
    Ok(FunctionCall::new(name.to_ascii_lowercase(), args))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::parse::parse_call;

    use super::*;

    #[test]
    fn parse_no_arguments() {
        let call = parse_call("#guid()").unwrap();
        assert_eq!(call.name(), "guid");
        assert!(call.args().is_empty());
    }

    #[test]
    fn parse_mixed_arguments() {
        let call = parse_call("#Concat( @.first , ' ', 42, plain text, true)").unwrap();
        assert_eq!(call.name(), "concat");
        let args = call.args();
        assert_eq!(args.len(), 5);
        assert!(matches!(&args[0], Argument::Path(p) if p.as_str() == "@.first"));
        assert_eq!(args[1], Argument::Literal(json!(" ")));
        assert_eq!(args[2], Argument::Literal(json!(42)));
        assert_eq!(args[3], Argument::Literal(json!("plain text")));
        assert_eq!(args[4], Argument::Literal(json!(true)));
    }

    #[test]
    fn parse_nested_call() {
        let call = parse_call("#concat('id-', #guid())").unwrap();
        assert!(matches!(&call.args()[1], Argument::Call(inner) if inner.name() == "guid"));
    }

    #[test]
    fn reject_malformed_calls() {
        for source in ["#", "#()", "#guid", "#guid(", "#concat('a'", "#concat(a) tail"] {
            assert!(parse_call(source).is_err(), "accepted {source:?}");
        }
    }
}
