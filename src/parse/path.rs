use winnow::ascii::dec_uint;
use winnow::combinator::{alt, cut_err, delimited, preceded, repeat};
use winnow::error::{ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{take_till, take_while};

use crate::types::path::{PathRoot, Segment};

fn root(input: &mut &str) -> ModalResult<PathRoot> {
    alt(('$'.value(PathRoot::Document), '@'.value(PathRoot::Row))).parse_next(input)
}

fn member_name<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_while(1.., |c: char| {
        !c.is_whitespace() && !matches!(c, '.' | '[' | ']' | ',' | '(' | ')' | '\'' | '"')
    })
    .parse_next(input)
}

fn quoted_key(input: &mut &str) -> ModalResult<String> {
    alt((
        delimited('\'', take_till(0.., '\''), '\''),
        delimited('"', take_till(0.., '"'), '"'),
    ))
    .map(str::to_owned)
    .parse_next(input)
}

fn dotted(input: &mut &str) -> ModalResult<Segment> {
    preceded(
        '.',
        cut_err(alt((
            '*'.value(Segment::Wildcard),
            member_name.map(|name: &str| Segment::Key(name.to_owned())),
        )))
        .context(StrContext::Expected(StrContextValue::Description(
            "member name or '*'",
        ))),
    )
    .parse_next(input)
}

#[allow(clippy::cast_possible_truncation)]
fn bracketed(input: &mut &str) -> ModalResult<Segment> {
    delimited(
        '[',
        cut_err(alt((
            '*'.value(Segment::Wildcard),
            dec_uint::<_, u32, _>.map(|n| Segment::Index(n as usize)),
            quoted_key.map(Segment::Key),
        )))
        .context(StrContext::Expected(StrContextValue::Description(
            "index, quoted key or '*'",
        ))),
        cut_err(']').context(StrContext::Expected(StrContextValue::CharLiteral(']'))),
    )
    .parse_next(input)
}

fn segments(input: &mut &str) -> ModalResult<Vec<Segment>> {
    repeat(0.., alt((dotted, bracketed))).parse_next(input)
}

pub(crate) fn path(input: &mut &str) -> ModalResult<(PathRoot, Vec<Segment>)> {
    (
        root.context(StrContext::Expected(StrContextValue::Description(
            "'$' or '@'",
        ))),
        segments,
    )
        .parse_next(input)
}
