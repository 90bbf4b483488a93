use winnow::combinator::{alt, opt, separated};
use winnow::error::{ErrMode, ModalResult, ParserError};
use winnow::prelude::*;
use winnow::stream::Stream;
use winnow::token::take_while;

use crate::types::value::parse_number;
use crate::{CompareOp, Comparison, Criteria, Literal};

// -- Whitespace -------------------------------------------------------------

fn ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., |c: char| c.is_whitespace())
        .void()
        .parse_next(input)
}

// -- Operators --------------------------------------------------------------

fn compare_op(input: &mut &str) -> ModalResult<CompareOp> {
    alt((
        ">=".value(CompareOp::Gte),
        "<=".value(CompareOp::Lte),
        "!=".value(CompareOp::Neq),
        ">".value(CompareOp::Gt),
        "<".value(CompareOp::Lt),
    ))
    .parse_next(input)
}

// -- Literals ---------------------------------------------------------------

/// Byte offset of the next `&&` or `||`, or the end of input.
fn fragment_end(rest: &str) -> usize {
    [rest.find("&&"), rest.find("||")]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(rest.len())
}

fn at_boundary(rest: &str) -> bool {
    let rest = rest.trim_start();
    rest.is_empty() || rest.starts_with("&&") || rest.starts_with("||")
}

/// `'...'` whose closing quote is followed by a combinator or the end of
/// input, so the content may itself contain `&&`, `||` or quotes.
fn quoted_literal(input: &mut &str) -> ModalResult<String> {
    '\''.parse_next(input)?;
    let body: &str = *input;
    let close = body
        .char_indices()
        .filter(|&(_, c)| c == '\'')
        .map(|(at, _)| at)
        .find(|&at| at_boundary(&body[at + 1..]));
    let Some(close) = close else {
        return Err(ErrMode::from_input(input));
    };
    let content = input.next_slice(close);
    '\''.parse_next(input)?;
    Ok(content.to_owned())
}

fn plain_literal<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    let end = fragment_end(*input);
    Ok(input.next_slice(end).trim())
}

fn classify(text: &str) -> Literal {
    if text.is_empty() {
        Literal::Empty
    } else if text.contains('*') {
        Literal::Wildcard(text.to_owned())
    } else if let Some(value) = parse_number(text) {
        Literal::Number {
            value,
            text: text.to_owned(),
        }
    } else {
        Literal::Text(text.to_owned())
    }
}

// -- Comparisons (precedence: OR < AND < comparison) ------------------------

fn comparison(input: &mut &str) -> ModalResult<Comparison> {
    ws.parse_next(input)?;
    let op = opt(compare_op).parse_next(input)?;
    ws.parse_next(input)?;
    let literal = match opt(quoted_literal).parse_next(input)? {
        Some(text) => Literal::Quoted(text),
        None => classify(plain_literal.parse_next(input)?),
    };
    ws.parse_next(input)?;

    let op = op.unwrap_or(CompareOp::Eq);
    Ok(match literal {
        Literal::Empty if op.is_relational() => {
            Comparison::Malformed(format!("operator '{op}' has no value"))
        }
        Literal::Wildcard(pattern) if op.is_relational() => Comparison::Malformed(format!(
            "operator '{op}' cannot be applied to wildcard '{pattern}'"
        )),
        literal => Comparison::Test { op, literal },
    })
}

fn and_group(input: &mut &str) -> ModalResult<Vec<Comparison>> {
    separated(1.., comparison, "&&").parse_next(input)
}

pub(crate) fn criteria(input: &mut &str) -> ModalResult<Vec<Vec<Comparison>>> {
    separated(1.., and_group, "||").parse_next(input)
}

/// A lone empty criteria tests for blank values, but an empty fragment next
/// to others (`"5 && "`) is a syntax slip and never matches.
pub(crate) fn finish(groups: Vec<Vec<Comparison>>) -> Criteria {
    let fragments: usize = groups.iter().map(Vec::len).sum();
    if fragments <= 1 {
        return Criteria::Expr(groups);
    }
    Criteria::Expr(
        groups
            .into_iter()
            .map(|group| {
                group
                    .into_iter()
                    .map(|c| match c {
                        Comparison::Test {
                            op: CompareOp::Eq,
                            literal: Literal::Empty,
                        } => Comparison::Malformed("empty condition".to_owned()),
                        other => other,
                    })
                    .collect()
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use crate::parse::parse_criteria;

    use super::*;

    fn groups(source: &str) -> Vec<Vec<Comparison>> {
        match parse_criteria(source).unwrap() {
            Criteria::Expr(groups) => groups,
            other => panic!("expected Expr, got {other:?}"),
        }
    }

    fn test(op: CompareOp, literal: Literal) -> Comparison {
        Comparison::Test { op, literal }
    }

    fn number(text: &str) -> Literal {
        Literal::Number {
            value: text.parse().unwrap(),
            text: text.to_owned(),
        }
    }

    #[test]
    fn parse_implicit_equality() {
        assert_eq!(groups("gold"), vec![vec![test(CompareOp::Eq, Literal::Text("gold".into()))]]);
    }

    #[test]
    fn parse_all_operators() {
        let ops = [
            (">=", CompareOp::Gte),
            ("<=", CompareOp::Lte),
            ("!=", CompareOp::Neq),
            (">", CompareOp::Gt),
            ("<", CompareOp::Lt),
        ];
        for (sym, expected) in ops {
            let parsed = groups(&format!("{sym}10"));
            assert_eq!(parsed, vec![vec![test(expected, number("10"))]], "failed for {sym}");
        }
    }

    #[test]
    fn parse_whitespace_around_operator() {
        assert_eq!(groups("  >=  18 "), vec![vec![test(CompareOp::Gte, number("18"))]]);
    }

    #[test]
    fn parse_precedence_and_before_or() {
        let parsed = groups(">=20 && <=30 || >=70 && <=80");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0], vec![test(CompareOp::Gte, number("20")), test(CompareOp::Lte, number("30"))]);
        assert_eq!(parsed[1], vec![test(CompareOp::Gte, number("70")), test(CompareOp::Lte, number("80"))]);
    }

    #[test]
    fn parse_quoted_keeps_combinators() {
        let parsed = groups("'a || b' || c");
        assert_eq!(
            parsed,
            vec![
                vec![test(CompareOp::Eq, Literal::Quoted("a || b".into()))],
                vec![test(CompareOp::Eq, Literal::Text("c".into()))],
            ]
        );
    }

    #[test]
    fn parse_quoted_with_operator() {
        assert_eq!(
            groups("!='n/a'"),
            vec![vec![test(CompareOp::Neq, Literal::Quoted("n/a".into()))]]
        );
    }

    #[test]
    fn parse_wildcard() {
        assert_eq!(
            groups("*phone*"),
            vec![vec![test(CompareOp::Eq, Literal::Wildcard("*phone*".into()))]]
        );
    }

    #[test]
    fn parse_text_with_inner_spaces() {
        assert_eq!(
            groups("New York && !=Boston"),
            vec![vec![
                test(CompareOp::Eq, Literal::Text("New York".into())),
                test(CompareOp::Neq, Literal::Text("Boston".into())),
            ]]
        );
    }

    #[test]
    fn parse_special_floats_stay_text() {
        assert_eq!(groups("NaN"), vec![vec![test(CompareOp::Eq, Literal::Text("NaN".into()))]]);
    }

    #[test]
    fn relational_without_value_is_malformed() {
        assert!(matches!(groups(">=")[0][0], Comparison::Malformed(_)));
        assert!(matches!(groups("< a*")[0][0], Comparison::Malformed(_)));
    }

    #[test]
    fn empty_fragment_among_others_is_malformed() {
        let parsed = groups("5 && ");
        assert_eq!(parsed[0][0], test(CompareOp::Eq, number("5")));
        assert!(matches!(parsed[0][1], Comparison::Malformed(_)));
    }

    #[test]
    fn lone_empty_is_blank_test() {
        assert_eq!(groups(""), vec![vec![test(CompareOp::Eq, Literal::Empty)]]);
    }
}
