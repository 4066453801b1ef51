//! Recursive-descent parser for the relational-algebra query language.
//!
//! ```ebnf
//! statement    = query ";" ;
//! query        = set_expr ;
//! set_expr     = join_expr ( ( "union" | "intersect" | "except" ) join_expr )* ;
//! join_expr    = factor ( join_op condition? factor )* ;
//! join_op      = "cross join" | "natural left join" | "natural join"
//!              | "hash left join" | "hash join"
//!              | "merge left join" | "merge join"
//!              | "left join" | "join" ;
//! factor       = "pi" "distinct"? column_list query
//!              | "sigma" condition query
//!              | "gamma" name_list? "aggregate" agg_list query
//!              | "tau" name_list query
//!              | "explain" query
//!              | name ( "as" name )?
//!              | "(" query ")" ;
//! column_list  = column_item ( "," column_item )* ;
//! column_item  = ( name "as" )? expression ;
//! agg_item     = name "as" func "(" expression ")" ;
//! condition    = disjunctive ;
//! ```
//!
//! Conditions use the usual precedence ladder, `or` < `and` < comparison <
//! additive < multiplicative, all left-associative. Levels that match a
//! single term pass it through without a wrapper node.

mod ast;

pub use ast::*;

use crate::error::{QueryError, Result};
use crate::value::{ArithmeticOp, ComparativeOp, Value};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_until},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0},
    combinator::{map, map_res, not, opt, recognize, verify},
    error::ParseError,
    multi::{fold_many0, many0_count, separated_list1},
    sequence::{delimited, pair, preceded, terminated},
    IResult, Parser,
};
use ordered_float::OrderedFloat;

/// Words the grammar claims for itself; identifiers may not collide.
const RESERVED: &[&str] = &[
    "pi", "sigma", "gamma", "tau", "explain", "distinct", "aggregate", "as",
    "join", "left", "cross", "natural", "hash", "merge", "union", "intersect",
    "except", "and", "or", "null",
];

/// Split a query text on `;` and parse every non-empty statement.
pub fn parse_statements(text: &str) -> Result<Vec<QueryAst>> {
    text.split(';')
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(parse_query)
        .collect()
}

/// Parse a single statement, requiring the whole input to be consumed.
pub fn parse_query(text: &str) -> Result<QueryAst> {
    match query(text) {
        Ok((rest, ast)) if rest.trim().is_empty() => Ok(ast),
        Ok((rest, _)) => Err(QueryError::Parse(format!(
            "unexpected trailing input: '{}'",
            rest.trim()
        ))),
        Err(err) => Err(QueryError::Parse(format!(
            "malformed query '{}': {err}",
            text.trim()
        ))),
    }
}

/// Leading-whitespace eater, applied in front of every token-level parser.
fn lead_ws<'a, O, E: ParseError<&'a str>, F>(
    inner: F,
) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
{
    preceded(multispace0, inner)
}

/// A keyword is its tag not followed by another identifier character, so
/// `pick` never half-matches `pi`.
fn keyword<'a>(word: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = nom::error::Error<&'a str>> {
    terminated(tag(word), not(alt((alphanumeric1, tag("_")))))
}

fn bare_identifier(input: &str) -> IResult<&str, &str> {
    let raw = recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ));
    verify(raw, |ident: &str| !RESERVED.contains(&ident)).parse(input)
}

/// Column or table name, optionally qualified as `relation.column`.
fn name(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(
            bare_identifier,
            opt(preceded(char('.'), bare_identifier)),
        )),
        str::to_string,
    )
    .parse(input)
}

fn integer(input: &str) -> IResult<&str, i64> {
    map_res(
        recognize(preceded(opt(char('-')), digit1)),
        str::parse::<i64>,
    )
    .parse(input)
}

fn float(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize((opt(char('-')), digit1, char('.'), digit1)),
        str::parse::<f64>,
    )
    .parse(input)
}

fn literal(input: &str) -> IResult<&str, Value> {
    alt((
        map(
            delimited(char('"'), take_until("\""), char('"')),
            |s: &str| Value::Varchar(s.to_string()),
        ),
        map(float, |f| Value::Float(OrderedFloat(f))),
        map(integer, Value::Int),
        map(keyword("null"), |_| Value::Null),
    ))
    .parse(input)
}

fn primary(input: &str) -> IResult<&str, ExprAst> {
    alt((
        map(literal, ExprAst::Literal),
        map(name, ExprAst::Column),
        delimited(char('('), lead_ws(condition), lead_ws(char(')'))),
    ))
    .parse(input)
}

fn multiplicative(input: &str) -> IResult<&str, ExprAst> {
    let operator = lead_ws(alt((
        map(char('*'), |_| ArithmeticOp::Times),
        map(char('/'), |_| ArithmeticOp::Divide),
    )));

    primary.parse(input).and_then(|(input, left)| {
        fold_many0(
            pair(operator, lead_ws(primary)),
            move || left.clone(),
            |left, (op, right)| ExprAst::Arithmetic {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
        )
        .parse(input)
    })
}

fn additive(input: &str) -> IResult<&str, ExprAst> {
    let operator = lead_ws(alt((
        map(char('+'), |_| ArithmeticOp::Add),
        map(char('-'), |_| ArithmeticOp::Subtract),
    )));

    multiplicative.parse(input).and_then(|(input, left)| {
        fold_many0(
            pair(operator, lead_ws(multiplicative)),
            move || left.clone(),
            |left, (op, right)| ExprAst::Arithmetic {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
        )
        .parse(input)
    })
}

fn comparative(input: &str) -> IResult<&str, ExprAst> {
    let operator = lead_ws(alt((
        map(tag("!="), |_| ComparativeOp::Neq),
        map(tag("<="), |_| ComparativeOp::Le),
        map(tag(">="), |_| ComparativeOp::Ge),
        map(tag("<"), |_| ComparativeOp::Lt),
        map(tag(">"), |_| ComparativeOp::Gt),
        map(tag("="), |_| ComparativeOp::Eq),
    )));

    additive.parse(input).and_then(|(input, left)| {
        opt(pair(operator, lead_ws(additive)))
            .parse(input)
            .map(|(input, tail)| {
                let expr = match tail {
                    Some((op, right)) => ExprAst::Comparative {
                        left: Box::new(left),
                        op,
                        right: Box::new(right),
                    },
                    None => left,
                };
                (input, expr)
            })
    })
}

fn conjunctive(input: &str) -> IResult<&str, ExprAst> {
    separated_list1(lead_ws(keyword("and")), lead_ws(comparative))
        .parse(input)
        .map(|(input, mut parts)| {
            let expr = if parts.len() == 1 {
                parts.pop().unwrap()
            } else {
                ExprAst::And(parts)
            };
            (input, expr)
        })
}

fn condition(input: &str) -> IResult<&str, ExprAst> {
    separated_list1(lead_ws(keyword("or")), lead_ws(conjunctive))
        .parse(input)
        .map(|(input, mut parts)| {
            let expr = if parts.len() == 1 {
                parts.pop().unwrap()
            } else {
                ExprAst::Or(parts)
            };
            (input, expr)
        })
}

fn column_item(input: &str) -> IResult<&str, ColumnItem> {
    map(
        pair(
            opt(terminated(name, lead_ws(keyword("as")))),
            lead_ws(condition),
        ),
        |(alias, expr)| ColumnItem { alias, expr },
    )
    .parse(input)
}

fn aggregate_item(input: &str) -> IResult<&str, AggregateItem> {
    map(
        (
            name,
            lead_ws(keyword("as")),
            lead_ws(bare_identifier),
            lead_ws(char('(')),
            lead_ws(condition),
            lead_ws(char(')')),
        ),
        |(alias, _, function, _, expr, _)| AggregateItem {
            alias,
            function: function.to_string(),
            expr,
        },
    )
    .parse(input)
}

fn name_list(input: &str) -> IResult<&str, Vec<String>> {
    separated_list1(lead_ws(char(',')), lead_ws(name)).parse(input)
}

fn projection(input: &str) -> IResult<&str, QueryAst> {
    map(
        preceded(
            keyword("pi"),
            (
                opt(lead_ws(keyword("distinct"))),
                separated_list1(lead_ws(char(',')), lead_ws(column_item)),
                lead_ws(query),
            ),
        ),
        |(distinct, columns, input)| QueryAst::Projection {
            distinct: distinct.is_some(),
            columns,
            input: Box::new(input),
        },
    )
    .parse(input)
}

fn selection(input: &str) -> IResult<&str, QueryAst> {
    map(
        preceded(keyword("sigma"), pair(lead_ws(condition), lead_ws(query))),
        |(condition, input)| QueryAst::Selection {
            condition,
            input: Box::new(input),
        },
    )
    .parse(input)
}

fn grouping(input: &str) -> IResult<&str, QueryAst> {
    map(
        preceded(
            keyword("gamma"),
            (
                opt(lead_ws(name_list)),
                lead_ws(keyword("aggregate")),
                separated_list1(lead_ws(char(',')), lead_ws(aggregate_item)),
                lead_ws(query),
            ),
        ),
        |(group_columns, _, aggregates, input)| QueryAst::Grouping {
            group_columns: group_columns.unwrap_or_default(),
            aggregates,
            input: Box::new(input),
        },
    )
    .parse(input)
}

fn ordering(input: &str) -> IResult<&str, QueryAst> {
    map(
        preceded(keyword("tau"), pair(lead_ws(name_list), lead_ws(query))),
        |(columns, input)| QueryAst::Ordering {
            columns,
            input: Box::new(input),
        },
    )
    .parse(input)
}

fn explain(input: &str) -> IResult<&str, QueryAst> {
    map(preceded(keyword("explain"), lead_ws(query)), |input| {
        QueryAst::Explain {
            input: Box::new(input),
        }
    })
    .parse(input)
}

/// Relation name; a leading `#` marks the synthesized meta relations.
fn relation_name(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(opt(char('#')), bare_identifier)),
        str::to_string,
    )
    .parse(input)
}

fn relation(input: &str) -> IResult<&str, QueryAst> {
    map(
        pair(
            relation_name,
            opt(preceded(lead_ws(keyword("as")), lead_ws(name))),
        ),
        |(name, alias)| QueryAst::Relation { name, alias },
    )
    .parse(input)
}

fn factor(input: &str) -> IResult<&str, QueryAst> {
    alt((
        projection,
        selection,
        grouping,
        ordering,
        explain,
        relation,
        delimited(char('('), lead_ws(query), lead_ws(char(')'))),
    ))
    .parse(input)
}

fn join_operator(input: &str) -> IResult<&str, JoinOpAst> {
    let two = |first: &'static str, op: JoinOpAst| {
        map(pair(keyword(first), lead_ws(keyword("join"))), move |_| op)
    };
    let three = |first: &'static str, op: JoinOpAst| {
        map(
            (
                keyword(first),
                lead_ws(keyword("left")),
                lead_ws(keyword("join")),
            ),
            move |_| op,
        )
    };
    alt((
        two("cross", JoinOpAst::Cross),
        three("natural", JoinOpAst::NaturalLeftOuter),
        two("natural", JoinOpAst::NaturalInner),
        three("hash", JoinOpAst::HashLeftOuter),
        two("hash", JoinOpAst::HashInner),
        three("merge", JoinOpAst::MergeLeftOuter),
        two("merge", JoinOpAst::MergeInner),
        two("left", JoinOpAst::LeftOuter),
        map(keyword("join"), |_| JoinOpAst::Inner),
    ))
    .parse(input)
}

fn join_expr(input: &str) -> IResult<&str, QueryAst> {
    factor.parse(input).and_then(|(input, left)| {
        fold_many0(
            (
                lead_ws(join_operator),
                opt(lead_ws(join_condition)),
                lead_ws(factor),
            ),
            move || left.clone(),
            |left, (op, condition, right)| QueryAst::Join {
                op,
                condition,
                left: Box::new(left),
                right: Box::new(right),
            },
        )
        .parse(input)
    })
}

/// Cross and natural joins carry no condition; for the others a condition is
/// attempted and the relation that follows disambiguates by position.
fn join_condition(input: &str) -> IResult<&str, ExprAst> {
    verify(condition, |expr| !matches!(expr, ExprAst::Column(_))).parse(input)
}

fn set_operator(input: &str) -> IResult<&str, SetOpAst> {
    alt((
        map(keyword("union"), |_| SetOpAst::Union),
        map(keyword("intersect"), |_| SetOpAst::Intersect),
        map(keyword("except"), |_| SetOpAst::Except),
    ))
    .parse(input)
}

fn query(input: &str) -> IResult<&str, QueryAst> {
    lead_ws(join_expr).parse(input).and_then(|(input, left)| {
        fold_many0(
            pair(lead_ws(set_operator), lead_ws(join_expr)),
            move || left.clone(),
            |left, (op, right)| QueryAst::SetOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        )
        .parse(input)
    })
}
