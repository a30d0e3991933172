//! Parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::layout::Property;
use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::solver::{RelationalOperator, Strength, StrengthLevel};

/// Parse a single constraint such as `a.width + b.width <= container.width @strong`
pub fn parse_constraint(input: &str) -> Result<ConstraintDecl, Vec<crate::ParseError>> {
    let len = input.len();
    let tokens = crate::parser::lexer::lex(input).map_err(|e| vec![e])?;

    let token_iter = tokens.into_iter().map(|(tok, span)| (tok, span.into()));

    // Turn the token iterator into a stream that chumsky can use
    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    constraint_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn constraint_parser<'a, I>(
) -> impl Parser<'a, I, ConstraintDecl, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let identifier = select! {
        Token::Ident(s) => s,
    }
    .map_with(|s, e| Spanned::new(s, span_range(&e.span())));

    let number = select! {
        Token::Number(n) => n,
    };

    // target.property
    let property_ref = identifier
        .clone()
        .then_ignore(just(Token::Dot))
        .then(identifier.clone())
        .try_map(|(target, property), span: SimpleSpan| {
            match Property::from_name(&property.node) {
                Some(prop) => Ok(PropertyRef {
                    target,
                    property: Spanned::new(prop, property.span),
                }),
                None => Err(Rich::custom(
                    span,
                    format!(
                        "'{}' is not a property. Expected one of: {}",
                        property.node,
                        Property::NAMES.join(", ")
                    ),
                )),
            }
        });

    // 2 * a.width, 2, a.width * 2, a.width
    let number_first = number
        .clone()
        .then(just(Token::Star).ignore_then(property_ref.clone()).or_not())
        .map(|(coefficient, reference)| Operand {
            coefficient,
            reference,
        });
    let reference_first = property_ref
        .clone()
        .then(just(Token::Star).ignore_then(number.clone()).or_not())
        .map(|(reference, coefficient)| Operand {
            coefficient: coefficient.unwrap_or(1.0),
            reference: Some(reference),
        });
    let operand = choice((number_first, reference_first))
        .map_with(|operand, e| Spanned::new(operand, span_range(&e.span())));

    let sign = choice((just(Token::Plus).to(1.0), just(Token::Minus).to(-1.0)));

    let linear_expr = sign
        .clone()
        .or_not()
        .then(operand.clone())
        .then(sign.then(operand).repeated().collect::<Vec<_>>())
        .map(|((first_sign, first), rest)| {
            let mut operands = Vec::with_capacity(rest.len() + 1);
            let first_sign = first_sign.unwrap_or(1.0);
            operands.push(Spanned::new(first.node.scaled(first_sign), first.span));
            for (sign, operand) in rest {
                operands.push(Spanned::new(operand.node.scaled(sign), operand.span));
            }
            LinearExpr { operands }
        });

    let relation = select! {
        Token::EqEq => RelationalOperator::Equal,
        Token::Equals => RelationalOperator::Equal,
        Token::LessOrEqual => RelationalOperator::LessOrEqual,
        Token::GreaterOrEqual => RelationalOperator::GreaterOrEqual,
    };

    // @strong, @weak(2.5)
    let strength = just(Token::At)
        .ignore_then(identifier)
        .then(
            number
                .delimited_by(just(Token::ParenOpen), just(Token::ParenClose))
                .or_not(),
        )
        .try_map(|(name, weight), span: SimpleSpan| {
            let level = StrengthLevel::from_name(&name.node).ok_or_else(|| {
                Rich::custom(
                    span,
                    format!(
                        "'{}' is not a strength. Expected one of: {}",
                        name.node,
                        StrengthLevel::NAMES.join(", ")
                    ),
                )
            })?;
            let strength = Strength::new(level);
            Ok(match weight {
                Some(weight) => strength.with_weight(weight),
                None => strength,
            })
        });

    linear_expr
        .clone()
        .then(relation)
        .then(linear_expr)
        .then(strength.or_not())
        .then_ignore(end())
        .map_with(|(((lhs, operator), rhs), strength), e| ConstraintDecl {
            lhs,
            operator,
            rhs,
            strength: strength.unwrap_or(Strength::REQUIRED),
            span: span_range(&e.span()),
        })
}
