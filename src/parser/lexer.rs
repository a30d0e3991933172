//! Lexer for the constraint language using logos

use logos::Logos;

use crate::error::{ParseError, Span};

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // Relations
    #[token("==")]
    EqEq,
    #[token("=")]
    Equals,
    #[token("<=")]
    LessOrEqual,
    #[token(">=")]
    GreaterOrEqual,

    // Arithmetic
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,

    // Punctuation
    #[token(".")]
    Dot,
    #[token("@")]
    At,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,

    // Literals. Property and strength names are plain identifiers, validated by the grammar.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),
}

/// Lex input string into tokens with spans.
///
/// Stops at the first character that starts no token.
pub fn lex(input: &str) -> Result<Vec<(Token, Span)>, ParseError> {
    let mut tokens = Vec::new();
    for (tok, span) in Token::lexer(input).spanned() {
        match tok {
            Ok(tok) => tokens.push((tok, span)),
            Err(()) => {
                let text = &input[span.clone()];
                return Err(ParseError::syntax(
                    span,
                    format!("Unexpected character '{}'", text),
                ));
            }
        }
    }
    Ok(tokens)
}
