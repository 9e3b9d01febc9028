//! Tokenizer for exec expressions.

use crate::error::EvalError;

/// Longest expression source accepted, in bytes.
pub const MAX_SOURCE_LEN: usize = 2048;

/// A lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Integer literal.
    Int(i64),
    /// Floating point literal.
    Float(f64),
    /// String literal with escapes resolved.
    Str(String),
    /// Identifier or keyword.
    Ident(String),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `.`
    Dot,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `!`
    Bang,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
}

/// A token with its byte offset in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Token kind.
    pub kind: TokenKind,
    /// Byte offset of the first character.
    pub offset: usize,
}

/// Splits `source` into tokens.
///
/// # Errors
///
/// Returns a syntax error for unterminated strings, malformed numbers, and
/// unexpected characters, and a limit error for oversized input.
pub fn tokenize(source: &str) -> Result<Vec<Token>, EvalError> {
    if source.len() > MAX_SOURCE_LEN {
        return Err(EvalError::LimitExceeded {
            message: format!("expression is {} bytes (max {MAX_SOURCE_LEN})", source.len()),
        });
    }

    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let kind = if c.is_ascii_digit() {
            lex_number(source, &mut chars)?
        } else if c == '"' || c == '\'' {
            lex_string(&mut chars)?
        } else if c.is_alphabetic() || c == '_' {
            let mut ident = String::new();
            while let Some(&(_, c)) = chars.peek() {
                if c.is_alphanumeric() || c == '_' {
                    ident.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            TokenKind::Ident(ident)
        } else {
            chars.next();
            let next = chars.peek().map(|&(_, c)| c);
            let (kind, wide) = match (c, next) {
                ('=', Some('=')) => (TokenKind::EqEq, true),
                ('!', Some('=')) => (TokenKind::NotEq, true),
                ('<', Some('=')) => (TokenKind::Le, true),
                ('>', Some('=')) => (TokenKind::Ge, true),
                ('&', Some('&')) => (TokenKind::AndAnd, true),
                ('|', Some('|')) => (TokenKind::OrOr, true),
                ('<', _) => (TokenKind::Lt, false),
                ('>', _) => (TokenKind::Gt, false),
                ('!', _) => (TokenKind::Bang, false),
                ('(', _) => (TokenKind::LParen, false),
                (')', _) => (TokenKind::RParen, false),
                ('[', _) => (TokenKind::LBracket, false),
                (']', _) => (TokenKind::RBracket, false),
                ('{', _) => (TokenKind::LBrace, false),
                ('}', _) => (TokenKind::RBrace, false),
                (',', _) => (TokenKind::Comma, false),
                (':', _) => (TokenKind::Colon, false),
                ('.', _) => (TokenKind::Dot, false),
                ('+', _) => (TokenKind::Plus, false),
                ('-', _) => (TokenKind::Minus, false),
                ('*', _) => (TokenKind::Star, false),
                ('/', _) => (TokenKind::Slash, false),
                ('%', _) => (TokenKind::Percent, false),
                _ => return Err(EvalError::syntax(offset, format!("unexpected character '{c}'"))),
            };
            if wide {
                chars.next();
            }
            kind
        };

        tokens.push(Token { kind, offset });
    }

    Ok(tokens)
}

type CharStream<'a> = std::iter::Peekable<std::str::CharIndices<'a>>;

fn lex_number(source: &str, chars: &mut CharStream<'_>) -> Result<TokenKind, EvalError> {
    let start = chars.peek().map_or(0, |&(i, _)| i);
    let mut end = start;
    let mut is_float = false;

    while let Some(&(i, c)) = chars.peek() {
        let exponent_sign = (c == '+' || c == '-')
            && source[start..i].ends_with(['e', 'E']);
        if c.is_ascii_digit() || exponent_sign {
            chars.next();
        } else if c == '.' && !is_float {
            // `1.field` is not a thing; only treat the dot as decimal if a digit follows.
            let after = source[i + 1..].chars().next();
            if !after.is_some_and(|d| d.is_ascii_digit()) {
                break;
            }
            is_float = true;
            chars.next();
        } else if (c == 'e' || c == 'E') && !source[start..i].contains(['e', 'E']) {
            is_float = true;
            chars.next();
        } else {
            break;
        }
        end = i + c.len_utf8();
    }

    let text = &source[start..end];
    if is_float {
        text.parse::<f64>()
            .map(TokenKind::Float)
            .map_err(|_| EvalError::syntax(start, format!("malformed number '{text}'")))
    } else {
        text.parse::<i64>()
            .map(TokenKind::Int)
            .map_err(|_| EvalError::syntax(start, format!("integer out of range '{text}'")))
    }
}

fn lex_string(chars: &mut CharStream<'_>) -> Result<TokenKind, EvalError> {
    let Some((start, quote)) = chars.next() else {
        return Err(EvalError::syntax(0, "expected string"));
    };

    let mut out = String::new();
    loop {
        match chars.next() {
            None => return Err(EvalError::syntax(start, "unterminated string")),
            Some((_, c)) if c == quote => return Ok(TokenKind::Str(out)),
            Some((i, '\\')) => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, c @ ('\\' | '"' | '\''))) => out.push(c),
                Some((_, c)) => {
                    return Err(EvalError::syntax(i, format!("unknown escape '\\{c}'")));
                }
                None => return Err(EvalError::syntax(start, "unterminated string")),
            },
            Some((_, c)) => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .expect("tokenize failed")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_predicate_tokens() {
        assert_eq!(
            kinds("value.status == \"stale\""),
            vec![
                TokenKind::Ident("value".into()),
                TokenKind::Dot,
                TokenKind::Ident("status".into()),
                TokenKind::EqEq,
                TokenKind::Str("stale".into()),
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("42 4.5 1e3 2.5E-1"), vec![
            TokenKind::Int(42),
            TokenKind::Float(4.5),
            TokenKind::Float(1000.0),
            TokenKind::Float(0.25),
        ]);
    }

    #[test]
    fn test_index_then_field_is_not_float() {
        assert_eq!(kinds("a.0"), vec![
            TokenKind::Ident("a".into()),
            TokenKind::Dot,
            TokenKind::Int(0),
        ]);
    }

    #[test]
    fn test_single_quotes_and_escapes() {
        assert_eq!(kinds(r#"'it\'s' "a\nb""#), vec![
            TokenKind::Str("it's".into()),
            TokenKind::Str("a\nb".into()),
        ]);
    }

    #[test]
    fn test_operators() {
        assert_eq!(kinds("<= >= != && || ! %"), vec![
            TokenKind::Le,
            TokenKind::Ge,
            TokenKind::NotEq,
            TokenKind::AndAnd,
            TokenKind::OrOr,
            TokenKind::Bang,
            TokenKind::Percent,
        ]);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(tokenize("\"open"), Err(EvalError::Syntax { .. })));
        assert!(matches!(tokenize("a ; b"), Err(EvalError::Syntax { offset: 2, .. })));
        assert!(matches!(
            tokenize(&"1+".repeat(MAX_SOURCE_LEN)),
            Err(EvalError::LimitExceeded { .. })
        ));
    }
}
