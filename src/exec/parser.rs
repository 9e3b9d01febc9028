//! Recursive-descent parser producing the expression AST.
//!
//! Precedence, loosest first: `or`/`||`, `and`/`&&`, `not`/`!`, comparisons
//! (including `in` and `not in`), `+ -`, `* / %`, unary `-`, then postfix
//! field access, indexing, and calls.

use serde_json::Value;

use crate::error::EvalError;

use super::lexer::{Token, TokenKind, tokenize};

/// Deepest AST accepted.
pub const MAX_DEPTH: usize = 64;

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Logical negation.
    Not,
    /// Arithmetic negation.
    Neg,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// Short-circuit or.
    Or,
    /// Short-circuit and.
    And,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// Membership.
    In,
    /// Negated membership.
    NotIn,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
}

/// Expression AST.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A constant.
    Literal(Value),
    /// A bound variable (`key` or `value`).
    Var(String),
    /// `target.name`
    Field(Box<Expr>, String),
    /// `target[index]`
    Index(Box<Expr>, Box<Expr>),
    /// `name(args...)`
    Call(String, Vec<Expr>),
    /// Unary operation.
    Unary(UnaryOp, Box<Expr>),
    /// Binary operation.
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// Tuple or list literal; both evaluate to a sequence.
    List(Vec<Expr>),
    /// Object literal with string keys.
    Object(Vec<(String, Expr)>),
}

impl Expr {
    /// Nesting depth of the tree.
    #[must_use]
    pub fn depth(&self) -> usize {
        let children = match self {
            Self::Literal(_) | Self::Var(_) => 0,
            Self::Field(inner, _) | Self::Unary(_, inner) => inner.depth(),
            Self::Index(a, b) | Self::Binary(_, a, b) => a.depth().max(b.depth()),
            Self::Call(_, items) | Self::List(items) => {
                items.iter().map(Self::depth).max().unwrap_or(0)
            }
            Self::Object(entries) => entries.iter().map(|(_, e)| e.depth()).max().unwrap_or(0),
        };
        children + 1
    }
}

/// Parses an expression.
///
/// # Errors
///
/// Returns a syntax error for malformed input and a limit error for input that
/// is too long or too deeply nested.
pub fn parse(source: &str) -> Result<Expr, EvalError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        nesting: 0,
        end: source.len(),
    };
    let expr = parser.expression()?;
    if let Some(token) = parser.peek() {
        return Err(EvalError::syntax(token.offset, "unexpected trailing input"));
    }
    if expr.depth() > MAX_DEPTH {
        return Err(too_deep());
    }
    Ok(expr)
}

fn too_deep() -> EvalError {
    EvalError::LimitExceeded {
        message: format!("nesting deeper than {MAX_DEPTH}"),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    nesting: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn peek_keyword(&self, offset: usize, word: &str) -> bool {
        matches!(
            self.tokens.get(self.pos + offset),
            Some(Token { kind: TokenKind::Ident(name), .. }) if name == word
        )
    }

    fn offset(&self) -> usize {
        self.peek().map_or(self.end, |t| t.offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<(), EvalError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(EvalError::syntax(self.offset(), format!("expected {what}")))
        }
    }

    fn descend(&mut self) -> Result<(), EvalError> {
        self.nesting += 1;
        if self.nesting > MAX_DEPTH {
            return Err(too_deep());
        }
        Ok(())
    }

    fn expression(&mut self) -> Result<Expr, EvalError> {
        self.descend()?;
        let expr = self.or_expr();
        self.nesting -= 1;
        expr
    }

    fn or_expr(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.and_expr()?;
        while self.eat(&TokenKind::OrOr) || self.eat_keyword("or") {
            let right = self.and_expr()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.not_expr()?;
        while self.eat(&TokenKind::AndAnd) || self.eat_keyword("and") {
            let right = self.not_expr()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expr, EvalError> {
        if self.eat(&TokenKind::Bang) || self.eat_keyword("not") {
            self.descend()?;
            let inner = self.not_expr();
            self.nesting -= 1;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(inner?)));
        }
        self.comparison()
    }

    fn eat_keyword(&mut self, word: &str) -> bool {
        if self.peek_keyword(0, word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn comparison_op(&mut self) -> Option<BinaryOp> {
        let op = match self.peek_kind()? {
            TokenKind::EqEq => BinaryOp::Eq,
            TokenKind::NotEq => BinaryOp::Ne,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Le => BinaryOp::Le,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::Ge => BinaryOp::Ge,
            TokenKind::Ident(word) if word == "in" => BinaryOp::In,
            TokenKind::Ident(word) if word == "not" && self.peek_keyword(1, "in") => {
                self.pos += 1;
                BinaryOp::NotIn
            }
            _ => return None,
        };
        self.pos += 1;
        Some(op)
    }

    fn comparison(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.additive()?;
        while let Some(op) = self.comparison_op() {
            let right = self.additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn term(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                Some(TokenKind::Percent) => BinaryOp::Rem,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn unary(&mut self) -> Result<Expr, EvalError> {
        if self.eat(&TokenKind::Minus) {
            self.descend()?;
            let inner = self.unary();
            self.nesting -= 1;
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(inner?)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&TokenKind::Dot) {
                let offset = self.offset();
                expr = match self.advance().map(|t| t.kind) {
                    Some(TokenKind::Ident(name)) => Expr::Field(Box::new(expr), name),
                    Some(TokenKind::Int(i)) => {
                        Expr::Index(Box::new(expr), Box::new(Expr::Literal(Value::from(i))))
                    }
                    _ => return Err(EvalError::syntax(offset, "expected field name after '.'")),
                };
            } else if self.eat(&TokenKind::LBracket) {
                let index = self.expression()?;
                self.expect(&TokenKind::RBracket, "']'")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if self.peek_kind() == Some(&TokenKind::LParen) {
                let Expr::Var(name) = expr else {
                    return Err(EvalError::syntax(self.offset(), "only named functions can be called"));
                };
                self.pos += 1;
                let args = self.sequence(&TokenKind::RParen)?.0;
                expr = Expr::Call(name, args);
            } else {
                return Ok(expr);
            }
        }
    }

    /// Parses comma-separated expressions up to `close`. The flag reports
    /// whether a trailing comma was seen.
    fn sequence(&mut self, close: &TokenKind) -> Result<(Vec<Expr>, bool), EvalError> {
        let mut items = Vec::new();
        let mut trailing = false;
        while !self.eat(close) {
            if !items.is_empty() {
                self.expect(&TokenKind::Comma, "','")?;
                trailing = true;
                if self.eat(close) {
                    break;
                }
            }
            items.push(self.expression()?);
            trailing = false;
        }
        Ok((items, trailing))
    }

    fn primary(&mut self) -> Result<Expr, EvalError> {
        let offset = self.offset();
        let Some(token) = self.advance() else {
            return Err(EvalError::syntax(offset, "unexpected end of expression"));
        };

        match token.kind {
            TokenKind::Int(i) => Ok(Expr::Literal(Value::from(i))),
            TokenKind::Float(f) => serde_json::Number::from_f64(f)
                .map(|n| Expr::Literal(Value::Number(n)))
                .ok_or_else(|| EvalError::syntax(offset, "number is not finite")),
            TokenKind::Str(s) => Ok(Expr::Literal(Value::String(s))),
            TokenKind::Ident(name) => Ok(match name.as_str() {
                "true" | "True" => Expr::Literal(Value::Bool(true)),
                "false" | "False" => Expr::Literal(Value::Bool(false)),
                "null" | "None" => Expr::Literal(Value::Null),
                "and" | "or" | "not" | "in" => {
                    return Err(EvalError::syntax(offset, format!("unexpected keyword '{name}'")));
                }
                _ => Expr::Var(name),
            }),
            TokenKind::LParen => {
                let (mut items, trailing) = self.sequence(&TokenKind::RParen)?;
                if items.len() == 1 && !trailing {
                    Ok(items.remove(0))
                } else {
                    Ok(Expr::List(items))
                }
            }
            TokenKind::LBracket => Ok(Expr::List(self.sequence(&TokenKind::RBracket)?.0)),
            TokenKind::LBrace => self.object(),
            _ => Err(EvalError::syntax(offset, "unexpected token")),
        }
    }

    fn object(&mut self) -> Result<Expr, EvalError> {
        let mut entries = Vec::new();
        while !self.eat(&TokenKind::RBrace) {
            if !entries.is_empty() {
                self.expect(&TokenKind::Comma, "','")?;
                if self.eat(&TokenKind::RBrace) {
                    break;
                }
            }
            let offset = self.offset();
            let key = match self.advance().map(|t| t.kind) {
                Some(TokenKind::Str(key) | TokenKind::Ident(key)) => key,
                _ => return Err(EvalError::syntax(offset, "expected object key")),
            };
            self.expect(&TokenKind::Colon, "':'")?;
            entries.push((key, self.expression()?));
        }
        Ok(Expr::Object(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn var(name: &str) -> Box<Expr> {
        Box::new(Expr::Var(name.into()))
    }

    fn lit(value: Value) -> Box<Expr> {
        Box::new(Expr::Literal(value))
    }

    #[test]
    fn test_field_comparison() {
        let expr = parse("value.status == 'stale'").expect("parse failed");
        assert_eq!(
            expr,
            Expr::Binary(
                BinaryOp::Eq,
                Box::new(Expr::Field(var("value"), "status".into())),
                lit(json!("stale")),
            )
        );
    }

    #[test]
    fn test_tuple_and_grouping() {
        assert_eq!(
            parse("(\"DELETE\", key)").expect("parse failed"),
            Expr::List(vec![Expr::Literal(json!("DELETE")), Expr::Var("key".into())])
        );
        assert_eq!(
            parse("(1,)").expect("parse failed"),
            Expr::List(vec![Expr::Literal(json!(1))])
        );
        assert_eq!(parse("(1)").expect("parse failed"), Expr::Literal(json!(1)));
    }

    #[test]
    fn test_precedence() {
        // not binds looser than comparison
        let expr = parse("not a == 1 or b").expect("parse failed");
        let Expr::Binary(BinaryOp::Or, left, _) = expr else {
            panic!("expected or at the top");
        };
        assert!(matches!(*left, Expr::Unary(UnaryOp::Not, _)));

        let expr = parse("1 + 2 * 3").expect("parse failed");
        assert_eq!(
            expr,
            Expr::Binary(
                BinaryOp::Add,
                lit(json!(1)),
                Box::new(Expr::Binary(BinaryOp::Mul, lit(json!(2)), lit(json!(3)))),
            )
        );
    }

    #[test]
    fn test_not_in() {
        let expr = parse("key not in ['a', 'b']").expect("parse failed");
        assert!(matches!(expr, Expr::Binary(BinaryOp::NotIn, _, _)));
    }

    #[test]
    fn test_calls_and_literals() {
        let expr = parse("startswith(key, 'tmp') && value != None").expect("parse failed");
        let Expr::Binary(BinaryOp::And, left, right) = expr else {
            panic!("expected and at the top");
        };
        assert!(matches!(*left, Expr::Call(ref name, ref args) if name == "startswith" && args.len() == 2));
        assert_eq!(*right, Expr::Binary(BinaryOp::Ne, var("value"), lit(Value::Null)));

        let expr = parse("{'a': 1, b: [True, False,]}").expect("parse failed");
        assert_eq!(
            expr,
            Expr::Object(vec![
                ("a".into(), Expr::Literal(json!(1))),
                (
                    "b".into(),
                    Expr::List(vec![Expr::Literal(json!(true)), Expr::Literal(json!(false))])
                ),
            ])
        );
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(parse("value =="), Err(EvalError::Syntax { .. })));
        assert!(matches!(parse("1 2"), Err(EvalError::Syntax { .. })));
        assert!(matches!(parse("(1"), Err(EvalError::Syntax { .. })));
        assert!(matches!(parse("value.status()"), Err(EvalError::Syntax { .. })));
        assert!(matches!(parse(""), Err(EvalError::Syntax { .. })));
    }

    #[test]
    fn test_depth_limit() {
        let nested = format!("{}1{}", "(".repeat(MAX_DEPTH + 5), ")".repeat(MAX_DEPTH + 5));
        assert!(matches!(parse(&nested), Err(EvalError::LimitExceeded { .. })));

        let chain = vec!["1"; MAX_DEPTH + 5].join("+");
        assert!(matches!(parse(&chain), Err(EvalError::LimitExceeded { .. })));

        assert!(parse(&vec!["1"; 10].join("+")).is_ok());
    }
}
