//! Module: query::parse
//! Responsibility: clause grammar and expression syntax.
//! Does not own: scoping or aggregate-function rules (see `query::validate`).
//! Boundary: every grammar-level malformation surfaces here as `ParseError`.

mod lexer;


use crate::{
    db::{
        expr::{BinaryOp, Expr, UnaryOp},
        query::clause::{Assignment, CollectClause},
    },
    value::Value,
};
use lexer::{Spanned, Token, tokenize};
use thiserror::Error as ThisError;

/// Words that cannot name a variable.
const RESERVED_WORDS: [&str; 11] = [
    "AGGREGATE", "AND", "COLLECT", "DISTINCT", "FALSE", "INTO", "NOT", "NULL", "OR", "TRUE",
    "WITH",
];

///
/// ParseError
///
/// Clause-grammar error. Raised before any semantic check runs.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ParseError {
    #[error("conflicting clause modifiers at offset {offset}: {detail}")]
    ConflictingModifiers { offset: usize, detail: &'static str },

    #[error("invalid token at offset {offset}: {detail}")]
    InvalidToken { offset: usize, detail: String },

    #[error("'{word}' is a reserved word and cannot name a variable (offset {offset})")]
    ReservedWord { word: String, offset: usize },

    #[error("unexpected {found} at offset {offset}, expected {expected}")]
    Unexpected {
        found: String,
        expected: &'static str,
        offset: usize,
    },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEnd { expected: &'static str },
}

/// Parse one `COLLECT` clause.
///
/// ```text
/// COLLECT [DISTINCT] [name = expr, ...]
///         [AGGREGATE name = expr, ...]
///         [WITH COUNT INTO name | INTO name]
/// ```
pub fn parse_collect(text: &str) -> Result<CollectClause, ParseError> {
    let mut parser = Parser::new(text)?;
    let clause = parser.collect_clause()?;
    parser.expect_end()?;

    Ok(clause)
}

/// Parse one standalone expression.
pub fn parse_expr(text: &str) -> Result<Expr, ParseError> {
    let mut parser = Parser::new(text)?;
    let expr = parser.expr()?;
    parser.expect_end()?;

    Ok(expr)
}

///
/// Parser
///
/// Recursive-descent parser over a pre-lexed token list.
///

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn new(text: &str) -> Result<Self, ParseError> {
        Ok(Self {
            tokens: tokenize(text)?,
            pos: 0,
        })
    }

    ///
    /// CLAUSE
    ///

    fn collect_clause(&mut self) -> Result<CollectClause, ParseError> {
        self.expect_word("COLLECT", "COLLECT")?;

        let mut clause = CollectClause::new();
        if self.eat_word("DISTINCT") {
            clause.distinct = true;
        }

        if matches!(self.peek(), Some(Token::Ident(word)) if !is_reserved(word)) {
            clause.groups = self.assignments("group assignment")?;
        }

        let aggregate_offset = self.offset();
        if self.eat_word("AGGREGATE") {
            clause.aggregates = self.assignments("aggregate assignment after AGGREGATE")?;
        }

        let modifier_offset = self.offset();
        if self.eat_word("WITH") {
            if !clause.aggregates.is_empty() {
                return Err(ParseError::ConflictingModifiers {
                    offset: modifier_offset,
                    detail: "WITH COUNT cannot be combined with AGGREGATE",
                });
            }
            self.expect_word("COUNT", "COUNT after WITH")?;
            self.expect_word("INTO", "INTO after WITH COUNT")?;
            clause.count_into = Some(self.variable_name("variable name after WITH COUNT INTO")?);
        } else if self.eat_word("INTO") {
            if !clause.aggregates.is_empty() {
                return Err(ParseError::ConflictingModifiers {
                    offset: modifier_offset,
                    detail: "INTO cannot be combined with AGGREGATE",
                });
            }
            clause.into = Some(self.variable_name("variable name after INTO")?);
        }

        let is_empty = clause.groups.is_empty()
            && clause.aggregates.is_empty()
            && clause.count_into.is_none()
            && clause.into.is_none();
        if is_empty {
            return Err(self.unexpected(
                "group assignment, AGGREGATE, WITH COUNT INTO or INTO after COLLECT",
                aggregate_offset,
            ));
        }

        Ok(clause)
    }

    fn assignments(&mut self, expected: &'static str) -> Result<Vec<Assignment>, ParseError> {
        let mut out = vec![self.assignment(expected)?];
        while self.eat(&Token::Comma) {
            out.push(self.assignment(expected)?);
        }

        Ok(out)
    }

    fn assignment(&mut self, expected: &'static str) -> Result<Assignment, ParseError> {
        let output = self.variable_name(expected)?;
        self.expect(&Token::Assign, "'=' after output variable")?;
        let expr = self.expr()?;

        Ok(Assignment { output, expr })
    }

    fn variable_name(&mut self, expected: &'static str) -> Result<String, ParseError> {
        let offset = self.offset();
        match self.next_token() {
            Some(Token::Ident(word)) if is_reserved(&word) => {
                Err(ParseError::ReservedWord { word, offset })
            }
            Some(Token::Ident(word)) => Ok(word),
            Some(other) => Err(ParseError::Unexpected {
                found: other.to_string(),
                expected,
                offset,
            }),
            None => Err(ParseError::UnexpectedEnd { expected }),
        }
    }

    ///
    /// EXPRESSIONS
    ///

    fn expr(&mut self) -> Result<Expr, ParseError> {
        let condition = self.or_expr()?;
        if !self.eat(&Token::Question) {
            return Ok(condition);
        }

        let then = self.expr()?;
        self.expect(&Token::Colon, "':' in ternary expression")?;
        let otherwise = self.expr()?;

        Ok(Expr::Ternary {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.and_expr()?;
        while self.eat(&Token::OrOr) || self.eat_word("OR") {
            let right = self.and_expr()?;
            left = Expr::binary(BinaryOp::Or, left, right);
        }

        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.equality()?;
        while self.eat(&Token::AndAnd) || self.eat_word("AND") {
            let right = self.equality()?;
            left = Expr::binary(BinaryOp::And, left, right);
        }

        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(Self::comparison, |token| match token {
            Token::EqEq => Some(BinaryOp::Eq),
            Token::NotEq => Some(BinaryOp::Ne),
            _ => None,
        })
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(Self::additive, |token| match token {
            Token::Lt => Some(BinaryOp::Lt),
            Token::Le => Some(BinaryOp::Le),
            Token::Gt => Some(BinaryOp::Gt),
            Token::Ge => Some(BinaryOp::Ge),
            _ => None,
        })
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(Self::multiplicative, |token| match token {
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn multiplicative(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(Self::unary, |token| match token {
            Token::Star => Some(BinaryOp::Mul),
            Token::Slash => Some(BinaryOp::Div),
            Token::Percent => Some(BinaryOp::Mod),
            _ => None,
        })
    }

    // one left-associative precedence level
    fn binary_level(
        &mut self,
        operand: fn(&mut Self) -> Result<Expr, ParseError>,
        operator: fn(&Token) -> Option<BinaryOp>,
    ) -> Result<Expr, ParseError> {
        let mut left = operand(self)?;
        while let Some(op) = self.peek().and_then(operator) {
            self.pos += 1;
            let right = operand(self)?;
            left = Expr::binary(op, left, right);
        }

        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&Token::Minus) {
            let operand = self.unary()?;

            // fold negative number literals
            if let Expr::Literal(Value::Number(n)) = &operand {
                return Ok(Expr::Literal(Value::from_f64(-n.get())));
            }

            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            });
        }
        if self.eat(&Token::Plus) {
            return self.unary();
        }
        if self.eat(&Token::Bang) || self.eat_word("NOT") {
            let operand = self.unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }

        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Token::Dot) {
                let name = self.attribute_name()?;
                expr = Expr::attribute(expr, name);
            } else if self.eat(&Token::LBracket) {
                let index = self.expr()?;
                self.expect(&Token::RBracket, "']' after index expression")?;
                expr = Expr::Index {
                    base: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn attribute_name(&mut self) -> Result<String, ParseError> {
        let offset = self.offset();
        match self.next_token() {
            // reserved words are fine as attribute names
            Some(Token::Ident(name) | Token::Str(name)) => Ok(name),
            Some(other) => Err(ParseError::Unexpected {
                found: other.to_string(),
                expected: "attribute name after '.'",
                offset,
            }),
            None => Err(ParseError::UnexpectedEnd {
                expected: "attribute name after '.'",
            }),
        }
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        const EXPECTED: &str = "expression";

        let offset = self.offset();
        let Some(token) = self.next_token() else {
            return Err(ParseError::UnexpectedEnd { expected: EXPECTED });
        };

        match token {
            Token::Number(n) => Ok(Expr::Literal(Value::from_f64(n))),
            Token::Str(s) => Ok(Expr::Literal(Value::Text(s))),
            Token::LParen => {
                let inner = self.expr()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::LBracket => self.array_literal(),
            Token::LBrace => self.object_literal(),
            Token::Ident(word) if word.eq_ignore_ascii_case("TRUE") => {
                Ok(Expr::Literal(Value::Bool(true)))
            }
            Token::Ident(word) if word.eq_ignore_ascii_case("FALSE") => {
                Ok(Expr::Literal(Value::Bool(false)))
            }
            Token::Ident(word) if word.eq_ignore_ascii_case("NULL") => Ok(Expr::Literal(Value::Null)),
            Token::Ident(word) if is_reserved(&word) => Err(ParseError::Unexpected {
                found: format!("'{word}'"),
                expected: EXPECTED,
                offset,
            }),
            Token::Ident(word) => {
                if self.eat(&Token::LParen) {
                    let args = self.list_items(&Token::RParen)?;
                    return Ok(Expr::call(word, args));
                }
                Ok(Expr::Variable(word))
            }
            other => Err(ParseError::Unexpected {
                found: other.to_string(),
                expected: EXPECTED,
                offset,
            }),
        }
    }

    fn array_literal(&mut self) -> Result<Expr, ParseError> {
        let items = self.list_items(&Token::RBracket)?;

        // constant arrays fold into one literal value
        if items.iter().all(|item| matches!(item, Expr::Literal(_))) {
            let values = items
                .into_iter()
                .filter_map(|item| match item {
                    Expr::Literal(value) => Some(value),
                    _ => None,
                })
                .collect();
            return Ok(Expr::Literal(Value::List(values)));
        }

        Ok(Expr::Array(items))
    }

    fn object_literal(&mut self) -> Result<Expr, ParseError> {
        let mut entries = Vec::new();
        if self.eat(&Token::RBrace) {
            return Ok(Expr::Object(entries));
        }

        loop {
            let key = self.attribute_name()?;
            self.expect(&Token::Colon, "':' after object key")?;
            entries.push((key, self.expr()?));

            if self.eat(&Token::RBrace) {
                return Ok(Expr::Object(entries));
            }
            self.expect(&Token::Comma, "',' or '}' in object literal")?;
        }
    }

    // comma-separated expressions up to and including `close`
    fn list_items(&mut self, close: &Token) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }

        loop {
            items.push(self.expr()?);
            if self.eat(close) {
                return Ok(items);
            }
            self.expect(&Token::Comma, "',' or closing bracket")?;
        }
    }

    ///
    /// TOKENS
    ///

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|spanned| &spanned.token)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(0, |spanned| spanned.offset)
    }

    fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|spanned| spanned.token.clone());
        if token.is_some() {
            self.pos += 1;
        }

        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            return true;
        }

        false
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.peek().is_some_and(|token| token.is_word(word)) {
            self.pos += 1;
            return true;
        }

        false
    }

    fn expect(&mut self, token: &Token, expected: &'static str) -> Result<(), ParseError> {
        if self.eat(token) {
            return Ok(());
        }

        Err(self.unexpected(expected, self.offset()))
    }

    fn expect_word(&mut self, word: &str, expected: &'static str) -> Result<(), ParseError> {
        if self.eat_word(word) {
            return Ok(());
        }

        Err(self.unexpected(expected, self.offset()))
    }

    fn expect_end(&self) -> Result<(), ParseError> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(ParseError::Unexpected {
                found: token.to_string(),
                expected: "end of clause",
                offset: self.offset(),
            }),
        }
    }

    fn unexpected(&self, expected: &'static str, offset: usize) -> ParseError {
        match self.peek() {
            Some(token) => ParseError::Unexpected {
                found: token.to_string(),
                expected,
                offset,
            },
            None => ParseError::UnexpectedEnd { expected },
        }
    }
}

fn is_reserved(word: &str) -> bool {
    RESERVED_WORDS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(word))
}
