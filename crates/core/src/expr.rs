//! Recursive-descent parser for matcher expressions.
//!
//! Precedence, loosest first: `or`, `and`, `not`, comparison
//! (non-associative), postfix (call, field access), atoms.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::ast::{CompareOp, Expr, Literal};
use crate::error::ParseError;
use crate::lexer::{lex, Spanned, SyntaxError, Token};

/// Parse `src` as one complete expression. Offsets in errors are relative
/// to `base`.
pub fn parse_fragment(src: &str, base: usize, max_depth: usize) -> Result<Expr, SyntaxError> {
    let tokens = lex(src, base)?;
    let mut parser = Parser::new(&tokens, max_depth);
    let expr = parser.parse_expr()?;
    if parser.peek() != &Token::Eof {
        return Err(parser.err(format!("unexpected {} after expression", parser.peek())));
    }
    Ok(expr)
}

/// Parse a standalone expression, rendering errors against `text`.
pub fn parse_expr(text: &str, max_depth: usize) -> Result<Expr, ParseError> {
    parse_fragment(text, 0, max_depth).map_err(|e| ParseError::at(text, e.offset, e.message))
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Spanned], max_depth: usize) -> Self {
        Parser {
            tokens,
            pos: 0,
            depth: 0,
            max_depth,
        }
    }

    fn cur(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.cur().token
    }

    fn peek_next(&self) -> &Token {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)].token
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn err(&self, msg: impl Into<String>) -> SyntaxError {
        SyntaxError::new(self.cur().offset, msg)
    }

    fn is_word(&self, w: &str) -> bool {
        matches!(self.peek(), Token::Word(x) if x == w)
    }

    fn expect(&mut self, token: Token) -> Result<(), SyntaxError> {
        if self.peek() == &token {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("expected {}, got {}", token, self.peek())))
        }
    }

    fn take_name(&mut self) -> Result<String, SyntaxError> {
        match self.peek().clone() {
            Token::Word(w) if !is_keyword(&w) => {
                self.advance();
                Ok(w)
            }
            other => Err(self.err(format!("expected identifier, got {}", other))),
        }
    }

    fn enter(&mut self) -> Result<(), SyntaxError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(self.err(format!(
                "expression nested deeper than {} levels",
                self.max_depth
            )));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // -- Boolean structure ---------------------------------------

    fn parse_expr(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_or()
    }

    // Connectives fold to the left, so every operator in a chain is one
    // more level of nesting in the tree.

    fn parse_or(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_and()?;
        let mut chained = 0;
        while self.peek() == &Token::OrOr || self.is_word("or") {
            self.advance();
            self.enter()?;
            chained += 1;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        self.depth -= chained;
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_not()?;
        let mut chained = 0;
        while self.peek() == &Token::AndAnd || self.is_word("and") {
            self.advance();
            self.enter()?;
            chained += 1;
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        self.depth -= chained;
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, SyntaxError> {
        if self.peek() == &Token::Bang || self.is_word("not") {
            self.advance();
            self.enter()?;
            let inner = self.parse_not()?;
            self.leave();
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, SyntaxError> {
        let left = self.parse_postfix()?;
        let Some(op) = self.parse_compare_op() else {
            return Ok(left);
        };
        let right = self.parse_postfix()?;
        if self.parse_compare_op().is_some() {
            return Err(self.err("comparisons cannot be chained; combine them with 'and'"));
        }
        Ok(Expr::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// Consumes a comparison operator if one is next.
    fn parse_compare_op(&mut self) -> Option<CompareOp> {
        let op = match self.peek() {
            Token::EqEq => CompareOp::Eq,
            Token::Neq => CompareOp::Ne,
            Token::Lt => CompareOp::Lt,
            Token::Lte => CompareOp::Le,
            Token::Gt => CompareOp::Gt,
            Token::Gte => CompareOp::Ge,
            Token::Word(w) if w == "in" => CompareOp::In,
            Token::Word(w) if w == "not" && matches!(self.peek_next(), Token::Word(n) if n == "in") => {
                CompareOp::NotIn
            }
            _ => return None,
        };
        if op == CompareOp::NotIn {
            self.advance();
        }
        self.advance();
        Some(op)
    }

    // -- Operands ------------------------------------------------

    fn parse_postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_atom()?;
        let mut chained = 0;
        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    self.enter()?;
                    chained += 1;
                    let field = self.take_name()?;
                    expr = Expr::Field {
                        base: Box::new(expr),
                        field,
                    };
                }
                Token::LParen => {
                    let Expr::Name(callee) = expr else {
                        return Err(self.err("only terms can be called"));
                    };
                    self.advance();
                    self.enter()?;
                    let args = self.parse_items(Token::RParen)?;
                    self.leave();
                    expr = Expr::Call { callee, args };
                }
                _ => {
                    self.depth -= chained;
                    return Ok(expr);
                }
            }
        }
    }

    fn parse_atom(&mut self) -> Result<Expr, SyntaxError> {
        match self.peek().clone() {
            Token::Int(n) => {
                self.advance();
                Ok(Expr::Literal(Literal::Int(n)))
            }
            Token::Decimal(d) => {
                if Decimal::from_str(&d).is_err() {
                    return Err(self.err(format!("decimal '{}' out of range", d)));
                }
                self.advance();
                Ok(Expr::Literal(Literal::Decimal(d)))
            }
            Token::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::Str(s)))
            }
            Token::Word(_) => Ok(Expr::Name(self.take_name()?)),
            Token::LBracket => {
                self.advance();
                self.enter()?;
                let items = self.parse_items(Token::RBracket)?;
                self.leave();
                Ok(Expr::List(items))
            }
            Token::LBrace => {
                self.advance();
                self.enter()?;
                let items = self.parse_items(Token::RBrace)?;
                self.leave();
                Ok(Expr::Set(items))
            }
            Token::LParen => {
                self.advance();
                self.enter()?;
                let result = self.parse_parenthesized();
                self.leave();
                result
            }
            other => Err(self.err(format!("expected expression, got {}", other))),
        }
    }

    /// After '(': a grouped expression `(e)`, or a tuple `()`, `(e,)`,
    /// `(a, b, ...)`.
    fn parse_parenthesized(&mut self) -> Result<Expr, SyntaxError> {
        if self.peek() == &Token::RParen {
            self.advance();
            return Ok(Expr::List(Vec::new()));
        }
        let first = self.parse_expr()?;
        if self.peek() == &Token::RParen {
            self.advance();
            return Ok(first);
        }
        self.expect(Token::Comma)?;
        let mut items = vec![first];
        items.extend(self.parse_items(Token::RParen)?);
        Ok(Expr::List(items))
    }

    /// Comma-separated expressions up to `close`; a trailing comma is
    /// allowed. Consumes `close`.
    fn parse_items(&mut self, close: Token) -> Result<Vec<Expr>, SyntaxError> {
        let mut items = Vec::new();
        while self.peek() != &close {
            items.push(self.parse_expr()?);
            if self.peek() == &Token::Comma {
                self.advance();
            } else if self.peek() != &close {
                return Err(self.err(format!("expected ',' or {}, got {}", close, self.peek())));
            }
        }
        self.advance();
        Ok(items)
    }
}

fn is_keyword(word: &str) -> bool {
    matches!(word, "and" | "or" | "not" | "in")
}
