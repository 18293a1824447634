//! AST types for ACS models.
//!
//! The grammar produces a [`RawModel`]; validation turns it into a
//! [`Policy`](crate::validate::Policy). Matcher bodies are [`Expr`] trees
//! shared by both.

use std::fmt;

// ──────────────────────────────────────────────
// Raw model (parser output)
// ──────────────────────────────────────────────

/// A `name = field, field, ...` line from `[requests]` or `[terms]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDeclaration {
    pub name: String,
    pub fields: Vec<String>,
    pub line: u32,
}

impl RawDeclaration {
    pub fn arity(&self) -> usize {
        self.fields.len()
    }
}

/// A `request_type = <expression>` line from `[matchers]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMatcher {
    pub request_type: String,
    pub expr: Expr,
    pub line: u32,
}

/// The three sections of a model, in declaration order, unvalidated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawModel {
    pub requests: Vec<RawDeclaration>,
    pub terms: Vec<RawDeclaration>,
    pub matchers: Vec<RawMatcher>,
}

// ──────────────────────────────────────────────
// Matcher expressions
// ──────────────────────────────────────────────

/// A literal as written in an expression. Decimals keep their source text
/// so the evaluator can parse them exactly.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Decimal(String),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::In => "in",
            CompareOp::NotIn => "not in",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A matcher expression.
///
/// Names are resolved at evaluation time: request fields, the request type
/// itself, term names, and the constants `true`, `false`, `null`, `_`
/// (placeholder) and `X` (wildcard).
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Name(String),
    /// `base.field`
    Field {
        base: Box<Expr>,
        field: String,
    },
    /// `term(arg, ...)`
    Call {
        callee: String,
        args: Vec<Expr>,
    },
    /// `[a, b]` or `(a, b)`
    List(Vec<Expr>),
    /// `{a, b}`; `{}` is the empty set
    Set(Vec<Expr>),
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    /// Every name referenced anywhere in the expression, callees included.
    pub fn names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Name(n) => out.push(n),
            Expr::Field { base, .. } => base.collect_names(out),
            Expr::Call { callee, args } => {
                out.push(callee);
                args.iter().for_each(|a| a.collect_names(out));
            }
            Expr::List(items) | Expr::Set(items) => {
                items.iter().for_each(|i| i.collect_names(out));
            }
            Expr::Compare { left, right, .. } | Expr::And(left, right) | Expr::Or(left, right) => {
                left.collect_names(out);
                right.collect_names(out);
            }
            Expr::Not(inner) => inner.collect_names(out),
        }
    }
}
