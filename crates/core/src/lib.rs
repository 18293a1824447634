#![allow(clippy::result_large_err)]
//! acs-core: the ACS model language.
//!
//! Turns model text into a validated [`Policy`]:
//!
//! 1. [`preprocess()`] splices continuations and strips comments
//! 2. [`grammar::parse_model`] runs the three-section grammar, built from
//!    the [`combinator`] library, with matcher bodies handled by [`expr`]
//! 3. [`validate()`] checks declarations and matcher coverage
//!
//! [`load_policy()`] runs all three under a set of [`Limits`].

pub mod ast;
pub mod combinator;
pub mod error;
pub mod expr;
pub mod grammar;
pub mod lexer;
pub mod limits;
pub mod load;
pub mod preprocess;
pub mod validate;

// ── Convenience re-exports: key types ────────────────────────────────

pub use ast::{CompareOp, Expr, Literal, RawDeclaration, RawMatcher, RawModel};
pub use error::{LoadError, ParseError, ValidationError};
pub use limits::Limits;
pub use validate::{Policy, TermTemplate, RESERVED_NAMES};

// ── Convenience re-exports: pipeline entry points ────────────────────

pub use expr::parse_expr;
pub use grammar::parse_model;
pub use load::load_policy;
pub use preprocess::preprocess;
pub use validate::validate;
