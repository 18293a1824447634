//! Decoding of serialized value lists such as `['T1', {'A', 'B'}]`.
//!
//! The text is parsed with the matcher-expression parser and the resulting
//! tree is folded into values, so both share one lexical syntax.

use std::collections::BTreeSet;
use std::str::FromStr;

use acs_core::{parse_expr, Expr, Literal, ParseError};
use rust_decimal::Decimal;

use crate::knowledge::Slot;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed value list: {0}")]
    Syntax(#[from] ParseError),

    #[error("{what} is not a value")]
    NotAValue { what: String },

    #[error("unknown name '{name}' in value list")]
    UnknownName { name: String },

    #[error("expected a list or tuple of values, got {found}")]
    NotAList { found: &'static str },

    #[error("invalid decimal '{text}'")]
    InvalidDecimal { text: String },

    #[error("invalid JSON value: {message}")]
    Json { message: String },
}

/// Decode request content or a fact: a top-level list or tuple of values.
pub fn decode_value_list(text: &str, max_depth: usize) -> Result<Vec<Value>, DecodeError> {
    top_level_items(text, max_depth)?
        .iter()
        .map(to_value)
        .collect()
}

/// Decode a query pattern. Like [`decode_value_list`], but a top-level `_`
/// is a placeholder and a top-level `X` a wildcard.
pub fn decode_pattern(text: &str, max_depth: usize) -> Result<Vec<Slot>, DecodeError> {
    top_level_items(text, max_depth)?
        .iter()
        .map(|item| match item {
            Expr::Name(n) if n == "_" => Ok(Slot::Placeholder),
            Expr::Name(n) if n == "X" => Ok(Slot::Wildcard),
            other => to_value(other).map(Slot::Value),
        })
        .collect()
}

fn top_level_items(text: &str, max_depth: usize) -> Result<Vec<Expr>, DecodeError> {
    match parse_expr(text, max_depth)? {
        Expr::List(items) => Ok(items),
        Expr::Call { callee, .. } if callee == "set" => Err(DecodeError::NotAList { found: "set" }),
        Expr::Set(_) => Err(DecodeError::NotAList { found: "set" }),
        Expr::Literal(_) | Expr::Name(_) => Err(DecodeError::NotAList { found: "scalar" }),
        _ => Err(DecodeError::NotAList {
            found: "expression",
        }),
    }
}

fn to_value(expr: &Expr) -> Result<Value, DecodeError> {
    match expr {
        Expr::Literal(Literal::Int(i)) => Ok(Value::Int(*i)),
        Expr::Literal(Literal::Str(s)) => Ok(Value::Str(s.clone())),
        Expr::Literal(Literal::Decimal(text)) => Decimal::from_str(text)
            .map(Value::Decimal)
            .map_err(|_| DecodeError::InvalidDecimal { text: text.clone() }),
        Expr::Name(name) => match name.as_str() {
            "true" | "True" => Ok(Value::Bool(true)),
            "false" | "False" => Ok(Value::Bool(false)),
            "null" | "None" => Ok(Value::Null),
            _ => Err(DecodeError::UnknownName { name: name.clone() }),
        },
        Expr::List(items) => Ok(Value::List(
            items.iter().map(to_value).collect::<Result<_, _>>()?,
        )),
        Expr::Set(items) => Ok(Value::Set(
            items.iter().map(to_value).collect::<Result<_, _>>()?,
        )),
        // set() and set([...]) / set({...}) / set((...))
        Expr::Call { callee, args } if callee == "set" => match args.as_slice() {
            [] => Ok(Value::Set(BTreeSet::new())),
            [Expr::List(items)] | [Expr::Set(items)] => Ok(Value::Set(
                items.iter().map(to_value).collect::<Result<_, _>>()?,
            )),
            _ => Err(DecodeError::NotAValue {
                what: "set(...) with a non-collection argument".to_string(),
            }),
        },
        Expr::Call { callee, .. } => Err(DecodeError::NotAValue {
            what: format!("call to '{}'", callee),
        }),
        Expr::Field { field, .. } => Err(DecodeError::NotAValue {
            what: format!("field access '.{}'", field),
        }),
        Expr::Compare { op, .. } => Err(DecodeError::NotAValue {
            what: format!("comparison '{}'", op),
        }),
        Expr::And(..) | Expr::Or(..) | Expr::Not(_) => Err(DecodeError::NotAValue {
            what: "boolean expression".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(text: &str) -> Result<Vec<Value>, DecodeError> {
        decode_value_list(text, 32)
    }

    #[test]
    fn decodes_request_content() {
        let values = decode("['T1', {'A', \"B\"}]").unwrap();
        assert_eq!(
            values,
            vec![
                Value::str("T1"),
                Value::set([Value::str("A"), Value::str("B")]),
            ]
        );
    }

    #[test]
    fn accepts_marshalled_sets_and_trailing_commas() {
        let values = decode("['data_fusion',set(['usr_party1','usr_party2',]),]").unwrap();
        assert_eq!(
            values[1],
            Value::set([Value::str("usr_party1"), Value::str("usr_party2")])
        );
        assert_eq!(decode("[set()]").unwrap(), vec![Value::Set(BTreeSet::new())]);
    }

    #[test]
    fn tuples_and_constants() {
        let values = decode("(1, -2.50, True, None, false, null, [])").unwrap();
        assert_eq!(
            values,
            vec![
                Value::Int(1),
                Value::Decimal(Decimal::new(-250, 2)),
                Value::Bool(true),
                Value::Null,
                Value::Bool(false),
                Value::Null,
                Value::List(vec![]),
            ]
        );
        assert_eq!(decode("('only',)").unwrap(), vec![Value::str("only")]);
    }

    #[test]
    fn top_level_must_be_a_list() {
        assert_eq!(
            decode("'T1'").unwrap_err(),
            DecodeError::NotAList { found: "scalar" }
        );
        assert_eq!(
            decode("{'a'}").unwrap_err(),
            DecodeError::NotAList { found: "set" }
        );
    }

    #[test]
    fn rejects_names_and_expressions() {
        assert_eq!(
            decode("[usr]").unwrap_err(),
            DecodeError::UnknownName { name: "usr".into() }
        );
        assert!(matches!(
            decode("[1 == 1]").unwrap_err(),
            DecodeError::NotAValue { .. }
        ));
        assert!(matches!(decode("[").unwrap_err(), DecodeError::Syntax(_)));
    }

    #[test]
    fn nesting_is_bounded() {
        let deep = format!("{}1{}", "[".repeat(40), "]".repeat(40));
        assert!(matches!(decode(&deep).unwrap_err(), DecodeError::Syntax(_)));
    }

    #[test]
    fn pattern_slots() {
        let slots = decode_pattern("['T1', _, X]", 32).unwrap();
        assert_eq!(
            slots,
            vec![Slot::Value(Value::str("T1")), Slot::Placeholder, Slot::Wildcard]
        );
        // Only the top level carries slot markers.
        assert!(decode_pattern("[[_]]", 32).is_err());
    }
}
