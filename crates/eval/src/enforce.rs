//! Matcher evaluator.
//!
//! Evaluates a request type's matcher expression against one request
//! instance and a knowledge-base snapshot. Evaluation never mutates the
//! knowledge base.
//!
//! Names resolve in this order: request fields, the request type itself
//! (for `request_type.field`), declared terms, then the constants `true`,
//! `false`, `null`, `_` (placeholder) and `X` (wildcard).

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::str::FromStr;

use acs_core::{CompareOp, Expr, Literal, Policy};
use rust_decimal::Decimal;

use crate::error::EvalError;
use crate::knowledge::{Answer, KnowledgeBase, QueryResult, Slot, Term};
use crate::value::Value;

/// A request instance: declared field names zipped with caller values.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    request_type: &'a str,
    fields: &'a [String],
    values: &'a [Value],
}

impl<'a> Request<'a> {
    pub fn request_type(&self) -> &'a str {
        self.request_type
    }

    pub fn get(&self, field: &str) -> Option<&'a Value> {
        self.fields
            .iter()
            .position(|f| f == field)
            .map(|i| &self.values[i])
    }
}

/// Decide one request. `Ok(false)` is a deny; `Err` is never a verdict.
pub fn enforce(
    policy: &Policy,
    knowledge: &KnowledgeBase,
    request_type: &str,
    values: &[Value],
) -> Result<bool, EvalError> {
    let fields = policy
        .request_fields(request_type)
        .ok_or_else(|| EvalError::UnknownRequestType {
            name: request_type.to_string(),
        })?;
    if fields.len() != values.len() {
        return Err(EvalError::ArityMismatch {
            name: request_type.to_string(),
            expected: fields.len(),
            actual: values.len(),
        });
    }

    let env = Env {
        request: Request {
            request_type,
            fields,
            values,
        },
        knowledge,
    };
    let matcher = policy
        .matcher(request_type)
        .ok_or_else(|| env.defect("no matcher is defined"))?;

    match env.eval(matcher)? {
        Operand::Value(Value::Bool(verdict)) => Ok(verdict),
        other => Err(env.defect(format!(
            "matcher evaluated to {} instead of a bool",
            other.describe()
        ))),
    }
}

/// Intermediate result of evaluating a sub-expression.
enum Operand<'a> {
    Value(Value),
    /// The request instance, bound under its request type's name.
    Request,
    Term(&'a Term),
    Placeholder,
    Wildcard,
    Query(QueryResult<'a>),
}

impl Operand<'_> {
    fn describe(&self) -> String {
        match self {
            Operand::Value(v) => format!("a {}", v.type_name()),
            Operand::Request => "the request".to_string(),
            Operand::Term(t) => format!("term '{}'", t.name()),
            Operand::Placeholder => "placeholder '_'".to_string(),
            Operand::Wildcard => "wildcard 'X'".to_string(),
            Operand::Query(_) => "a query result".to_string(),
        }
    }
}

struct Env<'a> {
    request: Request<'a>,
    knowledge: &'a KnowledgeBase,
}

impl<'a> Env<'a> {
    fn defect(&self, message: impl Into<String>) -> EvalError {
        EvalError::Enforcement {
            request_type: self.request.request_type.to_string(),
            message: message.into(),
        }
    }

    fn eval(&self, expr: &Expr) -> Result<Operand<'a>, EvalError> {
        match expr {
            Expr::Literal(lit) => self.literal(lit).map(Operand::Value),

            Expr::Name(name) => self.lookup(name),

            Expr::Field { base, field } => match self.eval(base)? {
                Operand::Request => self
                    .request
                    .get(field)
                    .cloned()
                    .map(Operand::Value)
                    .ok_or_else(|| {
                        self.defect(format!(
                            "request type '{}' has no field '{}'",
                            self.request.request_type, field
                        ))
                    }),
                other => Err(self.defect(format!(
                    "cannot access field '{}' of {}",
                    field,
                    other.describe()
                ))),
            },

            Expr::Call { callee, args } => self.call(callee, args),

            Expr::List(items) => Ok(Operand::Value(Value::List(self.values(items)?))),

            Expr::Set(items) => Ok(Operand::Value(Value::Set(
                self.values(items)?.into_iter().collect(),
            ))),

            Expr::Compare { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                let holds = match op {
                    CompareOp::Eq => self.equal(left, right)?,
                    CompareOp::Ne => !self.equal(left, right)?,
                    CompareOp::In => self.contains(right, left)?,
                    CompareOp::NotIn => !self.contains(right, left)?,
                    CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge => {
                        self.order(*op, left, right)?
                    }
                };
                Ok(Operand::Value(Value::Bool(holds)))
            }

            Expr::And(left, right) => {
                if !self.truth(left, "and")? {
                    // Short-circuit: left is false, skip right
                    return Ok(Operand::Value(Value::Bool(false)));
                }
                Ok(Operand::Value(Value::Bool(self.truth(right, "and")?)))
            }

            Expr::Or(left, right) => {
                if self.truth(left, "or")? {
                    // Short-circuit: left is true, skip right
                    return Ok(Operand::Value(Value::Bool(true)));
                }
                Ok(Operand::Value(Value::Bool(self.truth(right, "or")?)))
            }

            Expr::Not(inner) => Ok(Operand::Value(Value::Bool(!self.truth(inner, "not")?))),
        }
    }

    fn literal(&self, lit: &Literal) -> Result<Value, EvalError> {
        match lit {
            Literal::Int(i) => Ok(Value::Int(*i)),
            Literal::Str(s) => Ok(Value::Str(s.clone())),
            Literal::Decimal(text) => Decimal::from_str(text)
                .map(Value::Decimal)
                .map_err(|_| self.defect(format!("invalid decimal literal '{}'", text))),
        }
    }

    fn lookup(&self, name: &str) -> Result<Operand<'a>, EvalError> {
        if let Some(v) = self.request.get(name) {
            return Ok(Operand::Value(v.clone()));
        }
        if name == self.request.request_type {
            return Ok(Operand::Request);
        }
        if let Ok(term) = self.knowledge.term(name) {
            return Ok(Operand::Term(term));
        }
        match name {
            "true" => Ok(Operand::Value(Value::Bool(true))),
            "false" => Ok(Operand::Value(Value::Bool(false))),
            "null" => Ok(Operand::Value(Value::Null)),
            "_" => Ok(Operand::Placeholder),
            "X" => Ok(Operand::Wildcard),
            _ => Err(self.defect(format!("undefined name '{}'", name))),
        }
    }

    /// A term call: membership when every argument is concrete or `X`,
    /// otherwise a query.
    fn call(&self, callee: &str, args: &[Expr]) -> Result<Operand<'a>, EvalError> {
        let term = match self.lookup(callee)? {
            Operand::Term(term) => term,
            other => {
                return Err(self.defect(format!("{} is not callable", other.describe())));
            }
        };
        if args.len() != term.arity() {
            return Err(self.defect(format!(
                "term '{}' takes {} argument(s), got {}",
                term.name(),
                term.arity(),
                args.len()
            )));
        }

        let mut pattern = Vec::with_capacity(args.len());
        for arg in args {
            pattern.push(match self.eval(arg)? {
                Operand::Placeholder => Slot::Placeholder,
                Operand::Wildcard => Slot::Wildcard,
                other => Slot::Value(self.value(other)?),
            });
        }
        match term.ask(&pattern)? {
            Answer::Holds(found) => Ok(Operand::Value(Value::Bool(found))),
            Answer::Matches(result) => Ok(Operand::Query(result)),
        }
    }

    /// Collapse an operand to a plain value. Query results become sets.
    fn value(&self, operand: Operand<'a>) -> Result<Value, EvalError> {
        match operand {
            Operand::Value(v) => Ok(v),
            Operand::Query(result) => Ok(Value::Set(result.into_set())),
            other => Err(self.defect(format!(
                "{} cannot be used as a value",
                other.describe()
            ))),
        }
    }

    fn values(&self, items: &[Expr]) -> Result<Vec<Value>, EvalError> {
        items
            .iter()
            .map(|item| self.eval(item).and_then(|op| self.value(op)))
            .collect()
    }

    fn truth(&self, expr: &Expr, connective: &str) -> Result<bool, EvalError> {
        match self.eval(expr)? {
            Operand::Value(Value::Bool(b)) => Ok(b),
            other => Err(self.defect(format!(
                "operand of '{}' must be a bool, got {}",
                connective,
                other.describe()
            ))),
        }
    }

    /// Structural equality, except that a set and a list compare as sets.
    fn equal(&self, left: Operand<'a>, right: Operand<'a>) -> Result<bool, EvalError> {
        let left = self.value(left)?;
        let right = self.value(right)?;
        Ok(match (&left, &right) {
            (Value::Set(set), Value::List(list)) | (Value::List(list), Value::Set(set)) => {
                *set == list.iter().cloned().collect::<BTreeSet<_>>()
            }
            _ => left == right,
        })
    }

    /// `item in container`.
    fn contains(&self, container: Operand<'a>, item: Operand<'a>) -> Result<bool, EvalError> {
        let item = self.value(item)?;
        if let Operand::Query(mut result) = container {
            return Ok(result.any(|v| v == item));
        }
        let container = self.value(container)?;
        match (&container, &item) {
            (Value::List(items), _) => Ok(items.contains(&item)),
            (Value::Set(items), _) => Ok(items.contains(&item)),
            (Value::Str(haystack), Value::Str(needle)) => Ok(haystack.contains(needle.as_str())),
            _ => Err(self.defect(format!(
                "cannot test whether a {} is in a {}",
                item.type_name(),
                container.type_name()
            ))),
        }
    }

    /// `<`, `<=`, `>`, `>=`: numeric, lexicographic for strings and lists,
    /// subset/superset when either side is a set or query result.
    fn order(&self, op: CompareOp, left: Operand<'a>, right: Operand<'a>) -> Result<bool, EvalError> {
        let left = self.value(left)?;
        let right = self.value(right)?;

        if let (Some(l), Some(r)) = (left.as_decimal(), right.as_decimal()) {
            return Ok(ordering_holds(op, l.cmp(&r)));
        }
        match (&left, &right) {
            (Value::Str(l), Value::Str(r)) => Ok(ordering_holds(op, l.cmp(r))),
            (Value::List(l), Value::List(r)) => Ok(ordering_holds(op, l.cmp(r))),
            (Value::Set(l), Value::Set(r)) => Ok(set_relation_holds(op, l, r)),
            (Value::Set(l), Value::List(r)) => {
                Ok(set_relation_holds(op, l, &r.iter().cloned().collect()))
            }
            (Value::List(l), Value::Set(r)) => {
                Ok(set_relation_holds(op, &l.iter().cloned().collect(), r))
            }
            _ => Err(self.defect(format!(
                "cannot compare a {} with a {} using '{}'",
                left.type_name(),
                right.type_name(),
                op
            ))),
        }
    }
}

fn ordering_holds(op: CompareOp, ord: Ordering) -> bool {
    match op {
        CompareOp::Lt => ord == Ordering::Less,
        CompareOp::Le => ord != Ordering::Greater,
        CompareOp::Gt => ord == Ordering::Greater,
        CompareOp::Ge => ord != Ordering::Less,
        _ => false,
    }
}

fn set_relation_holds(op: CompareOp, l: &BTreeSet<Value>, r: &BTreeSet<Value>) -> bool {
    match op {
        CompareOp::Le => l.is_subset(r),
        CompareOp::Lt => l.len() < r.len() && l.is_subset(r),
        CompareOp::Ge => l.is_superset(r),
        CompareOp::Gt => l.len() > r.len() && l.is_superset(r),
        _ => false,
    }
}
