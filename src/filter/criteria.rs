//! # Criteria Resolution
//!
//! Turns parsed lists into operator expressions:
//!
//! - `(and,(e1,e2,...))` → logical expression over each resolved operand
//! - `(field,value)` → implicit `eq`
//! - `(field,op,value)` → binary expression
//!
//! Operator legality at the binary position is checked here; argument
//! shape is checked later by [`OperatorSet::finalize`](super::operators::OperatorSet::finalize).

use serde_json::Value;

use super::errors::{FilterError, FilterResult};
use super::operators::OperatorSet;
use super::parser::{Atom, Sexp};

/// An argument to an operator
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Expression(FieldExpression),
    Field(String),
    Value(Value),
    List(Vec<Arg>),
}

impl Arg {
    /// Whether this argument is, or contains, a field reference
    pub fn references_field(&self) -> bool {
        match self {
            Arg::Expression(_) | Arg::Field(_) => true,
            Arg::Value(_) => false,
            Arg::List(items) => items.iter().any(Arg::references_field),
        }
    }
}

/// An operator applied to its (unvalidated) arguments
#[derive(Debug, Clone, PartialEq)]
pub struct FieldExpression {
    pub operator: String,
    pub args: Vec<Arg>,
}

/// Resolve one criteria list
pub fn resolve_criteria(sexp: &Sexp, operators: &OperatorSet) -> FilterResult<FieldExpression> {
    let items = sexp
        .as_list()
        .ok_or_else(|| FilterError::ExpectedList(sexp.to_string()))?;

    match items {
        [head, Sexp::List(operands)] if head.as_symbol().is_some_and(|s| operators.is_unary(s)) => {
            let args = operands
                .iter()
                .map(|operand| resolve_operand(operand, operators))
                .collect::<FilterResult<Vec<_>>>()?;
            Ok(FieldExpression {
                operator: head.as_symbol().unwrap_or_default().to_string(),
                args,
            })
        }
        [field, value] => Ok(FieldExpression {
            operator: "eq".to_string(),
            args: vec![resolve_field(field)?, resolve_value(value)?],
        }),
        [field, operator, value] => {
            let name = match operator.as_symbol() {
                Some(name) if operators.is_binary(name) => name,
                _ => return Err(FilterError::InvalidOperator(operator.to_string())),
            };
            Ok(FieldExpression {
                operator: name.to_string(),
                args: vec![resolve_field(field)?, resolve_value(value)?],
            })
        }
        other => Err(FilterError::InvalidListLength(other.len())),
    }
}

fn resolve_operand(sexp: &Sexp, operators: &OperatorSet) -> FilterResult<Arg> {
    match sexp {
        Sexp::List(_) => resolve_criteria(sexp, operators).map(Arg::Expression),
        Sexp::Atom(_) => resolve_value(sexp),
    }
}

fn resolve_field(sexp: &Sexp) -> FilterResult<Arg> {
    let name = sexp
        .as_symbol()
        .ok_or_else(|| FilterError::ExpectedField(sexp.to_string()))?;
    Ok(Arg::Field(decode(name)?))
}

fn resolve_value(sexp: &Sexp) -> FilterResult<Arg> {
    match sexp {
        Sexp::List(items) => items
            .iter()
            .map(resolve_value)
            .collect::<FilterResult<Vec<_>>>()
            .map(Arg::List),
        Sexp::Atom(Atom::Symbol(s)) | Sexp::Atom(Atom::String(s)) => {
            Ok(Arg::Value(Value::String(decode(s)?)))
        }
        Sexp::Atom(Atom::Number(n)) => Ok(Arg::Value(Value::Number(n.clone()))),
        Sexp::Atom(Atom::Bool(b)) => Ok(Arg::Value(Value::Bool(*b))),
        Sexp::Atom(Atom::Null) => Ok(Arg::Value(Value::Null)),
    }
}

fn decode(raw: &str) -> FilterResult<String> {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .map_err(|_| FilterError::InvalidAtom(raw.to_string()))
}
