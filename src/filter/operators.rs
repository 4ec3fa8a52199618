//! # Filter Operators
//!
//! Each operator carries how many arguments it takes and how its
//! arguments turn into a [`FilterNode`]. An adapter advertises
//! the operators it can execute; `eq` is legal everywhere regardless.

use std::collections::BTreeMap;

use serde_json::Value;

use super::ast::{ComparisonOperator, FieldConstraint, FilterNode, LogicalOperator, Predicate};
use super::criteria::{Arg, FieldExpression};
use super::errors::{FilterError, FilterResult};

/// Operators an adapter can execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedOperators {
    pub logical: Vec<LogicalOperator>,
    pub comparison: Vec<ComparisonOperator>,
}

impl Default for SupportedOperators {
    fn default() -> Self {
        Self {
            logical: LogicalOperator::ALL.to_vec(),
            comparison: ComparisonOperator::ALL.to_vec(),
        }
    }
}

/// Number of arguments an operator accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    fn accepts(&self, n: usize) -> bool {
        match self {
            Arity::Exactly(k) => n == *k,
            Arity::AtLeast(k) => n >= *k,
        }
    }

    fn describe(&self) -> String {
        match self {
            Arity::Exactly(k) => k.to_string(),
            Arity::AtLeast(k) => format!("at least {}", k),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperatorKind {
    Logical(LogicalOperator),
    Comparison(ComparisonOperator),
}

type FinalizeArgs = fn(&OperatorSet, OperatorKind, Vec<Arg>) -> FilterResult<FilterNode>;

/// How one operator is validated and finalized
#[derive(Clone)]
pub struct OperatorDescriptor {
    pub name: &'static str,
    pub arity: Arity,
    kind: OperatorKind,
    finalize_args: FinalizeArgs,
}

impl std::fmt::Debug for OperatorDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorDescriptor")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

impl OperatorDescriptor {
    fn logical(op: LogicalOperator) -> Self {
        Self {
            name: op.as_str(),
            arity: Arity::AtLeast(1),
            kind: OperatorKind::Logical(op),
            finalize_args: finalize_logical,
        }
    }

    fn comparison(op: ComparisonOperator) -> Self {
        Self {
            name: op.as_str(),
            arity: Arity::Exactly(2),
            kind: OperatorKind::Comparison(op),
            finalize_args: finalize_comparison,
        }
    }

    /// Whether this operator combines sub-expressions
    pub fn is_unary(&self) -> bool {
        matches!(self.kind, OperatorKind::Logical(_))
    }
}

/// Operators legal for one resource type, keyed by name
#[derive(Debug, Clone)]
pub struct OperatorSet {
    descriptors: BTreeMap<&'static str, OperatorDescriptor>,
}

impl Default for OperatorSet {
    fn default() -> Self {
        Self::from_supported(&SupportedOperators::default())
    }
}

impl OperatorSet {
    pub fn from_supported(supported: &SupportedOperators) -> Self {
        let mut descriptors = BTreeMap::new();

        for op in &supported.logical {
            descriptors.insert(op.as_str(), OperatorDescriptor::logical(*op));
        }
        for op in supported
            .comparison
            .iter()
            .chain(std::iter::once(&ComparisonOperator::Eq))
        {
            descriptors.insert(op.as_str(), OperatorDescriptor::comparison(*op));
        }

        Self { descriptors }
    }

    pub fn get(&self, name: &str) -> Option<&OperatorDescriptor> {
        self.descriptors.get(name)
    }

    pub fn is_unary(&self, name: &str) -> bool {
        self.get(name).map(|d| d.is_unary()).unwrap_or(false)
    }

    pub fn is_binary(&self, name: &str) -> bool {
        self.get(name).map(|d| !d.is_unary()).unwrap_or(false)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.descriptors.keys().copied()
    }

    /// Validate an expression and turn it into a filter node
    pub fn finalize(&self, expr: FieldExpression) -> FilterResult<FilterNode> {
        let descriptor = self
            .get(&expr.operator)
            .ok_or_else(|| FilterError::InvalidOperator(expr.operator.clone()))?;

        if !descriptor.arity.accepts(expr.args.len()) {
            return Err(FilterError::InvalidArity {
                operator: expr.operator,
                expected: descriptor.arity.describe(),
                found: expr.args.len(),
            });
        }

        (descriptor.finalize_args)(self, descriptor.kind, expr.args)
    }
}

fn finalize_logical(set: &OperatorSet, kind: OperatorKind, args: Vec<Arg>) -> FilterResult<FilterNode> {
    let OperatorKind::Logical(operator) = kind else {
        return Err(FilterError::InvalidOperator(format!("{:?}", kind)));
    };

    let value = args
        .into_iter()
        .map(|arg| match arg {
            Arg::Expression(expr) => set.finalize(expr),
            _ => Err(FilterError::ExpectedExpression(operator.to_string())),
        })
        .collect::<FilterResult<Vec<_>>>()?;

    Ok(FilterNode::Predicate(Predicate { operator, value }))
}

fn finalize_comparison(
    _set: &OperatorSet,
    kind: OperatorKind,
    args: Vec<Arg>,
) -> FilterResult<FilterNode> {
    let OperatorKind::Comparison(operator) = kind else {
        return Err(FilterError::InvalidOperator(format!("{:?}", kind)));
    };
    let name = operator.to_string();

    let mut args = args.into_iter();
    let field = match args.next() {
        Some(Arg::Field(field)) => field,
        _ => return Err(FilterError::MissingFieldReference(name)),
    };
    let raw_value = args
        .next()
        .ok_or_else(|| FilterError::MissingFieldReference(name.clone()))?;

    if raw_value.references_field() {
        return Err(FilterError::NestedFieldReference(name));
    }

    let value = match (operator.takes_list(), raw_value) {
        (true, Arg::List(items)) => Value::Array(
            items
                .into_iter()
                .map(|item| match item {
                    Arg::Value(v) => Ok(v),
                    _ => Err(FilterError::ExpectedScalarValue(name.clone())),
                })
                .collect::<FilterResult<Vec<_>>>()?,
        ),
        (true, _) => return Err(FilterError::ExpectedListValue(name)),
        (false, Arg::Value(v)) => v,
        (false, _) => return Err(FilterError::ExpectedScalarValue(name)),
    };

    Ok(FieldConstraint::new(field, operator, value).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn expr(operator: &str, args: Vec<Arg>) -> FieldExpression {
        FieldExpression {
            operator: operator.to_string(),
            args,
        }
    }

    fn field(name: &str) -> Arg {
        Arg::Field(name.to_string())
    }

    #[test]
    fn test_eq_always_present() {
        let set = OperatorSet::from_supported(&SupportedOperators {
            logical: vec![],
            comparison: vec![ComparisonOperator::Gt],
        });

        assert!(set.is_binary("eq"));
        assert!(set.is_binary("gt"));
        assert!(!set.is_binary("lt"));
        assert!(!set.is_unary("and"));
    }

    #[test]
    fn test_finalize_comparison() {
        let set = OperatorSet::default();
        let node = set
            .finalize(expr("gt", vec![field("age"), Arg::Value(json!(21))]))
            .unwrap();

        assert_eq!(
            node,
            FieldConstraint::new("age", ComparisonOperator::Gt, json!(21)).into()
        );
    }

    #[test]
    fn test_in_requires_list() {
        let set = OperatorSet::default();

        let err = set
            .finalize(expr("in", vec![field("tag"), Arg::Value(json!("a"))]))
            .unwrap_err();
        assert_eq!(err, FilterError::ExpectedListValue("in".to_string()));

        let node = set
            .finalize(expr(
                "in",
                vec![
                    field("tag"),
                    Arg::List(vec![Arg::Value(json!("a")), Arg::Value(json!("b"))]),
                ],
            ))
            .unwrap();
        assert_eq!(
            node,
            FieldConstraint::new("tag", ComparisonOperator::In, json!(["a", "b"])).into()
        );
    }

    #[test]
    fn test_logical_needs_expressions() {
        let set = OperatorSet::default();

        let err = set
            .finalize(expr("and", vec![Arg::Value(json!("age"))]))
            .unwrap_err();
        assert_eq!(err, FilterError::ExpectedExpression("and".to_string()));

        let err = set.finalize(expr("or", vec![])).unwrap_err();
        assert!(matches!(err, FilterError::InvalidArity { found: 0, .. }));
    }

    #[test]
    fn test_value_cannot_reference_field() {
        let set = OperatorSet::default();
        let err = set
            .finalize(expr("eq", vec![field("a"), field("b")]))
            .unwrap_err();
        assert_eq!(err, FilterError::NestedFieldReference("eq".to_string()));
    }
}
