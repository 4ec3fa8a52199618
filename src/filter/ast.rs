//! # Filter AST
//!
//! The finalized predicate tree handed to adapters. `and`/`or` nodes never
//! carry a field; constraint nodes always do.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Operators combining sub-expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    pub const ALL: [LogicalOperator; 2] = [LogicalOperator::And, LogicalOperator::Or];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOperator::And => "and",
            LogicalOperator::Or => "or",
        }
    }
}

impl FromStr for LogicalOperator {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "and" => Ok(LogicalOperator::And),
            "or" => Ok(LogicalOperator::Or),
            _ => Err(()),
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operators comparing a field against a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOperator {
    Eq,
    Neq,
    In,
    Nin,
    Lt,
    Gt,
    Lte,
    Gte,
}

impl ComparisonOperator {
    pub const ALL: [ComparisonOperator; 8] = [
        ComparisonOperator::Eq,
        ComparisonOperator::Neq,
        ComparisonOperator::In,
        ComparisonOperator::Nin,
        ComparisonOperator::Lt,
        ComparisonOperator::Gt,
        ComparisonOperator::Lte,
        ComparisonOperator::Gte,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOperator::Eq => "eq",
            ComparisonOperator::Neq => "neq",
            ComparisonOperator::In => "in",
            ComparisonOperator::Nin => "nin",
            ComparisonOperator::Lt => "lt",
            ComparisonOperator::Gt => "gt",
            ComparisonOperator::Lte => "lte",
            ComparisonOperator::Gte => "gte",
        }
    }

    /// Whether the value is a list of candidates
    pub fn takes_list(&self) -> bool {
        matches!(self, ComparisonOperator::In | ComparisonOperator::Nin)
    }
}

impl FromStr for ComparisonOperator {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComparisonOperator::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or(())
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `and`/`or` over sub-expressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub operator: LogicalOperator,
    pub value: Vec<FilterNode>,
}

/// One operator applied to one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConstraint {
    pub field: String,
    pub operator: ComparisonOperator,
    /// A scalar, or a list of scalars for `in`/`nin`
    pub value: Value,
}

impl FieldConstraint {
    pub fn new(field: impl Into<String>, operator: ComparisonOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }
}

/// A node of the finalized filter tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterNode {
    Constraint(FieldConstraint),
    Predicate(Predicate),
}

impl FilterNode {
    pub fn and(value: Vec<FilterNode>) -> Self {
        FilterNode::Predicate(Predicate {
            operator: LogicalOperator::And,
            value,
        })
    }

    pub fn or(value: Vec<FilterNode>) -> Self {
        FilterNode::Predicate(Predicate {
            operator: LogicalOperator::Or,
            value,
        })
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            FilterNode::Constraint(c) => Some(&c.field),
            FilterNode::Predicate(_) => None,
        }
    }
}

impl From<FieldConstraint> for FilterNode {
    fn from(c: FieldConstraint) -> Self {
        FilterNode::Constraint(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let node = FilterNode::and(vec![
            FieldConstraint::new("age", ComparisonOperator::Gt, json!(21)).into(),
            FieldConstraint::new("age", ComparisonOperator::Lt, json!(65)).into(),
        ]);

        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({
                "operator": "and",
                "value": [
                    {"field": "age", "operator": "gt", "value": 21},
                    {"field": "age", "operator": "lt", "value": 65}
                ]
            })
        );
    }

    #[test]
    fn test_operator_names() {
        assert_eq!("nin".parse::<ComparisonOperator>(), Ok(ComparisonOperator::Nin));
        assert!("like".parse::<ComparisonOperator>().is_err());
        assert_eq!("or".parse::<LogicalOperator>(), Ok(LogicalOperator::Or));
    }

    #[test]
    fn test_predicates_have_no_field() {
        assert_eq!(FilterNode::or(vec![]).field(), None);
    }
}
