//! # In-Memory Filtering and Ordering
//!
//! Evaluates filter trees and sort fields against resources held in
//! memory. A field resolves to `id`, an attribute, or the linkage ids of a
//! relationship; a field that resolves to nothing compares as `null`.

use std::cmp::Ordering;

use serde_json::Value;

use crate::data::{Resource, Unwrapped};
use crate::filter::{ComparisonOperator, FieldConstraint, FilterNode, LogicalOperator};
use crate::request::{SortDirection, SortField};

/// Check if a resource matches a filter node
pub fn matches(node: &FilterNode, resource: &Resource) -> bool {
    match node {
        FilterNode::Predicate(p) => match p.operator {
            LogicalOperator::And => p.value.iter().all(|n| matches(n, resource)),
            LogicalOperator::Or => p.value.iter().any(|n| matches(n, resource)),
        },
        FilterNode::Constraint(c) => matches_constraint(c, resource),
    }
}

/// Check if a resource matches every node
pub fn matches_all(nodes: &[FilterNode], resource: &Resource) -> bool {
    nodes.iter().all(|n| matches(n, resource))
}

fn matches_constraint(constraint: &FieldConstraint, resource: &Resource) -> bool {
    let field_value = field_value(resource, &constraint.field);
    let expected = &constraint.value;

    match constraint.operator {
        ComparisonOperator::Eq => &field_value == expected,
        ComparisonOperator::Neq => &field_value != expected,
        ComparisonOperator::In => expected
            .as_array()
            .map(|arr| arr.contains(&field_value))
            .unwrap_or(false),
        ComparisonOperator::Nin => expected
            .as_array()
            .map(|arr| !arr.contains(&field_value))
            .unwrap_or(false),
        ComparisonOperator::Lt => compare_json_values(&field_value, expected) == Some(Ordering::Less),
        ComparisonOperator::Gt => {
            compare_json_values(&field_value, expected) == Some(Ordering::Greater)
        }
        ComparisonOperator::Lte => matches!(
            compare_json_values(&field_value, expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        ComparisonOperator::Gte => matches!(
            compare_json_values(&field_value, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
    }
}

/// Resolve a field to a comparable value
pub fn field_value(resource: &Resource, field: &str) -> Value {
    if field == "id" {
        return resource
            .id()
            .map(|id| Value::String(id.to_string()))
            .unwrap_or(Value::Null);
    }
    if let Some(value) = resource.attr(field) {
        return value.clone();
    }
    match resource.relationship(field) {
        Some(rel) => match rel.linkage().clone().into_unwrapped() {
            Unwrapped::Singular(Some(target)) => Value::String(target.id),
            Unwrapped::Singular(None) => Value::Null,
            Unwrapped::Plural(targets) => {
                Value::Array(targets.into_iter().map(|t| Value::String(t.id)).collect())
            }
        },
        None => Value::Null,
    }
}

/// Compare two JSON values for ordering; `None` when they don't compare
fn compare_json_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(0.0);
            let b = b.as_f64().unwrap_or(0.0);
            a.partial_cmp(&b)
        }
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Stable multi-key sort
pub fn apply_ordering(records: &mut [Resource], sort: &[SortField]) {
    if sort.is_empty() {
        return;
    }

    records.sort_by(|a, b| {
        for order in sort {
            let a_val = field_value(a, &order.field);
            let b_val = field_value(b, &order.field);

            let cmp = match (&a_val, &b_val) {
                (Value::Null, Value::Null) => Ordering::Equal,
                // Missing values sort last ascending.
                (Value::Null, _) => Ordering::Greater,
                (_, Value::Null) => Ordering::Less,
                _ => compare_json_values(&a_val, &b_val).unwrap_or(Ordering::Equal),
            };

            let cmp = match order.direction {
                SortDirection::Asc => cmp,
                SortDirection::Desc => cmp.reverse(),
            };
            if cmp != Ordering::Equal {
                return cmp;
            }
        }
        Ordering::Equal
    });
}
