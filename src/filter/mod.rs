//! # Filter Expression Engine
//!
//! Parses the raw `filter` query parameter:
//!
//! ```text
//! (name,eq,'bob')(and,((age,gt,21),(age,lt,65)))
//! ```
//!
//! into a list of [`FilterNode`]s. The input must be the raw, undecoded
//! parameter value; quoted strings and symbols are decoded individually
//! once the structure is known.

pub mod ast;
pub mod criteria;
pub mod errors;
pub mod operators;
pub mod parser;
pub mod tokenizer;

pub use ast::{ComparisonOperator, FieldConstraint, FilterNode, LogicalOperator, Predicate};
pub use errors::{FilterError, FilterResult};
pub use operators::{OperatorSet, SupportedOperators};

/// Parse a raw filter string with the operators legal for one type
pub fn parse_filter(raw: &str, operators: &OperatorSet) -> FilterResult<Vec<FilterNode>> {
    parser::parse(raw)?
        .iter()
        .map(|item| {
            let expr = criteria::resolve_criteria(item, operators)?;
            operators.finalize(expr)
        })
        .collect()
}
