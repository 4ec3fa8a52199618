//! Query Language Tests
//!
//! Filter grammar, query-parameter parsing and cardinality rules as seen
//! through the public API.

use aeroapi::data::Unwrapped;
use aeroapi::filter::{
    parse_filter, ComparisonOperator, FieldConstraint, FilterError, FilterNode, LogicalOperator,
    OperatorSet, SupportedOperators,
};
use aeroapi::request::params::ParamOptions;
use aeroapi::request::{ParsedParams, RawParams, SortField};
use aeroapi::Data;
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_query(query: &str) -> aeroapi::ApiResult<ParsedParams> {
    let operators = OperatorSet::default();
    ParsedParams::parse(
        &RawParams::from_query_string(query),
        Some(query),
        ParamOptions {
            operators: &operators,
            max_page_size: Some(1000),
        },
    )
}

// =============================================================================
// Filter Grammar
// =============================================================================

#[test]
fn test_field_constraint() {
    let nodes = parse_filter("(name,eq,'bob')", &OperatorSet::default()).unwrap();
    assert_eq!(nodes.len(), 1);
    match &nodes[0] {
        FilterNode::Constraint(c) => {
            assert_eq!(c.field, "name");
            assert_eq!(c.operator, ComparisonOperator::Eq);
            assert_eq!(c.value, json!("bob"));
        }
        other => panic!("expected a constraint, got {:?}", other),
    }
}

#[test]
fn test_and_predicate_children() {
    let nodes = parse_filter("(and,((age,gt,21),(age,lt,65)))", &OperatorSet::default()).unwrap();
    match &nodes[0] {
        FilterNode::Predicate(p) => {
            assert_eq!(p.operator, LogicalOperator::And);
            assert_eq!(p.value.len(), 2);
            assert!(p.value.iter().all(|child| child.field() == Some("age")));
        }
        other => panic!("expected a predicate, got {:?}", other),
    }
}

#[test]
fn test_four_elements_is_syntax_error() {
    let err = parse_filter("(eq,name,'bob','extra')", &OperatorSet::default()).unwrap_err();
    assert!(err.is_syntax_error());
}

#[test]
fn test_and_over_atoms_is_validation_error() {
    let err = parse_filter("(and,(age,gt,21))", &OperatorSet::default()).unwrap_err();
    assert!(!err.is_syntax_error());
}

#[test]
fn test_implicit_eq() {
    let nodes = parse_filter("(status,'active')", &OperatorSet::default()).unwrap();
    assert_eq!(
        nodes,
        vec![FieldConstraint::new("status", ComparisonOperator::Eq, json!("active")).into()]
    );
}

#[test]
fn test_in_needs_list() {
    let operators = OperatorSet::default();
    assert!(parse_filter("(id,in,('1','2'))", &operators).is_ok());
    assert!(parse_filter("(id,in,'1')", &operators).is_err());
    assert!(parse_filter("(id,eq,('1','2'))", &operators).is_err());
}

#[test]
fn test_operators_follow_adapter() {
    let operators = OperatorSet::from_supported(&SupportedOperators {
        logical: vec![LogicalOperator::And],
        comparison: vec![ComparisonOperator::Gt],
    });

    assert!(parse_filter("(and,((age,gt,1),(age,2)))", &operators).is_ok());
    assert_eq!(
        parse_filter("(age,lt,3)", &operators).unwrap_err(),
        FilterError::InvalidOperator("lt".to_string())
    );
}

// =============================================================================
// Query Parameters
// =============================================================================

#[test]
fn test_page_offset_must_be_number() {
    let err = parse_query("page[offset]=abc").unwrap_err();
    assert_eq!(err.status, 400);
    assert_eq!(
        err.source.and_then(|s| s.parameter).as_deref(),
        Some("page[offset]")
    );
}

#[test]
fn test_fields_drop_id_and_type() {
    let parsed = parse_query("fields[people]=name,id,type").unwrap();
    let fields = parsed.fields.unwrap();
    assert_eq!(fields["people"], vec!["name".to_string()]);
}

#[test]
fn test_sort_and_include() {
    let parsed = parse_query("sort=-age,name&include=manager.projects").unwrap();
    assert_eq!(
        parsed.sort.unwrap(),
        vec![SortField::desc("age"), SortField::asc("name")]
    );
    assert_eq!(parsed.include.unwrap(), vec!["manager.projects".to_string()]);
}

#[test]
fn test_filter_read_from_raw_query() {
    let parsed = parse_query("filter=(title,'a%2Cb')").unwrap();
    assert_eq!(
        parsed.filter.unwrap(),
        vec![FieldConstraint::new("title", ComparisonOperator::Eq, json!("a,b")).into()]
    );
}

// =============================================================================
// Cardinality
// =============================================================================

#[test]
fn test_singular_and_plural_never_conflate() {
    assert_eq!(Data::pure(1).into_unwrapped(), Unwrapped::Singular(Some(1)));
    assert_eq!(Data::of(vec![1]).into_unwrapped(), Unwrapped::Plural(vec![1]));
    assert_eq!(Data::<i32>::empty().into_unwrapped(), Unwrapped::Singular(None));
    assert_eq!(Data::<i32>::of(vec![]).into_unwrapped(), Unwrapped::Plural(vec![]));
}

#[test]
fn test_flat_map_matches_map() {
    let data = Data::of(vec![1, 2, 3]);
    assert_eq!(
        data.clone().flat_map(|x| Data::pure(x * 2)),
        data.map(|x| x * 2)
    );
}

#[test]
fn test_flat_map_ands_singularity() {
    assert!(Data::pure(1).flat_map(|_| Data::<i32>::empty()).is_singular());
    assert!(!Data::pure(1).flat_map(|x| Data::of(vec![x])).is_singular());
}
