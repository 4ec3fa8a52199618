//! # Filter Errors
//!
//! Syntax and validation errors raised while parsing a `filter` parameter.

use thiserror::Error;

use crate::errors::ApiError;

/// Result type for filter parsing
pub type FilterResult<T> = Result<T, FilterError>;

/// Filter syntax/validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    // ==================
    // Syntax
    // ==================
    /// A quoted string never closes
    #[error("Unterminated string starting at position {0}")]
    UnterminatedString(usize),

    /// `(` without `)` or the reverse
    #[error("Unbalanced parentheses")]
    UnbalancedParens,

    /// Token fits none of the atom rules
    #[error("Invalid token: {0}")]
    InvalidAtom(String),

    /// A top-level item is not a parenthesized list
    #[error("Expected a parenthesized list, found `{0}`")]
    ExpectedList(String),

    /// A criteria list has the wrong number of elements
    #[error("Filter criteria must have 2 or 3 elements, found {0}")]
    InvalidListLength(usize),

    /// Field position holds something other than a symbol
    #[error("Expected a field name, found `{0}`")]
    ExpectedField(String),

    // ==================
    // Validation
    // ==================
    /// Operator is unknown or not legal for this resource type
    #[error("`{0}` is not a supported filter operator")]
    InvalidOperator(String),

    /// Argument count does not match the operator's arity
    #[error("`{operator}` expects {expected} argument(s), found {found}")]
    InvalidArity {
        operator: String,
        expected: String,
        found: usize,
    },

    /// `and`/`or` operand that is not a field expression
    #[error("Every argument to `{0}` must be a field expression")]
    ExpectedExpression(String),

    /// Binary operator whose first argument is not a field reference
    #[error("The first argument to `{0}` must be a field name")]
    MissingFieldReference(String),

    /// Binary operator whose value contains a field reference
    #[error("The value given to `{0}` cannot reference another field")]
    NestedFieldReference(String),

    /// `in`/`nin` given a scalar
    #[error("`{0}` expects a list of values")]
    ExpectedListValue(String),

    /// Scalar operator given a list
    #[error("`{0}` expects a single value, not a list")]
    ExpectedScalarValue(String),
}

impl FilterError {
    /// Whether this is a grammar error rather than a validation error
    pub fn is_syntax_error(&self) -> bool {
        matches!(
            self,
            FilterError::UnterminatedString(_)
                | FilterError::UnbalancedParens
                | FilterError::InvalidAtom(_)
                | FilterError::ExpectedList(_)
                | FilterError::InvalidListLength(_)
                | FilterError::ExpectedField(_)
        )
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        let (title, code) = if err.is_syntax_error() {
            ("Invalid filter syntax", "invalid_filter_syntax")
        } else {
            ("Invalid filter", "invalid_filter")
        };
        ApiError::bad_request(title)
            .with_code(code)
            .with_detail(err.to_string())
            .with_source_parameter("filter")
    }
}
