//! # Data Model Errors
//!
//! Errors raised while constructing resources, linkage and documents.

use thiserror::Error;

use crate::errors::ApiError;

/// Result type for data model construction
pub type DataResult<T> = Result<T, DataError>;

/// Data model errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    /// Resource type is missing or empty
    #[error("Resource type must be a non-empty string")]
    InvalidType,

    /// `id` or `type` used as an attribute or relationship name
    #[error("`{0}` cannot be used as an attribute or relationship name")]
    ReservedMember(String),

    /// Same name used for an attribute and a relationship
    #[error("`{0}` is both an attribute and a relationship")]
    DuplicateMember(String),

    /// Complex attribute contains a key reserved by the wire format
    #[error("Complex attribute `{attribute}` cannot contain a `{key}` key")]
    ReservedNestedKey { attribute: String, key: String },

    /// Resource object is structurally invalid
    #[error("Invalid resource object: {0}")]
    InvalidResourceObject(String),

    /// Relationship object has no `data` member
    #[error("Relationship `{0}` must contain a `data` member")]
    MissingRelationshipData(String),

    /// Linkage is not null, an identifier object or an array of them
    #[error("Invalid linkage: {0}")]
    InvalidLinkage(String),

    /// `included` given without primary data
    #[error("A document cannot contain `included` without primary data")]
    IncludedWithoutPrimary,
}

impl DataError {
    /// Error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            DataError::InvalidType => "invalid_resource_type",
            DataError::ReservedMember(_) => "reserved_member_name",
            DataError::DuplicateMember(_) => "duplicate_member_name",
            DataError::ReservedNestedKey { .. } => "invalid_complex_attribute",
            DataError::InvalidResourceObject(_) => "invalid_resource_object",
            DataError::MissingRelationshipData(_) => "missing_relationship_data",
            DataError::InvalidLinkage(_) => "invalid_linkage",
            DataError::IncludedWithoutPrimary => "included_without_primary",
        }
    }
}

impl From<DataError> for ApiError {
    fn from(err: DataError) -> Self {
        let title = match &err {
            DataError::InvalidLinkage(_) | DataError::MissingRelationshipData(_) => {
                "Invalid linkage"
            }
            DataError::IncludedWithoutPrimary => "Invalid document",
            _ => "Invalid resource",
        };
        ApiError::bad_request(title)
            .with_code(err.code())
            .with_detail(err.to_string())
    }
}
