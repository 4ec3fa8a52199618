//! # Registry Errors
//!
//! Configuration mistakes caught when the type registry is built.

use thiserror::Error;

use crate::errors::ApiError;

/// Result type for registry construction
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Registry construction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Same type registered twice
    #[error("Resource type `{0}` is registered more than once")]
    DuplicateType(String),

    /// Type name is empty or not a legal member name
    #[error("`{0}` is not a valid resource type name")]
    InvalidTypeName(String),

    /// Parent type was never registered
    #[error("Resource type `{type_name}` names unknown parent type `{parent}`")]
    UnknownParent { type_name: String, parent: String },

    /// Parent chain loops back on itself
    #[error("Resource type `{0}` is its own ancestor")]
    Cycle(String),

    /// Neither the type nor any ancestor has an adapter
    #[error("Resource type `{0}` has no adapter")]
    MissingAdapter(String),
}

impl RegistryError {
    /// HTTP status for this error
    pub fn status_code(&self) -> u16 {
        500
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        ApiError::internal(err.to_string())
    }
}
