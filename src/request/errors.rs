//! # Request Errors
//!
//! Errors raised while negotiating, reading query parameters and reading
//! the request body.

use thiserror::Error;

use crate::errors::ApiError;

/// Result type for request finalization
pub type RequestResult<T> = Result<T, RequestError>;

/// Request errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    // ==================
    // Negotiation
    // ==================
    /// Method outside GET/POST/PATCH/DELETE
    #[error("The method {0} is not supported")]
    UnsupportedMethod(String),

    /// No acceptable response media type
    #[error("{0}")]
    NotAcceptable(String),

    /// Body sent with the wrong content type
    #[error("{0}")]
    UnsupportedMediaType(String),

    /// Content type names an extension this server doesn't speak
    #[error("The extension `{0}` is not supported")]
    UnsupportedExtension(String),

    // ==================
    // Query parameters
    // ==================
    /// Parameter value fails its format
    #[error("Invalid parameter value `{value}` for `{param}`")]
    InvalidParamValue { param: String, value: String },

    /// Parameter needs `name[key]=...` form
    #[error("The `{0}` parameter must be given as `{0}[...]`")]
    ExpectedScoped(String),

    /// Parameter cannot be scoped
    #[error("The `{0}` parameter cannot be scoped")]
    ExpectedUnscoped(String),

    /// Lowercase-only parameter not defined by the protocol
    #[error("The query parameter `{0}` is not supported")]
    UnsupportedParam(String),

    /// `page[limit]` above the configured maximum
    #[error("Page size {limit} exceeds the maximum of {max}")]
    PageSizeExceeded { limit: u64, max: u64 },

    // ==================
    // Body
    // ==================
    /// Body is not an object with a `data` member
    #[error("Request body must be a JSON object with a `data` member")]
    MissingData,

    /// Body holds a resource the endpoint doesn't accept
    #[error("Resources of type `{found}` cannot be sent to the `{expected}` endpoint")]
    InvalidResourceType { found: String, expected: String },
}

impl RequestError {
    /// HTTP status for this error
    pub fn status_code(&self) -> u16 {
        match self {
            RequestError::UnsupportedMethod(_) => 405,
            RequestError::NotAcceptable(_) => 406,
            RequestError::UnsupportedMediaType(_) | RequestError::UnsupportedExtension(_) => 415,
            _ => 400,
        }
    }

    /// Error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            RequestError::UnsupportedMethod(_) => "unsupported_method",
            RequestError::NotAcceptable(_) => "not_acceptable",
            RequestError::UnsupportedMediaType(_) => "unsupported_media_type",
            RequestError::UnsupportedExtension(_) => "unsupported_extension",
            RequestError::InvalidParamValue { .. } => "invalid_parameter_value",
            RequestError::ExpectedScoped(_) | RequestError::ExpectedUnscoped(_) => {
                "invalid_parameter_format"
            }
            RequestError::UnsupportedParam(_) => "unsupported_query_parameter",
            RequestError::PageSizeExceeded { .. } => "page_size_exceeded",
            RequestError::MissingData => "missing_data",
            RequestError::InvalidResourceType { .. } => "invalid_resource_type",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            RequestError::UnsupportedMethod(_) => "Method not supported",
            RequestError::NotAcceptable(_) => "Not acceptable",
            RequestError::UnsupportedMediaType(_) | RequestError::UnsupportedExtension(_) => {
                "Unsupported media type"
            }
            RequestError::InvalidParamValue { .. } | RequestError::PageSizeExceeded { .. } => {
                "Invalid parameter value"
            }
            RequestError::ExpectedScoped(_) | RequestError::ExpectedUnscoped(_) => {
                "Invalid parameter format"
            }
            RequestError::UnsupportedParam(_) => "Unsupported query parameter",
            RequestError::MissingData | RequestError::InvalidResourceType { .. } => {
                "Invalid request body"
            }
        }
    }

    fn parameter(&self) -> Option<&str> {
        match self {
            RequestError::InvalidParamValue { param, .. } => Some(param),
            RequestError::ExpectedScoped(p)
            | RequestError::ExpectedUnscoped(p)
            | RequestError::UnsupportedParam(p) => Some(p),
            RequestError::PageSizeExceeded { .. } => Some("page[limit]"),
            _ => None,
        }
    }
}

impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        let mut api = ApiError::new(err.status_code(), err.title())
            .with_code(err.code())
            .with_detail(err.to_string());
        if let Some(param) = err.parameter() {
            api = api.with_source_parameter(param);
        }
        if matches!(err, RequestError::MissingData) {
            api = api.with_source_pointer("");
        }
        if matches!(err, RequestError::InvalidResourceType { .. }) {
            api = api.with_source_pointer("/data");
        }
        api
    }
}
