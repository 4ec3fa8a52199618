//! # API Errors
//!
//! The common error value every failure in the pipeline is normalized to.
//! An `ApiError` maps one-to-one onto a JSON:API error object on the wire.
//!
//! Only errors marked display-safe contribute their title/detail to the
//! rendered response. Everything else collapses to a generic 500 so that
//! internal state never leaks to clients.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

/// Result type for pipeline operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Title rendered in place of errors that are not display-safe
pub const GENERIC_ERROR_TITLE: &str =
    "An unknown error occurred while trying to process this request.";

/// Pointer to the part of the request that caused an error
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorSource {
    /// JSON pointer into the request document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,

    /// Name of the offending query parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

/// A protocol-level error
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    /// HTTP status this error maps to
    pub status: u16,

    /// Application-specific error code
    pub code: Option<String>,

    /// Short, human-readable summary
    pub title: Option<String>,

    /// Occurrence-specific explanation
    pub detail: Option<String>,

    /// Where in the request the problem is
    pub source: Option<ErrorSource>,

    /// Free-form metadata
    pub meta: Option<Map<String, Value>>,

    display_safe: bool,
}

impl ApiError {
    /// Create a display-safe error with a status and title
    pub fn new(status: u16, title: impl Into<String>) -> Self {
        Self {
            status,
            code: None,
            title: Some(title.into()),
            detail: None,
            source: None,
            meta: None,
            display_safe: true,
        }
    }

    /// Create an error from an unclassified source.
    ///
    /// The detail is kept for logging but never rendered.
    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: 500,
            code: None,
            title: None,
            detail: Some(detail.into()),
            source: None,
            meta: None,
            display_safe: false,
        }
    }

    /// 400 Bad Request
    pub fn bad_request(title: impl Into<String>) -> Self {
        Self::new(400, title)
    }

    /// 403 Forbidden
    pub fn forbidden(title: impl Into<String>) -> Self {
        Self::new(403, title)
    }

    /// 404 Not Found
    pub fn not_found(title: impl Into<String>) -> Self {
        Self::new(404, title)
    }

    /// 405 Method Not Allowed
    pub fn method_not_allowed(title: impl Into<String>) -> Self {
        Self::new(405, title)
    }

    /// 406 Not Acceptable
    pub fn not_acceptable(title: impl Into<String>) -> Self {
        Self::new(406, title)
    }

    /// 409 Conflict
    pub fn conflict(title: impl Into<String>) -> Self {
        Self::new(409, title)
    }

    /// 415 Unsupported Media Type
    pub fn unsupported_media_type(title: impl Into<String>) -> Self {
        Self::new(415, title)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Point the error at a query parameter
    pub fn with_source_parameter(mut self, parameter: impl Into<String>) -> Self {
        let source = self.source.get_or_insert_with(ErrorSource::default);
        source.parameter = Some(parameter.into());
        self
    }

    /// Point the error at a location in the request document
    pub fn with_source_pointer(mut self, pointer: impl Into<String>) -> Self {
        let source = self.source.get_or_insert_with(ErrorSource::default);
        source.pointer = Some(pointer.into());
        self
    }

    /// Whether title/detail may be shown to clients
    pub fn is_display_safe(&self) -> bool {
        self.display_safe
    }

    /// Status used when rendering; unsafe errors always render as 500
    pub fn rendered_status(&self) -> u16 {
        if self.display_safe {
            self.status
        } else {
            500
        }
    }

    /// Serialize to a JSON:API error object
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert(
            "status".to_string(),
            Value::String(self.rendered_status().to_string()),
        );

        if !self.display_safe {
            obj.insert(
                "title".to_string(),
                Value::String(GENERIC_ERROR_TITLE.to_string()),
            );
            return Value::Object(obj);
        }

        if let Some(code) = &self.code {
            obj.insert("code".to_string(), Value::String(code.clone()));
        }
        if let Some(title) = &self.title {
            obj.insert("title".to_string(), Value::String(title.clone()));
        }
        if let Some(detail) = &self.detail {
            obj.insert("detail".to_string(), Value::String(detail.clone()));
        }
        if let Some(source) = &self.source {
            if let Ok(value) = serde_json::to_value(source) {
                obj.insert("source".to_string(), value);
            }
        }
        if let Some(meta) = &self.meta {
            obj.insert("meta".to_string(), Value::Object(meta.clone()));
        }
        Value::Object(obj)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status)?;
        if let Some(title) = &self.title {
            write!(f, " {}", title)?;
        }
        if let Some(detail) = &self.detail {
            write!(f, ": {}", detail)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        Self::bad_request("Request contains invalid JSON.")
            .with_code("invalid_json")
            .with_detail(e.to_string())
    }
}
