//! # Requests
//!
//! The framework-neutral request the pipeline consumes. Bindings fill one
//! in from whatever their HTTP library hands them; the controller never
//! sees framework types.

pub mod body;
pub mod errors;
pub mod negotiation;
pub mod params;

use std::fmt;

use serde_json::Value;

pub use body::RequestBody;
pub use errors::{RequestError, RequestResult};
pub use negotiation::{JSON_API_MEDIA_TYPE, JSON_MEDIA_TYPE};
pub use params::{ParsedParams, RawParam, RawParams, SortDirection, SortField};

/// HTTP method
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
    Other(String),
}

impl Method {
    pub fn parse(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PATCH" => Method::Patch,
            "DELETE" => Method::Delete,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Other(m) => m,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request addressed to one endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    /// Absolute or path-only URI the request was made to
    pub uri: String,
    /// Parsed JSON body, if one was sent
    pub body: Option<Value>,
    pub content_type: Option<String>,
    /// Raw `Accept` header
    pub accepts: Option<String>,
    /// Query string as received, without the leading `?`
    pub raw_query_string: Option<String>,
    pub query_params: RawParams,

    /// Endpoint resource type
    pub type_: String,
    pub id: Option<String>,
    /// Relationship name for `/type/id/rel` and `/type/id/relationships/rel`
    pub relationship: Option<String>,
    /// True for `/type/id/relationships/rel`
    pub about_relationship: bool,
}

impl Request {
    pub fn new(method: Method, uri: impl Into<String>, type_: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            body: None,
            content_type: None,
            accepts: None,
            raw_query_string: None,
            query_params: RawParams::new(),
            type_: type_.into(),
            id: None,
            relationship: None,
            about_relationship: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Address the related resources of a relationship
    pub fn with_related(mut self, relationship: impl Into<String>) -> Self {
        self.relationship = Some(relationship.into());
        self.about_relationship = false;
        self
    }

    /// Address the relationship itself
    pub fn with_relationship(mut self, relationship: impl Into<String>) -> Self {
        self.relationship = Some(relationship.into());
        self.about_relationship = true;
        self
    }

    /// Attach a JSON:API body
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        if self.content_type.is_none() {
            self.content_type = Some(JSON_API_MEDIA_TYPE.to_string());
        }
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_accepts(mut self, accepts: impl Into<String>) -> Self {
        self.accepts = Some(accepts.into());
        self
    }

    /// Set the raw query string and the params read from it
    pub fn with_query_string(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        let query = query.trim_start_matches('?').to_string();
        self.query_params = RawParams::from_query_string(&query);
        self.raw_query_string = Some(query);
        self
    }

    /// Whether the body (if any) carries linkage rather than resources
    pub fn expects_linkage(&self) -> bool {
        self.about_relationship || (self.method == Method::Delete && self.id.is_none())
    }

    /// Whether this request addresses a relationship
    pub fn targets_relationship(&self) -> bool {
        self.relationship.is_some()
    }
}
