//! # Responses
//!
//! Turns the outcome of a pipeline run into a status, headers and body.

use std::collections::BTreeMap;

use crate::data::Document;

/// A framework-neutral HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names are lowercase
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// What a pipeline run produced, before formatting
#[derive(Debug, Clone, Default)]
pub struct ResponseContents {
    /// Overrides the status derived from the document
    pub status: Option<u16>,
    pub headers: BTreeMap<String, String>,
    pub document: Option<Document>,
}

impl ResponseContents {
    pub fn from_document(document: Document) -> Self {
        Self {
            document: Some(document),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Status the response will carry
    pub fn resolved_status(&self) -> u16 {
        if let Some(status) = self.status {
            return status;
        }
        match &self.document {
            None => 204,
            // The first error decides, even when later errors differ.
            Some(doc) => doc
                .errors()
                .first()
                .map(|e| e.rendered_status())
                .unwrap_or(200),
        }
    }
}

/// Format a response; `media_type` is `None` when negotiation failed
pub fn format_response(contents: ResponseContents, media_type: Option<&str>) -> HttpResponse {
    let status = contents.resolved_status();
    let mut headers = contents.headers;
    headers.insert("vary".to_string(), "Accept".to_string());

    let body = match (media_type, contents.document, status) {
        (Some(media_type), Some(document), s) if s != 204 => {
            headers.insert("content-type".to_string(), media_type.to_string());
            Some(document.to_json().to_string())
        }
        _ => {
            headers.remove("content-type");
            None
        }
    };

    HttpResponse {
        status,
        headers,
        body,
    }
}
