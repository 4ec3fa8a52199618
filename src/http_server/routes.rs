//! API HTTP Routes
//!
//! Binds the four endpoint shapes to the controller:
//!
//! - `/{type}`
//! - `/{type}/{id}`
//! - `/{type}/{id}/{relationship}` (related resources)
//! - `/{type}/{id}/relationships/{relationship}`

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{header, HeaderMap, Method as HttpMethod, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tracing::debug;

use crate::controller::{format_response, ApiController, HttpResponse, ResponseContents};
use crate::data::Document;
use crate::errors::ApiError;
use crate::request::{Method, Request};

use super::config::HttpServerConfig;

// ==================
// Shared State
// ==================

/// State shared across handlers
pub struct ApiState {
    pub controller: ApiController,
    pub config: HttpServerConfig,
}

impl ApiState {
    pub fn new(controller: ApiController, config: HttpServerConfig) -> Self {
        Self { controller, config }
    }
}

// ==================
// Binding
// ==================

/// Which endpoint a request hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Collection { type_: String },
    Single { type_: String, id: String },
    Related { type_: String, id: String, relationship: String },
    Relationship { type_: String, id: String, relationship: String },
}

/// Build a pipeline request from the parts of an HTTP request
pub fn build_request(
    route: Route,
    method: &HttpMethod,
    uri: &Uri,
    headers: &HeaderMap,
    body: &[u8],
    config: &HttpServerConfig,
) -> Result<Request, ApiError> {
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let uri_string = config.public_uri(path_and_query);
    let method = Method::parse(method.as_str());

    let mut request = match route {
        Route::Collection { type_ } => Request::new(method, uri_string, type_),
        Route::Single { type_, id } => Request::new(method, uri_string, type_).with_id(id),
        Route::Related {
            type_,
            id,
            relationship,
        } => Request::new(method, uri_string, type_)
            .with_id(id)
            .with_related(relationship),
        Route::Relationship {
            type_,
            id,
            relationship,
        } => Request::new(method, uri_string, type_)
            .with_id(id)
            .with_relationship(relationship),
    };

    if let Some(query) = uri.query() {
        request = request.with_query_string(query);
    }
    if let Some(accept) = header_str(headers, header::ACCEPT) {
        request = request.with_accepts(accept);
    }

    if !body.is_empty() {
        let value = serde_json::from_slice(body).map_err(|e| {
            ApiError::bad_request("Request body is not valid JSON").with_detail(e.to_string())
        })?;
        request.body = Some(value);
        request.content_type = header_str(headers, header::CONTENT_TYPE).map(str::to_string);
    }

    Ok(request)
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Convert a pipeline response into an axum response
pub fn send_response(response: HttpResponse) -> Response {
    let mut builder = Response::builder().status(response.status);
    for (name, value) in &response.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    builder
        .body(Body::from(response.body.unwrap_or_default()))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

/// Errors raised while binding still go through negotiation
fn binding_error(state: &ApiState, headers: &HeaderMap, err: ApiError) -> Response {
    let media_type = state
        .controller
        .negotiate(header_str(headers, header::ACCEPT))
        .ok();
    let contents = ResponseContents::from_document(Document::from_errors(vec![err]));
    send_response(format_response(contents, media_type))
}

async fn dispatch(
    state: Arc<ApiState>,
    route: Route,
    method: HttpMethod,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    debug!(?route, %method, "dispatching request");
    match build_request(route, &method, &uri, &headers, &body, &state.config) {
        Ok(request) => send_response(state.controller.handle(request).await),
        Err(err) => binding_error(&state, &headers, err),
    }
}

// ==================
// Handlers
// ==================

async fn collection(
    State(state): State<Arc<ApiState>>,
    Path(type_): Path<String>,
    method: HttpMethod,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    dispatch(state, Route::Collection { type_ }, method, uri, headers, body).await
}

async fn single(
    State(state): State<Arc<ApiState>>,
    Path((type_, id)): Path<(String, String)>,
    method: HttpMethod,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    dispatch(state, Route::Single { type_, id }, method, uri, headers, body).await
}

async fn related(
    State(state): State<Arc<ApiState>>,
    Path((type_, id, relationship)): Path<(String, String, String)>,
    method: HttpMethod,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let route = Route::Related {
        type_,
        id,
        relationship,
    };
    dispatch(state, route, method, uri, headers, body).await
}

async fn relationship(
    State(state): State<Arc<ApiState>>,
    Path((type_, id, relationship)): Path<(String, String, String)>,
    method: HttpMethod,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let route = Route::Relationship {
        type_,
        id,
        relationship,
    };
    dispatch(state, route, method, uri, headers, body).await
}

/// Create API routes
pub fn api_routes(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/:type", any(collection))
        .route("/:type/:id", any(single))
        .route("/:type/:id/relationships/:relationship", any(relationship))
        .route("/:type/:id/:relationship", any(related))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_build_request_for_relationship_route() {
        let uri: Uri = "/people/1/relationships/pets?include=owner".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/vnd.api+json"));

        let request = build_request(
            Route::Relationship {
                type_: "people".to_string(),
                id: "1".to_string(),
                relationship: "pets".to_string(),
            },
            &HttpMethod::GET,
            &uri,
            &headers,
            b"",
            &HttpServerConfig::default(),
        )
        .unwrap();

        assert_eq!(request.method, Method::Get);
        assert_eq!(request.uri, "/people/1/relationships/pets?include=owner");
        assert_eq!(request.id.as_deref(), Some("1"));
        assert_eq!(request.relationship.as_deref(), Some("pets"));
        assert!(request.about_relationship);
        assert_eq!(request.raw_query_string.as_deref(), Some("include=owner"));
        assert_eq!(request.accepts.as_deref(), Some("application/vnd.api+json"));
        assert_eq!(request.body, None);
    }

    #[test]
    fn test_body_keeps_sent_content_type() {
        let uri: Uri = "/people".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        let request = build_request(
            Route::Collection {
                type_: "people".to_string(),
            },
            &HttpMethod::POST,
            &uri,
            &headers,
            br#"{"data": null}"#,
            &HttpServerConfig::default(),
        )
        .unwrap();
        assert_eq!(request.content_type.as_deref(), Some("text/plain"));
        assert!(request.body.is_some());
    }

    #[test]
    fn test_invalid_json_is_bad_request() {
        let uri: Uri = "/people".parse().unwrap();
        let err = build_request(
            Route::Collection {
                type_: "people".to_string(),
            },
            &HttpMethod::POST,
            &uri,
            &HeaderMap::new(),
            b"{not json",
            &HttpServerConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.status, 400);
    }

    #[test]
    fn test_send_response() {
        let mut response = HttpResponse {
            status: 201,
            headers: Default::default(),
            body: Some("{}".to_string()),
        };
        response
            .headers
            .insert("location".to_string(), "/people/1".to_string());

        let response = send_response(response);
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["location"], "/people/1");
    }
}
