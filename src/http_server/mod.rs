//! # HTTP Server Module
//!
//! Exposes an [`ApiController`](crate::controller::ApiController) over axum.
//!
//! # Endpoints
//!
//! - `/{type}` - Collections
//! - `/{type}/{id}` - Single resources
//! - `/{type}/{id}/{relationship}` - Related resources
//! - `/{type}/{id}/relationships/{relationship}` - Relationship linkage

pub mod config;
pub mod routes;
pub mod server;

pub use config::HttpServerConfig;
pub use routes::{api_routes, build_request, send_response, ApiState, Route};
pub use server::HttpServer;
