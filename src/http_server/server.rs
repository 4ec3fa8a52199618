//! # HTTP Server
//!
//! Serves the API routes with CORS and request tracing.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::config::HttpServerConfig;
use super::routes::{api_routes, ApiState};
use crate::controller::ApiController;
use crate::registry::ResourceTypeRegistry;

/// HTTP server for a resource type registry
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with default configuration
    pub fn new(registry: Arc<ResourceTypeRegistry>) -> Self {
        Self::with_config(registry, HttpServerConfig::default())
    }

    /// Create a new HTTP server with custom configuration
    pub fn with_config(registry: Arc<ResourceTypeRegistry>, config: HttpServerConfig) -> Self {
        let controller = ApiController::with_config(registry, config.controller.clone());
        let router = Self::build_router(controller, &config);
        Self { config, router }
    }

    fn build_router(controller: ApiController, config: &HttpServerConfig) -> Router {
        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        let state = Arc::new(ApiState::new(controller, config.clone()));
        api_routes(state)
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Start the HTTP server (async)
    pub async fn start(self) -> Result<(), io::Error> {
        let addr: SocketAddr = self
            .config
            .socket_addr()
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        info!(%addr, "starting API server");

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, self.router).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Arc<ResourceTypeRegistry> {
        Arc::new(ResourceTypeRegistry::builder().build().unwrap())
    }

    #[test]
    fn test_server_creation() {
        let server = HttpServer::new(registry());
        assert_eq!(server.socket_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_server_with_custom_port() {
        let config = HttpServerConfig::with_port(8080);
        let server = HttpServer::with_config(registry(), config);
        assert_eq!(server.socket_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_router_builds() {
        let server = HttpServer::new(registry());
        let _router = server.router();
    }
}
