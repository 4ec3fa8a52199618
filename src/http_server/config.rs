//! HTTP Server Configuration
//!
//! Host, port, CORS and the public URL used to build absolute links.

use serde::{Deserialize, Serialize};

use crate::controller::ControllerConfig;

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpServerConfig {
    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 3000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins; empty means any origin (default: [])
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Prefix for request URIs echoed in `links.self`, e.g. "https://api.example.com"
    #[serde(default)]
    pub public_url: Option<String>,

    #[serde(default)]
    pub controller: ControllerConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            public_url: None,
            controller: ControllerConfig::default(),
        }
    }
}

impl HttpServerConfig {
    /// Create a new config with specified port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Absolute form of a request path, when a public URL is configured
    pub fn public_uri(&self, path_and_query: &str) -> String {
        match &self.public_url {
            Some(base) => format!("{}{}", base.trim_end_matches('/'), path_and_query),
            None => path_and_query.to_string(),
        }
    }
}
