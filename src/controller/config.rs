//! Controller Configuration
//!
//! Settings that shape how requests are validated and answered.

use serde::{Deserialize, Serialize};

/// Pipeline controller configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// `ext` values accepted in request content types (default: none)
    #[serde(default)]
    pub supported_extensions: Vec<String>,

    /// Largest `page[limit]` a client may ask for (default: 1000)
    #[serde(default = "default_max_page_size")]
    pub max_page_size: Option<u64>,

    /// Answer `application/json` clients that don't accept the protocol type (default: true)
    #[serde(default = "default_json_fallback")]
    pub json_fallback: bool,
}

fn default_max_page_size() -> Option<u64> {
    Some(1000)
}

fn default_json_fallback() -> bool {
    true
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            supported_extensions: Vec::new(),
            max_page_size: default_max_page_size(),
            json_fallback: default_json_fallback(),
        }
    }
}

impl ControllerConfig {
    /// Create a config with a specific page size cap
    pub fn with_max_page_size(max_page_size: Option<u64>) -> Self {
        Self {
            max_page_size,
            ..Default::default()
        }
    }
}
