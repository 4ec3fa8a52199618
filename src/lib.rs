//! aeroapi - A JSON:API request pipeline
//!
//! Translates HTTP-style requests into typed, backend-agnostic queries and
//! renders adapter results back into JSON:API documents.
//!
//! ```ignore
//! let registry = ResourceTypeRegistry::builder()
//!     .register("people", ResourceTypeDescription::new().with_adapter(adapter))
//!     .build()?;
//! let controller = ApiController::new(Arc::new(registry));
//! let response = controller.handle(Request::new(Method::Get, "/people", "people")).await;
//! ```

pub mod controller;
pub mod data;
pub mod errors;
pub mod filter;
pub mod http_server;
pub mod memory;
pub mod observability;
pub mod query;
pub mod registry;
pub mod request;

pub use controller::{ApiController, ControllerConfig, HttpResponse};
pub use data::{Data, Document, Resource, ResourceIdentifier};
pub use errors::{ApiError, ApiResult};
pub use memory::MemoryAdapter;
pub use query::{Adapter, Query};
pub use registry::{ResourceTypeDescription, ResourceTypeRegistry};
pub use request::{Method, Request};
