//! # Pipeline Controller
//!
//! Turns a [`Request`](crate::request::Request) into an
//! [`HttpResponse`] using the registry's adapters and hooks.

pub mod api_controller;
pub mod config;
mod make_query;
pub mod response;

pub use api_controller::ApiController;
pub use config::ControllerConfig;
pub use response::{format_response, HttpResponse, ResponseContents};
