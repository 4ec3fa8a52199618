//! # Queries
//!
//! Query objects built from requests, and the adapter contract that
//! executes them.

pub mod adapter;
pub mod types;

pub use adapter::{Adapter, AdapterFuture, FindResult, RelationshipChange};
pub use types::{
    AddToRelationshipQuery, CreateQuery, DeleteQuery, FindQuery, Query, RelationshipTarget,
    RemoveFromRelationshipQuery, UpdateQuery,
};
