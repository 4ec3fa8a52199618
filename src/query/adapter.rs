//! # Adapter Contract
//!
//! An adapter executes queries against one storage backend. The pipeline
//! holds adapters as `Arc<dyn Adapter>` and may call them from many runs
//! at once, so implementations must be `Send + Sync`.

use futures_util::future::BoxFuture;

use crate::data::{Data, Resource, ResourceIdentifier};
use crate::errors::ApiResult;
use crate::filter::SupportedOperators;

use super::types::{
    AddToRelationshipQuery, CreateQuery, DeleteQuery, FindQuery, RemoveFromRelationshipQuery,
    UpdateQuery,
};

/// Future returned by adapter methods
pub type AdapterFuture<'a, T> = BoxFuture<'a, ApiResult<T>>;

/// Result of a find
#[derive(Debug, Clone, PartialEq)]
pub struct FindResult {
    /// Singular exactly when the query was
    pub primary: Data<Resource>,
    pub included: Vec<Resource>,
    /// Number of matches before pagination
    pub collection_size: Option<u64>,
}

impl FindResult {
    pub fn new(primary: Data<Resource>) -> Self {
        Self {
            primary,
            included: Vec::new(),
            collection_size: None,
        }
    }

    pub fn with_included(mut self, included: Vec<Resource>) -> Self {
        self.included = included;
        self
    }

    pub fn with_collection_size(mut self, collection_size: u64) -> Self {
        self.collection_size = Some(collection_size);
        self
    }
}

/// Linkage before and after a relationship mutation
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipChange {
    pub before: Data<ResourceIdentifier>,
    pub after: Data<ResourceIdentifier>,
}

/// Storage backend for one or more resource types
pub trait Adapter: Send + Sync {
    fn find(&self, query: FindQuery) -> AdapterFuture<'_, FindResult>;

    /// Returns the created resources with their ids
    fn create(&self, query: CreateQuery) -> AdapterFuture<'_, Data<Resource>>;

    /// Returns the resources as they are after the update
    fn update(&self, query: UpdateQuery) -> AdapterFuture<'_, Data<Resource>>;

    /// Returns the deleted resources
    fn delete(&self, query: DeleteQuery) -> AdapterFuture<'_, Data<Resource>>;

    fn add_to_relationship(
        &self,
        query: AddToRelationshipQuery,
    ) -> AdapterFuture<'_, RelationshipChange>;

    fn remove_from_relationship(
        &self,
        query: RemoveFromRelationshipQuery,
    ) -> AdapterFuture<'_, RelationshipChange>;

    /// Filter operators this adapter can execute
    fn supported_operators(&self) -> SupportedOperators {
        SupportedOperators::default()
    }
}
