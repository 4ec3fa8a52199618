//! # Data Model
//!
//! Resources, linkage, documents and the cardinality container they are
//! all built on.

pub mod cardinality;
pub mod document;
pub mod errors;
pub mod links;
pub mod relationship;
pub mod resource;
pub mod sets;

pub use cardinality::{Data, Unwrapped};
pub use document::{Document, PrimaryData, Transformable};
pub use errors::{DataError, DataResult};
pub use links::{TypeUrlTemplates, UrlTemplates};
pub use relationship::{Relationship, RelationshipOwner};
pub use resource::{Resource, ResourceIdentifier};
pub use sets::{ResourceIdentifierSet, ResourceSet};
