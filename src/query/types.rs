//! # Query Objects
//!
//! Backend-agnostic descriptions of what a request asks for. Queries are
//! values: every `with_*` consumes the query and returns the modified one,
//! so a query handed to a caller-supplied transform can be rebuilt but not
//! mutated behind the controller's back.

use std::collections::BTreeMap;

use crate::data::{Data, Resource, ResourceIdentifier};
use crate::filter::FilterNode;
use crate::request::SortField;

/// Read resources of one type
#[derive(Debug, Clone, PartialEq)]
pub struct FindQuery {
    type_: String,
    search_types: Vec<String>,
    ids: Option<Vec<String>>,
    singular: bool,
    filters: Vec<FilterNode>,
    sort: Vec<SortField>,
    offset: u64,
    limit: Option<u64>,
    select: Option<BTreeMap<String, Vec<String>>>,
    populates: Vec<String>,
}

impl FindQuery {
    /// Find every resource of `type_`
    pub fn new(type_: impl Into<String>) -> Self {
        let type_ = type_.into();
        Self {
            search_types: vec![type_.clone()],
            type_,
            ids: None,
            singular: false,
            filters: Vec::new(),
            sort: Vec::new(),
            offset: 0,
            limit: None,
            select: None,
            populates: Vec::new(),
        }
    }

    /// Find one resource; the result is singular
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.ids = Some(vec![id.into()]);
        self.singular = true;
        self
    }

    /// Find several resources by id; the result is plural
    pub fn with_ids(mut self, ids: Vec<String>) -> Self {
        self.ids = Some(ids);
        self.singular = false;
        self
    }

    /// Also look in these stored types, e.g. a type and its subtypes
    pub fn with_search_types(mut self, search_types: Vec<String>) -> Self {
        self.search_types = search_types;
        self
    }

    pub fn with_filters(mut self, filters: Vec<FilterNode>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_sort(mut self, sort: Vec<SortField>) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    /// Sparse fieldsets, keyed by type
    pub fn with_select(mut self, select: Option<BTreeMap<String, Vec<String>>>) -> Self {
        self.select = select;
        self
    }

    /// Relationship paths to include
    pub fn with_populates(mut self, populates: Vec<String>) -> Self {
        self.populates = populates;
        self
    }

    pub fn type_(&self) -> &str {
        &self.type_
    }

    /// The single id of a singular lookup
    pub fn search_types(&self) -> &[String] {
        &self.search_types
    }

    pub fn id(&self) -> Option<&str> {
        match (&self.ids, self.singular) {
            (Some(ids), true) => ids.first().map(String::as_str),
            _ => None,
        }
    }

    pub fn ids(&self) -> Option<&[String]> {
        self.ids.as_deref()
    }

    pub fn is_singular(&self) -> bool {
        self.singular
    }

    pub fn filters(&self) -> &[FilterNode] {
        &self.filters
    }

    pub fn sort(&self) -> &[SortField] {
        &self.sort
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn select(&self) -> Option<&BTreeMap<String, Vec<String>>> {
        self.select.as_ref()
    }

    /// Fields requested for `type_name`, if restricted
    pub fn select_for(&self, type_name: &str) -> Option<&[String]> {
        self.select
            .as_ref()
            .and_then(|s| s.get(type_name))
            .map(Vec::as_slice)
    }

    pub fn populates(&self) -> &[String] {
        &self.populates
    }
}

/// Create new resources
#[derive(Debug, Clone, PartialEq)]
pub struct CreateQuery {
    type_: String,
    records: Data<Resource>,
}

impl CreateQuery {
    pub fn new(type_: impl Into<String>, records: Data<Resource>) -> Self {
        Self {
            type_: type_.into(),
            records,
        }
    }

    pub fn with_records(mut self, records: Data<Resource>) -> Self {
        self.records = records;
        self
    }

    pub fn type_(&self) -> &str {
        &self.type_
    }

    pub fn records(&self) -> &Data<Resource> {
        &self.records
    }

    pub fn into_records(self) -> Data<Resource> {
        self.records
    }
}

/// Apply partial resources to existing ones
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateQuery {
    type_: String,
    search_types: Vec<String>,
    patch: Data<Resource>,
}

impl UpdateQuery {
    pub fn new(type_: impl Into<String>, patch: Data<Resource>) -> Self {
        let type_ = type_.into();
        Self {
            search_types: vec![type_.clone()],
            type_,
            patch,
        }
    }

    pub fn with_patch(mut self, patch: Data<Resource>) -> Self {
        self.patch = patch;
        self
    }

    pub fn with_search_types(mut self, search_types: Vec<String>) -> Self {
        self.search_types = search_types;
        self
    }

    pub fn type_(&self) -> &str {
        &self.type_
    }

    pub fn search_types(&self) -> &[String] {
        &self.search_types
    }

    pub fn patch(&self) -> &Data<Resource> {
        &self.patch
    }

    pub fn into_patch(self) -> Data<Resource> {
        self.patch
    }
}

/// Remove resources by id
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteQuery {
    type_: String,
    search_types: Vec<String>,
    ids: Vec<String>,
    singular: bool,
}

impl DeleteQuery {
    pub fn new(type_: impl Into<String>, id: impl Into<String>) -> Self {
        let type_ = type_.into();
        Self {
            search_types: vec![type_.clone()],
            type_,
            ids: vec![id.into()],
            singular: true,
        }
    }

    pub fn many(type_: impl Into<String>, ids: Vec<String>) -> Self {
        let type_ = type_.into();
        Self {
            search_types: vec![type_.clone()],
            type_,
            ids,
            singular: false,
        }
    }

    pub fn with_search_types(mut self, search_types: Vec<String>) -> Self {
        self.search_types = search_types;
        self
    }

    pub fn type_(&self) -> &str {
        &self.type_
    }

    pub fn search_types(&self) -> &[String] {
        &self.search_types
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn is_singular(&self) -> bool {
        self.singular
    }
}

/// Target of a to-many relationship mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipTarget {
    pub type_: String,
    pub search_types: Vec<String>,
    pub id: String,
    pub relationship_name: String,
}

/// Add members to a to-many relationship
#[derive(Debug, Clone, PartialEq)]
pub struct AddToRelationshipQuery {
    target: RelationshipTarget,
    linkage: Vec<ResourceIdentifier>,
}

/// Remove members from a to-many relationship
#[derive(Debug, Clone, PartialEq)]
pub struct RemoveFromRelationshipQuery {
    target: RelationshipTarget,
    linkage: Vec<ResourceIdentifier>,
}

macro_rules! relationship_query {
    ($name:ident) => {
        impl $name {
            pub fn new(
                type_: impl Into<String>,
                id: impl Into<String>,
                relationship_name: impl Into<String>,
                linkage: Vec<ResourceIdentifier>,
            ) -> Self {
                let type_ = type_.into();
                Self {
                    target: RelationshipTarget {
                        search_types: vec![type_.clone()],
                        type_,
                        id: id.into(),
                        relationship_name: relationship_name.into(),
                    },
                    linkage,
                }
            }

            pub fn with_linkage(mut self, linkage: Vec<ResourceIdentifier>) -> Self {
                self.linkage = linkage;
                self
            }

            pub fn with_search_types(mut self, search_types: Vec<String>) -> Self {
                self.target.search_types = search_types;
                self
            }

            pub fn type_(&self) -> &str {
                &self.target.type_
            }

            pub fn search_types(&self) -> &[String] {
                &self.target.search_types
            }

            pub fn target(&self) -> &RelationshipTarget {
                &self.target
            }

            pub fn id(&self) -> &str {
                &self.target.id
            }

            pub fn relationship_name(&self) -> &str {
                &self.target.relationship_name
            }

            pub fn linkage(&self) -> &[ResourceIdentifier] {
                &self.linkage
            }
        }
    };
}

relationship_query!(AddToRelationshipQuery);
relationship_query!(RemoveFromRelationshipQuery);

/// Every query the pipeline can issue
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Find(FindQuery),
    Create(CreateQuery),
    Update(UpdateQuery),
    Delete(DeleteQuery),
    AddToRelationship(AddToRelationshipQuery),
    RemoveFromRelationship(RemoveFromRelationshipQuery),
}

impl Query {
    /// Type whose adapter runs the query
    pub fn type_(&self) -> &str {
        match self {
            Query::Find(q) => q.type_(),
            Query::Create(q) => q.type_(),
            Query::Update(q) => q.type_(),
            Query::Delete(q) => q.type_(),
            Query::AddToRelationship(q) => q.type_(),
            Query::RemoveFromRelationship(q) => q.type_(),
        }
    }

    /// Query name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Query::Find(_) => "find",
            Query::Create(_) => "create",
            Query::Update(_) => "update",
            Query::Delete(_) => "delete",
            Query::AddToRelationship(_) => "add_to_relationship",
            Query::RemoveFromRelationship(_) => "remove_from_relationship",
        }
    }
}
