//! # Request Body
//!
//! Reads the primary data of a request document. Relationship endpoints
//! and collection deletes carry linkage; everything else carries resource
//! objects.

use serde_json::Value;

use crate::data::{Data, Resource, ResourceIdentifier, Transformable};
use crate::errors::ApiResult;

use super::errors::{RequestError, RequestResult};

/// Primary data of a request document
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Resources(Data<Resource>),
    Identifiers(Data<ResourceIdentifier>),
}

impl RequestBody {
    /// Parse the `data` member of a request document
    pub fn parse(body: Value, as_linkage: bool) -> ApiResult<Self> {
        let data = match body {
            Value::Object(mut obj) => obj.remove("data").ok_or(RequestError::MissingData)?,
            _ => return Err(RequestError::MissingData.into()),
        };

        if as_linkage {
            Ok(RequestBody::Identifiers(Data::from_json(
                data,
                ResourceIdentifier::from_json,
            )?))
        } else {
            Ok(RequestBody::Resources(Data::from_json(data, Resource::from_json)?))
        }
    }

    pub fn is_singular(&self) -> bool {
        match self {
            RequestBody::Resources(data) => data.is_singular(),
            RequestBody::Identifiers(data) => data.is_singular(),
        }
    }

    /// Types of every item, in order
    pub fn types(&self) -> Vec<&str> {
        match self {
            RequestBody::Resources(data) => data.iter().map(Resource::type_).collect(),
            RequestBody::Identifiers(data) => data.iter().map(|i| i.type_.as_str()).collect(),
        }
    }

    /// Every item must be one of `allowed`
    pub fn check_types(&self, endpoint_type: &str, allowed: &[String]) -> RequestResult<()> {
        match self.types().into_iter().find(|t| !allowed.iter().any(|a| a == t)) {
            Some(found) => Err(RequestError::InvalidResourceType {
                found: found.to_string(),
                expected: endpoint_type.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// View as transform targets
    pub fn into_transformables(self) -> Data<Transformable> {
        match self {
            RequestBody::Resources(data) => data.map(Transformable::Resource),
            RequestBody::Identifiers(data) => data.map(Transformable::Identifier),
        }
    }

    /// Rebuild from transformed items, keeping the original kind
    pub fn from_transformables(data: Data<Transformable>, as_linkage: bool) -> ApiResult<Self> {
        if as_linkage {
            data.try_map(Transformable::into_identifier)
                .map(RequestBody::Identifiers)
        } else {
            data.try_map(Transformable::into_resource)
                .map(RequestBody::Resources)
        }
    }

    pub fn is_linkage(&self) -> bool {
        matches!(self, RequestBody::Identifiers(_))
    }
}
