//! # Relationships
//!
//! A relationship is the linkage of one named relationship on one owner
//! resource. It knows its owner so it can render its own `self` and
//! `related` links without being told its context again.

use serde_json::{Map, Value};

use super::cardinality::Data;
use super::links::{TypeUrlTemplates, UrlTemplates};
use super::resource::ResourceIdentifier;
use super::sets::linkage_json;

/// The resource and relationship name a linkage belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipOwner {
    pub type_: String,
    /// Absent while the owner has not been created yet
    pub id: Option<String>,
    /// Relationship name on the owner
    pub path: String,
}

impl RelationshipOwner {
    pub fn new(type_: impl Into<String>, id: Option<String>, path: impl Into<String>) -> Self {
        Self {
            type_: type_.into(),
            id,
            path: path.into(),
        }
    }
}

/// Linkage plus owner
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub owner: RelationshipOwner,
    linkage: Data<ResourceIdentifier>,
    /// Overrides the owner type's templates when set
    pub link_templates: Option<TypeUrlTemplates>,
}

impl Relationship {
    pub fn new(owner: RelationshipOwner, linkage: Data<ResourceIdentifier>) -> Self {
        Self {
            owner,
            linkage,
            link_templates: None,
        }
    }

    pub fn to_one(owner: RelationshipOwner, target: Option<ResourceIdentifier>) -> Self {
        Self::new(owner, Data::from_option(target))
    }

    pub fn to_many(owner: RelationshipOwner, targets: Vec<ResourceIdentifier>) -> Self {
        Self::new(owner, Data::of(targets))
    }

    pub fn with_link_templates(mut self, templates: TypeUrlTemplates) -> Self {
        self.link_templates = Some(templates);
        self
    }

    pub fn linkage(&self) -> &Data<ResourceIdentifier> {
        &self.linkage
    }

    pub fn into_linkage(self) -> Data<ResourceIdentifier> {
        self.linkage
    }

    /// Same owner, new linkage
    pub fn with_linkage(self, linkage: Data<ResourceIdentifier>) -> Self {
        Self { linkage, ..self }
    }

    fn links(&self, templates: &UrlTemplates) -> Map<String, Value> {
        let mut links = Map::new();
        let owner_id = match &self.owner.id {
            Some(id) => id.as_str(),
            None => return links,
        };

        let scoped;
        let templates = match &self.link_templates {
            Some(own) => {
                scoped = UrlTemplates::new()
                    .with_type(self.owner.type_.clone(), own.clone())
                    .merged(templates);
                &scoped
            }
            None => templates,
        };

        if let Some(link) = templates.relationship_self(&self.owner.type_, owner_id, &self.owner.path) {
            links.insert("self".to_string(), Value::String(link));
        }
        if let Some(link) = templates.related(&self.owner.type_, owner_id, &self.owner.path) {
            links.insert("related".to_string(), Value::String(link));
        }
        links
    }

    /// Render as a JSON:API relationship object
    pub fn to_json(&self, templates: &UrlTemplates) -> Value {
        let mut obj = Map::new();
        obj.insert("data".to_string(), linkage_json(&self.linkage));
        let links = self.links(templates);
        if !links.is_empty() {
            obj.insert("links".to_string(), Value::Object(links));
        }
        Value::Object(obj)
    }
}
