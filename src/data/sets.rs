//! # Resource Sets
//!
//! Owner-less wrappers used for primary and included data.

use serde_json::Value;

use super::cardinality::Data;
use super::links::UrlTemplates;
use super::resource::{Resource, ResourceIdentifier};

/// Resources plus link templates
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSet {
    pub data: Data<Resource>,
    /// Take precedence over the document's templates
    pub link_templates: UrlTemplates,
}

impl ResourceSet {
    pub fn new(data: Data<Resource>) -> Self {
        Self {
            data,
            link_templates: UrlTemplates::new(),
        }
    }

    pub fn with_link_templates(mut self, templates: UrlTemplates) -> Self {
        self.link_templates = templates;
        self
    }

    pub fn to_json(&self, templates: &UrlTemplates) -> Value {
        let templates = self.link_templates.merged(templates);
        self.data.to_json(|r| r.to_json(&templates))
    }
}

/// Resource linkage: an identifier object, `null` or an array of them
pub(crate) fn linkage_json(linkage: &Data<ResourceIdentifier>) -> Value {
    linkage.to_json(ResourceIdentifier::to_json)
}

/// Resource identifiers plus link templates
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceIdentifierSet {
    pub data: Data<ResourceIdentifier>,
    pub link_templates: UrlTemplates,
}

impl ResourceIdentifierSet {
    pub fn new(data: Data<ResourceIdentifier>) -> Self {
        Self {
            data,
            link_templates: UrlTemplates::new(),
        }
    }

    pub fn to_json(&self) -> Value {
        linkage_json(&self.data)
    }
}
