//! # URL Templates
//!
//! Per-type link templates used to render `self`/`related` links.
//!
//! Placeholders: `{id}` (resource id), `{ownerType}`, `{ownerId}` and
//! `{path}` (relationship name). Substituted values are percent-encoded.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Link templates for one resource type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeUrlTemplates {
    /// Resource self link, e.g. `https://api.example.com/people/{id}`
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,

    /// Related resource link for a relationship
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related: Option<String>,

    /// Relationship self link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
}

impl TypeUrlTemplates {
    /// Fill unset templates from a fallback
    pub fn or(self, fallback: &TypeUrlTemplates) -> Self {
        Self {
            self_link: self.self_link.or_else(|| fallback.self_link.clone()),
            related: self.related.or_else(|| fallback.related.clone()),
            relationship: self.relationship.or_else(|| fallback.relationship.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.self_link.is_none() && self.related.is_none() && self.relationship.is_none()
    }
}

/// Link templates keyed by resource type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlTemplates {
    by_type: BTreeMap<String, TypeUrlTemplates>,
}

impl UrlTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, type_name: impl Into<String>, templates: TypeUrlTemplates) -> Self {
        self.insert(type_name, templates);
        self
    }

    pub fn insert(&mut self, type_name: impl Into<String>, templates: TypeUrlTemplates) {
        self.by_type.insert(type_name.into(), templates);
    }

    pub fn get(&self, type_name: &str) -> Option<&TypeUrlTemplates> {
        self.by_type.get(type_name)
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }

    /// Combine two template sets; entries in `self` win
    pub fn merged(&self, other: &UrlTemplates) -> UrlTemplates {
        let mut by_type = other.by_type.clone();
        for (type_name, templates) in &self.by_type {
            let combined = match other.by_type.get(type_name) {
                Some(fallback) => templates.clone().or(fallback),
                None => templates.clone(),
            };
            by_type.insert(type_name.clone(), combined);
        }
        UrlTemplates { by_type }
    }

    /// Self link for a resource
    pub fn resource_self(&self, type_name: &str, id: &str) -> Option<String> {
        let template = self.get(type_name)?.self_link.as_deref()?;
        Some(expand(template, &[("id", id)]))
    }

    /// Self link for a relationship of an owner resource
    pub fn relationship_self(&self, owner_type: &str, owner_id: &str, path: &str) -> Option<String> {
        let template = self.get(owner_type)?.relationship.as_deref()?;
        Some(expand_owner(template, owner_type, owner_id, path))
    }

    /// Related resource link for a relationship of an owner resource
    pub fn related(&self, owner_type: &str, owner_id: &str, path: &str) -> Option<String> {
        let template = self.get(owner_type)?.related.as_deref()?;
        Some(expand_owner(template, owner_type, owner_id, path))
    }
}

fn expand_owner(template: &str, owner_type: &str, owner_id: &str, path: &str) -> String {
    expand(
        template,
        &[
            ("ownerType", owner_type),
            ("ownerId", owner_id),
            ("id", owner_id),
            ("path", path),
        ],
    )
}

/// Replace `{name}` placeholders with percent-encoded values
pub fn expand(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        let placeholder = format!("{{{}}}", name);
        if out.contains(&placeholder) {
            out = out.replace(&placeholder, &urlencoding::encode(value));
        }
    }
    out
}
