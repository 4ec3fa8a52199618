//! # Resource Type Registry
//!
//! Every resource type the API serves, with its parent type, adapter, URL
//! templates, default includes and transform hooks. The registry is built
//! once, validated, and then shared read-only between pipeline runs.
//!
//! A subtype inherits its parent's adapter, URL templates and default
//! includes unless it sets its own. Hooks are not copied; they are chained
//! through [`SuperFn`] instead.

pub mod errors;
pub mod transform;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::data::{TypeUrlTemplates, UrlTemplates};
use crate::filter::OperatorSet;
use crate::query::Adapter;
use crate::request::params::is_valid_member_name;

pub use errors::{RegistryError, RegistryResult};
pub use transform::{
    transform_fn, SuperFn, TransformContext, TransformFn, TransformPhase, TransformResult,
};

/// Configuration for one resource type
#[derive(Clone, Default)]
pub struct ResourceTypeDescription {
    pub parent_type: Option<String>,
    pub adapter: Option<Arc<dyn Adapter>>,
    pub url_templates: TypeUrlTemplates,
    pub default_includes: Option<Vec<String>>,
    pub before_save: Option<TransformFn>,
    pub before_render: Option<TransformFn>,
    /// Run this type's hooks on identifiers in linkage too
    pub transform_linkage: bool,
}

impl ResourceTypeDescription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_type = Some(parent.into());
        self
    }

    pub fn with_adapter(mut self, adapter: Arc<dyn Adapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    pub fn with_url_templates(mut self, templates: TypeUrlTemplates) -> Self {
        self.url_templates = templates;
        self
    }

    pub fn with_default_includes(mut self, includes: Vec<String>) -> Self {
        self.default_includes = Some(includes);
        self
    }

    pub fn with_before_save(mut self, hook: TransformFn) -> Self {
        self.before_save = Some(hook);
        self
    }

    pub fn with_before_render(mut self, hook: TransformFn) -> Self {
        self.before_render = Some(hook);
        self
    }

    pub fn with_transform_linkage(mut self, enabled: bool) -> Self {
        self.transform_linkage = enabled;
        self
    }

    fn hook(&self, phase: TransformPhase) -> Option<&TransformFn> {
        match phase {
            TransformPhase::BeforeSave => self.before_save.as_ref(),
            TransformPhase::BeforeRender => self.before_render.as_ref(),
        }
    }
}

impl fmt::Debug for ResourceTypeDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceTypeDescription")
            .field("parent_type", &self.parent_type)
            .field("has_adapter", &self.adapter.is_some())
            .field("url_templates", &self.url_templates)
            .field("default_includes", &self.default_includes)
            .field("has_before_save", &self.before_save.is_some())
            .field("has_before_render", &self.before_render.is_some())
            .field("transform_linkage", &self.transform_linkage)
            .finish()
    }
}

/// A type after inheritance has been resolved
struct RegisteredType {
    parent_type: Option<String>,
    /// Root first, this type last
    type_path: Vec<String>,
    adapter: Arc<dyn Adapter>,
    operators: OperatorSet,
    url_templates: TypeUrlTemplates,
    default_includes: Vec<String>,
    transform_linkage: bool,
    before_save_chain: Arc<[TransformFn]>,
    before_render_chain: Arc<[TransformFn]>,
}

/// Immutable set of resource types
pub struct ResourceTypeRegistry {
    types: BTreeMap<String, RegisteredType>,
    url_templates: UrlTemplates,
    any_transform_linkage: bool,
}

impl fmt::Debug for ResourceTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceTypeRegistry")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ResourceTypeRegistry {
    pub fn builder() -> ResourceTypeRegistryBuilder {
        ResourceTypeRegistryBuilder::default()
    }

    pub fn has_type(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn parent_type(&self, type_name: &str) -> Option<&str> {
        self.types
            .get(type_name)
            .and_then(|t| t.parent_type.as_deref())
    }

    /// Ancestors and the type itself, root first
    pub fn type_path(&self, type_name: &str) -> Option<&[String]> {
        self.types.get(type_name).map(|t| t.type_path.as_slice())
    }

    pub fn adapter(&self, type_name: &str) -> Option<&Arc<dyn Adapter>> {
        self.types.get(type_name).map(|t| &t.adapter)
    }

    /// Filter operators the type's adapter supports
    pub fn operators(&self, type_name: &str) -> Option<&OperatorSet> {
        self.types.get(type_name).map(|t| &t.operators)
    }

    /// The type and every type that has it as an ancestor
    pub fn type_and_descendants(&self, type_name: &str) -> Vec<String> {
        self.types
            .iter()
            .filter(|(_, t)| t.type_path.iter().any(|p| p == type_name))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Templates for one type, inheritance applied
    pub fn type_url_templates(&self, type_name: &str) -> Option<&TypeUrlTemplates> {
        self.types.get(type_name).map(|t| &t.url_templates)
    }

    /// Templates for every type
    pub fn url_templates(&self) -> &UrlTemplates {
        &self.url_templates
    }

    pub fn default_includes(&self, type_name: &str) -> &[String] {
        self.types
            .get(type_name)
            .map(|t| t.default_includes.as_slice())
            .unwrap_or(&[])
    }

    pub fn transforms_linkage(&self, type_name: &str) -> bool {
        self.types
            .get(type_name)
            .map(|t| t.transform_linkage)
            .unwrap_or(false)
    }

    /// Whether any type opts into linkage transforms
    pub fn any_transform_linkage(&self) -> bool {
        self.any_transform_linkage
    }

    /// Hooks for a phase, most specific first
    pub(crate) fn chain(&self, type_name: &str, phase: TransformPhase) -> Arc<[TransformFn]> {
        match self.types.get(type_name) {
            Some(t) => match phase {
                TransformPhase::BeforeSave => t.before_save_chain.clone(),
                TransformPhase::BeforeRender => t.before_render_chain.clone(),
            },
            None => Arc::from(Vec::new()),
        }
    }
}

/// Collects type descriptions and validates them together
#[derive(Default)]
pub struct ResourceTypeRegistryBuilder {
    descriptions: Vec<(String, ResourceTypeDescription)>,
}

impl ResourceTypeRegistryBuilder {
    pub fn register(
        mut self,
        type_name: impl Into<String>,
        description: ResourceTypeDescription,
    ) -> Self {
        self.descriptions.push((type_name.into(), description));
        self
    }

    pub fn build(self) -> RegistryResult<ResourceTypeRegistry> {
        let mut descriptions = BTreeMap::new();
        for (name, description) in self.descriptions {
            if name.is_empty() || !is_valid_member_name(&name) {
                return Err(RegistryError::InvalidTypeName(name));
            }
            if descriptions.insert(name.clone(), description).is_some() {
                return Err(RegistryError::DuplicateType(name));
            }
        }

        let mut types = BTreeMap::new();
        for name in descriptions.keys() {
            let path = resolve_path(name, &descriptions)?;
            let registered = resolve_type(name, path, &descriptions)?;
            types.insert(name.clone(), registered);
        }

        let mut url_templates = UrlTemplates::new();
        for (name, t) in &types {
            if !t.url_templates.is_empty() {
                url_templates.insert(name.clone(), t.url_templates.clone());
            }
        }
        let any_transform_linkage = types.values().any(|t| t.transform_linkage);

        Ok(ResourceTypeRegistry {
            types,
            url_templates,
            any_transform_linkage,
        })
    }
}

fn resolve_path(
    name: &str,
    descriptions: &BTreeMap<String, ResourceTypeDescription>,
) -> RegistryResult<Vec<String>> {
    let mut path = vec![name.to_string()];
    let mut seen = BTreeSet::from([name.to_string()]);
    let mut current = name;

    while let Some(parent) = descriptions
        .get(current)
        .and_then(|d| d.parent_type.as_deref())
    {
        if !descriptions.contains_key(parent) {
            return Err(RegistryError::UnknownParent {
                type_name: current.to_string(),
                parent: parent.to_string(),
            });
        }
        if !seen.insert(parent.to_string()) {
            return Err(RegistryError::Cycle(name.to_string()));
        }
        path.push(parent.to_string());
        current = parent;
    }

    path.reverse();
    Ok(path)
}

fn resolve_type(
    name: &str,
    type_path: Vec<String>,
    descriptions: &BTreeMap<String, ResourceTypeDescription>,
) -> RegistryResult<RegisteredType> {
    // Leaf first, so the nearest setting wins.
    let lineage: Vec<&ResourceTypeDescription> = type_path
        .iter()
        .rev()
        .filter_map(|t| descriptions.get(t))
        .collect();

    let adapter = lineage
        .iter()
        .find_map(|d| d.adapter.clone())
        .ok_or_else(|| RegistryError::MissingAdapter(name.to_string()))?;

    let url_templates = lineage
        .iter()
        .fold(TypeUrlTemplates::default(), |acc, d| acc.or(&d.url_templates));

    let default_includes = lineage
        .iter()
        .find_map(|d| d.default_includes.clone())
        .unwrap_or_default();

    let before_save_chain: Arc<[TransformFn]> = lineage
        .iter()
        .filter_map(|d| d.hook(TransformPhase::BeforeSave).cloned())
        .collect();
    let before_render_chain: Arc<[TransformFn]> = lineage
        .iter()
        .filter_map(|d| d.hook(TransformPhase::BeforeRender).cloned())
        .collect();

    let own = lineage.first().copied();

    Ok(RegisteredType {
        parent_type: own.and_then(|d| d.parent_type.clone()),
        operators: OperatorSet::from_supported(&adapter.supported_operators()),
        adapter,
        url_templates,
        default_includes,
        transform_linkage: own.map(|d| d.transform_linkage).unwrap_or(false),
        before_save_chain,
        before_render_chain,
        type_path,
    })
}
