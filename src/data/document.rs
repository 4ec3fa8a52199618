//! # Document
//!
//! The top-level envelope: primary data or errors, plus included
//! resources, meta and links. Exactly one of `data`/`errors` reaches the
//! wire; `included` is only valid alongside primary data.

use std::future::Future;

use serde_json::{Map, Value};

use crate::errors::{ApiError, ApiResult};

use super::cardinality::Data;
use super::errors::{DataError, DataResult};
use super::links::UrlTemplates;
use super::relationship::Relationship;
use super::resource::{Resource, ResourceIdentifier};
use super::sets::{ResourceIdentifierSet, ResourceSet};

/// A value a per-item transform operates on
#[derive(Debug, Clone, PartialEq)]
pub enum Transformable {
    Resource(Resource),
    Identifier(ResourceIdentifier),
}

impl Transformable {
    pub fn type_(&self) -> &str {
        match self {
            Transformable::Resource(r) => r.type_(),
            Transformable::Identifier(i) => &i.type_,
        }
    }

    pub fn into_resource(self) -> ApiResult<Resource> {
        match self {
            Transformable::Resource(r) => Ok(r),
            Transformable::Identifier(i) => Err(ApiError::internal(format!(
                "transform replaced a resource with identifier {}/{}",
                i.type_, i.id
            ))),
        }
    }

    pub fn into_identifier(self) -> ApiResult<ResourceIdentifier> {
        match self {
            Transformable::Identifier(i) => Ok(i),
            Transformable::Resource(r) => Err(ApiError::internal(format!(
                "transform replaced an identifier with a `{}` resource",
                r.type_()
            ))),
        }
    }
}

/// What a document's `data` member holds
#[derive(Debug, Clone, PartialEq)]
pub enum PrimaryData {
    Resources(ResourceSet),
    Identifiers(ResourceIdentifierSet),
    Relationship(Relationship),
}

impl PrimaryData {
    pub fn is_singular(&self) -> bool {
        match self {
            PrimaryData::Resources(set) => set.data.is_singular(),
            PrimaryData::Identifiers(set) => set.data.is_singular(),
            PrimaryData::Relationship(rel) => rel.linkage().is_singular(),
        }
    }

    fn to_json(&self, templates: &UrlTemplates) -> (Value, Option<Map<String, Value>>) {
        match self {
            PrimaryData::Resources(set) => (set.to_json(templates), None),
            PrimaryData::Identifiers(set) => (set.to_json(), None),
            PrimaryData::Relationship(rel) => {
                // A relationship document hoists the relationship's links.
                let mut rendered = rel.to_json(templates);
                let links = rendered
                    .as_object_mut()
                    .and_then(|obj| obj.remove("links"))
                    .and_then(|links| match links {
                        Value::Object(map) => Some(map),
                        _ => None,
                    });
                let data = rendered
                    .as_object_mut()
                    .and_then(|obj| obj.remove("data"))
                    .unwrap_or(Value::Null);
                (data, links)
            }
        }
    }
}

/// A JSON:API document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    primary: Option<PrimaryData>,
    included: Vec<Resource>,
    errors: Vec<ApiError>,
    meta: Option<Map<String, Value>>,
    links: Map<String, Value>,
    url_templates: UrlTemplates,
}

impl Document {
    pub fn from_primary(primary: PrimaryData) -> Self {
        Self {
            primary: Some(primary),
            ..Default::default()
        }
    }

    pub fn from_resources(data: Data<Resource>) -> Self {
        Self::from_primary(PrimaryData::Resources(ResourceSet::new(data)))
    }

    pub fn from_errors(errors: Vec<ApiError>) -> Self {
        Self {
            errors,
            ..Default::default()
        }
    }

    pub fn with_included(mut self, included: Vec<Resource>) -> DataResult<Self> {
        if included.is_empty() {
            return Ok(self);
        }
        if self.primary.is_none() {
            return Err(DataError::IncludedWithoutPrimary);
        }
        self.included = included;
        Ok(self)
    }

    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn with_url_templates(mut self, templates: UrlTemplates) -> Self {
        self.url_templates = templates;
        self
    }

    pub fn with_link(mut self, name: impl Into<String>, href: impl Into<String>) -> Self {
        self.links.insert(name.into(), Value::String(href.into()));
        self
    }

    pub fn primary(&self) -> Option<&PrimaryData> {
        self.primary.as_ref()
    }

    pub fn included(&self) -> &[Resource] {
        &self.included
    }

    pub fn errors(&self) -> &[ApiError] {
        &self.errors
    }

    pub fn meta(&self) -> Option<&Map<String, Value>> {
        self.meta.as_ref()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Apply `f` to every resource and identifier in primary and included
    /// data. Returning `None` drops the item.
    pub async fn transform<F, Fut>(self, f: F) -> ApiResult<Document>
    where
        F: Fn(Transformable) -> Fut,
        Fut: Future<Output = ApiResult<Option<Transformable>>>,
    {
        let Document {
            primary,
            included,
            errors,
            meta,
            links,
            url_templates,
        } = self;

        let primary = match primary {
            None => None,
            Some(PrimaryData::Resources(set)) => {
                let data = transform_resources(set.data, &f).await?;
                Some(PrimaryData::Resources(ResourceSet { data, ..set }))
            }
            Some(PrimaryData::Identifiers(set)) => {
                let data = transform_identifiers(set.data, &f).await?;
                Some(PrimaryData::Identifiers(ResourceIdentifierSet { data, ..set }))
            }
            Some(PrimaryData::Relationship(rel)) => {
                let linkage = transform_identifiers(rel.linkage().clone(), &f).await?;
                Some(PrimaryData::Relationship(rel.with_linkage(linkage)))
            }
        };

        let included = transform_resources(Data::of(included), &f)
            .await?
            .into_values();

        Ok(Document {
            primary,
            included,
            errors,
            meta,
            links,
            url_templates,
        })
    }

    /// Render the wire document
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        let mut links = self.links.clone();

        if !self.errors.is_empty() {
            let errors = self.errors.iter().map(ApiError::to_json).collect();
            obj.insert("errors".to_string(), Value::Array(errors));
        } else if let Some(primary) = &self.primary {
            let (data, hoisted_links) = primary.to_json(&self.url_templates);
            obj.insert("data".to_string(), data);
            for (name, href) in hoisted_links.unwrap_or_default() {
                links.entry(name).or_insert(href);
            }
            if !self.included.is_empty() {
                let included = self
                    .included
                    .iter()
                    .map(|r| r.to_json(&self.url_templates))
                    .collect();
                obj.insert("included".to_string(), Value::Array(included));
            }
        }

        if let Some(meta) = &self.meta {
            obj.insert("meta".to_string(), Value::Object(meta.clone()));
        }
        if !links.is_empty() {
            obj.insert("links".to_string(), Value::Object(links));
        }
        Value::Object(obj)
    }
}

async fn transform_resources<F, Fut>(data: Data<Resource>, f: &F) -> ApiResult<Data<Resource>>
where
    F: Fn(Transformable) -> Fut,
    Fut: Future<Output = ApiResult<Option<Transformable>>>,
{
    data.flat_map_async(|resource| async move {
        match f(Transformable::Resource(resource)).await? {
            Some(t) => Ok(Data::pure(t.into_resource()?)),
            None => Ok(Data::empty()),
        }
    })
    .await
}

async fn transform_identifiers<F, Fut>(
    data: Data<ResourceIdentifier>,
    f: &F,
) -> ApiResult<Data<ResourceIdentifier>>
where
    F: Fn(Transformable) -> Fut,
    Fut: Future<Output = ApiResult<Option<Transformable>>>,
{
    data.flat_map_async(|identifier| async move {
        match f(Transformable::Identifier(identifier)).await? {
            Some(t) => Ok(Data::pure(t.into_identifier()?)),
            None => Ok(Data::empty()),
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::relationship::RelationshipOwner;
    use serde_json::json;

    fn person(id: &str, name: &str) -> Resource {
        let mut r = Resource::new("people", Some(id.to_string())).unwrap();
        r.set_attr("name", json!(name)).unwrap();
        r
    }

    #[test]
    fn test_singular_primary() {
        let doc = Document::from_resources(Data::pure(person("1", "Alice")));
        assert_eq!(
            doc.to_json(),
            json!({"data": {"id": "1", "type": "people", "attributes": {"name": "Alice"}}})
        );
    }

    #[test]
    fn test_absent_singular_primary_is_null() {
        let doc = Document::from_resources(Data::empty());
        assert_eq!(doc.to_json(), json!({"data": null}));
    }

    #[test]
    fn test_errors_exclude_data() {
        let doc = Document::from_errors(vec![ApiError::not_found("No matching resource found")]);
        let rendered = doc.to_json();
        assert!(rendered.get("data").is_none());
        assert_eq!(rendered["errors"][0]["status"], "404");
    }

    #[test]
    fn test_included_requires_primary() {
        let err = Document::from_errors(vec![])
            .with_included(vec![person("2", "Bob")])
            .unwrap_err();
        assert_eq!(err, DataError::IncludedWithoutPrimary);

        let doc = Document::from_resources(Data::of(vec![person("1", "Alice")]))
            .with_included(vec![person("2", "Bob")])
            .unwrap();
        assert_eq!(doc.to_json()["included"][0]["id"], "2");
    }

    #[test]
    fn test_relationship_document_hoists_links() {
        let templates = UrlTemplates::new().with_type(
            "people",
            crate::data::links::TypeUrlTemplates {
                relationship: Some("/people/{ownerId}/relationships/{path}".to_string()),
                ..Default::default()
            },
        );
        let rel = Relationship::to_many(
            RelationshipOwner::new("people", Some("1".into()), "friends"),
            vec![ResourceIdentifier::new("people", "2")],
        );
        let doc = Document::from_primary(PrimaryData::Relationship(rel))
            .with_url_templates(templates)
            .with_link("self", "http://x/people/1/relationships/friends");

        let rendered = doc.to_json();
        assert_eq!(rendered["data"], json!([{"type": "people", "id": "2"}]));
        assert_eq!(
            rendered["links"]["self"],
            "http://x/people/1/relationships/friends"
        );
    }

    #[tokio::test]
    async fn test_identifier_primary() {
        let set = ResourceIdentifierSet::new(Data::of(vec![
            ResourceIdentifier::new("people", "1"),
            ResourceIdentifier::new("people", "2"),
        ]));
        let doc = Document::from_primary(PrimaryData::Identifiers(set))
            .transform(|t| async move {
                let dropped = matches!(&t, Transformable::Identifier(i) if i.id == "1");
                Ok((!dropped).then_some(t))
            })
            .await
            .unwrap();

        assert_eq!(doc.to_json()["data"], json!([{"type": "people", "id": "2"}]));
    }

    #[tokio::test]
    async fn test_transform_drops_items() {
        let doc = Document::from_resources(Data::of(vec![person("1", "Alice"), person("2", "Bob")]))
            .with_included(vec![person("3", "Carol")])
            .unwrap();

        let transformed = doc
            .transform(|t| async move {
                let dropped = matches!(&t, Transformable::Resource(r) if r.id() == Some("2"));
                if dropped {
                    Ok(None)
                } else {
                    Ok(Some(t))
                }
            })
            .await
            .unwrap();

        let rendered = transformed.to_json();
        assert_eq!(rendered["data"].as_array().unwrap().len(), 1);
        assert_eq!(rendered["included"][0]["id"], "3");
    }

    #[tokio::test]
    async fn test_transform_keeps_singular_null() {
        let doc = Document::from_resources(Data::pure(person("1", "Alice")));
        let transformed = doc.transform(|_| async { Ok(None) }).await.unwrap();
        assert_eq!(transformed.to_json(), json!({"data": null}));
    }
}
