//! # Resources and Resource Identifiers
//!
//! A `Resource` is an addressable entity: a type, an optional id (absent
//! only before creation), attributes and relationships. A
//! `ResourceIdentifier` is a `(type, id)` reference used as linkage.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::cardinality::Data;
use super::errors::{DataError, DataResult};
use super::links::UrlTemplates;
use super::relationship::{Relationship, RelationshipOwner};

/// Member names reserved at the top level of a resource object
const RESERVED_MEMBERS: [&str; 2] = ["id", "type"];

/// Keys complex attribute values may not contain
const RESERVED_NESTED_KEYS: [&str; 2] = ["relationships", "links"];

/// A `(type, id)` reference to a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceIdentifier {
    pub type_: String,
    pub id: String,
}

impl ResourceIdentifier {
    pub fn new(type_: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            type_: type_.into(),
            id: id.into(),
        }
    }

    /// Parse a resource identifier object
    pub fn from_json(value: Value) -> DataResult<Self> {
        let obj = match value {
            Value::Object(obj) => obj,
            other => {
                return Err(DataError::InvalidLinkage(format!(
                    "expected an identifier object, found {}",
                    other
                )))
            }
        };

        let type_ = match obj.get("type") {
            Some(Value::String(t)) if !t.is_empty() => t.clone(),
            _ => {
                return Err(DataError::InvalidLinkage(
                    "identifier objects need a non-empty string `type`".to_string(),
                ))
            }
        };
        let id = match obj.get("id") {
            Some(Value::String(id)) => id.clone(),
            _ => {
                return Err(DataError::InvalidLinkage(
                    "identifier objects need a string `id`".to_string(),
                ))
            }
        };

        Ok(Self { type_, id })
    }

    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".to_string(), Value::String(self.type_.clone()));
        obj.insert("id".to_string(), Value::String(self.id.clone()));
        Value::Object(obj)
    }
}

/// An addressable entity
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    type_: String,
    id: Option<String>,
    attrs: Map<String, Value>,
    relationships: BTreeMap<String, Relationship>,
    meta: Map<String, Value>,
}

impl Resource {
    /// Create a resource with no attributes or relationships
    pub fn new(type_: impl Into<String>, id: Option<String>) -> DataResult<Self> {
        let type_ = type_.into();
        if type_.is_empty() {
            return Err(DataError::InvalidType);
        }
        Ok(Self {
            type_,
            id,
            attrs: Map::new(),
            relationships: BTreeMap::new(),
            meta: Map::new(),
        })
    }

    /// Create a resource with attributes
    pub fn with_attrs(
        type_: impl Into<String>,
        id: Option<String>,
        attrs: Map<String, Value>,
    ) -> DataResult<Self> {
        let mut resource = Self::new(type_, id)?;
        for (name, value) in attrs {
            resource.set_attr(name, value)?;
        }
        Ok(resource)
    }

    pub fn type_(&self) -> &str {
        &self.type_
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Set the id; relationship owners follow
    pub fn set_id(&mut self, id: impl Into<String>) {
        let id = id.into();
        for relationship in self.relationships.values_mut() {
            relationship.owner.id = Some(id.clone());
        }
        self.id = Some(id);
    }

    /// Identifier for this resource, if it has an id
    pub fn identifier(&self) -> Option<ResourceIdentifier> {
        self.id
            .as_ref()
            .map(|id| ResourceIdentifier::new(self.type_.clone(), id.clone()))
    }

    pub fn attrs(&self) -> &Map<String, Value> {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    /// Set an attribute, enforcing the member-name invariants
    pub fn set_attr(&mut self, name: impl Into<String>, value: Value) -> DataResult<()> {
        let name = name.into();
        check_member_name(&name)?;
        if self.relationships.contains_key(&name) {
            return Err(DataError::DuplicateMember(name));
        }
        check_nested_keys(&name, &value)?;
        self.attrs.insert(name, value);
        Ok(())
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<Value> {
        self.attrs.remove(name)
    }

    pub fn relationships(&self) -> &BTreeMap<String, Relationship> {
        &self.relationships
    }

    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.get(name)
    }

    /// Set a relationship's linkage; the owner is derived from this resource
    pub fn set_relationship(
        &mut self,
        name: impl Into<String>,
        linkage: Data<ResourceIdentifier>,
    ) -> DataResult<()> {
        let name = name.into();
        check_member_name(&name)?;
        if self.attrs.contains_key(&name) {
            return Err(DataError::DuplicateMember(name));
        }
        let owner = RelationshipOwner::new(self.type_.clone(), self.id.clone(), name.clone());
        self.relationships
            .insert(name, Relationship::new(owner, linkage));
        Ok(())
    }

    pub fn remove_relationship(&mut self, name: &str) -> Option<Relationship> {
        self.relationships.remove(name)
    }

    /// Replace all relationships at once
    pub fn map_relationships(
        &mut self,
        mut f: impl FnMut(&str, Relationship) -> Relationship,
    ) {
        let taken = std::mem::take(&mut self.relationships);
        self.relationships = taken
            .into_iter()
            .map(|(name, rel)| {
                let mapped = f(&name, rel);
                (name, mapped)
            })
            .collect();
    }

    pub fn meta(&self) -> &Map<String, Value> {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.meta
    }

    /// Keep only the named attributes and relationships
    pub fn retain_fields(&mut self, fields: &[String]) {
        self.attrs.retain(|name, _| fields.iter().any(|f| f == name));
        self.relationships
            .retain(|name, _| fields.iter().any(|f| f == name));
    }

    /// Parse a resource object from a request document
    pub fn from_json(value: Value) -> DataResult<Self> {
        let mut obj = match value {
            Value::Object(obj) => obj,
            other => {
                return Err(DataError::InvalidResourceObject(format!(
                    "expected an object, found {}",
                    other
                )))
            }
        };

        let type_ = match obj.remove("type") {
            Some(Value::String(t)) if !t.is_empty() => t,
            _ => return Err(DataError::InvalidType),
        };
        let id = match obj.remove("id") {
            None => None,
            Some(Value::String(id)) => Some(id),
            Some(_) => {
                return Err(DataError::InvalidResourceObject(
                    "`id` must be a string".to_string(),
                ))
            }
        };

        let mut resource = Resource::new(type_, id)?;

        match obj.remove("attributes") {
            None | Some(Value::Null) => {}
            Some(Value::Object(attrs)) => {
                for (name, value) in attrs {
                    resource.set_attr(name, value)?;
                }
            }
            Some(_) => {
                return Err(DataError::InvalidResourceObject(
                    "`attributes` must be an object".to_string(),
                ))
            }
        }

        match obj.remove("relationships") {
            None | Some(Value::Null) => {}
            Some(Value::Object(relationships)) => {
                for (name, rel) in relationships {
                    let linkage = match rel {
                        Value::Object(mut rel_obj) => match rel_obj.remove("data") {
                            Some(data) => Data::from_json(data, ResourceIdentifier::from_json)?,
                            None => return Err(DataError::MissingRelationshipData(name)),
                        },
                        _ => return Err(DataError::MissingRelationshipData(name)),
                    };
                    resource.set_relationship(name, linkage)?;
                }
            }
            Some(_) => {
                return Err(DataError::InvalidResourceObject(
                    "`relationships` must be an object".to_string(),
                ))
            }
        }

        match obj.remove("meta") {
            None | Some(Value::Null) => {}
            Some(Value::Object(meta)) => resource.meta = meta,
            Some(_) => {
                return Err(DataError::InvalidResourceObject(
                    "`meta` must be an object".to_string(),
                ))
            }
        }

        Ok(resource)
    }

    /// Render as a JSON:API resource object
    pub fn to_json(&self, templates: &UrlTemplates) -> Value {
        let mut obj = Map::new();
        if let Some(id) = &self.id {
            obj.insert("id".to_string(), Value::String(id.clone()));
        }
        obj.insert("type".to_string(), Value::String(self.type_.clone()));

        if !self.attrs.is_empty() {
            obj.insert("attributes".to_string(), Value::Object(self.attrs.clone()));
        }

        if !self.relationships.is_empty() {
            let relationships: Map<String, Value> = self
                .relationships
                .iter()
                .map(|(name, rel)| (name.clone(), rel.to_json(templates)))
                .collect();
            obj.insert("relationships".to_string(), Value::Object(relationships));
        }

        if !self.meta.is_empty() {
            obj.insert("meta".to_string(), Value::Object(self.meta.clone()));
        }

        if let Some(link) = self
            .id
            .as_deref()
            .and_then(|id| templates.resource_self(&self.type_, id))
        {
            let mut links = Map::new();
            links.insert("self".to_string(), Value::String(link));
            obj.insert("links".to_string(), Value::Object(links));
        }

        Value::Object(obj)
    }
}

fn check_member_name(name: &str) -> DataResult<()> {
    if RESERVED_MEMBERS.contains(&name) {
        return Err(DataError::ReservedMember(name.to_string()));
    }
    Ok(())
}

fn check_nested_keys(attribute: &str, value: &Value) -> DataResult<()> {
    match value {
        Value::Object(obj) => {
            for (key, nested) in obj {
                if RESERVED_NESTED_KEYS.contains(&key.as_str()) {
                    return Err(DataError::ReservedNestedKey {
                        attribute: attribute.to_string(),
                        key: key.clone(),
                    });
                }
                check_nested_keys(attribute, nested)?;
            }
            Ok(())
        }
        Value::Array(items) => items
            .iter()
            .try_for_each(|item| check_nested_keys(attribute, item)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::links::TypeUrlTemplates;
    use serde_json::json;

    #[test]
    fn test_identifier_equality() {
        assert_eq!(
            ResourceIdentifier::new("people", "1"),
            ResourceIdentifier::new("people", "1")
        );
        assert_ne!(
            ResourceIdentifier::new("people", "1"),
            ResourceIdentifier::new("pets", "1")
        );
    }

    #[test]
    fn test_identifier_rejects_numeric_id() {
        let err = ResourceIdentifier::from_json(json!({"type": "people", "id": 1})).unwrap_err();
        assert!(matches!(err, DataError::InvalidLinkage(_)));
    }

    #[test]
    fn test_empty_type_rejected() {
        assert_eq!(Resource::new("", None).unwrap_err(), DataError::InvalidType);
    }

    #[test]
    fn test_reserved_attribute_names() {
        let mut person = Resource::new("people", Some("1".into())).unwrap();
        assert_eq!(
            person.set_attr("id", json!("2")).unwrap_err(),
            DataError::ReservedMember("id".to_string())
        );
        assert!(person.set_attr("type", json!("x")).is_err());
    }

    #[test]
    fn test_attrs_and_relationships_disjoint() {
        let mut person = Resource::new("people", Some("1".into())).unwrap();
        person.set_attr("pet", json!("rex")).unwrap();
        let err = person
            .set_relationship("pet", Data::pure(ResourceIdentifier::new("dogs", "1")))
            .unwrap_err();
        assert_eq!(err, DataError::DuplicateMember("pet".to_string()));
    }

    #[test]
    fn test_nested_reserved_keys() {
        let mut person = Resource::new("people", None).unwrap();
        let err = person
            .set_attr("address", json!({"street": "Main", "links": {}}))
            .unwrap_err();
        assert!(matches!(err, DataError::ReservedNestedKey { .. }));

        let err = person
            .set_attr("history", json!([{"relationships": 1}]))
            .unwrap_err();
        assert!(matches!(err, DataError::ReservedNestedKey { .. }));
    }

    #[test]
    fn test_from_json() {
        let resource = Resource::from_json(json!({
            "type": "people",
            "id": "1",
            "attributes": {"name": "Alice"},
            "relationships": {
                "friends": {"data": [{"type": "people", "id": "2"}]},
                "pet": {"data": null}
            }
        }))
        .unwrap();

        assert_eq!(resource.type_(), "people");
        assert_eq!(resource.id(), Some("1"));
        assert_eq!(resource.attr("name"), Some(&json!("Alice")));

        let friends = resource.relationship("friends").unwrap();
        assert_eq!(friends.owner.path, "friends");
        assert_eq!(friends.owner.id.as_deref(), Some("1"));
        assert!(!friends.linkage().is_singular());

        let pet = resource.relationship("pet").unwrap();
        assert!(pet.linkage().is_singular());
        assert!(pet.linkage().is_empty());
    }

    #[test]
    fn test_from_json_requires_relationship_data() {
        let err = Resource::from_json(json!({
            "type": "people",
            "relationships": {"friends": {"links": {}}}
        }))
        .unwrap_err();
        assert_eq!(err, DataError::MissingRelationshipData("friends".to_string()));
    }

    #[test]
    fn test_to_json_with_links() {
        let templates = UrlTemplates::new().with_type(
            "people",
            TypeUrlTemplates {
                self_link: Some("/people/{id}".to_string()),
                ..Default::default()
            },
        );
        let mut person = Resource::new("people", Some("1".into())).unwrap();
        person.set_attr("name", json!("Alice")).unwrap();

        assert_eq!(
            person.to_json(&templates),
            json!({
                "id": "1",
                "type": "people",
                "attributes": {"name": "Alice"},
                "links": {"self": "/people/1"}
            })
        );
    }

    #[test]
    fn test_set_id_updates_owners() {
        let mut person = Resource::new("people", None).unwrap();
        person
            .set_relationship("friends", Data::of(vec![]))
            .unwrap();
        person.set_id("9");
        assert_eq!(
            person.relationship("friends").unwrap().owner.id.as_deref(),
            Some("9")
        );
    }
}
