//! # Memory Adapter
//!
//! Keeps resources in process memory, grouped by type. Useful for tests,
//! demos and prototyping an API before a real backend exists.
//!
//! Find pipeline: ids → filters → sort → paginate → includes → fieldsets.
//!
//! Writes run against a copy of the store that replaces it only when the
//! whole query succeeds, so a failing bulk write leaves nothing behind.

pub mod matcher;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;

use uuid::Uuid;

use crate::data::{Data, Resource, ResourceIdentifier, Unwrapped};
use crate::errors::{ApiError, ApiResult};
use crate::query::{
    Adapter, AdapterFuture, AddToRelationshipQuery, CreateQuery, DeleteQuery, FindQuery,
    FindResult, RelationshipChange, RelationshipTarget, RemoveFromRelationshipQuery, UpdateQuery,
};

use matcher::{apply_ordering, matches_all};

type Store = HashMap<String, Vec<Resource>>;

/// In-memory adapter
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    /// Data store: type -> resources in insertion order
    data: RwLock<Store>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an adapter holding `resources`
    pub fn with_resources(resources: impl IntoIterator<Item = Resource>) -> ApiResult<Self> {
        let adapter = Self::new();
        {
            let mut store = adapter.write()?;
            for mut resource in resources {
                if resource.id().is_none() {
                    resource.set_id(Uuid::new_v4().to_string());
                }
                store
                    .entry(resource.type_().to_string())
                    .or_default()
                    .push(resource);
            }
        }
        Ok(adapter)
    }

    /// Number of stored resources of one type
    pub fn count(&self, type_name: &str) -> ApiResult<usize> {
        Ok(self.read()?.get(type_name).map(Vec::len).unwrap_or(0))
    }

    fn read(&self) -> ApiResult<std::sync::RwLockReadGuard<'_, Store>> {
        self.data
            .read()
            .map_err(|_| ApiError::internal("Lock poisoned"))
    }

    fn write(&self) -> ApiResult<std::sync::RwLockWriteGuard<'_, Store>> {
        self.data
            .write()
            .map_err(|_| ApiError::internal("Lock poisoned"))
    }

    /// Run `op` on a draft of the store and keep the draft only on success
    fn transact<T>(&self, op: impl FnOnce(&mut Store) -> ApiResult<T>) -> ApiResult<T> {
        let mut store = self.write()?;
        let mut draft = store.clone();
        let out = op(&mut draft)?;
        *store = draft;
        Ok(out)
    }

    fn find_now(&self, query: &FindQuery) -> ApiResult<FindResult> {
        let store = self.read()?;
        let mut records: Vec<Resource> = query
            .search_types()
            .iter()
            .filter_map(|t| store.get(t))
            .flat_map(|records| records.iter().cloned())
            .collect();

        if let Some(ids) = query.ids() {
            records.retain(|r| r.id().map(|id| ids.iter().any(|i| i == id)).unwrap_or(false));
        }

        records.retain(|r| matches_all(query.filters(), r));
        apply_ordering(&mut records, query.sort());

        let collection_size = records.len() as u64;
        let records: Vec<Resource> = records
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit().map(|l| l as usize).unwrap_or(usize::MAX))
            .collect();

        let mut included = collect_included(&store, &records, query.populates());

        let mut records = records;
        for resource in records.iter_mut().chain(included.iter_mut()) {
            if let Some(fields) = query.select_for(resource.type_()) {
                resource.retain_fields(fields);
            }
        }

        let primary = if query.is_singular() {
            Data::from_option(records.into_iter().next())
        } else {
            Data::of(records)
        };

        let mut result = FindResult::new(primary).with_included(included);
        if !query.is_singular() {
            result = result.with_collection_size(collection_size);
        }
        Ok(result)
    }

    fn create_now(&self, query: CreateQuery) -> ApiResult<Data<Resource>> {
        let type_name = query.type_().to_string();

        self.transact(|store| {
            query.into_records().try_map(|mut resource| {
                let records = store.entry(resource.type_().to_string()).or_default();
                match resource.id() {
                    Some(id) if records.iter().any(|r| r.id() == Some(id)) => {
                        return Err(ApiError::conflict("Resource already exists").with_detail(
                            format!("A `{}` resource with id `{}` already exists", type_name, id),
                        ));
                    }
                    Some(_) => {}
                    None => resource.set_id(Uuid::new_v4().to_string()),
                }
                records.push(resource.clone());
                Ok(resource)
            })
        })
    }

    fn update_now(&self, query: UpdateQuery) -> ApiResult<Data<Resource>> {
        let endpoint_type = query.type_().to_string();
        let search_types = query.search_types().to_vec();

        self.transact(|store| {
            query.into_patch().try_map(|patch| {
                let id = patch
                    .id()
                    .ok_or_else(|| ApiError::bad_request("Resources to update must have an id"))?
                    .to_string();
                // a subtype named in the body only matches records of that subtype
                let record = if patch.type_() == endpoint_type {
                    find_mut(store, &endpoint_type, &search_types, &id)?
                } else {
                    find_mut(store, patch.type_(), &[patch.type_().to_string()], &id)?
                };

                for (name, value) in patch.attrs() {
                    record.set_attr(name.clone(), value.clone())?;
                }
                for (name, relationship) in patch.relationships() {
                    record.set_relationship(name.clone(), relationship.linkage().clone())?;
                }
                for (key, value) in patch.meta() {
                    record.meta_mut().insert(key.clone(), value.clone());
                }
                Ok(record.clone())
            })
        })
    }

    fn delete_now(&self, query: DeleteQuery) -> ApiResult<Data<Resource>> {
        let removed = self.transact(|store| {
            query
                .ids()
                .iter()
                .map(|id| {
                    let (bucket, idx) = query
                        .search_types()
                        .iter()
                        .find_map(|t| position(store, t, id).map(|idx| (t, idx)))
                        .ok_or_else(|| not_found(query.type_(), id))?;
                    store
                        .get_mut(bucket)
                        .map(|records| records.remove(idx))
                        .ok_or_else(|| not_found(query.type_(), id))
                })
                .collect::<ApiResult<Vec<_>>>()
        })?;

        Ok(if query.is_singular() {
            Data::from_option(removed.into_iter().next())
        } else {
            Data::of(removed)
        })
    }

    fn change_relationship(
        &self,
        target: &RelationshipTarget,
        change: impl FnOnce(Vec<ResourceIdentifier>) -> Vec<ResourceIdentifier>,
    ) -> ApiResult<RelationshipChange> {
        self.transact(|store| {
            let record = find_mut(store, &target.type_, &target.search_types, &target.id)?;
            replace_members(record, &target.relationship_name, change)
        })
    }
}

fn replace_members(
    record: &mut Resource,
    relationship_name: &str,
    change: impl FnOnce(Vec<ResourceIdentifier>) -> Vec<ResourceIdentifier>,
) -> ApiResult<RelationshipChange> {
    let before = record
        .relationship(relationship_name)
        .map(|r| r.linkage().clone())
        .unwrap_or_else(|| Data::of(Vec::new()));

    let current = match before.clone().into_unwrapped() {
        Unwrapped::Plural(ids) => ids,
        Unwrapped::Singular(_) => {
            return Err(ApiError::bad_request("Invalid relationship").with_detail(format!(
                "`{}` is a to-one relationship; replace it with PATCH instead",
                relationship_name
            )))
        }
    };

    let after = Data::of(change(current));
    record.set_relationship(relationship_name, after.clone())?;

    Ok(RelationshipChange { before, after })
}

fn not_found(type_name: &str, id: &str) -> ApiError {
    ApiError::not_found("No matching resource found")
        .with_detail(format!("No `{}` resource with id `{}`", type_name, id))
}

fn position(store: &Store, type_name: &str, id: &str) -> Option<usize> {
    store.get(type_name)?.iter().position(|r| r.id() == Some(id))
}

/// First record with `id` in any of `search_types`
fn find_mut<'a>(
    store: &'a mut Store,
    type_name: &str,
    search_types: &[String],
    id: &str,
) -> ApiResult<&'a mut Resource> {
    let (bucket, idx) = search_types
        .iter()
        .find_map(|t| position(store, t, id).map(|idx| (t, idx)))
        .ok_or_else(|| not_found(type_name, id))?;
    store
        .get_mut(bucket)
        .and_then(|records| records.get_mut(idx))
        .ok_or_else(|| not_found(type_name, id))
}

fn find_ref<'a>(store: &'a Store, identifier: &ResourceIdentifier) -> Option<&'a Resource> {
    store
        .get(&identifier.type_)
        .and_then(|records| records.iter().find(|r| r.id() == Some(identifier.id.as_str())))
}

/// Follow each dotted include path, one relationship per segment
fn collect_included(store: &Store, primary: &[Resource], paths: &[String]) -> Vec<Resource> {
    let mut seen: BTreeSet<ResourceIdentifier> =
        primary.iter().filter_map(Resource::identifier).collect();
    let mut included: BTreeMap<ResourceIdentifier, Resource> = BTreeMap::new();
    let mut order = Vec::new();

    for path in paths {
        let mut frontier: Vec<Resource> = primary.to_vec();
        for segment in path.split('.') {
            let targets: Vec<ResourceIdentifier> = frontier
                .iter()
                .filter_map(|r| r.relationship(segment))
                .flat_map(|rel| rel.linkage().values().to_vec())
                .collect();

            frontier = targets
                .iter()
                .filter_map(|target| find_ref(store, target).cloned())
                .collect();

            for resource in &frontier {
                if let Some(identifier) = resource.identifier() {
                    if seen.insert(identifier.clone()) {
                        order.push(identifier.clone());
                        included.insert(identifier, resource.clone());
                    }
                }
            }
        }
    }

    order
        .into_iter()
        .filter_map(|identifier| included.remove(&identifier))
        .collect()
}

impl Adapter for MemoryAdapter {
    fn find(&self, query: FindQuery) -> AdapterFuture<'_, FindResult> {
        Box::pin(async move { self.find_now(&query) })
    }

    fn create(&self, query: CreateQuery) -> AdapterFuture<'_, Data<Resource>> {
        Box::pin(async move { self.create_now(query) })
    }

    fn update(&self, query: UpdateQuery) -> AdapterFuture<'_, Data<Resource>> {
        Box::pin(async move { self.update_now(query) })
    }

    fn delete(&self, query: DeleteQuery) -> AdapterFuture<'_, Data<Resource>> {
        Box::pin(async move { self.delete_now(query) })
    }

    fn add_to_relationship(
        &self,
        query: AddToRelationshipQuery,
    ) -> AdapterFuture<'_, RelationshipChange> {
        Box::pin(async move {
            let additions = query.linkage().to_vec();
            self.change_relationship(query.target(), |mut ids| {
                for identifier in additions {
                    if !ids.contains(&identifier) {
                        ids.push(identifier);
                    }
                }
                ids
            })
        })
    }

    fn remove_from_relationship(
        &self,
        query: RemoveFromRelationshipQuery,
    ) -> AdapterFuture<'_, RelationshipChange> {
        Box::pin(async move {
            let removals = query.linkage().to_vec();
            self.change_relationship(query.target(), |mut ids| {
                ids.retain(|identifier| !removals.contains(identifier));
                ids
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{ComparisonOperator, FieldConstraint};
    use crate::request::SortField;
    use serde_json::json;

    fn person(id: &str, name: &str, age: u64) -> Resource {
        let mut r = Resource::new("people", Some(id.to_string())).unwrap();
        r.set_attr("name", json!(name)).unwrap();
        r.set_attr("age", json!(age)).unwrap();
        r
    }

    fn seeded() -> MemoryAdapter {
        let mut ann = person("1", "Ann", 30);
        ann.set_relationship("pet", Data::pure(ResourceIdentifier::new("dogs", "7")))
            .unwrap();
        let mut rex = Resource::new("dogs", Some("7".to_string())).unwrap();
        rex.set_attr("name", json!("Rex")).unwrap();

        MemoryAdapter::with_resources(vec![
            ann,
            person("2", "Bob", 17),
            person("3", "Cid", 70),
            rex,
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let adapter = seeded();
        let result = adapter.find(FindQuery::new("people").with_id("2")).await.unwrap();
        assert!(result.primary.is_singular());
        assert_eq!(result.primary.values()[0].attr("name"), Some(&json!("Bob")));
        assert_eq!(result.collection_size, None);

        let missing = adapter.find(FindQuery::new("people").with_id("9")).await.unwrap();
        assert!(missing.primary.is_singular());
        assert!(missing.primary.is_empty());
    }

    #[tokio::test]
    async fn test_find_filter_sort_paginate() {
        let adapter = seeded();
        let query = FindQuery::new("people")
            .with_filters(vec![FieldConstraint::new(
                "age",
                ComparisonOperator::Gte,
                json!(18),
            )
            .into()])
            .with_sort(vec![SortField::desc("age")])
            .with_limit(Some(1));

        let result = adapter.find(query).await.unwrap();
        assert_eq!(result.collection_size, Some(2));
        assert_eq!(result.primary.len(), 1);
        assert_eq!(result.primary.values()[0].id(), Some("3"));
    }

    #[tokio::test]
    async fn test_find_includes_and_fields() {
        let adapter = seeded();
        let mut select = BTreeMap::new();
        select.insert("people".to_string(), vec!["name".to_string()]);

        let result = adapter
            .find(
                FindQuery::new("people")
                    .with_id("1")
                    .with_populates(vec!["pet".to_string()])
                    .with_select(Some(select)),
            )
            .await
            .unwrap();

        assert_eq!(result.included.len(), 1);
        assert_eq!(result.included[0].type_(), "dogs");
        let ann = &result.primary.values()[0];
        assert!(ann.attr("age").is_none());
        assert!(ann.relationship("pet").is_none());
    }

    #[tokio::test]
    async fn test_create_assigns_ids() {
        let adapter = MemoryAdapter::new();
        let mut new_person = Resource::new("people", None).unwrap();
        new_person.set_attr("name", json!("Dee")).unwrap();

        let created = adapter
            .create(CreateQuery::new("people", Data::pure(new_person)))
            .await
            .unwrap();
        assert!(created.is_singular());
        assert!(created.values()[0].id().is_some());
        assert_eq!(adapter.count("people").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_conflict() {
        let adapter = seeded();
        let err = adapter
            .create(CreateQuery::new("people", Data::pure(person("1", "X", 1))))
            .await
            .unwrap_err();
        assert_eq!(err.status, 409);
    }

    #[tokio::test]
    async fn test_update_merges() {
        let adapter = seeded();
        let mut patch = Resource::new("people", Some("1".to_string())).unwrap();
        patch.set_attr("age", json!(31)).unwrap();

        let updated = adapter
            .update(UpdateQuery::new("people", Data::pure(patch)))
            .await
            .unwrap();
        let ann = &updated.values()[0];
        assert_eq!(ann.attr("age"), Some(&json!(31)));
        assert_eq!(ann.attr("name"), Some(&json!("Ann")));
    }

    #[tokio::test]
    async fn test_update_missing_is_404() {
        let adapter = seeded();
        let patch = Resource::new("people", Some("42".to_string())).unwrap();
        let err = adapter
            .update(UpdateQuery::new("people", Data::pure(patch)))
            .await
            .unwrap_err();
        assert_eq!(err.status, 404);
    }

    #[tokio::test]
    async fn test_delete() {
        let adapter = seeded();
        adapter.delete(DeleteQuery::new("people", "2")).await.unwrap();
        assert_eq!(adapter.count("people").unwrap(), 2);

        let err = adapter.delete(DeleteQuery::new("people", "2")).await.unwrap_err();
        assert_eq!(err.status, 404);
    }

    #[tokio::test]
    async fn test_failed_bulk_delete_keeps_everything() {
        let adapter = seeded();
        let err = adapter
            .delete(DeleteQuery::many("people", vec!["1".into(), "missing".into()]))
            .await
            .unwrap_err();
        assert_eq!(err.status, 404);
        assert_eq!(adapter.count("people").unwrap(), 3);
    }

    #[tokio::test]
    async fn test_failed_bulk_create_keeps_nothing() {
        let adapter = seeded();
        let records = Data::of(vec![person("4", "Dee", 40), person("2", "Bob", 17)]);
        let err = adapter
            .create(CreateQuery::new("people", records))
            .await
            .unwrap_err();
        assert_eq!(err.status, 409);
        assert_eq!(adapter.count("people").unwrap(), 3);
    }

    #[tokio::test]
    async fn test_failed_bulk_update_changes_nothing() {
        let adapter = seeded();
        let mut first = Resource::new("people", Some("1".to_string())).unwrap();
        first.set_attr("age", json!(99)).unwrap();
        let second = Resource::new("people", Some("42".to_string())).unwrap();

        let err = adapter
            .update(UpdateQuery::new("people", Data::of(vec![first, second])))
            .await
            .unwrap_err();
        assert_eq!(err.status, 404);

        let ann = adapter.find(FindQuery::new("people").with_id("1")).await.unwrap();
        assert_eq!(ann.primary.values()[0].attr("age"), Some(&json!(30)));
    }

    #[tokio::test]
    async fn test_parent_type_reaches_subtype_records() {
        let adapter = seeded();
        let animals = || vec!["animals".to_string(), "dogs".to_string()];

        let found = adapter
            .find(FindQuery::new("animals").with_search_types(animals()).with_id("7"))
            .await
            .unwrap();
        assert_eq!(found.primary.values()[0].type_(), "dogs");

        let all = adapter
            .find(FindQuery::new("animals").with_search_types(animals()))
            .await
            .unwrap();
        assert_eq!(all.collection_size, Some(1));

        let tag = ResourceIdentifier::new("tags", "a");
        let change = adapter
            .add_to_relationship(
                AddToRelationshipQuery::new("animals", "7", "tags", vec![tag])
                    .with_search_types(animals()),
            )
            .await
            .unwrap();
        assert_eq!(change.after.len(), 1);

        adapter
            .delete(DeleteQuery::new("animals", "7").with_search_types(animals()))
            .await
            .unwrap();
        assert_eq!(adapter.count("dogs").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_own_type_only_by_default() {
        let adapter = seeded();
        let err = adapter.delete(DeleteQuery::new("animals", "7")).await.unwrap_err();
        assert_eq!(err.status, 404);
        assert_eq!(adapter.count("dogs").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_relationship_membership() {
        let adapter = seeded();
        let tag = |id: &str| ResourceIdentifier::new("tags", id);

        let change = adapter
            .add_to_relationship(AddToRelationshipQuery::new(
                "people",
                "2",
                "tags",
                vec![tag("a"), tag("b")],
            ))
            .await
            .unwrap();
        assert!(change.before.is_empty());
        assert_eq!(change.after.len(), 2);

        let change = adapter
            .remove_from_relationship(RemoveFromRelationshipQuery::new(
                "people",
                "2",
                "tags",
                vec![tag("a")],
            ))
            .await
            .unwrap();
        assert_eq!(change.after.values(), &[tag("b")]);
    }

    #[tokio::test]
    async fn test_to_one_membership_rejected() {
        let adapter = seeded();
        let err = adapter
            .add_to_relationship(AddToRelationshipQuery::new(
                "people",
                "1",
                "pet",
                vec![ResourceIdentifier::new("dogs", "8")],
            ))
            .await
            .unwrap_err();
        assert_eq!(err.status, 400);
    }
}
