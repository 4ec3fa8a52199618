//! # Query Construction
//!
//! Maps a finalized request onto the query it asks for, together with how
//! the query's result should be rendered.
//!
//! | Method | `/t`        | `/t/id`     | `/t/id/rel`  | `/t/id/relationships/rel` |
//! |--------|-------------|-------------|--------------|---------------------------|
//! | GET    | find        | find one    | find related | find owner → relationship |
//! | POST   | create      | 405         | 405          | add to relationship       |
//! | PATCH  | bulk update | update      | 405          | replace relationship      |
//! | DELETE | bulk delete | delete      | 405          | remove from relationship  |

use std::collections::BTreeMap;

use crate::data::{Data, Resource, ResourceIdentifier, Unwrapped};
use crate::errors::{ApiError, ApiResult};
use crate::query::{
    AddToRelationshipQuery, CreateQuery, DeleteQuery, FindQuery, Query,
    RemoveFromRelationshipQuery, UpdateQuery,
};
use crate::registry::ResourceTypeRegistry;
use crate::request::{Method, ParsedParams, Request, RequestBody};

/// How a query's result becomes a response
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Shape {
    /// 200 with the resulting resources
    Resources,
    /// 201 with the created resources
    Created,
    /// 200 with one relationship of the single found owner
    Relationship(String),
    /// 200 with the resources the found owner links to
    Related {
        relationship: String,
        select: Option<BTreeMap<String, Vec<String>>>,
        populates: Vec<String>,
    },
    /// 204
    NoContent,
}

/// A query plus its rendering
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Plan {
    pub query: Query,
    pub shape: Shape,
}

impl Plan {
    fn new(query: Query, shape: Shape) -> Self {
        Self { query, shape }
    }
}

/// Build the plan for a finalized request
pub(crate) fn make_query(
    request: &Request,
    params: &ParsedParams,
    body: Option<RequestBody>,
    registry: &ResourceTypeRegistry,
) -> ApiResult<Plan> {
    match request.method {
        Method::Get => make_get(request, params, body, registry),
        Method::Post => make_post(request, require_body(body)?, registry),
        Method::Patch => make_patch(request, require_body(body)?, registry),
        Method::Delete => make_delete(request, body, registry),
        Method::Other(ref m) => Err(ApiError::method_not_allowed("Method not supported")
            .with_detail(format!("The method {} is not supported", m))),
    }
}

fn require_body(body: Option<RequestBody>) -> ApiResult<RequestBody> {
    body.ok_or_else(|| {
        ApiError::bad_request("Request body required")
            .with_detail("This request requires a JSON:API document with a `data` member")
    })
}

fn require_id(request: &Request) -> ApiResult<&str> {
    request.id.as_deref().ok_or_else(|| {
        ApiError::bad_request("Missing resource id")
            .with_detail("Relationship endpoints need the owner's id")
    })
}

fn not_allowed(request: &Request) -> ApiError {
    ApiError::method_not_allowed("Method not allowed").with_detail(format!(
        "{} is not allowed on {}",
        request.method, request.uri
    ))
}

/// Records of a subtype are reachable through their ancestors' endpoints
fn search_types(request: &Request, registry: &ResourceTypeRegistry) -> Vec<String> {
    registry.type_and_descendants(&request.type_)
}

fn non_empty(records: &Data<Resource>) -> ApiResult<()> {
    if records.is_empty() {
        return Err(ApiError::bad_request("Missing resource data")
            .with_detail("The `data` member must contain at least one resource")
            .with_source_pointer("/data"));
    }
    Ok(())
}

fn find_query(request: &Request, params: &ParsedParams, registry: &ResourceTypeRegistry) -> FindQuery {
    let populates = params
        .include
        .clone()
        .unwrap_or_else(|| registry.default_includes(&request.type_).to_vec());

    FindQuery::new(request.type_.clone())
        .with_search_types(search_types(request, registry))
        .with_filters(params.filter.clone().unwrap_or_default())
        .with_sort(params.sort.clone().unwrap_or_default())
        .with_offset(params.offset())
        .with_limit(params.limit())
        .with_select(params.fields.clone())
        .with_populates(populates)
}

fn make_get(
    request: &Request,
    params: &ParsedParams,
    body: Option<RequestBody>,
    registry: &ResourceTypeRegistry,
) -> ApiResult<Plan> {
    if body.is_some() {
        return Err(ApiError::bad_request("Unexpected request body")
            .with_detail("GET requests must not have a body"));
    }

    match (&request.relationship, request.about_relationship) {
        (Some(relationship), true) => {
            let owner = FindQuery::new(request.type_.clone())
                .with_search_types(search_types(request, registry))
                .with_id(require_id(request)?);
            Ok(Plan::new(
                Query::Find(owner),
                Shape::Relationship(relationship.clone()),
            ))
        }
        (Some(relationship), false) => {
            let owner = FindQuery::new(request.type_.clone())
                .with_search_types(search_types(request, registry))
                .with_id(require_id(request)?);
            Ok(Plan::new(
                Query::Find(owner),
                Shape::Related {
                    relationship: relationship.clone(),
                    select: params.fields.clone(),
                    populates: params.include.clone().unwrap_or_default(),
                },
            ))
        }
        (None, _) => {
            let query = find_query(request, params, registry);
            let query = match &request.id {
                Some(id) => query.with_id(id.clone()),
                None => query,
            };
            Ok(Plan::new(Query::Find(query), Shape::Resources))
        }
    }
}

fn make_post(
    request: &Request,
    body: RequestBody,
    registry: &ResourceTypeRegistry,
) -> ApiResult<Plan> {
    match (&request.relationship, request.about_relationship, &request.id) {
        (Some(relationship), true, _) => {
            let linkage = plural_linkage(body, "POST")?;
            Ok(Plan::new(
                Query::AddToRelationship(AddToRelationshipQuery::new(
                    request.type_.clone(),
                    require_id(request)?,
                    relationship.clone(),
                    linkage,
                )
                .with_search_types(search_types(request, registry))),
                Shape::NoContent,
            ))
        }
        (Some(_), false, _) | (None, _, Some(_)) => Err(not_allowed(request)),
        (None, _, None) => {
            let records = resources(body)?;
            non_empty(&records)?;
            if records.some(|r| r.id().is_some()) {
                return Err(ApiError::forbidden("Client-generated ids are not supported")
                    .with_code("client_generated_id")
                    .with_detail("Remove the `id` member; the server assigns ids on creation")
                    .with_source_pointer("/data/id"));
            }
            Ok(Plan::new(
                Query::Create(CreateQuery::new(request.type_.clone(), records)),
                Shape::Created,
            ))
        }
    }
}

fn make_patch(
    request: &Request,
    body: RequestBody,
    registry: &ResourceTypeRegistry,
) -> ApiResult<Plan> {
    match (&request.relationship, request.about_relationship, &request.id) {
        (Some(relationship), true, _) => {
            let linkage = match body {
                RequestBody::Identifiers(linkage) => linkage,
                RequestBody::Resources(_) => return Err(expected_linkage()),
            };
            let mut owner = Resource::new(request.type_.clone(), Some(require_id(request)?.to_string()))?;
            owner.set_relationship(relationship.clone(), linkage)?;
            Ok(Plan::new(
                Query::Update(
                    UpdateQuery::new(request.type_.clone(), Data::pure(owner))
                        .with_search_types(search_types(request, registry)),
                ),
                Shape::NoContent,
            ))
        }
        (Some(_), false, _) => Err(not_allowed(request)),
        (None, _, Some(id)) => {
            let records = resources(body)?;
            let matches = records.is_singular()
                && records.len() == 1
                && records.every(|r| r.id() == Some(id.as_str()));
            if !matches {
                return Err(ApiError::bad_request("Invalid resource id")
                    .with_detail(format!(
                        "The body must contain a single resource whose id is `{}`",
                        id
                    ))
                    .with_source_pointer("/data/id"));
            }
            Ok(Plan::new(
                Query::Update(
                    UpdateQuery::new(request.type_.clone(), records)
                        .with_search_types(search_types(request, registry)),
                ),
                Shape::Resources,
            ))
        }
        (None, _, None) => {
            let records = resources(body)?;
            non_empty(&records)?;
            if !records.every(|r| r.id().is_some()) {
                return Err(ApiError::bad_request("Missing resource id")
                    .with_detail("Every resource in a bulk update needs an id")
                    .with_source_pointer("/data"));
            }
            Ok(Plan::new(
                Query::Update(
                    UpdateQuery::new(request.type_.clone(), records)
                        .with_search_types(search_types(request, registry)),
                ),
                Shape::Resources,
            ))
        }
    }
}

fn make_delete(
    request: &Request,
    body: Option<RequestBody>,
    registry: &ResourceTypeRegistry,
) -> ApiResult<Plan> {
    match (&request.relationship, request.about_relationship, &request.id) {
        (Some(relationship), true, _) => {
            let linkage = plural_linkage(require_body(body)?, "DELETE")?;
            Ok(Plan::new(
                Query::RemoveFromRelationship(RemoveFromRelationshipQuery::new(
                    request.type_.clone(),
                    require_id(request)?,
                    relationship.clone(),
                    linkage,
                )
                .with_search_types(search_types(request, registry))),
                Shape::NoContent,
            ))
        }
        (Some(_), false, _) => Err(not_allowed(request)),
        (None, _, Some(id)) => Ok(Plan::new(
            Query::Delete(
                DeleteQuery::new(request.type_.clone(), id.clone())
                    .with_search_types(search_types(request, registry)),
            ),
            Shape::NoContent,
        )),
        (None, _, None) => {
            let linkage = match body {
                Some(RequestBody::Identifiers(linkage)) => linkage.into_values(),
                _ => {
                    return Err(ApiError::bad_request("Request body required").with_detail(
                        "Deleting from a collection needs a body listing the resources to delete",
                    ))
                }
            };
            let ids = linkage.into_iter().map(|i| i.id).collect();
            Ok(Plan::new(
                Query::Delete(
                    DeleteQuery::many(request.type_.clone(), ids)
                        .with_search_types(search_types(request, registry)),
                ),
                Shape::NoContent,
            ))
        }
    }
}

fn resources(body: RequestBody) -> ApiResult<Data<Resource>> {
    match body {
        RequestBody::Resources(records) => Ok(records),
        RequestBody::Identifiers(_) => Err(ApiError::bad_request("Invalid request body")
            .with_detail("Expected resource objects")),
    }
}

fn expected_linkage() -> ApiError {
    ApiError::bad_request("Invalid linkage").with_detail("Expected resource identifier objects")
}

fn plural_linkage(body: RequestBody, method: &str) -> ApiResult<Vec<ResourceIdentifier>> {
    let linkage = match body {
        RequestBody::Identifiers(linkage) => linkage,
        RequestBody::Resources(_) => return Err(expected_linkage()),
    };
    match linkage.into_unwrapped() {
        Unwrapped::Plural(ids) => Ok(ids),
        Unwrapped::Singular(_) => Err(ApiError::bad_request("Invalid linkage")
            .with_detail(format!(
                "{} to a relationship endpoint needs an array of identifiers",
                method
            ))
            .with_source_pointer("/data")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::memory::MemoryAdapter;
    use crate::registry::ResourceTypeDescription;
    use serde_json::json;

    fn registry() -> ResourceTypeRegistry {
        ResourceTypeRegistry::builder()
            .register(
                "people",
                ResourceTypeDescription::new()
                    .with_adapter(Arc::new(MemoryAdapter::new()))
                    .with_default_includes(vec!["pets".to_string()]),
            )
            .build()
            .unwrap()
    }

    fn plan(request: &Request, body: Option<serde_json::Value>) -> ApiResult<Plan> {
        let body = body
            .map(|b| RequestBody::parse(b, request.expects_linkage()))
            .transpose()?;
        make_query(request, &ParsedParams::default(), body, &registry())
    }

    #[test]
    fn test_get_collection_uses_default_includes() {
        let req = Request::new(Method::Get, "/people", "people");
        let plan = plan(&req, None).unwrap();
        match plan.query {
            Query::Find(q) => {
                assert_eq!(q.populates(), &["pets".to_string()]);
                assert!(!q.is_singular());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_get_with_body_rejected() {
        let req = Request::new(Method::Get, "/people", "people");
        assert_eq!(plan(&req, Some(json!({"data": null}))).unwrap_err().status, 400);
    }

    #[test]
    fn test_post_requires_body() {
        let req = Request::new(Method::Post, "/people", "people");
        assert_eq!(plan(&req, None).unwrap_err().status, 400);
    }

    #[test]
    fn test_post_to_id_not_allowed() {
        let req = Request::new(Method::Post, "/people/1", "people").with_id("1");
        let err = plan(&req, Some(json!({"data": {"type": "people"}}))).unwrap_err();
        assert_eq!(err.status, 405);
    }

    #[test]
    fn test_client_ids_forbidden() {
        let req = Request::new(Method::Post, "/people", "people");
        let err = plan(&req, Some(json!({"data": {"type": "people", "id": "9"}}))).unwrap_err();
        assert_eq!(err.status, 403);
    }

    #[test]
    fn test_post_without_resources_rejected() {
        let req = Request::new(Method::Post, "/people", "people");
        for body in [json!({"data": null}), json!({"data": []})] {
            let err = plan(&req, Some(body)).unwrap_err();
            assert_eq!(err.status, 400);
            assert_eq!(err.source.as_ref().and_then(|s| s.pointer.as_deref()), Some("/data"));
        }
    }

    #[test]
    fn test_empty_bulk_patch_rejected() {
        let req = Request::new(Method::Patch, "/people", "people");
        let err = plan(&req, Some(json!({"data": []}))).unwrap_err();
        assert_eq!(err.status, 400);
        assert_eq!(err.source.as_ref().and_then(|s| s.pointer.as_deref()), Some("/data"));
    }

    #[test]
    fn test_patch_id_mismatch() {
        let req = Request::new(Method::Patch, "/people/1", "people").with_id("1");
        let err = plan(&req, Some(json!({"data": {"type": "people", "id": "2"}}))).unwrap_err();
        assert_eq!(err.status, 400);
    }

    #[test]
    fn test_bulk_patch_needs_ids() {
        let req = Request::new(Method::Patch, "/people", "people");
        let err = plan(
            &req,
            Some(json!({"data": [{"type": "people", "id": "1"}, {"type": "people"}]})),
        )
        .unwrap_err();
        assert_eq!(err.status, 400);
    }

    #[test]
    fn test_relationship_patch_becomes_update() {
        let req = Request::new(Method::Patch, "/people/1/relationships/pets", "people")
            .with_id("1")
            .with_relationship("pets");
        let plan = plan(&req, Some(json!({"data": [{"type": "dogs", "id": "7"}]}))).unwrap();

        assert_eq!(plan.shape, Shape::NoContent);
        match plan.query {
            Query::Update(q) => {
                let owner = &q.patch().values()[0];
                assert_eq!(owner.id(), Some("1"));
                assert_eq!(owner.relationship("pets").unwrap().linkage().len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_relationship_post_needs_array() {
        let req = Request::new(Method::Post, "/people/1/relationships/pets", "people")
            .with_id("1")
            .with_relationship("pets");
        let err = plan(&req, Some(json!({"data": {"type": "dogs", "id": "7"}}))).unwrap_err();
        assert_eq!(err.status, 400);
    }

    #[test]
    fn test_collection_delete_needs_body() {
        let req = Request::new(Method::Delete, "/people", "people");
        assert_eq!(plan(&req, None).unwrap_err().status, 400);

        let plan = plan(&req, Some(json!({"data": [{"type": "people", "id": "1"}]}))).unwrap();
        match plan.query {
            Query::Delete(q) => assert_eq!(q.ids(), &["1".to_string()]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_related_get() {
        let req = Request::new(Method::Get, "/people/1/pets", "people")
            .with_id("1")
            .with_related("pets");
        let plan = plan(&req, None).unwrap();
        assert!(matches!(plan.shape, Shape::Related { ref relationship, .. } if relationship == "pets"));
    }
}
