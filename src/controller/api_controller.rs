//! # API Controller
//!
//! Runs one request through the pipeline:
//!
//! ```text
//! negotiate → finalize request → beforeSave → build query
//!     → (caller transform) → adapter → beforeRender → document → response
//! ```
//!
//! Any error before the response is built is caught once, turned into an
//! error document, and formatted like any other result. A failed
//! negotiation yields a response with no body at all.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use serde_json::{json, Map};
use tracing::{debug, error, info_span, warn, Instrument};

use crate::data::{Data, Document, PrimaryData, Resource, ResourceIdentifier, Unwrapped};
use crate::errors::{ApiError, ApiResult};
use crate::query::{FindQuery, Query};
use crate::registry::{ResourceTypeRegistry, TransformContext, TransformPhase};
use crate::request::negotiation::{check_content_type, negotiate};
use crate::request::params::ParamOptions;
use crate::request::{Method, ParsedParams, Request, RequestBody, RequestError};

use super::config::ControllerConfig;
use super::make_query::{make_query, Shape};
use super::response::{format_response, HttpResponse, ResponseContents};

/// Entry point for handling requests
#[derive(Debug, Clone)]
pub struct ApiController {
    registry: Arc<ResourceTypeRegistry>,
    config: ControllerConfig,
}

impl ApiController {
    pub fn new(registry: Arc<ResourceTypeRegistry>) -> Self {
        Self::with_config(registry, ControllerConfig::default())
    }

    pub fn with_config(registry: Arc<ResourceTypeRegistry>, config: ControllerConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<ResourceTypeRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Pick the response media type for an `Accept` header
    pub fn negotiate(&self, accepts: Option<&str>) -> ApiResult<&'static str> {
        Ok(negotiate(accepts, self.config.json_fallback)?)
    }

    /// Handle a request
    pub async fn handle(&self, request: Request) -> HttpResponse {
        self.handle_with(request, |query| query).await
    }

    /// Handle a request, letting the caller rewrite the query before it runs
    pub async fn handle_with<F>(&self, request: Request, query_transform: F) -> HttpResponse
    where
        F: FnOnce(Query) -> Query + Send,
    {
        let span = info_span!(
            "api_request",
            method = %request.method,
            uri = %request.uri,
            resource_type = %request.type_,
        );

        async move {
            let media_type = match self.negotiate(request.accepts.as_deref()) {
                Ok(media_type) => media_type,
                Err(err) => {
                    log_error(&err);
                    let contents = ResponseContents::from_document(Document::from_errors(vec![err]));
                    return format_response(contents, None);
                }
            };

            let request = Arc::new(request);
            let contents = match self.run(request, query_transform).await {
                Ok(contents) => contents,
                Err(err) => {
                    log_error(&err);
                    ResponseContents::from_document(Document::from_errors(vec![err]))
                }
            };

            let response = format_response(contents, Some(media_type));
            debug!(status = response.status, "request handled");
            response
        }
        .instrument(span)
        .await
    }

    async fn run<F>(&self, request: Arc<Request>, query_transform: F) -> ApiResult<ResponseContents>
    where
        F: FnOnce(Query) -> Query + Send,
    {
        if let Method::Other(method) = &request.method {
            return Err(RequestError::UnsupportedMethod(method.clone()).into());
        }

        let operators = self.registry.operators(&request.type_).ok_or_else(|| {
            ApiError::not_found("Resource type not found")
                .with_detail(format!("`{}` is not a known resource type", request.type_))
        })?;

        let params = ParsedParams::parse(
            &request.query_params,
            request.raw_query_string.as_deref(),
            ParamOptions {
                operators,
                max_page_size: self.config.max_page_size,
            },
        )?;
        debug!(?params, "parsed query parameters");

        let body = match &request.body {
            Some(body) => Some(self.parse_body(&request, body.clone())?),
            None => None,
        };

        let body = match body {
            Some(body) => Some(self.before_save(body, &request).await?),
            None => None,
        };

        let plan = make_query(&request, &params, body, &self.registry)?;
        let query = query_transform(plan.query);
        debug!(query = query.name(), query_type = query.type_(), "executing query");

        let contents = self.execute(query, plan.shape).await?;
        self.finish(contents, &request).await
    }

    fn parse_body(&self, request: &Request, body: serde_json::Value) -> ApiResult<RequestBody> {
        check_content_type(
            request.content_type.as_deref(),
            &self.config.supported_extensions,
        )?;

        let parsed = RequestBody::parse(body, request.expects_linkage())?;
        if !request.targets_relationship() {
            let allowed = self.registry.type_and_descendants(&request.type_);
            parsed.check_types(&request.type_, &allowed)?;
        }
        Ok(parsed)
    }

    async fn before_save(&self, body: RequestBody, request: &Arc<Request>) -> ApiResult<RequestBody> {
        let ctx = TransformContext::new(TransformPhase::BeforeSave, request.clone());
        let as_linkage = body.is_linkage();
        let ctx = &ctx;

        let transformed = body
            .into_transformables()
            .flat_map_async(|target| async move {
                Ok::<_, ApiError>(Data::from_option(self.registry.transform(target, ctx).await?))
            })
            .await?;

        RequestBody::from_transformables(transformed, as_linkage)
    }

    async fn execute(&self, query: Query, shape: Shape) -> ApiResult<ResponseContents> {
        let adapter = self.registry.adapter(query.type_()).ok_or_else(|| {
            ApiError::not_found("Resource type not found")
                .with_detail(format!("`{}` is not a known resource type", query.type_()))
        })?;

        match query {
            Query::Find(find) => {
                let singular_lookup = find.id().is_some();
                let result = adapter.find(find).await?;

                match shape {
                    Shape::Relationship(name) => {
                        let owner = single_or_404(result.primary)?;
                        let relationship = owner.relationship(&name).cloned().ok_or_else(|| {
                            relationship_not_found(&name)
                        })?;
                        Ok(ResponseContents::from_document(Document::from_primary(
                            PrimaryData::Relationship(relationship),
                        )))
                    }
                    Shape::Related {
                        relationship,
                        select,
                        populates,
                    } => {
                        let owner = single_or_404(result.primary)?;
                        let linkage = owner
                            .relationship(&relationship)
                            .map(|r| r.linkage().clone())
                            .ok_or_else(|| relationship_not_found(&relationship))?;
                        let (primary, included) =
                            self.find_related(linkage, select, populates).await?;
                        let document = Document::from_resources(primary).with_included(included)?;
                        Ok(ResponseContents::from_document(document))
                    }
                    _ => {
                        if singular_lookup && result.primary.is_empty() {
                            return Err(ApiError::not_found("No matching resource found"));
                        }
                        let mut document = Document::from_resources(result.primary)
                            .with_included(result.included)?;
                        if let Some(total) = result.collection_size {
                            let mut meta = Map::new();
                            meta.insert("total".to_string(), json!(total));
                            document = document.with_meta(meta);
                        }
                        Ok(ResponseContents::from_document(document))
                    }
                }
            }
            Query::Create(create) => {
                let created = adapter.create(create).await?;
                let location = match (created.is_singular(), created.values()) {
                    (true, [resource]) => resource.id().and_then(|id| {
                        self.registry
                            .url_templates()
                            .resource_self(resource.type_(), id)
                    }),
                    _ => None,
                };

                let mut contents =
                    ResponseContents::from_document(Document::from_resources(created)).with_status(201);
                if let Some(location) = location {
                    contents = contents.with_header("Location", location);
                }
                Ok(contents)
            }
            Query::Update(update) => {
                let updated = adapter.update(update).await?;
                match shape {
                    Shape::NoContent => Ok(ResponseContents::default()),
                    _ => Ok(ResponseContents::from_document(Document::from_resources(updated))),
                }
            }
            Query::Delete(delete) => {
                adapter.delete(delete).await?;
                Ok(ResponseContents::default())
            }
            Query::AddToRelationship(add) => {
                adapter.add_to_relationship(add).await?;
                Ok(ResponseContents::default())
            }
            Query::RemoveFromRelationship(remove) => {
                adapter.remove_from_relationship(remove).await?;
                Ok(ResponseContents::default())
            }
        }
    }

    /// Fetch linked resources, one find per linked type, in linkage order
    async fn find_related(
        &self,
        linkage: Data<ResourceIdentifier>,
        select: Option<BTreeMap<String, Vec<String>>>,
        populates: Vec<String>,
    ) -> ApiResult<(Data<Resource>, Vec<Resource>)> {
        let mut groups: Vec<(String, Vec<String>)> = Vec::new();
        for identifier in linkage.iter() {
            match groups.iter_mut().find(|(t, _)| *t == identifier.type_) {
                Some((_, ids)) => ids.push(identifier.id.clone()),
                None => groups.push((identifier.type_.clone(), vec![identifier.id.clone()])),
            }
        }

        let mut found: HashMap<ResourceIdentifier, Resource> = HashMap::new();
        let mut included = Vec::new();
        let mut seen = BTreeSet::new();

        for (type_name, ids) in groups {
            let adapter = self.registry.adapter(&type_name).ok_or_else(|| {
                ApiError::internal(format!("linkage points at unregistered type `{}`", type_name))
            })?;
            let query = FindQuery::new(type_name)
                .with_ids(ids)
                .with_select(select.clone())
                .with_populates(populates.clone());
            let result = adapter.find(query).await?;

            for resource in result.primary {
                if let Some(identifier) = resource.identifier() {
                    seen.insert(identifier.clone());
                    found.insert(identifier, resource);
                }
            }
            for resource in result.included {
                let fresh = resource
                    .identifier()
                    .map(|identifier| seen.insert(identifier))
                    .unwrap_or(true);
                if fresh {
                    included.push(resource);
                }
            }
        }

        let primary = linkage.flat_map(|identifier| Data::from_option(found.remove(&identifier)));
        Ok((primary, included))
    }

    /// beforeRender, then top-level links
    async fn finish(
        &self,
        mut contents: ResponseContents,
        request: &Arc<Request>,
    ) -> ApiResult<ResponseContents> {
        let document = match contents.document.take() {
            Some(document) => document,
            None => return Ok(contents),
        };

        let ctx = TransformContext::new(TransformPhase::BeforeRender, request.clone());
        let ctx = &ctx;
        let document = document
            .transform(|target| async move { self.registry.transform(target, ctx).await })
            .await?
            .with_url_templates(self.registry.url_templates().clone());

        let document = if document.primary().is_some() {
            document.with_link("self", request.uri.clone())
        } else {
            document
        };

        contents.document = Some(document);
        Ok(contents)
    }
}

fn single_or_404(primary: Data<Resource>) -> ApiResult<Resource> {
    match primary.into_unwrapped() {
        Unwrapped::Singular(Some(resource)) => Ok(resource),
        Unwrapped::Plural(resources) if resources.len() == 1 => {
            resources.into_iter().next().ok_or_else(|| ApiError::not_found("No matching resource found"))
        }
        _ => Err(ApiError::not_found("No matching resource found")),
    }
}

fn relationship_not_found(name: &str) -> ApiError {
    ApiError::not_found("Relationship not found")
        .with_detail(format!("This resource has no `{}` relationship", name))
}

fn log_error(err: &ApiError) {
    if err.is_display_safe() {
        warn!(
            status = err.status,
            title = err.title.as_deref().unwrap_or(""),
            detail = err.detail.as_deref().unwrap_or(""),
            "request rejected"
        );
    } else {
        error!(
            detail = err.detail.as_deref().unwrap_or(""),
            "internal error while handling request"
        );
    }
}
