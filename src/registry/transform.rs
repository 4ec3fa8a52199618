//! # Transform Resolver
//!
//! Per-type `beforeSave` / `beforeRender` hooks. A subtype's hook receives
//! a [`SuperFn`] that runs the nearest ancestor's hook for the same phase,
//! so a subtype can extend its parent's behavior instead of repeating it.
//!
//! ```text
//! dogs hook ──super──▶ animals hook ──super──▶ identity
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{ready, BoxFuture};
use futures_util::FutureExt;

use crate::data::{Data, ResourceIdentifier, Transformable};
use crate::errors::ApiResult;
use crate::request::Request;

use super::ResourceTypeRegistry;

/// When a hook runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransformPhase {
    /// After the request body is parsed, before the query is built
    BeforeSave,
    /// After the adapter returns, before the document is rendered
    BeforeRender,
}

/// What a hook knows about the run it is part of
#[derive(Debug, Clone)]
pub struct TransformContext {
    pub phase: TransformPhase,
    pub request: Arc<Request>,
}

impl TransformContext {
    pub fn new(phase: TransformPhase, request: Arc<Request>) -> Self {
        Self { phase, request }
    }
}

/// `Ok(None)` removes the item from its container
pub type TransformResult = ApiResult<Option<Transformable>>;

/// A per-type transform hook
pub type TransformFn =
    Arc<dyn Fn(Transformable, TransformContext, SuperFn) -> BoxFuture<'static, TransformResult> + Send + Sync>;

/// Wrap an async closure as a [`TransformFn`]
pub fn transform_fn<F, Fut>(f: F) -> TransformFn
where
    F: Fn(Transformable, TransformContext, SuperFn) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = TransformResult> + Send + 'static,
{
    Arc::new(move |target, ctx, super_fn| f(target, ctx, super_fn).boxed())
}

/// Calls the next less specific hook in the chain
#[derive(Clone)]
pub struct SuperFn {
    chain: Arc<[TransformFn]>,
    next: usize,
    ctx: TransformContext,
}

impl SuperFn {
    pub(crate) fn start(chain: Arc<[TransformFn]>, ctx: TransformContext) -> Self {
        Self {
            chain,
            next: 0,
            ctx,
        }
    }

    /// Run the ancestor's hook, or return `target` unchanged if none is left
    pub fn call(&self, target: Transformable) -> BoxFuture<'static, TransformResult> {
        match self.chain.get(self.next) {
            Some(hook) => {
                let rest = SuperFn {
                    chain: self.chain.clone(),
                    next: self.next + 1,
                    ctx: self.ctx.clone(),
                };
                hook(target, self.ctx.clone(), rest)
            }
            None => ready(Ok(Some(target))).boxed(),
        }
    }

    /// Hooks still to run
    pub fn remaining(&self) -> usize {
        self.chain.len().saturating_sub(self.next)
    }
}

impl fmt::Debug for SuperFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuperFn")
            .field("remaining", &self.remaining())
            .field("phase", &self.ctx.phase)
            .finish()
    }
}

impl ResourceTypeRegistry {
    /// Run the hooks for `target`'s type, most specific first
    pub async fn transform(&self, target: Transformable, ctx: &TransformContext) -> TransformResult {
        match target {
            Transformable::Identifier(identifier) => self
                .transform_identifier(identifier, ctx)
                .await
                .map(|t| t.map(Transformable::Identifier)),
            Transformable::Resource(mut resource) => {
                if self.any_transform_linkage() {
                    let mut linkages = BTreeMap::new();
                    for (name, relationship) in resource.relationships() {
                        let linkage = self
                            .transform_linkage(relationship.linkage().clone(), ctx)
                            .await?;
                        linkages.insert(name.clone(), linkage);
                    }
                    resource.map_relationships(|name, relationship| {
                        match linkages.remove(name) {
                            Some(linkage) => relationship.with_linkage(linkage),
                            None => relationship,
                        }
                    });
                }
                let chain = self.chain(resource.type_(), ctx.phase);
                SuperFn::start(chain, ctx.clone())
                    .call(Transformable::Resource(resource))
                    .await
            }
        }
    }

    /// Identifiers only pass through hooks when their type opts in
    async fn transform_identifier(
        &self,
        identifier: ResourceIdentifier,
        ctx: &TransformContext,
    ) -> ApiResult<Option<ResourceIdentifier>> {
        if !self.transforms_linkage(&identifier.type_) {
            return Ok(Some(identifier));
        }
        let chain = self.chain(&identifier.type_, ctx.phase);
        match SuperFn::start(chain, ctx.clone())
            .call(Transformable::Identifier(identifier))
            .await?
        {
            Some(t) => t.into_identifier().map(Some),
            None => Ok(None),
        }
    }

    async fn transform_linkage(
        &self,
        linkage: Data<ResourceIdentifier>,
        ctx: &TransformContext,
    ) -> ApiResult<Data<ResourceIdentifier>> {
        linkage
            .flat_map_async(|identifier| async move {
                Ok(Data::from_option(
                    self.transform_identifier(identifier, ctx).await?,
                ))
            })
            .await
    }
}
