//! Decorator chains layered around synthesized handlers.
//!
//! A [`HandlerDecorator`] wraps one boxed handler into another; chains
//! apply them in declaration order so that the decorator pushed last
//! wraps outermost. Security decorators are plain decorators looked up
//! by name from the map supplied at build time, and the
//! blocking-isolation wrapper is the final, outermost layer for
//! handlers classified as blocking.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use http::Response;
use tracing::error;

use crate::body::{OptionReqBody, ResponseBody};
use crate::error::{BuildError, RouteError};
use crate::handler::RouteHandler;
use crate::request::RequestContext;

/// Wraps a handler with one cross-cutting behavior.
///
/// Instances are created once at build time and shared by every request
/// that reaches their chain position, so they must be internally
/// thread-safe.
pub trait HandlerDecorator: Send + Sync {
    fn decorate(&self, inner: Box<dyn RouteHandler>) -> Box<dyn RouteHandler>;
}

/// An ordered list of shared decorators.
#[derive(Clone, Default)]
pub struct DecoratorChain {
    decorators: Vec<Arc<dyn HandlerDecorator>>,
}

impl DecoratorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, decorator: Arc<dyn HandlerDecorator>) {
        self.decorators.push(decorator);
    }

    pub fn is_empty(&self) -> bool {
        self.decorators.is_empty()
    }

    /// Applies the chain; the decorator pushed last ends up outermost.
    pub fn apply(&self, handler: Box<dyn RouteHandler>) -> Box<dyn RouteHandler> {
        self.decorators.iter().fold(handler, |inner, decorator| decorator.decorate(inner))
    }
}

impl std::fmt::Debug for DecoratorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoratorChain").field("len", &self.decorators.len()).finish()
    }
}

/// Resolves security-decorator names against the registered map.
///
/// A name with no registered decorator is a configuration mistake and
/// fails the build before any traffic is served.
pub(crate) fn resolve_security(
    registered: &HashMap<String, Arc<dyn HandlerDecorator>>,
    keys: &[String],
) -> Result<DecoratorChain, BuildError> {
    let mut chain = DecoratorChain::new();
    for key in keys {
        match registered.get(key) {
            Some(decorator) => chain.push(Arc::clone(decorator)),
            None => {
                error!(name = %key, "security decorator is not registered");
                return Err(BuildError::UnknownSecurityDecorator { name: key.clone() });
            }
        }
    }
    Ok(chain)
}

/// Moves a blocking handler's extraction-and-invoke sequence off the
/// shared I/O workers.
///
/// Relies on the tokio multi-thread runtime: the current worker is
/// demoted to a blocking thread for the duration of the call and a
/// fresh worker takes over its queue.
#[derive(Debug)]
pub struct BlockingWrapper;

impl HandlerDecorator for BlockingWrapper {
    fn decorate(&self, inner: Box<dyn RouteHandler>) -> Box<dyn RouteHandler> {
        Box::new(IsolatedHandler { inner })
    }
}

struct IsolatedHandler {
    inner: Box<dyn RouteHandler>,
}

#[async_trait]
impl RouteHandler for IsolatedHandler {
    async fn invoke(
        &self,
        ctx: &RequestContext<'_, '_>,
        body: OptionReqBody,
    ) -> Result<Response<ResponseBody>, RouteError> {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(self.inner.invoke(ctx, body))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::PathParams;
    use http::{HeaderValue, Request};

    struct Tagged(&'static str);

    #[async_trait]
    impl RouteHandler for Tagged {
        async fn invoke(
            &self,
            _ctx: &RequestContext<'_, '_>,
            _body: OptionReqBody,
        ) -> Result<Response<ResponseBody>, RouteError> {
            Ok(Response::new(ResponseBody::from(self.0)))
        }
    }

    /// Appends its tag to a response header so tests can observe the
    /// wrapping order from the outside.
    struct TraceDecorator(&'static str);

    struct TraceHandler {
        tag: &'static str,
        inner: Box<dyn RouteHandler>,
    }

    impl HandlerDecorator for TraceDecorator {
        fn decorate(&self, inner: Box<dyn RouteHandler>) -> Box<dyn RouteHandler> {
            Box::new(TraceHandler { tag: self.0, inner })
        }
    }

    #[async_trait]
    impl RouteHandler for TraceHandler {
        async fn invoke(
            &self,
            ctx: &RequestContext<'_, '_>,
            body: OptionReqBody,
        ) -> Result<Response<ResponseBody>, RouteError> {
            let mut response = self.inner.invoke(ctx, body).await?;
            let trace = match response.headers().get("x-trace") {
                Some(prior) => format!("{},{}", prior.to_str().unwrap_or(""), self.tag),
                None => self.tag.to_owned(),
            };
            response.headers_mut().insert("x-trace", HeaderValue::try_from(trace).unwrap());
            Ok(response)
        }
    }

    fn ctx_parts() -> http::request::Parts {
        let (parts, ()) = Request::builder().uri("/").body(()).unwrap().into_parts();
        parts
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn chain_applies_last_pushed_outermost() {
        let mut chain = DecoratorChain::new();
        chain.push(Arc::new(TraceDecorator("inner")));
        chain.push(Arc::new(TraceDecorator("outer")));

        let handler = chain.apply(Box::new(Tagged("base")));

        let parts = ctx_parts();
        let ctx = RequestContext::new(&parts, PathParams::empty());
        let response = handler.invoke(&ctx, OptionReqBody::empty()).await.unwrap();

        // Inner runs closest to the handler, so it stamps first.
        assert_eq!(response.headers()["x-trace"], "inner,outer");
    }

    #[test]
    fn missing_security_name_fails_the_build() {
        let mut registered: HashMap<String, Arc<dyn HandlerDecorator>> = HashMap::new();
        registered.insert("api-key".to_owned(), Arc::new(TraceDecorator("auth")));

        let ok = resolve_security(&registered, &["api-key".to_owned()]);
        assert!(ok.is_ok());

        let err = resolve_security(&registered, &["oauth".to_owned()]).unwrap_err();
        assert!(matches!(err, BuildError::UnknownSecurityDecorator { name } if name == "oauth"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn blocking_wrapper_still_produces_the_response() {
        let handler = BlockingWrapper.decorate(Box::new(Tagged("blocked")));

        let parts = ctx_parts();
        let ctx = RequestContext::new(&parts, PathParams::empty());
        let response = handler.invoke(&ctx, OptionReqBody::empty()).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);
    }
}
