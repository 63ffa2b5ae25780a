//! The request-time handler abstraction every route resolves to.

use async_trait::async_trait;
use http::Response;

use crate::body::{OptionReqBody, ResponseBody};
use crate::error::RouteError;
use crate::request::RequestContext;

/// A request handler bound to one (verb, path template) pair.
///
/// Implementations are shared across requests: the routing table owns
/// exactly one instance per route and invokes it concurrently.
#[async_trait]
pub trait RouteHandler: Send + Sync {
    async fn invoke(
        &self,
        ctx: &RequestContext<'_, '_>,
        body: OptionReqBody,
    ) -> Result<Response<ResponseBody>, RouteError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::PathParams;
    use http::Request;

    struct Echo;

    #[async_trait]
    impl RouteHandler for Echo {
        async fn invoke(
            &self,
            ctx: &RequestContext<'_, '_>,
            _body: OptionReqBody,
        ) -> Result<Response<ResponseBody>, RouteError> {
            Ok(Response::new(ResponseBody::from(ctx.uri().path().to_owned())))
        }
    }

    fn assert_is_handler<T: RouteHandler>(_handler: &T) {
        // no op
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn handlers_are_object_safe_and_invokable() {
        assert_is_handler(&Echo);
        let boxed: Box<dyn RouteHandler> = Box::new(Echo);

        let (parts, ()) = Request::builder().uri("/ping").body(()).unwrap().into_parts();
        let ctx = RequestContext::new(&parts, PathParams::empty());
        let response = boxed.invoke(&ctx, OptionReqBody::empty()).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);
    }
}
