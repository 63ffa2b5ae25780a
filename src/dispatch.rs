//! The front door: routes each inbound request through the table and
//! owns the two-tier error mapping.
//!
//! Extraction failures become client errors, controller faults become
//! opaque server errors, and a miss falls through to the not-found
//! handler. Everything is logged here so handlers stay free of
//! error-reporting concerns. Listener setup and connection handling
//! live outside the engine; this type is what they dispatch into.

use async_trait::async_trait;
use http::{Response, StatusCode};
use tracing::{debug, error, warn};

use crate::body::{OptionReqBody, ResponseBody};
use crate::error::RouteError;
use crate::handler::RouteHandler;
use crate::request::{PathParams, RequestContext};
use crate::responder::Responder;
use crate::table::RoutingTable;

/// Serves requests out of a built routing table.
pub struct Dispatcher {
    table: RoutingTable,
    fallback: Box<dyn RouteHandler>,
}

impl Dispatcher {
    /// Wraps a table with the default not-found fallback.
    pub fn new(table: RoutingTable) -> Self {
        let fallback = Box::new(NotFoundHandler { route_count: table.endpoints().len() });
        Self { table, fallback }
    }

    /// Wraps a table with a caller-supplied fallback handler.
    pub fn with_fallback(table: RoutingTable, fallback: Box<dyn RouteHandler>) -> Self {
        Self { table, fallback }
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    /// Routes one request and renders whatever happens into a response.
    pub async fn dispatch(&self, request: http::Request<OptionReqBody>) -> Response<ResponseBody> {
        let (parts, body) = request.into_parts();

        match self.table.route(&parts.method, parts.uri.path()) {
            Some(matched) => {
                let ctx = RequestContext::new(&parts, matched.params());
                match matched.handler().invoke(&ctx, body).await {
                    Ok(response) => response,
                    Err(RouteError::Extract(e)) => {
                        warn!(method = %parts.method, path = %parts.uri.path(), "extraction failed: {e}");
                        e.response_to(&ctx)
                    }
                    Err(RouteError::Fault(e)) => {
                        error!(method = %parts.method, path = %parts.uri.path(), "handler fault: {e}");
                        server_error()
                    }
                }
            }
            None => {
                let ctx = RequestContext::new(&parts, PathParams::empty());
                match self.fallback.invoke(&ctx, body).await {
                    Ok(response) => response,
                    Err(e) => {
                        error!(path = %parts.uri.path(), "fallback handler failed: {e}");
                        server_error()
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").field("table", &self.table).finish_non_exhaustive()
    }
}

fn server_error() -> Response<ResponseBody> {
    let mut response = Response::new(ResponseBody::from("internal error"));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

/// The default fallback: a plain 404 that knows how many routes exist,
/// mostly so misses show up usefully in the logs.
struct NotFoundHandler {
    route_count: usize,
}

#[async_trait]
impl RouteHandler for NotFoundHandler {
    async fn invoke(
        &self,
        ctx: &RequestContext<'_, '_>,
        _body: OptionReqBody,
    ) -> Result<Response<ResponseBody>, RouteError> {
        debug!(
            method = %ctx.method(),
            path = %ctx.uri().path(),
            known_routes = self.route_count,
            "no route matched"
        );
        let mut response = Response::new(ResponseBody::from(format!(
            "no route for {} {}",
            ctx.method(),
            ctx.uri().path()
        )));
        *response.status_mut() = StatusCode::NOT_FOUND;
        Ok(response)
    }
}
