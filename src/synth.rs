//! The handler synthesizer: turns controller descriptors into routed,
//! fully wrapped request handlers.
//!
//! Synthesis runs single-threaded, once, before any traffic: for each
//! annotated method it resolves every parameter to an extraction
//! strategy, classifies the handler as blocking from those strategies,
//! layers the decorator chains and registers the result in the routing
//! table. The [`BuildContext`] collects the endpoint records along the
//! way; no global state is involved.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Response};
use tracing::{debug, error, warn};

use crate::body::{OptionReqBody, ResponseBody};
use crate::descriptor::{ControllerDescriptor, EndpointDescriptor, MethodDescriptor, ReturnMode};
use crate::error::{BuildError, RouteError};
use crate::extract;
use crate::handler::RouteHandler;
use crate::registry::TypeRegistry;
use crate::request::RequestContext;
use crate::resolve::{ExtractionStrategy, resolve};
use crate::table::{RoutingTable, RoutingTableBuilder, normalize_template};
use crate::value::{MethodInvoker, Outcome, Reply};
use crate::wrap::{BlockingWrapper, DecoratorChain, HandlerDecorator, resolve_security};

/// Everything synthesis accumulates besides the routing table itself.
///
/// Passed explicitly through the build and consumed when the table is
/// published.
#[derive(Debug, Default)]
pub struct BuildContext {
    endpoints: BTreeSet<EndpointDescriptor>,
}

impl BuildContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&mut self, endpoint: EndpointDescriptor) {
        self.endpoints.insert(endpoint);
    }

    pub fn endpoints(&self) -> &BTreeSet<EndpointDescriptor> {
        &self.endpoints
    }

    pub fn into_endpoints(self) -> BTreeSet<EndpointDescriptor> {
        self.endpoints
    }
}

/// Synthesizes handlers for one controller at a time.
pub struct HandlerSynthesizer<'a> {
    registry: &'a TypeRegistry,
    wrappers: &'a HashMap<String, Arc<dyn HandlerDecorator>>,
    path_prefix: &'a str,
}

impl<'a> HandlerSynthesizer<'a> {
    pub fn new(
        registry: &'a TypeRegistry,
        wrappers: &'a HashMap<String, Arc<dyn HandlerDecorator>>,
        path_prefix: &'a str,
    ) -> Self {
        Self { registry, wrappers, path_prefix }
    }

    /// Synthesizes and registers every method of one controller.
    ///
    /// The first failing method aborts the controller: a handler that
    /// cannot be synthesized must never be silently included.
    pub fn synthesize(
        &self,
        controller: &ControllerDescriptor,
        ctx: &mut BuildContext,
        table: &mut RoutingTableBuilder,
    ) -> Result<(), BuildError> {
        let mut taken_names = HashSet::new();
        for method in &controller.methods {
            if let Err(e) = self.synthesize_method(controller, method, &mut taken_names, ctx, table) {
                error!(
                    controller = %controller.name,
                    method = %method.name,
                    "failed to synthesize handler: {e}"
                );
                return Err(e);
            }
        }
        Ok(())
    }

    fn synthesize_method(
        &self,
        controller: &ControllerDescriptor,
        method: &MethodDescriptor,
        taken_names: &mut HashSet<String>,
        ctx: &mut BuildContext,
        table: &mut RoutingTableBuilder,
    ) -> Result<(), BuildError> {
        let template = normalize_template(&format!(
            "{}/{}/{}",
            self.path_prefix, controller.base_path, method.path
        ));

        let consumes = split_content_types(method.consumes.as_deref().or(controller.consumes.as_deref()));
        let produces = split_content_types(method.produces.as_deref().or(controller.produces.as_deref()));

        let mut bindings = Vec::with_capacity(method.params.len());
        let mut blocking = method.blocking || controller.blocking;
        for param in &method.params {
            let strategy = resolve(self.registry, param)?;
            if !blocking && strategy.may_block() {
                blocking = true;
            }
            bindings.push(BindingStep { name: param.name.clone(), strategy });
        }

        let handler_name = unique_handler_name(&controller.name, &method.name, taken_names);

        let endpoint = EndpointDescriptor {
            verb: method.verb.clone(),
            path_template: template.clone(),
            consumes,
            produces: produces.clone(),
            controller_name: controller.name.clone(),
            method_name: method.name.clone(),
            handler_name: handler_name.clone(),
            params: method.params.clone(),
            return_mode: method.return_mode,
            blocking,
            security: effective_security(controller, method).to_vec(),
        };

        let base = SynthesizedHandler {
            bindings,
            invoker: Arc::clone(&method.invoker),
            return_mode: method.return_mode,
            produces: declared_content_type(&produces),
        };

        let mut chain = DecoratorChain::new();
        for decorator in &controller.decorators {
            chain.push(Arc::clone(decorator));
        }
        for decorator in &method.decorators {
            chain.push(Arc::clone(decorator));
        }
        let security = resolve_security(self.wrappers, effective_security(controller, method))?;

        let mut handler: Box<dyn RouteHandler> = Box::new(base);
        handler = chain.apply(handler);
        handler = security.apply(handler);
        if blocking {
            handler = BlockingWrapper.decorate(handler);
        }

        table.add(method.verb.clone(), template.clone(), handler)?;
        ctx.register(endpoint);

        debug!(
            handler = %handler_name,
            verb = %method.verb,
            %template,
            blocking,
            "handler synthesized"
        );
        Ok(())
    }
}

impl std::fmt::Debug for HandlerSynthesizer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerSynthesizer").field("path_prefix", &self.path_prefix).finish_non_exhaustive()
    }
}

/// Builds the whole routing table from an ordered controller list.
///
/// This is the build-time entry point: single-threaded, run to
/// completion before traffic, and fatal on the first configuration
/// error.
pub fn build_routing_table(
    registry: &TypeRegistry,
    wrappers: &HashMap<String, Arc<dyn HandlerDecorator>>,
    path_prefix: &str,
    controllers: &[ControllerDescriptor],
) -> Result<RoutingTable, BuildError> {
    let synthesizer = HandlerSynthesizer::new(registry, wrappers, path_prefix);
    let mut ctx = BuildContext::new();
    let mut table = RoutingTableBuilder::new();
    for controller in controllers {
        synthesizer.synthesize(controller, &mut ctx, &mut table)?;
    }
    table.build(ctx.into_endpoints())
}

struct BindingStep {
    name: String,
    strategy: ExtractionStrategy,
}

/// The synthesized handler: extract each binding in declaration order,
/// invoke the controller method positionally, render the outcome.
struct SynthesizedHandler {
    bindings: Vec<BindingStep>,
    invoker: Arc<dyn MethodInvoker>,
    return_mode: ReturnMode,
    produces: Option<HeaderValue>,
}

#[async_trait]
impl RouteHandler for SynthesizedHandler {
    async fn invoke(
        &self,
        ctx: &RequestContext<'_, '_>,
        body: OptionReqBody,
    ) -> Result<Response<ResponseBody>, RouteError> {
        let mut args = Vec::with_capacity(self.bindings.len());
        for step in &self.bindings {
            args.push(extract::eval(&step.strategy, &step.name, ctx, &body).await?);
        }

        let outcome = self.invoker.invoke(args).map_err(RouteError::Fault)?;
        if self.return_mode == ReturnMode::None {
            return Ok(Response::new(ResponseBody::empty()));
        }
        let reply = match outcome {
            Outcome::Empty => return Ok(Response::new(ResponseBody::empty())),
            Outcome::Reply(reply) => reply,
            Outcome::Deferred(deferred) => deferred.await.map_err(RouteError::Fault)?,
        };
        self.render(reply)
    }
}

impl SynthesizedHandler {
    fn render(&self, reply: Reply) -> Result<Response<ResponseBody>, RouteError> {
        match reply {
            Reply::Response(response) => Ok(response),

            Reply::Text(text) => {
                let content_type = self
                    .produces
                    .clone()
                    .unwrap_or_else(|| HeaderValue::from_static(mime::TEXT_PLAIN_UTF_8.as_ref()));
                let mut response = Response::new(ResponseBody::from(text));
                response.headers_mut().insert(CONTENT_TYPE, content_type);
                Ok(response)
            }

            Reply::Json(value) => {
                let payload = serde_json::to_string(&value).map_err(|e| RouteError::Fault(Box::new(e)))?;
                let content_type = self
                    .produces
                    .clone()
                    .unwrap_or_else(|| HeaderValue::from_static(mime::APPLICATION_JSON.as_ref()));
                let mut response = Response::new(ResponseBody::from(payload));
                response.headers_mut().insert(CONTENT_TYPE, content_type);
                Ok(response)
            }
        }
    }
}

fn effective_security<'d>(controller: &'d ControllerDescriptor, method: &'d MethodDescriptor) -> &'d [String] {
    if method.security.is_empty() { &controller.security } else { &method.security }
}

/// Splits a possibly comma-joined content-type declaration.
fn split_content_types(declared: Option<&str>) -> Vec<String> {
    match declared {
        None => vec![mime::STAR_STAR.to_string()],
        Some(joined) => {
            let types: Vec<String> =
                joined.split(',').map(str::trim).filter(|t| !t.is_empty()).map(str::to_owned).collect();
            if types.is_empty() { vec![mime::STAR_STAR.to_string()] } else { types }
        }
    }
}

/// The content-type header for rendered values, when one was declared.
fn declared_content_type(produces: &[String]) -> Option<HeaderValue> {
    if produces.iter().all(|t| t.as_str() == mime::STAR_STAR.as_ref()) {
        return None;
    }
    let joined = produces.join(",");
    match HeaderValue::try_from(joined.as_str()) {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(produces = %joined, "declared content type is not a valid header value");
            None
        }
    }
}

fn unique_handler_name(controller: &str, method: &str, taken: &mut HashSet<String>) -> String {
    let base = format!("{}{}Handler", lower_first(controller), upper_camel(method));
    let mut candidate = base.clone();
    let mut suffix = 1;
    while !taken.insert(candidate.clone()) {
        candidate = format!("{base}_{suffix}");
        suffix += 1;
    }
    candidate
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn upper_camel(snake: &str) -> String {
    snake
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
