//! Build-time data model: parameter shapes, method and controller
//! descriptors, and the endpoint records kept for documentation.
//!
//! Everything here is assembled once by the bootstrap layer, consumed by
//! the synthesizer, and immutable afterwards.

use std::cmp::Ordering;
use std::sync::Arc;

use http::Method;

use crate::value::MethodInvoker;
use crate::wrap::HandlerDecorator;

/// Where a parameter's value comes from.
///
/// `Context` means "no extraction at all": the parameter receives an
/// owned view of the request itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamSource {
    Query,
    Header,
    Path,
    Cookie,
    Form,
    Body,
    Context,
}

/// The closed set of primitively extractable value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Int64,
    Int32,
    Float32,
    Float64,
    Bool,
    String,
    /// Contents of an uploaded file, read into memory.
    Bytes,
    /// Location of an uploaded file on disk.
    FilePath,
    /// RFC 3339 date-time with offset.
    DateTime,
    /// ISO 8601 calendar date.
    Date,
}

/// The declared element type of a parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Scalar(ScalarKind),
    /// A user-defined type, resolved against the type registry.
    Named(String),
    /// The request-context type itself.
    Context,
}

/// Declared type of a controller-method parameter, including its
/// container structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamShape {
    Bare(TargetKind),
    Optional(Box<ParamShape>),
    List(Box<ParamShape>),
}

impl ParamShape {
    pub fn scalar(kind: ScalarKind) -> Self {
        Self::Bare(TargetKind::Scalar(kind))
    }

    pub fn named(type_name: impl Into<String>) -> Self {
        Self::Bare(TargetKind::Named(type_name.into()))
    }

    pub fn context() -> Self {
        Self::Bare(TargetKind::Context)
    }

    pub fn optional(self) -> Self {
        Self::Optional(Box::new(self))
    }

    pub fn list(self) -> Self {
        Self::List(Box::new(self))
    }
}

/// One declared parameter: its wire name, role and shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamSpec {
    pub name: String,
    pub source: ParamSource,
    pub shape: ParamShape,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, source: ParamSource, shape: ParamShape) -> Self {
        Self { name: name.into(), source, shape }
    }
}

/// How the controller method reports its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnMode {
    /// Side effects only; nothing is written.
    None,
    /// A value available when the invocation returns.
    Sync,
    /// A deferred value; the response completes when it resolves.
    Async,
}

/// Build-time description of one controller method.
///
/// Supplied by the bootstrap layer; the synthesizer turns each of these
/// into a routed handler.
pub struct MethodDescriptor {
    pub name: String,
    pub verb: Method,
    pub path: String,
    pub consumes: Option<String>,
    pub produces: Option<String>,
    pub blocking: bool,
    pub params: Vec<ParamSpec>,
    pub return_mode: ReturnMode,
    pub decorators: Vec<Arc<dyn HandlerDecorator>>,
    pub security: Vec<String>,
    pub invoker: Arc<dyn MethodInvoker>,
}

impl MethodDescriptor {
    pub fn new(
        name: impl Into<String>,
        verb: Method,
        path: impl Into<String>,
        invoker: Arc<dyn MethodInvoker>,
    ) -> Self {
        Self {
            name: name.into(),
            verb,
            path: path.into(),
            consumes: None,
            produces: None,
            blocking: false,
            params: Vec::new(),
            return_mode: ReturnMode::Sync,
            decorators: Vec::new(),
            security: Vec::new(),
            invoker,
        }
    }

    pub fn consumes(mut self, content_type: impl Into<String>) -> Self {
        self.consumes = Some(content_type.into());
        self
    }

    pub fn produces(mut self, content_type: impl Into<String>) -> Self {
        self.produces = Some(content_type.into());
        self
    }

    pub fn blocking(mut self) -> Self {
        self.blocking = true;
        self
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn returns(mut self, mode: ReturnMode) -> Self {
        self.return_mode = mode;
        self
    }

    pub fn decorate(mut self, decorator: Arc<dyn HandlerDecorator>) -> Self {
        self.decorators.push(decorator);
        self
    }

    pub fn secured(mut self, key: impl Into<String>) -> Self {
        self.security.push(key.into());
        self
    }
}

impl std::fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("verb", &self.verb)
            .field("path", &self.path)
            .field("params", &self.params)
            .field("return_mode", &self.return_mode)
            .field("blocking", &self.blocking)
            .field("security", &self.security)
            .finish_non_exhaustive()
    }
}

/// Build-time description of one controller: shared defaults plus its
/// annotated methods.
pub struct ControllerDescriptor {
    pub name: String,
    pub base_path: String,
    pub consumes: Option<String>,
    pub produces: Option<String>,
    pub blocking: bool,
    pub decorators: Vec<Arc<dyn HandlerDecorator>>,
    pub security: Vec<String>,
    pub methods: Vec<MethodDescriptor>,
}

impl ControllerDescriptor {
    pub fn new(name: impl Into<String>, base_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_path: base_path.into(),
            consumes: None,
            produces: None,
            blocking: false,
            decorators: Vec::new(),
            security: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn consumes(mut self, content_type: impl Into<String>) -> Self {
        self.consumes = Some(content_type.into());
        self
    }

    pub fn produces(mut self, content_type: impl Into<String>) -> Self {
        self.produces = Some(content_type.into());
        self
    }

    pub fn blocking(mut self) -> Self {
        self.blocking = true;
        self
    }

    pub fn decorate(mut self, decorator: Arc<dyn HandlerDecorator>) -> Self {
        self.decorators.push(decorator);
        self
    }

    pub fn secured(mut self, key: impl Into<String>) -> Self {
        self.security.push(key.into());
        self
    }

    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }
}

impl std::fmt::Debug for ControllerDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerDescriptor")
            .field("name", &self.name)
            .field("base_path", &self.base_path)
            .field("methods", &self.methods.len())
            .finish_non_exhaustive()
    }
}

/// The record kept per synthesized endpoint, exposed for documentation
/// tooling and the not-found fallback.
///
/// Ordered by path template, then verb, then handler name, so the
/// documentation set iterates deterministically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub verb: Method,
    pub path_template: String,
    pub consumes: Vec<String>,
    pub produces: Vec<String>,
    pub controller_name: String,
    pub method_name: String,
    pub handler_name: String,
    pub params: Vec<ParamSpec>,
    pub return_mode: ReturnMode,
    pub blocking: bool,
    pub security: Vec<String>,
}

impl Ord for EndpointDescriptor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.path_template
            .cmp(&other.path_template)
            .then_with(|| self.verb.as_str().cmp(other.verb.as_str()))
            .then_with(|| self.handler_name.cmp(&other.handler_name))
    }
}

impl PartialOrd for EndpointDescriptor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for EndpointDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} -> {}.{}", self.verb, self.path_template, self.controller_name, self.method_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Outcome, invoker_fn};
    use std::collections::BTreeSet;

    fn endpoint(verb: Method, template: &str, handler_name: &str) -> EndpointDescriptor {
        EndpointDescriptor {
            verb,
            path_template: template.to_owned(),
            consumes: vec!["*/*".to_owned()],
            produces: vec!["*/*".to_owned()],
            controller_name: "Items".to_owned(),
            method_name: "list".to_owned(),
            handler_name: handler_name.to_owned(),
            params: Vec::new(),
            return_mode: ReturnMode::Sync,
            blocking: false,
            security: Vec::new(),
        }
    }

    #[test]
    fn shape_builders_nest() {
        let shape = ParamShape::scalar(ScalarKind::Int64).list().optional();
        assert_eq!(
            shape,
            ParamShape::Optional(Box::new(ParamShape::List(Box::new(ParamShape::Bare(TargetKind::Scalar(
                ScalarKind::Int64
            ))))))
        );
    }

    #[test]
    fn endpoints_sort_by_template_then_verb() {
        let mut set = BTreeSet::new();
        set.insert(endpoint(Method::POST, "/b", "h2"));
        set.insert(endpoint(Method::GET, "/b", "h1"));
        set.insert(endpoint(Method::GET, "/a", "h0"));

        let order: Vec<_> = set.iter().map(|e| format!("{} {}", e.verb, e.path_template)).collect();
        assert_eq!(order, vec!["GET /a", "GET /b", "POST /b"]);
    }

    #[test]
    fn endpoint_set_deduplicates() {
        let mut set = BTreeSet::new();
        set.insert(endpoint(Method::GET, "/a", "h0"));
        set.insert(endpoint(Method::GET, "/a", "h0"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn method_descriptor_builder_accumulates() {
        let invoker = invoker_fn(|_args| Ok(Outcome::Empty));
        let descriptor = MethodDescriptor::new("list", Method::GET, "/", invoker)
            .produces("application/json")
            .param(ParamSpec::new("limit", ParamSource::Query, ParamShape::scalar(ScalarKind::Int32).optional()))
            .secured("api-key");

        assert_eq!(descriptor.produces.as_deref(), Some("application/json"));
        assert_eq!(descriptor.params.len(), 1);
        assert_eq!(descriptor.security, vec!["api-key"]);
    }
}
