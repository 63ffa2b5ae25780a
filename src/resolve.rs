//! The type resolver: maps a declared parameter shape and role to
//! exactly one extraction strategy.
//!
//! Resolution is deterministic and has no side effects beyond registry
//! lookups. The order is fixed: containers unwrap first, the request
//! context binds without extraction, then the scalar set, then
//! registered single-string factories, and finally whole-body model
//! binding. Header-role parameters resolve through the same logic and
//! only swap the accessor.

use tracing::warn;

use crate::descriptor::{ParamShape, ParamSource, ParamSpec, ScalarKind, TargetKind};
use crate::error::BuildError;
use crate::registry::{FactoryFn, ModelBinder, TypeRegistry};

/// The string-valued accessor a scalar or factory strategy reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueSource {
    Query,
    Path,
    Header,
    Cookie,
    Form,
}

/// One way of pulling a typed value out of a request.
///
/// A closed set: the synthesizer and the extractor library dispatch on
/// these variants and nothing else.
#[derive(Clone)]
pub enum ExtractionStrategy {
    /// Bind an owned view of the request itself; no extraction call.
    Context,
    /// Parse one string from `source` with a known primitive parser.
    Scalar { kind: ScalarKind, source: ValueSource },
    /// Parse one string from `source` through a registered factory.
    Factory { type_name: String, source: ValueSource, factory: FactoryFn },
    /// Deserialize the whole body, format chosen by content type.
    Model { type_name: String, binder: ModelBinder },
    /// Absence becomes `None` instead of a missing-parameter error.
    OptionalOf(Box<ExtractionStrategy>),
    /// Every value of a repeated parameter, element-wise.
    ListOf(Box<ExtractionStrategy>),
}

impl ExtractionStrategy {
    /// Whether evaluating this strategy may block on I/O. Decides the
    /// handler's blocking classification at synthesis time.
    pub fn may_block(&self) -> bool {
        match self {
            Self::Context => false,
            Self::Scalar { kind, .. } => matches!(kind, ScalarKind::Bytes | ScalarKind::FilePath),
            Self::Factory { .. } => false,
            Self::Model { .. } => true,
            Self::OptionalOf(inner) | Self::ListOf(inner) => inner.may_block(),
        }
    }
}

impl PartialEq for ExtractionStrategy {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Context, Self::Context) => true,
            (Self::Scalar { kind: a, source: s }, Self::Scalar { kind: b, source: t }) => a == b && s == t,
            (
                Self::Factory { type_name: a, source: s, .. },
                Self::Factory { type_name: b, source: t, .. },
            ) => a == b && s == t,
            (Self::Model { type_name: a, .. }, Self::Model { type_name: b, .. }) => a == b,
            (Self::OptionalOf(a), Self::OptionalOf(b)) => a == b,
            (Self::ListOf(a), Self::ListOf(b)) => a == b,
            _ => false,
        }
    }
}

impl std::fmt::Debug for ExtractionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Context => write!(f, "Context"),
            Self::Scalar { kind, source } => write!(f, "Scalar({kind:?}, {source:?})"),
            Self::Factory { type_name, source, .. } => write!(f, "Factory({type_name}, {source:?})"),
            Self::Model { type_name, .. } => write!(f, "Model({type_name})"),
            Self::OptionalOf(inner) => write!(f, "OptionalOf({inner:?})"),
            Self::ListOf(inner) => write!(f, "ListOf({inner:?})"),
        }
    }
}

/// Resolves one parameter to its extraction strategy.
pub fn resolve(registry: &TypeRegistry, spec: &ParamSpec) -> Result<ExtractionStrategy, BuildError> {
    match &spec.shape {
        ParamShape::Bare(target) => resolve_bare(registry, spec, target),

        ParamShape::Optional(inner) => match inner.as_ref() {
            ParamShape::Bare(target) => {
                let element = resolve_bare(registry, spec, target)?;
                if matches!(element, ExtractionStrategy::Context) {
                    return Err(BuildError::unsupported_shape(&spec.name, "the request context cannot be optional"));
                }
                Ok(wrap_optional(element))
            }
            ParamShape::List(element) => {
                let strategy = resolve_list(registry, spec, element)?;
                Ok(wrap_optional(strategy))
            }
            ParamShape::Optional(_) => {
                Err(BuildError::unsupported_shape(&spec.name, "optional of optional is not supported"))
            }
        },

        ParamShape::List(element) => resolve_list(registry, spec, element),
    }
}

/// Whole-body fallbacks stay bare: a body either deserializes or it
/// does not, and absence is already a body-level condition.
fn wrap_optional(element: ExtractionStrategy) -> ExtractionStrategy {
    match element {
        model @ ExtractionStrategy::Model { .. } => model,
        other => ExtractionStrategy::OptionalOf(Box::new(other)),
    }
}

fn resolve_list(
    registry: &TypeRegistry,
    spec: &ParamSpec,
    element: &ParamShape,
) -> Result<ExtractionStrategy, BuildError> {
    let ParamShape::Bare(target) = element else {
        return Err(BuildError::unsupported_shape(&spec.name, "containers of containers are not supported"));
    };

    match target {
        TargetKind::Scalar(kind) => {
            if matches!(kind, ScalarKind::Bytes | ScalarKind::FilePath) {
                return Err(BuildError::unsupported_shape(&spec.name, "uploaded files cannot be list elements"));
            }
            let source = string_source(spec)?;
            Ok(ExtractionStrategy::ListOf(Box::new(ExtractionStrategy::Scalar { kind: *kind, source })))
        }
        TargetKind::Named(type_name) => match registry.factory(type_name) {
            Some(factory) => {
                let source = string_source(spec)?;
                Ok(ExtractionStrategy::ListOf(Box::new(ExtractionStrategy::Factory {
                    type_name: type_name.clone(),
                    source,
                    factory,
                })))
            }
            None => {
                warn!(
                    param = %spec.name,
                    type_name = %type_name,
                    "no factory for list element type, degrading to whole-body model binding"
                );
                model_strategy(registry, type_name)
            }
        },
        TargetKind::Context => {
            Err(BuildError::unsupported_shape(&spec.name, "the request context cannot be a list element"))
        }
    }
}

fn resolve_bare(
    registry: &TypeRegistry,
    spec: &ParamSpec,
    target: &TargetKind,
) -> Result<ExtractionStrategy, BuildError> {
    match target {
        TargetKind::Context => Ok(ExtractionStrategy::Context),

        TargetKind::Scalar(kind) => {
            // Uploaded-file scalars always read the form attachment.
            if matches!(kind, ScalarKind::Bytes | ScalarKind::FilePath) {
                return Ok(ExtractionStrategy::Scalar { kind: *kind, source: ValueSource::Form });
            }
            let source = string_source(spec)?;
            Ok(ExtractionStrategy::Scalar { kind: *kind, source })
        }

        TargetKind::Named(type_name) => {
            if spec.source == ParamSource::Body {
                return model_strategy(registry, type_name);
            }
            if let Some(factory) = registry.factory(type_name) {
                let source = string_source(spec)?;
                return Ok(ExtractionStrategy::Factory { type_name: type_name.clone(), source, factory });
            }
            if spec.source == ParamSource::Header {
                // Unrecognized header types degrade to the raw string.
                return Ok(ExtractionStrategy::Scalar { kind: ScalarKind::String, source: ValueSource::Header });
            }
            model_strategy(registry, type_name)
        }
    }
}

fn model_strategy(registry: &TypeRegistry, type_name: &str) -> Result<ExtractionStrategy, BuildError> {
    registry
        .model_binder(type_name)
        .map(|binder| ExtractionStrategy::Model { type_name: type_name.to_owned(), binder })
        .ok_or_else(|| BuildError::unknown_model_type(type_name))
}

fn string_source(spec: &ParamSpec) -> Result<ValueSource, BuildError> {
    match spec.source {
        ParamSource::Query => Ok(ValueSource::Query),
        ParamSource::Path => Ok(ValueSource::Path),
        ParamSource::Header => Ok(ValueSource::Header),
        ParamSource::Cookie => Ok(ValueSource::Cookie),
        ParamSource::Form => Ok(ValueSource::Form),
        // Unannotated parameters read the query map by name.
        ParamSource::Context => Ok(ValueSource::Query),
        ParamSource::Body => {
            Err(BuildError::unsupported_shape(&spec.name, "a body parameter must be a model type"))
        }
    }
}
