//! Error types for the two failure tiers.
//!
//! [`BuildError`] covers everything that can go wrong while the routing
//! table is assembled: these are configuration mistakes, surfaced before
//! any traffic is served, and are fatal. [`ExtractError`] covers
//! per-request extraction failures and maps to a client error response.
//! [`RouteError`] is what a handler invocation can return: either an
//! extraction failure or a fault raised by the controller itself.

use http::Method;
use thiserror::Error;

/// Boxed error used for controller faults and deferred failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Fatal configuration errors detected while building the routing table.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("duplicate route: {verb} {template}")]
    RouteConflict { verb: Method, template: String },

    #[error("unknown security decorator: {name}")]
    UnknownSecurityDecorator { name: String },

    #[error("no factory or model binder registered for type {type_name}")]
    UnknownModelType { type_name: String },

    #[error("unsupported shape for parameter {param}: {reason}")]
    UnsupportedShape { param: String, reason: String },

    #[error("invalid path template {template}: {source}")]
    InvalidTemplate { template: String, source: matchit::InsertError },
}

impl BuildError {
    pub fn unsupported_shape<S: ToString>(param: &str, reason: S) -> Self {
        Self::UnsupportedShape { param: param.to_owned(), reason: reason.to_string() }
    }

    pub fn unknown_model_type(type_name: &str) -> Self {
        Self::UnknownModelType { type_name: type_name.to_owned() }
    }
}

/// Per-request extraction failures. All of these surface as a client
/// error; none of them should abort anything beyond the current request.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("missing parameter {name}")]
    MissingParameter { name: String },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("request body has already been consumed")]
    BodyConsumed,
}

impl ExtractError {
    pub fn missing(name: &str) -> Self {
        Self::MissingParameter { name: name.to_owned() }
    }

    pub fn invalid<S: ToString>(name: &str, reason: S) -> Self {
        Self::InvalidParameter { name: name.to_owned(), reason: reason.to_string() }
    }

    pub fn invalid_body<S: ToString>(reason: S) -> Self {
        Self::InvalidBody { reason: reason.to_string() }
    }

    /// True when the value was simply absent, as opposed to present but
    /// malformed. Optional-aware extraction turns absence into `None`
    /// and lets everything else propagate.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::MissingParameter { .. })
    }
}

/// What a route handler invocation can fail with at request time.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("{0}")]
    Extract(#[from] ExtractError),

    #[error("handler fault: {0}")]
    Fault(BoxError),
}
