//! Runtime values flowing between extraction and controller methods.
//!
//! [`BoundValue`] is the closed sum over everything the extractor
//! library can produce; the synthesized handler collects one per
//! parameter and hands them to the [`MethodInvoker`] positionally.
//! [`Outcome`] and [`Reply`] are what the invocation gives back.

use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use http::Response;
use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::body::ResponseBody;
use crate::error::BoxError;
use crate::request::ContextView;

/// One extracted parameter value.
pub enum BoundValue {
    Int64(i64),
    Int32(i32),
    Float32(f32),
    Float64(f64),
    Bool(bool),
    String(String),
    Bytes(Bytes),
    FilePath(PathBuf),
    DateTime(OffsetDateTime),
    Date(Date),
    /// A factory-produced or body-deserialized user-defined value.
    Custom(Box<dyn Any + Send>),
    /// The request context itself, for context-role parameters.
    Context(ContextView),
    Optional(Option<Box<BoundValue>>),
    List(Vec<BoundValue>),
}

impl BoundValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Float32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_file_path(&self) -> Option<&PathBuf> {
        match self {
            Self::FilePath(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_date_time(&self) -> Option<OffsetDateTime> {
        match self {
            Self::DateTime(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<Date> {
        match self {
            Self::Date(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_context(&self) -> Option<&ContextView> {
        match self {
            Self::Context(view) => Some(view),
            _ => None,
        }
    }

    /// Takes a user-defined value back out by downcasting.
    pub fn into_custom<T: 'static>(self) -> Option<T> {
        match self {
            Self::Custom(boxed) => boxed.downcast::<T>().ok().map(|b| *b),
            _ => None,
        }
    }

    pub fn into_optional(self) -> Option<Option<BoundValue>> {
        match self {
            Self::Optional(inner) => Some(inner.map(|b| *b)),
            _ => None,
        }
    }

    pub fn into_list(self) -> Option<Vec<BoundValue>> {
        match self {
            Self::List(values) => Some(values),
            _ => None,
        }
    }
}

impl std::fmt::Debug for BoundValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int64(v) => write!(f, "Int64({v})"),
            Self::Int32(v) => write!(f, "Int32({v})"),
            Self::Float32(v) => write!(f, "Float32({v})"),
            Self::Float64(v) => write!(f, "Float64({v})"),
            Self::Bool(v) => write!(f, "Bool({v})"),
            Self::String(v) => write!(f, "String({v:?})"),
            Self::Bytes(v) => write!(f, "Bytes({} bytes)", v.len()),
            Self::FilePath(v) => write!(f, "FilePath({})", v.display()),
            Self::DateTime(v) => write!(f, "DateTime({v})"),
            Self::Date(v) => write!(f, "Date({v})"),
            Self::Custom(_) => write!(f, "Custom(..)"),
            Self::Context(_) => write!(f, "Context(..)"),
            Self::Optional(inner) => f.debug_tuple("Optional").field(inner).finish(),
            Self::List(values) => f.debug_list().entries(values).finish(),
        }
    }
}

/// A resolved controller return value, ready to be rendered.
pub enum Reply {
    /// An already-built response; passed through untouched.
    Response(Response<ResponseBody>),
    /// A plain string, written verbatim.
    Text(String),
    /// Anything else, serialized as JSON.
    Json(serde_json::Value),
}

impl Reply {
    /// Serializes a value into the JSON reply form.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, BoxError> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }
}

impl std::fmt::Debug for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Response(r) => f.debug_tuple("Response").field(&r.status()).finish(),
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::Json(v) => f.debug_tuple("Json").field(v).finish(),
        }
    }
}

/// What a controller invocation produced.
pub enum Outcome {
    /// Nothing to write; the method acted by side effect.
    Empty,
    /// A value available immediately.
    Reply(Reply),
    /// A deferred value; the handler completes when it resolves, and a
    /// failure inside it surfaces as a handler fault.
    Deferred(BoxFuture<'static, Result<Reply, BoxError>>),
}

impl std::fmt::Debug for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty"),
            Self::Reply(r) => f.debug_tuple("Reply").field(r).finish(),
            Self::Deferred(_) => write!(f, "Deferred(..)"),
        }
    }
}

/// The bridge to one controller method.
///
/// Implementations receive the bound parameter values in declaration
/// order and run the business logic. They are shared across requests and
/// must be internally thread-safe.
pub trait MethodInvoker: Send + Sync {
    fn invoke(&self, args: Vec<BoundValue>) -> Result<Outcome, BoxError>;
}

impl<F> MethodInvoker for F
where
    F: Fn(Vec<BoundValue>) -> Result<Outcome, BoxError> + Send + Sync,
{
    fn invoke(&self, args: Vec<BoundValue>) -> Result<Outcome, BoxError> {
        (self)(args)
    }
}

/// Wraps a closure as a shared [`MethodInvoker`].
pub fn invoker_fn<F>(f: F) -> Arc<dyn MethodInvoker>
where
    F: Fn(Vec<BoundValue>) -> Result<Outcome, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_only_match_their_variant() {
        assert_eq!(BoundValue::Int64(42).as_i64(), Some(42));
        assert_eq!(BoundValue::Int64(42).as_i32(), None);
        assert_eq!(BoundValue::String("x".into()).as_str(), Some("x"));
        assert_eq!(BoundValue::Bool(true).as_bool(), Some(true));
    }

    #[test]
    fn custom_values_downcast() {
        #[derive(Debug, PartialEq)]
        struct Widget(u8);

        let value = BoundValue::Custom(Box::new(Widget(7)));
        assert_eq!(value.into_custom::<Widget>(), Some(Widget(7)));

        let value = BoundValue::Custom(Box::new(Widget(7)));
        assert_eq!(value.into_custom::<String>(), None);
    }

    #[test]
    fn optional_and_list_unwrap() {
        let value = BoundValue::Optional(Some(Box::new(BoundValue::Int32(3))));
        assert_eq!(value.into_optional().unwrap().unwrap().as_i32(), Some(3));

        let value = BoundValue::List(vec![BoundValue::Bool(true), BoundValue::Bool(false)]);
        assert_eq!(value.into_list().unwrap().len(), 2);
    }

    #[test]
    fn closures_are_invokers() {
        let invoker = invoker_fn(|args| {
            assert!(args.is_empty());
            Ok(Outcome::Reply(Reply::Text("done".into())))
        });
        let outcome = invoker.invoke(Vec::new()).unwrap();
        assert!(matches!(outcome, Outcome::Reply(Reply::Text(t)) if t == "done"));
    }
}
