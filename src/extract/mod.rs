//! The extractor library: the runtime functions each extraction
//! strategy invokes against an inbound request.
//!
//! The named getters ([`string`], [`int64`], [`optional::int64`], ...)
//! are a stable surface that other code may call directly; the
//! synthesized handlers go through [`eval`], which walks a resolved
//! [`ExtractionStrategy`] and produces one [`BoundValue`] per parameter.

mod form;
mod model;
mod scalar;

pub use form::{byte_buffer, file_path};
pub use model::{model, model_format};
pub use scalar::{boolean, date, date_time, float32, float64, int32, int64, optional, string, strings};

use crate::body::OptionReqBody;
use crate::error::ExtractError;
use crate::request::RequestContext;
use crate::resolve::{ExtractionStrategy, ValueSource};
use crate::value::BoundValue;

/// Evaluates one binding step against the request.
pub(crate) async fn eval(
    strategy: &ExtractionStrategy,
    name: &str,
    ctx: &RequestContext<'_, '_>,
    body: &OptionReqBody,
) -> Result<BoundValue, ExtractError> {
    match strategy {
        ExtractionStrategy::Context => Ok(BoundValue::Context(ctx.snapshot())),
        ExtractionStrategy::Model { binder, .. } => {
            let bytes = body.collect_bytes().await?;
            binder(&bytes, model::model_format(ctx))
        }
        other => eval_sync(other, name, ctx),
    }
}

/// The non-body strategies never touch the request body and evaluate
/// synchronously, which keeps container re-wrapping a plain recursion.
fn eval_sync(
    strategy: &ExtractionStrategy,
    name: &str,
    ctx: &RequestContext<'_, '_>,
) -> Result<BoundValue, ExtractError> {
    match strategy {
        ExtractionStrategy::Scalar { kind, source } => scalar::scalar_value(ctx, *source, *kind, name),

        ExtractionStrategy::Factory { factory, source, .. } => {
            let raw = required(ctx, *source, name)?;
            factory(raw)
        }

        ExtractionStrategy::OptionalOf(inner) => match eval_sync(inner, name, ctx) {
            Ok(value) => Ok(BoundValue::Optional(Some(Box::new(value)))),
            Err(e) if e.is_missing() => Ok(BoundValue::Optional(None)),
            Err(e) => Err(e),
        },

        ExtractionStrategy::ListOf(inner) => {
            let element = inner.as_ref();
            let raws = match element {
                ExtractionStrategy::Scalar { source, .. } | ExtractionStrategy::Factory { source, .. } => {
                    raw_values(ctx, *source, name)
                }
                _ => return Err(ExtractError::invalid(name, "unsupported list element strategy")),
            };
            if raws.is_empty() {
                return Err(ExtractError::missing(name));
            }
            let mut values = Vec::with_capacity(raws.len());
            for raw in raws {
                let value = match element {
                    ExtractionStrategy::Scalar { kind, .. } => scalar::parse_scalar(*kind, name, raw)?,
                    ExtractionStrategy::Factory { factory, .. } => factory(raw)?,
                    _ => return Err(ExtractError::invalid(name, "unsupported list element strategy")),
                };
                values.push(value);
            }
            Ok(BoundValue::List(values))
        }

        ExtractionStrategy::Context | ExtractionStrategy::Model { .. } => {
            Err(ExtractError::invalid(name, "strategy requires request-level evaluation"))
        }
    }
}

/// One raw string value from the given accessor, if present.
pub(crate) fn raw_value<'a>(
    ctx: &'a RequestContext<'_, '_>,
    source: ValueSource,
    name: &str,
) -> Option<&'a str> {
    match source {
        ValueSource::Query => ctx.query_value(name),
        ValueSource::Path => ctx.path_params().get(name),
        ValueSource::Header => ctx.header_value(name),
        ValueSource::Cookie => ctx.cookie_value(name),
        ValueSource::Form => ctx.form().and_then(|form| form.value(name)),
    }
}

/// Every raw string value of a possibly repeated parameter.
pub(crate) fn raw_values<'a>(
    ctx: &'a RequestContext<'_, '_>,
    source: ValueSource,
    name: &'a str,
) -> Vec<&'a str> {
    match source {
        ValueSource::Query => ctx.query_values(name).collect(),
        ValueSource::Header => ctx.header_values(name).collect(),
        ValueSource::Form => ctx.form().map(|form| form.values(name).collect()).unwrap_or_default(),
        ValueSource::Path | ValueSource::Cookie => raw_value(ctx, source, name).into_iter().collect(),
    }
}

pub(crate) fn required<'a>(
    ctx: &'a RequestContext<'_, '_>,
    source: ValueSource,
    name: &str,
) -> Result<&'a str, ExtractError> {
    raw_value(ctx, source, name).ok_or_else(|| ExtractError::missing(name))
}
