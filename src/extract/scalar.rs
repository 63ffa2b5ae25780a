//! Scalar getters: one typed value parsed from a query parameter,
//! header, path variable, cookie or form field.
//!
//! The required getters fail with a missing-parameter condition when
//! the value is absent; the [`optional`] variants turn absence into
//! `None` but still reject malformed values.

use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::descriptor::ScalarKind;
use crate::error::ExtractError;
use crate::request::RequestContext;
use crate::resolve::ValueSource;
use crate::value::BoundValue;

use super::{form, raw_value, raw_values, required};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

pub fn string(ctx: &RequestContext<'_, '_>, source: ValueSource, name: &str) -> Result<String, ExtractError> {
    required(ctx, source, name).map(str::to_owned)
}

pub fn int64(ctx: &RequestContext<'_, '_>, source: ValueSource, name: &str) -> Result<i64, ExtractError> {
    parse(name, required(ctx, source, name)?)
}

pub fn int32(ctx: &RequestContext<'_, '_>, source: ValueSource, name: &str) -> Result<i32, ExtractError> {
    parse(name, required(ctx, source, name)?)
}

pub fn float32(ctx: &RequestContext<'_, '_>, source: ValueSource, name: &str) -> Result<f32, ExtractError> {
    parse(name, required(ctx, source, name)?)
}

pub fn float64(ctx: &RequestContext<'_, '_>, source: ValueSource, name: &str) -> Result<f64, ExtractError> {
    parse(name, required(ctx, source, name)?)
}

pub fn boolean(ctx: &RequestContext<'_, '_>, source: ValueSource, name: &str) -> Result<bool, ExtractError> {
    parse(name, required(ctx, source, name)?)
}

pub fn date_time(
    ctx: &RequestContext<'_, '_>,
    source: ValueSource,
    name: &str,
) -> Result<OffsetDateTime, ExtractError> {
    parse_date_time(name, required(ctx, source, name)?)
}

pub fn date(ctx: &RequestContext<'_, '_>, source: ValueSource, name: &str) -> Result<Date, ExtractError> {
    parse_date(name, required(ctx, source, name)?)
}

/// Every raw value of a repeated parameter, as strings.
pub fn strings(
    ctx: &RequestContext<'_, '_>,
    source: ValueSource,
    name: &str,
) -> Result<Vec<String>, ExtractError> {
    let raws = raw_values(ctx, source, name);
    if raws.is_empty() {
        return Err(ExtractError::missing(name));
    }
    Ok(raws.into_iter().map(str::to_owned).collect())
}

/// Absence-tolerant variants of the scalar getters.
pub mod optional {
    use super::*;

    pub fn string(
        ctx: &RequestContext<'_, '_>,
        source: ValueSource,
        name: &str,
    ) -> Option<String> {
        raw_value(ctx, source, name).map(str::to_owned)
    }

    pub fn int64(
        ctx: &RequestContext<'_, '_>,
        source: ValueSource,
        name: &str,
    ) -> Result<Option<i64>, ExtractError> {
        raw_value(ctx, source, name).map(|raw| parse(name, raw)).transpose()
    }

    pub fn int32(
        ctx: &RequestContext<'_, '_>,
        source: ValueSource,
        name: &str,
    ) -> Result<Option<i32>, ExtractError> {
        raw_value(ctx, source, name).map(|raw| parse(name, raw)).transpose()
    }

    pub fn float32(
        ctx: &RequestContext<'_, '_>,
        source: ValueSource,
        name: &str,
    ) -> Result<Option<f32>, ExtractError> {
        raw_value(ctx, source, name).map(|raw| parse(name, raw)).transpose()
    }

    pub fn float64(
        ctx: &RequestContext<'_, '_>,
        source: ValueSource,
        name: &str,
    ) -> Result<Option<f64>, ExtractError> {
        raw_value(ctx, source, name).map(|raw| parse(name, raw)).transpose()
    }

    pub fn boolean(
        ctx: &RequestContext<'_, '_>,
        source: ValueSource,
        name: &str,
    ) -> Result<Option<bool>, ExtractError> {
        raw_value(ctx, source, name).map(|raw| parse(name, raw)).transpose()
    }

    pub fn date_time(
        ctx: &RequestContext<'_, '_>,
        source: ValueSource,
        name: &str,
    ) -> Result<Option<OffsetDateTime>, ExtractError> {
        raw_value(ctx, source, name).map(|raw| parse_date_time(name, raw)).transpose()
    }

    pub fn date(
        ctx: &RequestContext<'_, '_>,
        source: ValueSource,
        name: &str,
    ) -> Result<Option<Date>, ExtractError> {
        raw_value(ctx, source, name).map(|raw| parse_date(name, raw)).transpose()
    }
}

/// Strategy-driven entry used by the synthesized handlers.
pub(crate) fn scalar_value(
    ctx: &RequestContext<'_, '_>,
    source: ValueSource,
    kind: ScalarKind,
    name: &str,
) -> Result<BoundValue, ExtractError> {
    match kind {
        ScalarKind::FilePath => form::file_path(ctx, name).map(BoundValue::FilePath),
        ScalarKind::Bytes => form::byte_buffer(ctx, name).map(BoundValue::Bytes),
        _ => parse_scalar(kind, name, required(ctx, source, name)?),
    }
}

/// Parses one raw string according to the scalar kind.
pub(crate) fn parse_scalar(kind: ScalarKind, name: &str, raw: &str) -> Result<BoundValue, ExtractError> {
    match kind {
        ScalarKind::Int64 => parse(name, raw).map(BoundValue::Int64),
        ScalarKind::Int32 => parse(name, raw).map(BoundValue::Int32),
        ScalarKind::Float32 => parse(name, raw).map(BoundValue::Float32),
        ScalarKind::Float64 => parse(name, raw).map(BoundValue::Float64),
        ScalarKind::Bool => parse(name, raw).map(BoundValue::Bool),
        ScalarKind::String => Ok(BoundValue::String(raw.to_owned())),
        ScalarKind::DateTime => parse_date_time(name, raw).map(BoundValue::DateTime),
        ScalarKind::Date => parse_date(name, raw).map(BoundValue::Date),
        ScalarKind::Bytes | ScalarKind::FilePath => {
            Err(ExtractError::invalid(name, "uploaded files are not string values"))
        }
    }
}

fn parse<T>(name: &str, raw: &str) -> Result<T, ExtractError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ExtractError::invalid(name, e))
}

fn parse_date_time(name: &str, raw: &str) -> Result<OffsetDateTime, ExtractError> {
    OffsetDateTime::parse(raw, &Rfc3339).map_err(|e| ExtractError::invalid(name, e))
}

fn parse_date(name: &str, raw: &str) -> Result<Date, ExtractError> {
    Date::parse(raw, DATE_FORMAT).map_err(|e| ExtractError::invalid(name, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::PathParams;
    use http::Request;
    use time::macros::{date, datetime};

    fn parts_for(uri: &str) -> http::request::Parts {
        let (parts, ()) = Request::builder()
            .uri(uri)
            .header("x-request-id", "42")
            .header("cookie", "limit=7")
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn required_scalars_parse_from_the_query() {
        let parts = parts_for("/?count=5&ratio=2.5&flag=true&name=alpha");
        let ctx = RequestContext::new(&parts, PathParams::empty());

        assert_eq!(int64(&ctx, ValueSource::Query, "count").unwrap(), 5);
        assert_eq!(int32(&ctx, ValueSource::Query, "count").unwrap(), 5);
        assert_eq!(float64(&ctx, ValueSource::Query, "ratio").unwrap(), 2.5);
        assert!(boolean(&ctx, ValueSource::Query, "flag").unwrap());
        assert_eq!(string(&ctx, ValueSource::Query, "name").unwrap(), "alpha");
    }

    #[test]
    fn absent_required_scalars_report_missing() {
        let parts = parts_for("/");
        let ctx = RequestContext::new(&parts, PathParams::empty());

        let err = int64(&ctx, ValueSource::Query, "count").unwrap_err();
        assert!(err.is_missing());
    }

    #[test]
    fn malformed_scalars_report_invalid() {
        let parts = parts_for("/?count=abc");
        let ctx = RequestContext::new(&parts, PathParams::empty());

        let err = int64(&ctx, ValueSource::Query, "count").unwrap_err();
        assert!(matches!(err, ExtractError::InvalidParameter { .. }));
    }

    #[test]
    fn headers_and_cookies_are_first_class_sources() {
        let parts = parts_for("/");
        let ctx = RequestContext::new(&parts, PathParams::empty());

        assert_eq!(int64(&ctx, ValueSource::Header, "x-request-id").unwrap(), 42);
        assert_eq!(int32(&ctx, ValueSource::Cookie, "limit").unwrap(), 7);
    }

    #[test]
    fn optional_scalars_tolerate_absence_but_not_garbage() {
        let parts = parts_for("/?count=oops");
        let ctx = RequestContext::new(&parts, PathParams::empty());

        assert_eq!(optional::int64(&ctx, ValueSource::Query, "absent").unwrap(), None);
        assert!(optional::int64(&ctx, ValueSource::Query, "count").is_err());
        assert_eq!(optional::string(&ctx, ValueSource::Query, "absent"), None);
    }

    #[test]
    fn date_and_date_time_parse_standard_formats() {
        let parts = parts_for("/?at=2024-03-01T10:30:00Z&on=2024-03-01");
        let ctx = RequestContext::new(&parts, PathParams::empty());

        assert_eq!(date_time(&ctx, ValueSource::Query, "at").unwrap(), datetime!(2024-03-01 10:30:00 UTC));
        assert_eq!(date(&ctx, ValueSource::Query, "on").unwrap(), date!(2024 - 03 - 01));
    }

    #[test]
    fn repeated_values_collect_in_order() {
        let parts = parts_for("/?tag=a&tag=b&tag=c");
        let ctx = RequestContext::new(&parts, PathParams::empty());

        assert_eq!(strings(&ctx, ValueSource::Query, "tag").unwrap(), vec!["a", "b", "c"]);
        assert!(strings(&ctx, ValueSource::Query, "absent").unwrap_err().is_missing());
    }
}
