//! Whole-body model binding.
//!
//! The wire format is chosen by inspecting the request's content-type
//! header: a JSON media type selects JSON, anything else selects XML.
//! The typed [`model`] function is the directly callable surface; the
//! synthesized handlers go through the registered binder instead.

use http::header;
use serde::de::DeserializeOwned;

use crate::body::OptionReqBody;
use crate::error::ExtractError;
use crate::registry::ModelFormat;
use crate::request::RequestContext;

/// The model format implied by the request's content type.
pub fn model_format(ctx: &RequestContext<'_, '_>) -> ModelFormat {
    let is_json = ctx
        .header_value(header::CONTENT_TYPE.as_str())
        .is_some_and(|value| value.contains(mime::APPLICATION_JSON.as_ref()));
    if is_json { ModelFormat::Json } else { ModelFormat::Xml }
}

/// Collects the body and deserializes it as the content type dictates.
pub async fn model<T>(ctx: &RequestContext<'_, '_>, body: &OptionReqBody) -> Result<T, ExtractError>
where
    T: DeserializeOwned,
{
    let bytes = body.collect_bytes().await?;
    match model_format(ctx) {
        ModelFormat::Json => serde_json::from_slice(&bytes).map_err(ExtractError::invalid_body),
        ModelFormat::Xml => {
            let text = std::str::from_utf8(&bytes).map_err(ExtractError::invalid_body)?;
            quick_xml::de::from_str(text).map_err(ExtractError::invalid_body)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::PathParams;
    use http::Request;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Item {
        name: String,
    }

    fn parts_with_content_type(value: &str) -> http::request::Parts {
        let (parts, ()) = Request::builder()
            .uri("/items")
            .header(header::CONTENT_TYPE, value)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn json_content_type_selects_json() {
        let parts = parts_with_content_type("application/json; charset=utf-8");
        let ctx = RequestContext::new(&parts, PathParams::empty());
        assert_eq!(model_format(&ctx), ModelFormat::Json);
    }

    #[test]
    fn anything_else_selects_xml() {
        let parts = parts_with_content_type("application/xml");
        let ctx = RequestContext::new(&parts, PathParams::empty());
        assert_eq!(model_format(&ctx), ModelFormat::Xml);

        let (parts, ()) = Request::builder().uri("/items").body(()).unwrap().into_parts();
        let ctx = RequestContext::new(&parts, PathParams::empty());
        assert_eq!(model_format(&ctx), ModelFormat::Xml);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn json_body_deserializes() {
        let parts = parts_with_content_type("application/json");
        let ctx = RequestContext::new(&parts, PathParams::empty());

        let body = OptionReqBody::from(r#"{"name":"x"}"#);
        let item: Item = model(&ctx, &body).await.unwrap();
        assert_eq!(item, Item { name: "x".into() });
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn xml_body_deserializes() {
        let parts = parts_with_content_type("application/xml");
        let ctx = RequestContext::new(&parts, PathParams::empty());

        let body = OptionReqBody::from("<Item><name>x</name></Item>");
        let item: Item = model(&ctx, &body).await.unwrap();
        assert_eq!(item, Item { name: "x".into() });
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn malformed_body_is_an_invalid_body_error() {
        let parts = parts_with_content_type("application/json");
        let ctx = RequestContext::new(&parts, PathParams::empty());

        let body = OptionReqBody::from("{oops");
        let err = model::<Item>(&ctx, &body).await.unwrap_err();
        assert!(matches!(err, ExtractError::InvalidBody { .. }));
    }
}
