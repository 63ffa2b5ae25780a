//! Conversion of handler results and errors into HTTP responses.
//!
//! [`Responder`] is implemented by everything a custom handler (or an
//! error type) may want to turn into a response. The synthesized
//! handlers build their responses directly; this trait is the seam for
//! fallback handlers, decorators and error mapping.

use std::convert::Infallible;

use http::{Response, StatusCode};

use crate::body::ResponseBody;
use crate::error::ExtractError;
use crate::request::RequestContext;

/// A value that can be rendered as an HTTP response.
pub trait Responder {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody>;
}

impl<T: Responder, E: Responder> Responder for Result<T, E> {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        match self {
            Ok(t) => t.response_to(req),
            Err(e) => e.response_to(req),
        }
    }
}

impl<T: Responder> Responder for Option<T> {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        match self {
            Some(t) => t.response_to(req),
            None => Response::new(ResponseBody::empty()),
        }
    }
}

impl<B> Responder for Response<B>
where
    B: Into<ResponseBody>,
{
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        self.map(Into::into)
    }
}

impl<T: Responder> Responder for (StatusCode, T) {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        let (status, responder) = self;
        let mut response = responder.response_to(req);
        *response.status_mut() = status;
        response
    }
}

impl Responder for () {
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        Response::new(ResponseBody::empty())
    }
}

impl Responder for &'static str {
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        text_response(StatusCode::OK, ResponseBody::from(self))
    }
}

impl Responder for String {
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        text_response(StatusCode::OK, ResponseBody::from(self))
    }
}

impl Responder for Infallible {
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        match self {}
    }
}

/// Extraction failures render as client errors with a plain-text reason.
impl Responder for ExtractError {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        (StatusCode::BAD_REQUEST, self.to_string()).response_to(req)
    }
}

fn text_response(status: StatusCode, body: ResponseBody) -> Response<ResponseBody> {
    let mut builder = Response::builder().status(status);
    if let Some(headers) = builder.headers_mut() {
        headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static(mime::TEXT_PLAIN_UTF_8.as_ref()),
        );
    }
    builder.body(body).unwrap_or_else(|_| Response::new(ResponseBody::empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::PathParams;
    use http::Request;

    fn ctx_parts() -> http::request::Parts {
        let (parts, ()) = Request::builder().uri("/").body(()).unwrap().into_parts();
        parts
    }

    #[test]
    fn string_responds_as_plain_text() {
        let parts = ctx_parts();
        let ctx = RequestContext::new(&parts, PathParams::empty());

        let response = "hello".response_to(&ctx);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[http::header::CONTENT_TYPE], mime::TEXT_PLAIN_UTF_8.as_ref());
    }

    #[test]
    fn status_tuple_overrides_status() {
        let parts = ctx_parts();
        let ctx = RequestContext::new(&parts, PathParams::empty());

        let response = (StatusCode::CREATED, "made").response_to(&ctx);
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[test]
    fn extract_error_is_a_client_error() {
        let parts = ctx_parts();
        let ctx = RequestContext::new(&parts, PathParams::empty());

        let response = ExtractError::missing("id").response_to(&ctx);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
