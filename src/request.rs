//! Request-side context handed to extraction and to handlers.
//!
//! [`RequestContext`] wraps the parsed request head together with the
//! path parameters produced by routing. It owns the lazily parsed query
//! multimap and gives the extractor library uniform access to query
//! parameters, headers, path variables, cookies and form fields.
//!
//! Multipart and urlencoded form payloads are parsed by the front end
//! before dispatch; the parsed [`FormData`] travels in the request
//! extensions and is only ever *read* here.

use std::path::PathBuf;

use http::request::Parts;
use http::{HeaderMap, Method, Uri, Version, header};
use matchit::Params;
use once_cell::sync::OnceCell;
use tracing::warn;

/// Context of one HTTP request: head, path parameters, parsed query.
///
/// The lifetimes tie the context to the routing table (`'server`) and to
/// the request data (`'req`) so no request state can leak past either.
pub struct RequestContext<'server: 'req, 'req> {
    head: &'req Parts,
    path_params: PathParams<'server, 'req>,
    query: OnceCell<Vec<(String, String)>>,
}

impl<'server, 'req> RequestContext<'server, 'req> {
    pub fn new(head: &'req Parts, path_params: PathParams<'server, 'req>) -> Self {
        Self { head, path_params, query: OnceCell::new() }
    }

    pub fn method(&self) -> &Method {
        &self.head.method
    }

    pub fn uri(&self) -> &Uri {
        &self.head.uri
    }

    pub fn version(&self) -> Version {
        self.head.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    pub fn path_params(&self) -> &PathParams<'server, 'req> {
        &self.path_params
    }

    /// All decoded query pairs, parsed once per request.
    pub fn query_pairs(&self) -> &[(String, String)] {
        self.query
            .get_or_init(|| {
                let Some(query) = self.head.uri.query() else {
                    return Vec::new();
                };
                match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
                    Ok(pairs) => pairs,
                    Err(e) => {
                        warn!(query, "failed to parse query string: {e}");
                        Vec::new()
                    }
                }
            })
            .as_slice()
    }

    /// Every value of a repeated query parameter, in request order.
    pub fn query_values<'s, 'n>(&'s self, name: &'n str) -> impl Iterator<Item = &'s str> + use<'s, 'n> {
        self.query_pairs().iter().filter(move |(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    /// First value of a query parameter, if present.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query_values(name).next()
    }

    /// First value of a header, when it is valid UTF-8.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Every UTF-8 value of a repeated header, in wire order.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.head.headers.get_all(name).iter().filter_map(|value| value.to_str().ok())
    }

    /// Value of a cookie from the `Cookie` request header.
    pub fn cookie_value(&self, name: &str) -> Option<&str> {
        let raw = self.header_value(header::COOKIE.as_str())?;
        raw.split(';').filter_map(|pair| pair.trim().split_once('=')).find(|(key, _)| *key == name).map(|(_, v)| v)
    }

    /// The form payload attached by the front end, if any.
    pub fn form(&self) -> Option<&FormData> {
        self.head.extensions.get::<FormData>()
    }

    /// An owned snapshot of the request head, suitable for handing into
    /// controller methods that asked for the request context itself.
    pub fn snapshot(&self) -> ContextView {
        ContextView {
            method: self.head.method.clone(),
            uri: self.head.uri.clone(),
            headers: self.head.headers.clone(),
            path_params: self
                .path_params
                .iter()
                .map(|(name, value)| (name.to_owned(), value.to_owned()))
                .collect(),
        }
    }
}

impl std::fmt::Debug for RequestContext<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.head.method)
            .field("uri", &self.head.uri)
            .finish_non_exhaustive()
    }
}

/// Path parameters matched out of the URL, e.g. `id` in `/items/{id}`.
#[derive(Debug, Clone)]
pub struct PathParams<'server, 'req> {
    kind: PathParamsKind<'server, 'req>,
}

#[derive(Debug, Clone)]
enum PathParamsKind<'server, 'req> {
    None,
    Params(Params<'server, 'req>),
}

impl<'server, 'req> PathParams<'server, 'req> {
    #[inline]
    pub fn empty() -> Self {
        Self { kind: PathParamsKind::None }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn len(&self) -> usize {
        match &self.kind {
            PathParamsKind::None => 0,
            PathParamsKind::Params(params) => params.len(),
        }
    }

    #[inline]
    pub fn get(&self, name: impl AsRef<str>) -> Option<&'req str> {
        match &self.kind {
            PathParamsKind::None => None,
            PathParamsKind::Params(params) => params.get(name),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'server str, &'req str)> + '_ {
        let params = match &self.kind {
            PathParamsKind::None => None,
            PathParamsKind::Params(params) => Some(params.iter()),
        };
        params.into_iter().flatten()
    }
}

impl<'server, 'req> From<Params<'server, 'req>> for PathParams<'server, 'req> {
    fn from(params: Params<'server, 'req>) -> Self {
        if params.is_empty() { Self::empty() } else { Self { kind: PathParamsKind::Params(params) } }
    }
}

/// Owned view of a request head.
///
/// This is what gets bound for a context-role parameter: controller
/// methods may stash it in a deferred computation, so it cannot borrow
/// from the request.
#[derive(Debug, Clone)]
pub struct ContextView {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    path_params: Vec<(String, String)>,
}

impl ContextView {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }
}

/// A parsed form payload: urlencoded fields and multipart file parts.
///
/// The front end parses the wire format and attaches this to the request
/// extensions; extraction only reads it.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    fields: Vec<(String, String)>,
    files: Vec<(String, FilePart)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    pub fn push_file(&mut self, name: impl Into<String>, part: FilePart) {
        self.files.push((name.into(), part));
    }

    /// Every value of a repeated field, in submission order.
    pub fn values<'s, 'n>(&'s self, name: &'n str) -> impl Iterator<Item = &'s str> + use<'s, 'n> {
        self.fields.iter().filter(move |(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.values(name).next()
    }

    pub fn file(&self, name: &str) -> Option<&FilePart> {
        self.files.iter().find(|(key, _)| key == name).map(|(_, part)| part)
    }
}

/// One uploaded file, already spooled to disk by the multipart parser.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub path: PathBuf,
}

impl FilePart {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { file_name: None, content_type: None, path: path.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Request;

    fn parts_for(uri: &str) -> Parts {
        let (parts, ()) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        parts
    }

    #[test]
    fn query_pairs_decode_repeats() {
        let parts = parts_for("/search?tag=a&tag=b&limit=10");
        let ctx = RequestContext::new(&parts, PathParams::empty());

        let tags: Vec<_> = ctx.query_values("tag").collect();
        assert_eq!(tags, vec!["a", "b"]);
        assert_eq!(ctx.query_value("limit"), Some("10"));
        assert_eq!(ctx.query_value("missing"), None);
    }

    #[test]
    fn query_values_are_percent_decoded() {
        let parts = parts_for("/search?q=hello%20world");
        let ctx = RequestContext::new(&parts, PathParams::empty());
        assert_eq!(ctx.query_value("q"), Some("hello world"));
    }

    #[test]
    fn cookie_values_come_from_the_cookie_header() {
        let (parts, ()) = Request::builder()
            .uri("/")
            .header(header::COOKIE, "session=abc123; theme=dark")
            .body(())
            .unwrap()
            .into_parts();
        let ctx = RequestContext::new(&parts, PathParams::empty());

        assert_eq!(ctx.cookie_value("session"), Some("abc123"));
        assert_eq!(ctx.cookie_value("theme"), Some("dark"));
        assert_eq!(ctx.cookie_value("other"), None);
    }

    #[test]
    fn form_data_is_read_from_extensions() {
        let mut form = FormData::new();
        form.push_field("name", "x");
        form.push_field("name", "y");
        form.push_file("upload", FilePart::new("/tmp/upload-1"));

        let mut request = Request::builder().uri("/submit").body(()).unwrap();
        request.extensions_mut().insert(form);
        let (parts, ()) = request.into_parts();

        let ctx = RequestContext::new(&parts, PathParams::empty());
        let form = ctx.form().unwrap();
        assert_eq!(form.values("name").collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(form.file("upload").unwrap().path, PathBuf::from("/tmp/upload-1"));
    }

    #[test]
    fn snapshot_is_owned_and_complete() {
        let parts = parts_for("/items/7?verbose=true");
        let ctx = RequestContext::new(&parts, PathParams::empty());
        let view = ctx.snapshot();

        assert_eq!(view.method(), &Method::GET);
        assert_eq!(view.uri().path(), "/items/7");
        assert_eq!(view.path_param("id"), None);
    }
}
