//! File extraction from multipart form attachments.
//!
//! Both getters read the [`FormData`](crate::request::FormData) the
//! front end attached after parsing the multipart payload. Reading the
//! spooled file back into memory touches the filesystem, which is why
//! the corresponding strategies classify their handler as blocking.

use std::path::PathBuf;

use bytes::Bytes;

use crate::error::ExtractError;
use crate::request::RequestContext;

/// The on-disk location of an uploaded file.
pub fn file_path(ctx: &RequestContext<'_, '_>, name: &str) -> Result<PathBuf, ExtractError> {
    ctx.form()
        .and_then(|form| form.file(name))
        .map(|part| part.path.clone())
        .ok_or_else(|| ExtractError::missing(name))
}

/// The contents of an uploaded file, read into one buffer.
pub fn byte_buffer(ctx: &RequestContext<'_, '_>, name: &str) -> Result<Bytes, ExtractError> {
    let path = file_path(ctx, name)?;
    std::fs::read(&path).map(Bytes::from).map_err(|e| ExtractError::invalid(name, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{FilePart, FormData, PathParams};
    use http::Request;
    use std::io::Write;

    fn parts_with_form(form: FormData) -> http::request::Parts {
        let mut request = Request::builder().uri("/upload").body(()).unwrap();
        request.extensions_mut().insert(form);
        let (parts, ()) = request.into_parts();
        parts
    }

    fn spool_temp_file(content: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("routewright-test-{}", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    #[test]
    fn file_path_reads_the_attachment() {
        let mut form = FormData::new();
        form.push_file("doc", FilePart::new("/tmp/spooled-doc"));

        let parts = parts_with_form(form);
        let ctx = RequestContext::new(&parts, PathParams::empty());

        assert_eq!(file_path(&ctx, "doc").unwrap(), PathBuf::from("/tmp/spooled-doc"));
        assert!(file_path(&ctx, "other").unwrap_err().is_missing());
    }

    #[test]
    fn missing_form_counts_as_missing_parameter() {
        let (parts, ()) = Request::builder().uri("/upload").body(()).unwrap().into_parts();
        let ctx = RequestContext::new(&parts, PathParams::empty());

        assert!(file_path(&ctx, "doc").unwrap_err().is_missing());
    }

    #[test]
    fn byte_buffer_reads_the_spooled_file() {
        let path = spool_temp_file(b"uploaded bytes");
        let mut form = FormData::new();
        form.push_file("doc", FilePart::new(&path));

        let parts = parts_with_form(form);
        let ctx = RequestContext::new(&parts, PathParams::empty());

        let bytes = byte_buffer(&ctx, "doc").unwrap();
        assert_eq!(bytes, Bytes::from_static(b"uploaded bytes"));

        let _ = std::fs::remove_file(path);
    }
}
