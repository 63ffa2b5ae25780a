//! Request and response body plumbing.
//!
//! [`OptionReqBody`] is a consume-once view over the inbound request
//! body: whole-body extraction strategies take it exactly once, and a
//! second attempt reports [`ExtractError::BodyConsumed`] instead of
//! hanging or re-reading. [`ResponseBody`] is the single body type every
//! handler produces, either a one-shot byte chunk or a boxed stream.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Body as HttpBody, Frame, SizeHint};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use tokio::sync::Mutex;

use crate::error::{BoxError, ExtractError};

/// The inbound request body as handed over by the front end.
pub type ReqBody = BoxBody<Bytes, BoxError>;

/// A request body that can be consumed at most once.
///
/// Cloning is cheap and shares the underlying slot, so the body can be
/// threaded through every binding step while only the whole-body
/// strategy actually takes it.
#[derive(Clone)]
pub struct OptionReqBody {
    inner: Arc<Mutex<Option<ReqBody>>>,
}

impl OptionReqBody {
    /// A body slot with an empty payload.
    pub fn empty() -> Self {
        Self::from(Bytes::new())
    }

    /// Whether the body is still available for consumption.
    pub async fn can_consume(&self) -> bool {
        let guard = self.inner.lock().await;
        guard.is_some()
    }

    /// Takes the body out of the slot and hands it to `f`.
    pub async fn apply<T, F, Fut>(&self, f: F) -> Result<T, ExtractError>
    where
        F: FnOnce(ReqBody) -> Fut,
        Fut: Future<Output = Result<T, ExtractError>>,
    {
        let mut guard = self.inner.lock().await;
        let Some(req_body) = guard.take() else {
            return Err(ExtractError::BodyConsumed);
        };
        drop(guard);

        f(req_body).await
    }

    /// Collects the whole body into one contiguous buffer.
    pub async fn collect_bytes(&self) -> Result<Bytes, ExtractError> {
        self.apply(|body| async {
            body.collect().await.map(|collected| collected.to_bytes()).map_err(ExtractError::invalid_body)
        })
        .await
    }
}

impl std::fmt::Debug for OptionReqBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionReqBody").finish_non_exhaustive()
    }
}

impl From<ReqBody> for OptionReqBody {
    fn from(body: ReqBody) -> Self {
        OptionReqBody { inner: Arc::new(Mutex::new(Some(body))) }
    }
}

impl From<Bytes> for OptionReqBody {
    fn from(bytes: Bytes) -> Self {
        let body = BoxBody::new(Full::new(bytes).map_err(|never| match never {}));
        OptionReqBody::from(body)
    }
}

impl From<&'static str> for OptionReqBody {
    fn from(value: &'static str) -> Self {
        OptionReqBody::from(Bytes::from_static(value.as_bytes()))
    }
}

impl From<String> for OptionReqBody {
    fn from(value: String) -> Self {
        OptionReqBody::from(Bytes::from(value))
    }
}

/// The body of every response a handler produces.
pub struct ResponseBody {
    inner: Kind,
}

enum Kind {
    Once(Option<Bytes>),
    Stream(BoxBody<Bytes, BoxError>),
}

impl ResponseBody {
    pub fn empty() -> Self {
        Self { inner: Kind::Once(None) }
    }

    pub fn once(bytes: Bytes) -> Self {
        Self { inner: Kind::Once(Some(bytes)) }
    }

    pub fn stream<B>(body: B) -> Self
    where
        B: HttpBody<Data = Bytes, Error = BoxError> + Send + Sync + 'static,
    {
        Self { inner: Kind::Stream(BoxBody::new(body)) }
    }
}

impl std::fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            Kind::Once(bytes) => f.debug_tuple("ResponseBody::Once").field(&bytes.as_ref().map(Bytes::len)).finish(),
            Kind::Stream(_) => f.debug_tuple("ResponseBody::Stream").finish(),
        }
    }
}

impl From<String> for ResponseBody {
    fn from(value: String) -> Self {
        if value.is_empty() { Self::empty() } else { Self::once(Bytes::from(value)) }
    }
}

impl From<&'static str> for ResponseBody {
    fn from(value: &'static str) -> Self {
        if value.is_empty() { Self::empty() } else { Self::once(Bytes::from_static(value.as_bytes())) }
    }
}

impl From<Bytes> for ResponseBody {
    fn from(bytes: Bytes) -> Self {
        Self::once(bytes)
    }
}

impl From<()> for ResponseBody {
    fn from((): ()) -> Self {
        Self::empty()
    }
}

impl HttpBody for ResponseBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match &mut self.get_mut().inner {
            Kind::Once(option_bytes) => Poll::Ready(option_bytes.take().map(|bytes| Ok(Frame::data(bytes)))),
            Kind::Stream(box_body) => Pin::new(box_body).poll_frame(cx),
        }
    }

    fn is_end_stream(&self) -> bool {
        match &self.inner {
            Kind::Once(option_bytes) => option_bytes.is_none(),
            Kind::Stream(box_body) => box_body.is_end_stream(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match &self.inner {
            Kind::Once(None) => SizeHint::with_exact(0),
            Kind::Once(Some(bytes)) => SizeHint::with_exact(bytes.len() as u64),
            Kind::Stream(box_body) => box_body.size_hint(),
        }
    }
}
