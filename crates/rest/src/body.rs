use crate::error::{BoxError, HttpError};
use bytes::Bytes;
use http_body::Body as HttpBody;
use http_body::{Frame, SizeHint};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full};
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::Mutex;

/// The request body type handed to the router.
pub type ReqBody = UnsyncBoxBody<Bytes, BoxError>;

/// A shareable handle to the request body.
///
/// Several extractors may ask for the body of the same request (a payload validator and the
/// handler's `Json` argument, for instance), so the first read buffers it and later reads get
/// the buffered bytes.
#[derive(Clone)]
pub struct OptionReqBody {
    inner: Arc<Mutex<BodyState>>,
}

enum BodyState {
    Pending(ReqBody),
    Buffered(Bytes),
    Consumed,
}

impl From<ReqBody> for OptionReqBody {
    fn from(body: ReqBody) -> Self {
        OptionReqBody { inner: Arc::new(Mutex::new(BodyState::Pending(body))) }
    }
}

impl OptionReqBody {
    pub fn empty() -> Self {
        Self::from_bytes(Bytes::new())
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        OptionReqBody { inner: Arc::new(Mutex::new(BodyState::Buffered(bytes.into()))) }
    }

    /// Wraps any body whose error converts into [`BoxError`].
    pub fn from_body<B>(body: B) -> Self
    where
        B: HttpBody<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        Self::from(body.map_err(Into::into).boxed_unsync())
    }

    pub async fn can_consume(&self) -> bool {
        let guard = self.inner.lock().await;
        !matches!(*guard, BodyState::Consumed)
    }

    /// Reads the whole body, buffering it for later readers.
    pub async fn bytes(&self) -> Result<Bytes, BoxError> {
        let mut guard = self.inner.lock().await;
        let state = std::mem::replace(&mut *guard, BodyState::Consumed);
        let bytes = match state {
            BodyState::Buffered(bytes) => bytes,
            BodyState::Pending(body) => body.collect().await?.to_bytes(),
            BodyState::Consumed => return Err(HttpError::bad_request("body has been consumed").into()),
        };
        *guard = BodyState::Buffered(bytes.clone());
        Ok(bytes)
    }

    /// Takes the raw body out, leaving nothing for later readers.
    pub async fn take(&self) -> Option<ReqBody> {
        let mut guard = self.inner.lock().await;
        match std::mem::replace(&mut *guard, BodyState::Consumed) {
            BodyState::Pending(body) => Some(body),
            BodyState::Buffered(bytes) => Some(Full::new(bytes).map_err(|never| -> BoxError { match never {} }).boxed_unsync()),
            BodyState::Consumed => None,
        }
    }
}

impl fmt::Debug for OptionReqBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionReqBody").finish_non_exhaustive()
    }
}

pub struct ResponseBody {
    inner: Kind,
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Kind::Once(bytes) => f.debug_tuple("ResponseBody::Once").field(bytes).finish(),
            Kind::Stream(_) => f.write_str("ResponseBody::Stream"),
        }
    }
}

enum Kind {
    Once(Option<Bytes>),
    Stream(UnsyncBoxBody<Bytes, BoxError>),
}

impl ResponseBody {
    pub fn empty() -> Self {
        Self { inner: Kind::Once(None) }
    }

    pub fn once(bytes: Bytes) -> Self {
        if bytes.is_empty() { Self::empty() } else { Self { inner: Kind::Once(Some(bytes)) } }
    }

    pub fn stream<B>(body: B) -> Self
    where
        B: HttpBody<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        Self { inner: Kind::Stream(body.map_err(Into::into).boxed_unsync()) }
    }
}

impl From<String> for ResponseBody {
    fn from(value: String) -> Self {
        Self::once(Bytes::from(value))
    }
}

impl From<Vec<u8>> for ResponseBody {
    fn from(value: Vec<u8>) -> Self {
        Self::once(Bytes::from(value))
    }
}

impl From<Bytes> for ResponseBody {
    fn from(value: Bytes) -> Self {
        Self::once(value)
    }
}

impl From<()> for ResponseBody {
    fn from((): ()) -> Self {
        Self::empty()
    }
}

impl From<Option<Bytes>> for ResponseBody {
    fn from(option: Option<Bytes>) -> Self {
        match option {
            Some(bytes) => Self::once(bytes),
            None => Self::empty(),
        }
    }
}

impl From<&'static str> for ResponseBody {
    fn from(value: &'static str) -> Self {
        Self::once(Bytes::from_static(value.as_bytes()))
    }
}

impl HttpBody for ResponseBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let kind = &mut self.get_mut().inner;
        match kind {
            Kind::Once(option_bytes) => Poll::Ready(option_bytes.take().map(|bytes| Ok(Frame::data(bytes)))),
            Kind::Stream(box_body) => {
                let pin = Pin::new(box_body);
                pin.poll_frame(cx)
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        let kind = &self.inner;
        match kind {
            Kind::Once(option_bytes) => option_bytes.is_none(),
            Kind::Stream(box_body) => box_body.is_end_stream(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        let kind = &self.inner;
        match kind {
            Kind::Once(None) => SizeHint::with_exact(0),
            Kind::Once(Some(bytes)) => SizeHint::with_exact(bytes.len() as u64),
            Kind::Stream(box_body) => box_body.size_hint(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::body::{OptionReqBody, ResponseBody};
    use bytes::Bytes;
    use http_body::{Body as HttpBody, Frame};
    use http_body_util::{BodyExt, Full, StreamBody};
    use std::io;

    fn check_send<T: Send>() {}

    #[test]
    fn is_send() {
        check_send::<ResponseBody>();
        check_send::<OptionReqBody>();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_string_body() {
        let s = "Hello world".to_string();
        let len = s.len() as u64;

        let mut body = ResponseBody::from(s);

        assert_eq!(body.size_hint().exact(), Some(len));
        assert!(!body.is_end_stream());

        let bytes = body.frame().await.unwrap().unwrap().into_data().unwrap();
        assert_eq!(bytes, Bytes::from("Hello world"));

        assert!(body.is_end_stream());
        assert!(body.frame().await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_empty_body() {
        let mut body = ResponseBody::from("");

        assert!(body.is_end_stream());
        assert_eq!(body.size_hint().exact(), Some(0));

        assert!(body.frame().await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_stream_body() {
        let chunks: Vec<Result<_, io::Error>> = vec![
            Ok(Frame::data(Bytes::from(vec![1]))),
            Ok(Frame::data(Bytes::from(vec![2]))),
            Ok(Frame::data(Bytes::from(vec![3]))),
        ];
        let mut body = ResponseBody::stream(StreamBody::new(futures::stream::iter(chunks)));

        assert!(body.size_hint().exact().is_none());
        assert_eq!(body.frame().await.unwrap().unwrap().into_data().unwrap().as_ref(), [1]);
        assert_eq!(body.frame().await.unwrap().unwrap().into_data().unwrap().as_ref(), [2]);
        assert_eq!(body.frame().await.unwrap().unwrap().into_data().unwrap().as_ref(), [3]);
        assert!(body.frame().await.is_none());
    }

    #[tokio::test]
    async fn test_request_body_is_buffered_for_later_reads() {
        let body = OptionReqBody::from_body(Full::new(Bytes::from_static(b"{\"task\":\"x\"}")));

        assert!(body.can_consume().await);
        assert_eq!(body.bytes().await.unwrap(), Bytes::from_static(b"{\"task\":\"x\"}"));
        assert_eq!(body.clone().bytes().await.unwrap(), Bytes::from_static(b"{\"task\":\"x\"}"));
    }

    #[tokio::test]
    async fn test_taken_body_cannot_be_read_again() {
        let body = OptionReqBody::from_bytes("abc");

        assert!(body.take().await.is_some());
        assert!(!body.can_consume().await);
        assert!(body.bytes().await.is_err());
    }
}
