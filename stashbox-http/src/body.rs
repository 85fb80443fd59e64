//! Bodies that can be buffered for storing and replayed afterwards.
//!
//! A response body must be read in full before it can be stored, and the
//! caller still has to receive exactly what upstream sent. [`BufferedBody`]
//! tracks which of three states a body is in:
//!
//! - **Passthrough**: not touched yet, streamed straight from upstream
//! - **Complete**: read in full, or rebuilt from a stored entry
//! - **Failed**: reading stopped on an error; the error is replayed to the
//!   caller as the body's only frame

use bytes::{Buf, Bytes};
use http_body::{Body as HttpBody, Frame, SizeHint};
use pin_project::pin_project;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

/// HTTP body in one of the buffering states.
#[pin_project(project = BufferedBodyProj)]
pub enum BufferedBody<B>
where
    B: HttpBody,
{
    /// Fully buffered bytes, yielded once.
    Complete(Option<Bytes>),

    /// A read error, yielded once. The bytes read before it are gone.
    Failed(Option<B::Error>),

    /// Untouched upstream body.
    Passthrough(#[pin] B),
}

impl<B> BufferedBody<B>
where
    B: HttpBody,
{
    /// Wraps an untouched body.
    pub fn passthrough(body: B) -> Self {
        BufferedBody::Passthrough(body)
    }

    /// Body made of `bytes`.
    pub fn complete(bytes: impl Into<Bytes>) -> Self {
        BufferedBody::Complete(Some(bytes.into()))
    }

    /// Reads the whole body.
    ///
    /// On error the body becomes [`BufferedBody::Failed`] so that the error
    /// still reaches whoever reads it next.
    pub async fn collect(self) -> Result<Bytes, Self> {
        use http_body_util::BodyExt;

        match self {
            BufferedBody::Complete(bytes) => Ok(bytes.unwrap_or_default()),
            BufferedBody::Failed(error) => Err(BufferedBody::Failed(error)),
            BufferedBody::Passthrough(body) => match body.collect().await {
                Ok(collected) => Ok(collected.to_bytes()),
                Err(error) => Err(BufferedBody::Failed(Some(error))),
            },
        }
    }
}

impl<B> HttpBody for BufferedBody<B>
where
    B: HttpBody,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.project() {
            BufferedBodyProj::Complete(data) => Poll::Ready(data.take().map(|bytes| Ok(Frame::data(bytes)))),
            BufferedBodyProj::Failed(error) => Poll::Ready(error.take().map(Err)),
            BufferedBodyProj::Passthrough(body) => match body.poll_frame(cx) {
                Poll::Ready(Some(Ok(frame))) => {
                    let frame = frame.map_data(|mut data| data.copy_to_bytes(data.remaining()));
                    Poll::Ready(Some(Ok(frame)))
                }
                Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e))),
                Poll::Ready(None) => Poll::Ready(None),
                Poll::Pending => Poll::Pending,
            },
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            BufferedBody::Complete(Some(bytes)) => SizeHint::with_exact(bytes.len() as u64),
            BufferedBody::Complete(None) | BufferedBody::Failed(_) => SizeHint::with_exact(0),
            BufferedBody::Passthrough(body) => body.size_hint(),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            BufferedBody::Complete(data) => data.is_none(),
            BufferedBody::Failed(error) => error.is_none(),
            BufferedBody::Passthrough(body) => body.is_end_stream(),
        }
    }
}

impl<B> fmt::Debug for BufferedBody<B>
where
    B: HttpBody,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferedBody::Complete(Some(bytes)) => f
                .debug_tuple("Complete")
                .field(&format!("{} bytes", bytes.len()))
                .finish(),
            BufferedBody::Complete(None) => f.debug_tuple("Complete").field(&"consumed").finish(),
            BufferedBody::Failed(error) => f
                .debug_tuple("Failed")
                .field(&if error.is_some() { "pending" } else { "consumed" })
                .finish(),
            BufferedBody::Passthrough(_) => f.debug_tuple("Passthrough").field(&"...").finish(),
        }
    }
}
