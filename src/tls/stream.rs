use std::{
    error::Error as StdError,
    fmt,
    future::Future,
    io,
    pin::Pin,
    task::{ready, Context, Poll},
};

use futures_util::future::BoxFuture;
use log::trace;
use tokio::{
    io::{AsyncRead, AsyncWrite, ReadBuf},
    net::TcpStream,
};
use tokio_boring::SslStream;

type Handshaking = BoxFuture<'static, io::Result<SslStream<TcpStream>>>;

/// A client TLS stream whose handshake may still be pending.
///
/// A stream returned for a preset fingerprint starts out un-handshaken: the
/// handshake runs the first time the stream is read from or written to.
/// Custom fingerprints are handshaken by the dialer before the stream is
/// handed out. [`TlsStream::is_established`] tells the two apart.
pub struct TlsStream {
    state: State,
}

enum State {
    Handshaking(Handshaking),
    Streaming(SslStream<TcpStream>),
    Failed,
}

impl TlsStream {
    pub(crate) fn new<F>(handshake: F) -> TlsStream
    where
        F: Future<Output = io::Result<SslStream<TcpStream>>> + Send + 'static,
    {
        TlsStream {
            state: State::Handshaking(Box::pin(handshake)),
        }
    }

    /// Returns true once the TLS handshake has completed.
    pub fn is_established(&self) -> bool {
        matches!(self.state, State::Streaming(_))
    }

    /// The protocol selected through ALPN, if the handshake has completed and
    /// the server picked one.
    pub fn negotiated_alpn(&self) -> Option<&[u8]> {
        match &self.state {
            State::Streaming(stream) => stream.ssl().selected_alpn_protocol(),
            _ => None,
        }
    }

    /// Drive the handshake to completion now.
    pub async fn handshake(&mut self) -> io::Result<()> {
        std::future::poll_fn(|cx| self.poll_established(cx).map_ok(|_| ())).await
    }

    fn poll_established(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<&mut SslStream<TcpStream>>> {
        if let State::Handshaking(handshake) = &mut self.state {
            match ready!(handshake.as_mut().poll(cx)) {
                Ok(stream) => {
                    trace!("tls handshake complete");
                    self.state = State::Streaming(stream);
                }
                Err(err) => {
                    self.state = State::Failed;
                    return Poll::Ready(Err(err));
                }
            }
        }

        match &mut self.state {
            State::Streaming(stream) => Poll::Ready(Ok(stream)),
            _ => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::NotConnected,
                HandshakeFailed("handshake failed earlier on this connection".into()),
            ))),
        }
    }
}

impl AsyncRead for TlsStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let stream = ready!(self.get_mut().poll_established(cx))?;
        Pin::new(stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for TlsStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let stream = ready!(self.get_mut().poll_established(cx))?;
        Pin::new(stream).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().state {
            State::Streaming(stream) => Pin::new(stream).poll_flush(cx),
            // nothing has been written yet
            _ => Poll::Ready(Ok(())),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().state {
            State::Streaming(stream) => Pin::new(stream).poll_shutdown(cx),
            _ => Poll::Ready(Ok(())),
        }
    }
}

impl fmt::Debug for TlsStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            State::Handshaking(_) => "handshaking",
            State::Streaming(_) => "established",
            State::Failed => "failed",
        };
        f.debug_struct("TlsStream").field("state", &state).finish()
    }
}

/// The io error payload of a failed TLS handshake.
#[derive(Debug)]
pub(crate) struct HandshakeFailed(pub(crate) String);

impl fmt::Display for HandshakeFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tls handshake failed: {}", self.0)
    }
}

impl StdError for HandshakeFailed {}

/// Returns true if `err`, or anything it wraps, is a failed TLS handshake.
///
/// `io::Error` hides a custom payload from `source()`, so the payload is
/// inspected explicitly.
pub(crate) fn is_handshake_failure(err: &(dyn StdError + 'static)) -> bool {
    let mut cause = Some(err);
    while let Some(err) = cause {
        if err.is::<HandshakeFailed>() {
            return true;
        }
        if let Some(io) = err.downcast_ref::<io::Error>() {
            if io.get_ref().map_or(false, |inner| inner.is::<HandshakeFailed>()) {
                return true;
            }
        }
        if let Some(h2) = err.downcast_ref::<h2::Error>() {
            if let Some(io) = h2.get_io() {
                if io.get_ref().map_or(false, |inner| inner.is::<HandshakeFailed>()) {
                    return true;
                }
            }
        }
        cause = err.source();
    }
    false
}
