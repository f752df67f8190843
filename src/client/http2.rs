use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use bytes::{Bytes, BytesMut};
use h2::client::SendRequest;
use http::{
    header::{CONNECTION, HOST, TE, TRANSFER_ENCODING, UPGRADE},
    uri::Scheme,
    HeaderMap, Request, Response, Uri, Version,
};
use log::{debug, trace};

use crate::{
    connect::{Dialer, MaybeHttpsStream},
    error::{BadScheme, Error, H2NotNegotiated},
    http2::Http2FrameConfig,
    tls::is_handshake_failure,
};

/// An HTTP/2 client on top of `h2`, one connection per origin.
pub(crate) struct Http2Client {
    dialer: Dialer,
    frames: Arc<Http2FrameConfig>,
    allow_http: bool,
    connections: Mutex<HashMap<String, SendRequest<Bytes>>>,
}

impl Http2Client {
    pub(crate) fn new(dialer: Dialer, frames: Http2FrameConfig, allow_http: bool) -> Http2Client {
        Http2Client {
            dialer,
            frames: Arc::new(frames),
            allow_http,
            connections: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) async fn send(&self, req: Request<Bytes>) -> crate::Result<Response<Bytes>> {
        let key = self.origin(req.uri())?;
        let sender = self.sender(&key, req.uri()).await?;
        send_request(sender, req).await
    }

    /// Drop every cached connection. Open streams finish on their own.
    pub(crate) fn close_idle_connections(&self) {
        let mut connections = self.lock();
        if !connections.is_empty() {
            debug!("closing {} http2 connection(s)", connections.len());
        }
        connections.clear();
    }

    fn origin(&self, uri: &Uri) -> crate::Result<String> {
        let scheme = uri.scheme().ok_or_else(|| Error::request(BadScheme))?;
        if *scheme != Scheme::HTTPS && !(*scheme == Scheme::HTTP && self.allow_http) {
            return Err(Error::request(BadScheme));
        }
        let authority = uri.authority().ok_or_else(|| Error::request(BadScheme))?;
        Ok(format!("{scheme}://{authority}"))
    }

    async fn sender(&self, key: &str, uri: &Uri) -> crate::Result<SendRequest<Bytes>> {
        let cached = self.lock().get(key).cloned();
        if let Some(sender) = cached {
            match sender.ready().await {
                Ok(sender) => return Ok(sender),
                Err(e) => {
                    debug!("cached http2 connection to {key} unusable: {e}");
                    self.lock().remove(key);
                }
            }
        }

        let mut io = self.dialer.connect(uri).await?;
        if let MaybeHttpsStream::Https(_) = io {
            io.establish().await?;
            if !io.negotiated_h2() {
                debug!("{key} did not select h2 over ALPN");
                return Err(Error::request(H2NotNegotiated));
            }
        }

        let sender = handshake(&self.frames, io, key).await?;
        self.lock().insert(key.to_owned(), sender.clone());
        trace!("http2 connection to {key} ready");
        Ok(sender)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SendRequest<Bytes>>> {
        self.connections.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Speak HTTP/2 on `io` with the preamble of `frames`. The connection task
/// runs until every sender is dropped.
pub(super) async fn handshake(
    frames: &Http2FrameConfig,
    io: MaybeHttpsStream,
    origin: &str,
) -> crate::Result<SendRequest<Bytes>> {
    let (sender, conn) = frames
        .client_builder()
        .handshake::<_, Bytes>(io)
        .await
        .map_err(h2_error)?;

    let origin = origin.to_owned();
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!("http2 connection to {origin} closed: {e}");
        }
    });

    sender.ready().await.map_err(h2_error)
}

/// Send `req` on a ready connection and read the whole response.
pub(super) async fn send_request(
    mut sender: SendRequest<Bytes>,
    req: Request<Bytes>,
) -> crate::Result<Response<Bytes>> {
    let (mut parts, body) = req.into_parts();
    strip_connection_headers(&mut parts.headers);
    parts.version = Version::HTTP_2;

    let end_of_stream = body.is_empty();
    let (response, mut stream) = sender
        .send_request(Request::from_parts(parts, ()), end_of_stream)
        .map_err(h2_error)?;
    if !end_of_stream {
        stream.send_data(body, true).map_err(h2_error)?;
    }

    let (parts, mut body) = response.await.map_err(h2_error)?.into_parts();
    trace!("http2 response {}", parts.status);

    let mut buf = BytesMut::new();
    while let Some(chunk) = body.data().await {
        let chunk = chunk.map_err(Error::body)?;
        body.flow_control()
            .release_capacity(chunk.len())
            .map_err(Error::body)?;
        buf.extend_from_slice(&chunk);
    }
    Ok(Response::from_parts(parts, buf.freeze()))
}

fn strip_connection_headers(headers: &mut HeaderMap) {
    for name in [CONNECTION, TRANSFER_ENCODING, UPGRADE, HOST] {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers.remove("proxy-connection");

    let te_trailers = headers
        .get(TE)
        .map_or(true, |te| te.as_bytes().eq_ignore_ascii_case(b"trailers"));
    if !te_trailers {
        headers.remove(TE);
    }
}

fn h2_error(err: h2::Error) -> Error {
    if is_handshake_failure(&err) {
        Error::tls(err)
    } else {
        Error::request(err)
    }
}
