use std::sync::Arc;

use bytes::Bytes;
use http::{
    header::{HeaderValue, CONNECTION, HOST},
    uri::{PathAndQuery, Scheme},
    Request, Response, Uri,
};
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use log::{debug, trace};

use super::http2;
use crate::{
    connect::Dialer,
    error::{BadScheme, Error},
    http2::Http2FrameConfig,
    tls::is_handshake_failure,
};

/// An HTTP/1.1 client that opens a fresh connection for every request.
///
/// With `h2_frames` set the TLS stream may negotiate `h2`, in which case the
/// request goes out over HTTP/2 with that preamble instead.
pub(crate) struct Http1Client {
    dialer: Dialer,
    h2_frames: Option<Arc<Http2FrameConfig>>,
}

impl Http1Client {
    pub(crate) fn new(dialer: Dialer, h2_frames: Option<Http2FrameConfig>) -> Http1Client {
        Http1Client {
            dialer,
            h2_frames: h2_frames.map(Arc::new),
        }
    }

    pub(crate) async fn send(&self, mut req: Request<Bytes>) -> crate::Result<Response<Bytes>> {
        let mut io = self.dialer.connect(req.uri()).await?;

        if let Some(frames) = &self.h2_frames {
            io.establish().await?;
            if io.negotiated_h2() {
                let origin = origin(req.uri())?;
                debug!("{origin} selected h2, sending over http2");
                let sender = http2::handshake(frames, io, &origin).await?;
                return http2::send_request(sender, req).await;
            }
        }

        let host = host_header(req.uri())?;
        req.headers_mut().entry(HOST).or_insert(host);
        req.headers_mut()
            .insert(CONNECTION, HeaderValue::from_static("close"));
        *req.uri_mut() = origin_form(req.uri());

        let (mut sender, conn) = http1::handshake(TokioIo::new(io))
            .await
            .map_err(hyper_error)?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!("http1 connection closed: {e}");
            }
        });

        let res = sender
            .send_request(req.map(Full::new))
            .await
            .map_err(hyper_error)?;
        trace!("http1 response {:?} {}", res.version(), res.status());

        let (parts, body) = res.into_parts();
        let body = body.collect().await.map_err(Error::body)?.to_bytes();
        Ok(Response::from_parts(parts, body))
    }
}

fn origin(uri: &Uri) -> crate::Result<String> {
    match (uri.scheme(), uri.authority()) {
        (Some(scheme), Some(authority)) => Ok(format!("{scheme}://{authority}")),
        _ => Err(Error::request(BadScheme)),
    }
}

/// The `Host` value for `uri`, without the port when it is the scheme's
/// default.
fn host_header(uri: &Uri) -> crate::Result<HeaderValue> {
    let host = uri.host().ok_or_else(|| Error::request(BadScheme))?;
    let default_port = match uri.scheme() {
        Some(scheme) if *scheme == Scheme::HTTPS => 443,
        _ => 80,
    };
    let value = match uri.port_u16() {
        Some(port) if port != default_port => format!("{host}:{port}"),
        _ => host.to_owned(),
    };
    HeaderValue::from_str(&value).map_err(Error::request)
}

fn origin_form(uri: &Uri) -> Uri {
    let path = uri
        .path_and_query()
        .cloned()
        .unwrap_or_else(|| PathAndQuery::from_static("/"));
    Uri::from(path)
}

fn hyper_error(err: hyper::Error) -> Error {
    if is_handshake_failure(&err) {
        Error::tls(err)
    } else {
        Error::request(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_header_omits_default_port() {
        let uri: Uri = "https://example.com/a".parse().unwrap();
        assert_eq!(host_header(&uri).unwrap(), "example.com");

        let uri: Uri = "https://example.com:443/a".parse().unwrap();
        assert_eq!(host_header(&uri).unwrap(), "example.com");

        let uri: Uri = "http://127.0.0.1:8080/".parse().unwrap();
        assert_eq!(host_header(&uri).unwrap(), "127.0.0.1:8080");

        let uri: Uri = "https://[::1]:8443/".parse().unwrap();
        assert_eq!(host_header(&uri).unwrap(), "[::1]:8443");
    }

    #[test]
    fn requests_use_origin_form() {
        let uri: Uri = "https://example.com/a/b?c=d".parse().unwrap();
        assert_eq!(origin_form(&uri), "/a/b?c=d");
        assert!(origin_form(&uri).host().is_none());
    }
}
