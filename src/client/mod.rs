//! Fingerprinted HTTP clients
//!
//! [`Client::from_config`] picks the transport from the configured protocol:
//! `"1"` builds the hyper based HTTP/1.1 client, anything else the `h2`
//! based HTTP/2 client. The HTTP/1.1 client switches to HTTP/2 for a
//! request when `force_attempt_http2` is set and the server selects `h2`. Both dial through the same [`Dialer`] and share the
//! redirect, timeout and decompression handling implemented here.

use std::time::Duration;

use bytes::Bytes;
use http::{
    header::{HeaderValue, ACCEPT_ENCODING, LOCATION, REFERER},
    HeaderMap, Method, Request, Uri,
};
use log::debug;
use url::Url;

use self::{http1::Http1Client, http2::Http2Client};
use crate::{
    config::{ProtocolVersion, RequestConfig},
    connect::Dialer,
    error::Error,
    redirect::{self, ActionKind, Policy},
    tls::{self, TlsConnector, TlsOptions},
};

mod decoder;
mod http1;
mod http2;
mod response;

pub(crate) use self::decoder::gunzip_or_raw;
pub use self::response::Response;

enum Transport {
    Http1(Http1Client),
    Http2(Http2Client),
}

impl Transport {
    async fn send(&self, req: Request<Bytes>) -> crate::Result<http::Response<Bytes>> {
        match self {
            Transport::Http1(client) => client.send(req).await,
            Transport::Http2(client) => client.send(req).await,
        }
    }
}

/// A client built for one request configuration.
///
/// The client owns its connections. Call
/// [`close_idle_connections`](Client::close_idle_connections) once the
/// response has been consumed.
pub struct Client {
    transport: Transport,
    redirect: Policy,
    timeout: Option<Duration>,
    compression: bool,
}

impl Client {
    /// Build the client described by `config`.
    ///
    /// Fails with a builder or fingerprint error when the fingerprint, the
    /// HTTP/2 settings or the proxy cannot be resolved. Nothing is dialed.
    pub fn from_config(config: &RequestConfig) -> crate::Result<Client> {
        tls::enable_weak_ciphers();
        match config.protocol {
            ProtocolVersion::Http1 => build_http1(config),
            ProtocolVersion::Http2 | ProtocolVersion::Unspecified => build_http2(config),
        }
    }

    /// Returns true if this client speaks HTTP/2 natively.
    pub fn is_http2(&self) -> bool {
        matches!(self.transport, Transport::Http2(_))
    }

    /// The overall deadline of [`execute`](Client::execute), if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Send `request`, following redirects as the policy allows.
    ///
    /// The whole exchange, including dials, handshakes, redirects and
    /// reading the body, runs under the client timeout.
    pub async fn execute(&self, request: Request<Bytes>) -> crate::Result<Response> {
        let url = to_url(request.uri())?;
        match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, self.follow(request, url.clone())).await {
                Ok(result) => result,
                Err(_) => Err(Error::timeout().with_url(url)),
            },
            None => self.follow(request, url).await,
        }
    }

    /// Drop the connections held by this client.
    pub fn close_idle_connections(&self) {
        match &self.transport {
            // the HTTP/1 pool keeps no idle connections
            Transport::Http1(_) => {}
            Transport::Http2(client) => client.close_idle_connections(),
        }
    }

    async fn follow(&self, request: Request<Bytes>, mut url: Url) -> crate::Result<Response> {
        let (parts, mut body) = request.into_parts();
        let mut method = parts.method;
        let mut headers = parts.headers;

        let accepts_gzip = self.compression && !headers.contains_key(ACCEPT_ENCODING);
        if accepts_gzip {
            headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
        }

        let mut previous = Vec::new();
        loop {
            let req = build_request(&method, &url, &headers, body.clone())?;
            let res = self
                .transport
                .send(req)
                .await
                .map_err(|e| e.with_url(url.clone()))?;

            let status = res.status();
            let followable = redirect::follow_up(status, &method);
            let location = res.headers().get(LOCATION);

            if let (Some((next_method, keep_body)), Some(location)) = (followable, location) {
                let next = location
                    .to_str()
                    .map_err(|e| Error::redirect(e, url.clone()))
                    .and_then(|loc| url.join(loc).map_err(|e| Error::redirect(e, url.clone())))?;

                previous.push(url.clone());
                match self.redirect.check(status, &next, &previous) {
                    ActionKind::Follow => {
                        debug!("redirecting '{url}' to '{next}'");
                        if !keep_body {
                            body = Bytes::new();
                            redirect::remove_content_headers(&mut headers);
                        }
                        method = next_method;
                        redirect::remove_sensitive_headers(&mut headers, &next, &previous);
                        match redirect::make_referer(&next, &url) {
                            Some(referer) => {
                                headers.insert(REFERER, referer);
                            }
                            None => {
                                headers.remove(REFERER);
                            }
                        }
                        url = next;
                        continue;
                    }
                    ActionKind::Stop => {
                        debug!("redirect policy disallowed redirection to '{next}'");
                    }
                }
            }

            return finish(res, url, accepts_gzip).await;
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("http2", &self.is_http2())
            .field("redirect", &self.redirect)
            .field("timeout", &self.timeout)
            .field("compression", &self.compression)
            .finish()
    }
}

fn build_http1(config: &RequestConfig) -> crate::Result<Client> {
    let spec = config.fingerprint()?;
    let options = TlsOptions {
        skip_verify: config.insecure_skip_verify,
        http1_only: !config.force_attempt_http2,
    };
    let dialer = Dialer::new(config.proxy()?, TlsConnector::new(&spec, options)?);
    debug!("http1 client for {spec}");

    let h2_frames = if config.force_attempt_http2 {
        Some(config.http2_frames(&spec)?)
    } else {
        None
    };
    let transport = Transport::Http1(Http1Client::new(dialer, h2_frames));
    Ok(Client::new(transport, config))
}

fn build_http2(config: &RequestConfig) -> crate::Result<Client> {
    let spec = config.fingerprint()?;
    let frames = config.http2_frames(&spec)?;
    let options = TlsOptions {
        skip_verify: config.insecure_skip_verify,
        http1_only: false,
    };
    let dialer = Dialer::new(config.proxy()?, TlsConnector::new(&spec, options)?);
    debug!("http2 client for {spec}, frames {frames}");

    let transport = Transport::Http2(Http2Client::new(dialer, frames, config.allow_http));
    Ok(Client::new(transport, config))
}

impl Client {
    fn new(transport: Transport, config: &RequestConfig) -> Client {
        Client {
            transport,
            redirect: config.redirect_policy(),
            timeout: config.timeout(),
            compression: !config.disable_compression,
        }
    }
}

async fn finish(res: http::Response<Bytes>, url: Url, accepts_gzip: bool) -> crate::Result<Response> {
    let (mut parts, body) = res.into_parts();
    if !(accepts_gzip && decoder::is_gzip(&parts.headers)) || body.is_empty() {
        return Ok(Response::new(http::Response::from_parts(parts, body), url, false));
    }

    let body = decoder::gunzip(&body)
        .await
        .map_err(|e| Error::decode(e).with_url(url.clone()))?;
    decoder::strip_encoding_headers(&mut parts.headers);
    Ok(Response::new(http::Response::from_parts(parts, body), url, true))
}

fn build_request(method: &Method, url: &Url, headers: &HeaderMap, body: Bytes) -> crate::Result<Request<Bytes>> {
    let mut req = Request::new(body);
    *req.method_mut() = method.clone();
    *req.uri_mut() = to_uri(url)?;
    *req.headers_mut() = headers.clone();
    Ok(req)
}

fn to_uri(url: &Url) -> crate::Result<Uri> {
    let mut url = url.clone();
    url.set_fragment(None);
    url.as_str()
        .parse()
        .map_err(|e| Error::builder(e).with_url(url))
}

fn to_url(uri: &Uri) -> crate::Result<Url> {
    Url::parse(&uri.to_string()).map_err(Error::builder)
}
