//! One-shot request execution
//!
//! [`send`] turns a [`RequestConfig`] into a [`ResponseState`]: it validates
//! the configuration, builds a client for it, sends the request and copies
//! the parts of the response the configuration asks for.

use std::collections::BTreeMap;

use bytes::Bytes;
use http::{header::LOCATION, Request, Version};
use log::{debug, warn};
use serde::Serialize;

use crate::{
    client::{self, Client, Response},
    config::RequestConfig,
    error::Error,
};

/// What is kept of a response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResponseState {
    /// The `Location` header, resolved against the final URL.
    pub location: Option<String>,
    /// Status line text, such as `"200 OK"`.
    pub status: String,
    pub status_code: u16,
    /// Response headers, multiple values joined with `", "`.
    pub headers: BTreeMap<String, String>,
    /// Response cookies by name.
    pub cookies: BTreeMap<String, String>,
    /// Protocol text, such as `"HTTP/1.1"` or `"HTTP/2.0"`.
    pub protocol: String,
    pub proto_major: u8,
    pub proto_minor: u8,
    /// The announced body length, `-1` when unknown.
    pub content_length: i64,
    /// Whether a gzip body was transparently decompressed.
    pub was_uncompressed: bool,
    /// The body as text.
    pub source: String,
    /// The body bytes behind `source`.
    #[serde(skip)]
    pub body: Bytes,
}

/// Send the request described by `config`.
///
/// The URL and method are checked before anything else is built, so a bad
/// configuration never causes network activity. Connections are closed
/// once the response is read, whether or not the request succeeded.
pub async fn send(config: &RequestConfig) -> crate::Result<ResponseState> {
    let url = config.url()?;
    let method = config.method()?;
    let headers = config.header_map()?;

    let client = Client::from_config(config)?;

    let mut req = Request::new(config.payload.clone());
    *req.method_mut() = method;
    *req.uri_mut() = url
        .as_str()
        .parse()
        .map_err(|e| Error::builder(e).with_url(url.clone()))?;
    *req.headers_mut() = headers;

    debug!("{} {url} with {client:?}", req.method());
    let result = client.execute(req).await;
    client.close_idle_connections();

    let res = result?;
    Ok(ResponseState::from_response(res, config).await)
}

impl ResponseState {
    async fn from_response(res: Response, config: &RequestConfig) -> ResponseState {
        let mut state = ResponseState {
            location: location(&res),
            status: status_text(&res),
            status_code: res.status().as_u16(),
            content_length: res.content_length().map_or(-1, |len| len as i64),
            was_uncompressed: res.was_uncompressed(),
            ..Default::default()
        };
        (state.protocol, state.proto_major, state.proto_minor) = protocol(res.version());

        if config.read_response_headers {
            for (name, value) in res.headers() {
                let value = String::from_utf8_lossy(value.as_bytes());
                state
                    .headers
                    .entry(canonical_name(name.as_str()))
                    .and_modify(|joined| {
                        joined.push_str(", ");
                        joined.push_str(&value);
                    })
                    .or_insert_with(|| value.into_owned());
            }
        }

        if config.read_response_cookies {
            state.cookies = cookies(&res);
        }

        if config.read_response_body {
            let body = client::gunzip_or_raw(res.bytes()).await;
            state.source = String::from_utf8_lossy(&body).into_owned();
            state.body = body;
        }

        state
    }
}

fn location(res: &Response) -> Option<String> {
    let value = res.headers().get(LOCATION)?;
    let value = match value.to_str() {
        Ok(value) => value,
        Err(e) => {
            warn!("ignoring non-ascii Location header: {e}");
            return None;
        }
    };
    match res.url().join(value) {
        Ok(url) => Some(url.into()),
        Err(e) => {
            warn!("ignoring unparseable Location {value:?}: {e}");
            None
        }
    }
}

fn status_text(res: &Response) -> String {
    let status = res.status();
    match status.canonical_reason() {
        Some(reason) => format!("{} {reason}", status.as_u16()),
        None => status.as_u16().to_string(),
    }
}

fn protocol(version: Version) -> (String, u8, u8) {
    let (major, minor) = match version {
        Version::HTTP_09 => (0, 9),
        Version::HTTP_10 => (1, 0),
        Version::HTTP_2 => (2, 0),
        Version::HTTP_3 => (3, 0),
        _ => (1, 1),
    };
    (format!("HTTP/{major}.{minor}"), major, minor)
}

/// `content-type` becomes `Content-Type`.
fn canonical_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if upper {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        upper = c == '-';
    }
    out
}

#[cfg(feature = "cookies")]
fn cookies(res: &Response) -> BTreeMap<String, String> {
    res.cookies()
        .map(|cookie| (cookie.name().to_owned(), cookie.value().to_owned()))
        .collect()
}

#[cfg(not(feature = "cookies"))]
fn cookies(_res: &Response) -> BTreeMap<String, String> {
    BTreeMap::new()
}
