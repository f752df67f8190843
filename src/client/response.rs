use std::fmt;

use bytes::Bytes;
use http::{header::CONTENT_LENGTH, HeaderMap, StatusCode, Version};
use url::Url;

#[cfg(feature = "cookies")]
use crate::cookie;

/// A fully received response.
pub struct Response {
    url: Url,
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
    was_uncompressed: bool,
}

impl Response {
    pub(super) fn new(res: http::Response<Bytes>, url: Url, was_uncompressed: bool) -> Response {
        let (parts, body) = res.into_parts();
        Response {
            url,
            status: parts.status,
            version: parts.version,
            headers: parts.headers,
            body,
            was_uncompressed,
        }
    }

    /// Get the final `Url` of this `Response`, after redirects.
    #[inline]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get the `StatusCode` of this `Response`.
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the HTTP `Version` of this `Response`.
    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Get the `Headers` of this `Response`.
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a mutable reference to the `Headers` of this `Response`.
    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// The announced length of the body.
    ///
    /// `None` when the server did not send a `Content-Length`, or when the
    /// body was decompressed and the header removed.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(CONTENT_LENGTH)?
            .to_str()
            .ok()?
            .trim()
            .parse()
            .ok()
    }

    /// Returns true if a gzip body was transparently decompressed.
    #[inline]
    pub fn was_uncompressed(&self) -> bool {
        self.was_uncompressed
    }

    /// Retrieve the cookies contained in the response.
    ///
    /// Note that invalid 'Set-Cookie' headers will be ignored.
    ///
    /// # Optional
    ///
    /// This requires the optional `cookies` feature to be enabled.
    #[cfg(feature = "cookies")]
    pub fn cookies(&self) -> impl Iterator<Item = cookie::Cookie<'_>> {
        cookie::extract_response_cookies(&self.headers)
    }

    /// The response body.
    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Consume the response, returning the body.
    pub fn bytes(self) -> Bytes {
        self.body
    }

    /// The body decoded as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Response")
            .field("url", &self.url.as_str())
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish()
    }
}
