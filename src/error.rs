use std::{error::Error as StdError, fmt, io};

use url::Url;

/// A `Result` alias where the `Err` case is `mimic_request::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// A boxed error type that can be used for dynamic error handling.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// The Errors that may occur when building a client or sending a request.
///
/// Configuration problems are reported through [`Error::is_builder`] and
/// [`Error::is_fingerprint`] before any network activity takes place.
/// Network problems ([`Error::is_connect`], [`Error::is_proxy_connect`],
/// [`Error::is_tls`], [`Error::is_timeout`]) can be told apart from them, so
/// a caller can retry only those.
///
/// Note: Errors may include the full URL used to make the request. If the URL
/// contains sensitive information (e.g. an API key as a query parameter), be
/// sure to remove it ([`without_url`](Error::without_url))
pub struct Error {
    inner: Box<Inner>,
}

struct Inner {
    kind: Kind,
    source: Option<BoxError>,
    url: Option<Url>,
}

impl Error {
    pub(crate) fn new<E>(kind: Kind, source: Option<E>) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            inner: Box::new(Inner {
                kind,
                source: source.map(Into::into),
                url: None,
            }),
        }
    }

    pub(crate) fn builder<E: Into<BoxError>>(e: E) -> Error {
        Error::new(Kind::Builder, Some(e))
    }

    pub(crate) fn fingerprint<E: Into<BoxError>>(e: E) -> Error {
        Error::new(Kind::Fingerprint, Some(e))
    }

    pub(crate) fn connect<E: Into<BoxError>>(e: E) -> Error {
        Error::new(Kind::Connect, Some(e))
    }

    pub(crate) fn proxy_connect<E: Into<BoxError>>(e: E) -> Error {
        Error::new(Kind::ProxyConnect, Some(e))
    }

    pub(crate) fn tls<E: Into<BoxError>>(e: E) -> Error {
        Error::new(Kind::Tls, Some(e))
    }

    pub(crate) fn request<E: Into<BoxError>>(e: E) -> Error {
        Error::new(Kind::Request, Some(e))
    }

    pub(crate) fn body<E: Into<BoxError>>(e: E) -> Error {
        Error::new(Kind::Body, Some(e))
    }

    pub(crate) fn decode<E: Into<BoxError>>(e: E) -> Error {
        Error::new(Kind::Decode, Some(e))
    }

    pub(crate) fn redirect<E: Into<BoxError>>(e: E, url: Url) -> Error {
        Error::new(Kind::Redirect, Some(e)).with_url(url)
    }

    pub(crate) fn timeout() -> Error {
        Error::new(Kind::Request, Some(TimedOut))
    }

    pub(crate) fn url_bad_scheme(url: Url) -> Error {
        Error::new(Kind::Builder, Some(BadScheme)).with_url(url)
    }
}

impl Error {
    /// Returns a possible URL related to this error.
    pub fn url(&self) -> Option<&Url> {
        self.inner.url.as_ref()
    }

    /// Returns a mutable reference to the URL related to this error
    ///
    /// This is useful if you need to remove sensitive information from the URL
    /// (e.g. an API key in the query), but do not want to remove the URL
    /// entirely.
    pub fn url_mut(&mut self) -> Option<&mut Url> {
        self.inner.url.as_mut()
    }

    /// Add a url related to this error (overwriting any existing)
    pub fn with_url(mut self, url: Url) -> Self {
        self.inner.url = Some(url);
        self
    }

    /// Strip the related url from this error (if, for example, it contains
    /// sensitive information)
    pub fn without_url(mut self) -> Self {
        self.inner.url = None;
        self
    }

    /// Returns true if the error comes from invalid configuration.
    pub fn is_builder(&self) -> bool {
        matches!(self.inner.kind, Kind::Builder)
    }

    /// Returns true if a custom fingerprint specification could not be parsed
    /// or applied.
    pub fn is_fingerprint(&self) -> bool {
        matches!(self.inner.kind, Kind::Fingerprint)
    }

    /// Returns true if the error is related to establishing a connection,
    /// directly or through a proxy.
    pub fn is_connect(&self) -> bool {
        matches!(self.inner.kind, Kind::Connect | Kind::ProxyConnect)
    }

    /// Returns true if the connection through the configured proxy failed.
    pub fn is_proxy_connect(&self) -> bool {
        matches!(self.inner.kind, Kind::ProxyConnect)
    }

    /// Returns true if the error is related to the TLS handshake.
    pub fn is_tls(&self) -> bool {
        matches!(self.inner.kind, Kind::Tls)
    }

    /// Returns true if the error is from a redirect.
    pub fn is_redirect(&self) -> bool {
        matches!(self.inner.kind, Kind::Redirect)
    }

    /// Returns true if the error is related to a timeout.
    pub fn is_timeout(&self) -> bool {
        let mut source = self.source();

        while let Some(err) = source {
            if err.is::<TimedOut>() {
                return true;
            }
            if let Some(io) = err.downcast_ref::<io::Error>() {
                if io.kind() == io::ErrorKind::TimedOut {
                    return true;
                }
            }
            source = err.source();
        }

        false
    }

    /// Returns true if the error is related to the request
    pub fn is_request(&self) -> bool {
        matches!(self.inner.kind, Kind::Request)
    }

    /// Returns true if the error is related to the request or response body
    pub fn is_body(&self) -> bool {
        matches!(self.inner.kind, Kind::Body)
    }

    /// Returns true if the error is related to decoding the response's body
    pub fn is_decode(&self) -> bool {
        matches!(self.inner.kind, Kind::Decode)
    }

    /// Returns true if a TLS server did not select `h2` for an HTTP/2 client.
    pub fn is_h2_not_negotiated(&self) -> bool {
        self.source().map_or(false, |e| e.is::<H2NotNegotiated>())
    }

    /// Returns true for network level failures that may succeed when retried.
    ///
    /// Configuration errors never are.
    pub fn is_retryable(&self) -> bool {
        self.is_connect() || self.is_tls() || self.is_timeout()
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = f.debug_struct("mimic_request::Error");

        builder.field("kind", &self.inner.kind);

        if let Some(ref url) = self.inner.url {
            builder.field("url", &url.as_str());
        }

        if let Some(ref source) = self.inner.source {
            builder.field("source", source);
        }

        builder.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.inner.kind {
            Kind::Builder => f.write_str("builder error")?,
            Kind::Fingerprint => f.write_str("malformed fingerprint specification")?,
            Kind::Connect => f.write_str("error dialing connection")?,
            Kind::ProxyConnect => f.write_str("error dialing through proxy")?,
            Kind::Tls => f.write_str("tls handshake error")?,
            Kind::Request => f.write_str("error sending request")?,
            Kind::Body => f.write_str("request or response body error")?,
            Kind::Decode => f.write_str("error decoding response body")?,
            Kind::Redirect => f.write_str("error following redirect")?,
        }

        if let Some(url) = &self.inner.url {
            write!(f, " for url ({})", url.as_str())?;
        }

        if let Some(e) = &self.inner.source {
            write!(f, ": {e}")?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| &**e as _)
    }
}

#[derive(Debug)]
pub(crate) enum Kind {
    Builder,
    Fingerprint,
    Connect,
    ProxyConnect,
    Tls,
    Request,
    Body,
    Decode,
    Redirect,
}

macro_rules! unit_error {
    ($(#[$meta:meta])* $name:ident => $msg:literal) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub(crate) struct $name;

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str($msg)
            }
        }

        impl StdError for $name {}
    };
}

unit_error!(TimedOut => "operation timed out");
unit_error!(BadScheme => "URL scheme is not allowed");
unit_error!(MissingUrl => "missing request url");
unit_error!(H2NotNegotiated => "server did not negotiate h2 over ALPN");
unit_error!(MissingMethod => "missing request method");
unit_error!(
    /// A custom fingerprint selector was given without a spec string.
    MissingFingerprintSpec => "missing client fingerprint spec"
);
unit_error!(
    /// A custom fingerprint selector was given without protocol "1" or "2".
    MissingProtocolVersion => "missing or invalid protocol version for custom fingerprint"
);

#[derive(Debug)]
pub(crate) struct InvalidAddress(pub(crate) String);

impl fmt::Display for InvalidAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid address {:?}: expected host:port", self.0)
    }
}

impl StdError for InvalidAddress {}
