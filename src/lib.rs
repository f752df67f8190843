#![warn(missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # mimic-request
//!
//! An HTTP client that looks like a browser on the wire.
//!
//! Every client is built from a [`RequestConfig`] and carries a network
//! fingerprint: the shape of its TLS ClientHello (cipher suites, extensions,
//! curves, ALPN, GREASE) and, for HTTP/2, the exact SETTINGS order, initial
//! WINDOW_UPDATE and PRIORITY frames sent after the connection preface, the
//! pseudo-header order and the priority of the first HEADERS frame.
//!
//! - Browser presets for Chrome, Firefox, Safari and OkHttp
//! - Custom ClientHellos from a JA3 string
//! - HTTP/1.1 (hyper) and HTTP/2 (h2) transports
//! - HTTP `CONNECT` and SOCKS [proxies](proxy)
//! - A configurable [redirect policy](redirect)
//! - Transparent gzip decompression
//! - Cookies (feature `cookies`)
//! - A [blocking] wrapper (feature `blocking`)
//!
//! ## Sending a request
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), mimic_request::Error> {
//! use mimic_request::RequestConfig;
//!
//! let config = RequestConfig {
//!     url: "https://tls.peet.ws/api/all".into(),
//!     method: "GET".into(),
//!     hello_client: "Firefox-117".into(),
//!     read_response_body: true,
//!     ..Default::default()
//! };
//!
//! let state = mimic_request::send(&config).await?;
//! println!("{} {}", state.status, state.source);
//! # Ok(())
//! # }
//! ```
//!
//! ## Fingerprints
//!
//! `hello_client` selects the fingerprint. `"-"` keeps the default Chrome
//! preset, a preset name such as `Safari-17.0` picks that browser, and any
//! name containing `Custom` reads a JA3 string from `client_spec`. Custom
//! fingerprints need `protocol` set to `"1"` or `"2"`, which also decides the
//! ALPN list they offer.
//!
//! Preset connections complete their TLS handshake on first use, custom ones
//! while dialing, so a custom fingerprint the server rejects fails the dial
//! with an error for which [`Error::is_tls`] is true.
//!
//! ## Timeouts and redirects
//!
//! `timeout` is a number of seconds, `"0"` disables it and anything else
//! means 30 seconds. `max_redirects` is a count, or `"false"` to return the
//! first redirect response as-is. The default follows up to 10 redirects.
//!
//! ## Optional Features
//!
//! - **socks** *(enabled by default)*: SOCKS4 and SOCKS5 proxies.
//! - **cookies** *(enabled by default)*: `Set-Cookie` parsing.
//! - **blocking** *(enabled by default)*: the [blocking] wrapper.

pub use http::header;
pub use http::Method;
pub use http::{StatusCode, Version};
pub use url::Url;

mod error;

pub mod client;
pub mod config;
pub mod connect;
#[cfg(feature = "cookies")]
pub mod cookie;
pub mod fingerprint;
pub mod http2;
pub mod proxy;
pub mod redirect;
pub mod request;
pub mod tls;
mod util;

#[cfg(feature = "blocking")]
pub mod blocking;

pub use self::client::{Client, Response};
pub use self::config::{ProtocolVersion, RequestConfig};
pub use self::error::{Error, Result};
pub use self::fingerprint::FingerprintSpec;
pub use self::request::{send, ResponseState};

fn _assert_impls() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    assert_send::<Client>();
    assert_sync::<Client>();
    assert_send::<Error>();
    assert_sync::<Error>();
    assert_send::<ResponseState>();
}
