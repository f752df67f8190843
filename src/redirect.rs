//! Redirect Handling
//!
//! By default, a `Client` will automatically follow HTTP redirects, having a
//! maximum redirect chain of 10 hops. Reaching the limit is not an error:
//! the redirect response that would have been followed next is returned as
//! is. A `redirect::Policy` is derived from the `max_redirects` setting or
//! built directly.

use std::fmt;

use http::{
    header::{
        AUTHORIZATION, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, PROXY_AUTHORIZATION,
        TRANSFER_ENCODING, WWW_AUTHENTICATE,
    },
    HeaderMap, HeaderValue, Method, StatusCode,
};
use url::Url;

/// The redirect limit used when nothing else is configured.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// A type that controls the policy on how to handle the following of redirects.
///
/// - `limited` follows at most `max` redirects, then returns the next
///   redirect response unfollowed.
/// - `none` can be used to disable all redirect behavior.
#[derive(Clone)]
pub struct Policy {
    inner: PolicyKind,
}

impl Policy {
    /// Create a `Policy` that follows at most `max` redirects.
    pub fn limited(max: usize) -> Self {
        Self {
            inner: PolicyKind::Limit(max),
        }
    }

    /// Create a `Policy` that does not follow any redirect.
    pub fn none() -> Self {
        Self {
            inner: PolicyKind::None,
        }
    }

    /// Build the policy for a `max_redirects` setting.
    ///
    /// An integer `N` follows `N` redirects (a negative value follows none),
    /// `"false"` disables redirects and anything else, including no value,
    /// gives the default of 10.
    pub fn from_max_redirects(value: Option<&str>) -> Self {
        let Some(value) = value.map(str::trim) else {
            return Policy::default();
        };

        if value == "false" {
            return Policy::none();
        }

        match value.parse::<i64>() {
            Ok(max) => Policy::limited(usize::try_from(max).unwrap_or(0)),
            Err(_) => Policy::default(),
        }
    }

    /// Decide whether to follow a redirect to `next`. `previous` holds every
    /// URL requested so far in the chain, starting with the initial request.
    pub(crate) fn check(&self, status: StatusCode, next: &Url, previous: &[Url]) -> ActionKind {
        let follow = match self.inner {
            // the first URL in `previous` is the initial request, not a redirect
            PolicyKind::Limit(max) => previous.len() <= max,
            PolicyKind::None => false,
        };
        if follow {
            ActionKind::Follow
        } else {
            log::trace!("not following {status} redirect to {next}");
            ActionKind::Stop
        }
    }
}

impl Default for Policy {
    fn default() -> Policy {
        Policy::limited(DEFAULT_MAX_REDIRECTS)
    }
}

#[derive(Clone)]
enum PolicyKind {
    Limit(usize),
    None,
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Policy").field(&self.inner).finish()
    }
}

impl fmt::Debug for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            PolicyKind::Limit(max) => f.debug_tuple("Limit").field(&max).finish(),
            PolicyKind::None => f.pad("None"),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ActionKind {
    Follow,
    Stop,
}

/// How the follow-up request is formed for a redirect status.
///
/// Returns the method to use and whether the original body is replayed, or
/// `None` when the status is not a followable redirect.
pub(crate) fn follow_up(status: StatusCode, method: &Method) -> Option<(Method, bool)> {
    match status {
        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER => {
            if method == Method::GET || method == Method::HEAD {
                Some((method.clone(), false))
            } else {
                Some((Method::GET, false))
            }
        }
        StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT => {
            Some((method.clone(), true))
        }
        _ => None,
    }
}

pub(crate) fn remove_sensitive_headers(headers: &mut HeaderMap, next: &Url, previous: &[Url]) {
    if let Some(previous) = previous.last() {
        let cross_host = next.host_str() != previous.host_str()
            || next.port_or_known_default() != previous.port_or_known_default();
        if cross_host {
            headers.remove(AUTHORIZATION);
            headers.remove(COOKIE);
            headers.remove("cookie2");
            headers.remove(PROXY_AUTHORIZATION);
            headers.remove(WWW_AUTHENTICATE);
        }
    }
}

pub(crate) fn remove_content_headers(headers: &mut HeaderMap) {
    headers.remove(CONTENT_TYPE);
    headers.remove(CONTENT_LENGTH);
    headers.remove(CONTENT_ENCODING);
    headers.remove(TRANSFER_ENCODING);
}

pub(crate) fn make_referer(next: &Url, previous: &Url) -> Option<HeaderValue> {
    if next.scheme() == "http" && previous.scheme() == "https" {
        return None;
    }

    let mut referer = previous.clone();
    let _ = referer.set_username("");
    let _ = referer.set_password(None);
    referer.set_fragment(None);
    referer.as_str().parse().ok()
}
