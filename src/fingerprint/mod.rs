//! Client fingerprint selection
//!
//! A request names the client it impersonates with a selector string:
//!
//! - `"-"` or an empty string keeps the default preset,
//! - a preset name such as `Chrome-120` or `Safari-17.0` picks that preset,
//! - any name containing `Custom` (for example `CustomInternal`) takes the
//!   ClientHello from a JA3 string instead.

use std::fmt;

use log::trace;

use crate::{
    config::ProtocolVersion,
    error::{Error, MissingFingerprintSpec, MissingProtocolVersion},
    http2::Http2FrameConfig,
};

pub mod ja3;
mod preset;

pub use self::ja3::ClientHelloSpec;
pub use self::preset::{Preset, UnknownPreset};

const CUSTOM_MARKER: &str = "custom";

/// The fingerprint a client is built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FingerprintSpec {
    /// A fingerprint shipped with the crate.
    Preset(Preset),
    /// A ClientHello described by a JA3 string.
    Custom(ClientHelloSpec),
}

impl FingerprintSpec {
    /// Returns true for JA3 based fingerprints.
    pub fn is_custom(&self) -> bool {
        matches!(self, FingerprintSpec::Custom(_))
    }

    /// The HTTP/2 preamble sent when none is configured explicitly.
    ///
    /// Custom fingerprints carry no HTTP/2 information and use Chrome's.
    pub fn http2_defaults(&self) -> Http2FrameConfig {
        match self {
            FingerprintSpec::Preset(preset) => preset.http2_frames(),
            FingerprintSpec::Custom(_) => Preset::Chrome124.http2_frames(),
        }
    }
}

impl Default for FingerprintSpec {
    fn default() -> Self {
        FingerprintSpec::Preset(Preset::default())
    }
}

impl fmt::Display for FingerprintSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FingerprintSpec::Preset(preset) => write!(f, "preset {preset}"),
            FingerprintSpec::Custom(hello) => write!(
                f,
                "custom hello ({} ciphers, {} extensions)",
                hello.cipher_suites.len(),
                hello.extensions.len()
            ),
        }
    }
}

/// Resolve a selector into a fingerprint.
///
/// Custom selectors need a non-empty `spec` and an explicit HTTP version,
/// checked in that order before the JA3 string is parsed. Every failure
/// happens here, before any connection is made.
pub fn resolve(selector: &str, spec: &str, protocol: ProtocolVersion) -> crate::Result<FingerprintSpec> {
    let selector = selector.trim();
    if selector.is_empty() || selector == "-" {
        return Ok(FingerprintSpec::default());
    }

    if selector.to_ascii_lowercase().contains(CUSTOM_MARKER) {
        if spec.trim().is_empty() {
            return Err(Error::builder(MissingFingerprintSpec));
        }
        if !matches!(protocol, ProtocolVersion::Http1 | ProtocolVersion::Http2) {
            return Err(Error::builder(MissingProtocolVersion));
        }
        let hello = ja3::parse(spec, protocol).map_err(Error::fingerprint)?;
        trace!("custom fingerprint {selector:?} resolved for http/{protocol}");
        return Ok(FingerprintSpec::Custom(hello));
    }

    selector
        .parse()
        .map(FingerprintSpec::Preset)
        .map_err(Error::builder)
}
