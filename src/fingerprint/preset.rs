use std::{fmt, str::FromStr};

use crate::{
    http2::{Http2FrameConfig, PseudoHeader},
    tls::{CertCompression, Curve, TlsProfile, TlsVersion},
};

use PseudoHeader::{Authority as A, Method as M, Path as P, Scheme as S};

/// A client whose fingerprint ships with the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(missing_docs)]
pub enum Preset {
    Chrome120,
    #[default]
    Chrome124,
    Firefox117,
    Safari17_0,
    OkHttp4_9,
}

impl Preset {
    /// Every preset, oldest Chrome first.
    pub const ALL: &'static [Preset] = &[
        Preset::Chrome120,
        Preset::Chrome124,
        Preset::Firefox117,
        Preset::Safari17_0,
        Preset::OkHttp4_9,
    ];

    /// The canonical name, as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Chrome120 => "chrome120",
            Preset::Chrome124 => "chrome124",
            Preset::Firefox117 => "firefox117",
            Preset::Safari17_0 => "safari17_0",
            Preset::OkHttp4_9 => "okhttp4_9",
        }
    }

    /// The ClientHello this preset sends.
    pub fn tls_profile(&self) -> TlsProfile {
        match self {
            Preset::Chrome120 => chrome(),
            Preset::Chrome124 => {
                let mut profile = chrome();
                profile.curves.insert(0, Curve::X25519Kyber768);
                profile
            }
            Preset::Firefox117 => firefox(),
            Preset::Safari17_0 => safari(),
            Preset::OkHttp4_9 => okhttp(),
        }
    }

    /// The HTTP/2 preamble this preset sends.
    pub fn http2_frames(&self) -> Http2FrameConfig {
        match self {
            // 1:65536;2:0;4:6291456;6:262144|15663105|0|m,a,s,p
            Preset::Chrome120 | Preset::Chrome124 => Http2FrameConfig::preset(
                &[(1, 65536), (2, 0), (4, 6291456), (6, 262144)],
                15663105,
                &[],
                [M, A, S, P],
                Some((true, 0, 256)),
            ),
            Preset::Firefox117 => Http2FrameConfig::preset(
                &[(1, 65536), (4, 131072), (5, 16384)],
                12517377,
                &[
                    (3, false, 0, 201),
                    (5, false, 0, 101),
                    (7, false, 0, 1),
                    (9, false, 7, 1),
                    (11, false, 3, 1),
                    (13, false, 0, 241),
                ],
                [M, P, A, S],
                Some((false, 13, 42)),
            ),
            Preset::Safari17_0 => Http2FrameConfig::preset(
                &[(2, 0), (4, 4194304), (3, 100)],
                10485760,
                &[],
                [M, S, P, A],
                Some((false, 0, 255)),
            ),
            Preset::OkHttp4_9 => {
                Http2FrameConfig::preset(&[(4, 16777216)], 16711681, &[], [M, P, A, S], None)
            }
        }
    }
}

const CHROME_CIPHERS: &[&str] = &[
    "TLS_AES_128_GCM_SHA256",
    "TLS_AES_256_GCM_SHA384",
    "TLS_CHACHA20_POLY1305_SHA256",
    "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
    "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
    "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384",
    "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
    "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256",
    "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256",
    "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA",
    "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA",
    "TLS_RSA_WITH_AES_128_GCM_SHA256",
    "TLS_RSA_WITH_AES_256_GCM_SHA384",
    "TLS_RSA_WITH_AES_128_CBC_SHA",
    "TLS_RSA_WITH_AES_256_CBC_SHA",
];

const CHROME_SIGALGS: &[&str] = &[
    "ecdsa_secp256r1_sha256",
    "rsa_pss_rsae_sha256",
    "rsa_pkcs1_sha256",
    "ecdsa_secp384r1_sha384",
    "rsa_pss_rsae_sha384",
    "rsa_pkcs1_sha384",
    "rsa_pss_rsae_sha512",
    "rsa_pkcs1_sha512",
];

fn chrome() -> TlsProfile {
    TlsProfile {
        ciphers: CHROME_CIPHERS.to_vec(),
        sigalgs: CHROME_SIGALGS.to_vec(),
        curves: vec![Curve::X25519, Curve::P256, Curve::P384],
        alpn: vec!["h2".to_owned(), "http/1.1".to_owned()],
        min_version: TlsVersion::Tls1_2,
        max_version: TlsVersion::Tls1_3,
        grease: true,
        permute_extensions: true,
        ocsp_stapling: true,
        signed_cert_timestamps: true,
        session_ticket: true,
        server_name: true,
        ech_grease: true,
        application_settings: true,
        cert_compression: Some(CertCompression::Brotli),
        extension_order: Vec::new(),
    }
}

fn firefox() -> TlsProfile {
    TlsProfile {
        ciphers: vec![
            "TLS_AES_128_GCM_SHA256",
            "TLS_CHACHA20_POLY1305_SHA256",
            "TLS_AES_256_GCM_SHA384",
            "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
            "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
            "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256",
            "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256",
            "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384",
            "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
            "TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA",
            "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA",
            "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA",
            "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA",
            "TLS_RSA_WITH_AES_128_GCM_SHA256",
            "TLS_RSA_WITH_AES_256_GCM_SHA384",
            "TLS_RSA_WITH_AES_128_CBC_SHA",
            "TLS_RSA_WITH_AES_256_CBC_SHA",
        ],
        sigalgs: vec![
            "ecdsa_secp256r1_sha256",
            "ecdsa_secp384r1_sha384",
            "ecdsa_secp521r1_sha512",
            "rsa_pss_rsae_sha256",
            "rsa_pss_rsae_sha384",
            "rsa_pss_rsae_sha512",
            "rsa_pkcs1_sha256",
            "rsa_pkcs1_sha384",
            "rsa_pkcs1_sha512",
            "ecdsa_sha1",
            "rsa_pkcs1_sha1",
        ],
        curves: vec![Curve::X25519, Curve::P256, Curve::P384, Curve::P521],
        alpn: vec!["h2".to_owned(), "http/1.1".to_owned()],
        min_version: TlsVersion::Tls1_2,
        max_version: TlsVersion::Tls1_3,
        grease: false,
        permute_extensions: false,
        ocsp_stapling: true,
        signed_cert_timestamps: false,
        session_ticket: true,
        server_name: true,
        ech_grease: false,
        application_settings: false,
        cert_compression: None,
        extension_order: Vec::new(),
    }
}

fn safari() -> TlsProfile {
    TlsProfile {
        ciphers: vec![
            "TLS_AES_128_GCM_SHA256",
            "TLS_AES_256_GCM_SHA384",
            "TLS_CHACHA20_POLY1305_SHA256",
            "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384",
            "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
            "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256",
            "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
            "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
            "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256",
            "TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA",
            "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA",
            "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA",
            "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA",
            "TLS_RSA_WITH_AES_256_GCM_SHA384",
            "TLS_RSA_WITH_AES_128_GCM_SHA256",
            "TLS_RSA_WITH_AES_256_CBC_SHA",
            "TLS_RSA_WITH_AES_128_CBC_SHA",
            "TLS_ECDHE_ECDSA_WITH_3DES_EDE_CBC_SHA",
            "TLS_ECDHE_RSA_WITH_3DES_EDE_CBC_SHA",
            "TLS_RSA_WITH_3DES_EDE_CBC_SHA",
        ],
        sigalgs: vec![
            "ecdsa_secp256r1_sha256",
            "rsa_pss_rsae_sha256",
            "rsa_pkcs1_sha256",
            "ecdsa_secp384r1_sha384",
            "ecdsa_sha1",
            "rsa_pss_rsae_sha384",
            "rsa_pkcs1_sha384",
            "rsa_pss_rsae_sha512",
            "rsa_pkcs1_sha512",
            "rsa_pkcs1_sha1",
        ],
        curves: vec![Curve::X25519, Curve::P256, Curve::P384, Curve::P521],
        alpn: vec!["h2".to_owned(), "http/1.1".to_owned()],
        min_version: TlsVersion::Tls1_0,
        max_version: TlsVersion::Tls1_3,
        grease: true,
        permute_extensions: false,
        ocsp_stapling: true,
        signed_cert_timestamps: true,
        session_ticket: false,
        server_name: true,
        ech_grease: false,
        application_settings: false,
        cert_compression: Some(CertCompression::Zlib),
        extension_order: Vec::new(),
    }
}

fn okhttp() -> TlsProfile {
    let mut sigalgs = CHROME_SIGALGS.to_vec();
    sigalgs.push("rsa_pkcs1_sha1");

    TlsProfile {
        ciphers: vec![
            "TLS_AES_128_GCM_SHA256",
            "TLS_AES_256_GCM_SHA384",
            "TLS_CHACHA20_POLY1305_SHA256",
            "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
            "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384",
            "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256",
            "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
            "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
            "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256",
            "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA",
            "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA",
            "TLS_RSA_WITH_AES_128_GCM_SHA256",
            "TLS_RSA_WITH_AES_256_GCM_SHA384",
            "TLS_RSA_WITH_AES_128_CBC_SHA",
            "TLS_RSA_WITH_AES_256_CBC_SHA",
        ],
        sigalgs,
        curves: vec![Curve::X25519, Curve::P256, Curve::P384],
        alpn: vec!["h2".to_owned(), "http/1.1".to_owned()],
        min_version: TlsVersion::Tls1_2,
        max_version: TlsVersion::Tls1_3,
        grease: false,
        permute_extensions: false,
        ocsp_stapling: true,
        signed_cert_timestamps: false,
        session_ticket: true,
        server_name: true,
        ech_grease: false,
        application_settings: false,
        cert_compression: None,
        extension_order: Vec::new(),
    }
}

impl FromStr for Preset {
    type Err = UnknownPreset;

    /// Parse a preset name.
    ///
    /// Case, `-`, `_`, `.` and spaces are ignored, as are a leading `Hello`
    /// and a trailing `Auto`, so `Chrome-120`, `HelloChrome_120` and
    /// `chrome120` all name the same preset. A bare browser name picks its
    /// newest preset.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut name: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | '.' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        if let Some(rest) = name.strip_prefix("hello") {
            name = rest.to_owned();
        }
        if let Some(rest) = name.strip_suffix("auto") {
            name = rest.to_owned();
        }

        match name.as_str() {
            "chrome120" => Ok(Preset::Chrome120),
            "chrome124" | "chrome" => Ok(Preset::Chrome124),
            "firefox117" | "firefox" => Ok(Preset::Firefox117),
            "safari170" | "safari17" | "safari" => Ok(Preset::Safari17_0),
            "okhttp49" | "okhttp4" | "okhttp" => Ok(Preset::OkHttp4_9),
            _ => Err(UnknownPreset(s.to_owned())),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A preset name that matches no shipped fingerprint.
#[derive(Debug)]
pub struct UnknownPreset(String);

impl fmt::Display for UnknownPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown client fingerprint {:?}", self.0)
    }
}

impl std::error::Error for UnknownPreset {}
