//! TLS configuration
//!
//! Every connection is made with BoringSSL. A [`TlsProfile`] describes the
//! ClientHello a client sends: cipher order, signature algorithms, curves,
//! ALPN and the extensions that can be switched on or off. Presets ship a
//! canned profile; custom fingerprints start from a generic one and apply the
//! values of a parsed JA3 string on top, including the extension order.

use std::{fmt, io};

use boring::{
    error::ErrorStack,
    ssl::{
        CertCompressionAlgorithm, ExtensionType, SslConnector, SslConnectorBuilder, SslCurve, SslMethod,
        SslOptions, SslVerifyMode, SslVersion,
    },
};
use log::{debug, trace};
use once_cell::sync::OnceCell;
use tokio::net::TcpStream;

use crate::{
    error::Error,
    fingerprint::{
        ja3::{self, extension, ClientHelloSpec},
        FingerprintSpec,
    },
};

pub mod cipher;
mod stream;

pub use self::stream::TlsStream;
pub(crate) use self::stream::{is_handshake_failure, HandshakeFailed};

type SslResult<T> = std::result::Result<T, ErrorStack>;

static WEAK_CIPHERS: OnceCell<()> = OnceCell::new();

/// Allow the legacy 3DES and RC4 suites to be offered.
///
/// Older browsers still list them, so impersonating one needs them in the
/// ClientHello. The switch is process wide and can only be turned on. Every
/// client build calls this before its first dial.
pub fn enable_weak_ciphers() {
    if WEAK_CIPHERS.set(()).is_ok() {
        debug!("weak cipher suites enabled");
    }
}

/// Returns true once [`enable_weak_ciphers`] has run.
pub fn weak_ciphers_enabled() -> bool {
    WEAK_CIPHERS.get().is_some()
}

/// A TLS protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TlsVersion {
    /// TLS 1.0
    Tls1_0,
    /// TLS 1.1
    Tls1_1,
    /// TLS 1.2
    Tls1_2,
    /// TLS 1.3
    Tls1_3,
}

impl TlsVersion {
    fn from_ja3(version: u16) -> Option<TlsVersion> {
        match version {
            ja3::TLS1_0 => Some(TlsVersion::Tls1_0),
            ja3::TLS1_1 => Some(TlsVersion::Tls1_1),
            ja3::TLS1_2 => Some(TlsVersion::Tls1_2),
            ja3::TLS1_3 => Some(TlsVersion::Tls1_3),
            _ => None,
        }
    }

    fn ssl_version(self) -> SslVersion {
        match self {
            TlsVersion::Tls1_0 => SslVersion::TLS1,
            TlsVersion::Tls1_1 => SslVersion::TLS1_1,
            TlsVersion::Tls1_2 => SslVersion::TLS1_2,
            TlsVersion::Tls1_3 => SslVersion::TLS1_3,
        }
    }
}

/// A supported group BoringSSL can offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    /// X25519Kyber768Draft00 (25497)
    X25519Kyber768,
    /// x25519 (29)
    X25519,
    /// secp256r1 (23)
    P256,
    /// secp384r1 (24)
    P384,
    /// secp521r1 (25)
    P521,
}

impl Curve {
    /// The curve for a supported_groups identifier.
    pub fn from_id(id: u16) -> Option<Curve> {
        match id {
            0x6399 => Some(Curve::X25519Kyber768),
            29 => Some(Curve::X25519),
            23 => Some(Curve::P256),
            24 => Some(Curve::P384),
            25 => Some(Curve::P521),
            _ => None,
        }
    }

    fn ssl_curve(self) -> SslCurve {
        match self {
            Curve::X25519Kyber768 => SslCurve::X25519_KYBER768_DRAFT00,
            Curve::X25519 => SslCurve::X25519,
            Curve::P256 => SslCurve::SECP256R1,
            Curve::P384 => SslCurve::SECP384R1,
            Curve::P521 => SslCurve::SECP521R1,
        }
    }
}

/// A certificate compression algorithm offered in compress_certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertCompression {
    /// brotli (2)
    Brotli,
    /// zlib (1)
    Zlib,
}

impl CertCompression {
    fn algorithm(self) -> CertCompressionAlgorithm {
        match self {
            CertCompression::Brotli => CertCompressionAlgorithm::Brotli,
            CertCompression::Zlib => CertCompressionAlgorithm::Zlib,
        }
    }
}

/// The shape of a ClientHello.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsProfile {
    /// Cipher suite names, in offer order.
    pub ciphers: Vec<&'static str>,
    /// Signature algorithm names, in offer order.
    pub sigalgs: Vec<&'static str>,
    /// Supported groups, in offer order.
    pub curves: Vec<Curve>,
    /// ALPN protocols, most preferred first. Empty omits the extension.
    pub alpn: Vec<String>,
    /// Lowest version offered.
    pub min_version: TlsVersion,
    /// Highest version offered.
    pub max_version: TlsVersion,
    /// Sprinkle GREASE values into the hello.
    pub grease: bool,
    /// Shuffle the extension order on every connection.
    pub permute_extensions: bool,
    /// Send status_request.
    pub ocsp_stapling: bool,
    /// Send signed_certificate_timestamp.
    pub signed_cert_timestamps: bool,
    /// Send session_ticket.
    pub session_ticket: bool,
    /// Send server_name.
    pub server_name: bool,
    /// Send a GREASE encrypted_client_hello.
    pub ech_grease: bool,
    /// Send application_settings for `h2`.
    pub application_settings: bool,
    /// Send compress_certificate offering this algorithm.
    pub cert_compression: Option<CertCompression>,
    /// Extension identifiers in the order they are written, GREASE excluded.
    ///
    /// Empty leaves the order to BoringSSL. Otherwise only the listed
    /// extensions can appear, and an extension BoringSSL does not know is
    /// skipped.
    pub extension_order: Vec<u16>,
}

const PLACEHOLDER_SIGALGS: &[&str] = &[
    "ecdsa_secp256r1_sha256",
    "rsa_pss_rsae_sha256",
    "rsa_pkcs1_sha256",
    "ecdsa_secp384r1_sha384",
    "rsa_pss_rsae_sha384",
    "rsa_pkcs1_sha384",
    "rsa_pss_rsae_sha512",
    "rsa_pkcs1_sha512",
];

// Extensions BoringSSL writes on its own or cannot be asked for.
const UNCONFIGURABLE: &[u16] = &[
    extension::RECORD_SIZE_LIMIT,
    extension::DELEGATED_CREDENTIALS,
    extension::EARLY_DATA,
    extension::PADDING,
];

impl TlsProfile {
    /// The generic starting point of custom fingerprints.
    pub fn placeholder() -> TlsProfile {
        TlsProfile {
            ciphers: Vec::new(),
            sigalgs: PLACEHOLDER_SIGALGS.to_vec(),
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

    /// Apply the values of a parsed JA3 hello.
    ///
    /// Cipher suites and curves without a BoringSSL counterpart are skipped.
    /// A hello that leaves no usable cipher suite is a fingerprint error.
    pub fn with_client_hello(mut self, hello: &ClientHelloSpec) -> crate::Result<TlsProfile> {
        let allow_weak = weak_ciphers_enabled();

        self.ciphers = hello
            .cipher_suites
            .iter()
            .filter(|id| !ja3::is_grease(**id))
            .filter_map(|id| {
                let name = cipher::name_with(*id, allow_weak);
                if name.is_none() {
                    trace!("skipping unsupported cipher suite {id:#06x}");
                }
                name
            })
            .collect();
        if self.ciphers.is_empty() {
            return Err(Error::fingerprint(NoUsableCiphers));
        }

        let curves: Vec<Curve> = hello
            .curves
            .iter()
            .filter(|id| !ja3::is_grease(**id))
            .filter_map(|id| {
                let curve = Curve::from_id(*id);
                if curve.is_none() {
                    trace!("skipping unsupported curve {id}");
                }
                curve
            })
            .collect();
        if !curves.is_empty() {
            self.curves = curves;
        }

        self.alpn = hello.alpn_protocols.clone();
        self.grease = hello.uses_grease();
        self.permute_extensions = false;
        self.ocsp_stapling = hello.has_extension(extension::STATUS_REQUEST);
        self.signed_cert_timestamps = hello.has_extension(extension::SIGNED_CERTIFICATE_TIMESTAMP);
        self.session_ticket = hello.has_extension(extension::SESSION_TICKET);
        self.server_name = hello.has_extension(extension::SERVER_NAME);
        self.ech_grease = hello.has_extension(extension::ENCRYPTED_CLIENT_HELLO);
        self.application_settings =
            hello.has_extension(extension::APPLICATION_SETTINGS) && !self.alpn.is_empty();
        self.cert_compression = hello
            .has_extension(extension::COMPRESS_CERTIFICATE)
            .then_some(CertCompression::Brotli);
        self.extension_order = hello
            .extensions
            .iter()
            .copied()
            .filter(|id| !ja3::is_grease(*id))
            .collect();

        let version = TlsVersion::from_ja3(hello.tls_version).unwrap_or(TlsVersion::Tls1_2);
        self.min_version = version.min(TlsVersion::Tls1_2);
        self.max_version = if hello.has_extension(extension::SUPPORTED_VERSIONS) {
            TlsVersion::Tls1_3
        } else {
            version
        };

        for id in hello.extensions.iter().filter(|id| UNCONFIGURABLE.contains(id)) {
            debug!("extension {id} cannot be configured and is left to boringssl");
        }

        Ok(self)
    }

    /// Offer only `http/1.1` over ALPN.
    pub fn restrict_alpn_http1(&mut self) {
        if !self.alpn.is_empty() {
            self.alpn = vec!["http/1.1".to_owned()];
            self.application_settings = false;
        }
    }

    fn builder(&self, skip_verify: bool) -> SslResult<SslConnectorBuilder> {
        let mut builder = SslConnector::builder(SslMethod::tls_client())?;

        if skip_verify {
            builder.set_verify(SslVerifyMode::NONE);
        } else {
            builder.set_default_verify_paths()?;
        }

        let allow_weak = weak_ciphers_enabled();
        let ciphers: Vec<&str> = self
            .ciphers
            .iter()
            .copied()
            .filter(|name| allow_weak || !cipher::is_weak_name(name))
            .collect();
        // TLS 1.3 suites are fixed by boringssl and rejected in a cipher list
        if ciphers.iter().any(|name| !cipher::is_tls13_name(name)) {
            builder.set_cipher_list(&ciphers.join(":"))?;
        }

        builder.set_sigalgs_list(&self.sigalgs.join(":"))?;
        let curves: Vec<SslCurve> = self.curves.iter().map(|c| c.ssl_curve()).collect();
        builder.set_curves(&curves)?;

        builder.set_grease_enabled(self.grease);
        builder.set_permute_extensions(self.permute_extensions);
        if let Some(compression) = self.cert_compression {
            builder.add_cert_compression_alg(compression.algorithm())?;
        }
        let order = self.extension_types();
        if !order.is_empty() {
            builder.set_extension_permutation(&order)?;
        }
        if self.ocsp_stapling {
            builder.enable_ocsp_stapling();
        }
        if self.signed_cert_timestamps {
            builder.enable_signed_cert_timestamps();
        }
        if !self.session_ticket {
            builder.set_options(SslOptions::NO_TICKET);
        }
        if !self.alpn.is_empty() {
            builder.set_alpn_protos(&alpn_wire(&self.alpn))?;
        }

        builder.set_min_proto_version(Some(self.min_version.ssl_version()))?;
        builder.set_max_proto_version(Some(self.max_version.ssl_version()))?;

        Ok(builder)
    }

    fn extension_types(&self) -> Vec<ExtensionType> {
        self.extension_order
            .iter()
            .filter_map(|id| {
                let ty = ExtensionType::from(*id);
                if ExtensionType::index_of(ty).is_none() {
                    trace!("extension {id} has no place in the boringssl order");
                    return None;
                }
                Some(ty)
            })
            .collect()
    }
}

/// ALPN protocols in their length-prefixed wire form.
fn alpn_wire(protocols: &[String]) -> Vec<u8> {
    let mut wire = Vec::with_capacity(protocols.iter().map(|p| p.len() + 1).sum());
    for protocol in protocols {
        wire.push(protocol.len() as u8);
        wire.extend_from_slice(protocol.as_bytes());
    }
    wire
}

/// Options of a connector that do not come from the fingerprint.
#[derive(Debug, Clone, Copy, Default)]
pub struct TlsOptions {
    /// Skip certificate and hostname verification.
    pub skip_verify: bool,
    /// Offer only `http/1.1` over ALPN.
    pub http1_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Handshake {
    /// Run on the first read or write.
    Lazy,
    /// Run inside the dial.
    Eager,
}

/// A BoringSSL connector shaped after a fingerprint.
#[derive(Clone)]
pub struct TlsConnector {
    inner: SslConnector,
    handshake: Handshake,
    skip_verify: bool,
    server_name: bool,
    ech_grease: bool,
    application_settings: bool,
}

impl TlsConnector {
    /// Build the connector for `spec`.
    ///
    /// Presets hand out streams whose handshake is deferred to first use.
    /// Custom fingerprints are handshaken by the dialer.
    pub fn new(spec: &FingerprintSpec, options: TlsOptions) -> crate::Result<TlsConnector> {
        let (mut profile, handshake) = match spec {
            FingerprintSpec::Preset(preset) => (preset.tls_profile(), Handshake::Lazy),
            FingerprintSpec::Custom(hello) => {
                (TlsProfile::placeholder().with_client_hello(hello)?, Handshake::Eager)
            }
        };
        if options.http1_only {
            profile.restrict_alpn_http1();
        }

        let builder = profile.builder(options.skip_verify).map_err(|e| {
            if spec.is_custom() {
                Error::fingerprint(e)
            } else {
                Error::builder(e)
            }
        })?;

        debug!("tls connector built for {spec}, {handshake:?} handshake");
        Ok(TlsConnector {
            inner: builder.build(),
            handshake,
            skip_verify: options.skip_verify,
            server_name: profile.server_name,
            ech_grease: profile.ech_grease,
            application_settings: profile.application_settings,
        })
    }

    pub(crate) fn handshake(&self) -> Handshake {
        self.handshake
    }

    /// Wrap `tcp` in a TLS stream for `host`. The handshake has not run yet.
    pub(crate) fn setup(&self, host: &str, tcp: TcpStream) -> crate::Result<TlsStream> {
        let mut config = self.inner.configure().map_err(Error::tls)?;
        config.set_verify_hostname(!self.skip_verify);
        config.set_use_server_name_indication(self.server_name);

        if self.ech_grease {
            config.set_enable_ech_grease(true);
        }
        if self.application_settings {
            config.add_application_settings(b"h2").map_err(Error::tls)?;
        }

        let host = host.to_owned();
        Ok(TlsStream::new(async move {
            tokio_boring::connect(config, &host, tcp)
                .await
                .map_err(|e| io::Error::new(io::ErrorKind::Other, HandshakeFailed(e.to_string())))
        }))
    }
}

impl fmt::Debug for TlsConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsConnector")
            .field("handshake", &self.handshake)
            .field("skip_verify", &self.skip_verify)
            .finish()
    }
}

#[derive(Debug)]
struct NoUsableCiphers;

impl fmt::Display for NoUsableCiphers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("none of the cipher suites can be offered")
    }
}

impl std::error::Error for NoUsableCiphers {}
