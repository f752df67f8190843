//! JA3 client hello specifications
//!
//! A JA3 string lists the decimal values a client hello carries, in order:
//!
//! ```text
//! version,ciphers,extensions,curves,point_formats
//! 771,4865-4866-4867-49195,0-23-65281-10-11-35-16-5-13,29-23-24,0
//! ```
//!
//! Lists are `-` separated and the curve and point format lists may be
//! empty. The ALPN protocols are not part of JA3; they follow from the HTTP
//! version the client is built for.

use std::fmt;

use crate::config::ProtocolVersion;

/// Well known TLS extension identifiers.
pub mod extension {
    /// server_name
    pub const SERVER_NAME: u16 = 0;
    /// status_request (OCSP stapling)
    pub const STATUS_REQUEST: u16 = 5;
    /// supported_groups
    pub const SUPPORTED_GROUPS: u16 = 10;
    /// ec_point_formats
    pub const EC_POINT_FORMATS: u16 = 11;
    /// signature_algorithms
    pub const SIGNATURE_ALGORITHMS: u16 = 13;
    /// application_layer_protocol_negotiation
    pub const ALPN: u16 = 16;
    /// signed_certificate_timestamp
    pub const SIGNED_CERTIFICATE_TIMESTAMP: u16 = 18;
    /// padding
    pub const PADDING: u16 = 21;
    /// extended_master_secret
    pub const EXTENDED_MASTER_SECRET: u16 = 23;
    /// compress_certificate
    pub const COMPRESS_CERTIFICATE: u16 = 27;
    /// record_size_limit
    pub const RECORD_SIZE_LIMIT: u16 = 28;
    /// delegated_credentials
    pub const DELEGATED_CREDENTIALS: u16 = 34;
    /// session_ticket
    pub const SESSION_TICKET: u16 = 35;
    /// pre_shared_key
    pub const PRE_SHARED_KEY: u16 = 41;
    /// early_data
    pub const EARLY_DATA: u16 = 42;
    /// supported_versions
    pub const SUPPORTED_VERSIONS: u16 = 43;
    /// psk_key_exchange_modes
    pub const PSK_KEY_EXCHANGE_MODES: u16 = 45;
    /// key_share
    pub const KEY_SHARE: u16 = 51;
    /// application_settings (ALPS)
    pub const APPLICATION_SETTINGS: u16 = 17513;
    /// encrypted_client_hello
    pub const ENCRYPTED_CLIENT_HELLO: u16 = 65037;
    /// renegotiation_info
    pub const RENEGOTIATION_INFO: u16 = 65281;
}

/// TLS 1.0 as written in JA3.
pub const TLS1_0: u16 = 769;
/// TLS 1.1 as written in JA3.
pub const TLS1_1: u16 = 770;
/// TLS 1.2 as written in JA3.
pub const TLS1_2: u16 = 771;
/// TLS 1.3 as written in JA3.
pub const TLS1_3: u16 = 772;

/// Returns true for RFC 8701 GREASE values (`0x0a0a`, `0x1a1a`, ... `0xfafa`).
pub fn is_grease(value: u16) -> bool {
    value & 0x0f0f == 0x0a0a && value >> 8 == value & 0xff
}

/// A client hello described by a JA3 string.
///
/// Every list keeps the order of the source string, GREASE values included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHelloSpec {
    /// The legacy version field.
    pub tls_version: u16,
    /// Cipher suite identifiers.
    pub cipher_suites: Vec<u16>,
    /// Extension identifiers.
    pub extensions: Vec<u16>,
    /// Supported group identifiers.
    pub curves: Vec<u16>,
    /// EC point formats.
    pub point_formats: Vec<u8>,
    /// ALPN protocols, most preferred first.
    pub alpn_protocols: Vec<String>,
    /// The HTTP version this hello was built for.
    pub protocol: ProtocolVersion,
}

impl ClientHelloSpec {
    /// Returns true if the hello carries extension `id`.
    pub fn has_extension(&self, id: u16) -> bool {
        self.extensions.contains(&id)
    }

    /// Returns true if any list contains a GREASE value.
    pub fn uses_grease(&self) -> bool {
        self.cipher_suites
            .iter()
            .chain(&self.extensions)
            .chain(&self.curves)
            .any(|v| is_grease(*v))
    }
}

/// Parse a JA3 string for a client speaking `protocol`.
pub fn parse(ja3: &str, protocol: ProtocolVersion) -> Result<ClientHelloSpec, Ja3Error> {
    let fields: Vec<&str> = ja3.trim().split(',').collect();
    if fields.len() != 5 {
        return Err(Ja3Error::FieldCount(fields.len()));
    }

    let tls_version = parse_value("version", fields[0])?;
    if !(TLS1_0..=TLS1_3).contains(&tls_version) {
        return Err(Ja3Error::UnsupportedVersion(tls_version));
    }

    let cipher_suites = parse_list("ciphers", fields[1])?;
    if cipher_suites.is_empty() {
        return Err(Ja3Error::EmptyCiphers);
    }
    let extensions = parse_list("extensions", fields[2])?;
    let curves = parse_list("curves", fields[3])?;
    let point_formats = parse_list("point formats", fields[4])?;

    let alpn_protocols = match protocol {
        ProtocolVersion::Http1 => vec!["http/1.1".to_owned()],
        ProtocolVersion::Http2 if extensions.contains(&extension::ALPN) => {
            vec!["h2".to_owned(), "http/1.1".to_owned()]
        }
        _ => Vec::new(),
    };

    Ok(ClientHelloSpec {
        tls_version,
        cipher_suites,
        extensions,
        curves,
        point_formats,
        alpn_protocols,
        protocol,
    })
}

fn parse_value<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, Ja3Error> {
    value.trim().parse().map_err(|_| Ja3Error::InvalidNumber {
        field,
        value: value.trim().to_owned(),
    })
}

fn parse_list<T: std::str::FromStr>(field: &'static str, list: &str) -> Result<Vec<T>, Ja3Error> {
    let list = list.trim();
    if list.is_empty() {
        return Ok(Vec::new());
    }
    list.split('-').map(|value| parse_value(field, value)).collect()
}

/// A JA3 string that could not be parsed.
#[derive(Debug)]
pub enum Ja3Error {
    /// The string does not have exactly five comma separated fields.
    FieldCount(usize),
    /// A value is not a decimal number of the right width.
    InvalidNumber {
        /// The field being parsed.
        field: &'static str,
        /// The offending text.
        value: String,
    },
    /// The version is not between TLS 1.0 and TLS 1.3.
    UnsupportedVersion(u16),
    /// No cipher suite is listed.
    EmptyCiphers,
}

impl fmt::Display for Ja3Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ja3Error::FieldCount(n) => write!(f, "expected 5 fields in ja3 string, found {n}"),
            Ja3Error::InvalidNumber { field, value } => {
                write!(f, "invalid value {value:?} in ja3 {field}")
            }
            Ja3Error::UnsupportedVersion(v) => write!(f, "unsupported tls version {v}"),
            Ja3Error::EmptyCiphers => f.write_str("ja3 string lists no cipher suites"),
        }
    }
}

impl std::error::Error for Ja3Error {}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME: &str = "771,4865-4866-4867-49195-49199-49196-49200-52393-52392-49171-49172-156-157-47-53,0-23-65281-10-11-35-16-5-13-18-51-45-43-27-17513,29-23-24,0";

    #[test]
    fn parse_keeps_order() {
        let spec = parse(CHROME, ProtocolVersion::Http2).unwrap();
        assert_eq!(spec.tls_version, TLS1_2);
        assert_eq!(&spec.cipher_suites[..4], [4865, 4866, 4867, 49195]);
        assert_eq!(spec.extensions[..3], [0, 23, 65281]);
        assert_eq!(spec.curves, [29, 23, 24]);
        assert_eq!(spec.point_formats, [0]);
        assert_eq!(spec.alpn_protocols, ["h2", "http/1.1"]);
        assert!(spec.has_extension(extension::APPLICATION_SETTINGS));
        assert!(!spec.uses_grease());
    }

    #[test]
    fn alpn_follows_protocol() {
        let spec = parse(CHROME, ProtocolVersion::Http1).unwrap();
        assert_eq!(spec.alpn_protocols, ["http/1.1"]);

        let no_alpn = "771,4865-4866,0-23-10,29,0";
        let spec = parse(no_alpn, ProtocolVersion::Http2).unwrap();
        assert!(spec.alpn_protocols.is_empty());
    }

    #[test]
    fn empty_curves_and_point_formats() {
        let spec = parse("771,49195-49199,0-16,,", ProtocolVersion::Http2).unwrap();
        assert!(spec.curves.is_empty());
        assert!(spec.point_formats.is_empty());
    }

    #[test]
    fn grease_detection() {
        assert!(is_grease(0x0a0a));
        assert!(is_grease(0xfafa));
        assert!(!is_grease(0x0a1a));
        assert!(!is_grease(0x1301));

        let spec = parse("771,2570-4865,2570-0-16,6682-29,0", ProtocolVersion::Http2).unwrap();
        assert!(spec.uses_grease());
    }

    #[test]
    fn malformed_strings() {
        assert!(matches!(
            parse("771,4865,0", ProtocolVersion::Http2),
            Err(Ja3Error::FieldCount(3))
        ));
        assert!(matches!(
            parse("771,4865-x,0,29,0", ProtocolVersion::Http2),
            Err(Ja3Error::InvalidNumber { field: "ciphers", .. })
        ));
        assert!(matches!(
            parse("771,4865,0,29,256", ProtocolVersion::Http2),
            Err(Ja3Error::InvalidNumber { field: "point formats", .. })
        ));
        assert!(matches!(
            parse("771,,0,29,0", ProtocolVersion::Http2),
            Err(Ja3Error::EmptyCiphers)
        ));
        assert!(matches!(
            parse("768,4865,0,29,0", ProtocolVersion::Http2),
            Err(Ja3Error::UnsupportedVersion(768))
        ));
    }
}
