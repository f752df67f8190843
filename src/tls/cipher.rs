//! Cipher suite identifiers
//!
//! Maps the IANA identifiers found in JA3 strings to the standard names
//! BoringSSL accepts in a cipher list.

/// Suites BoringSSL negotiates without further setup.
const CIPHERS: &[(u16, &str)] = &[
    (0x1301, "TLS_AES_128_GCM_SHA256"),
    (0x1302, "TLS_AES_256_GCM_SHA384"),
    (0x1303, "TLS_CHACHA20_POLY1305_SHA256"),
    (0xc02b, "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256"),
    (0xc02f, "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256"),
    (0xc02c, "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384"),
    (0xc030, "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384"),
    (0xcca9, "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256"),
    (0xcca8, "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256"),
    (0xc009, "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA"),
    (0xc00a, "TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA"),
    (0xc013, "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA"),
    (0xc014, "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA"),
    (0xc023, "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA256"),
    (0xc024, "TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA384"),
    (0xc027, "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA256"),
    (0xc028, "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA384"),
    (0xc035, "TLS_ECDHE_PSK_WITH_AES_128_CBC_SHA"),
    (0xc036, "TLS_ECDHE_PSK_WITH_AES_256_CBC_SHA"),
    (0xccac, "TLS_ECDHE_PSK_WITH_CHACHA20_POLY1305_SHA256"),
    (0x009c, "TLS_RSA_WITH_AES_128_GCM_SHA256"),
    (0x009d, "TLS_RSA_WITH_AES_256_GCM_SHA384"),
    (0x002f, "TLS_RSA_WITH_AES_128_CBC_SHA"),
    (0x0035, "TLS_RSA_WITH_AES_256_CBC_SHA"),
    (0x003c, "TLS_RSA_WITH_AES_128_CBC_SHA256"),
    (0x003d, "TLS_RSA_WITH_AES_256_CBC_SHA256"),
    (0x008c, "TLS_PSK_WITH_AES_128_CBC_SHA"),
    (0x008d, "TLS_PSK_WITH_AES_256_CBC_SHA"),
];

/// Legacy suites only offered once weak ciphers are enabled.
const WEAK_CIPHERS: &[(u16, &str)] = &[
    (0x000a, "TLS_RSA_WITH_3DES_EDE_CBC_SHA"),
    (0xc008, "TLS_ECDHE_ECDSA_WITH_3DES_EDE_CBC_SHA"),
    (0xc012, "TLS_ECDHE_RSA_WITH_3DES_EDE_CBC_SHA"),
    (0x0005, "TLS_RSA_WITH_RC4_128_SHA"),
    (0xc007, "TLS_ECDHE_ECDSA_WITH_RC4_128_SHA"),
    (0xc011, "TLS_ECDHE_RSA_WITH_RC4_128_SHA"),
];

/// The standard name of cipher suite `id`, honoring the process wide weak
/// cipher switch.
pub fn name(id: u16) -> Option<&'static str> {
    name_with(id, super::weak_ciphers_enabled())
}

pub(crate) fn name_with(id: u16, allow_weak: bool) -> Option<&'static str> {
    let lookup = |table: &[(u16, &'static str)]| {
        table
            .iter()
            .find(|(suite, _)| *suite == id)
            .map(|(_, name)| *name)
    };

    lookup(CIPHERS).or_else(|| if allow_weak { lookup(WEAK_CIPHERS) } else { None })
}

/// Returns true if `name` is one of the legacy 3DES or RC4 suites.
pub(crate) fn is_weak_name(name: &str) -> bool {
    name.contains("_3DES_") || name.contains("_RC4_")
}

/// Returns true if `name` is a TLS 1.3 suite, which BoringSSL does not take
/// from the cipher list.
pub(crate) fn is_tls13_name(name: &str) -> bool {
    !name.contains("_WITH_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_suites() {
        assert_eq!(name_with(0x1301, false), Some("TLS_AES_128_GCM_SHA256"));
        assert_eq!(
            name_with(0xc02f, false),
            Some("TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256")
        );
        assert_eq!(name_with(0x00ff, true), None);
    }

    #[test]
    fn weak_suites_need_opt_in() {
        assert_eq!(name_with(0x000a, false), None);
        assert_eq!(name_with(0x000a, true), Some("TLS_RSA_WITH_3DES_EDE_CBC_SHA"));
        assert!(is_weak_name("TLS_RSA_WITH_3DES_EDE_CBC_SHA"));
        assert!(!is_weak_name("TLS_RSA_WITH_AES_128_CBC_SHA"));
    }

    #[test]
    fn tls13_names() {
        assert!(is_tls13_name("TLS_CHACHA20_POLY1305_SHA256"));
        assert!(!is_tls13_name("TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256"));
    }
}
