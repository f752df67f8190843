pub mod server;

use mimic_request::{ProtocolVersion, RequestConfig};

/// A config for `method url` over cleartext with the default fingerprint.
#[allow(unused)]
pub fn config(protocol: ProtocolVersion, method: &str, url: String) -> RequestConfig {
    RequestConfig {
        protocol,
        url,
        method: method.into(),
        hello_client: "-".into(),
        allow_http: true,
        read_response_body: true,
        read_response_headers: true,
        ..Default::default()
    }
}
