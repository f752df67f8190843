use mimic_request::{ProtocolVersion, RequestConfig};

// Chrome 120 as seen by a JA3 fingerprinting service
const JA3: &str = "771,4865-4866-4867-49195-49199-49196-49200-52393-52392-49171-49172-156-157-47-53,\
0-23-65281-10-11-35-16-5-13-18-51-45-43-27-17513-21,29-23-24,0";

fn main() -> Result<(), mimic_request::Error> {
    env_logger::init();

    let config = RequestConfig {
        protocol: ProtocolVersion::Http2,
        url: "https://tls.peet.ws/api/all".into(),
        method: "GET".into(),
        hello_client: "CustomInternal".into(),
        client_spec: JA3.into(),
        http2_fingerprint: Some("1:65536;2:0;4:6291456;6:262144|15663105|0|m,a,s,p".into()),
        timeout: Some("10".into()),
        read_response_body: true,
        read_response_headers: true,
        ..Default::default()
    };

    // The custom hello is handshaken while dialing, so a rejected
    // fingerprint shows up as a TLS error
    match mimic_request::blocking::send(&config) {
        Ok(state) => {
            println!("{} {}", state.protocol, state.status);
            for (name, value) in &state.headers {
                println!("{name}: {value}");
            }
            println!("{}", state.source);
        }
        Err(e) if e.is_tls() => eprintln!("handshake rejected: {e}"),
        Err(e) => return Err(e),
    }

    Ok(())
}
