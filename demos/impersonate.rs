use mimic_request::{ProtocolVersion, RequestConfig};

#[tokio::main]
async fn main() -> Result<(), mimic_request::Error> {
    env_logger::init();

    for browser in ["Chrome-124", "Firefox-117", "Safari-17.0", "OkHttp-4.9"] {
        // Mimic the browser's TLS and HTTP/2 fingerprint
        let config = RequestConfig {
            protocol: ProtocolVersion::Http2,
            url: "https://tls.peet.ws/api/all".into(),
            method: "GET".into(),
            hello_client: browser.into(),
            read_response_body: true,
            ..Default::default()
        };

        let state = mimic_request::send(&config).await?;
        println!("{browser}: {} over {}", state.status, state.protocol);
        println!("{}", state.source);
    }

    Ok(())
}
