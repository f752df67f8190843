mod support;
use mimic_request::ProtocolVersion;
use support::{config, server, server::Body};

#[test]
fn test_response_text() {
    let _ = env_logger::try_init();

    let server = server::http(move |_req| async { http::Response::new(Body::from("Hello")) });

    let config = config(ProtocolVersion::Http1, "GET", server.url("/text"));
    let state = mimic_request::blocking::send(&config).unwrap();
    assert_eq!(state.status_code, 200);
    assert_eq!(state.source, "Hello");
}

#[test]
fn test_http2_response() {
    let server = server::http(move |req| async move {
        assert_eq!(req.version(), http::Version::HTTP_2);
        http::Response::new(Body::from("h2"))
    });

    let config = config(ProtocolVersion::Http2, "GET", server.url("/"));
    let state = mimic_request::blocking::send(&config).unwrap();
    assert_eq!(state.protocol, "HTTP/2.0");
    assert_eq!(state.source, "h2");
}

#[test]
fn test_config_from_json() {
    let server = server::http(move |req| async move {
        assert_eq!(req.method(), "PUT");
        assert_eq!(req.headers()["x-user"], "alice");
        http::Response::new(Body::from("stored"))
    });

    let json = serde_json::json!({
        "protocol": "1",
        "url": server.url("/store"),
        "method": "put",
        "hello_client": "Chrome-120",
        "headers": { "X-User": "<user>" },
        "variables": { "user": "alice" },
        "read_response_body": true,
    });
    let config: mimic_request::RequestConfig = serde_json::from_value(json).unwrap();

    let state = mimic_request::blocking::send(&config).unwrap();
    assert_eq!(state.source, "stored");
}

#[test]
fn test_missing_method_is_config_error() {
    let config = mimic_request::RequestConfig {
        url: "http://127.0.0.1:1/".into(),
        ..Default::default()
    };
    let err = mimic_request::blocking::send(&config).unwrap_err();
    assert!(err.is_builder());
}
