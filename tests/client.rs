mod support;
use std::io::Write;

use http::{header, Version};
use mimic_request::ProtocolVersion;
use support::{config, server, server::Body};

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = libflate::gzip::Encoder::new(Vec::new()).unwrap();
    encoder.write_all(data).unwrap();
    encoder.finish().into_result().unwrap()
}

#[tokio::test]
async fn http1_get() {
    let _ = env_logger::try_init();

    let server = server::http(move |req| async move {
        assert_eq!(req.method(), "GET");
        assert_eq!(req.version(), Version::HTTP_11);
        assert_eq!(req.headers()[header::CONNECTION], "close");
        assert_eq!(req.headers()[header::ACCEPT_ENCODING], "gzip");

        http::Response::builder()
            .header("content-length", "5")
            .body(Body::from("hello"))
            .unwrap()
    });

    let config = config(ProtocolVersion::Http1, "get", server.url("/text"));
    let state = mimic_request::send(&config).await.unwrap();

    assert_eq!(state.status, "200 OK");
    assert_eq!(state.status_code, 200);
    assert_eq!(state.protocol, "HTTP/1.1");
    assert_eq!((state.proto_major, state.proto_minor), (1, 1));
    assert_eq!(state.content_length, 5);
    assert_eq!(state.headers["Content-Length"], "5");
    assert_eq!(state.source, "hello");
    assert!(!state.was_uncompressed);
    assert!(state.location.is_none());
}

#[tokio::test]
async fn http2_prior_knowledge_get() {
    let _ = env_logger::try_init();

    let server = server::http(move |req| async move {
        assert_eq!(req.version(), Version::HTTP_2);
        assert!(req.headers().get(header::CONNECTION).is_none());
        http::Response::new(Body::from("over h2"))
    });

    let config = config(ProtocolVersion::Http2, "GET", server.url("/h2"));
    let state = mimic_request::send(&config).await.unwrap();

    assert_eq!(state.status_code, 200);
    assert_eq!(state.protocol, "HTTP/2.0");
    assert_eq!((state.proto_major, state.proto_minor), (2, 0));
    assert_eq!(state.source, "over h2");
}

#[tokio::test]
async fn unspecified_protocol_uses_http2() {
    let server = server::http(move |req| async move {
        assert_eq!(req.version(), Version::HTTP_2);
        http::Response::default()
    });

    let config = config(ProtocolVersion::Unspecified, "GET", server.url("/"));
    let state = mimic_request::send(&config).await.unwrap();
    assert_eq!(state.protocol, "HTTP/2.0");
}

#[tokio::test]
async fn http2_cleartext_needs_allow_http() {
    let server = server::http(move |_req| async move { http::Response::default() });

    let mut config = config(ProtocolVersion::Http2, "GET", server.url("/"));
    config.allow_http = false;
    let err = mimic_request::send(&config).await.unwrap_err();
    assert!(err.is_request());
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn post_payload_and_headers() {
    let _ = env_logger::try_init();

    for protocol in [ProtocolVersion::Http1, ProtocolVersion::Http2] {
        let server = server::http(move |req| async move {
            let (parts, body) = server::body_bytes(req).await;
            assert_eq!(parts.method, "POST");
            assert_eq!(parts.headers["x-token"], "secret-42");
            let accept: Vec<_> = parts.headers.get_all("x-accept").iter().collect();
            assert_eq!(accept, ["a", "b"]);
            http::Response::new(Body::from(body))
        });

        let mut config = config(protocol, "post", server.url("/echo"));
        config.payload = "payload body".into();
        config.headers.append("X-Token", "secret-<id>");
        config.headers.append("X-Accept", "a");
        config.headers.append("X-Accept", "b");
        config.variables.insert("id".into(), "42".into());

        let state = mimic_request::send(&config).await.unwrap();
        assert_eq!(state.status_code, 200);
        assert_eq!(state.source, "payload body");
    }
}

#[tokio::test]
async fn multi_value_headers_are_joined() {
    let server = server::http(move |_req| async move {
        http::Response::builder()
            .header("x-multi", "a")
            .header("x-multi", "b")
            .body(Body::default())
            .unwrap()
    });

    let config = config(ProtocolVersion::Http1, "GET", server.url("/"));
    let state = mimic_request::send(&config).await.unwrap();
    assert_eq!(state.headers["X-Multi"], "a, b");
    assert_eq!(state.source, "");
}

#[tokio::test]
async fn response_parts_are_opt_in() {
    let server = server::http(move |_req| async move {
        http::Response::builder()
            .header("x-seen", "1")
            .header("set-cookie", "a=b")
            .body(Body::from("body"))
            .unwrap()
    });

    let mut config = config(ProtocolVersion::Http1, "GET", server.url("/"));
    config.read_response_body = false;
    config.read_response_headers = false;
    let state = mimic_request::send(&config).await.unwrap();

    assert_eq!(state.status_code, 200);
    assert!(state.headers.is_empty());
    assert!(state.cookies.is_empty());
    assert!(state.source.is_empty());
}

#[tokio::test]
async fn gzip_response_is_decompressed() {
    let _ = env_logger::try_init();

    let content: String = (0..1000).map(|i| format!("test {i}")).collect();
    let compressed = gzip(content.as_bytes());

    for protocol in [ProtocolVersion::Http1, ProtocolVersion::Http2] {
        let compressed = compressed.clone();
        let server = server::http(move |req| {
            let compressed = compressed.clone();
            async move {
                assert_eq!(req.headers()[header::ACCEPT_ENCODING], "gzip");
                http::Response::builder()
                    .header("content-encoding", "gzip")
                    .header("content-length", compressed.len())
                    .body(Body::from(compressed))
                    .unwrap()
            }
        });

        let config = config(protocol, "GET", server.url("/gzip"));
        let state = mimic_request::send(&config).await.unwrap();

        assert!(state.was_uncompressed);
        assert_eq!(state.content_length, -1);
        assert!(!state.headers.contains_key("Content-Encoding"));
        assert_eq!(state.source, content);
    }
}

#[tokio::test]
async fn caller_accept_encoding_disables_transparent_gzip() {
    let compressed = gzip(b"still readable");

    let server = server::http(move |req| {
        let compressed = compressed.clone();
        async move {
            assert_eq!(req.headers()[header::ACCEPT_ENCODING], "gzip, br");
            http::Response::builder()
                .header("content-encoding", "gzip")
                .body(Body::from(compressed))
                .unwrap()
        }
    });

    let mut config = config(ProtocolVersion::Http1, "GET", server.url("/"));
    config.headers.append("Accept-Encoding", "gzip, br");
    let state = mimic_request::send(&config).await.unwrap();

    // not decoded by the transport, the body fallback still decodes it
    assert!(!state.was_uncompressed);
    assert_eq!(state.headers["Content-Encoding"], "gzip");
    assert_eq!(state.source, "still readable");
}

#[tokio::test]
async fn disabled_compression_keeps_plain_body() {
    let server = server::http(move |req| async move {
        assert!(req.headers().get(header::ACCEPT_ENCODING).is_none());
        http::Response::new(Body::from("\x1f not gzip"))
    });

    let mut config = config(ProtocolVersion::Http1, "GET", server.url("/"));
    config.disable_compression = true;
    let state = mimic_request::send(&config).await.unwrap();

    assert!(!state.was_uncompressed);
    assert_eq!(state.source, "\x1f not gzip");
}

#[tokio::test]
async fn location_is_resolved_against_final_url() {
    let server = server::http(move |_req| async move {
        http::Response::builder()
            .status(302)
            .header("location", "../next?x=1")
            .body(Body::default())
            .unwrap()
    });

    let mut config = config(ProtocolVersion::Http1, "GET", server.url("/a/b"));
    config.max_redirects = Some("false".into());
    let state = mimic_request::send(&config).await.unwrap();

    assert_eq!(state.status, "302 Found");
    assert_eq!(state.location, Some(server.url("/next?x=1")));
}

#[tokio::test]
async fn connection_refused_is_connect_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    for protocol in [ProtocolVersion::Http1, ProtocolVersion::Http2] {
        let config = config(protocol, "GET", format!("http://{addr}/"));
        let err = mimic_request::send(&config).await.unwrap_err();
        assert!(err.is_connect(), "{err:?}");
        assert!(err.is_retryable());
        assert_eq!(err.url().map(|u| u.as_str()), Some(&*format!("http://{addr}/")));
    }
}

#[tokio::test]
async fn http2_connections_are_closed_after_send() {
    let mut server = server::http(move |_req| async move { http::Response::default() });

    let config = config(ProtocolVersion::Http2, "GET", server.url("/"));
    mimic_request::send(&config).await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    let closed = server
        .events()
        .into_iter()
        .filter(|event| matches!(event, server::Event::ConnectionClosed))
        .count();
    assert_eq!(closed, 1);
}
