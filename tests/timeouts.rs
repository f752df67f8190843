mod support;
use std::time::{Duration, Instant};

use mimic_request::ProtocolVersion;
use support::{config, server, server::Body};

#[tokio::test]
async fn client_timeout() {
    let _ = env_logger::try_init();

    let server = server::http(move |_req| {
        async {
            // delay returning the response
            tokio::time::sleep(Duration::from_secs(3)).await;
            http::Response::default()
        }
    });

    for protocol in [ProtocolVersion::Http1, ProtocolVersion::Http2] {
        let url = server.url("/slow");
        let mut config = config(protocol, "GET", url.clone());
        config.timeout = Some("1".into());

        let start = Instant::now();
        let err = mimic_request::send(&config).await.unwrap_err();

        assert!(err.is_timeout());
        assert!(err.is_retryable());
        assert_eq!(err.url().map(|u| u.as_str()), Some(url.as_str()));
        assert!(start.elapsed() < Duration::from_secs(3));
    }
}

#[tokio::test]
async fn zero_timeout_means_no_deadline() {
    let _ = env_logger::try_init();

    let server = server::http(move |_req| async {
        tokio::time::sleep(Duration::from_millis(300)).await;
        http::Response::new(Body::from("slow but fine"))
    });

    for timeout in ["0", "-5"] {
        let mut config = config(ProtocolVersion::Http1, "GET", server.url("/slow"));
        config.timeout = Some(timeout.into());

        let state = mimic_request::send(&config).await.unwrap();
        assert_eq!(state.source, "slow but fine");
    }
}

#[tokio::test]
async fn timeout_covers_redirects() {
    let server = server::http(move |req| async move {
        if req.uri() == "/redirect" {
            http::Response::builder()
                .status(302)
                .header("location", "/slow")
                .body(Body::default())
                .unwrap()
        } else {
            tokio::time::sleep(Duration::from_secs(3)).await;
            http::Response::default()
        }
    });

    let mut config = config(ProtocolVersion::Http1, "GET", server.url("/redirect"));
    config.timeout = Some("1".into());

    let err = mimic_request::send(&config).await.unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(
        err.url().map(|u| u.as_str()),
        Some(server.url("/redirect").as_str())
    );
}
