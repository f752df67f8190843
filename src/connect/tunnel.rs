use std::{fmt, io};

use http::HeaderValue;
use log::trace;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug)]
pub(crate) enum TunnelError {
    Io(io::Error),
    ProxyAuthRequired,
    ProxyHeadersTooLong,
    TunnelUnexpectedEof,
    TunnelUnsuccessful,
}

/// Establish an HTTP `CONNECT` tunnel to `host:port` over `conn`.
pub(crate) async fn tunnel<T>(
    mut conn: T,
    host: &str,
    port: u16,
    auth: Option<&HeaderValue>,
) -> Result<T, TunnelError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let authority = if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    };

    let mut buf = format!(
        "\
         CONNECT {authority} HTTP/1.1\r\n\
         Host: {authority}\r\n\
         "
    )
    .into_bytes();

    if let Some(auth) = auth {
        buf.extend_from_slice(b"Proxy-Authorization: ");
        buf.extend_from_slice(auth.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // headers end
    buf.extend_from_slice(b"\r\n");

    conn.write_all(&buf).await.map_err(TunnelError::Io)?;

    let mut buf = [0; 8192];
    let mut pos = 0;

    loop {
        let n = conn.read(&mut buf[pos..]).await.map_err(TunnelError::Io)?;

        if n == 0 {
            return Err(TunnelError::TunnelUnexpectedEof);
        }
        pos += n;

        let recvd = &buf[..pos];
        if recvd.starts_with(b"HTTP/1.1 200") || recvd.starts_with(b"HTTP/1.0 200") {
            if recvd.ends_with(b"\r\n\r\n") {
                trace!("tunnel to {authority} established");
                return Ok(conn);
            }
            if pos == buf.len() {
                return Err(TunnelError::ProxyHeadersTooLong);
            }
        // else read more
        } else if recvd.starts_with(b"HTTP/1.1 407") || recvd.starts_with(b"HTTP/1.0 407") {
            return Err(TunnelError::ProxyAuthRequired);
        } else if pos < 12 {
            // status line still incomplete
            continue;
        } else {
            return Err(TunnelError::TunnelUnsuccessful);
        }
    }
}

impl fmt::Display for TunnelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("tunnel error: ")?;

        f.write_str(match self {
            TunnelError::ProxyAuthRequired => "proxy authorization required",
            TunnelError::ProxyHeadersTooLong => "proxy response headers too long",
            TunnelError::TunnelUnexpectedEof => "unexpected end of file",
            TunnelError::TunnelUnsuccessful => "unsuccessful",
            TunnelError::Io(_) => "io error establishing tunnel",
        })
    }
}

impl std::error::Error for TunnelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TunnelError::Io(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
    };

    use super::*;

    #[tokio::test]
    async fn test_tunnel_works() {
        let tcp = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = tcp.local_addr().expect("local_addr");

        let t1 = tokio::spawn(async move {
            let conn = TcpStream::connect(addr).await.expect("connect");
            let _conn = tunnel(conn, "hyper.rs", 443, None).await.expect("tunnel");
        });

        let t2 = tokio::spawn(async move {
            let (mut io, _) = tcp.accept().await.expect("accept");
            let mut buf = [0u8; 64];
            let n = io.read(&mut buf).await.expect("read 1");
            assert_eq!(
                &buf[..n],
                b"CONNECT hyper.rs:443 HTTP/1.1\r\nHost: hyper.rs:443\r\n\r\n"
            );
            io.write_all(b"HTTP/1.1 200 OK\r\n\r\n")
                .await
                .expect("write 1");
        });

        t1.await.expect("task 1");
        t2.await.expect("task 2");
    }

    #[tokio::test]
    async fn test_tunnel_sends_proxy_authorization() {
        let tcp = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = tcp.local_addr().expect("local_addr");

        let t1 = tokio::spawn(async move {
            let conn = TcpStream::connect(addr).await.expect("connect");
            let auth = HeaderValue::from_static("Basic dXNlcjpwYXNz");
            let err = tunnel(conn, "::1", 8443, Some(&auth)).await.unwrap_err();
            assert!(matches!(err, TunnelError::ProxyAuthRequired));
        });

        let t2 = tokio::spawn(async move {
            let (mut io, _) = tcp.accept().await.expect("accept");
            let mut buf = [0u8; 128];
            let n = io.read(&mut buf).await.expect("read 1");
            assert_eq!(
                &buf[..n],
                &b"CONNECT [::1]:8443 HTTP/1.1\r\nHost: [::1]:8443\r\nProxy-Authorization: Basic dXNlcjpwYXNz\r\n\r\n"[..]
            );
            io.write_all(b"HTTP/1.1 407 Proxy Authentication Required\r\n\r\n")
                .await
                .expect("write 1");
        });

        t1.await.expect("task 1");
        t2.await.expect("task 2");
    }

    #[tokio::test]
    async fn test_tunnel_rejected() {
        let tcp = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = tcp.local_addr().expect("local_addr");

        let t1 = tokio::spawn(async move {
            let conn = TcpStream::connect(addr).await.expect("connect");
            let err = tunnel(conn, "example.test", 443, None).await.unwrap_err();
            assert!(matches!(err, TunnelError::TunnelUnsuccessful));
        });

        let t2 = tokio::spawn(async move {
            let (mut io, _) = tcp.accept().await.expect("accept");
            let mut buf = [0u8; 64];
            let _ = io.read(&mut buf).await.expect("read 1");
            io.write_all(b"HTTP/1.1 403 Forbidden\r\n\r\n")
                .await
                .expect("write 1");
        });

        t1.await.expect("task 1");
        t2.await.expect("task 2");
    }
}
