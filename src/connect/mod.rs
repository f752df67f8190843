//! Transport dialing
//!
//! The [`Dialer`] is the only way connections are made. It opens a TCP
//! stream, directly or through the configured proxy, and wraps it in a TLS
//! stream shaped by the client's fingerprint.

use std::{
    fmt, io,
    pin::Pin,
    task::{Context, Poll},
};

use http::{uri::Scheme, Uri};
use log::{debug, trace};
use tokio::{
    io::{AsyncRead, AsyncWrite, ReadBuf},
    net::TcpStream,
};

use crate::{
    error::{BadScheme, Error, InvalidAddress},
    proxy::ProxyScheme,
    tls::{Handshake, TlsConnector, TlsStream},
};

pub(crate) mod tunnel;

/// Opens connections for a client.
#[derive(Clone, Debug)]
pub struct Dialer {
    proxy: Option<ProxyScheme>,
    tls: TlsConnector,
}

impl Dialer {
    /// A dialer using `tls` for every TLS connection, through `proxy` if set.
    pub fn new(proxy: Option<ProxyScheme>, tls: TlsConnector) -> Dialer {
        Dialer { proxy, tls }
    }

    /// Open a TCP stream to `host:port`.
    pub async fn dial_tcp(&self, host: &str, port: u16) -> crate::Result<TcpStream> {
        let stream = match &self.proxy {
            Some(proxy) => proxy.connect(host, port).await?,
            None => {
                trace!("dialing {host}:{port}");
                TcpStream::connect((host, port)).await.map_err(Error::connect)?
            }
        };
        let _ = stream.set_nodelay(true);
        Ok(stream)
    }

    /// Open a TLS stream to `addr`, given as `host:port`.
    ///
    /// For presets the handshake is left to the first read or write of the
    /// returned stream. Custom fingerprints are handshaken here, and a
    /// failure is reported as a TLS error.
    pub async fn dial_tls(&self, addr: &str) -> crate::Result<TlsStream> {
        let (host, port) = split_host_port(addr)?;
        self.tls_stream(host, port).await
    }

    async fn tls_stream(&self, host: &str, port: u16) -> crate::Result<TlsStream> {
        let tcp = self.dial_tcp(host, port).await?;
        let mut stream = self.tls.setup(host, tcp)?;

        if self.tls.handshake() == Handshake::Eager {
            stream.handshake().await.map_err(Error::tls)?;
            debug!("tls handshake with {host}:{port} complete");
        }
        Ok(stream)
    }

    /// Connect to the origin of `uri`, with TLS for `https`.
    pub async fn connect(&self, uri: &Uri) -> crate::Result<MaybeHttpsStream> {
        let host = uri
            .host()
            .map(|h| h.trim_matches(|c| c == '[' || c == ']'))
            .ok_or_else(|| Error::builder(InvalidAddress(uri.to_string())))?;

        match uri.scheme() {
            Some(scheme) if *scheme == Scheme::HTTPS => {
                let port = uri.port_u16().unwrap_or(443);
                self.tls_stream(host, port).await.map(MaybeHttpsStream::Https)
            }
            Some(scheme) if *scheme == Scheme::HTTP => {
                let port = uri.port_u16().unwrap_or(80);
                self.dial_tcp(host, port).await.map(MaybeHttpsStream::Http)
            }
            _ => Err(Error::builder(BadScheme)),
        }
    }
}

/// Split `host:port`, accepting a bracketed IPv6 host.
pub(crate) fn split_host_port(addr: &str) -> crate::Result<(&str, u16)> {
    let invalid = || Error::builder(InvalidAddress(addr.to_owned()));

    let (host, port) = addr.rsplit_once(':').ok_or_else(invalid)?;
    let host = match host.strip_prefix('[') {
        Some(rest) => rest.strip_suffix(']').ok_or_else(invalid)?,
        None if host.contains(':') => return Err(invalid()),
        None => host,
    };
    if host.is_empty() {
        return Err(invalid());
    }
    let port = port.parse().map_err(|_| invalid())?;
    Ok((host, port))
}

/// A plain or TLS connection.
pub enum MaybeHttpsStream {
    /// A cleartext connection.
    Http(TcpStream),
    /// A TLS connection, possibly not handshaken yet.
    Https(TlsStream),
}

impl fmt::Debug for MaybeHttpsStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaybeHttpsStream::Http(s) => f.debug_tuple("Http").field(s).finish(),
            MaybeHttpsStream::Https(s) => f.debug_tuple("Https").field(s).finish(),
        }
    }
}

impl MaybeHttpsStream {
    /// Finish a pending TLS handshake. Cleartext streams are left alone.
    pub async fn establish(&mut self) -> crate::Result<()> {
        if let MaybeHttpsStream::Https(tls) = self {
            if !tls.is_established() {
                tls.handshake().await.map_err(Error::tls)?;
            }
        }
        Ok(())
    }

    /// Returns true for TLS streams whose server selected `h2` over ALPN.
    pub fn negotiated_h2(&self) -> bool {
        match self {
            MaybeHttpsStream::Https(tls) => tls.negotiated_alpn() == Some(&b"h2"[..]),
            MaybeHttpsStream::Http(_) => false,
        }
    }
}

impl AsyncRead for MaybeHttpsStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MaybeHttpsStream::Http(s) => Pin::new(s).poll_read(cx, buf),
            MaybeHttpsStream::Https(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for MaybeHttpsStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            MaybeHttpsStream::Http(s) => Pin::new(s).poll_write(cx, buf),
            MaybeHttpsStream::Https(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MaybeHttpsStream::Http(s) => Pin::new(s).poll_flush(cx),
            MaybeHttpsStream::Https(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MaybeHttpsStream::Http(s) => Pin::new(s).poll_shutdown(cx),
            MaybeHttpsStream::Https(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::{io::AsyncWriteExt, net::TcpListener};

    use super::*;
    use crate::{
        config::ProtocolVersion,
        fingerprint::{self, FingerprintSpec},
        tls::TlsOptions,
    };

    const JA3: &str = "771,4865-4866-4867-49195-49199,0-23-65281-10-11-35-16-5-13-43,29-23-24,0";

    fn dialer(spec: &FingerprintSpec) -> Dialer {
        let tls = TlsConnector::new(
            spec,
            TlsOptions {
                skip_verify: true,
                http1_only: false,
            },
        )
        .unwrap();
        Dialer::new(None, tls)
    }

    /// A peer that answers in cleartext and hangs up.
    async fn plain_server() -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut io, _)) = listener.accept().await {
                let _ = io.write_all(b"HTTP/1.1 400 Bad Request\r\n\r\n").await;
            }
        });
        addr
    }

    #[test]
    fn split_addresses() {
        assert_eq!(split_host_port("example.com:443").unwrap(), ("example.com", 443));
        assert_eq!(split_host_port("[::1]:8443").unwrap(), ("::1", 8443));

        for bad in ["example.com", ":443", "example.com:https", "::1:443", "[::1:443", "a:70000"] {
            assert!(split_host_port(bad).unwrap_err().is_builder(), "{bad}");
        }
    }

    #[tokio::test]
    async fn preset_dial_defers_handshake() {
        let addr = plain_server().await;
        let dialer = dialer(&FingerprintSpec::default());

        let stream = dialer.dial_tls(&addr.to_string()).await.unwrap();
        assert!(!stream.is_established());
    }

    #[tokio::test]
    async fn custom_dial_handshakes_eagerly() {
        let addr = plain_server().await;
        let spec = fingerprint::resolve("CustomInternal", JA3, ProtocolVersion::Http2).unwrap();
        let dialer = dialer(&spec);

        let err = dialer.dial_tls(&addr.to_string()).await.unwrap_err();
        assert!(err.is_tls(), "{err:?}");
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn invalid_address_is_config_error() {
        let dialer = dialer(&FingerprintSpec::default());
        let err = dialer.dial_tls("no-port").await.unwrap_err();
        assert!(err.is_builder());
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn refused_dial_is_connect_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dialer = dialer(&FingerprintSpec::default());
        let err = dialer.dial_tcp("127.0.0.1", addr.port()).await.unwrap_err();
        assert!(err.is_connect());
        assert!(!err.is_proxy_connect());
    }

    #[tokio::test]
    async fn connect_by_scheme() {
        let addr = plain_server().await;
        let dialer = dialer(&FingerprintSpec::default());

        let uri: Uri = format!("http://{addr}/").parse().unwrap();
        let stream = dialer.connect(&uri).await.unwrap();
        assert!(matches!(stream, MaybeHttpsStream::Http(_)));

        let uri: Uri = format!("https://{addr}/").parse().unwrap();
        let stream = dialer.connect(&uri).await.unwrap();
        assert!(matches!(stream, MaybeHttpsStream::Https(_)));

        let uri: Uri = format!("ftp://{addr}/").parse().unwrap();
        assert!(dialer.connect(&uri).await.unwrap_err().is_builder());
    }

    #[tokio::test]
    async fn establish_reports_handshake_failure() {
        let addr = plain_server().await;
        let dialer = dialer(&FingerprintSpec::default());

        let uri: Uri = format!("http://{addr}/").parse().unwrap();
        let mut plain = dialer.connect(&uri).await.unwrap();
        plain.establish().await.unwrap();
        assert!(!plain.negotiated_h2());

        let uri: Uri = format!("https://{addr}/").parse().unwrap();
        let mut tls = dialer.connect(&uri).await.unwrap();
        let err = tls.establish().await.unwrap_err();
        assert!(err.is_tls(), "{err:?}");
        assert!(!tls.negotiated_h2());
    }

    #[tokio::test]
    async fn dial_through_unreachable_proxy() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let tls = TlsConnector::new(&FingerprintSpec::default(), TlsOptions::default()).unwrap();
        let proxy = ProxyScheme::parse(&format!("http://{addr}")).unwrap();
        let dialer = Dialer::new(Some(proxy), tls);

        let err = dialer.dial_tls("example.test:443").await.unwrap_err();
        assert!(err.is_proxy_connect());
    }
}
