use std::io;

use async_compression::tokio::bufread::GzipDecoder;
use bytes::Bytes;
use http::{
    header::{CONTENT_ENCODING, CONTENT_LENGTH},
    HeaderMap,
};
use tokio::io::AsyncReadExt;

/// Whether the response announces a gzip body.
pub(crate) fn is_gzip(headers: &HeaderMap) -> bool {
    headers
        .get_all(CONTENT_ENCODING)
        .iter()
        .any(|enc| enc.as_bytes().eq_ignore_ascii_case(b"gzip"))
}

/// Remove the headers that describe the encoded body.
pub(crate) fn strip_encoding_headers(headers: &mut HeaderMap) {
    headers.remove(CONTENT_ENCODING);
    headers.remove(CONTENT_LENGTH);
}

/// Decompress a complete gzip body.
pub(crate) async fn gunzip(data: &[u8]) -> io::Result<Bytes> {
    let mut decoder = GzipDecoder::new(data);
    decoder.multiple_members(true);

    let mut out = Vec::with_capacity(data.len() * 2);
    decoder.read_to_end(&mut out).await?;
    Ok(out.into())
}

/// Decompress `data` if it is gzip, otherwise return it unchanged.
pub(crate) async fn gunzip_or_raw(data: Bytes) -> Bytes {
    match gunzip(&data).await {
        Ok(decoded) => decoded,
        Err(e) => {
            log::trace!("body is not gzip ({e}), keeping raw bytes");
            data
        }
    }
}
