//! A blocking wrapper around [`send`](crate::request::send).
//!
//! Each call runs the request on a current-thread runtime owned by a
//! dedicated thread, so it may be used from synchronous code and from
//! inside another runtime alike.
//!
//! # Optional
//!
//! This requires the optional `blocking` feature to be enabled.

use std::thread;

use log::trace;

use crate::{config::RequestConfig, error::Error, request::ResponseState};

/// Send the request described by `config` and wait for the result.
pub fn send(config: &RequestConfig) -> crate::Result<ResponseState> {
    let config = config.clone();
    let handle = thread::Builder::new()
        .name("mimic-request-sync-runtime".into())
        .spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(Error::builder)?;

            trace!("({:?}) start runtime::block_on", thread::current().id());
            let result = rt.block_on(crate::request::send(&config));
            trace!("({:?}) end runtime::block_on", thread::current().id());
            result
        })
        .map_err(Error::builder)?;

    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(Error::request("blocking request thread panicked")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_surface() {
        let config = RequestConfig {
            url: "not a url".into(),
            method: "GET".into(),
            ..Default::default()
        };
        let err = send(&config).unwrap_err();
        assert!(err.is_builder());
    }

    #[tokio::test]
    async fn usable_inside_a_runtime() {
        let config = RequestConfig {
            url: "https://example.com/".into(),
            ..Default::default()
        };
        let err = send(&config).unwrap_err();
        assert!(err.is_builder());
    }
}
