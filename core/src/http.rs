//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The
//! endpoint builds `HttpRequest` values and the classifier parses
//! `HttpResponse` values without touching the network. A [`Transport`]
//! executes the round-trip in between.
//!
//! The service only ever sees GET requests with every argument in the query
//! string, so a request is fully described by its URL.
//!
//! [`Transport`]: crate::transport::Transport

use url::Url;

/// A GET request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: Url,
}

impl HttpRequest {
    pub fn get(url: Url) -> Self {
        Self { url }
    }

    /// Query value for `key`, if present.
    pub fn query(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }
}

/// An HTTP response described as plain data.
///
/// Constructed by the transport after executing an `HttpRequest`, then
/// handed to [`crate::classify::parse`].
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Lossy UTF-8 view of the body for diagnostics.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
