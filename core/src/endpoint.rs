//! The service endpoint: where function calls and logins are sent.
//!
//! # Design
//! `ServiceEndpoint` is an immutable value holding the service root and the
//! function-call URL with the response format and token already in its
//! query. A token change produces a new endpoint rather than editing this
//! one, so a reader never observes a half-updated URL.

use std::fmt;

use url::Url;

use crate::error::Error;
use crate::http::HttpRequest;
use crate::query::{self, QueryParams};

pub const REST_PATH: &str = "/webservice/rest/server.php";
pub const LOGIN_PATH: &str = "/login/token.php";
pub const LOGIN_SERVICE: &str = "moodle_mobile_app";
pub const RESPONSE_FORMAT: &str = "json";

#[derive(Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    service_url: Url,
    api_url: Url,
    token: String,
}

impl ServiceEndpoint {
    pub fn new(service_url: Url, token: impl Into<String>) -> Self {
        let token = token.into();
        let fixed = QueryParams::new()
            .with("moodlewsrestformat", RESPONSE_FORMAT)
            .with("wstoken", &token);
        let api_url = query::encode(&join_path(&service_url, REST_PATH), &[&fixed]);
        Self {
            service_url,
            api_url,
            token,
        }
    }

    pub fn parse(service_url: &str, token: impl Into<String>) -> Result<Self, Error> {
        Ok(Self::new(Url::parse(service_url)?, token))
    }

    /// A new endpoint for the same service with `token` in place of the old one.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self::new(self.service_url.clone(), token)
    }

    pub fn service_url(&self) -> &Url {
        &self.service_url
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// URL for invoking `function` with `params`. The function name and the
    /// fixed format/token pair always take precedence over `params`.
    pub fn function_url(&self, function: &str, params: &QueryParams) -> Url {
        let name = QueryParams::new().with("wsfunction", function);
        let fixed = QueryParams::new()
            .with("moodlewsrestformat", RESPONSE_FORMAT)
            .with("wstoken", &self.token);
        query::encode(&self.api_url, &[params, &name, &fixed])
    }

    pub fn build_call(&self, function: &str, params: &QueryParams) -> HttpRequest {
        HttpRequest::get(self.function_url(function, params))
    }

    pub fn build_login(&self, username: &str, password: &str) -> HttpRequest {
        build_login(&self.service_url, username, password)
    }
}

// The token is a credential; keep it out of debug output.
impl fmt::Debug for ServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceEndpoint")
            .field("service_url", &self.service_url.as_str())
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Login request against `service_url`'s token endpoint.
pub fn build_login(service_url: &Url, username: &str, password: &str) -> HttpRequest {
    let params = QueryParams::new()
        .with("username", username)
        .with("password", password)
        .with("service", LOGIN_SERVICE);
    HttpRequest::get(query::encode(&join_path(service_url, LOGIN_PATH), &[&params]))
}

/// Append `suffix` to the path of `base`, keeping any sub-path the service is
/// mounted under.
fn join_path(base: &Url, suffix: &str) -> Url {
    let mut url = base.clone();
    let path = format!("{}{}", base.path().trim_end_matches('/'), suffix);
    url.set_path(&path);
    url
}
