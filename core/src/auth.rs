//! Token login against `/login/token.php`.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::classify::{self, Envelope};
use crate::client::{self, MoodleClient};
use crate::context::CallContext;
use crate::endpoint;
use crate::error::Error;
use crate::transport::Transport;

#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginResponse {
    pub token: String,
    #[serde(rename = "privatetoken")]
    pub private_token: Option<String>,
}

impl Envelope for LoginResponse {}

impl std::fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginResponse")
            .field("token", &"<redacted>")
            .field("private_token", &self.private_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Exchange a username and password for a web service token.
pub async fn login<T: Transport>(
    ctx: &CallContext,
    transport: &T,
    service_url: &Url,
    username: &str,
    password: &str,
) -> Result<LoginResponse, Error> {
    let request = endpoint::build_login(service_url, username, password);
    tracing::debug!(host = service_url.host_str(), username, "logging in");
    let response = client::execute(transport, ctx, request).await?;
    classify::parse(response)
}

impl<T: Transport> MoodleClient<T> {
    /// Log in and make the returned token the session token.
    pub async fn login(
        &self,
        ctx: &CallContext,
        username: &str,
        password: &str,
    ) -> Result<LoginResponse, Error> {
        let response = login(ctx, self.transport(), &self.service_url(), username, password).await?;
        self.set_token(response.token.clone());
        tracing::debug!(username, "session token replaced");
        Ok(response)
    }
}
