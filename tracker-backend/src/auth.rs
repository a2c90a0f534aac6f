//! Caller identity, as supplied by the authentication layer in front of us
//!

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tracing::debug;

use crate::error::WebError;
use crate::SharedState;

pub const DEFAULT_USER_HEADER: &str = "x-remote-user";

/// The authenticated caller.
///
/// The upstream proxy authenticates the request and forwards the identity in a
/// trusted header (see `--user-header`). Handlers taking this extractor reject
/// anonymous requests with 401 before touching the database.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentUser(pub String);

impl CurrentUser {
    pub fn identity(&self) -> &str {
        &self.0
    }
}

impl FromRequestParts<SharedState> for CurrentUser {
    type Rejection = WebError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let header = state.read().await.user_header.clone();

        let identity = parts
            .headers
            .get(&header)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                debug!("Rejecting request without {} header", header);
                WebError::unauthorized("Authentication credentials were not provided.")
            })?;

        Ok(CurrentUser(identity.to_string()))
    }
}
