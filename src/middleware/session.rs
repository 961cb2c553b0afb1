use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Key, PrivateCookieJar};

use crate::config::SESSION_COOKIE;
use crate::error::ZakiError;
use crate::identity::Session;
use crate::router::ZakiState;

/// Resolves the private session cookie to a live [`Session`].
///
/// Fails closed: a missing, tampered or expired cookie is 401, and a store
/// failure while resolving it is 500.
#[derive(Debug, Clone)]
pub struct RequireSession(pub Session);

impl FromRequestParts<ZakiState> for RequireSession {
    type Rejection = ZakiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ZakiState,
    ) -> Result<Self, Self::Rejection> {
        let jar = PrivateCookieJar::from_headers(&parts.headers, Key::from_ref(state));
        let token = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_owned())
            .ok_or(ZakiError::Unauthorized)?;

        let session = state
            .auth
            .get_session(&token)
            .await?
            .ok_or(ZakiError::Unauthorized)?;
        Ok(Self(session))
    }
}
