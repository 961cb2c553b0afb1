use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use tracing::{debug, error};

use crate::config::SESSION_COOKIE;
use crate::error::ZakiError;
use crate::middleware::{ApiJson, RequireSession};
use crate::router::ZakiState;
use crate::types::api::{
    ConfirmResetRequest, CredentialsRequest, EmailRequest, SessionResponse, SignUpResponse,
};

/// POST /api/auth/signup -> 201 with the new user; no session is issued.
pub async fn sign_up(
    State(state): State<ZakiState>,
    ApiJson(body): ApiJson<CredentialsRequest>,
) -> Result<Response, ZakiError> {
    let user = state.auth.sign_up(&body.email, &body.password).await?;
    Ok((StatusCode::CREATED, Json(SignUpResponse { user })).into_response())
}

/// POST /api/auth/signin -> sets the private session cookie.
pub async fn sign_in(
    State(state): State<ZakiState>,
    jar: PrivateCookieJar,
    ApiJson(body): ApiJson<CredentialsRequest>,
) -> Result<Response, ZakiError> {
    let session = state.auth.sign_in(&body.email, &body.password).await?;
    let jar = jar.add(build_cookie(&state, session.token.clone()));
    Ok((jar, Json(SessionResponse::from(&session))).into_response())
}

/// POST /api/auth/signout -> 204; succeeds with or without a session.
pub async fn sign_out(State(state): State<ZakiState>, jar: PrivateCookieJar) -> Response {
    let token = jar.get(SESSION_COOKIE).map(|c| c.value().to_owned());
    let jar = jar.remove(clear_cookie(&state));
    if let Some(token) = token
        && let Err(e) = state.auth.sign_out(&token).await
    {
        return (jar, e.into_response()).into_response();
    }
    (jar, StatusCode::NO_CONTENT).into_response()
}

/// GET /api/auth/session
pub async fn current_session(RequireSession(session): RequireSession) -> Json<SessionResponse> {
    Json(SessionResponse::from(&session))
}

/// POST /api/auth/reset-password -> always 202 for well-formed emails.
pub async fn request_reset(
    State(state): State<ZakiState>,
    ApiJson(body): ApiJson<EmailRequest>,
) -> Result<StatusCode, ZakiError> {
    // the answer is the same whether or not the account exists
    match state.auth.request_password_reset(&body.email).await? {
        Some(token) => {
            let email = body.email.trim().to_lowercase();
            if let Err(e) = state.reset_delivery.deliver(&email, &token).await {
                error!(error = %e, "failed to deliver password reset");
            }
        }
        None => debug!("password reset requested for unknown account"),
    }
    Ok(StatusCode::ACCEPTED)
}

/// POST /api/auth/reset-password/confirm
pub async fn confirm_reset(
    State(state): State<ZakiState>,
    ApiJson(body): ApiJson<ConfirmResetRequest>,
) -> Result<StatusCode, ZakiError> {
    state
        .auth
        .complete_password_reset(&body.token, &body.password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

fn build_cookie(state: &ZakiState, token: String) -> Cookie<'static> {
    Cookie::build(Cookie::new(SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(!state.insecure_cookie)
        .same_site(SameSite::Lax)
        .max_age(state.session_ttl)
        .build()
}

fn clear_cookie(state: &ZakiState) -> Cookie<'static> {
    Cookie::build(Cookie::new(SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(!state.insecure_cookie)
        .same_site(SameSite::Lax)
        .build()
}
