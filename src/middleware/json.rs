use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ZakiError;

/// `Json<T>` whose rejections surface as [`ZakiError`] bodies: 413 for
/// oversized payloads, 400 for everything else (bad JSON, wrong content type).
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ZakiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(body)) => Ok(ApiJson(body)),
            Err(rejection) => Err(rejection_to_error(rejection)),
        }
    }
}

fn rejection_to_error(rejection: JsonRejection) -> ZakiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ZakiError::PayloadTooLarge;
    }
    debug!(reason = %rejection.body_text(), "rejected request body");
    ZakiError::BadRequest(rejection.body_text())
}
