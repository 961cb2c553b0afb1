use axum::{
    Json,
    extract::{Path, State},
};
use tracing::info;

use crate::db::DbQuestion;
use crate::error::ZakiError;
use crate::middleware::{ApiJson, RequireAdminKey};
use crate::router::ZakiState;
use crate::types::api::{AccountResponse, PaidStatusRequest};

/// GET /api/admin/users/{id}
pub async fn get_account(
    _admin: RequireAdminKey,
    State(state): State<ZakiState>,
    Path(id): Path<String>,
) -> Result<Json<AccountResponse>, ZakiError> {
    let account = state
        .storage
        .get_account(&id)
        .await?
        .ok_or(ZakiError::AccountNotFound(id))?;
    Ok(Json(account.into()))
}

/// PUT /api/admin/users/{id}/paid `{isPaidUser}`
pub async fn set_paid(
    _admin: RequireAdminKey,
    State(state): State<ZakiState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<PaidStatusRequest>,
) -> Result<Json<AccountResponse>, ZakiError> {
    let account = state.storage.set_paid(&id, body.is_paid_user).await?;
    info!(user_id = %id, paid = body.is_paid_user, "paid status changed");
    Ok(Json(account.into()))
}

/// GET /api/admin/users/{id}/questions
pub async fn list_questions(
    _admin: RequireAdminKey,
    State(state): State<ZakiState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<DbQuestion>>, ZakiError> {
    Ok(Json(state.storage.list_questions(&id).await?))
}
