use axum::{Json, extract::State};
use tracing::{debug, info};

use crate::db::SubmitOutcome;
use crate::error::ZakiError;
use crate::middleware::{ApiJson, RequireSession};
use crate::quota::QuotaStatus;
use crate::router::ZakiState;
use crate::types::api::{QuotaSnapshot, SubmitQuestionRequest, SubmitQuestionResponse};

/// A session whose account is gone is a server-side failure, not a 404.
fn own_account(e: ZakiError) -> ZakiError {
    match e {
        ZakiError::AccountNotFound(id) => ZakiError::UserDataUnavailable(id),
        other => other,
    }
}

async fn own_quota(state: &ZakiState, user_id: &str) -> Result<QuotaStatus, ZakiError> {
    state.storage.quota_status(user_id).await.map_err(own_account)
}

/// GET /api/user/questions -> `{questionsCount, isPaidUser}` of the session's account.
pub async fn get_questions(
    State(state): State<ZakiState>,
    RequireSession(session): RequireSession,
) -> Result<Json<QuotaSnapshot>, ZakiError> {
    let status = own_quota(&state, &session.user.id).await?;
    Ok(Json(status.into()))
}

/// POST /api/user/questions -> stores the question and bumps the counter,
/// or 403 with the current counts once the free tier is used up.
pub async fn post_question(
    State(state): State<ZakiState>,
    RequireSession(session): RequireSession,
    ApiJson(body): ApiJson<SubmitQuestionRequest>,
) -> Result<Json<SubmitQuestionResponse>, ZakiError> {
    let question = body
        .question
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or(ZakiError::MissingQuestion)?;
    let user_id = session.user.id.as_str();

    let current = own_quota(&state, user_id).await?;
    if !state.policy.can_submit(current) {
        debug!(user_id, count = current.questions_count, "question rejected: limit reached");
        return Err(ZakiError::QuestionLimitReached(current));
    }

    // the read above can be stale; the store re-checks inside its update
    match state
        .storage
        .submit_question(user_id, question, state.policy.free_limit())
        .await
        .map_err(own_account)?
    {
        SubmitOutcome::Accepted { question, status } => {
            info!(
                user_id,
                question_id = %question.id,
                count = status.questions_count,
                paid = status.is_paid_user,
                "question accepted"
            );
            Ok(Json(SubmitQuestionResponse {
                success: true,
                quota: status.into(),
            }))
        }
        SubmitOutcome::LimitReached(status) => {
            debug!(user_id, count = status.questions_count, "question rejected by store");
            Err(ZakiError::QuestionLimitReached(status))
        }
    }
}
