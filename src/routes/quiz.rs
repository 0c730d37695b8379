use crate::{
    dto::quiz_dto::{GenerateQuizPayload, IngestBankQuestionsPayload},
    error::Result,
    AppState,
};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use validator::Validate;

#[axum::debug_handler]
pub async fn generate_quiz(
    State(state): State<AppState>,
    Json(payload): Json<GenerateQuizPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let response = state
        .quiz_service
        .generate_quiz(
            &payload.subjects,
            payload.difficulty,
            payload.requested_by.as_deref(),
        )
        .await?;

    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn ingest_bank_questions(
    State(state): State<AppState>,
    Json(payload): Json<IngestBankQuestionsPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let inserted = state.bank_service.insert_many(&payload.questions).await?;

    Ok((StatusCode::CREATED, Json(json!({ "inserted": inserted }))))
}
