use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    error::AppResult,
    models::{SettingsUpdate, User, UserPreferences},
    services::SurveyPatch,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct DialogStateRequest {
    pub state: String,
}

/// Handler for `/start`: registers the chat on first contact
pub async fn start(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
) -> AppResult<Json<User>> {
    let user = state.profiles.start(chat_id).await?;
    Ok(Json(user))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
) -> AppResult<Json<User>> {
    let user = state.profiles.active(chat_id).await?;
    Ok(Json(user))
}

pub async fn survey_draft(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
) -> AppResult<Json<UserPreferences>> {
    let user = state.profiles.active(chat_id).await?;
    let draft = state.survey.draft(&user).await?;
    Ok(Json(draft))
}

pub async fn update_survey(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    Json(patch): Json<SurveyPatch>,
) -> AppResult<Json<UserPreferences>> {
    let user = state.profiles.active(chat_id).await?;
    let draft = state.survey.update(&user, patch).await?;
    Ok(Json(draft))
}

pub async fn finish_survey(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
) -> AppResult<Json<User>> {
    let user = state.profiles.active(chat_id).await?;
    let user = state.survey.finish(&user).await?;
    Ok(Json(user))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    Json(update): Json<SettingsUpdate>,
) -> AppResult<Json<User>> {
    let user = state.profiles.active(chat_id).await?;
    let user = state.profiles.update_settings(&user, &update).await?;
    Ok(Json(user))
}

pub async fn set_dialog_state(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    Json(request): Json<DialogStateRequest>,
) -> AppResult<StatusCode> {
    let user = state.profiles.active(chat_id).await?;
    state.profiles.set_dialog_state(&user, &request.state).await?;
    Ok(StatusCode::NO_CONTENT)
}
