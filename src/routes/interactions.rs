use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppResult,
    models::{GameRef, RatedGame},
    services::RatingChange,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct GameIdRequest {
    pub game_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub rating: i32,
}

#[derive(Debug, Serialize)]
pub struct AddedResponse {
    pub added: bool,
}

#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub removed: bool,
}

#[derive(Debug, Serialize)]
pub struct RatingResponse {
    pub result: RatingChange,
}

/// `201 Created` for a new entry, `200 OK` when it was already there
fn added(added: bool) -> (StatusCode, Json<AddedResponse>) {
    let status = if added {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    (status, Json(AddedResponse { added }))
}

pub async fn list_favorites(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
) -> AppResult<Json<Vec<GameRef>>> {
    let user = state.profiles.active(chat_id).await?;
    Ok(Json(state.ledger.favorites(&user).await?))
}

pub async fn add_favorite(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    Json(request): Json<GameIdRequest>,
) -> AppResult<(StatusCode, Json<AddedResponse>)> {
    let user = state.profiles.active(chat_id).await?;
    let was_added = state.ledger.add_favorite(&user, request.game_id).await?;
    Ok(added(was_added))
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    Path((chat_id, game_id)): Path<(i64, i64)>,
) -> AppResult<Json<RemovedResponse>> {
    let user = state.profiles.active(chat_id).await?;
    let removed = state.ledger.remove_favorite(&user, game_id).await?;
    Ok(Json(RemovedResponse { removed }))
}

pub async fn list_ratings(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
) -> AppResult<Json<Vec<RatedGame>>> {
    let user = state.profiles.active(chat_id).await?;
    Ok(Json(state.ledger.ratings(&user).await?))
}

/// Rating `0` clears the user's score for the game
pub async fn rate(
    State(state): State<AppState>,
    Path((chat_id, game_id)): Path<(i64, i64)>,
    Json(request): Json<RatingRequest>,
) -> AppResult<Json<RatingResponse>> {
    let user = state.profiles.active(chat_id).await?;
    let result = state.ledger.rate(&user, game_id, request.rating).await?;
    Ok(Json(RatingResponse { result }))
}

pub async fn list_dismissed(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
) -> AppResult<Json<Vec<GameRef>>> {
    let user = state.profiles.active(chat_id).await?;
    Ok(Json(state.ledger.dismissed(&user).await?))
}

pub async fn dismiss(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    Json(request): Json<GameIdRequest>,
) -> AppResult<(StatusCode, Json<AddedResponse>)> {
    let user = state.profiles.active(chat_id).await?;
    let was_added = state.ledger.dismiss(&user, request.game_id).await?;
    Ok(added(was_added))
}

pub async fn remove_dismissed(
    State(state): State<AppState>,
    Path((chat_id, game_id)): Path<(i64, i64)>,
) -> AppResult<Json<RemovedResponse>> {
    let user = state.profiles.active(chat_id).await?;
    let removed = state.ledger.remove_dismissed(&user, game_id).await?;
    Ok(Json(RemovedResponse { removed }))
}
