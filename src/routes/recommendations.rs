use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppResult,
    models::{GameCard, GameView},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct BatchQuery {
    /// Batch size; the user's `recommendation_count` when absent
    n: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct GameIdsRequest {
    pub game_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct RefillResponse {
    pub game_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct EvictResponse {
    pub evicted: u64,
}

pub async fn refill(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
) -> AppResult<Json<RefillResponse>> {
    let user = state.profiles.active(chat_id).await?;
    let game_ids = state.pool.refill(&user).await?;
    Ok(Json(RefillResponse { game_ids }))
}

/// Reads the head of the pool without consuming it
pub async fn serve(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    Query(params): Query<BatchQuery>,
) -> AppResult<Json<Vec<GameCard>>> {
    let user = state.profiles.active(chat_id).await?;
    let n = params.n.unwrap_or(i64::from(user.recommendation_count));
    let cards = state.pool.serve(user.id, n).await?;
    Ok(Json(cards))
}

/// Hands out the next batch and records it as viewed
///
/// An empty list means the catalog has nothing left for this user.
pub async fn next(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    Query(params): Query<BatchQuery>,
) -> AppResult<Json<Vec<GameView>>> {
    let user = state.profiles.active(chat_id).await?;
    let n = params.n.unwrap_or(i64::from(user.recommendation_count));

    let cards = state.pool.deliver(&user, n).await?;
    tracing::info!(
        user_id = user.id,
        requested = n,
        delivered = cards.len(),
        "Recommendations delivered"
    );

    let mut views = Vec::with_capacity(cards.len());
    for card in cards {
        views.push(state.catalog.view(card).await);
    }
    Ok(Json(views))
}

pub async fn mark_viewed(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    Json(request): Json<GameIdsRequest>,
) -> AppResult<StatusCode> {
    let user = state.profiles.active(chat_id).await?;
    state.pool.mark_viewed(user.id, &request.game_ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn evict(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    Json(request): Json<GameIdsRequest>,
) -> AppResult<Json<EvictResponse>> {
    let user = state.profiles.active(chat_id).await?;
    let evicted = state.pool.evict_from_pool(user.id, &request.game_ids).await?;
    Ok(Json(EvictResponse { evicted }))
}
