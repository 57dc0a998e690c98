use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    error::AppResult,
    models::{GameRef, GameView},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: String,
}

/// Handler for title search endpoint
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<GameRef>>> {
    let games = state.catalog.search(&params.q).await?;
    Ok(Json(games))
}

pub async fn game(
    State(state): State<AppState>,
    Path(game_id): Path<i64>,
) -> AppResult<Json<GameView>> {
    let view = state.catalog.game(game_id).await?;
    Ok(Json(view))
}
