use axum::{
    http::StatusCode,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

pub mod games;
pub mod interactions;
pub mod recommendations;
pub mod users;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(user_routes())
        .merge(game_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Routes addressed by the chat id of a user
fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/:chat_id/start", post(users::start))
        .route("/users/:chat_id", get(users::get_user))
        .route(
            "/users/:chat_id/survey",
            get(users::survey_draft).patch(users::update_survey),
        )
        .route("/users/:chat_id/survey/finish", post(users::finish_survey))
        .route("/users/:chat_id/settings", patch(users::update_settings))
        .route("/users/:chat_id/state", put(users::set_dialog_state))
        // Recommendation pool
        .route(
            "/users/:chat_id/recommendations",
            get(recommendations::serve).delete(recommendations::evict),
        )
        .route(
            "/users/:chat_id/recommendations/refill",
            post(recommendations::refill),
        )
        .route("/users/:chat_id/recommendations/next", post(recommendations::next))
        .route(
            "/users/:chat_id/recommendations/viewed",
            post(recommendations::mark_viewed),
        )
        // Interaction ledger
        .route(
            "/users/:chat_id/favorites",
            get(interactions::list_favorites).post(interactions::add_favorite),
        )
        .route(
            "/users/:chat_id/favorites/:game_id",
            delete(interactions::remove_favorite),
        )
        .route("/users/:chat_id/ratings", get(interactions::list_ratings))
        .route("/users/:chat_id/ratings/:game_id", put(interactions::rate))
        .route(
            "/users/:chat_id/dismissed",
            get(interactions::list_dismissed).post(interactions::dismiss),
        )
        .route(
            "/users/:chat_id/dismissed/:game_id",
            delete(interactions::remove_dismissed),
        )
}

fn game_routes() -> Router<AppState> {
    Router::new()
        .route("/games/search", get(games::search))
        .route("/games/:game_id", get(games::game))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
