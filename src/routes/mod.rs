pub mod games;
pub mod health;
pub mod teams;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::sqlite::SqlitePool;

/// Build the application router. Middleware layers are added in `main`.
pub fn app(pool: SqlitePool) -> Router {
    Router::new()
        // Root and health
        .route("/", get(|| async { "Basketball League API - v1.0" }))
        .route("/health", get(health::health_check))

        // Team endpoints
        .route("/api/teams", get(teams::get_teams).post(teams::create_team))
        .route(
            "/api/teams/{id}",
            get(teams::get_team_by_id)
                .put(teams::update_team)
                .delete(teams::delete_team),
        )
        .route("/api/teams/{id}/games", get(teams::get_team_games))

        // Game endpoints
        .route("/api/games", get(games::get_games).post(games::create_game))
        .route(
            "/api/games/{id}",
            get(games::get_game_by_id).delete(games::delete_game),
        )
        .route("/api/games/{id}/result", post(games::record_result))

        .with_state(pool)
}
