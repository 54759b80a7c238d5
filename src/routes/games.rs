use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use sqlx::sqlite::SqlitePool;

use crate::db;
use crate::error::ApiError;
use crate::models::{GameView, NewGame};

/// Request body for creating a game.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub scheduled_at: String,
}

/// Request body for recording a final score.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResultRequest {
    pub home_score: i64,
    pub away_score: i64,
}

// GET /api/games - List all games
pub async fn get_games(State(pool): State<SqlitePool>) -> Result<Json<Vec<GameView>>, ApiError> {
    let games = db::get_all_games(&pool).await?;
    Ok(Json(games.iter().map(|g| g.to_view()).collect()))
}

// GET /api/games/:id - Get game by ID
pub async fn get_game_by_id(
    State(pool): State<SqlitePool>,
    Path(game_id): Path<i64>,
) -> Result<Json<GameView>, ApiError> {
    let game = db::get_game_by_id(&pool, game_id)
        .await?
        .ok_or(ApiError::NotFound("game"))?;

    Ok(Json(game.to_view()))
}

// POST /api/games - Create a new game between two distinct teams
pub async fn create_game(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateGameRequest>,
) -> Result<(StatusCode, Json<GameView>), ApiError> {
    let new_game = NewGame::new(
        payload.home_team_id,
        payload.away_team_id,
        &payload.scheduled_at,
    )?;

    // Both teams must exist before anything is persisted
    db::get_team_by_id(&pool, new_game.home_team_id)
        .await?
        .ok_or(ApiError::NotFound("team"))?;
    db::get_team_by_id(&pool, new_game.away_team_id)
        .await?
        .ok_or(ApiError::NotFound("team"))?;

    let game = db::create_game(&pool, &new_game).await?;

    tracing::info!(
        "Created game {} between teams {} and {}",
        game.id,
        game.home_team_id,
        game.away_team_id
    );
    Ok((StatusCode::CREATED, Json(game.to_view())))
}

// POST /api/games/:id/result - Record the final score of a pending game
pub async fn record_result(
    State(pool): State<SqlitePool>,
    Path(game_id): Path<i64>,
    Json(payload): Json<RecordResultRequest>,
) -> Result<Json<GameView>, ApiError> {
    let mut game = db::get_game_by_id(&pool, game_id)
        .await?
        .ok_or(ApiError::NotFound("game"))?;

    game.record_result(payload.home_score, payload.away_score)?;

    // The guarded update catches a concurrent finalize our read missed;
    // standings land in the same transaction as relative increments
    if !db::finalize_game(&pool, &game).await? {
        return Err(ApiError::InvalidState(
            "game is already finalized".to_string(),
        ));
    }

    tracing::info!(
        "Recorded result {}-{} for game {}",
        game.home_score,
        game.away_score,
        game.id
    );
    Ok(Json(game.to_view()))
}

// DELETE /api/games/:id - Delete a game
pub async fn delete_game(
    State(pool): State<SqlitePool>,
    Path(game_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !db::delete_game(&pool, game_id).await? {
        return Err(ApiError::NotFound("game"));
    }

    tracing::info!("Deleted game {}", game_id);
    Ok(StatusCode::NO_CONTENT)
}
