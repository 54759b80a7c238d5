use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use sqlx::sqlite::SqlitePool;

use crate::db;
use crate::error::ApiError;
use crate::models::{GameView, NewTeam, TeamView};

/// Request body for creating a team.
#[derive(Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
    pub city: String,
    pub coach: String,
}

/// Request body for updating a team. Omitted fields are left untouched.
#[derive(Deserialize)]
pub struct UpdateTeamRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub coach: Option<String>,
}

// GET /api/teams - List all teams
pub async fn get_teams(State(pool): State<SqlitePool>) -> Result<Json<Vec<TeamView>>, ApiError> {
    let teams = db::get_all_teams(&pool).await?;
    Ok(Json(teams.iter().map(|t| t.to_view()).collect()))
}

// GET /api/teams/:id - Get team by ID
pub async fn get_team_by_id(
    State(pool): State<SqlitePool>,
    Path(team_id): Path<i64>,
) -> Result<Json<TeamView>, ApiError> {
    let team = db::get_team_by_id(&pool, team_id)
        .await?
        .ok_or(ApiError::NotFound("team"))?;

    Ok(Json(team.to_view()))
}

// POST /api/teams - Create a new team
pub async fn create_team(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateTeamRequest>,
) -> Result<(StatusCode, Json<TeamView>), ApiError> {
    let new_team = NewTeam::new(&payload.name, &payload.city, &payload.coach)?;
    let team = db::create_team(&pool, &new_team).await?;

    tracing::info!("Created team {} ({}) with id {}", team.name, team.city, team.id);
    Ok((StatusCode::CREATED, Json(team.to_view())))
}

// PUT /api/teams/:id - Update team details
pub async fn update_team(
    State(pool): State<SqlitePool>,
    Path(team_id): Path<i64>,
    Json(payload): Json<UpdateTeamRequest>,
) -> Result<Json<TeamView>, ApiError> {
    let mut team = db::get_team_by_id(&pool, team_id)
        .await?
        .ok_or(ApiError::NotFound("team"))?;

    team.update_details(payload.name, payload.city, payload.coach)?;
    db::update_team(&pool, &team).await?;

    tracing::info!("Updated team {}", team.id);
    Ok(Json(team.to_view()))
}

// DELETE /api/teams/:id - Delete a team
pub async fn delete_team(
    State(pool): State<SqlitePool>,
    Path(team_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !db::delete_team(&pool, team_id).await? {
        return Err(ApiError::NotFound("team"));
    }

    tracing::info!("Deleted team {}", team_id);
    Ok(StatusCode::NO_CONTENT)
}

// GET /api/teams/:id/games - All games a team plays in, home or away
pub async fn get_team_games(
    State(pool): State<SqlitePool>,
    Path(team_id): Path<i64>,
) -> Result<Json<Vec<GameView>>, ApiError> {
    db::get_team_by_id(&pool, team_id)
        .await?
        .ok_or(ApiError::NotFound("team"))?;

    let games = db::get_games_for_team(&pool, team_id).await?;
    Ok(Json(games.iter().map(|g| g.to_view()).collect()))
}
