use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Validated payload for inserting a new team.
/// The store assigns the id and `created_at` at insert time.
#[derive(Debug, Clone)]
pub struct NewTeam {
    pub name: String,
    pub city: String,
    pub coach: String,
}

impl NewTeam {
    pub fn new(name: &str, city: &str, coach: &str) -> Result<Self, ApiError> {
        let name = name.trim();
        let city = city.trim();
        let coach = coach.trim();

        if name.is_empty() || city.is_empty() || coach.is_empty() {
            return Err(ApiError::Validation(
                "name, city and coach must not be empty".to_string(),
            ));
        }

        Ok(NewTeam {
            name: name.to_string(),
            city: city.to_string(),
            coach: coach.to_string(),
        })
    }
}

/// Team row from the teams table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub city: String,
    pub coach: String,
    pub wins: i64,
    pub losses: i64,
    pub created_at: String,
}

impl Team {
    /// Increment the win counter, returning the new total.
    pub fn record_win(&mut self) -> i64 {
        self.wins += 1;
        self.wins
    }

    /// Increment the loss counter, returning the new total.
    pub fn record_loss(&mut self) -> i64 {
        self.losses += 1;
        self.losses
    }

    /// Fraction of games won, 0.0 when no games have been played yet.
    pub fn win_percentage(&self) -> f64 {
        let total = self.wins + self.losses;
        if total == 0 {
            return 0.0;
        }
        self.wins as f64 / total as f64
    }

    /// Apply a partial update. A field left as `None` is untouched;
    /// a provided field must be non-blank.
    pub fn update_details(
        &mut self,
        name: Option<String>,
        city: Option<String>,
        coach: Option<String>,
    ) -> Result<(), ApiError> {
        for (field, value) in [("name", &name), ("city", &city), ("coach", &coach)] {
            if let Some(v) = value {
                if v.trim().is_empty() {
                    return Err(ApiError::Validation(format!("{field} must not be empty")));
                }
            }
        }

        if let Some(name) = name {
            self.name = name.trim().to_string();
        }
        if let Some(city) = city {
            self.city = city.trim().to_string();
        }
        if let Some(coach) = coach {
            self.coach = coach.trim().to_string();
        }
        Ok(())
    }

    /// Convert to the API response format.
    pub fn to_view(&self) -> TeamView {
        TeamView {
            id: self.id,
            name: self.name.clone(),
            city: self.city.clone(),
            coach: self.coach.clone(),
            wins: self.wins,
            losses: self.losses,
            win_percentage: self.win_percentage(),
            created_at: self.created_at.clone(),
        }
    }
}

/// Team info for API responses.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamView {
    pub id: i64,
    pub name: String,
    pub city: String,
    pub coach: String,
    pub wins: i64,
    pub losses: i64,
    pub win_percentage: f64,
    pub created_at: String,
}

/// Validated payload for inserting a new game.
#[derive(Debug, Clone)]
pub struct NewGame {
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub scheduled_at: String,
}

impl NewGame {
    pub fn new(home_team_id: i64, away_team_id: i64, scheduled_at: &str) -> Result<Self, ApiError> {
        if home_team_id == away_team_id {
            return Err(ApiError::Validation(
                "home and away team must differ".to_string(),
            ));
        }

        let scheduled: NaiveDateTime = scheduled_at.trim().parse().map_err(|_| {
            ApiError::Validation(format!(
                "scheduledAt is not a valid ISO-8601 datetime: {scheduled_at}"
            ))
        })?;

        Ok(NewGame {
            home_team_id,
            away_team_id,
            scheduled_at: scheduled.format("%Y-%m-%dT%H:%M:%S").to_string(),
        })
    }
}

/// Game row from the games table. A game starts pending and is
/// finalized exactly once when a result is recorded.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Game {
    pub id: i64,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub home_score: i64,
    pub away_score: i64,
    pub finalized: bool,
    pub scheduled_at: String,
    pub created_at: String,
}

impl Game {
    /// Record the final score. Rejected once the game is finalized;
    /// the transition is one-way.
    pub fn record_result(&mut self, home_score: i64, away_score: i64) -> Result<(), ApiError> {
        if self.finalized {
            return Err(ApiError::InvalidState(
                "game is already finalized".to_string(),
            ));
        }
        if home_score < 0 || away_score < 0 {
            return Err(ApiError::Validation("scores cannot be negative".to_string()));
        }

        self.home_score = home_score;
        self.away_score = away_score;
        self.finalized = true;
        Ok(())
    }

    /// Id of the winning team. None while the game is pending, and
    /// None on a tie (improbable in basketball, but must not crash).
    pub fn winner_id(&self) -> Option<i64> {
        if !self.finalized {
            return None;
        }

        if self.home_score > self.away_score {
            Some(self.home_team_id)
        } else if self.away_score > self.home_score {
            Some(self.away_team_id)
        } else {
            None
        }
    }

    /// Absolute score delta, 0 while the game is pending.
    pub fn score_difference(&self) -> i64 {
        (self.home_score - self.away_score).abs()
    }

    /// Convert to the API response format.
    pub fn to_view(&self) -> GameView {
        GameView {
            id: self.id,
            home_team_id: self.home_team_id,
            away_team_id: self.away_team_id,
            home_score: self.home_score,
            away_score: self.away_score,
            scheduled_at: self.scheduled_at.clone(),
            finalized: self.finalized,
            winner_id: self.winner_id(),
            score_difference: self.score_difference(),
            created_at: self.created_at.clone(),
        }
    }
}

/// Game info for API responses. `winnerId` and `scoreDifference` are
/// derived on read, never stored.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub id: i64,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub home_score: i64,
    pub away_score: i64,
    pub scheduled_at: String,
    pub finalized: bool,
    pub winner_id: Option<i64>,
    pub score_difference: i64,
    pub created_at: String,
}
