use sqlx::sqlite::SqlitePool;

use crate::models::{Game, NewGame, NewTeam, Team};

/// Create the schema if it does not exist yet.
pub async fn init_db(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS teams (
               id         INTEGER PRIMARY KEY AUTOINCREMENT,
               name       TEXT NOT NULL UNIQUE,
               city       TEXT NOT NULL,
               coach      TEXT NOT NULL,
               wins       INTEGER NOT NULL DEFAULT 0,
               losses     INTEGER NOT NULL DEFAULT 0,
               created_at TEXT NOT NULL
           )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS games (
               id           INTEGER PRIMARY KEY AUTOINCREMENT,
               home_team_id INTEGER NOT NULL REFERENCES teams(id),
               away_team_id INTEGER NOT NULL REFERENCES teams(id),
               home_score   INTEGER NOT NULL DEFAULT 0,
               away_score   INTEGER NOT NULL DEFAULT 0,
               finalized    BOOLEAN NOT NULL DEFAULT 0,
               scheduled_at TEXT NOT NULL,
               created_at   TEXT NOT NULL
           )"#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

// Team queries
pub async fn create_team(pool: &SqlitePool, new_team: &NewTeam) -> Result<Team, sqlx::Error> {
    sqlx::query_as::<_, Team>(
        r#"INSERT INTO teams (name, city, coach, wins, losses, created_at)
           VALUES (?, ?, ?, 0, 0, ?)
           RETURNING *"#,
    )
    .bind(&new_team.name)
    .bind(&new_team.city)
    .bind(&new_team.coach)
    .bind(now())
    .fetch_one(pool)
    .await
}

pub async fn get_all_teams(pool: &SqlitePool) -> Result<Vec<Team>, sqlx::Error> {
    sqlx::query_as::<_, Team>(r#"SELECT * FROM teams ORDER BY name"#)
        .fetch_all(pool)
        .await
}

pub async fn get_team_by_id(pool: &SqlitePool, team_id: i64) -> Result<Option<Team>, sqlx::Error> {
    sqlx::query_as::<_, Team>(r#"SELECT * FROM teams WHERE id = ?"#)
        .bind(team_id)
        .fetch_optional(pool)
        .await
}

/// Persist a team's details. Standings are only ever written by
/// `finalize_game`, so a stale snapshot here cannot clobber them.
pub async fn update_team(pool: &SqlitePool, team: &Team) -> Result<(), sqlx::Error> {
    sqlx::query(r#"UPDATE teams SET name = ?, city = ?, coach = ? WHERE id = ?"#)
        .bind(&team.name)
        .bind(&team.city)
        .bind(&team.coach)
        .bind(team.id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn delete_team(pool: &SqlitePool, team_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(r#"DELETE FROM teams WHERE id = ?"#)
        .bind(team_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// All games a team is involved in, home or away.
pub async fn get_games_for_team(
    pool: &SqlitePool,
    team_id: i64,
) -> Result<Vec<Game>, sqlx::Error> {
    sqlx::query_as::<_, Game>(
        r#"SELECT * FROM games
           WHERE home_team_id = ? OR away_team_id = ?
           ORDER BY scheduled_at"#,
    )
    .bind(team_id)
    .bind(team_id)
    .fetch_all(pool)
    .await
}

// Game queries
pub async fn create_game(pool: &SqlitePool, new_game: &NewGame) -> Result<Game, sqlx::Error> {
    sqlx::query_as::<_, Game>(
        r#"INSERT INTO games
               (home_team_id, away_team_id, home_score, away_score, finalized, scheduled_at, created_at)
           VALUES (?, ?, 0, 0, 0, ?, ?)
           RETURNING *"#,
    )
    .bind(new_game.home_team_id)
    .bind(new_game.away_team_id)
    .bind(&new_game.scheduled_at)
    .bind(now())
    .fetch_one(pool)
    .await
}

pub async fn get_all_games(pool: &SqlitePool) -> Result<Vec<Game>, sqlx::Error> {
    sqlx::query_as::<_, Game>(r#"SELECT * FROM games ORDER BY scheduled_at"#)
        .fetch_all(pool)
        .await
}

pub async fn get_game_by_id(pool: &SqlitePool, game_id: i64) -> Result<Option<Game>, sqlx::Error> {
    sqlx::query_as::<_, Game>(r#"SELECT * FROM games WHERE id = ?"#)
        .bind(game_id)
        .fetch_optional(pool)
        .await
}

pub async fn delete_game(pool: &SqlitePool, game_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(r#"DELETE FROM games WHERE id = ?"#)
        .bind(game_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Persist a finalized game together with both teams' standings, in one
/// transaction. The game update is guarded on `finalized = 0` so two
/// concurrent calls cannot both finalize the same game; returns false
/// when the guard misses (someone else got there first), leaving every
/// write rolled back. Standings are applied as relative increments, so
/// finalizing two games that share a team never loses a win to a stale
/// counter read.
pub async fn finalize_game(pool: &SqlitePool, game: &Game) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"UPDATE games SET home_score = ?, away_score = ?, finalized = 1
           WHERE id = ? AND finalized = 0"#,
    )
    .bind(game.home_score)
    .bind(game.away_score)
    .bind(game.id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }

    // A tie credits neither team
    if let Some(winner_id) = game.winner_id() {
        let loser_id = if winner_id == game.home_team_id {
            game.away_team_id
        } else {
            game.home_team_id
        };

        sqlx::query(r#"UPDATE teams SET wins = wins + 1 WHERE id = ?"#)
            .bind(winner_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(r#"UPDATE teams SET losses = losses + 1 WHERE id = ?"#)
            .bind(loser_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(true)
}

#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    use std::str::FromStr;

    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

    // One connection, or each pool checkout would see its own :memory: db
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("failed to open in-memory database");

    init_db(&pool).await.expect("failed to create schema");
    pool
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewGame, NewTeam};

    #[tokio::test]
    async fn create_team_assigns_id_and_defaults() {
        let pool = test_pool().await;
        let new_team = NewTeam::new("Celtics", "Boston", "Joe Mazzulla").unwrap();
        let team = create_team(&pool, &new_team).await.unwrap();

        assert!(team.id > 0);
        assert_eq!(team.wins, 0);
        assert_eq!(team.losses, 0);
        assert!(!team.created_at.is_empty());

        let fetched = get_team_by_id(&pool, team.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Celtics");
    }

    #[tokio::test]
    async fn duplicate_team_name_is_a_unique_violation() {
        let pool = test_pool().await;
        let new_team = NewTeam::new("Celtics", "Boston", "Joe Mazzulla").unwrap();
        create_team(&pool, &new_team).await.unwrap();

        let err = create_team(&pool, &new_team).await.unwrap_err();
        match err {
            sqlx::Error::Database(db_err) => assert!(db_err.is_unique_violation()),
            other => panic!("expected database error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn finalize_game_guard_rejects_second_attempt() {
        let pool = test_pool().await;
        let home = create_team(&pool, &NewTeam::new("Celtics", "Boston", "JM").unwrap())
            .await
            .unwrap();
        let away = create_team(&pool, &NewTeam::new("Lakers", "Los Angeles", "JR").unwrap())
            .await
            .unwrap();

        let new_game = NewGame::new(home.id, away.id, "2025-01-01T20:00:00").unwrap();
        let mut game = create_game(&pool, &new_game).await.unwrap();

        game.record_result(90, 85).unwrap();
        assert!(finalize_game(&pool, &game).await.unwrap());

        // Guard misses the second time; no standings writes land either
        assert!(!finalize_game(&pool, &game).await.unwrap());

        let stored = get_game_by_id(&pool, game.id).await.unwrap().unwrap();
        assert!(stored.finalized);
        assert_eq!((stored.home_score, stored.away_score), (90, 85));
        let stored_home = get_team_by_id(&pool, home.id).await.unwrap().unwrap();
        assert_eq!(stored_home.wins, 1);
        let stored_away = get_team_by_id(&pool, away.id).await.unwrap().unwrap();
        assert_eq!(stored_away.losses, 1);
    }

    #[tokio::test]
    async fn standings_accumulate_across_games_sharing_a_team() {
        let pool = test_pool().await;
        let a = create_team(&pool, &NewTeam::new("Celtics", "Boston", "JM").unwrap())
            .await
            .unwrap();
        let b = create_team(&pool, &NewTeam::new("Lakers", "Los Angeles", "JR").unwrap())
            .await
            .unwrap();
        let c = create_team(&pool, &NewTeam::new("Bulls", "Chicago", "BD").unwrap())
            .await
            .unwrap();

        // Both games read team A's counters at wins=0 before either finalize
        let mut first = create_game(
            &pool,
            &NewGame::new(a.id, b.id, "2025-01-01T20:00:00").unwrap(),
        )
        .await
        .unwrap();
        let mut second = create_game(
            &pool,
            &NewGame::new(c.id, a.id, "2025-01-03T20:00:00").unwrap(),
        )
        .await
        .unwrap();

        first.record_result(90, 85).unwrap();
        second.record_result(95, 102).unwrap();
        assert!(finalize_game(&pool, &first).await.unwrap());
        assert!(finalize_game(&pool, &second).await.unwrap());

        // Neither of A's wins may be lost to the other game's write
        let stored_a = get_team_by_id(&pool, a.id).await.unwrap().unwrap();
        assert_eq!((stored_a.wins, stored_a.losses), (2, 0));
        let stored_b = get_team_by_id(&pool, b.id).await.unwrap().unwrap();
        assert_eq!(stored_b.losses, 1);
        let stored_c = get_team_by_id(&pool, c.id).await.unwrap().unwrap();
        assert_eq!(stored_c.losses, 1);
    }

    #[tokio::test]
    async fn update_team_leaves_standings_alone() {
        let pool = test_pool().await;
        let home = create_team(&pool, &NewTeam::new("Celtics", "Boston", "JM").unwrap())
            .await
            .unwrap();
        let away = create_team(&pool, &NewTeam::new("Lakers", "Los Angeles", "JR").unwrap())
            .await
            .unwrap();

        // Snapshot taken while the team still has wins=0
        let mut stale = home.clone();

        let mut game = create_game(
            &pool,
            &NewGame::new(home.id, away.id, "2025-01-01T20:00:00").unwrap(),
        )
        .await
        .unwrap();
        game.record_result(90, 85).unwrap();
        assert!(finalize_game(&pool, &game).await.unwrap());

        stale
            .update_details(None, None, Some("Brad Stevens".to_string()))
            .unwrap();
        update_team(&pool, &stale).await.unwrap();

        let stored = get_team_by_id(&pool, home.id).await.unwrap().unwrap();
        assert_eq!(stored.coach, "Brad Stevens");
        assert_eq!((stored.wins, stored.losses), (1, 0));
    }

    #[tokio::test]
    async fn deleting_referenced_team_hits_foreign_key() {
        let pool = test_pool().await;
        let home = create_team(&pool, &NewTeam::new("Celtics", "Boston", "JM").unwrap())
            .await
            .unwrap();
        let away = create_team(&pool, &NewTeam::new("Lakers", "Los Angeles", "JR").unwrap())
            .await
            .unwrap();
        create_game(
            &pool,
            &NewGame::new(home.id, away.id, "2025-01-01T20:00:00").unwrap(),
        )
        .await
        .unwrap();

        let err = delete_team(&pool, home.id).await.unwrap_err();
        match err {
            sqlx::Error::Database(db_err) => assert!(db_err.is_foreign_key_violation()),
            other => panic!("expected database error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn games_for_team_covers_home_and_away() {
        let pool = test_pool().await;
        let a = create_team(&pool, &NewTeam::new("Celtics", "Boston", "JM").unwrap())
            .await
            .unwrap();
        let b = create_team(&pool, &NewTeam::new("Lakers", "Los Angeles", "JR").unwrap())
            .await
            .unwrap();
        let c = create_team(&pool, &NewTeam::new("Bulls", "Chicago", "BD").unwrap())
            .await
            .unwrap();

        create_game(&pool, &NewGame::new(a.id, b.id, "2025-01-01T20:00:00").unwrap())
            .await
            .unwrap();
        create_game(&pool, &NewGame::new(c.id, a.id, "2025-01-03T20:00:00").unwrap())
            .await
            .unwrap();
        create_game(&pool, &NewGame::new(b.id, c.id, "2025-01-05T20:00:00").unwrap())
            .await
            .unwrap();

        let games = get_games_for_team(&pool, a.id).await.unwrap();
        assert_eq!(games.len(), 2);
        assert!(games.iter().all(|g| g.home_team_id == a.id || g.away_team_id == a.id));
    }
}
