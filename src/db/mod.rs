//! Database module - SQLite storage for moves, favorite rounds and workouts

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params, types::Type};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use uuid::Uuid;

use crate::moves::{DEFAULT_MOVES, Move};
use crate::workout::{Combination, FavoriteRound, SavedWorkout, WorkoutRound};

/// Database wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Fresh database that lives only as long as this value
    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS moves (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS favorite_rounds (
                id TEXT PRIMARY KEY,
                user_id TEXT,
                name TEXT NOT NULL,
                combinations TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS saved_workouts (
                id TEXT PRIMARY KEY,
                user_id TEXT,
                name TEXT NOT NULL,
                rounds TEXT NOT NULL,
                created_at TEXT NOT NULL
            );",
        )?;

        // Seed the move catalog on first run
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM moves", [], |row| row.get(0))?;
        if count == 0 {
            let now = Utc::now().to_rfc3339();
            for name in DEFAULT_MOVES {
                self.conn.execute(
                    "INSERT INTO moves (id, name, created_at) VALUES (?1, ?2, ?3)",
                    params![*name, *name, now],
                )?;
            }
            info!("Seeded {} default moves", DEFAULT_MOVES.len());
        }

        Ok(())
    }

    /// All moves, by name
    pub fn get_moves(&self) -> Result<Vec<Move>> {
        let mut stmt = self.conn.prepare("SELECT id, name FROM moves ORDER BY name")?;
        let moves = stmt
            .query_map([], |row| {
                Ok(Move {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(moves)
    }

    // === Favorite rounds ===

    pub fn add_favorite(&self, name: &str, combinations: &[Combination]) -> Result<FavoriteRound> {
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO favorite_rounds (id, user_id, name, combinations, created_at) VALUES (?1, NULL, ?2, ?3, ?4)",
            params![id, name, serde_json::to_string(combinations)?, Utc::now().to_rfc3339()],
        )?;
        debug!("Inserted favorite round {}", id);
        Ok(FavoriteRound {
            id,
            name: name.to_string(),
            combinations: combinations.to_vec(),
        })
    }

    /// Newest first
    pub fn get_favorites(&self) -> Result<Vec<FavoriteRound>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, combinations FROM favorite_rounds ORDER BY created_at DESC",
        )?;
        let favorites = stmt
            .query_map([], |row| {
                Ok(FavoriteRound {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    combinations: json_column(row, 2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(favorites)
    }

    pub fn rename_favorite(&self, id: &str, name: &str) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE favorite_rounds SET name = ?1 WHERE id = ?2",
            params![name, id],
        )?;
        expect_row(changed, "favorite round", id)
    }

    pub fn delete_favorite(&self, id: &str) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM favorite_rounds WHERE id = ?1", params![id])?;
        expect_row(changed, "favorite round", id)
    }

    // === Saved workouts ===

    pub fn add_workout(&self, name: &str, rounds: &[WorkoutRound]) -> Result<SavedWorkout> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        self.conn.execute(
            "INSERT INTO saved_workouts (id, user_id, name, rounds, created_at) VALUES (?1, NULL, ?2, ?3, ?4)",
            params![id, name, serde_json::to_string(rounds)?, created_at.to_rfc3339()],
        )?;
        debug!("Inserted workout {}", id);
        Ok(SavedWorkout {
            id,
            name: name.to_string(),
            rounds: rounds.to_vec(),
            created_at,
        })
    }

    /// Newest first
    pub fn get_workouts(&self) -> Result<Vec<SavedWorkout>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, rounds, created_at FROM saved_workouts ORDER BY created_at DESC",
        )?;
        let workouts = stmt
            .query_map([], workout_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(workouts)
    }

    pub fn get_workout(&self, id: &str) -> Result<Option<SavedWorkout>> {
        let workout = self
            .conn
            .query_row(
                "SELECT id, name, rounds, created_at FROM saved_workouts WHERE id = ?1",
                params![id],
                workout_from_row,
            )
            .optional()?;
        Ok(workout)
    }

    pub fn update_workout_rounds(&self, id: &str, rounds: &[WorkoutRound]) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE saved_workouts SET rounds = ?1 WHERE id = ?2",
            params![serde_json::to_string(rounds)?, id],
        )?;
        expect_row(changed, "workout", id)
    }

    pub fn rename_workout(&self, id: &str, name: &str) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE saved_workouts SET name = ?1 WHERE id = ?2",
            params![name, id],
        )?;
        expect_row(changed, "workout", id)
    }

    pub fn delete_workout(&self, id: &str) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM saved_workouts WHERE id = ?1", params![id])?;
        expect_row(changed, "workout", id)
    }
}

fn workout_from_row(row: &Row) -> rusqlite::Result<SavedWorkout> {
    let created_at: String = row.get(3)?;
    Ok(SavedWorkout {
        id: row.get(0)?,
        name: row.get(1)?,
        rounds: json_column(row, 2)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

/// Decode a JSON text column
fn json_column<T: DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn expect_row(changed: usize, what: &str, id: &str) -> Result<()> {
    if changed == 0 {
        bail!("no {} with id {}", what, id);
    }
    Ok(())
}
