//! Workout structure - combinations, rounds and the edit operations on them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::moves::MoveCatalog;

/// Editor holds at most this many combinations
pub const MAX_COMBINATIONS: usize = 4;

/// Builder holds at most this many rounds
pub const MAX_ROUNDS: usize = 9;

/// Ordered list of move ids performed together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combination {
    pub id: String,
    pub name: String,
    pub moves: Vec<String>,
}

impl Combination {
    pub fn new(name: impl Into<String>, moves: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            moves,
        }
    }

    /// Move names for display, unknown ids shown as a placeholder
    pub fn move_names<'a>(&'a self, catalog: &'a MoveCatalog) -> Vec<&'a str> {
        self.moves.iter().map(|id| catalog.display_name(id)).collect()
    }
}

/// One round of a workout. `round_number` is 1-based and contiguous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutRound {
    pub round_number: u32,
    pub combinations: Vec<Combination>,
}

/// Named round stored for reuse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteRound {
    pub id: String,
    pub name: String,
    pub combinations: Vec<Combination>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedWorkout {
    pub id: String,
    pub name: String,
    pub rounds: Vec<WorkoutRound>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Renumber rounds to 1..=count in sequence order
pub fn renumber(rounds: &mut [WorkoutRound]) {
    for (index, round) in rounds.iter_mut().enumerate() {
        round.round_number = index as u32 + 1;
    }
}

pub fn find_round(rounds: &[WorkoutRound], round_number: u32) -> Option<&WorkoutRound> {
    rounds.iter().find(|r| r.round_number == round_number)
}

// === Workout builder ===

/// Replace the round with this number, or append a new last round if
/// absent. Appending is refused once the builder holds `MAX_ROUNDS`.
pub fn set_round(rounds: &mut Vec<WorkoutRound>, round_number: u32, combinations: Vec<Combination>) -> bool {
    if let Some(round) = rounds.iter_mut().find(|r| r.round_number == round_number) {
        round.combinations = combinations;
        return true;
    }
    if rounds.len() >= MAX_ROUNDS {
        return false;
    }
    rounds.push(WorkoutRound {
        round_number,
        combinations,
    });
    renumber(rounds);
    true
}

/// Remove a round and renumber the rest. Returns false if absent.
pub fn clear_round(rounds: &mut Vec<WorkoutRound>, round_number: u32) -> bool {
    let before = rounds.len();
    rounds.retain(|r| r.round_number != round_number);
    renumber(rounds);
    rounds.len() != before
}

/// Move a round from one position to another and renumber
pub fn reorder_rounds(rounds: &mut Vec<WorkoutRound>, from: usize, to: usize) -> bool {
    if from >= rounds.len() || to >= rounds.len() {
        return false;
    }
    let round = rounds.remove(from);
    rounds.insert(to, round);
    renumber(rounds);
    true
}

/// Reorder combinations inside a single round
pub fn reorder_combinations(round: &mut WorkoutRound, from: usize, to: usize) -> bool {
    let combos = &mut round.combinations;
    if from >= combos.len() || to >= combos.len() {
        return false;
    }
    let combo = combos.remove(from);
    combos.insert(to, combo);
    true
}

// === Combination editor ===

/// Append an empty combination; refused once the editor is full
pub fn add_combination(combinations: &mut Vec<Combination>, name: Option<&str>) -> Option<String> {
    if combinations.len() >= MAX_COMBINATIONS {
        return None;
    }
    let name = match name {
        Some(n) if !n.trim().is_empty() => n.to_string(),
        _ => format!("Combination {}", combinations.len() + 1),
    };
    let combo = Combination::new(name, Vec::new());
    let id = combo.id.clone();
    combinations.push(combo);
    Some(id)
}

pub fn add_move(combinations: &mut [Combination], combination_id: &str, move_id: &str) -> bool {
    match combinations.iter_mut().find(|c| c.id == combination_id) {
        Some(combo) => {
            combo.moves.push(move_id.to_string());
            true
        }
        None => false,
    }
}

pub fn remove_move(combinations: &mut [Combination], combination_id: &str, index: usize) -> bool {
    match combinations.iter_mut().find(|c| c.id == combination_id) {
        Some(combo) if index < combo.moves.len() => {
            combo.moves.remove(index);
            true
        }
        _ => false,
    }
}

pub fn remove_combination(combinations: &mut Vec<Combination>, combination_id: &str) -> bool {
    let before = combinations.len();
    combinations.retain(|c| c.id != combination_id);
    combinations.len() != before
}

/// Rename a combination; blank names are ignored
pub fn rename_combination(combinations: &mut [Combination], combination_id: &str, name: &str) -> bool {
    if name.trim().is_empty() {
        return false;
    }
    match combinations.iter_mut().find(|c| c.id == combination_id) {
        Some(combo) => {
            combo.name = name.to_string();
            true
        }
        None => false,
    }
}

/// Swap a combination with its neighbour; no-op at the edges
pub fn move_combination(combinations: &mut [Combination], index: usize, direction: Direction) -> bool {
    let target = match direction {
        Direction::Up if index > 0 => index - 1,
        Direction::Down if index + 1 < combinations.len() => index + 1,
        _ => return false,
    };
    combinations.swap(index, target);
    true
}
