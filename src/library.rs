//! Library - favorites, saved workouts and the builder state behind them
//!
//! Store failures while loading are logged and leave the list empty.
//! Mutations return the error for the caller to show; local lists only
//! change after the store accepted the write.

use anyhow::{Context, Result, bail};
use tracing::{error, info};

use crate::db::Database;
use crate::moves::MoveCatalog;
use crate::workout::{self, Combination, FavoriteRound, SavedWorkout, WorkoutRound};

#[derive(Default)]
pub struct Library {
    pub catalog: MoveCatalog,
    pub favorites: Vec<FavoriteRound>,
    pub workouts: Vec<SavedWorkout>,
    /// Combination editor contents
    pub combinations: Vec<Combination>,
    /// Workout builder contents
    pub rounds: Vec<WorkoutRound>,
    /// Saved workout the builder is editing, if any
    pub current_workout_id: Option<String>,
}

impl Library {
    pub fn load(db: &Database) -> Self {
        let catalog = match db.get_moves() {
            Ok(moves) => MoveCatalog::new(moves),
            Err(e) => {
                error!("Error loading moves: {:#}", e);
                MoveCatalog::default()
            }
        };
        let favorites = db.get_favorites().unwrap_or_else(|e| {
            error!("Error loading favorite rounds: {:#}", e);
            Vec::new()
        });
        let workouts = db.get_workouts().unwrap_or_else(|e| {
            error!("Error loading saved workouts: {:#}", e);
            Vec::new()
        });
        info!(
            "Loaded {} moves, {} favorites, {} workouts",
            catalog.moves().len(),
            favorites.len(),
            workouts.len()
        );

        Self {
            catalog,
            favorites,
            workouts,
            ..Default::default()
        }
    }

    // === Combination editor ===

    /// Add a combination to the editor from move names, matched without
    /// regard to case. Nothing is added if any name is unknown.
    pub fn add_named_combination(&mut self, name: Option<&str>, move_names: &[&str]) -> Result<String> {
        let move_ids = move_names
            .iter()
            .map(|wanted| {
                self.catalog
                    .moves()
                    .iter()
                    .find(|m| m.name.eq_ignore_ascii_case(wanted.trim()))
                    .map(|m| m.id.clone())
                    .with_context(|| format!("Unknown move '{}'", wanted.trim()))
            })
            .collect::<Result<Vec<_>>>()?;
        let id = workout::add_combination(&mut self.combinations, name)
            .with_context(|| format!("A round holds at most {} combinations", workout::MAX_COMBINATIONS))?;
        for move_id in &move_ids {
            workout::add_move(&mut self.combinations, &id, move_id);
        }
        Ok(id)
    }

    // === Favorites ===

    pub fn save_to_favorites(&mut self, db: &Database, name: &str) -> Result<&FavoriteRound> {
        let favorite = db
            .add_favorite(name, &self.combinations)
            .inspect_err(|e| error!("Error saving favorite round: {:#}", e))
            .context("Failed to save round")?;
        self.favorites.push(favorite);
        Ok(&self.favorites[self.favorites.len() - 1])
    }

    /// Copy a favorite's combinations into the editor
    pub fn load_favorite(&mut self, id: &str) -> bool {
        match self.favorites.iter().find(|f| f.id == id) {
            Some(favorite) => {
                self.combinations = favorite.combinations.clone();
                true
            }
            None => false,
        }
    }

    pub fn remove_favorite(&mut self, db: &Database, id: &str) -> Result<()> {
        db.delete_favorite(id)
            .inspect_err(|e| error!("Error removing favorite round: {:#}", e))
            .context("Failed to remove round")?;
        self.favorites.retain(|f| f.id != id);
        Ok(())
    }

    pub fn rename_favorite(&mut self, db: &Database, id: &str, name: &str) -> Result<()> {
        db.rename_favorite(id, name)
            .inspect_err(|e| error!("Error renaming favorite round: {:#}", e))
            .context("Failed to rename round")?;
        if let Some(favorite) = self.favorites.iter_mut().find(|f| f.id == id) {
            favorite.name = name.to_string();
        }
        Ok(())
    }

    // === Builder ===

    pub fn set_generated(&mut self, rounds: Vec<WorkoutRound>) {
        self.rounds = rounds;
    }

    /// Put a favorite's combinations into a round slot
    pub fn update_workout_round(&mut self, db: &Database, round_number: u32, favorite_id: &str) -> Result<()> {
        let combinations = self
            .favorites
            .iter()
            .find(|f| f.id == favorite_id)
            .map(|f| f.combinations.clone())
            .with_context(|| format!("no favorite round with id {}", favorite_id))?;
        if !workout::set_round(&mut self.rounds, round_number, combinations) {
            bail!("A workout holds at most {} rounds", workout::MAX_ROUNDS);
        }
        self.save_workout_changes(db)
    }

    pub fn clear_workout_round(&mut self, db: &Database, round_number: u32) -> Result<()> {
        workout::clear_round(&mut self.rounds, round_number);
        self.save_workout_changes(db)
    }

    pub fn reorder_workout_rounds(&mut self, db: &Database, from: usize, to: usize) -> Result<()> {
        workout::reorder_rounds(&mut self.rounds, from, to);
        self.save_workout_changes(db)
    }

    pub fn reorder_round_combinations(
        &mut self,
        db: &Database,
        round_index: usize,
        from: usize,
        to: usize,
    ) -> Result<()> {
        if let Some(round) = self.rounds.get_mut(round_index) {
            workout::reorder_combinations(round, from, to);
        }
        self.save_workout_changes(db)
    }

    /// Write builder rounds through to the loaded workout, if any
    pub fn save_workout_changes(&mut self, db: &Database) -> Result<()> {
        let Some(id) = self.current_workout_id.clone() else {
            return Ok(());
        };
        db.update_workout_rounds(&id, &self.rounds)
            .inspect_err(|e| error!("Error updating workout: {:#}", e))
            .context("Failed to save workout changes")?;
        if let Some(saved) = self.workouts.iter_mut().find(|w| w.id == id) {
            saved.rounds = self.rounds.clone();
        }
        Ok(())
    }

    // === Saved workouts ===

    /// Update the loaded workout, or insert a new one named `name`
    pub fn save_workout(&mut self, db: &Database, name: &str) -> Result<String> {
        if let Some(id) = self.current_workout_id.clone() {
            self.save_workout_changes(db)?;
            return Ok(id);
        }
        let saved = db
            .add_workout(name, &self.rounds)
            .inspect_err(|e| error!("Error saving workout: {:#}", e))
            .context("Failed to save workout")?;
        let id = saved.id.clone();
        info!("Saved workout '{}' ({})", saved.name, id);
        self.workouts.push(saved);
        self.current_workout_id = Some(id.clone());
        Ok(id)
    }

    /// New workout with one round per favorite, in the given order
    pub fn save_workout_from_favorites(&mut self, db: &Database, name: &str, favorite_ids: &[&str]) -> Result<String> {
        self.rounds.clear();
        self.current_workout_id = None;
        for (i, favorite_id) in favorite_ids.iter().enumerate() {
            self.update_workout_round(db, i as u32 + 1, favorite_id)?;
        }
        self.save_workout(db, name)
    }

    pub fn load_workout(&mut self, id: &str) -> bool {
        match self.workouts.iter().find(|w| w.id == id) {
            Some(saved) => {
                self.rounds = saved.rounds.clone();
                self.current_workout_id = Some(saved.id.clone());
                true
            }
            None => false,
        }
    }

    pub fn delete_workout(&mut self, db: &Database, id: &str) -> Result<()> {
        db.delete_workout(id)
            .inspect_err(|e| error!("Error deleting workout: {:#}", e))
            .context("Failed to delete workout")?;
        self.workouts.retain(|w| w.id != id);
        if self.current_workout_id.as_deref() == Some(id) {
            self.current_workout_id = None;
        }
        Ok(())
    }

    pub fn rename_workout(&mut self, db: &Database, id: &str, name: &str) -> Result<()> {
        db.rename_workout(id, name)
            .inspect_err(|e| error!("Error renaming workout: {:#}", e))
            .context("Failed to rename workout")?;
        if let Some(saved) = self.workouts.iter_mut().find(|w| w.id == id) {
            saved.name = name.to_string();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Database, Library) {
        let db = Database::open_in_memory().unwrap();
        let library = Library::load(&db);
        (db, library)
    }

    fn round(n: u32, name: &str) -> WorkoutRound {
        WorkoutRound {
            round_number: n,
            combinations: vec![Combination::new(name, vec!["Left Jab".into()])],
        }
    }

    #[test]
    fn test_load_reads_catalog() {
        let (_db, library) = setup();
        assert_eq!(library.catalog.moves().len(), crate::moves::DEFAULT_MOVES.len());
        assert!(library.favorites.is_empty());
        assert!(library.workouts.is_empty());
    }

    #[test]
    fn test_save_and_load_favorite() {
        let (db, mut library) = setup();
        workout::add_combination(&mut library.combinations, Some("One-Two"));
        let id = library.save_to_favorites(&db, "Basics").unwrap().id.clone();

        library.combinations.clear();
        assert!(library.load_favorite(&id));
        assert_eq!(library.combinations[0].name, "One-Two");

        let reloaded = Library::load(&db);
        assert_eq!(reloaded.favorites.len(), 1);
    }

    #[test]
    fn test_failed_mutation_leaves_state() {
        let (db, mut library) = setup();
        library.combinations.push(Combination::new("x", vec![]));
        library.save_to_favorites(&db, "Keep").unwrap();

        let mut ghost = library.favorites[0].clone();
        ghost.id = "ghost".into();
        library.favorites.push(ghost);

        assert!(library.rename_favorite(&db, "ghost", "Renamed").is_err());
        assert_eq!(library.favorites[1].name, "Keep");
        assert!(library.remove_favorite(&db, "ghost").is_err());
        assert_eq!(library.favorites.len(), 2);
    }

    #[test]
    fn test_new_workout_then_update() {
        let (db, mut library) = setup();
        library.set_generated(vec![round(1, "a"), round(2, "b"), round(3, "c")]);
        let id = library.save_workout(&db, "Mine").unwrap();
        assert_eq!(library.current_workout_id.as_deref(), Some(id.as_str()));

        library.clear_workout_round(&db, 2).unwrap();
        let stored = db.get_workout(&id).unwrap().unwrap();
        let numbers: Vec<_> = stored.rounds.iter().map(|r| r.round_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(stored.rounds[1].combinations[0].name, "c");
        assert_eq!(library.workouts[0].rounds.len(), 2);

        // Second save updates rather than inserting
        assert_eq!(library.save_workout(&db, "ignored").unwrap(), id);
        assert_eq!(db.get_workouts().unwrap().len(), 1);
    }

    #[test]
    fn test_reorder_writes_through() {
        let (db, mut library) = setup();
        library.set_generated(vec![round(1, "a"), round(2, "b")]);
        let id = library.save_workout(&db, "Mine").unwrap();

        library.reorder_workout_rounds(&db, 1, 0).unwrap();
        let stored = db.get_workout(&id).unwrap().unwrap();
        assert_eq!(stored.rounds[0].combinations[0].name, "b");
        assert_eq!(stored.rounds[0].round_number, 1);
    }

    #[test]
    fn test_builder_without_saved_workout_stays_local() {
        let (db, mut library) = setup();
        library.set_generated(vec![round(1, "a")]);
        library.clear_workout_round(&db, 1).unwrap();
        assert!(library.rounds.is_empty());
        assert!(db.get_workouts().unwrap().is_empty());
    }

    #[test]
    fn test_update_round_from_favorite() {
        let (db, mut library) = setup();
        library.combinations.push(Combination::new("Fav", vec!["Left Hook".into()]));
        let fav_id = library.save_to_favorites(&db, "F").unwrap().id.clone();

        library.update_workout_round(&db, 1, &fav_id).unwrap();
        assert_eq!(library.rounds.len(), 1);
        assert_eq!(library.rounds[0].combinations[0].name, "Fav");
        assert!(library.update_workout_round(&db, 2, "missing").is_err());
    }

    #[test]
    fn test_named_combination_to_favorite() {
        let (db, mut library) = setup();
        library.add_named_combination(Some("One-Two"), &["left jab", "Right Cross"]).unwrap();
        library.add_named_combination(None, &["Left Hook"]).unwrap();
        assert!(library.add_named_combination(None, &["Spinning Elbow"]).is_err());
        assert_eq!(library.combinations.len(), 2);
        assert_eq!(library.combinations[1].name, "Combination 2");

        let fav_id = library.save_to_favorites(&db, "Basics").unwrap().id.clone();
        let workout_id = library
            .save_workout_from_favorites(&db, "From favorites", &[&fav_id, &fav_id])
            .unwrap();

        let stored = db.get_workout(&workout_id).unwrap().unwrap();
        assert_eq!(stored.rounds.len(), 2);
        assert_eq!(stored.rounds[1].round_number, 2);
        assert_eq!(stored.rounds[0].combinations[0].moves, vec!["Left Jab", "Right Cross"]);
    }

    #[test]
    fn test_named_combination_respects_editor_limit() {
        let (_db, mut library) = setup();
        for _ in 0..workout::MAX_COMBINATIONS {
            library.add_named_combination(None, &["Left Jab"]).unwrap();
        }
        let err = library.add_named_combination(None, &["Left Jab"]).unwrap_err();
        assert!(err.to_string().contains("at most 4 combinations"));
    }

    #[test]
    fn test_update_round_past_the_end_keeps_numbers_contiguous() {
        let (db, mut library) = setup();
        library.combinations.push(Combination::new("Fav", vec!["Left Hook".into()]));
        let fav_id = library.save_to_favorites(&db, "F").unwrap().id.clone();
        library.set_generated(vec![round(1, "a"), round(2, "b")]);
        let id = library.save_workout(&db, "Mine").unwrap();

        library.update_workout_round(&db, 7, &fav_id).unwrap();
        let stored = db.get_workout(&id).unwrap().unwrap();
        let numbers: Vec<_> = stored.rounds.iter().map(|r| r.round_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(stored.rounds[2].combinations[0].name, "Fav");
    }

    #[test]
    fn test_update_round_refused_when_full() {
        let (db, mut library) = setup();
        library.combinations.push(Combination::new("Fav", vec!["Left Hook".into()]));
        let fav_id = library.save_to_favorites(&db, "F").unwrap().id.clone();
        let full: Vec<_> = (1..=workout::MAX_ROUNDS as u32).map(|n| round(n, "x")).collect();
        library.set_generated(full);

        let err = library.update_workout_round(&db, 10, &fav_id).unwrap_err();
        assert!(err.to_string().contains("at most 9 rounds"));
        assert_eq!(library.rounds.len(), workout::MAX_ROUNDS);
    }

    #[test]
    fn test_delete_current_workout_clears_id() {
        let (db, mut library) = setup();
        library.set_generated(vec![round(1, "a")]);
        let id = library.save_workout(&db, "Mine").unwrap();

        library.rename_workout(&db, &id, "Renamed").unwrap();
        assert_eq!(library.workouts[0].name, "Renamed");

        library.delete_workout(&db, &id).unwrap();
        assert!(library.workouts.is_empty());
        assert!(library.current_workout_id.is_none());
    }

    #[test]
    fn test_load_workout_sets_current() {
        let (db, mut library) = setup();
        let saved = db.add_workout("Stored", &[round(1, "z")]).unwrap();
        let mut library2 = Library::load(&db);
        assert!(library2.load_workout(&saved.id));
        assert_eq!(library2.rounds[0].combinations[0].name, "z");
        assert!(!library.load_workout("nope"));
    }
}
