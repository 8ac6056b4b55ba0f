//! Move catalog - named strikes used to build combinations

use serde::{Deserialize, Serialize};

/// A single named strike
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub id: String,
    pub name: String,
}

/// Label shown for a move id that is missing from the catalog
pub const UNKNOWN_MOVE: &str = "?";

/// Default strikes seeded into a fresh database.
/// Ids equal names so generator category tables can key on either.
pub const DEFAULT_MOVES: &[&str] = &[
    "Left Jab",
    "Right Cross",
    "Left Hook",
    "Right Hook",
    "Left Kick",
    "Right Kick",
    "Push Kicks",
    "Left Knee",
    "Right Knee",
    "Squat",
    "Pepper Punches",
];

// Category tables, keyed by move name
pub const PUNCHES: &[&str] = &["Left Jab", "Right Cross", "Left Hook", "Right Hook"];
pub const KICKS: &[&str] = &["Left Kick", "Right Kick"];
pub const KNEES: &[&str] = &["Left Knee", "Right Knee"];
pub const POWER_PUNCHES: &[&str] = &["Right Cross", "Right Hook"];
pub const POWER_KICKS: &[&str] = &["Right Kick"];
pub const PUSH_KICKS: &str = "Push Kicks";
pub const PEPPER_PUNCHES: &str = "Pepper Punches";
pub const SQUAT: &str = "Squat";

/// Read-only move list loaded once per session
#[derive(Debug, Clone, Default)]
pub struct MoveCatalog {
    moves: Vec<Move>,
}

impl MoveCatalog {
    pub fn new(moves: Vec<Move>) -> Self {
        Self { moves }
    }

    /// Catalog built from [`DEFAULT_MOVES`], sorted by name
    pub fn defaults() -> Self {
        let mut moves: Vec<Move> = DEFAULT_MOVES
            .iter()
            .map(|name| Move {
                id: name.to_string(),
                name: name.to_string(),
            })
            .collect();
        moves.sort_by(|a, b| a.name.cmp(&b.name));
        Self { moves }
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Move> {
        self.moves.iter().find(|m| m.id == id)
    }

    /// Name for display; unknown ids render as a placeholder
    pub fn display_name(&self, id: &str) -> &str {
        self.get(id).map(|m| m.name.as_str()).unwrap_or(UNKNOWN_MOVE)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Move> {
        self.moves.iter().find(|m| m.name == name)
    }

    /// All catalog moves whose name is in `names`, in catalog order
    pub fn by_names(&self, names: &[&str]) -> Vec<&Move> {
        self.moves
            .iter()
            .filter(|m| names.contains(&m.name.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_contains_every_move() {
        let catalog = MoveCatalog::defaults();
        assert_eq!(catalog.moves().len(), DEFAULT_MOVES.len());
        for name in DEFAULT_MOVES {
            assert!(catalog.find_by_name(name).is_some(), "{} missing", name);
        }
    }

    #[test]
    fn test_defaults_sorted_by_name() {
        let catalog = MoveCatalog::defaults();
        let names: Vec<_> = catalog.moves().iter().map(|m| m.name.clone()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_display_name_unknown_id() {
        let catalog = MoveCatalog::defaults();
        assert_eq!(catalog.display_name("Left Jab"), "Left Jab");
        assert_eq!(catalog.display_name("Spinning Backfist"), UNKNOWN_MOVE);
    }

    #[test]
    fn test_by_names_filters_category() {
        let catalog = MoveCatalog::defaults();
        let punches = catalog.by_names(PUNCHES);
        assert_eq!(punches.len(), 4);
        assert!(punches.iter().all(|m| PUNCHES.contains(&m.name.as_str())));
    }

    #[test]
    fn test_category_tables_are_in_defaults() {
        for name in PUNCHES.iter().chain(KICKS).chain(KNEES) {
            assert!(DEFAULT_MOVES.contains(name));
        }
        assert!(DEFAULT_MOVES.contains(&PUSH_KICKS));
        assert!(DEFAULT_MOVES.contains(&PEPPER_PUNCHES));
        assert!(DEFAULT_MOVES.contains(&SQUAT));
    }
}
