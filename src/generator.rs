//! Random workout generator
//!
//! Builds `duration / 3` rounds of random combinations drawn from fixed
//! strike categories. Selection is unweighted and uses whatever RNG the
//! caller passes in.

use clap::ValueEnum;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::moves::{
    KICKS, KNEES, Move, MoveCatalog, PEPPER_PUNCHES, POWER_KICKS, POWER_PUNCHES, PUNCHES,
    PUSH_KICKS, SQUAT,
};
use crate::workout::{Combination, WorkoutRound};

/// Minutes per generated round (work + rest)
pub const MINUTES_PER_ROUND: u32 = 3;

/// Chance a combination is a single standalone drill
const STANDALONE_CHANCE: f64 = 0.2;
/// Chance a balanced combination opens with a squat
const SQUAT_CHANCE: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Goal {
    Cardio,
    Power,
    Technique,
    Balanced,
}

impl Goal {
    /// Lenient parse; anything unrecognised gets the balanced mix
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "cardio" => Goal::Cardio,
            "power" => Goal::Power,
            "technique" => Goal::Technique,
            _ => Goal::Balanced,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Goal::Cardio => "High-intensity workout focused on burning calories",
            Goal::Power => "Heavy strikes and power combinations",
            Goal::Technique => "Perfect form and technical combinations",
            Goal::Balanced => "Well-rounded workout with mixed elements",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    Medium,
    High,
}

impl Intensity {
    /// Lenient parse; anything unrecognised counts as low
    pub fn parse(s: &str) -> Self {
        match s {
            "high" => Intensity::High,
            "medium" => Intensity::Medium,
            _ => Intensity::Low,
        }
    }

    /// Combinations per round, also moves per combination
    pub fn count(&self) -> usize {
        match self {
            Intensity::High => 4,
            Intensity::Medium => 3,
            Intensity::Low => 2,
        }
    }
}

/// Generate a full workout
pub fn generate_workout<R: Rng + ?Sized>(
    goal: Goal,
    duration_minutes: u32,
    intensity: Intensity,
    catalog: &MoveCatalog,
    rng: &mut R,
) -> Vec<WorkoutRound> {
    let rounds_count = duration_minutes / MINUTES_PER_ROUND;
    let per_round = intensity.count();
    debug!(?goal, ?intensity, rounds_count, per_round, "Generating workout");

    (1..=rounds_count)
        .map(|round_number| WorkoutRound {
            round_number,
            combinations: (1..=per_round)
                .map(|position| generate_combination(goal, intensity, position, catalog, rng))
                .collect(),
        })
        .collect()
}

fn generate_combination<R: Rng + ?Sized>(
    goal: Goal,
    intensity: Intensity,
    position: usize,
    catalog: &MoveCatalog,
    rng: &mut R,
) -> Combination {
    let moves = select_moves(goal, intensity.count(), catalog, rng);
    Combination::new(
        format!("Combination {}", position),
        moves.into_iter().map(|m| m.id.clone()).collect(),
    )
}

fn select_moves<'a, R: Rng + ?Sized>(
    goal: Goal,
    count: usize,
    catalog: &'a MoveCatalog,
    rng: &mut R,
) -> Vec<&'a Move> {
    let punches = catalog.by_names(PUNCHES);
    let kicks = catalog.by_names(KICKS);
    let knees = catalog.by_names(KNEES);

    if let Some(push_kicks) = catalog.find_by_name(PUSH_KICKS)
        && rng.gen_bool(STANDALONE_CHANCE)
    {
        return vec![push_kicks];
    }
    if let Some(pepper) = catalog.find_by_name(PEPPER_PUNCHES)
        && rng.gen_bool(STANDALONE_CHANCE)
    {
        return vec![pepper];
    }

    match goal {
        Goal::Cardio | Goal::Technique => alternate(&punches, &kicks, count, rng),
        Goal::Power => {
            let power_punches = catalog.by_names(POWER_PUNCHES);
            let mut power_legs = catalog.by_names(POWER_KICKS);
            power_legs.extend(knees);
            alternate(&power_punches, &power_legs, count, rng)
        }
        Goal::Balanced => {
            if let Some(squat) = catalog.find_by_name(SQUAT)
                && rng.gen_bool(SQUAT_CHANCE)
            {
                let mut selected = vec![squat];
                fill_from(&mut selected, &punches, count, rng);
                return selected;
            }
            let mut pool = punches;
            pool.extend(kicks);
            pool.extend(knees);
            distinct(&pool, count, rng)
        }
    }
}

/// Alternate picks: even slots from `first`, odd slots from `second`.
/// Stops early if a pool is empty.
fn alternate<'a, R: Rng + ?Sized>(
    first: &[&'a Move],
    second: &[&'a Move],
    count: usize,
    rng: &mut R,
) -> Vec<&'a Move> {
    let mut selected = Vec::with_capacity(count);
    while selected.len() < count {
        let pool = if selected.len() % 2 == 0 { first } else { second };
        match pool.choose(rng) {
            Some(m) => selected.push(*m),
            None => break,
        }
    }
    selected
}

fn fill_from<'a, R: Rng + ?Sized>(
    selected: &mut Vec<&'a Move>,
    pool: &[&'a Move],
    count: usize,
    rng: &mut R,
) {
    while selected.len() < count {
        match pool.choose(rng) {
            Some(m) => selected.push(*m),
            None => break,
        }
    }
}

/// Rejection-sample without repeats, capped at the pool size
fn distinct<'a, R: Rng + ?Sized>(pool: &[&'a Move], count: usize, rng: &mut R) -> Vec<&'a Move> {
    let count = count.min(pool.len());
    let mut selected: Vec<&Move> = Vec::with_capacity(count);
    while selected.len() < count {
        if let Some(m) = pool.choose(rng)
            && !selected.iter().any(|s| s.id == m.id)
        {
            selected.push(*m);
        }
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    fn catalog_without(excluded: &[&str]) -> MoveCatalog {
        MoveCatalog::new(
            MoveCatalog::defaults()
                .moves()
                .iter()
                .filter(|m| !excluded.contains(&m.name.as_str()))
                .cloned()
                .collect(),
        )
    }

    #[test]
    fn test_medium_fifteen_minutes_shape() {
        let catalog = MoveCatalog::defaults();
        let rounds = generate_workout(Goal::Balanced, 15, Intensity::Medium, &catalog, &mut rng(1));
        assert_eq!(rounds.len(), 5);
        for (i, round) in rounds.iter().enumerate() {
            assert_eq!(round.round_number, i as u32 + 1);
            assert_eq!(round.combinations.len(), 3);
        }
    }

    #[test]
    fn test_counts_per_intensity() {
        let catalog = MoveCatalog::defaults();
        for (intensity, expected) in [
            (Intensity::Low, 2),
            (Intensity::Medium, 3),
            (Intensity::High, 4),
        ] {
            let rounds = generate_workout(Goal::Cardio, 30, intensity, &catalog, &mut rng(7));
            assert_eq!(rounds.len(), 10);
            assert!(rounds.iter().all(|r| r.combinations.len() == expected));
        }
    }

    #[test]
    fn test_short_duration_yields_no_rounds() {
        let catalog = MoveCatalog::defaults();
        let rounds = generate_workout(Goal::Power, 2, Intensity::High, &catalog, &mut rng(3));
        assert!(rounds.is_empty());
    }

    #[test]
    fn test_combination_names_follow_position() {
        let catalog = MoveCatalog::defaults();
        let rounds = generate_workout(Goal::Technique, 3, Intensity::High, &catalog, &mut rng(9));
        let names: Vec<_> = rounds[0].combinations.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Combination 1", "Combination 2", "Combination 3", "Combination 4"]);
    }

    #[test]
    fn test_move_counts_without_standalones() {
        // No standalone drills or squat: every combination is exactly count long
        let catalog = catalog_without(&[PUSH_KICKS, PEPPER_PUNCHES, SQUAT]);
        for goal in [Goal::Cardio, Goal::Power, Goal::Technique, Goal::Balanced] {
            let rounds = generate_workout(goal, 45, Intensity::High, &catalog, &mut rng(11));
            for combo in rounds.iter().flat_map(|r| &r.combinations) {
                assert_eq!(combo.moves.len(), 4, "{:?}", goal);
            }
        }
    }

    #[test]
    fn test_cardio_alternates_punch_and_kick() {
        let catalog = catalog_without(&[PUSH_KICKS, PEPPER_PUNCHES]);
        let rounds = generate_workout(Goal::Cardio, 30, Intensity::High, &catalog, &mut rng(5));
        for combo in rounds.iter().flat_map(|r| &r.combinations) {
            for (i, id) in combo.moves.iter().enumerate() {
                let table = if i % 2 == 0 { PUNCHES } else { KICKS };
                assert!(table.contains(&id.as_str()), "{} at {}", id, i);
            }
        }
    }

    #[test]
    fn test_power_uses_power_pools() {
        let catalog = catalog_without(&[PUSH_KICKS, PEPPER_PUNCHES]);
        let rounds = generate_workout(Goal::Power, 30, Intensity::High, &catalog, &mut rng(13));
        for combo in rounds.iter().flat_map(|r| &r.combinations) {
            for (i, id) in combo.moves.iter().enumerate() {
                if i % 2 == 0 {
                    assert!(POWER_PUNCHES.contains(&id.as_str()));
                } else {
                    assert!(POWER_KICKS.contains(&id.as_str()) || KNEES.contains(&id.as_str()));
                }
            }
        }
    }

    #[test]
    fn test_balanced_general_branch_has_no_duplicates() {
        let catalog = catalog_without(&[PUSH_KICKS, PEPPER_PUNCHES, SQUAT]);
        let rounds = generate_workout(Goal::Balanced, 45, Intensity::High, &catalog, &mut rng(17));
        for combo in rounds.iter().flat_map(|r| &r.combinations) {
            let unique: HashSet<_> = combo.moves.iter().collect();
            assert_eq!(unique.len(), combo.moves.len());
        }
    }

    #[test]
    fn test_balanced_squat_followed_by_punches() {
        let catalog = catalog_without(&[PUSH_KICKS, PEPPER_PUNCHES]);
        let rounds = generate_workout(Goal::Balanced, 45, Intensity::Medium, &catalog, &mut rng(21));
        for combo in rounds.iter().flat_map(|r| &r.combinations) {
            if combo.moves[0] == SQUAT {
                assert!(combo.moves[1..].iter().all(|id| PUNCHES.contains(&id.as_str())));
            }
        }
    }

    #[test]
    fn test_standalone_drills_are_single_moves() {
        let catalog = MoveCatalog::defaults();
        let rounds = generate_workout(Goal::Cardio, 45, Intensity::High, &catalog, &mut rng(23));
        for combo in rounds.iter().flat_map(|r| &r.combinations) {
            if combo.moves.iter().any(|m| m == PUSH_KICKS || m == PEPPER_PUNCHES) {
                assert_eq!(combo.moves.len(), 1);
            }
        }
    }

    #[test]
    fn test_empty_catalog_gives_empty_combinations() {
        let catalog = MoveCatalog::default();
        let rounds = generate_workout(Goal::Cardio, 6, Intensity::Low, &catalog, &mut rng(2));
        assert_eq!(rounds.len(), 2);
        assert!(rounds.iter().flat_map(|r| &r.combinations).all(|c| c.moves.is_empty()));
    }

    #[test]
    fn test_lenient_parsing() {
        assert_eq!(Goal::parse("POWER"), Goal::Power);
        assert_eq!(Goal::parse("yoga"), Goal::Balanced);
        assert_eq!(Intensity::parse("high"), Intensity::High);
        assert_eq!(Intensity::parse("extreme"), Intensity::Low);
    }
}
