//! Workout session - walks a workout round by round
//!
//! Owns playback position, reacts to timer completions, and tells the
//! narrator when a new combination comes up.

use tracing::info;

use crate::audio::{Bell, NarrationContext, Narrator, SpeechEngine};
use crate::moves::MoveCatalog;
use crate::timer::{Completion, Phase, RoundTimer, TimerPosition};
use crate::workout::{Combination, WorkoutRound, find_round};

pub struct WorkoutSession<B: Bell + Clone, S: SpeechEngine> {
    rounds: Vec<WorkoutRound>,
    catalog: MoveCatalog,
    current_round: u32,
    current_combination: usize,
    cooldown: bool,
    active: bool,
    editing: bool,
    bell: B,
    /// Present only while the play view is up
    timer: Option<RoundTimer<B>>,
    narrator: Narrator<S>,
}

impl<B: Bell + Clone, S: SpeechEngine> WorkoutSession<B, S> {
    pub fn new(catalog: MoveCatalog, bell: B, narrator: Narrator<S>) -> Self {
        Self {
            rounds: Vec::new(),
            catalog,
            current_round: 1,
            current_combination: 0,
            cooldown: false,
            active: false,
            editing: false,
            bell,
            timer: None,
            narrator,
        }
    }

    /// Replace the workout to play
    pub fn load(&mut self, rounds: Vec<WorkoutRound>) {
        self.rounds = rounds;
        self.sync_timer();
    }

    /// Begin from round 1. Refused for an empty workout.
    pub fn start(&mut self) -> bool {
        if self.rounds.is_empty() {
            return false;
        }
        self.current_round = 1;
        self.current_combination = 0;
        self.active = true;
        self.cooldown = false;
        self.editing = false;
        self.narrator.clear();
        self.timer = Some(RoundTimer::new(self.position(), self.bell.clone()));
        info!("Workout started: {} rounds", self.rounds.len());
        self.announce();
        true
    }

    pub fn stop(&mut self) {
        self.active = false;
        self.cooldown = false;
        self.current_round = 1;
        self.current_combination = 0;
        self.editing = false;
        self.narrator.clear();
        self.timer = None;
        info!("Workout stopped");
    }

    /// Editing hides the play view; coming back starts a fresh timer
    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
        if self.editing {
            self.timer = None;
        } else if self.active {
            self.timer = Some(RoundTimer::new(self.position(), self.bell.clone()));
            self.announce();
        }
    }

    pub fn on_round_complete(&mut self) {
        if self.cooldown {
            self.cooldown = false;
        } else if (self.current_round as usize) < self.rounds.len() {
            self.cooldown = true;
            self.current_round += 1;
            self.current_combination = 0;
        } else {
            info!("Workout finished");
            self.current_round = 1;
            self.current_combination = 0;
            self.active = false;
            self.cooldown = false;
            self.timer = None;
            return;
        }
        self.sync_timer();
        self.announce();
    }

    pub fn on_combination_complete(&mut self) {
        let has_next = find_round(&self.rounds, self.current_round)
            .is_some_and(|r| self.current_combination + 1 < r.combinations.len());
        if !has_next {
            return;
        }
        self.current_combination += 1;
        self.narrator.forget(self.current_round, self.current_combination);
        self.sync_timer();
        self.announce();
    }

    /// One second of wall time
    pub fn tick(&mut self) {
        let completion = self.timer.as_mut().and_then(|t| t.tick());
        match completion {
            Some(Completion::Combination) => self.on_combination_complete(),
            Some(Completion::Round) => self.on_round_complete(),
            None => {}
        }
    }

    pub fn toggle_timer(&mut self) {
        if let Some(timer) = self.timer.as_mut() {
            timer.toggle();
        }
    }

    pub fn reset_timer(&mut self) {
        if let Some(timer) = self.timer.as_mut() {
            timer.reset();
        }
    }

    /// Voice list changed; try any pending announcement again
    pub fn refresh_voices(&mut self) {
        if self.narrator.refresh_voices() {
            self.announce();
        }
    }

    pub fn narration_ready(&self) -> bool {
        self.narrator.is_ready()
    }

    fn position(&self) -> TimerPosition {
        let phase = if self.cooldown { Phase::Cooldown } else { Phase::Work };
        TimerPosition::new(phase, self.current_round, &self.rounds, self.current_combination)
    }

    fn sync_timer(&mut self) {
        let position = self.position();
        if let Some(timer) = self.timer.as_mut() {
            timer.set_position(position);
        }
    }

    fn announce(&mut self) {
        let combination = find_round(&self.rounds, self.current_round)
            .and_then(|r| r.combinations.get(self.current_combination));
        let ctx = NarrationContext {
            active: self.active,
            cooldown: self.cooldown,
            editing: self.editing,
            round_number: self.current_round,
            combination_index: self.current_combination,
            combination,
        };
        self.narrator.narrate(&ctx, &self.catalog);
    }

    pub fn header(&self) -> String {
        if self.cooldown {
            "Cooldown Period".to_string()
        } else {
            format!("Round {}/{}", self.current_round, self.rounds.len())
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_cooldown(&self) -> bool {
        self.cooldown
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn current_combination_index(&self) -> usize {
        self.current_combination
    }

    pub fn timer(&self) -> Option<&RoundTimer<B>> {
        self.timer.as_ref()
    }

    pub fn time_left(&self) -> Option<u32> {
        self.timer.as_ref().map(|t| t.time_left())
    }

    pub fn is_running(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| t.is_running())
    }

    pub fn current_combination(&self) -> Option<&Combination> {
        self.timer.as_ref().and_then(|t| t.current_combination())
    }

    pub fn catalog(&self) -> &MoveCatalog {
        &self.catalog
    }

    pub fn rounds(&self) -> &[WorkoutRound] {
        &self.rounds
    }
}
