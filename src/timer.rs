//! Round timer - countdown state machine for work and cooldown phases
//!
//! The timer does not own a clock. The driver calls [`RoundTimer::tick`]
//! once per second; a tick only counts while the interval is armed.
//! Expiry yields a [`Completion`] exactly once per phase visit.

use tracing::debug;

use crate::audio::{Bell, BellCue};
use crate::workout::{Combination, WorkoutRound, find_round};

pub const WORK_SECS: u32 = 30;
pub const COOLDOWN_SECS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Work,
    Cooldown,
}

impl Phase {
    pub fn duration(&self) -> u32 {
        match self {
            Phase::Work => WORK_SECS,
            Phase::Cooldown => COOLDOWN_SECS,
        }
    }
}

/// Signal raised when a phase runs out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// More combinations remain in the active round
    Combination,
    /// Round finished, or cooldown finished
    Round,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Expired,
}

/// Where playback is. The round itself may be missing if the number is
/// out of range; the timer still counts but shows nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerPosition {
    pub phase: Phase,
    pub round_number: u32,
    pub round: Option<WorkoutRound>,
    pub combination_index: usize,
}

impl TimerPosition {
    pub fn new(phase: Phase, round_number: u32, rounds: &[WorkoutRound], combination_index: usize) -> Self {
        Self {
            phase,
            round_number,
            round: find_round(rounds, round_number).cloned(),
            combination_index,
        }
    }

    fn key(&self) -> (Phase, u32, usize) {
        (self.phase, self.round_number, self.combination_index)
    }

    fn has_next_combination(&self) -> bool {
        self.round
            .as_ref()
            .is_some_and(|r| self.combination_index + 1 < r.combinations.len())
    }
}

pub struct RoundTimer<B: Bell> {
    position: TimerPosition,
    time_left: u32,
    is_running: bool,
    /// One-second interval is armed
    ticking: bool,
    /// Completion already dispatched for this phase visit
    completion_handled: bool,
    bell: B,
}

impl<B: Bell> RoundTimer<B> {
    /// New timer at `position`. Runs the same reset as a position change,
    /// so a work phase opens with the start bell.
    pub fn new(position: TimerPosition, bell: B) -> Self {
        let mut timer = Self {
            time_left: position.phase.duration(),
            position,
            is_running: false,
            ticking: false,
            completion_handled: false,
            bell,
        };
        timer.force_reset();
        timer
    }

    /// Move to a new position. Any change of phase, round number or
    /// combination index resets the timer; it does not resume running.
    pub fn set_position(&mut self, position: TimerPosition) {
        let changed = position.key() != self.position.key();
        self.position = position;
        if changed {
            self.force_reset();
        }
    }

    fn force_reset(&mut self) {
        self.ticking = false;
        self.is_running = false;
        self.time_left = self.position.phase.duration();
        self.completion_handled = false;
        debug!(
            phase = ?self.position.phase,
            round = self.position.round_number,
            combination = self.position.combination_index,
            "Timer reset for new position"
        );
        if self.position.phase == Phase::Work {
            self.bell.ring(BellCue::RoundStart);
        }
    }

    /// Start/pause. From zero, restarts at full duration.
    pub fn toggle(&mut self) {
        if self.is_running {
            self.is_running = false;
            self.ticking = false;
            return;
        }
        if self.time_left == 0 {
            self.time_left = self.position.phase.duration();
            self.completion_handled = false;
        }
        self.is_running = true;
        self.ticking = true;
    }

    pub fn reset(&mut self) {
        self.ticking = false;
        self.is_running = false;
        self.time_left = self.position.phase.duration();
        self.completion_handled = false;
    }

    /// Advance one second
    pub fn tick(&mut self) -> Option<Completion> {
        if !self.ticking {
            return None;
        }
        if self.time_left <= 1 {
            return self.expire();
        }
        self.time_left -= 1;
        None
    }

    fn expire(&mut self) -> Option<Completion> {
        self.ticking = false;
        self.is_running = false;
        self.time_left = 0;

        if self.completion_handled {
            return None;
        }
        self.completion_handled = true;

        let completion = match self.position.phase {
            Phase::Cooldown => Completion::Round,
            Phase::Work => {
                self.bell.ring(BellCue::RoundEnd);
                if self.position.has_next_combination() {
                    Completion::Combination
                } else {
                    Completion::Round
                }
            }
        };
        debug!(?completion, round = self.position.round_number, "Phase expired");
        Some(completion)
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn state(&self) -> TimerState {
        if self.is_running {
            TimerState::Running
        } else if self.time_left == 0 {
            TimerState::Expired
        } else if self.time_left == self.position.phase.duration() {
            TimerState::Idle
        } else {
            TimerState::Paused
        }
    }

    pub fn position(&self) -> &TimerPosition {
        &self.position
    }

    /// Combination to display; nothing during cooldown
    pub fn current_combination(&self) -> Option<&Combination> {
        if self.position.phase == Phase::Cooldown {
            return None;
        }
        self.position
            .round
            .as_ref()
            .and_then(|r| r.combinations.get(self.position.combination_index))
    }

    pub fn bell(&self) -> &B {
        &self.bell
    }
}

/// `MM:SS`
pub fn format_time(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
