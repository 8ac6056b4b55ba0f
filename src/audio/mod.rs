//! Audio cues - bell bursts and spoken combinations

pub mod bell;
pub mod narrator;

pub use bell::{Bell, BellCue, BellSignaler, Silent, SoundSink, TerminalBell};
pub use narrator::{
    EspeakEngine, MutedEngine, NarrationContext, Narrator, SpeechEngine, Utterance, Voice,
    VoicePreference,
};
