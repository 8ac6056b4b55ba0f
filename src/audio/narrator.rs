//! Narrator - speaks the active combination once per visit

use std::collections::HashSet;
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;

use tracing::{debug, info, warn};

use crate::moves::MoveCatalog;
use crate::workout::Combination;

/// Separator between move names; the comma gives the voice a pause
pub const MOVE_SEPARATOR: &str = ", ";
/// Slightly slower than normal for clarity
pub const SPEECH_RATE: f32 = 0.9;
pub const SPEECH_PITCH: f32 = 1.0;

/// espeak's default words-per-minute at rate 1.0
const ESPEAK_BASE_WPM: f32 = 175.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    pub lang: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub voice: Option<Voice>,
    pub rate: f32,
    pub pitch: f32,
}

/// Platform speech backend
pub trait SpeechEngine {
    /// Voices currently available; may be empty until the backend loads
    fn voices(&self) -> Vec<Voice>;
    /// Stop whatever is being spoken
    fn cancel(&self);
    fn speak(&self, utterance: &Utterance);
}

impl<T: SpeechEngine + ?Sized> SpeechEngine for Box<T> {
    fn voices(&self) -> Vec<Voice> {
        (**self).voices()
    }

    fn cancel(&self) {
        (**self).cancel()
    }

    fn speak(&self, utterance: &Utterance) {
        (**self).speak(utterance)
    }
}

/// Preferred accent and voice name
#[derive(Debug, Clone)]
pub struct VoicePreference {
    pub lang: String,
    pub name: String,
}

impl Default for VoicePreference {
    fn default() -> Self {
        Self {
            lang: "en-GB".to_string(),
            name: "arthur".to_string(),
        }
    }
}

/// Preferred accent + name, then preferred accent, then first voice
pub fn select_voice(voices: &[Voice], pref: &VoicePreference) -> Option<Voice> {
    let lang = pref.lang.to_lowercase();
    let name = pref.name.to_lowercase();
    let has_lang = |v: &&Voice| v.lang.to_lowercase().starts_with(&lang);

    voices
        .iter()
        .filter(has_lang)
        .find(|v| v.name.to_lowercase().contains(&name))
        .or_else(|| voices.iter().find(has_lang))
        .or_else(|| voices.first())
        .cloned()
}

/// What the orchestrator is showing right now
#[derive(Debug, Clone, Copy)]
pub struct NarrationContext<'a> {
    pub active: bool,
    pub cooldown: bool,
    pub editing: bool,
    pub round_number: u32,
    pub combination_index: usize,
    pub combination: Option<&'a Combination>,
}

pub struct Narrator<S: SpeechEngine> {
    engine: S,
    preference: VoicePreference,
    voice: Option<Voice>,
    spoken: HashSet<(u32, usize)>,
}

impl<S: SpeechEngine> Narrator<S> {
    pub fn new(engine: S, preference: VoicePreference) -> Self {
        let mut narrator = Self {
            engine,
            preference,
            voice: None,
            spoken: HashSet::new(),
        };
        narrator.refresh_voices();
        narrator
    }

    /// Re-run voice selection; call again whenever the voice list changes
    pub fn refresh_voices(&mut self) -> bool {
        let voices = self.engine.voices();
        if let Some(voice) = select_voice(&voices, &self.preference) {
            if self.voice.as_ref() != Some(&voice) {
                info!("Narrator voice: {} ({})", voice.name, voice.lang);
            }
            self.voice = Some(voice);
        }
        self.is_ready()
    }

    pub fn is_ready(&self) -> bool {
        self.voice.is_some()
    }

    pub fn voice(&self) -> Option<&Voice> {
        self.voice.as_ref()
    }

    /// Announce the combination unless suppressed or already spoken at
    /// this position. Returns true if something was spoken.
    pub fn narrate(&mut self, ctx: &NarrationContext, catalog: &MoveCatalog) -> bool {
        if !ctx.active || ctx.cooldown || ctx.editing || !self.is_ready() {
            return false;
        }
        let Some(combination) = ctx.combination else {
            return false;
        };

        let key = (ctx.round_number, ctx.combination_index);
        if self.spoken.contains(&key) {
            return false;
        }

        let names: Vec<&str> = combination
            .moves
            .iter()
            .filter_map(|id| catalog.get(id).map(|m| m.name.as_str()))
            .filter(|name| !name.is_empty())
            .collect();
        if names.is_empty() {
            return false;
        }

        self.engine.cancel();
        let utterance = Utterance {
            text: names.join(MOVE_SEPARATOR),
            voice: self.voice.clone(),
            rate: SPEECH_RATE,
            pitch: SPEECH_PITCH,
        };
        debug!(round = key.0, combination = key.1, text = %utterance.text, "Narrating");
        self.engine.speak(&utterance);
        self.spoken.insert(key);
        true
    }

    /// Allow this position to be announced again
    pub fn forget(&mut self, round_number: u32, combination_index: usize) {
        self.spoken.remove(&(round_number, combination_index));
    }

    /// New playback session
    pub fn clear(&mut self) {
        self.spoken.clear();
    }
}

/// espeak subprocess backend, one child per utterance
#[derive(Default)]
pub struct EspeakEngine {
    child: Mutex<Option<Child>>,
}

impl EspeakEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Parse `espeak --voices` output:
/// `Pty Language Age/Gender VoiceName File Other Languages`
fn parse_espeak_voices(output: &str) -> Vec<Voice> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            match cols.as_slice() {
                [_, lang, _, name, ..] => Some(Voice {
                    name: name.to_string(),
                    lang: lang.to_string(),
                }),
                _ => None,
            }
        })
        .collect()
}

impl SpeechEngine for EspeakEngine {
    fn voices(&self) -> Vec<Voice> {
        match Command::new("espeak").arg("--voices").output() {
            Ok(out) if out.status.success() => {
                parse_espeak_voices(&String::from_utf8_lossy(&out.stdout))
            }
            Ok(out) => {
                warn!("espeak --voices exited with {}", out.status);
                Vec::new()
            }
            Err(e) => {
                warn!("espeak unavailable, narration disabled: {}", e);
                Vec::new()
            }
        }
    }

    fn cancel(&self) {
        if let Ok(mut guard) = self.child.lock()
            && let Some(mut child) = guard.take()
        {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    fn speak(&self, utterance: &Utterance) {
        let mut cmd = Command::new("espeak");
        if let Some(voice) = &utterance.voice {
            cmd.arg("-v").arg(&voice.lang);
        }
        let wpm = (ESPEAK_BASE_WPM * utterance.rate).round() as u32;
        let pitch = (50.0 * utterance.pitch).round() as u32;
        cmd.arg("-s")
            .arg(wpm.to_string())
            .arg("-p")
            .arg(pitch.to_string())
            .arg(&utterance.text)
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        match cmd.spawn() {
            Ok(child) => {
                if let Ok(mut guard) = self.child.lock() {
                    *guard = Some(child);
                }
            }
            Err(e) => warn!("Failed to start espeak: {}", e),
        }
    }
}

/// Engine with no voices; narration never becomes ready
pub struct MutedEngine;

impl SpeechEngine for MutedEngine {
    fn voices(&self) -> Vec<Voice> {
        Vec::new()
    }

    fn cancel(&self) {}

    fn speak(&self, _utterance: &Utterance) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Cancel,
        Speak(String),
    }

    #[derive(Clone, Default)]
    struct FakeEngine {
        voices: Rc<RefCell<Vec<Voice>>>,
        calls: Rc<RefCell<Vec<Call>>>,
    }

    impl SpeechEngine for FakeEngine {
        fn voices(&self) -> Vec<Voice> {
            self.voices.borrow().clone()
        }

        fn cancel(&self) {
            self.calls.borrow_mut().push(Call::Cancel);
        }

        fn speak(&self, utterance: &Utterance) {
            self.calls.borrow_mut().push(Call::Speak(utterance.text.clone()));
        }
    }

    fn voice(name: &str, lang: &str) -> Voice {
        Voice {
            name: name.to_string(),
            lang: lang.to_string(),
        }
    }

    fn ready_engine() -> FakeEngine {
        let engine = FakeEngine::default();
        engine.voices.borrow_mut().push(voice("Daniel", "en-GB"));
        engine
    }

    fn spoken(engine: &FakeEngine) -> Vec<String> {
        engine
            .calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Speak(text) => Some(text.clone()),
                Call::Cancel => None,
            })
            .collect()
    }

    fn ctx<'a>(combo: &'a Combination, round: u32, index: usize) -> NarrationContext<'a> {
        NarrationContext {
            active: true,
            cooldown: false,
            editing: false,
            round_number: round,
            combination_index: index,
            combination: Some(combo),
        }
    }

    fn one_two() -> Combination {
        Combination::new("One-Two", vec!["Left Jab".into(), "Right Cross".into()])
    }

    #[test]
    fn test_select_voice_preference_order() {
        let pref = VoicePreference::default();
        let voices = vec![
            voice("Samantha", "en-US"),
            voice("Daniel", "en-GB"),
            voice("Arthur", "en-GB"),
        ];
        assert_eq!(select_voice(&voices, &pref).unwrap().name, "Arthur");

        let voices = vec![voice("Samantha", "en-US"), voice("Daniel", "en-GB")];
        assert_eq!(select_voice(&voices, &pref).unwrap().name, "Daniel");

        let voices = vec![voice("Samantha", "en-US"), voice("Alex", "en-US")];
        assert_eq!(select_voice(&voices, &pref).unwrap().name, "Samantha");

        assert!(select_voice(&[], &pref).is_none());
    }

    #[test]
    fn test_select_voice_ignores_name_outside_accent() {
        let pref = VoicePreference::default();
        let voices = vec![voice("Arthur", "en-US"), voice("Daniel", "en-GB")];
        assert_eq!(select_voice(&voices, &pref).unwrap().name, "Daniel");
    }

    #[test]
    fn test_narrates_moves_joined() {
        let engine = ready_engine();
        let mut narrator = Narrator::new(engine.clone(), VoicePreference::default());
        let catalog = MoveCatalog::defaults();
        let combo = one_two();

        assert!(narrator.narrate(&ctx(&combo, 1, 0), &catalog));
        assert_eq!(spoken(&engine), vec!["Left Jab, Right Cross"]);
    }

    #[test]
    fn test_same_position_spoken_once() {
        let engine = ready_engine();
        let mut narrator = Narrator::new(engine.clone(), VoicePreference::default());
        let catalog = MoveCatalog::defaults();
        let combo = one_two();

        assert!(narrator.narrate(&ctx(&combo, 1, 0), &catalog));
        assert!(!narrator.narrate(&ctx(&combo, 1, 0), &catalog));
        assert!(narrator.narrate(&ctx(&combo, 1, 1), &catalog));
        assert_eq!(spoken(&engine).len(), 2);
    }

    #[test]
    fn test_forget_allows_repeat() {
        let engine = ready_engine();
        let mut narrator = Narrator::new(engine.clone(), VoicePreference::default());
        let catalog = MoveCatalog::defaults();
        let combo = one_two();

        narrator.narrate(&ctx(&combo, 2, 1), &catalog);
        narrator.forget(2, 1);
        assert!(narrator.narrate(&ctx(&combo, 2, 1), &catalog));
    }

    #[test]
    fn test_cancels_before_speaking() {
        let engine = ready_engine();
        let mut narrator = Narrator::new(engine.clone(), VoicePreference::default());
        let catalog = MoveCatalog::defaults();
        let combo = one_two();

        narrator.narrate(&ctx(&combo, 1, 0), &catalog);
        narrator.narrate(&ctx(&combo, 1, 1), &catalog);
        let calls = engine.calls.borrow();
        assert_eq!(calls[0], Call::Cancel);
        assert!(matches!(calls[1], Call::Speak(_)));
        assert_eq!(calls[2], Call::Cancel);
    }

    #[test]
    fn test_suppressed_states() {
        let engine = ready_engine();
        let mut narrator = Narrator::new(engine.clone(), VoicePreference::default());
        let catalog = MoveCatalog::defaults();
        let combo = one_two();

        let mut c = ctx(&combo, 1, 0);
        c.editing = true;
        assert!(!narrator.narrate(&c, &catalog));

        let mut c = ctx(&combo, 1, 0);
        c.cooldown = true;
        assert!(!narrator.narrate(&c, &catalog));

        let mut c = ctx(&combo, 1, 0);
        c.active = false;
        assert!(!narrator.narrate(&c, &catalog));

        assert!(spoken(&engine).is_empty());
        // Suppression does not consume the position
        assert!(narrator.narrate(&ctx(&combo, 1, 0), &catalog));
    }

    #[test]
    fn test_waits_for_voices() {
        let engine = FakeEngine::default();
        let mut narrator = Narrator::new(engine.clone(), VoicePreference::default());
        let catalog = MoveCatalog::defaults();
        let combo = one_two();

        assert!(!narrator.is_ready());
        assert!(!narrator.narrate(&ctx(&combo, 1, 0), &catalog));

        engine.voices.borrow_mut().push(voice("Arthur", "en-GB"));
        assert!(narrator.refresh_voices());
        assert_eq!(narrator.voice().unwrap().name, "Arthur");
        assert!(narrator.narrate(&ctx(&combo, 1, 0), &catalog));
    }

    #[test]
    fn test_missing_moves_skipped() {
        let engine = ready_engine();
        let mut narrator = Narrator::new(engine.clone(), VoicePreference::default());
        let catalog = MoveCatalog::defaults();

        let combo = Combination::new("x", vec!["ghost".into(), "Left Hook".into()]);
        assert!(narrator.narrate(&ctx(&combo, 1, 0), &catalog));
        assert_eq!(spoken(&engine), vec!["Left Hook"]);

        let empty = Combination::new("y", vec!["ghost".into()]);
        assert!(!narrator.narrate(&ctx(&empty, 1, 1), &catalog));
        // Nothing spoken, so the position stays open
        assert!(!narrator.spoken.contains(&(1, 1)));
    }

    #[test]
    fn test_parse_espeak_voices() {
        let out = "Pty Language       Age/Gender VoiceName          File                 Other Languages\n \
                    5  af              --/M      Afrikaans          gmw/af\n \
                    5  en-gb           --/M      English_(Great_Britain) gmw/en  (en 2)\n";
        let voices = parse_espeak_voices(out);
        assert_eq!(voices.len(), 2);
        assert_eq!(voices[1].lang, "en-gb");
        assert_eq!(voices[1].name, "English_(Great_Britain)");
    }
}
