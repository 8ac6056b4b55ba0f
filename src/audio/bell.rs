//! Bell signaler - round start/end cue bursts
//!
//! Each repetition is its own task, so a new strike never cuts off the
//! previous one. Requests made before the sound is ready wait for it.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Gap between repetitions in a burst
pub const BELL_SPACING: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BellCue {
    RoundStart,
    RoundEnd,
}

impl BellCue {
    pub fn repetitions(&self) -> usize {
        match self {
            BellCue::RoundStart => 5,
            BellCue::RoundEnd => 3,
        }
    }
}

/// Anything the round timer can ring
pub trait Bell {
    fn ring(&self, cue: BellCue);
}

/// Plays one strike of the bell sound
pub trait SoundSink: Send + Sync + 'static {
    fn play(&self);
}

/// Terminal bell on stderr
pub struct TerminalBell;

impl SoundSink for TerminalBell {
    fn play(&self) {
        let mut err = std::io::stderr();
        if let Err(e) = err.write_all(b"\x07").and_then(|_| err.flush()) {
            warn!("Failed to ring terminal bell: {}", e);
        }
    }
}

/// Sink for muted sessions
pub struct Silent;

impl SoundSink for Silent {
    fn play(&self) {}
}

/// Session-scoped bell service with an explicit ready state
#[derive(Clone)]
pub struct BellSignaler {
    sink: Arc<dyn SoundSink>,
    ready_tx: Arc<watch::Sender<bool>>,
    ready_rx: watch::Receiver<bool>,
    runtime: Handle,
}

impl BellSignaler {
    pub fn new(sink: Arc<dyn SoundSink>, runtime: Handle) -> Self {
        let (ready_tx, ready_rx) = watch::channel(false);
        Self {
            sink,
            ready_tx: Arc::new(ready_tx),
            ready_rx,
            runtime,
        }
    }

    /// Sound resource finished loading; releases waiting bursts
    pub fn mark_ready(&self) {
        self.ready_tx.send_replace(true);
    }

    pub fn is_ready(&self) -> bool {
        *self.ready_rx.borrow()
    }

    /// Schedule `count` strikes, `BELL_SPACING` apart, once ready.
    /// The returned handle completes after the last strike.
    pub fn play_sequence(&self, count: usize) -> JoinHandle<()> {
        let sink = self.sink.clone();
        let mut ready = self.ready_rx.clone();
        let runtime = self.runtime.clone();

        self.runtime.spawn(async move {
            if ready.wait_for(|r| *r).await.is_err() {
                debug!("Bell dropped before it was ready");
                return;
            }

            let strikes: Vec<JoinHandle<()>> = (0..count)
                .map(|i| {
                    let sink = sink.clone();
                    runtime.spawn(async move {
                        tokio::time::sleep(BELL_SPACING * i as u32).await;
                        sink.play();
                    })
                })
                .collect();

            for strike in strikes {
                let _ = strike.await;
            }
        })
    }
}

impl Bell for BellSignaler {
    fn ring(&self, cue: BellCue) {
        debug!(?cue, "Ringing bell");
        let _ = self.play_sequence(cue.repetitions());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[derive(Default)]
    struct RecordingSink {
        strikes: Mutex<Vec<Instant>>,
    }

    impl SoundSink for RecordingSink {
        fn play(&self) {
            self.strikes.lock().unwrap().push(Instant::now());
        }
    }

    fn signaler() -> (BellSignaler, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let bell = BellSignaler::new(sink.clone(), Handle::current());
        (bell, sink)
    }

    #[test]
    fn test_cue_repetitions() {
        assert_eq!(BellCue::RoundStart.repetitions(), 5);
        assert_eq!(BellCue::RoundEnd.repetitions(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_burst_spacing() {
        let (bell, sink) = signaler();
        bell.mark_ready();
        let begin = Instant::now();

        bell.play_sequence(BellCue::RoundStart.repetitions()).await.unwrap();

        let strikes = sink.strikes.lock().unwrap();
        assert_eq!(strikes.len(), 5);
        for (i, at) in strikes.iter().enumerate() {
            assert_eq!(*at - begin, BELL_SPACING * i as u32);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_ready() {
        let (bell, sink) = signaler();
        let burst = bell.play_sequence(3);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(sink.strikes.lock().unwrap().is_empty());
        assert!(!bell.is_ready());

        bell.mark_ready();
        burst.await.unwrap();
        assert_eq!(sink.strikes.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bursts_overlap() {
        let (bell, sink) = signaler();
        bell.mark_ready();

        let first = bell.play_sequence(3);
        tokio::time::sleep(Duration::from_millis(250)).await;
        let second = bell.play_sequence(3);

        first.await.unwrap();
        second.await.unwrap();
        assert_eq!(sink.strikes.lock().unwrap().len(), 6);
    }
}
