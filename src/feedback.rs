//! Feedback cues: tones, vibration and screen flashes
//!
//! Maps game events to short procedural cues. This layer is write-only with
//! respect to the simulation: it reads the event and the settings, nothing
//! else, and every output method silently no-ops when the device can't do it.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::settings::Settings;
use crate::sim::{Beat, GameEvent, Side};

/// Flash colour for a lost round
pub const LOSE_FLASH_COLOR: &str = "#d64545";

/// Oscillator shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

/// One synthesized note with an exponential decay envelope
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tone {
    pub waveform: Waveform,
    pub start_hz: f32,
    /// Pitch glide target (equal to `start_hz` for a steady note)
    pub end_hz: f32,
    pub duration_s: f32,
    /// Peak gain before master volume
    pub gain: f32,
    /// Start offset from now
    pub delay_s: f32,
}

impl Tone {
    fn note(waveform: Waveform, hz: f32, duration_s: f32, gain: f32) -> Self {
        Self {
            waveform,
            start_hz: hz,
            end_hz: hz,
            duration_s,
            gain,
            delay_s: 0.0,
        }
    }

    fn glide_to(mut self, hz: f32) -> Self {
        self.end_hz = hz;
        self
    }

    fn after(mut self, delay_s: f32) -> Self {
        self.delay_s = delay_s;
        self
    }
}

/// Full-screen colour flash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flash {
    pub color: String,
    pub duration_ms: u32,
}

/// A single cue, consumed as soon as it is emitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeedbackEvent {
    Tone(Tone),
    /// Alternating on/off durations in ms
    Vibrate(Vec<u32>),
    Flash(Flash),
}

/// Device side of the feedback layer
pub trait FeedbackOutput {
    /// Create the audio subsystem (called from a user gesture). Returns
    /// whether audio is available.
    fn init_audio(&mut self) -> bool;
    fn play_tone(&mut self, tone: &Tone);
    fn vibrate(&mut self, pattern: &[u32]);
    fn flash(&mut self, flash: &Flash);
    /// Release audio and any other device handles
    fn shutdown(&mut self);
}

/// Everything a [`RecordingOutput`] saw
#[derive(Debug, Default, Clone)]
pub struct FeedbackLog {
    pub cues: Vec<FeedbackEvent>,
    pub audio_inits: u32,
    pub shutdowns: u32,
}

impl FeedbackLog {
    pub fn tones(&self) -> usize {
        self.cues.iter().filter(|c| matches!(c, FeedbackEvent::Tone(_))).count()
    }

    pub fn flashes(&self) -> Vec<&Flash> {
        self.cues
            .iter()
            .filter_map(|c| match c {
                FeedbackEvent::Flash(f) => Some(f),
                _ => None,
            })
            .collect()
    }
}

/// Output that records cues into a shared log (tests, headless runs)
#[derive(Debug, Clone, Default)]
pub struct RecordingOutput {
    log: Rc<RefCell<FeedbackLog>>,
    audio_available: bool,
}

impl RecordingOutput {
    pub fn new(audio_available: bool) -> (Self, Rc<RefCell<FeedbackLog>>) {
        let log = Rc::new(RefCell::new(FeedbackLog::default()));
        (
            Self {
                log: log.clone(),
                audio_available,
            },
            log,
        )
    }
}

impl FeedbackOutput for RecordingOutput {
    fn init_audio(&mut self) -> bool {
        self.log.borrow_mut().audio_inits += 1;
        self.audio_available
    }

    fn play_tone(&mut self, tone: &Tone) {
        if self.audio_available {
            self.log.borrow_mut().cues.push(FeedbackEvent::Tone(*tone));
        }
    }

    fn vibrate(&mut self, pattern: &[u32]) {
        self.log.borrow_mut().cues.push(FeedbackEvent::Vibrate(pattern.to_vec()));
    }

    fn flash(&mut self, flash: &Flash) {
        self.log.borrow_mut().cues.push(FeedbackEvent::Flash(flash.clone()));
    }

    fn shutdown(&mut self) {
        self.log.borrow_mut().shutdowns += 1;
    }
}

/// Cues for a game event, filtered by the player's settings
pub fn cues_for(event: &GameEvent, settings: &Settings, theme: &str) -> Vec<FeedbackEvent> {
    let (tones, vibration, flash) = raw_cues(event, theme);
    let mut cues = Vec::new();

    let volume = settings.effective_volume();
    if settings.effective_audio() {
        cues.extend(tones.into_iter().map(|mut tone| {
            tone.gain *= volume;
            FeedbackEvent::Tone(tone)
        }));
    }
    if settings.effective_vibration() && !vibration.is_empty() {
        cues.push(FeedbackEvent::Vibrate(vibration));
    }
    if settings.effective_flash() {
        if let Some(flash) = flash {
            cues.push(FeedbackEvent::Flash(flash));
        }
    }
    cues
}

/// Hand cues to the device
pub fn dispatch(output: &mut dyn FeedbackOutput, cues: &[FeedbackEvent]) {
    for cue in cues {
        match cue {
            FeedbackEvent::Tone(tone) => output.play_tone(tone),
            FeedbackEvent::Vibrate(pattern) => output.vibrate(pattern),
            FeedbackEvent::Flash(flash) => output.flash(flash),
        }
    }
}

fn raw_cues(event: &GameEvent, theme: &str) -> (Vec<Tone>, Vec<u32>, Option<Flash>) {
    use Waveform::*;

    match event {
        GameEvent::Started => (vec![Tone::note(Triangle, 520.0, 0.12, 0.3)], vec![], None),
        GameEvent::CountdownBeat(Beat::Go) => {
            (vec![Tone::note(Square, 880.0, 0.2, 0.25)], vec![60], None)
        }
        GameEvent::CountdownBeat(_) => (vec![Tone::note(Sine, 440.0, 0.1, 0.3)], vec![30], None),
        GameEvent::RoundStarted { .. } => (vec![], vec![], None),
        // Rope creak - low and short so it can repeat
        GameEvent::Strain => (
            vec![Tone::note(Sawtooth, 90.0, 0.08, 0.12).glide_to(70.0)],
            vec![12],
            None,
        ),
        GameEvent::RoundWon { winner: Side::Human, .. } => (
            [523.0, 659.0, 784.0]
                .iter()
                .enumerate()
                .map(|(i, hz)| Tone::note(Triangle, *hz, 0.18, 0.3).after(i as f32 * 0.09))
                .collect(),
            vec![80, 40, 80],
            Some(Flash {
                color: theme.to_string(),
                duration_ms: 300,
            }),
        ),
        GameEvent::RoundWon { winner: Side::Ai, .. } => (
            [392.0, 330.0, 262.0]
                .iter()
                .enumerate()
                .map(|(i, hz)| Tone::note(Sine, *hz, 0.2, 0.3).after(i as f32 * 0.12))
                .collect(),
            vec![200],
            Some(Flash {
                color: LOSE_FLASH_COLOR.to_string(),
                duration_ms: 300,
            }),
        ),
        GameEvent::RoundDrawn { .. } => (vec![Tone::note(Triangle, 300.0, 0.25, 0.25)], vec![], None),
        GameEvent::MatchOver { winner, .. } => {
            let notes: &[f32] = match winner {
                Side::Human => &[523.0, 659.0, 784.0, 1047.0],
                Side::Ai => &[400.0, 350.0, 300.0, 200.0],
            };
            let tones = notes
                .iter()
                .enumerate()
                .map(|(i, hz)| Tone::note(Triangle, *hz, 0.3, 0.3).after(i as f32 * 0.15))
                .collect();
            (tones, vec![100, 50, 100, 50, 200], None)
        }
        GameEvent::RevealLine { .. } => (vec![Tone::note(Sine, 660.0, 0.06, 0.15)], vec![], None),
    }
}
