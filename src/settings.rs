//! Game settings and tuning
//!
//! Supplied by the host page as JSON. Nothing here is persisted by the crate.

use serde::{Deserialize, Serialize};

/// Simulation and timing constants.
///
/// These were tuned by feel against a 60 Hz display; the force values are in
/// pixels per 60 Hz frame and are scaled by the real frame time each tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Physics ===
    /// Rope pixels gained per pixel of pointer travel along the pull axis
    pub drag_gain: f32,
    /// Lower clamp for a single tick (ms)
    pub min_tick_ms: f32,
    /// Upper clamp for a single tick (ms), absorbs frame hitches
    pub max_tick_ms: f32,
    /// Round length before it is declared a draw (ms of simulated time)
    pub round_time_cap_ms: f32,

    // === Opponent ===
    /// Opponent pull per round (px per 60 Hz frame), round 1 first
    pub ai_base_force: [f32; 3],
    /// Applied once the human has taken at least one round
    pub comeback_multiplier: f32,
    /// Applied while the human is close to winning the round
    pub proximity_multiplier: f32,
    /// Normalized progress at which the proximity multiplier kicks in
    pub proximity_threshold: f32,

    // === Geometry ===
    /// Viewports narrower than this play on the vertical axis
    pub narrow_breakpoint: f32,
    /// Goal distance from the centre as a fraction of the axis extent
    pub goal_fraction: f32,
    /// Half the drawn rope length as a fraction of the axis extent
    pub rope_fraction: f32,

    // === Timing ===
    /// Gap between countdown beats (ms)
    pub countdown_beat_ms: f64,
    /// Pause between the "go" beat and live play (ms)
    pub countdown_settle_ms: f64,
    /// Pause after a won round (ms)
    pub win_pause_ms: f64,
    /// Pause after a drawn round before it is replayed (ms)
    pub draw_pause_ms: f64,
    /// Game-over line reveal offsets, each relative to the previous line (ms)
    pub reveal_offsets_ms: [f64; 3],
    /// Minimum simulated time between strain creaks (ms)
    pub strain_interval_ms: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            drag_gain: 0.15,
            min_tick_ms: 8.0,
            max_tick_ms: 50.0,
            round_time_cap_ms: 12_000.0,

            ai_base_force: [0.12, 0.16, 0.20],
            comeback_multiplier: 1.35,
            proximity_multiplier: 1.5,
            proximity_threshold: 0.6,

            narrow_breakpoint: 768.0,
            goal_fraction: 0.30,
            rope_fraction: 0.42,

            countdown_beat_ms: 800.0,
            countdown_settle_ms: 400.0,
            win_pause_ms: 1500.0,
            draw_pause_ms: 1000.0,
            reveal_offsets_ms: [0.0, 1500.0, 1000.0],
            strain_interval_ms: 350.0,
        }
    }
}

impl Tuning {
    /// Clamp every value into a range the simulation can run with
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();

        self.drag_gain = finite_or(self.drag_gain, defaults.drag_gain).max(0.0);
        self.min_tick_ms = finite_or(self.min_tick_ms, defaults.min_tick_ms).max(1.0);
        self.max_tick_ms = finite_or(self.max_tick_ms, defaults.max_tick_ms).max(self.min_tick_ms);
        self.round_time_cap_ms =
            finite_or(self.round_time_cap_ms, defaults.round_time_cap_ms).max(1000.0);

        for (force, default) in self.ai_base_force.iter_mut().zip(defaults.ai_base_force) {
            *force = finite_or(*force, default).max(0.0);
        }
        // Multipliers below 1 would turn the rubber band around
        self.comeback_multiplier =
            finite_or(self.comeback_multiplier, defaults.comeback_multiplier).max(1.0);
        self.proximity_multiplier =
            finite_or(self.proximity_multiplier, defaults.proximity_multiplier).max(1.0);
        self.proximity_threshold =
            finite_or(self.proximity_threshold, defaults.proximity_threshold).clamp(0.5, 1.0);

        self.narrow_breakpoint = finite_or(self.narrow_breakpoint, defaults.narrow_breakpoint).max(0.0);
        self.goal_fraction = finite_or(self.goal_fraction, defaults.goal_fraction).clamp(0.05, 0.5);
        self.rope_fraction = finite_or(self.rope_fraction, defaults.rope_fraction).clamp(0.05, 0.5);

        self.countdown_beat_ms = finite_or64(self.countdown_beat_ms, defaults.countdown_beat_ms).max(0.0);
        self.countdown_settle_ms =
            finite_or64(self.countdown_settle_ms, defaults.countdown_settle_ms).max(0.0);
        self.win_pause_ms = finite_or64(self.win_pause_ms, defaults.win_pause_ms).max(0.0);
        self.draw_pause_ms = finite_or64(self.draw_pause_ms, defaults.draw_pause_ms).max(0.0);
        for (offset, default) in self.reveal_offsets_ms.iter_mut().zip(defaults.reveal_offsets_ms) {
            *offset = finite_or64(*offset, default).max(0.0);
        }
        self.strain_interval_ms =
            finite_or(self.strain_interval_ms, defaults.strain_interval_ms).max(0.0);

        self
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

fn finite_or64(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

/// Host-supplied settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Simulation constants
    pub tuning: Tuning,

    // === Audio ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Mute all tones
    pub muted: bool,

    // === Haptics ===
    /// Allow vibration pulses
    pub vibration: bool,

    // === Accessibility ===
    /// Reduced motion (no full-screen flashes)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tuning: Tuning::default(),
            master_volume: 0.8,
            muted: false,
            vibration: true,
            reduced_motion: false,
        }
    }
}

impl Settings {
    /// Parse settings JSON; missing keys fall back to defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Settings>(json).map(Settings::sanitized)
    }

    /// Parse settings if given, logging and falling back to defaults on error
    pub fn from_json_or_default(json: Option<&str>) -> Self {
        let Some(json) = json.filter(|s| !s.trim().is_empty()) else {
            log::info!("Using default settings");
            return Self::default();
        };

        match Self::from_json(json) {
            Ok(settings) => {
                log::info!("Loaded settings from host");
                settings
            }
            Err(e) => {
                log::warn!("Settings parse error ({e}), using defaults");
                Self::default()
            }
        }
    }

    /// Clamp preferences and tuning into usable ranges
    pub fn sanitized(mut self) -> Self {
        self.tuning = self.tuning.sanitized();
        self.master_volume = if self.master_volume.is_finite() {
            self.master_volume.clamp(0.0, 1.0)
        } else {
            Self::default().master_volume
        };
        self
    }

    /// Effective tone volume (0 when muted)
    pub fn effective_volume(&self) -> f32 {
        if self.muted { 0.0 } else { self.master_volume }
    }

    /// Whether tones should be produced at all
    pub fn effective_audio(&self) -> bool {
        self.effective_volume() > 0.0
    }

    /// Effective screen flash (respects reduced_motion)
    pub fn effective_flash(&self) -> bool {
        !self.reduced_motion
    }

    /// Whether vibration pulses should be sent
    pub fn effective_vibration(&self) -> bool {
        self.vibration
    }
}
