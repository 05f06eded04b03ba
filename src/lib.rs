//! Tug of War - a best-of-three rope contest against a scripted opponent
//!
//! Core modules:
//! - `sim`: Rope simulation (geometry, physics tick, opponent force, match data)
//! - `game`: Match state machine driving phases, timers and feedback
//! - `scheduler`: Frame loop and deferred one-shot timers
//! - `feedback`: Tones, vibration and flashes derived from game events
//! - `settings`: Tunable constants and player preferences
//! - `web`: Browser host (wasm32 only)

#[cfg(target_arch = "wasm32")]
pub mod audio;
pub mod feedback;
pub mod game;
pub mod scheduler;
pub mod settings;
pub mod sim;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use feedback::{FeedbackEvent, FeedbackOutput};
pub use game::{Callbacks, Game, RenderSnapshot, Teardown};
pub use settings::{Settings, Tuning};

/// Fixed game constants (everything tunable lives in [`Tuning`])
pub mod consts {
    /// Nominal frame duration the force constants are expressed in (60 Hz)
    pub const FRAME_MS: f32 = 1000.0 / 60.0;
    /// Round wins needed to take the match
    pub const WINS_TO_TAKE_MATCH: u8 = 2;
    /// Last round of a best-of-three
    pub const MAX_ROUNDS: u8 = 3;
    /// Goal span below which the geometry is considered degenerate
    pub const MIN_GOAL_SPAN: f32 = 1e-3;
    /// Progress reported for a tied rope (and for degenerate geometry)
    pub const TIED_PROGRESS: f32 = 0.5;
    /// Number of lines revealed on the game-over screen
    pub const REVEAL_LINES: usize = 3;
}

/// Convert a tick duration in milliseconds to 60 Hz frame multiples
#[inline]
pub fn frames_from_ms(dt_ms: f32) -> f32 {
    dt_ms / consts::FRAME_MS
}
