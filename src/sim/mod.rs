//! Rope simulation module
//!
//! All gameplay math lives here. This module has no platform dependencies:
//! - Frame time is clamped before use
//! - Geometry is derived, never stored across resizes
//! - Score only changes through the round latch

pub mod autopilot;
pub mod geometry;
pub mod opponent;
pub mod state;
pub mod tick;

pub use autopilot::{Autopilot, Gesture};
pub use geometry::{GeometrySnapshot, Orientation, Viewport, normalized_progress};
pub use opponent::{ai_force, base_force};
pub use state::{Beat, DragSession, GameEvent, GamePhase, MatchState, Round, RoundOutcome, Side};
pub use tick::{TickOutcome, clamp_dt, tick};
