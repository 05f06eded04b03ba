//! Per-frame rope integration
//!
//! Advances the rope by one animation frame: human drag, then opponent pull,
//! then win/draw evaluation. Only runs while the match is `Playing` and the
//! round is unresolved.

use super::geometry::GeometrySnapshot;
use super::opponent::ai_force;
use super::state::{DragSession, GameEvent, GamePhase, MatchState, RoundOutcome};
use crate::frames_from_ms;
use crate::settings::Tuning;

/// Result of a single tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    /// Set only on the tick that resolved the round
    pub resolved: Option<RoundOutcome>,
    /// Simulation events raised this tick
    pub events: Vec<GameEvent>,
}

/// Clamp a raw frame duration so a stall never applies a huge impulse
pub fn clamp_dt(dt_ms: f32, tuning: &Tuning) -> f32 {
    if !dt_ms.is_finite() {
        return tuning.min_tick_ms;
    }
    dt_ms.clamp(tuning.min_tick_ms, tuning.max_tick_ms)
}

/// Advance the rope by one frame of `dt_ms` wall time
pub fn tick(
    state: &mut MatchState,
    drag: Option<&mut DragSession>,
    geometry: &mut GeometrySnapshot,
    dt_ms: f32,
    tuning: &Tuning,
) -> TickOutcome {
    let mut outcome = TickOutcome::default();

    if state.phase != GamePhase::Playing || state.round.is_resolved() {
        return outcome;
    }

    let dt = clamp_dt(dt_ms, tuning);
    let dt_frames = frames_from_ms(dt);

    // Human pull
    let mut pulled = 0.0;
    if let Some(drag) = drag {
        pulled = geometry.axis_delta(drag.take_delta());
        state.round.offset += pulled * tuning.drag_gain;
    }

    // Opponent pull, always toward its own goal
    let progress = geometry.progress_for(state.round.offset);
    let force = ai_force(state.round_number, state.human_score, progress, tuning);
    state.round.offset -= force * dt_frames;
    state.round.elapsed_ms += dt;

    *geometry = geometry.with_offset(state.round.offset);

    // Creak while the human pulls against resistance
    if pulled > 0.0 && force > 0.0 {
        let round = &mut state.round;
        let due = round
            .last_strain_ms
            .is_none_or(|t| round.elapsed_ms - t >= tuning.strain_interval_ms);
        if due {
            round.last_strain_ms = Some(round.elapsed_ms);
            outcome.events.push(GameEvent::Strain);
        }
    }

    let result = if let Some(side) = geometry.crossed(state.round.offset) {
        Some(RoundOutcome::Won(side))
    } else if state.round.elapsed_ms >= tuning.round_time_cap_ms {
        Some(RoundOutcome::Draw)
    } else {
        None
    };

    if let Some(result) = result {
        if state.resolve_round(result, geometry) {
            *geometry = geometry.with_offset(state.round.offset);
            log::debug!(
                "Round {} resolved: {:?} after {:.0} ms",
                state.round_number,
                result,
                state.round.elapsed_ms
            );
            outcome.resolved = Some(result);
        }
    }

    outcome
}
