//! Opponent pull model
//!
//! Base pull steps up each round. Two multipliers stack on top:
//! - comeback: the human already took a round
//! - proximity: the human is close to winning this round (rubber band)
//!
//! Nothing is cached; the force is recomputed from score and progress every tick.

use crate::settings::Tuning;

/// Base pull for a round (rounds past the table use the last step)
pub fn base_force(round: u8, tuning: &Tuning) -> f32 {
    let table = &tuning.ai_base_force;
    let idx = usize::from(round.max(1) - 1).min(table.len() - 1);
    table[idx]
}

/// Opponent pull in pixels per 60 Hz frame
pub fn ai_force(round: u8, human_score: u8, progress: f32, tuning: &Tuning) -> f32 {
    let mut force = base_force(round, tuning);
    if human_score >= 1 {
        force *= tuning.comeback_multiplier;
    }
    if progress >= tuning.proximity_threshold {
        force *= tuning.proximity_multiplier;
    }
    force
}
