//! Match and round state
//!
//! The match owns the round counters and the single active round. Score only
//! changes through [`MatchState::resolve_round`], which is gated by the round's
//! resolution latch.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::geometry::GeometrySnapshot;
use crate::consts::*;

/// Current phase of the match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Waiting for the first tap
    Instructions,
    /// Beat sequence before a round
    Countdown,
    /// Live pulling
    Playing,
    /// Pause after a round resolved
    RoundEnd,
    /// Match decided (terminal until closed)
    GameOver,
}

impl GamePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            GamePhase::Instructions => "instructions",
            GamePhase::Countdown => "countdown",
            GamePhase::Playing => "playing",
            GamePhase::RoundEnd => "roundEnd",
            GamePhase::GameOver => "gameOver",
        }
    }
}

/// One end of the rope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Human,
    Ai,
}

/// How a round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundOutcome {
    Won(Side),
    Draw,
}

/// Countdown beats, in play order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Beat {
    Three,
    Two,
    One,
    Go,
}

impl Beat {
    pub const SEQUENCE: [Beat; 4] = [Beat::Three, Beat::Two, Beat::One, Beat::Go];

    pub fn label(&self) -> &'static str {
        match self {
            Beat::Three => "3",
            Beat::Two => "2",
            Beat::One => "1",
            Beat::Go => "GO!",
        }
    }
}

/// Events emitted by the simulation and the state machine.
/// The feedback layer consumes these for tones, vibration and flashes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// First tap on the instructions screen
    Started,
    CountdownBeat(Beat),
    RoundStarted { round: u8 },
    /// Human is pulling against the opponent
    Strain,
    RoundWon { round: u8, winner: Side },
    RoundDrawn { round: u8 },
    MatchOver { winner: Side, human_score: u8, ai_score: u8 },
    RevealLine { index: usize },
}

/// The single active round
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Round {
    /// Signed rope offset in pixels, positive toward the human goal
    pub offset: f32,
    /// Simulated time spent playing this round
    pub elapsed_ms: f32,
    /// Round time at the last strain creak
    pub last_strain_ms: Option<f32>,
    resolved: bool,
}

impl Round {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to a tied rope with the latch cleared
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Flip the resolution latch. Returns false if it was already set.
    fn latch(&mut self) -> bool {
        if self.resolved {
            return false;
        }
        self.resolved = true;
        true
    }
}

/// Match state, owned by the state machine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchState {
    /// 1-based round number, never decreases
    pub round_number: u8,
    pub human_score: u8,
    pub ai_score: u8,
    pub phase: GamePhase,
    pub round: Round,
    /// Outcome of the most recently resolved round
    pub last_outcome: Option<RoundOutcome>,
}

impl Default for MatchState {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchState {
    pub fn new() -> Self {
        Self {
            round_number: 1,
            human_score: 0,
            ai_score: 0,
            phase: GamePhase::Instructions,
            round: Round::new(),
            last_outcome: None,
        }
    }

    /// Side that has taken the match, if any
    pub fn match_winner(&self) -> Option<Side> {
        if self.human_score >= WINS_TO_TAKE_MATCH {
            Some(Side::Human)
        } else if self.ai_score >= WINS_TO_TAKE_MATCH {
            Some(Side::Ai)
        } else {
            None
        }
    }

    /// Reset round physics for a fresh countdown
    pub fn begin_countdown(&mut self) {
        self.round.reset();
        self.phase = GamePhase::Countdown;
    }

    /// Move on to the next round number
    pub fn advance_round(&mut self) {
        self.round_number = (self.round_number + 1).min(MAX_ROUNDS);
    }

    /// Resolve the active round exactly once.
    ///
    /// A win snaps the rope to the winner's goal and awards the round; a draw
    /// leaves score untouched. Returns false (and changes nothing) if the round
    /// was already resolved.
    pub fn resolve_round(&mut self, outcome: RoundOutcome, geometry: &GeometrySnapshot) -> bool {
        if !self.round.latch() {
            return false;
        }

        if let RoundOutcome::Won(side) = outcome {
            self.round.offset = geometry.goal_offset(side);
            let score = match side {
                Side::Human => &mut self.human_score,
                Side::Ai => &mut self.ai_score,
            };
            *score = (*score + 1).min(WINS_TO_TAKE_MATCH);
        }

        self.last_outcome = Some(outcome);
        self.phase = GamePhase::RoundEnd;
        true
    }
}

/// A captured pointer on the pull zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragSession {
    pub pointer_id: i32,
    last: Vec2,
    current: Vec2,
}

impl DragSession {
    pub fn new(pointer_id: i32, pos: Vec2) -> Self {
        Self {
            pointer_id,
            last: pos,
            current: pos,
        }
    }

    pub fn move_to(&mut self, pos: Vec2) {
        self.current = pos;
    }

    pub fn current(&self) -> Vec2 {
        self.current
    }

    /// Movement since the last call, consumed by the integrator
    pub fn take_delta(&mut self) -> Vec2 {
        let delta = self.current - self.last;
        self.last = self.current;
        delta
    }

    /// Drop movement accumulated while the rope was not live
    pub fn rebase(&mut self) {
        self.last = self.current;
    }
}
