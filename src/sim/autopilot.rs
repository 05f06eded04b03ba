//! Scripted human player for demos and soak tests
//!
//! Produces pointer gestures frame by frame: grab behind the knot, swipe toward
//! the human goal, let go, pause, repeat. Seeded, so a given seed always plays
//! the same match.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::geometry::GeometrySnapshot;

/// Pointer gesture for a single frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Down(Vec2),
    Move(Vec2),
    Up,
}

#[derive(Debug, Clone, Copy)]
enum Hand {
    /// Waiting before the next grab
    Resting { frames: u32 },
    /// Pointer held, swiping along the axis
    Pulling { pos: Vec2, frames: u32 },
}

/// Seeded swipe generator
#[derive(Debug, Clone)]
pub struct Autopilot {
    rng: Pcg32,
    /// Mean swipe speed in pixels per frame
    strength: f32,
    hand: Hand,
}

impl Autopilot {
    pub const POINTER_ID: i32 = 1;

    pub fn new(seed: u64, strength: f32) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            strength: strength.max(0.0),
            hand: Hand::Resting { frames: 0 },
        }
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    /// Gesture for the next frame, if any
    pub fn next_gesture(&mut self, geometry: &GeometrySnapshot) -> Option<Gesture> {
        match self.hand {
            Hand::Resting { frames } if frames > 0 => {
                self.hand = Hand::Resting { frames: frames - 1 };
                None
            }
            Hand::Resting { .. } => {
                // Grab a little behind the centre so there is room to swipe
                let back = geometry.rope_half_length * self.rng.random_range(0.3..0.7);
                let pos = geometry.rope_center - geometry.axis * back;
                let frames = self.rng.random_range(10..24);
                self.hand = Hand::Pulling { pos, frames };
                Some(Gesture::Down(pos))
            }
            Hand::Pulling { frames: 0, .. } => {
                let frames = self.rng.random_range(2..8);
                self.hand = Hand::Resting { frames };
                Some(Gesture::Up)
            }
            Hand::Pulling { pos, frames } => {
                let jitter = self.rng.random_range(0.6..1.4);
                let step = geometry.axis * self.strength * jitter;
                let wobble = geometry.axis.perp() * self.rng.random_range(-2.0..2.0);
                let pos = pos + step + wobble;
                self.hand = Hand::Pulling {
                    pos,
                    frames: frames - 1,
                };
                Some(Gesture::Move(pos))
            }
        }
    }

    /// Let go of the rope (e.g. between rounds)
    pub fn release(&mut self) -> Option<Gesture> {
        match self.hand {
            Hand::Pulling { .. } => {
                self.hand = Hand::Resting { frames: 0 };
                Some(Gesture::Up)
            }
            Hand::Resting { .. } => None,
        }
    }
}
