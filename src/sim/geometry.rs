//! Rope geometry
//!
//! The play axis is a single signed scalar plus an orientation flag:
//! - Wide viewports pull horizontally, human goal on the right (+x)
//! - Narrow viewports pull vertically, human goal at the bottom (+y)
//!
//! All distances are fractions of the axis extent, so a resize keeps the
//! absolute rope offset and only re-derives the thresholds.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::state::Side;
use crate::consts::*;
use crate::settings::Tuning;

/// Visible play surface, in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: sanitize_extent(width),
            height: sanitize_extent(height),
        }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Same aspect, every side scaled by `factor`
    pub fn scaled(&self, factor: f32) -> Self {
        Self::new(self.width * factor, self.height * factor)
    }
}

fn sanitize_extent(v: f32) -> f32 {
    if v.is_finite() { v.max(0.0) } else { 0.0 }
}

/// Which screen axis the rope runs along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    /// Narrow (mobile) layouts pull vertically
    pub fn for_viewport(viewport: Viewport, narrow_breakpoint: f32) -> Self {
        if viewport.width < narrow_breakpoint {
            Orientation::Vertical
        } else {
            Orientation::Horizontal
        }
    }

    /// Unit vector pointing at the human goal
    pub fn axis(self) -> Vec2 {
        match self {
            Orientation::Horizontal => Vec2::X,
            Orientation::Vertical => Vec2::Y,
        }
    }

    /// Viewport length along the play axis
    pub fn extent(self, viewport: Viewport) -> f32 {
        match self {
            Orientation::Horizontal => viewport.width,
            Orientation::Vertical => viewport.height,
        }
    }
}

/// Derived rope geometry for one viewport and offset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometrySnapshot {
    pub orientation: Orientation,
    pub viewport: Viewport,
    /// Unit vector toward the human goal
    pub axis: Vec2,
    pub rope_center: Vec2,
    pub rope_half_length: f32,
    /// Human goal threshold (positive offset)
    pub goal_near: f32,
    /// Opponent goal threshold (negative offset)
    pub goal_far: f32,
    /// 0 = opponent goal, 1 = human goal, 0.5 = tied
    pub normalized_progress: f32,
}

impl GeometrySnapshot {
    /// Resolve geometry for a viewport with the rope at `offset`
    pub fn resolve(viewport: Viewport, offset: f32, tuning: &Tuning) -> Self {
        let orientation = Orientation::for_viewport(viewport, tuning.narrow_breakpoint);
        let extent = orientation.extent(viewport);
        let goal = extent * tuning.goal_fraction;

        Self {
            orientation,
            viewport,
            axis: orientation.axis(),
            rope_center: viewport.center(),
            rope_half_length: extent * tuning.rope_fraction,
            goal_near: goal,
            goal_far: -goal,
            normalized_progress: normalized_progress(offset, goal, -goal),
        }
    }

    /// Same geometry with progress recomputed for a new offset
    pub fn with_offset(&self, offset: f32) -> Self {
        Self {
            normalized_progress: self.progress_for(offset),
            ..*self
        }
    }

    pub fn progress_for(&self, offset: f32) -> f32 {
        normalized_progress(offset, self.goal_near, self.goal_far)
    }

    /// Signed pointer movement along the pull axis
    pub fn axis_delta(&self, delta: Vec2) -> f32 {
        delta.dot(self.axis)
    }

    /// Signed position of a screen point along the axis, relative to centre
    pub fn axis_coord(&self, point: Vec2) -> f32 {
        (point - self.rope_center).dot(self.axis)
    }

    /// Offset the rope snaps to when `side` wins
    pub fn goal_offset(&self, side: Side) -> f32 {
        match side {
            Side::Human => self.goal_near,
            Side::Ai => self.goal_far,
        }
    }

    /// Goal line position on screen
    pub fn goal_marker(&self, side: Side) -> Vec2 {
        self.rope_center + self.axis * self.goal_offset(side)
    }

    /// Screen position of the rope's centre knot
    pub fn knot_position(&self, offset: f32) -> Vec2 {
        self.rope_center + self.axis * offset
    }

    /// Rope end points (opponent end, human end); the rope slides with the knot
    pub fn rope_endpoints(&self, offset: f32) -> (Vec2, Vec2) {
        let knot = self.knot_position(offset);
        let half = self.axis * self.rope_half_length;
        (knot - half, knot + half)
    }

    /// Which goal the offset has reached, if any
    pub fn crossed(&self, offset: f32) -> Option<Side> {
        if self.goal_near - self.goal_far <= MIN_GOAL_SPAN {
            return None;
        }
        if offset >= self.goal_near {
            Some(Side::Human)
        } else if offset <= self.goal_far {
            Some(Side::Ai)
        } else {
            None
        }
    }
}

/// Rescale an offset to [0, 1] between the goals.
///
/// A degenerate span (zero-sized viewport) reports a tied rope.
pub fn normalized_progress(offset: f32, goal_near: f32, goal_far: f32) -> f32 {
    let span = goal_near - goal_far;
    if !span.is_finite() || span <= MIN_GOAL_SPAN || !offset.is_finite() {
        return TIED_PROGRESS;
    }
    ((offset - goal_far) / span).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuning() -> Tuning {
        Tuning::default()
    }

    #[test]
    fn test_orientation_by_width() {
        let wide = GeometrySnapshot::resolve(Viewport::new(1280.0, 800.0), 0.0, &tuning());
        assert_eq!(wide.orientation, Orientation::Horizontal);
        assert_eq!(wide.axis, Vec2::X);
        assert!((wide.goal_near - 384.0).abs() < 1e-3);

        let narrow = GeometrySnapshot::resolve(Viewport::new(390.0, 844.0), 0.0, &tuning());
        assert_eq!(narrow.orientation, Orientation::Vertical);
        assert_eq!(narrow.axis, Vec2::Y);
        assert!((narrow.goal_near - 844.0 * 0.30).abs() < 1e-3);
        assert_eq!(narrow.goal_far, -narrow.goal_near);
    }

    #[test]
    fn test_progress_endpoints() {
        let geo = GeometrySnapshot::resolve(Viewport::new(1000.0, 600.0), 0.0, &tuning());
        assert_eq!(geo.normalized_progress, 0.5);
        assert_eq!(geo.progress_for(geo.goal_near), 1.0);
        assert_eq!(geo.progress_for(geo.goal_far), 0.0);
        assert_eq!(geo.progress_for(geo.goal_near * 4.0), 1.0);
    }

    #[test]
    fn test_degenerate_viewport_is_tied() {
        let geo = GeometrySnapshot::resolve(Viewport::new(0.0, 0.0), 25.0, &tuning());
        assert_eq!(geo.normalized_progress, TIED_PROGRESS);
        assert_eq!(geo.crossed(25.0), None);

        let geo = GeometrySnapshot::resolve(Viewport::new(f32::NAN, 500.0), 0.0, &tuning());
        assert_eq!(geo.normalized_progress, TIED_PROGRESS);
    }

    #[test]
    fn test_crossing() {
        let geo = GeometrySnapshot::resolve(Viewport::new(1280.0, 800.0), 0.0, &tuning());
        assert_eq!(geo.crossed(0.0), None);
        assert_eq!(geo.crossed(geo.goal_near), Some(Side::Human));
        assert_eq!(geo.crossed(geo.goal_far - 1.0), Some(Side::Ai));
    }

    #[test]
    fn test_resize_keeps_offset_rederives_goals() {
        let t = tuning();
        let offset = 150.0;
        let big = GeometrySnapshot::resolve(Viewport::new(1600.0, 900.0), offset, &t);
        let small = GeometrySnapshot::resolve(Viewport::new(800.0, 900.0), offset, &t);
        assert!(small.normalized_progress > big.normalized_progress);
        assert!((small.goal_near - 240.0).abs() < 1e-3);
    }

    #[test]
    fn test_anchor_points() {
        let geo = GeometrySnapshot::resolve(Viewport::new(400.0, 1000.0), 0.0, &tuning());
        // Narrow: rope runs vertically through the centre
        let knot = geo.knot_position(100.0);
        assert_eq!(knot, Vec2::new(200.0, 600.0));
        let (ai_end, human_end) = geo.rope_endpoints(0.0);
        assert_eq!(ai_end.x, 200.0);
        assert!(human_end.y > ai_end.y);
        assert_eq!(geo.goal_marker(Side::Human), Vec2::new(200.0, 500.0 + geo.goal_near));
        assert_eq!(geo.axis_coord(Vec2::new(10.0, 520.0)), 20.0);
        assert_eq!(geo.axis_delta(Vec2::new(5.0, -7.0)), -7.0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: proportional resizes leave progress unchanged
            #[test]
            fn prop_progress_scale_invariant(
                width in 100.0f32..3000.0,
                height in 100.0f32..3000.0,
                relative in -1.5f32..1.5,
                factor in 0.25f32..4.0,
            ) {
                let t = Tuning::default();
                let a = Viewport::new(width, height);
                let b = a.scaled(factor);
                // Keep both on the same side of the breakpoint
                prop_assume!(
                    Orientation::for_viewport(a, t.narrow_breakpoint)
                        == Orientation::for_viewport(b, t.narrow_breakpoint)
                );

                let geo_a = GeometrySnapshot::resolve(a, 0.0, &t);
                let geo_b = GeometrySnapshot::resolve(b, 0.0, &t);
                let offset_a = relative * geo_a.goal_near;
                let offset_b = offset_a * factor;

                let pa = geo_a.progress_for(offset_a);
                let pb = geo_b.progress_for(offset_b);
                prop_assert!((pa - pb).abs() < 1e-4);
                if (relative.abs() - 1.0).abs() > 1e-3 {
                    prop_assert_eq!(geo_a.crossed(offset_a), geo_b.crossed(offset_b));
                }
            }

            /// Property: progress always lands in [0, 1]
            #[test]
            fn prop_progress_bounded(
                width in 0.0f32..4000.0,
                height in 0.0f32..4000.0,
                offset in -10_000.0f32..10_000.0,
            ) {
                let geo = GeometrySnapshot::resolve(Viewport::new(width, height), offset, &Tuning::default());
                prop_assert!((0.0..=1.0).contains(&geo.normalized_progress));
            }
        }
    }
}
