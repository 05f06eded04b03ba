//! End-to-end match flow through the public `Game` API with a manual clock.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glam::Vec2;
use proptest::prelude::*;

use tug_of_war::feedback::{FeedbackLog, RecordingOutput};
use tug_of_war::sim::{Autopilot, GamePhase, Gesture, Orientation, RoundOutcome, Side, Viewport};
use tug_of_war::{Callbacks, Game, Settings};

const FRAME: f64 = 1000.0 / 60.0;

struct Harness {
    game: Game,
    now: f64,
    reveals: Rc<Cell<u32>>,
    closes: Rc<Cell<u32>>,
    log: Rc<RefCell<FeedbackLog>>,
}

impl Harness {
    fn new(settings: Settings) -> Self {
        Self::with_viewport(settings, Viewport::new(1280.0, 800.0))
    }

    fn with_viewport(settings: Settings, viewport: Viewport) -> Self {
        let reveals = Rc::new(Cell::new(0));
        let closes = Rc::new(Cell::new(0));
        let (output, log) = RecordingOutput::new(true);
        let (r, c) = (reveals.clone(), closes.clone());
        let game = Game::new(
            settings,
            "#3fa7d6",
            viewport,
            Box::new(output),
            Callbacks::new(move || r.set(r.get() + 1), move || c.set(c.get() + 1)),
        );
        Self {
            game,
            now: 0.0,
            reveals,
            closes,
            log,
        }
    }

    /// Advance one frame: due timers first, then the frame loop if running
    fn step(&mut self) {
        self.now += FRAME;
        self.game.fire_timers(self.now);
        if self.game.frame_loop_active() {
            self.game.frame(self.now);
        }
    }

    /// Step until `done` holds, up to `limit_ms` of simulated time
    fn run_until(&mut self, limit_ms: f64, mut done: impl FnMut(&Game) -> bool) -> bool {
        let end = self.now + limit_ms;
        while self.now < end {
            if done(&self.game) {
                return true;
            }
            self.step();
        }
        done(&self.game)
    }

    fn start(&mut self) {
        self.game.tap(self.now);
        assert_eq!(self.game.phase(), GamePhase::Countdown);
        assert!(self.run_until(5_000.0, |g| g.phase() == GamePhase::Playing));
    }

    /// Play frames while dragging `px` per frame toward the human goal
    fn pull_until(&mut self, px: f32, limit_ms: f64, mut done: impl FnMut(&Game) -> bool) -> bool {
        let mut pos = self.game.geometry().rope_center;
        let end = self.now + limit_ms;
        while self.now < end {
            if done(&self.game) {
                return true;
            }
            if self.game.phase() == GamePhase::Playing && !self.game.is_dragging() {
                pos = self.game.geometry().rope_center;
                self.game.pointer_down(1, pos, self.now);
            }
            pos += self.game.geometry().axis * px;
            self.game.pointer_move(1, pos);
            self.step();
        }
        done(&self.game)
    }
}

#[test]
fn straight_win() {
    let mut h = Harness::new(Settings::default());
    h.start();
    let round_start = h.now;

    assert!(h.pull_until(20.0, 12_000.0, |g| g.phase() == GamePhase::RoundEnd));
    assert!(h.now - round_start < 12_000.0);
    assert_eq!(h.game.state().last_outcome, Some(RoundOutcome::Won(Side::Human)));
    assert_eq!((h.game.state().human_score, h.game.state().ai_score), (1, 0));

    assert!(h.run_until(2_000.0, |g| g.phase() == GamePhase::Countdown));
    assert_eq!(h.game.state().round_number, 2);
    assert_eq!((h.game.state().human_score, h.game.state().ai_score), (1, 0));
    assert_eq!(h.reveals.get(), 0);
}

#[test]
fn straight_win_on_narrow_screen() {
    let mut h = Harness::with_viewport(Settings::default(), Viewport::new(390.0, 844.0));
    assert_eq!(h.game.geometry().orientation, Orientation::Vertical);
    assert_eq!(h.game.geometry().axis, Vec2::Y);
    h.start();

    let start_y = h.game.geometry().knot_position(0.0).y;
    assert!(h.pull_until(20.0, 12_000.0, |g| g.phase() == GamePhase::RoundEnd));
    assert_eq!(h.game.state().last_outcome, Some(RoundOutcome::Won(Side::Human)));
    assert_eq!((h.game.state().human_score, h.game.state().ai_score), (1, 0));

    // The knot travelled down the screen to the human goal
    let snap = h.game.snapshot();
    assert!(snap.knot.y > start_y);
    assert!((snap.knot.x - 195.0).abs() < 1e-3);
    assert!((snap.knot - snap.human_goal).length() < 1e-3);
}

#[test]
fn draw_replays_same_round() {
    let mut h = Harness::new(Settings::default());
    h.start();

    assert!(h.run_until(12_500.0, |g| g.phase() == GamePhase::RoundEnd));
    assert_eq!(h.game.state().last_outcome, Some(RoundOutcome::Draw));
    assert_eq!((h.game.state().human_score, h.game.state().ai_score), (0, 0));

    assert!(h.run_until(1_100.0, |g| g.phase() == GamePhase::Countdown));
    assert_eq!(h.game.state().round_number, 1);
    assert_eq!((h.game.state().human_score, h.game.state().ai_score), (0, 0));
    assert_eq!(h.game.state().round.offset, 0.0);
}

#[test]
fn sweep_ends_after_second_win() {
    let mut h = Harness::new(Settings::default());
    h.start();

    assert!(h.pull_until(20.0, 12_000.0, |g| g.state().human_score == 1));
    assert!(h.pull_until(20.0, 20_000.0, |g| g.state().human_score == 2));
    assert_eq!(h.game.state().round_number, 2);
    assert_eq!(h.game.phase(), GamePhase::RoundEnd);

    assert!(h.run_until(2_000.0, |g| g.phase() == GamePhase::GameOver));
    assert_eq!(h.reveals.get(), 1);
    assert_eq!(h.game.state().round_number, 2);

    // All three lines arrive, the reveal callback never fires again
    assert!(h.run_until(5_000.0, |g| g.messages().len() == 3));
    assert_eq!(h.reveals.get(), 1);
    assert_eq!(h.game.pending_timers(), 0);
    assert!(!h.game.frame_loop_active());
    assert_eq!(h.closes.get(), 0);

    h.game.close();
    assert_eq!(h.closes.get(), 1);
    assert_eq!(h.reveals.get(), 1);
}

#[test]
fn opponent_victory_still_reveals() {
    let mut settings = Settings::default();
    settings.tuning.ai_base_force = [3.0, 3.0, 3.0];
    let mut h = Harness::new(settings);
    h.start();

    assert!(h.run_until(60_000.0, |g| g.phase() == GamePhase::GameOver));
    assert_eq!((h.game.state().human_score, h.game.state().ai_score), (0, 2));
    assert_eq!(h.reveals.get(), 1);

    let log = h.log.borrow();
    let lose_flashes = log.flashes().iter().filter(|f| f.color == "#d64545").count();
    assert_eq!(lose_flashes, 2);
}

#[test]
fn teardown_at_every_phase() {
    type Setup = fn(&mut Harness);
    let setups: [(GamePhase, Setup); 5] = [
        (GamePhase::Instructions, |_| {}),
        (GamePhase::Countdown, |h| {
            h.game.tap(h.now);
            h.game.pointer_down(4, Vec2::new(600.0, 400.0), h.now);
        }),
        (GamePhase::Playing, |h| {
            h.start();
            h.game.pointer_down(4, Vec2::new(600.0, 400.0), h.now);
            h.step();
        }),
        (GamePhase::RoundEnd, |h| {
            h.start();
            assert!(h.pull_until(20.0, 12_000.0, |g| g.phase() == GamePhase::RoundEnd));
        }),
        (GamePhase::GameOver, |h| {
            h.start();
            assert!(h.pull_until(20.0, 40_000.0, |g| g.phase() == GamePhase::GameOver));
        }),
    ];

    for (phase, setup) in setups {
        let mut h = Harness::new(Settings::default());
        setup(&mut h);
        assert_eq!(h.game.phase(), phase);

        let teardown = h.game.close();
        assert_eq!(h.game.pending_timers(), 0, "timers left in {phase:?}");
        assert!(!h.game.frame_loop_active(), "frame loop left in {phase:?}");
        assert!(!h.game.is_dragging());
        assert_eq!(h.closes.get(), 1);
        assert_eq!(h.log.borrow().shutdowns, 1);
        if phase == GamePhase::Playing {
            assert!(teardown.stopped_frame_loop);
            assert_eq!(teardown.released_pointer, Some(4));
        }

        // Nothing keeps running against the closed game
        let frozen = h.game.snapshot();
        for _ in 0..600 {
            h.step();
        }
        let after = h.game.snapshot();
        assert_eq!(after.phase, frozen.phase);
        assert_eq!(after.rope_offset, frozen.rope_offset);
        assert_eq!(after.messages, frozen.messages);
    }
}

#[test]
fn feedback_failure_never_blocks_progress() {
    let mut settings = Settings::default();
    settings.muted = true;
    settings.vibration = false;
    settings.reduced_motion = true;

    let (output, log) = RecordingOutput::new(false);
    let mut game = Game::new(
        settings,
        "#000",
        Viewport::new(390.0, 844.0),
        Box::new(output),
        Callbacks::noop(),
    );
    game.tap(0.0);
    game.fire_timers(2_800.0);
    assert_eq!(game.phase(), GamePhase::Playing);
    assert!(!game.audio_ready());
    assert!(log.borrow().cues.is_empty());
}

fn play_with_autopilot(seed: u64, strength: f32, limit_ms: f64) -> (Harness, Vec<(u8, u8, u8)>) {
    let mut h = Harness::new(Settings::default());
    let mut pilot = Autopilot::new(seed, strength);
    let mut history = Vec::new();
    h.start();

    let end = h.now + limit_ms;
    while h.now < end && h.game.phase() != GamePhase::GameOver {
        let gesture = if h.game.phase() == GamePhase::Playing {
            pilot.next_gesture(h.game.geometry())
        } else {
            pilot.release()
        };
        match gesture {
            Some(Gesture::Down(p)) => {
                h.game.pointer_down(Autopilot::POINTER_ID, p, h.now);
            }
            Some(Gesture::Move(p)) => h.game.pointer_move(Autopilot::POINTER_ID, p),
            Some(Gesture::Up) => {
                h.game.pointer_up(Autopilot::POINTER_ID);
            }
            None => {}
        }
        h.step();
        let s = h.game.state();
        history.push((s.round_number, s.human_score, s.ai_score));
    }

    // Let a decided round finish its pause
    if h.game.state().match_winner().is_some() {
        h.run_until(3_000.0, |g| g.phase() == GamePhase::GameOver);
    }
    (h, history)
}

#[test]
fn autopilot_plays_to_completion() {
    let (h, _) = play_with_autopilot(11, 14.0, 180_000.0);
    assert_eq!(h.game.phase(), GamePhase::GameOver);
    assert_eq!(h.reveals.get(), 1);
    assert!(h.game.state().human_score == 2 || h.game.state().ai_score == 2);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Property: scores stay within best-of-three, round numbers never go
    /// down, and the match is over exactly when someone has two wins
    #[test]
    fn prop_match_invariants(seed in any::<u64>(), strength in 0.0f32..16.0) {
        let (h, history) = play_with_autopilot(seed, strength, 90_000.0);

        let mut prev = (1u8, 0u8, 0u8);
        for &(round, human, ai) in &history {
            prop_assert!(human <= 2 && ai <= 2);
            prop_assert!(round >= prev.0);
            prop_assert!(human >= prev.1 && ai >= prev.2);
            prop_assert!(u16::from(human + ai) <= u16::from(prev.1 + prev.2) + 1);
            prev = (round, human, ai);
        }

        let s = h.game.state();
        let decided = s.human_score == 2 || s.ai_score == 2;
        prop_assert_eq!(h.game.phase() == GamePhase::GameOver, decided);
        prop_assert!(!(s.human_score == 2 && s.ai_score == 2));
        prop_assert_eq!(h.reveals.get(), u32::from(decided));
    }
}
