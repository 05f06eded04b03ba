//! Match state machine
//!
//! Phases run `Instructions -> Countdown -> Playing -> RoundEnd`, then either
//! back to `Countdown` (next round, or a replay after a draw) or `GameOver`.
//! Only `Playing` uses the frame loop; every other phase is driven by
//! one-shot timers. Phase setup always happens synchronously inside the
//! transition, before any timer or frame of the next phase can run.

use glam::Vec2;
use serde::Serialize;

use crate::consts::*;
use crate::feedback::{self, FeedbackOutput};
use crate::scheduler::{Scheduler, TimerId};
use crate::settings::Settings;
use crate::sim::{
    Beat, DragSession, GameEvent, GamePhase, GeometrySnapshot, MatchState, RoundOutcome, Side,
    Viewport, tick,
};

/// Deferred transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timer {
    Beat(Beat),
    StartPlaying,
    AfterRound,
    RevealLine(usize),
}

/// Host callbacks
pub struct Callbacks {
    on_reveal: Box<dyn FnMut()>,
    on_close: Box<dyn FnMut()>,
}

impl Callbacks {
    pub fn new(on_reveal: impl FnMut() + 'static, on_close: impl FnMut() + 'static) -> Self {
        Self {
            on_reveal: Box::new(on_reveal),
            on_close: Box::new(on_close),
        }
    }

    pub fn noop() -> Self {
        Self::new(|| {}, || {})
    }
}

/// What `close` released
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Teardown {
    /// Pointer the host should release capture for
    pub released_pointer: Option<i32>,
    pub cancelled_timers: usize,
    pub stopped_frame_loop: bool,
}

/// Immutable view for the render layer
#[derive(Debug, Clone, Serialize)]
pub struct RenderSnapshot {
    pub phase: GamePhase,
    pub round_number: u8,
    pub human_score: u8,
    pub ai_score: u8,
    pub rope_offset: f32,
    pub geometry: GeometrySnapshot,
    pub knot: Vec2,
    /// (opponent end, human end)
    pub rope_ends: (Vec2, Vec2),
    pub human_goal: Vec2,
    pub ai_goal: Vec2,
    pub time_left_ms: f32,
    pub countdown: Option<&'static str>,
    pub last_outcome: Option<RoundOutcome>,
    pub messages: Vec<String>,
    pub dragging: bool,
    pub theme: String,
}

/// One open tug-of-war overlay
pub struct Game {
    settings: Settings,
    theme: String,
    state: MatchState,
    geometry: GeometrySnapshot,
    drag: Option<DragSession>,
    scheduler: Scheduler<Timer>,
    /// Timers owned by the current phase
    phase_timers: Vec<TimerId>,
    output: Box<dyn FeedbackOutput>,
    callbacks: Callbacks,
    countdown: Option<Beat>,
    messages: Vec<String>,
    audio_requested: bool,
    audio_ready: bool,
    revealed: bool,
    closed: bool,
}

impl Game {
    pub fn new(
        settings: Settings,
        theme: impl Into<String>,
        viewport: Viewport,
        output: Box<dyn FeedbackOutput>,
        callbacks: Callbacks,
    ) -> Self {
        let settings = settings.sanitized();
        let geometry = GeometrySnapshot::resolve(viewport, 0.0, &settings.tuning);
        log::info!(
            "Tug of war opened ({:?}, {}x{})",
            geometry.orientation,
            viewport.width,
            viewport.height
        );

        Self {
            settings,
            theme: theme.into(),
            state: MatchState::new(),
            geometry,
            drag: None,
            scheduler: Scheduler::new(),
            phase_timers: Vec::new(),
            output,
            callbacks,
            countdown: None,
            messages: Vec::new(),
            audio_requested: false,
            audio_ready: false,
            revealed: false,
            closed: false,
        }
    }

    // === Queries ===

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub fn geometry(&self) -> &GeometrySnapshot {
        &self.geometry
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn audio_ready(&self) -> bool {
        self.audio_ready
    }

    pub fn frame_loop_active(&self) -> bool {
        self.scheduler.frame_loop_active()
    }

    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending()
    }

    /// When the host should next call [`Game::fire_timers`]
    pub fn next_deadline(&self) -> Option<f64> {
        self.scheduler.next_deadline()
    }

    pub fn snapshot(&self) -> RenderSnapshot {
        let offset = self.state.round.offset;
        let time_left_ms = match self.state.phase {
            GamePhase::Playing | GamePhase::RoundEnd => {
                (self.settings.tuning.round_time_cap_ms - self.state.round.elapsed_ms).max(0.0)
            }
            _ => self.settings.tuning.round_time_cap_ms,
        };

        RenderSnapshot {
            phase: self.state.phase,
            round_number: self.state.round_number,
            human_score: self.state.human_score,
            ai_score: self.state.ai_score,
            rope_offset: offset,
            geometry: self.geometry,
            knot: self.geometry.knot_position(offset),
            rope_ends: self.geometry.rope_endpoints(offset),
            human_goal: self.geometry.goal_marker(Side::Human),
            ai_goal: self.geometry.goal_marker(Side::Ai),
            time_left_ms,
            countdown: self.countdown.map(|b| b.label()),
            last_outcome: self.state.last_outcome,
            messages: self.messages.clone(),
            dragging: self.drag.is_some(),
            theme: self.theme.clone(),
        }
    }

    // === Input ===

    /// Tap on the surface. Starts the match from the instructions screen.
    pub fn tap(&mut self, now: f64) {
        if self.closed || self.state.phase != GamePhase::Instructions {
            return;
        }
        // Browsers only allow audio after a user gesture
        self.init_audio();
        self.emit(GameEvent::Started);
        self.enter_countdown(now);
    }

    /// Pointer pressed on the pull zone. Returns true if the pointer was
    /// captured for dragging.
    pub fn pointer_down(&mut self, pointer_id: i32, pos: Vec2, now: f64) -> bool {
        if self.closed {
            return false;
        }
        match self.state.phase {
            GamePhase::Instructions => {
                self.tap(now);
                false
            }
            GamePhase::Countdown | GamePhase::Playing => {
                if self.drag.is_some() {
                    return false;
                }
                self.drag = Some(DragSession::new(pointer_id, pos));
                true
            }
            GamePhase::RoundEnd | GamePhase::GameOver => false,
        }
    }

    pub fn pointer_move(&mut self, pointer_id: i32, pos: Vec2) {
        if self.closed {
            return;
        }
        if let Some(drag) = self.drag.as_mut().filter(|d| d.pointer_id == pointer_id) {
            drag.move_to(pos);
        }
    }

    /// Pointer released. Returns true if it ended the drag session.
    pub fn pointer_up(&mut self, pointer_id: i32) -> bool {
        if self.drag.as_ref().is_some_and(|d| d.pointer_id == pointer_id) {
            self.drag = None;
            true
        } else {
            false
        }
    }

    pub fn pointer_cancel(&mut self, pointer_id: i32) -> bool {
        self.pointer_up(pointer_id)
    }

    /// Viewport changed. The absolute offset is kept; thresholds are re-derived.
    pub fn resize(&mut self, viewport: Viewport) {
        if self.closed {
            return;
        }
        let before = self.geometry.orientation;
        self.geometry = GeometrySnapshot::resolve(viewport, self.state.round.offset, &self.settings.tuning);
        if before != self.geometry.orientation {
            log::info!("Play axis now {:?}", self.geometry.orientation);
        }
    }

    // === Host scheduling ===

    /// One animation frame. Returns whether another frame should be requested.
    pub fn frame(&mut self, now: f64) -> bool {
        if self.closed {
            return false;
        }
        let Some(dt) = self.scheduler.frame_delta(now, f64::from(FRAME_MS)) else {
            return false;
        };

        let outcome = tick(
            &mut self.state,
            self.drag.as_mut(),
            &mut self.geometry,
            dt as f32,
            &self.settings.tuning,
        );
        for event in outcome.events {
            self.emit(event);
        }

        if let Some(result) = outcome.resolved {
            self.finish_round(now, result);
        }
        self.scheduler.frame_loop_active()
    }

    /// Fire every timer due at `now`, in deadline order
    pub fn fire_timers(&mut self, now: f64) {
        while !self.closed {
            let Some(due) = self.scheduler.pop_due(now) else {
                break;
            };
            self.on_timer(due.event, due.at);
        }
    }

    /// Dismiss the overlay: stop the loop, cancel timers, release the pointer,
    /// shut down audio and notify the host. Safe to call more than once.
    pub fn close(&mut self) -> Teardown {
        if self.closed {
            return Teardown::default();
        }
        self.closed = true;

        let teardown = Teardown {
            stopped_frame_loop: self.scheduler.stop_frame_loop(),
            cancelled_timers: self.scheduler.cancel_all(),
            released_pointer: self.drag.take().map(|d| d.pointer_id),
        };
        self.output.shutdown();
        self.audio_ready = false;

        log::info!(
            "Tug of war closed in {} (round {}, {}-{}), {} timers cancelled",
            self.state.phase.as_str(),
            self.state.round_number,
            self.state.human_score,
            self.state.ai_score,
            teardown.cancelled_timers
        );
        (self.callbacks.on_close)();
        teardown
    }

    // === Transitions ===

    fn on_timer(&mut self, timer: Timer, at: f64) {
        // A timer from an earlier phase is stale
        match (timer, self.state.phase) {
            (Timer::Beat(beat), GamePhase::Countdown) => {
                self.countdown = Some(beat);
                self.emit(GameEvent::CountdownBeat(beat));
            }
            (Timer::StartPlaying, GamePhase::Countdown) => self.enter_playing(),
            (Timer::AfterRound, GamePhase::RoundEnd) => self.after_round(at),
            (Timer::RevealLine(index), GamePhase::GameOver) => self.reveal_line(index),
            (timer, phase) => log::debug!("Dropping stale {timer:?} in {}", phase.as_str()),
        }
    }

    fn enter_countdown(&mut self, now: f64) {
        self.scheduler.stop_frame_loop();
        self.cancel_phase_timers();
        self.state.begin_countdown();
        self.geometry = self.geometry.with_offset(self.state.round.offset);
        self.countdown = None;
        if let Some(drag) = self.drag.as_mut() {
            drag.rebase();
        }
        log::info!("Round {} countdown", self.state.round_number);

        let beat_ms = self.settings.tuning.countdown_beat_ms;
        let settle_ms = self.settings.tuning.countdown_settle_ms;
        for (i, beat) in Beat::SEQUENCE.iter().enumerate() {
            self.schedule_phase(now + beat_ms * i as f64, Timer::Beat(*beat));
        }
        let go_ms = beat_ms * (Beat::SEQUENCE.len() - 1) as f64;
        self.schedule_phase(now + go_ms + settle_ms, Timer::StartPlaying);
    }

    fn enter_playing(&mut self) {
        self.state.phase = GamePhase::Playing;
        self.countdown = None;
        // Movement made during the countdown doesn't count
        if let Some(drag) = self.drag.as_mut() {
            drag.rebase();
        }
        self.scheduler.start_frame_loop();
        log::info!("Round {} live", self.state.round_number);
        self.emit(GameEvent::RoundStarted {
            round: self.state.round_number,
        });
    }

    fn finish_round(&mut self, now: f64, result: RoundOutcome) {
        self.scheduler.stop_frame_loop();
        self.cancel_phase_timers();
        let round = self.state.round_number;

        let pause_ms = match result {
            RoundOutcome::Won(winner) => {
                log::info!(
                    "Round {round} to {winner:?} ({}-{})",
                    self.state.human_score,
                    self.state.ai_score
                );
                self.emit(GameEvent::RoundWon { round, winner });
                self.settings.tuning.win_pause_ms
            }
            RoundOutcome::Draw => {
                log::info!("Round {round} drawn, replaying");
                self.emit(GameEvent::RoundDrawn { round });
                self.settings.tuning.draw_pause_ms
            }
        };
        let id = self.scheduler.schedule_in(now, pause_ms, Timer::AfterRound);
        self.phase_timers.push(id);
    }

    fn after_round(&mut self, now: f64) {
        match self.state.last_outcome {
            Some(RoundOutcome::Won(_)) => match self.state.match_winner() {
                Some(winner) => self.enter_game_over(now, winner),
                None => {
                    self.state.advance_round();
                    self.enter_countdown(now);
                }
            },
            // Draws replay the same round number
            Some(RoundOutcome::Draw) | None => self.enter_countdown(now),
        }
    }

    fn enter_game_over(&mut self, now: f64, winner: Side) {
        self.scheduler.stop_frame_loop();
        self.cancel_phase_timers();
        self.state.phase = GamePhase::GameOver;
        self.countdown = None;
        self.messages.clear();

        log::info!(
            "Match over: {winner:?} wins {}-{}",
            self.state.human_score,
            self.state.ai_score
        );
        self.emit(GameEvent::MatchOver {
            winner,
            human_score: self.state.human_score,
            ai_score: self.state.ai_score,
        });

        // Played to completion is what unlocks the card, whoever won
        if !self.revealed {
            self.revealed = true;
            (self.callbacks.on_reveal)();
        }

        let mut at = now;
        let offsets = self.settings.tuning.reveal_offsets_ms;
        for (index, offset) in offsets.iter().enumerate() {
            at += offset;
            self.schedule_phase(at, Timer::RevealLine(index));
        }
    }

    fn reveal_line(&mut self, index: usize) {
        let Some(winner) = self.state.match_winner() else {
            return;
        };
        let text = match index {
            0 => match winner {
                Side::Human => "You out-pulled the machine!".to_string(),
                Side::Ai => "The machine takes it this time.".to_string(),
            },
            1 => format!("Final score {} - {}", self.state.human_score, self.state.ai_score),
            _ => "Card unlocked.".to_string(),
        };
        self.messages.push(text);
        self.emit(GameEvent::RevealLine { index });
    }

    fn schedule_phase(&mut self, at: f64, timer: Timer) {
        let id = self.scheduler.schedule_at(at, timer);
        self.phase_timers.push(id);
    }

    /// Drop whatever the previous phase left pending. Returns how many were live.
    fn cancel_phase_timers(&mut self) -> usize {
        let mut cancelled = 0;
        for id in std::mem::take(&mut self.phase_timers) {
            if self.scheduler.cancel(id) {
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            log::debug!("Cancelled {cancelled} timers left by {}", self.state.phase.as_str());
        }
        cancelled
    }

    // === Feedback ===

    fn init_audio(&mut self) {
        if self.audio_requested {
            return;
        }
        self.audio_requested = true;
        self.audio_ready = self.output.init_audio();
        if !self.audio_ready {
            log::warn!("Audio unavailable - tones disabled");
        }
    }

    fn emit(&mut self, event: GameEvent) {
        let cues = feedback::cues_for(&event, &self.settings, &self.theme);
        feedback::dispatch(self.output.as_mut(), &cues);
    }
}

impl Drop for Game {
    fn drop(&mut self) {
        // Dropped without a close: still release device handles
        if !self.closed {
            self.scheduler.stop_frame_loop();
            self.scheduler.cancel_all();
            self.output.shutdown();
        }
    }
}
