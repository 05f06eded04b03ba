//! Tug of War entry point
//!
//! The browser build is driven through the `TugOfWar` wasm export. Natively
//! this plays one headless match with the autopilot on a manual clock.
//!
//! Usage: `tug-of-war [SEED] [STRENGTH]` (see `--help`)

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use std::cell::Cell;
    use std::rc::Rc;

    use tug_of_war::feedback::{Flash, Tone};
    use tug_of_war::sim::{Autopilot, GamePhase, Gesture, Viewport};
    use tug_of_war::{Callbacks, FeedbackOutput, Game, Settings};

    const FRAME_MS: f64 = 1000.0 / 60.0;
    /// Give up on a match after ten simulated minutes
    const MAX_MS: f64 = 600_000.0;

    /// Feedback output that logs cues instead of playing them
    struct LogOutput;

    impl FeedbackOutput for LogOutput {
        fn init_audio(&mut self) -> bool {
            true
        }
        fn play_tone(&mut self, tone: &Tone) {
            log::debug!("tone {:?} {:.0} Hz", tone.waveform, tone.start_hz);
        }
        fn vibrate(&mut self, pattern: &[u32]) {
            log::debug!("vibrate {pattern:?}");
        }
        fn flash(&mut self, flash: &Flash) {
            log::debug!("flash {} for {} ms", flash.color, flash.duration_ms);
        }
        fn shutdown(&mut self) {
            log::debug!("feedback shut down");
        }
    }

    pub fn run(seed: u64, strength: f32) {
        let revealed = Rc::new(Cell::new(false));
        let flag = revealed.clone();
        let mut game = Game::new(
            Settings::default(),
            "#3fa7d6",
            Viewport::new(1280.0, 800.0),
            Box::new(LogOutput),
            Callbacks::new(move || flag.set(true), || log::info!("Overlay closed")),
        );
        let mut pilot = Autopilot::new(seed, strength);
        log::info!("Headless match, seed {seed}, strength {}", pilot.strength());

        let mut now = 0.0;
        game.tap(now);
        while now < MAX_MS && !(game.phase() == GamePhase::GameOver && game.pending_timers() == 0) {
            let gesture = if game.phase() == GamePhase::Playing {
                pilot.next_gesture(game.geometry())
            } else {
                pilot.release()
            };
            match gesture {
                Some(Gesture::Down(p)) => {
                    game.pointer_down(Autopilot::POINTER_ID, p, now);
                }
                Some(Gesture::Move(p)) => game.pointer_move(Autopilot::POINTER_ID, p),
                Some(Gesture::Up) => {
                    game.pointer_up(Autopilot::POINTER_ID);
                }
                None => {}
            }

            now += FRAME_MS;
            game.fire_timers(now);
            if game.frame_loop_active() {
                game.frame(now);
            }
        }

        let state = game.state();
        println!(
            "Finished in {} after {:.1}s: you {} - {} machine",
            state.phase.as_str(),
            now / 1000.0,
            state.human_score,
            state.ai_score
        );
        for line in game.messages() {
            println!("  {line}");
        }
        println!("Card revealed: {}", revealed.get());
        game.close();
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[derive(clap::Parser, Debug)]
#[command(name = "tug-of-war")]
#[command(about = "Play one headless tug-of-war match with the autopilot", long_about = None)]
struct Args {
    /// Autopilot RNG seed
    #[arg(default_value_t = 7)]
    seed: u64,

    /// Mean swipe speed in pixels per frame
    #[arg(default_value_t = 12.0)]
    strength: f32,
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use clap::Parser;

    env_logger::init();
    let args = Args::parse();
    headless::run(args.seed, args.strength);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is `web::wasm_start`, this is just to satisfy the compiler
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::Args;
    use clap::Parser;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["tug-of-war"]).unwrap();
        assert_eq!(args.seed, 7);
        assert_eq!(args.strength, 12.0);

        let args = Args::try_parse_from(["tug-of-war", "42", "3.5"]).unwrap();
        assert_eq!((args.seed, args.strength), (42, 3.5));
    }

    #[test]
    fn test_args_reject_bad_input() {
        assert!(Args::try_parse_from(["tug-of-war", "--seed=1", "strong"]).is_err());
        assert!(Args::try_parse_from(["tug-of-war", "1", "strong"]).is_err());

        let help = Args::try_parse_from(["tug-of-war", "--help"]).unwrap_err();
        assert_eq!(help.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
