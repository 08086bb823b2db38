//! The bounded-duration session loop.
//!
//! Single-threaded and synchronous by design: the target UI is a remote
//! rendering surface with no concurrency contract, so perception and action
//! are strictly serialized. Cancellation is cooperative — the stop flag is
//! checked between loop iterations only, so an in-flight action always
//! finishes before the session winds down.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::capture::FrameSource;
use crate::error::{SessionError, SessionResult};
use crate::games::Runner;
use crate::guard::OverlayGuard;
use crate::input::ActionExecutor;
use crate::ocr::TextReader;

/// Hard cap on back-to-back overlay dismissals. A dialog that refuses to go
/// away would otherwise pin the loop in guard cycles and never reach the
/// state machine's stall check.
const MAX_CONSECUTIVE_DISMISSALS: u32 = 8;

/// What happened over the course of a session.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub game: String,
    pub elapsed: Duration,
    pub rounds_played: u32,
    pub starting_balance: Option<f64>,
    pub ending_balance: Option<f64>,
}

/// Drives a game state machine until the duration elapses or a stop signal
/// arrives.
pub struct SessionDriver {
    capture: Box<dyn FrameSource>,
    reader: TextReader,
    input: ActionExecutor,
    guard: OverlayGuard,
    stop: Arc<AtomicBool>,
}

impl SessionDriver {
    pub fn new(
        capture: Box<dyn FrameSource>,
        reader: TextReader,
        input: ActionExecutor,
        guard: OverlayGuard,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            capture,
            reader,
            input,
            guard,
            stop,
        }
    }

    /// Run `runner` for at most `duration` of wall-clock time.
    ///
    /// Each cycle: clear blocking overlays, observe, decide, act, then sleep
    /// the step's delay. When the bound is reached or the stop flag is set,
    /// the runner is asked to unwind (it may still need a final action, e.g.
    /// cancelling autoplay) and the loop continues until it reports
    /// finished. A stall aborts the session with a typed error.
    pub fn run(
        &mut self,
        runner: &mut dyn Runner,
        duration: Duration,
    ) -> SessionResult<SessionSummary> {
        let start = Instant::now();
        let mut shutting_down = false;
        let mut dismissals_in_a_row = 0u32;

        log::info!(
            "session '{}' started ({:.1} minute bound)",
            runner.name(),
            duration.as_secs_f64() / 60.0
        );

        loop {
            if runner.finished() {
                break;
            }

            if !shutting_down
                && (self.stop.load(Ordering::SeqCst) || start.elapsed() >= duration)
            {
                log::info!("session bound reached, finishing up");
                runner.begin_shutdown();
                shutting_down = true;
            }

            let frame = self.capture.grab()?;

            if self.guard.clear(&frame, &mut self.input)? {
                dismissals_in_a_row += 1;
                if dismissals_in_a_row >= MAX_CONSECUTIVE_DISMISSALS {
                    let err = SessionError::Stalled {
                        game: runner.name().to_string(),
                        state: "overlay".to_string(),
                        expecting: "overlay to stay dismissed".to_string(),
                        waited: start.elapsed(),
                    };
                    log::error!("session aborted: {err}");
                    runner.begin_shutdown();
                    return Err(err);
                }
                // The screen just changed; re-capture before observing.
                continue;
            }
            dismissals_in_a_row = 0;

            runner.observe(&frame, &self.reader);
            let step = match runner.decide(Instant::now()) {
                Ok(step) => step,
                Err(err) => {
                    log::error!("session aborted: {err}");
                    return Err(err);
                }
            };
            runner.act(&step, &mut self.input)?;

            if !step.delay.is_zero() {
                thread::sleep(step.delay);
            }
        }

        let summary = SessionSummary {
            game: runner.name().to_string(),
            elapsed: start.elapsed(),
            rounds_played: runner.rounds().rounds_played(),
            starting_balance: runner.rounds().starting_balance(),
            ending_balance: runner.rounds().current_balance(),
        };
        log_summary(&summary);
        Ok(summary)
    }
}

fn log_summary(summary: &SessionSummary) {
    log::info!("session complete: {}", summary.game);
    log::info!("  duration: {:.1} minutes", summary.elapsed.as_secs_f64() / 60.0);
    log::info!("  rounds played: {}", summary.rounds_played);
    if let (Some(start), Some(end)) = (summary.starting_balance, summary.ending_balance) {
        let pnl = end - start;
        log::info!("  starting balance: ${start:.2}");
        log::info!("  ending balance: ${end:.2}");
        log::info!(
            "  p&l: {}{:.2}",
            if pnl >= 0.0 { "+$" } else { "-$" },
            pnl.abs()
        );
    }
}
