//! Per-game state machines.
//!
//! Every game type implements the same observe → decide → act contract and
//! is driven by the session loop; game variants are composed from the shared
//! pieces here rather than subclassed, so each machine is independently
//! testable with scripted frames.

pub mod slots;
pub mod wheel;

#[cfg(test)]
mod tests;

use std::time::{Duration, Instant};

use crate::capture::Frame;
use crate::error::{InputError, SessionError};
use crate::input::ActionExecutor;
use crate::ocr::{OcrField, TextReader};
use crate::vision::Point;

pub use slots::SlotRunner;
pub use wheel::WheelRunner;

/// What to do this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Nothing to do; just wait out the step delay.
    Wait,
    Click(Point),
    /// Several clicks back to back (chip stacking, bet adjustment).
    Sequence(Vec<Point>),
    Hover(Point),
}

impl Action {
    /// Whether this action commits something the pointer should then move
    /// away from.
    pub fn is_commit(&self) -> bool {
        matches!(self, Action::Click(_) | Action::Sequence(_))
    }
}

/// One decided step: the action plus how long to wait before the next
/// observation cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub action: Action,
    pub delay: Duration,
}

impl Step {
    pub fn wait(delay: Duration) -> Self {
        Self {
            action: Action::Wait,
            delay,
        }
    }

    pub fn click(point: Point, delay: Duration) -> Self {
        Self {
            action: Action::Click(point),
            delay,
        }
    }

    pub fn sequence(points: Vec<Point>, delay: Duration) -> Self {
        Self {
            action: Action::Sequence(points),
            delay,
        }
    }
}

/// Dispatch an action to the executor.
pub fn perform(action: &Action, input: &mut ActionExecutor) -> Result<(), InputError> {
    match action {
        Action::Wait => Ok(()),
        Action::Click(point) => input.click(*point),
        Action::Hover(point) => input.hover(*point),
        Action::Sequence(points) => {
            for point in points {
                input.click(*point)?;
            }
            Ok(())
        }
    }
}

/// The polymorphic contract every game type implements.
///
/// The driver loop is: clear interruptions → `observe` → `decide` → `act` →
/// sleep the step delay → repeat, until `finished`. `decide` is a function
/// of the machine's state and its latest observations only; it performs no
/// I/O. A stall (an expected transition overdue past the configured maximum
/// wait) forces the terminal state and comes back as
/// [`SessionError::Stalled`].
pub trait Runner {
    fn name(&self) -> &str;

    /// Collect the observations needed for the next decision from an
    /// already-captured frame.
    fn observe(&mut self, frame: &Frame, reader: &TextReader);

    /// Decide the next step and state transition.
    fn decide(&mut self, now: Instant) -> Result<Step, SessionError>;

    /// Execute the decided step.
    fn act(&mut self, step: &Step, input: &mut ActionExecutor) -> Result<(), SessionError>;

    /// True once the terminal state has fully unwound.
    fn finished(&self) -> bool;

    /// Begin an orderly move to the terminal state (duration elapsed or
    /// stop signal). Reachable from any state.
    fn begin_shutdown(&mut self);

    fn rounds(&self) -> &RoundLog;
}

/// Round and balance accounting shared by all game types.
#[derive(Debug)]
pub struct RoundLog {
    started: Instant,
    rounds_played: u32,
    starting_balance: Option<f64>,
    current_balance: Option<f64>,
    last_balance_check: Option<Instant>,
    balance_interval: Duration,
}

impl RoundLog {
    pub fn new(balance_interval: Duration) -> Self {
        Self {
            started: Instant::now(),
            rounds_played: 0,
            starting_balance: None,
            current_balance: None,
            last_balance_check: None,
            balance_interval,
        }
    }

    pub fn rounds_played(&self) -> u32 {
        self.rounds_played
    }

    pub fn starting_balance(&self) -> Option<f64> {
        self.starting_balance
    }

    pub fn current_balance(&self) -> Option<f64> {
        self.current_balance
    }

    /// Profit/loss so far, when both balances have been read.
    pub fn pnl(&self) -> Option<f64> {
        Some(self.current_balance? - self.starting_balance?)
    }

    /// Whether a periodic balance read is due.
    pub fn balance_due(&self, now: Instant) -> bool {
        match self.last_balance_check {
            None => true,
            Some(last) => now.duration_since(last) >= self.balance_interval,
        }
    }

    pub fn note_balance(&mut self, balance: f64, now: Instant) {
        if self.starting_balance.is_none() {
            self.starting_balance = Some(balance);
            log::info!("starting balance: ${balance:.2}");
        }
        self.current_balance = Some(balance);
        self.last_balance_check = Some(now);
    }

    /// Record a completed round; a status line is logged every ten rounds.
    pub fn record_round(&mut self) {
        self.rounds_played += 1;
        log::debug!("round {} complete", self.rounds_played);
        if self.rounds_played % 10 == 0 {
            self.log_status();
        }
    }

    fn log_status(&self) {
        let elapsed_min = self.started.elapsed().as_secs_f64() / 60.0;
        match (self.current_balance, self.pnl()) {
            (Some(balance), Some(pnl)) => log::info!(
                "[round {}] {:.1} min | balance ${:.2} ({}{:.2})",
                self.rounds_played,
                elapsed_min,
                balance,
                if pnl >= 0.0 { "+$" } else { "-$" },
                pnl.abs()
            ),
            _ => log::info!("[round {}] {:.1} min", self.rounds_played, elapsed_min),
        }
    }
}

/// Try a balance read when one is due; failures are "value unknown this
/// cycle", logged and otherwise ignored.
pub(crate) fn maybe_read_balance(
    log: &mut RoundLog,
    field: Option<&OcrField>,
    frame: &Frame,
    reader: &TextReader,
) {
    let Some(field) = field else { return };
    let now = Instant::now();
    if !log.balance_due(now) {
        return;
    }
    match reader.read(frame, field) {
        Ok(value) => log.note_balance(value.as_f64(), now),
        Err(err) => log::warn!("balance read failed: {err}"),
    }
}
