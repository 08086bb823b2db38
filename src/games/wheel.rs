//! Live-dealer wheel game runner.
//!
//! The wheel has no spin button to drive; instead a dedicated indicator
//! signals that the betting window is open. When it appears the runner
//! stacks chips on each configured segment exactly once, then sits out the
//! spin until the window reopens. Bets are idempotent per window: once the
//! state says the bet is placed, further sightings of the indicator in the
//! same window place nothing.

use std::time::{Duration, Instant};

use crate::capture::Frame;
use crate::config::{GameConfig, Segment};
use crate::error::{ConfigError, SessionError};
use crate::input::ActionExecutor;
use crate::ocr::{OcrField, TextReader};
use crate::vision::{self, Asset, Observation, Point};

use super::{RoundLog, Runner, Step, maybe_read_balance, perform};

/// Asset name signalling that bets are being accepted.
pub const BETTING_OPEN: &str = "betting_open";
pub const BALANCE_FIELD: &str = "balance";

/// Everything a wheel runner needs, resolved ahead of time.
pub struct WheelParams {
    pub game_name: String,
    pub betting_open: Asset,
    pub segments: Vec<Segment>,
    pub confirm: Option<Point>,
    pub balance_field: Option<OcrField>,
    pub poll: Duration,
    pub max_wait: Duration,
    pub balance_interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WheelState {
    /// Betting closed: wheel spinning, result playing out, or between rounds.
    Idle,
    /// Bet committed for the current window.
    BetPlaced,
    Ending,
    Finished,
}

impl WheelState {
    fn name(&self) -> &'static str {
        match self {
            WheelState::Idle => "idle",
            WheelState::BetPlaced => "bet_placed",
            WheelState::Ending => "ending",
            WheelState::Finished => "finished",
        }
    }
}

pub struct WheelRunner {
    name: String,
    betting_open: Asset,
    segments: Vec<Segment>,
    confirm: Option<Point>,
    balance_field: Option<OcrField>,
    poll: Duration,
    max_wait: Duration,
    state: WheelState,
    state_entered: Instant,
    open: Option<Observation>,
    log: RoundLog,
}

impl WheelRunner {
    pub fn new(params: WheelParams) -> Result<Self, ConfigError> {
        if params.segments.is_empty() {
            return Err(ConfigError::NoSegments);
        }
        log::info!(
            "wheel runner '{}': {} segments configured",
            params.game_name,
            params.segments.len()
        );
        for segment in &params.segments {
            log::info!(
                "  segment '{}' at ({}, {}) x{}",
                segment.name,
                segment.click.x,
                segment.click.y,
                segment.stack.max(1)
            );
        }
        Ok(Self {
            name: params.game_name,
            betting_open: params.betting_open,
            segments: params.segments,
            confirm: params.confirm,
            balance_field: params.balance_field,
            poll: params.poll,
            max_wait: params.max_wait,
            state: WheelState::Idle,
            state_entered: Instant::now(),
            open: None,
            log: RoundLog::new(params.balance_interval),
        })
    }

    pub fn from_config(config: &GameConfig) -> Result<Self, ConfigError> {
        let wheel = config.wheel.clone().ok_or(ConfigError::MissingSection {
            kind: "wheel",
            section: "wheel",
        })?;
        Self::new(WheelParams {
            game_name: config.name.clone(),
            betting_open: config.asset(BETTING_OPEN)?,
            segments: wheel.segments,
            confirm: wheel.confirm,
            balance_field: config.ocr_field(BALANCE_FIELD),
            poll: config.session.poll_interval(),
            max_wait: config.session.max_wait(),
            balance_interval: config.session.balance_interval(),
        })
    }

    fn transition(&mut self, next: WheelState, now: Instant) {
        if self.state != next {
            log::info!("state: {} -> {}", self.state.name(), next.name());
            self.state = next;
            self.state_entered = now;
        }
    }

    fn overdue(&self, now: Instant) -> bool {
        now.duration_since(self.state_entered) > self.max_wait
    }

    fn stalled(&self, now: Instant, expecting: &str) -> SessionError {
        SessionError::Stalled {
            game: self.name.clone(),
            state: self.state.name().to_string(),
            expecting: expecting.to_string(),
            waited: now.duration_since(self.state_entered),
        }
    }

    fn betting_open_seen(&self) -> bool {
        self.open.is_some_and(|o| o.found)
    }

    /// The full chip-stacking click sequence for one betting window.
    fn bet_clicks(&self) -> Vec<Point> {
        let mut clicks = Vec::new();
        for segment in &self.segments {
            for _ in 0..segment.stack.max(1) {
                clicks.push(segment.click);
            }
        }
        if let Some(confirm) = self.confirm {
            clicks.push(confirm);
        }
        clicks
    }
}

impl Runner for WheelRunner {
    fn name(&self) -> &str {
        &self.name
    }

    fn observe(&mut self, frame: &Frame, reader: &TextReader) {
        self.open = match self.state {
            WheelState::Idle | WheelState::BetPlaced => {
                Some(vision::locate(frame, &self.betting_open))
            }
            WheelState::Ending | WheelState::Finished => None,
        };
        maybe_read_balance(&mut self.log, self.balance_field.as_ref(), frame, reader);
    }

    fn decide(&mut self, now: Instant) -> Result<Step, SessionError> {
        let step = match self.state {
            WheelState::Idle => {
                if self.betting_open_seen() {
                    let clicks = self.bet_clicks();
                    log::info!(
                        "betting window open, placing {} chips across {} segments",
                        clicks.len() - usize::from(self.confirm.is_some()),
                        self.segments.len()
                    );
                    self.transition(WheelState::BetPlaced, now);
                    Step::sequence(clicks, self.poll)
                } else if self.overdue(now) {
                    let err = self.stalled(now, BETTING_OPEN);
                    self.transition(WheelState::Finished, now);
                    return Err(err);
                } else {
                    Step::wait(self.poll)
                }
            }
            WheelState::BetPlaced => {
                if self.betting_open_seen() {
                    // Same window: the bet is already down, never re-click.
                    if self.overdue(now) {
                        let err = self.stalled(now, "betting window to close");
                        self.transition(WheelState::Finished, now);
                        return Err(err);
                    }
                    Step::wait(self.poll)
                } else {
                    self.log.record_round();
                    log::debug!("betting closed, waiting for the next window");
                    self.transition(WheelState::Idle, now);
                    Step::wait(self.poll)
                }
            }
            WheelState::Ending => {
                self.transition(WheelState::Finished, now);
                Step::wait(Duration::ZERO)
            }
            WheelState::Finished => Step::wait(Duration::ZERO),
        };
        Ok(step)
    }

    fn act(&mut self, step: &Step, input: &mut ActionExecutor) -> Result<(), SessionError> {
        perform(&step.action, input)?;
        if step.action.is_commit() {
            input.park()?;
        }
        Ok(())
    }

    fn finished(&self) -> bool {
        self.state == WheelState::Finished
    }

    fn begin_shutdown(&mut self) {
        if self.state != WheelState::Finished && self.state != WheelState::Ending {
            log::info!("session ending, unwinding from state '{}'", self.state.name());
            self.transition(WheelState::Ending, Instant::now());
        }
    }

    fn rounds(&self) -> &RoundLog {
        &self.log
    }
}
