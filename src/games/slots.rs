//! Generic slot machine runner.
//!
//! Two spin modes:
//!   - manual: the bot clicks spin every cycle and waits out each round
//!   - autoplay: the bot activates the game's own autoplay once and then
//!     only monitors for bonus rounds and session end
//!
//! Bonus rounds are passive here: when the indicator shows, the runner
//! stops clicking and waits for it to clear before resuming.

use std::time::{Duration, Instant};

use crate::capture::Frame;
use crate::config::{GameConfig, SpinMode};
use crate::error::{ConfigError, SessionError};
use crate::input::ActionExecutor;
use crate::ocr::{OcrField, TextReader};
use crate::vision::{self, Asset, Observation};

use super::{RoundLog, Runner, Step, maybe_read_balance, perform};

// Asset and OCR field names the slot machine references in a config.
pub const SPIN_BUTTON: &str = "spin_button";
pub const AUTOPLAY_BUTTON: &str = "autoplay_button";
pub const AUTOPLAY_CONFIRM: &str = "autoplay_confirm";
pub const AUTOPLAY_STOP: &str = "autoplay_stop";
pub const BONUS_INDICATOR: &str = "bonus_indicator";
pub const BET_UP: &str = "bet_up";
pub const BET_DOWN: &str = "bet_down";
pub const BET_AMOUNT_FIELD: &str = "bet_amount";
pub const BALANCE_FIELD: &str = "balance";

/// Clicks issued to drive the bet to its minimum before stepping up.
const FLOOR_CLICKS: usize = 20;
/// Safety bound on bet-up steps.
const MAX_RAISE_STEPS: u32 = 50;
/// Bets within this distance of the target count as equal.
const BET_EPSILON: f64 = 0.005;
/// Pause between bet adjustment clicks.
const BET_STEP_DELAY: Duration = Duration::from_millis(200);
/// How long to wait for an autoplay confirmation dialog before assuming
/// there is none.
const CONFIRM_GRACE: Duration = Duration::from_secs(5);

/// Everything a slot runner needs, resolved ahead of time.
pub struct SlotParams {
    pub game_name: String,
    pub mode: SpinMode,
    pub spin_button: Option<Asset>,
    pub autoplay_button: Option<Asset>,
    pub autoplay_confirm: Option<Asset>,
    pub autoplay_stop: Option<Asset>,
    pub bonus: Option<Asset>,
    pub bet_up: Option<Asset>,
    pub bet_down: Option<Asset>,
    pub bet_field: Option<OcrField>,
    pub balance_field: Option<OcrField>,
    pub target_bet: f64,
    pub settle_delay: Duration,
    pub poll: Duration,
    pub max_wait: Duration,
    pub balance_interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    SetBet,
    Ready,
    Spinning,
    RoundResult,
    Bonus,
    EngageAutoplay,
    ConfirmAutoplay,
    Monitoring,
    Ending,
    Finished,
}

impl SlotState {
    fn name(&self) -> &'static str {
        match self {
            SlotState::SetBet => "set_bet",
            SlotState::Ready => "ready",
            SlotState::Spinning => "spinning",
            SlotState::RoundResult => "round_result",
            SlotState::Bonus => "bonus",
            SlotState::EngageAutoplay => "engage_autoplay",
            SlotState::ConfirmAutoplay => "confirm_autoplay",
            SlotState::Monitoring => "monitoring",
            SlotState::Ending => "ending",
            SlotState::Finished => "finished",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BetPhase {
    Check,
    Raise,
}

/// Latest per-cycle observations. Cleared on every observe pass.
#[derive(Debug, Default, Clone, Copy)]
struct SlotObservations {
    spin: Option<Observation>,
    autoplay: Option<Observation>,
    autoplay_confirm: Option<Observation>,
    autoplay_stop: Option<Observation>,
    bonus: Option<Observation>,
    bet_up: Option<Observation>,
    bet_down: Option<Observation>,
    bet_value: Option<f64>,
}

pub struct SlotRunner {
    name: String,
    mode: SpinMode,
    spin_button: Option<Asset>,
    autoplay_button: Option<Asset>,
    autoplay_confirm: Option<Asset>,
    autoplay_stop: Option<Asset>,
    bonus: Option<Asset>,
    bet_up: Option<Asset>,
    bet_down: Option<Asset>,
    bet_field: Option<OcrField>,
    balance_field: Option<OcrField>,
    target_bet: f64,
    settle_delay: Duration,
    poll: Duration,
    max_wait: Duration,
    state: SlotState,
    state_entered: Instant,
    bet_phase: BetPhase,
    raise_attempts: u32,
    seen: SlotObservations,
    log: RoundLog,
}

impl SlotRunner {
    pub fn new(params: SlotParams) -> Result<Self, ConfigError> {
        match params.mode {
            SpinMode::Manual if params.spin_button.is_none() => {
                return Err(ConfigError::MissingAsset {
                    name: SPIN_BUTTON.to_string(),
                });
            }
            SpinMode::Autoplay if params.autoplay_button.is_none() => {
                return Err(ConfigError::MissingAsset {
                    name: AUTOPLAY_BUTTON.to_string(),
                });
            }
            _ => {}
        }

        let wants_bet_setup = params.bet_field.is_some() && params.bet_down.is_some();
        let state = if wants_bet_setup {
            SlotState::SetBet
        } else {
            Self::first_play_state(params.mode)
        };
        log::info!(
            "slot runner '{}': {:?} mode, target bet ${:.2}",
            params.game_name,
            params.mode,
            params.target_bet
        );

        Ok(Self {
            name: params.game_name,
            mode: params.mode,
            spin_button: params.spin_button,
            autoplay_button: params.autoplay_button,
            autoplay_confirm: params.autoplay_confirm,
            autoplay_stop: params.autoplay_stop,
            bonus: params.bonus,
            bet_up: params.bet_up,
            bet_down: params.bet_down,
            bet_field: params.bet_field,
            balance_field: params.balance_field,
            target_bet: params.target_bet,
            settle_delay: params.settle_delay,
            poll: params.poll,
            max_wait: params.max_wait,
            state,
            state_entered: Instant::now(),
            bet_phase: BetPhase::Check,
            raise_attempts: 0,
            seen: SlotObservations::default(),
            log: RoundLog::new(params.balance_interval),
        })
    }

    /// Resolve a slot runner from a loaded config; any missing required
    /// asset fails here, before the session starts.
    pub fn from_config(config: &GameConfig) -> Result<Self, ConfigError> {
        let slot = config.slot.clone().ok_or(ConfigError::MissingSection {
            kind: "slot",
            section: "slot",
        })?;
        let (spin_button, autoplay_button) = match slot.spin_mode {
            SpinMode::Manual => (
                Some(config.asset(SPIN_BUTTON)?),
                config.optional_asset(AUTOPLAY_BUTTON),
            ),
            SpinMode::Autoplay => (
                config.optional_asset(SPIN_BUTTON),
                Some(config.asset(AUTOPLAY_BUTTON)?),
            ),
        };
        Self::new(SlotParams {
            game_name: config.name.clone(),
            mode: slot.spin_mode,
            spin_button,
            autoplay_button,
            autoplay_confirm: config.optional_asset(AUTOPLAY_CONFIRM),
            autoplay_stop: config.optional_asset(AUTOPLAY_STOP),
            bonus: config.optional_asset(BONUS_INDICATOR),
            bet_up: config.optional_asset(BET_UP),
            bet_down: config.optional_asset(BET_DOWN),
            bet_field: config.ocr_field(BET_AMOUNT_FIELD),
            balance_field: config.ocr_field(BALANCE_FIELD),
            target_bet: slot.target_bet,
            settle_delay: slot.settle_delay(),
            poll: config.session.poll_interval(),
            max_wait: config.session.max_wait(),
            balance_interval: config.session.balance_interval(),
        })
    }

    fn first_play_state(mode: SpinMode) -> SlotState {
        match mode {
            SpinMode::Manual => SlotState::Ready,
            SpinMode::Autoplay => SlotState::EngageAutoplay,
        }
    }

    fn transition(&mut self, next: SlotState, now: Instant) {
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

    fn found(observation: Option<Observation>) -> Option<Observation> {
        observation.filter(|o| o.found)
    }

    /// State after bet setup completes (or is abandoned).
    fn after_bet_state(&self) -> SlotState {
        Self::first_play_state(self.mode)
    }

    fn decide_set_bet(&mut self, now: Instant) -> Step {
        match self.bet_phase {
            BetPhase::Check => {
                if let Some(current) = self.seen.bet_value {
                    if (current - self.target_bet).abs() < BET_EPSILON {
                        log::info!("bet already at target ${current:.2}");
                        self.transition(self.after_bet_state(), now);
                        return Step::wait(Duration::ZERO);
                    }
                    if let Some(down) = Self::found(self.seen.bet_down) {
                        log::info!(
                            "adjusting bet ${current:.2} -> ${:.2}: dropping to minimum first",
                            self.target_bet
                        );
                        self.bet_phase = BetPhase::Raise;
                        return Step::sequence(vec![down.point; FLOOR_CLICKS], BET_STEP_DELAY);
                    }
                    log::warn!("bet is ${current:.2} but bet_down is not on screen, leaving it");
                    self.transition(self.after_bet_state(), now);
                    return Step::wait(Duration::ZERO);
                }
                if self.overdue(now) {
                    log::warn!("could not read bet amount, skipping bet setup");
                    self.transition(self.after_bet_state(), now);
                    return Step::wait(Duration::ZERO);
                }
                Step::wait(self.poll)
            }
            BetPhase::Raise => {
                if let Some(current) = self.seen.bet_value
                    && current + BET_EPSILON >= self.target_bet
                {
                    log::info!("bet set to ${current:.2}");
                    self.transition(self.after_bet_state(), now);
                    return Step::wait(Duration::ZERO);
                }
                if self.raise_attempts >= MAX_RAISE_STEPS {
                    log::warn!("bet never reached target after {MAX_RAISE_STEPS} steps, moving on");
                    self.transition(self.after_bet_state(), now);
                    return Step::wait(Duration::ZERO);
                }
                if let Some(up) = Self::found(self.seen.bet_up) {
                    self.raise_attempts += 1;
                    return Step::click(up.point, BET_STEP_DELAY);
                }
                if self.overdue(now) {
                    log::warn!("bet_up not found while raising bet, moving on");
                    self.transition(self.after_bet_state(), now);
                    return Step::wait(Duration::ZERO);
                }
                Step::wait(self.poll)
            }
        }
    }
}

impl Runner for SlotRunner {
    fn name(&self) -> &str {
        &self.name
    }

    fn observe(&mut self, frame: &Frame, reader: &TextReader) {
        self.seen = SlotObservations::default();
        match self.state {
            SlotState::SetBet => {
                self.seen.bet_down = self.bet_down.as_ref().map(|a| vision::locate(frame, a));
                self.seen.bet_up = self.bet_up.as_ref().map(|a| vision::locate(frame, a));
                if let Some(field) = &self.bet_field {
                    match reader.read(frame, field) {
                        Ok(value) => self.seen.bet_value = Some(value.as_f64()),
                        Err(err) => log::debug!("bet amount unreadable this cycle: {err}"),
                    }
                }
            }
            SlotState::Ready => {
                self.seen.spin = self.spin_button.as_ref().map(|a| vision::locate(frame, a));
            }
            SlotState::Spinning | SlotState::RoundResult => {
                self.seen.bonus = self.bonus.as_ref().map(|a| vision::locate(frame, a));
                self.seen.spin = self.spin_button.as_ref().map(|a| vision::locate(frame, a));
            }
            SlotState::Bonus => {
                self.seen.bonus = self.bonus.as_ref().map(|a| vision::locate(frame, a));
            }
            SlotState::EngageAutoplay => {
                self.seen.autoplay = self
                    .autoplay_button
                    .as_ref()
                    .map(|a| vision::locate(frame, a));
            }
            SlotState::ConfirmAutoplay => {
                self.seen.autoplay_confirm = self
                    .autoplay_confirm
                    .as_ref()
                    .map(|a| vision::locate(frame, a));
            }
            SlotState::Monitoring => {
                self.seen.bonus = self.bonus.as_ref().map(|a| vision::locate(frame, a));
                self.seen.autoplay = self
                    .autoplay_button
                    .as_ref()
                    .map(|a| vision::locate(frame, a));
            }
            SlotState::Ending => {
                self.seen.autoplay_stop = self
                    .autoplay_stop
                    .as_ref()
                    .map(|a| vision::locate(frame, a));
            }
            SlotState::Finished => {}
        }
        maybe_read_balance(&mut self.log, self.balance_field.as_ref(), frame, reader);
    }

    fn decide(&mut self, now: Instant) -> Result<Step, SessionError> {
        let step = match self.state {
            SlotState::SetBet => self.decide_set_bet(now),
            SlotState::Ready => {
                if let Some(spin) = Self::found(self.seen.spin) {
                    self.transition(SlotState::Spinning, now);
                    Step::click(spin.point, self.settle_delay)
                } else if self.overdue(now) {
                    let err = self.stalled(now, SPIN_BUTTON);
                    self.transition(SlotState::Finished, now);
                    return Err(err);
                } else {
                    Step::wait(self.poll)
                }
            }
            SlotState::Spinning => {
                if Self::found(self.seen.bonus).is_some() {
                    log::info!("bonus round detected, waiting it out");
                    self.transition(SlotState::Bonus, now);
                    Step::wait(self.poll)
                } else if Self::found(self.seen.spin).is_some() {
                    self.transition(SlotState::RoundResult, now);
                    Step::wait(Duration::ZERO)
                } else if self.overdue(now) {
                    let err = self.stalled(now, SPIN_BUTTON);
                    self.transition(SlotState::Finished, now);
                    return Err(err);
                } else {
                    Step::wait(self.poll)
                }
            }
            SlotState::RoundResult => {
                self.log.record_round();
                self.transition(SlotState::Ready, now);
                Step::wait(self.poll)
            }
            SlotState::Bonus => {
                if Self::found(self.seen.bonus).is_some() {
                    if self.overdue(now) {
                        let err = self.stalled(now, "bonus indicator to clear");
                        self.transition(SlotState::Finished, now);
                        return Err(err);
                    }
                    Step::wait(self.poll)
                } else {
                    log::info!("bonus round complete");
                    match self.mode {
                        SpinMode::Manual => self.transition(SlotState::RoundResult, now),
                        SpinMode::Autoplay => {
                            self.log.record_round();
                            self.transition(SlotState::Monitoring, now);
                        }
                    }
                    Step::wait(Duration::ZERO)
                }
            }
            SlotState::EngageAutoplay => {
                if let Some(button) = Self::found(self.seen.autoplay) {
                    log::info!("starting autoplay");
                    let next = if self.autoplay_confirm.is_some() {
                        SlotState::ConfirmAutoplay
                    } else {
                        SlotState::Monitoring
                    };
                    self.transition(next, now);
                    Step::click(button.point, self.poll)
                } else if self.overdue(now) {
                    let err = self.stalled(now, AUTOPLAY_BUTTON);
                    self.transition(SlotState::Finished, now);
                    return Err(err);
                } else {
                    Step::wait(self.poll)
                }
            }
            SlotState::ConfirmAutoplay => {
                if let Some(confirm) = Self::found(self.seen.autoplay_confirm) {
                    self.transition(SlotState::Monitoring, now);
                    Step::click(confirm.point, self.poll)
                } else if now.duration_since(self.state_entered) > CONFIRM_GRACE {
                    log::debug!("no autoplay confirmation dialog appeared");
                    self.transition(SlotState::Monitoring, now);
                    Step::wait(Duration::ZERO)
                } else {
                    Step::wait(self.poll)
                }
            }
            // Monitoring expects nothing to appear, so it carries no stall
            // budget; overlays pausing autoplay are handled by the guard
            // and re-engagement below.
            SlotState::Monitoring => {
                if Self::found(self.seen.bonus).is_some() {
                    log::info!("bonus round detected during autoplay");
                    self.transition(SlotState::Bonus, now);
                    Step::wait(self.poll)
                } else if Self::found(self.seen.autoplay).is_some() {
                    log::info!("autoplay stopped, re-engaging");
                    self.transition(SlotState::EngageAutoplay, now);
                    Step::wait(Duration::ZERO)
                } else {
                    Step::wait(self.poll)
                }
            }
            SlotState::Ending => {
                if self.mode == SpinMode::Autoplay
                    && let Some(stop) = Self::found(self.seen.autoplay_stop)
                {
                    log::info!("cancelling autoplay");
                    self.transition(SlotState::Finished, now);
                    Step::click(stop.point, Duration::ZERO)
                } else {
                    self.transition(SlotState::Finished, now);
                    Step::wait(Duration::ZERO)
                }
            }
            SlotState::Finished => Step::wait(Duration::ZERO),
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
        self.state == SlotState::Finished
    }

    fn begin_shutdown(&mut self) {
        if self.state != SlotState::Finished && self.state != SlotState::Ending {
            log::info!("session ending, unwinding from state '{}'", self.state.name());
            self.transition(SlotState::Ending, Instant::now());
        }
    }

    fn rounds(&self) -> &RoundLog {
        &self.log
    }
}
