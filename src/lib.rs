//! Perception-and-control core for playing casino leaderboard games
//! through a browser UI that offers no programmatic API.
//!
//! The loop is: capture a frame, clear any blocking overlay, let the active
//! game state machine observe / decide / act, then wait out the step's
//! delay. Reference images, screen regions, click coordinates and
//! thresholds all come from a capture-tool-produced config; the core only
//! reads them.

pub mod capture;
pub mod config;
pub mod error;
pub mod games;
pub mod guard;
pub mod input;
pub mod ocr;
pub mod session;
pub mod vision;

pub use error::{SessionError, SessionResult};
pub use session::{SessionDriver, SessionSummary};
