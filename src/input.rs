//! Synthetic mouse input with human-like timing.
//!
//! Every physical action gets a small random positional jitter and random
//! pre/post delays so repeated clicks are never pixel- or millisecond-
//! identical, and so the target UI has time to finish transition animations
//! before the next observation. All randomness flows through a seedable
//! generator; a fixed seed makes the whole click stream reproducible.

use std::thread;
use std::time::Duration;

use enigo::{Button, Coordinate, Direction, Enigo, Mouse, Settings};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;

use crate::error::InputError;
use crate::vision::Point;

/// Timing and jitter parameters for the executor.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Pacing {
    /// Maximum positional jitter in each axis, in logical pixels.
    pub jitter_px: i32,
    /// Delay range sampled before each physical action, in ms.
    pub pre_delay_ms: (u64, u64),
    /// Delay range sampled after each physical action, in ms.
    pub post_delay_ms: (u64, u64),
    /// Neutral point to rest the pointer on after committing actions, so it
    /// does not occlude assets or trigger hover effects.
    pub park: Option<Point>,
    /// Fixed RNG seed. Unset means seeded from OS entropy.
    pub seed: Option<u64>,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            jitter_px: 5,
            pre_delay_ms: (100, 300),
            post_delay_ms: (300, 1000),
            park: None,
            seed: None,
        }
    }
}

impl Pacing {
    /// No jitter, no delays. For tests that assert exact coordinates.
    pub fn zero() -> Self {
        Self {
            jitter_px: 0,
            pre_delay_ms: (0, 0),
            post_delay_ms: (0, 0),
            park: None,
            seed: Some(0),
        }
    }
}

/// Low-level pointer backend.
pub trait PointerDevice {
    fn move_to(&mut self, point: Point) -> Result<(), InputError>;
    fn click(&mut self, point: Point) -> Result<(), InputError>;
}

/// Pointer backed by the OS input layer via `enigo`.
pub struct SystemPointer {
    enigo: Enigo,
}

impl SystemPointer {
    pub fn new() -> Result<Self, InputError> {
        Ok(Self {
            enigo: Enigo::new(&Settings::default())?,
        })
    }
}

impl PointerDevice for SystemPointer {
    fn move_to(&mut self, point: Point) -> Result<(), InputError> {
        self.enigo.move_mouse(point.x, point.y, Coordinate::Abs)?;
        Ok(())
    }

    fn click(&mut self, point: Point) -> Result<(), InputError> {
        self.enigo.move_mouse(point.x, point.y, Coordinate::Abs)?;
        self.enigo.button(Button::Left, Direction::Click)?;
        Ok(())
    }
}

/// Performs clicks and hovers with jitter and randomized delays.
///
/// Calls are synchronous: they return only after the input has been
/// dispatched and the post-delay has elapsed. The executor never verifies
/// the effect of a click — the state machine re-observes instead.
pub struct ActionExecutor {
    pointer: Box<dyn PointerDevice>,
    rng: ChaCha8Rng,
    pacing: Pacing,
}

impl ActionExecutor {
    pub fn new(pointer: Box<dyn PointerDevice>, pacing: Pacing) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(pacing.seed.unwrap_or_else(rand::random));
        Self {
            pointer,
            rng,
            pacing,
        }
    }

    /// Click at `point`, jittered.
    pub fn click(&mut self, point: Point) -> Result<(), InputError> {
        let target = self.jittered(point);
        self.pause(self.pacing.pre_delay_ms);
        log::info!("click at ({}, {})", target.x, target.y);
        self.pointer.click(target)?;
        self.pause(self.pacing.post_delay_ms);
        Ok(())
    }

    /// Move the pointer to `point` without clicking.
    pub fn hover(&mut self, point: Point) -> Result<(), InputError> {
        let target = self.jittered(point);
        log::debug!("hover at ({}, {})", target.x, target.y);
        self.pointer.move_to(target)?;
        self.pause(self.pacing.post_delay_ms);
        Ok(())
    }

    /// Rest the pointer on the configured neutral point, if any.
    pub fn park(&mut self) -> Result<(), InputError> {
        match self.pacing.park {
            Some(point) => self.hover(point),
            None => Ok(()),
        }
    }

    fn jittered(&mut self, point: Point) -> Point {
        let radius = self.pacing.jitter_px;
        if radius == 0 {
            return point;
        }
        Point::new(
            point.x + self.rng.random_range(-radius..=radius),
            point.y + self.rng.random_range(-radius..=radius),
        )
    }

    fn pause(&mut self, (lo, hi): (u64, u64)) {
        if hi == 0 {
            return;
        }
        let ms = if lo >= hi {
            lo
        } else {
            self.rng.random_range(lo..=hi)
        };
        if ms > 0 {
            thread::sleep(Duration::from_millis(ms));
        }
    }
}

#[cfg(test)]
pub use recording::{PointerEvent, RecordingPointer};
