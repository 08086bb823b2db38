//! Visual element location.
//!
//! Assets are reference images captured from the live game UI; the matcher
//! answers "where is this asset right now, and how sure are we" against a
//! frame the caller already captured.

pub mod asset;
pub mod matcher;
pub mod region;


pub use asset::{Asset, DEFAULT_THRESHOLD};
pub use matcher::{Observation, appears, locate};
pub use region::{Point, Region};
