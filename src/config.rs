//! Game configuration loading and validation.
//!
//! Configs are YAML documents produced by the capture workflow. The core
//! only reads them: assets and coordinates are never written or
//! recalibrated at runtime. Everything a state machine will reference is
//! resolved and validated here, before the first frame is captured, so a
//! stale or incomplete config fails the session at startup instead of
//! mid-play.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::guard::Overlay;
use crate::input::Pacing;
use crate::ocr::{FieldFormat, OcrField};
use crate::vision::{Asset, Point, Region};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
    Slot,
    Wheel,
}

impl GameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameKind::Slot => "slot",
            GameKind::Wheel => "wheel",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpinMode {
    #[default]
    Manual,
    Autoplay,
}

/// Session-wide timing knobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub duration_minutes: f64,
    pub poll_interval_ms: u64,
    /// Stall threshold: how long an expected asset may stay absent before
    /// the session is forced to its terminal state.
    pub max_wait_ms: u64,
    pub balance_check_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_minutes: 60.0,
            poll_interval_ms: 2000,
            max_wait_ms: 90_000,
            balance_check_secs: 30,
        }
    }
}

impl SessionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    pub fn balance_interval(&self) -> Duration {
        Duration::from_secs(self.balance_check_secs)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_minutes * 60.0)
    }
}

/// Slot-specific settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SlotConfig {
    #[serde(default)]
    pub spin_mode: SpinMode,
    #[serde(default = "default_target_bet")]
    pub target_bet: f64,
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

fn default_target_bet() -> f64 {
    0.20
}

fn default_settle_delay_ms() -> u64 {
    3000
}

impl SlotConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// One bet segment on the wheel layout.
#[derive(Debug, Clone, Deserialize)]
pub struct Segment {
    pub name: String,
    pub click: Point,
    /// Chip clicks per betting window.
    #[serde(default = "default_stack")]
    pub stack: u32,
}

fn default_stack() -> u32 {
    1
}

/// Wheel-game-specific settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WheelConfig {
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub confirm: Option<Point>,
}

// ── Raw document shape ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawGame {
    name: String,
    kind: GameKind,
}

#[derive(Debug, Deserialize)]
struct RawAsset {
    image: PathBuf,
    #[serde(default)]
    region: Option<Region>,
    #[serde(default)]
    threshold: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct RawOcrField {
    region: Region,
    format: FieldFormat,
}

#[derive(Debug, Deserialize)]
struct RawOverlay {
    name: String,
    asset: String,
    #[serde(default)]
    click: Option<Point>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    game: RawGame,
    #[serde(default)]
    session: SessionConfig,
    #[serde(default)]
    pacing: Pacing,
    #[serde(default)]
    assets: HashMap<String, RawAsset>,
    #[serde(default)]
    ocr: HashMap<String, RawOcrField>,
    #[serde(default)]
    overlays: Vec<RawOverlay>,
    #[serde(default)]
    slot: Option<SlotConfig>,
    #[serde(default)]
    wheel: Option<WheelConfig>,
}

// ── Resolved configuration ───────────────────────────────────────────────

/// A fully resolved game configuration: reference images decoded, regions
/// validated, overlay references checked. Read-only during play.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub name: String,
    pub kind: GameKind,
    pub session: SessionConfig,
    pub pacing: Pacing,
    assets: HashMap<String, Asset>,
    ocr_fields: HashMap<String, OcrField>,
    overlays: Vec<Overlay>,
    pub slot: Option<SlotConfig>,
    pub wheel: Option<WheelConfig>,
}

impl GameConfig {
    /// Load and validate a config file. Asset image paths are resolved
    /// relative to the config file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: RawConfig = serde_yml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::resolve(raw, base_dir)
    }

    fn resolve(raw: RawConfig, base_dir: &Path) -> Result<Self, ConfigError> {
        match raw.game.kind {
            GameKind::Slot if raw.slot.is_none() => {
                return Err(ConfigError::MissingSection {
                    kind: "slot",
                    section: "slot",
                });
            }
            GameKind::Wheel => {
                let wheel = raw.wheel.as_ref().ok_or(ConfigError::MissingSection {
                    kind: "wheel",
                    section: "wheel",
                })?;
                if wheel.segments.is_empty() {
                    return Err(ConfigError::NoSegments);
                }
            }
            _ => {}
        }

        let mut assets = HashMap::new();
        for (name, spec) in &raw.assets {
            let asset = Asset::load(
                name,
                &base_dir.join(&spec.image),
                spec.region,
                spec.threshold,
            )?;
            assets.insert(name.clone(), asset);
        }

        let mut ocr_fields = HashMap::new();
        for (name, spec) in &raw.ocr {
            if spec.region.is_empty() {
                return Err(ConfigError::EmptyRegion { name: name.clone() });
            }
            ocr_fields.insert(
                name.clone(),
                OcrField {
                    name: name.clone(),
                    region: spec.region,
                    format: spec.format,
                },
            );
        }

        let mut overlays = Vec::new();
        for spec in &raw.overlays {
            let asset = assets
                .get(&spec.asset)
                .cloned()
                .ok_or_else(|| ConfigError::UnknownOverlayAsset {
                    overlay: spec.name.clone(),
                    asset: spec.asset.clone(),
                })?;
            overlays.push(Overlay {
                name: spec.name.clone(),
                asset,
                dismiss: spec.click,
            });
        }

        log::info!(
            "loaded config '{}' ({}): {} assets, {} ocr fields, {} overlays",
            raw.game.name,
            raw.game.kind.as_str(),
            assets.len(),
            ocr_fields.len(),
            overlays.len()
        );

        Ok(Self {
            name: raw.game.name,
            kind: raw.game.kind,
            session: raw.session,
            pacing: raw.pacing,
            assets,
            ocr_fields,
            overlays,
            slot: raw.slot,
            wheel: raw.wheel,
        })
    }

    /// A required asset; missing means the config cannot drive the selected
    /// state machine and the session must not start.
    pub fn asset(&self, name: &str) -> Result<Asset, ConfigError> {
        self.assets
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::MissingAsset {
                name: name.to_string(),
            })
    }

    pub fn optional_asset(&self, name: &str) -> Option<Asset> {
        self.assets.get(name).cloned()
    }

    pub fn ocr_field(&self, name: &str) -> Option<OcrField> {
        self.ocr_fields.get(name).cloned()
    }

    pub fn overlays(&self) -> Vec<Overlay> {
        self.overlays.clone()
    }
}
