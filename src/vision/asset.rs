//! Reference images captured from the game UI.

use std::path::Path;

use image::GrayImage;

use crate::error::ConfigError;
use crate::vision::Region;

/// Confidence threshold used when a config does not specify one.
pub const DEFAULT_THRESHOLD: f32 = 0.85;

/// A named reference image plus where to look for it.
///
/// The template is stored grayscale in physical capture pixels, exactly as
/// the capture tool saved it. The optional search region (logical
/// coordinates) scopes the match to part of the screen, which is both faster
/// and avoids false positives from similar-looking elements elsewhere.
/// Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Asset {
    name: String,
    template: GrayImage,
    search_region: Option<Region>,
    threshold: f32,
}

impl Asset {
    /// Load an asset's reference image from disk.
    pub fn load(
        name: &str,
        path: &Path,
        search_region: Option<Region>,
        threshold: Option<f32>,
    ) -> Result<Self, ConfigError> {
        let image = image::open(path).map_err(|source| ConfigError::AssetImage {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_template(name, image.to_luma8(), search_region, threshold)
    }

    /// Build an asset from an already-decoded template.
    pub fn from_template(
        name: &str,
        template: GrayImage,
        search_region: Option<Region>,
        threshold: Option<f32>,
    ) -> Result<Self, ConfigError> {
        let threshold = threshold.unwrap_or(DEFAULT_THRESHOLD);
        if !(0.0..=1.0).contains(&threshold) || threshold == 0.0 {
            return Err(ConfigError::BadThreshold {
                name: name.to_string(),
                threshold,
            });
        }
        if template.width() == 0 || template.height() == 0 {
            return Err(ConfigError::EmptyRegion {
                name: name.to_string(),
            });
        }
        if let Some(region) = search_region
            && region.is_empty()
        {
            return Err(ConfigError::EmptyRegion {
                name: name.to_string(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            template,
            search_region,
            threshold,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &GrayImage {
        &self.template
    }

    pub fn search_region(&self) -> Option<Region> {
        self.search_region
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}
