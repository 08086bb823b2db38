//! Template matching against captured frames.
//!
//! Matching is normalized cross-correlation, so minor rendering differences
//! (anti-aliasing, compression artifacts) degrade the confidence score
//! instead of breaking the match outright. All lookups are pure functions of
//! the frame and asset passed in; nothing here captures the screen.

use image::DynamicImage;
use imageproc::template_matching::{MatchTemplateMethod, match_template};

use crate::capture::Frame;
use crate::vision::{Asset, Point, Region};

/// Result of a single asset lookup.
///
/// A miss is a valid observation, not an error: callers decide whether
/// absence means "still spinning" or counts against a stall budget. `point`
/// is the logical-space center of the best candidate either way.
#[derive(Debug, Clone, Copy)]
pub struct Observation {
    pub found: bool,
    pub point: Point,
    pub confidence: f32,
}

impl Observation {
    fn miss(point: Point) -> Self {
        Self {
            found: false,
            point,
            confidence: 0.0,
        }
    }
}

/// Find the best match for `asset` in `frame`.
///
/// The search is confined to the asset's search region when it has one.
/// `found` is true iff the best correlation reaches the asset's threshold.
pub fn locate(frame: &Frame, asset: &Asset) -> Observation {
    let full = Region::new(0, 0, frame.logical_width(), frame.logical_height());
    let scope = asset
        .search_region()
        .map(|r| r.clipped_to(full.w, full.h))
        .unwrap_or(full);
    if scope.is_empty() {
        return Observation::miss(scope.center());
    }

    let haystack = DynamicImage::ImageRgba8(frame.crop(scope)).to_luma8();
    let template = asset.template();
    if template.width() > haystack.width() || template.height() > haystack.height() {
        log::debug!(
            "asset '{}' template ({}x{}) larger than search area ({}x{})",
            asset.name(),
            template.width(),
            template.height(),
            haystack.width(),
            haystack.height()
        );
        return Observation::miss(scope.center());
    }

    let scores = match_template(
        &haystack,
        template,
        MatchTemplateMethod::CrossCorrelationNormalized,
    );

    let mut best = 0.0f32;
    let mut best_pos = (0u32, 0u32);
    for (x, y, pixel) in scores.enumerate_pixels() {
        let score = pixel[0];
        if score.is_finite() && score > best {
            best = score;
            best_pos = (x, y);
        }
    }

    let confidence = best.clamp(0.0, 1.0);
    let scale = frame.scale();
    // Center of the matched template, physical -> logical screen space.
    let center_x = (scope.x * scale + best_pos.0 + template.width() / 2) / scale;
    let center_y = (scope.y * scale + best_pos.1 + template.height() / 2) / scale;
    let point = Point::new(center_x as i32, center_y as i32);

    let found = confidence >= asset.threshold();
    if found {
        log::debug!(
            "asset '{}' at ({}, {}) confidence {:.3}",
            asset.name(),
            point.x,
            point.y,
            confidence
        );
    } else {
        log::debug!(
            "asset '{}' not found (best {:.3}, need {:.3})",
            asset.name(),
            confidence,
            asset.threshold()
        );
    }

    Observation {
        found,
        point,
        confidence,
    }
}

/// Quick presence check.
pub fn appears(frame: &Frame, asset: &Asset) -> bool {
    locate(frame, asset).found
}
