//! Dismissal of blocking overlays (reality-check dialogs, promo popups).
//!
//! Overlays can appear at any moment and block every primary action, so the
//! session driver runs this check at the top of every loop iteration. The
//! guard is independent of game state: it only looks at the frame it is
//! given and clicks the configured dismissal target.

use crate::capture::Frame;
use crate::error::InputError;
use crate::input::ActionExecutor;
use crate::vision::{self, Asset, Point};

/// One known overlay and how to get rid of it.
#[derive(Debug, Clone)]
pub struct Overlay {
    pub name: String,
    pub asset: Asset,
    /// Explicit dismiss point. When unset, the matched template center is
    /// clicked instead.
    pub dismiss: Option<Point>,
}

/// Checks for known overlays and dismisses the first one found.
pub struct OverlayGuard {
    overlays: Vec<Overlay>,
}

impl OverlayGuard {
    pub fn new(overlays: Vec<Overlay>) -> Self {
        if overlays.is_empty() {
            log::debug!("no overlays configured");
        }
        Self { overlays }
    }

    /// Dismiss at most one overlay visible in `frame`.
    ///
    /// Returns true iff something was dismissed; the caller should then
    /// re-capture before acting, since the screen just changed. With no
    /// overlay on screen this performs no input at all.
    pub fn clear(
        &self,
        frame: &Frame,
        input: &mut ActionExecutor,
    ) -> Result<bool, InputError> {
        for overlay in &self.overlays {
            let seen = vision::locate(frame, &overlay.asset);
            if seen.found {
                log::info!(
                    "overlay '{}' detected (confidence {:.3}), dismissing",
                    overlay.name,
                    seen.confidence
                );
                let target = overlay.dismiss.unwrap_or(seen.point);
                input.click(target)?;
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, Luma, Rgba, RgbaImage};

    use super::*;
    use crate::input::{Pacing, RecordingPointer};
    use crate::vision::Region;

    fn banner() -> GrayImage {
        GrayImage::from_fn(20, 12, |x, _| {
            if x % 2 == 0 { Luma([255u8]) } else { Luma([0u8]) }
        })
    }

    fn blank_frame() -> Frame {
        Frame::new(RgbaImage::from_pixel(160, 120, Rgba([25, 25, 25, 255])), 1)
    }

    fn frame_with_banner() -> Frame {
        let mut screen = RgbaImage::from_pixel(160, 120, Rgba([25, 25, 25, 255]));
        for (x, y, pixel) in banner().enumerate_pixels() {
            let v = pixel[0];
            screen.put_pixel(60 + x, 40 + y, Rgba([v, v, v, 255]));
        }
        Frame::new(screen, 1)
    }

    fn guard(dismiss: Option<Point>) -> OverlayGuard {
        let asset = Asset::from_template(
            "reality_check",
            banner(),
            Some(Region::new(40, 30, 80, 40)),
            Some(0.9),
        )
        .unwrap();
        OverlayGuard::new(vec![Overlay {
            name: "reality_check".to_string(),
            asset,
            dismiss,
        }])
    }

    fn executor() -> (ActionExecutor, RecordingPointer) {
        let pointer = RecordingPointer::new();
        let exec = ActionExecutor::new(Box::new(pointer.clone()), Pacing::zero());
        (exec, pointer)
    }

    #[test]
    fn no_overlay_means_no_input_twice_in_a_row() {
        let guard = guard(None);
        let (mut exec, pointer) = executor();
        let frame = blank_frame();

        assert!(!guard.clear(&frame, &mut exec).unwrap());
        assert!(!guard.clear(&frame, &mut exec).unwrap());
        assert!(pointer.events().is_empty());
    }

    #[test]
    fn dismisses_at_the_configured_point() {
        let guard = guard(Some(Point::new(80, 55)));
        let (mut exec, pointer) = executor();

        assert!(guard.clear(&frame_with_banner(), &mut exec).unwrap());
        assert_eq!(pointer.clicks(), vec![Point::new(80, 55)]);
    }

    #[test]
    fn falls_back_to_the_matched_center() {
        let guard = guard(None);
        let (mut exec, pointer) = executor();

        assert!(guard.clear(&frame_with_banner(), &mut exec).unwrap());
        // Banner pasted at (60, 40), 20x12 template: center (70, 46).
        assert_eq!(pointer.clicks(), vec![Point::new(70, 46)]);
    }
}
