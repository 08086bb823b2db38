//! Screen capture layer.
//!
//! Captures arrive in physical pixels while input coordinates are logical:
//! on HiDPI displays the two differ by an integer scale factor. The factor is
//! detected once at startup by comparing a capture against the monitor's
//! reported size, and every [`Frame`] carries it so downstream consumers can
//! convert match locations back to click space.

use image::RgbaImage;
use xcap::Monitor;

use crate::error::CaptureError;
use crate::vision::Region;

/// One screenshot plus the display scale it was captured at.
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbaImage,
    scale: u32,
}

impl Frame {
    pub fn new(image: RgbaImage, scale: u32) -> Self {
        Self {
            image,
            scale: scale.max(1),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn logical_width(&self) -> u32 {
        self.image.width() / self.scale
    }

    pub fn logical_height(&self) -> u32 {
        self.image.height() / self.scale
    }

    /// Crop a logical-space region out of the physical pixel buffer.
    ///
    /// The region is clipped to the frame first, so an oversized region
    /// yields a smaller crop rather than a panic.
    pub fn crop(&self, region: Region) -> RgbaImage {
        let clipped = region.clipped_to(self.logical_width(), self.logical_height());
        image::imageops::crop_imm(
            &self.image,
            clipped.x * self.scale,
            clipped.y * self.scale,
            clipped.w * self.scale,
            clipped.h * self.scale,
        )
        .to_image()
    }
}

/// Produces a snapshot of the current screen on demand.
pub trait FrameSource {
    fn grab(&mut self) -> Result<Frame, CaptureError>;
}

/// Captures the primary monitor via `xcap`.
pub struct MonitorCapture {
    scale: u32,
}

impl MonitorCapture {
    /// Connect to the primary monitor and detect the display scale factor.
    pub fn new() -> Result<Self, CaptureError> {
        let (image, logical_width) = capture_primary()?;
        let scale = if logical_width > 0 {
            (image.width() / logical_width).max(1)
        } else {
            1
        };
        log::info!(
            "capture source ready: {}x{} physical, scale factor {}",
            image.width(),
            image.height(),
            scale
        );
        Ok(Self { scale })
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }
}

impl FrameSource for MonitorCapture {
    fn grab(&mut self) -> Result<Frame, CaptureError> {
        let (image, _) = capture_primary()?;
        Ok(Frame::new(image, self.scale))
    }
}

/// Grab the primary monitor (first monitor when none is marked primary).
/// Returns the capture and the monitor's reported width.
fn capture_primary() -> Result<(RgbaImage, u32), CaptureError> {
    let monitors = Monitor::all()?;
    let monitor = monitors
        .iter()
        .find(|m| m.is_primary().unwrap_or(false))
        .or_else(|| monitors.first())
        .ok_or(CaptureError::NoMonitor)?;
    let width = monitor.width()?;
    let image = monitor.capture_image()?;
    Ok((image, width))
}

/// Replays a fixed sequence of frames, repeating the last one.
///
/// Lets state-machine tests script exactly what the "screen" shows on each
/// loop iteration.
#[cfg(test)]
pub struct ScriptedFrames {
    frames: Vec<Frame>,
    cursor: usize,
}

#[cfg(test)]
impl ScriptedFrames {
    pub fn new(frames: Vec<Frame>) -> Self {
        assert!(!frames.is_empty(), "scripted source needs at least one frame");
        Self { frames, cursor: 0 }
    }
}

#[cfg(test)]
impl FrameSource for ScriptedFrames {
    fn grab(&mut self) -> Result<Frame, CaptureError> {
        let frame = self.frames[self.cursor.min(self.frames.len() - 1)].clone();
        self.cursor += 1;
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn crop_respects_display_scale() {
        // 2x display: logical 20x20, physical 40x40. Paint one logical pixel.
        let mut image = RgbaImage::from_pixel(40, 40, Rgba([0, 0, 0, 255]));
        for py in 20..22 {
            for px in 10..12 {
                image.put_pixel(px, py, Rgba([255, 255, 255, 255]));
            }
        }
        let frame = Frame::new(image, 2);
        assert_eq!(frame.logical_width(), 20);

        let crop = frame.crop(Region::new(5, 10, 2, 2));
        assert_eq!(crop.width(), 4);
        assert_eq!(crop.height(), 4);
        // The painted logical pixel (5, 10) lands at the crop origin.
        assert_eq!(crop.get_pixel(0, 0)[0], 255);
        assert_eq!(crop.get_pixel(3, 3)[0], 0);
    }

    #[test]
    fn crop_clips_out_of_range_region() {
        let frame = Frame::new(RgbaImage::new(30, 30), 1);
        let crop = frame.crop(Region::new(20, 20, 50, 50));
        assert_eq!(crop.width(), 10);
        assert_eq!(crop.height(), 10);
    }
}
