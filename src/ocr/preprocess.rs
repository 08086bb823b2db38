//! Image preparation for OCR.
//!
//! Balance and bet text is small and anti-aliased; raw OCR on it is
//! unreliable. Every read goes through the same pipeline: grayscale, Otsu
//! binarization, auto-invert so the engine always sees dark glyphs on white,
//! cubic upscale, and a white border so glyphs never touch the image edge.

use image::{DynamicImage, GrayImage, Luma, RgbaImage, imageops};
use imageproc::contrast::{ThresholdType, otsu_level, threshold};

/// Upscale factor applied before OCR.
pub const UPSCALE: u32 = 2;

/// White padding (px) added around the processed image.
pub const BORDER: u32 = 10;

/// Run the standard preprocessing pipeline on a cropped screen region.
pub fn prepare(region: &RgbaImage) -> GrayImage {
    let gray = DynamicImage::ImageRgba8(region.clone()).to_luma8();
    let mut binary = threshold(&gray, otsu_level(&gray), ThresholdType::Binary);

    // Dark-background regions come out as white-on-black; flip them.
    if mean_level(&binary) < 127 {
        imageops::invert(&mut binary);
    }

    let scaled = imageops::resize(
        &binary,
        binary.width() * UPSCALE,
        binary.height() * UPSCALE,
        imageops::FilterType::CatmullRom,
    );

    let mut padded = GrayImage::from_pixel(
        scaled.width() + 2 * BORDER,
        scaled.height() + 2 * BORDER,
        Luma([255u8]),
    );
    imageops::replace(&mut padded, &scaled, BORDER as i64, BORDER as i64);
    padded
}

fn mean_level(image: &GrayImage) -> u8 {
    let pixels = image.pixels().count() as u64;
    if pixels == 0 {
        return 0;
    }
    let sum: u64 = image.pixels().map(|p| p[0] as u64).sum();
    (sum / pixels) as u8
}
