//! Reading dynamic text (balance, bet amount) off the screen.

pub mod parse;
pub mod preprocess;

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use image::GrayImage;
use rusty_tesseract::{Args, Image, image_to_string};

use crate::capture::Frame;
use crate::error::ReadError;
use crate::vision::Region;

pub use parse::{FieldFormat, FieldValue, parse_value};

/// A named OCR field: where to look and what the text should parse as.
#[derive(Debug, Clone)]
pub struct OcrField {
    pub name: String,
    pub region: Region,
    pub format: FieldFormat,
}

/// Seam over the OCR engine so the reader is testable without a tesseract
/// install.
pub trait TextRecognizer {
    fn recognize(&self, image: &GrayImage) -> Result<String, ReadError>;
}

/// Tesseract-backed recognizer.
///
/// The engine is driven through a temp file per read; fields are numeric so
/// the character set is restricted accordingly, and page segmentation runs
/// in single-line mode.
pub struct TesseractRecognizer {
    scratch: PathBuf,
}

impl TesseractRecognizer {
    pub fn new() -> Self {
        Self {
            scratch: std::env::temp_dir().join(format!("spinbot-ocr-{}.png", std::process::id())),
        }
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, image: &GrayImage) -> Result<String, ReadError> {
        image
            .save(&self.scratch)
            .map_err(|e| ReadError::Engine(format!("failed to write scratch image: {e}")))?;
        let tess_image = Image::from_path(&self.scratch)
            .map_err(|e| ReadError::Engine(format!("failed to load scratch image: {e:?}")))?;
        let args = Args {
            lang: "eng".to_string(),
            config_variables: HashMap::from([(
                "tessedit_char_whitelist".to_string(),
                "0123456789.,$ ".to_string(),
            )]),
            dpi: Some(150),
            psm: Some(7),
            oem: Some(3),
        };
        let text = image_to_string(&tess_image, &args)
            .map_err(|e| ReadError::Engine(format!("{e:?}")))?;
        let _ = fs::remove_file(&self.scratch);
        Ok(text)
    }
}

/// Reads typed values out of screen regions.
pub struct TextReader {
    engine: Box<dyn TextRecognizer>,
}

impl TextReader {
    pub fn tesseract() -> Self {
        Self::with_engine(Box::new(TesseractRecognizer::new()))
    }

    pub fn with_engine(engine: Box<dyn TextRecognizer>) -> Self {
        Self { engine }
    }

    /// Read and parse one field from an already-captured frame.
    pub fn read(&self, frame: &Frame, field: &OcrField) -> Result<FieldValue, ReadError> {
        let prepared = preprocess::prepare(&frame.crop(field.region));
        let raw = self.engine.recognize(&prepared)?;
        log::debug!("ocr field '{}': '{}'", field.name, raw.trim());
        parse_value(&raw, field.format)
    }
}

/// Recognizer that returns a canned string. Test-only.
#[cfg(test)]
pub struct StaticRecognizer(pub String);

#[cfg(test)]
impl TextRecognizer for StaticRecognizer {
    fn recognize(&self, _image: &GrayImage) -> Result<String, ReadError> {
        Ok(self.0.clone())
    }
}
