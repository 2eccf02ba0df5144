//! Text recognition capability backed by the tesseract binary.

use std::io::Write;
use std::process::Command;

use crate::error::OcrError;

pub trait OcrEngine: Send + Sync {
    fn recognize_text(&self, image_bytes: &[u8]) -> Result<String, OcrError>;
}

/// Runs `tesseract` on a scratch PNG. Inputs are decoded and re-encoded
/// first so the subprocess always sees a format it understands.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    languages: String,
}

impl TesseractOcr {
    pub fn new(languages: impl Into<String>) -> Self {
        Self {
            languages: languages.into(),
        }
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize_text(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
        let image = image::load_from_memory(image_bytes)?;
        let mut tmp = tempfile::Builder::new().suffix(".png").tempfile()?;
        image.write_to(&mut tmp, image::ImageFormat::Png)?;
        tmp.flush().ok();

        let output = Command::new("tesseract")
            .arg(tmp.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.languages)
            .arg("--dpi")
            .arg("300")
            .output()
            .map_err(OcrError::Spawn)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Engine(stderr.trim().to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
