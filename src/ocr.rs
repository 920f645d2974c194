//! OCR over screenshots via an external engine.
//!
//! The engine is a collaborator behind [`OcrEngine`]; the default drives the
//! `tesseract` command line. Failures never escape [`scan_image`]: they end
//! up as a status line for the user.

use crate::error::OcrError;
use crate::extract::{ExtractedFields, Extractor};
use std::io::ErrorKind;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, warn};

/// Something that turns an image into text.
#[allow(async_fn_in_trait)]
pub trait OcrEngine {
    async fn recognize(&self, image: &Path, language: &str) -> Result<String, OcrError>;
}

/// Runs `<command> <image> stdout -l <language>`.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    command: String,
}

impl TesseractEngine {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl OcrEngine for TesseractEngine {
    async fn recognize(&self, image: &Path, language: &str) -> Result<String, OcrError> {
        let output = Command::new(&self.command)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(language)
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => OcrError::EngineUnavailable(self.command.clone()),
                _ => OcrError::Io(e),
            })?;

        if !output.status.success() {
            return Err(OcrError::EngineFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Result of one OCR run, ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrOutcome {
    pub fields: ExtractedFields,
    pub status: String,
}

impl OcrOutcome {
    fn failed(status: impl Into<String>) -> Self {
        Self {
            fields: ExtractedFields::default(),
            status: status.into(),
        }
    }
}

/// Read an image, recognize it and extract the form fields.
pub async fn scan_image<E: OcrEngine>(
    engine: &E,
    extractor: &Extractor,
    image: &Path,
    language: &str,
) -> OcrOutcome {
    if let Err(e) = tokio::fs::metadata(image).await {
        let err = OcrError::ImageRead {
            path: image.display().to_string(),
            source: e,
        };
        warn!(error = %err, "image unreadable");
        return OcrOutcome::failed(err.to_string());
    }

    let text = match engine.recognize(image, language).await {
        Ok(text) => text,
        Err(OcrError::EngineUnavailable(command)) => {
            warn!(command = %command, "OCR engine missing");
            return OcrOutcome::failed(format!(
                "OCR engine `{}` could not be started. Install it or set [ocr].command in the config.",
                command
            ));
        }
        Err(e) => {
            warn!(error = %e, "OCR failed");
            return OcrOutcome::failed(format!("OCR failed: {}", e));
        }
    };
    debug!(chars = text.len(), "recognized text");

    let fields = extractor.extract_fields(&text);
    let detected = fields.detected();
    let status = if detected.is_empty() {
        "Recognition finished but no values were found. Check the image resolution and labels."
            .to_string()
    } else {
        let mut status = format!("Recognized: {}", detected.join(" / "));
        if fields.price.is_some_and(|p| !p.confirmed) {
            status.push_str(" (price guessed from an unlabeled number; please verify)");
        }
        status
    };

    OcrOutcome { fields, status }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct FixedText(&'static str);

    impl OcrEngine for FixedText {
        async fn recognize(&self, _image: &Path, _language: &str) -> Result<String, OcrError> {
            Ok(self.0.to_string())
        }
    }

    struct Missing;

    impl OcrEngine for Missing {
        async fn recognize(&self, _image: &Path, _language: &str) -> Result<String, OcrError> {
            Err(OcrError::EngineUnavailable("tesseract".to_string()))
        }
    }

    fn image_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\x89PNG fake").unwrap();
        file
    }

    #[tokio::test]
    async fn test_scan_extracts_fields() {
        let image = image_file();
        let extractor = Extractor::new(&[]).unwrap();
        let outcome = scan_image(&FixedText("株価 1,520 PER 14.2"), &extractor, image.path(), "eng").await;

        assert_eq!(outcome.fields.price.unwrap().value, 1520.0);
        assert_eq!(outcome.fields.per, Some(14.2));
        assert_eq!(outcome.status, "Recognized: Price / PER");
    }

    #[tokio::test]
    async fn test_scan_flags_unconfirmed_price() {
        let image = image_file();
        let extractor = Extractor::new(&[]).unwrap();
        let outcome = scan_image(&FixedText("7203 toyota"), &extractor, image.path(), "eng").await;

        assert!(!outcome.fields.price.unwrap().confirmed);
        assert!(outcome.status.contains("please verify"));
    }

    #[tokio::test]
    async fn test_scan_nothing_found() {
        let image = image_file();
        let extractor = Extractor::new(&[]).unwrap();
        let outcome = scan_image(&FixedText("hello"), &extractor, image.path(), "eng").await;
        assert_eq!(outcome.fields, ExtractedFields::default());
        assert!(outcome.status.contains("no values"));
    }

    #[tokio::test]
    async fn test_missing_engine_is_a_status() {
        let image = image_file();
        let extractor = Extractor::new(&[]).unwrap();
        let outcome = scan_image(&Missing, &extractor, image.path(), "eng").await;
        assert!(outcome.status.contains("could not be started"));
    }

    #[tokio::test]
    async fn test_missing_image_is_a_status() {
        let extractor = Extractor::new(&[]).unwrap();
        let outcome = scan_image(
            &FixedText("Price 100"),
            &extractor,
            Path::new("/definitely/not/here.png"),
            "eng",
        )
        .await;
        assert!(outcome.status.starts_with("failed to read image"));
        assert!(outcome.fields.price.is_none());
    }

    #[tokio::test]
    async fn test_tesseract_missing_binary() {
        let image = image_file();
        let engine = TesseractEngine::new("stonklog-no-such-ocr-binary");
        let err = engine.recognize(image.path(), "eng").await.unwrap_err();
        assert!(matches!(err, OcrError::EngineUnavailable(_)));
    }
}
