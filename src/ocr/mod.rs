mod engine;

use anyhow::{anyhow, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::data;
use crate::settings::Settings;

pub use engine::list_tesseract_languages;

/// OCR backends selectable from the upload form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OcrEngineKind {
    /// Neural OCR model, driven through the `easyocr` command.
    #[default]
    EasyOcr,
    /// Mistral's hosted OCR API.
    MistralOcr,
    /// Local `tesseract` binary.
    TesseractOcr,
}

impl OcrEngineKind {
    pub const ALL: [OcrEngineKind; 3] = [
        OcrEngineKind::EasyOcr,
        OcrEngineKind::MistralOcr,
        OcrEngineKind::TesseractOcr,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OcrEngineKind::EasyOcr => "EasyOCR",
            OcrEngineKind::MistralOcr => "MistralOCR",
            OcrEngineKind::TesseractOcr => "TesseractOCR",
        }
    }

    /// Local engines only read raster images.
    pub fn accepts_pdf(&self) -> bool {
        matches!(self, OcrEngineKind::MistralOcr)
    }
}

impl fmt::Display for OcrEngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OcrEngineKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "easyocr" | "easy-ocr" => Ok(OcrEngineKind::EasyOcr),
            "mistralocr" | "mistral" => Ok(OcrEngineKind::MistralOcr),
            "tesseractocr" | "tesseract" => Ok(OcrEngineKind::TesseractOcr),
            _ => Err(anyhow!(
                "unsupported OCR engine '{}' (expected EasyOCR, MistralOCR or TesseractOCR)",
                value.trim()
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OcrRequest {
    pub path: PathBuf,
    pub file_name: String,
    pub mime: String,
    /// Language hint from the caller, e.g. `ar`.
    pub language: String,
}

impl OcrRequest {
    pub fn is_pdf(&self) -> bool {
        self.mime == data::PDF_MIME
    }
}

pub async fn extract_text(
    kind: OcrEngineKind,
    request: &OcrRequest,
    settings: &Settings,
) -> Result<String> {
    if request.is_pdf() && !kind.accepts_pdf() {
        return Err(anyhow!(
            "{} cannot read PDF files; use {}",
            kind,
            OcrEngineKind::MistralOcr
        ));
    }
    tracing::info!(
        engine = kind.as_str(),
        file = request.file_name.as_str(),
        language = request.language.as_str(),
        "running OCR"
    );
    let text = match kind {
        OcrEngineKind::EasyOcr => engine::easyocr(request, settings).await?,
        OcrEngineKind::MistralOcr => engine::mistral(request, settings).await?,
        OcrEngineKind::TesseractOcr => engine::tesseract(request, settings).await?,
    };
    tracing::debug!(engine = kind.as_str(), chars = text.chars().count(), "OCR finished");
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_form_names_and_aliases() {
        assert_eq!("EasyOCR".parse::<OcrEngineKind>().unwrap(), OcrEngineKind::EasyOcr);
        assert_eq!(
            "MistralOCR".parse::<OcrEngineKind>().unwrap(),
            OcrEngineKind::MistralOcr
        );
        assert_eq!(
            " tesseractocr ".parse::<OcrEngineKind>().unwrap(),
            OcrEngineKind::TesseractOcr
        );
        assert_eq!("mistral".parse::<OcrEngineKind>().unwrap(), OcrEngineKind::MistralOcr);
        assert_eq!("tesseract".parse::<OcrEngineKind>().unwrap(), OcrEngineKind::TesseractOcr);
    }

    #[test]
    fn rejects_unknown_engine() {
        let err = "GoogleVision".parse::<OcrEngineKind>().unwrap_err();
        assert!(err.to_string().contains("unsupported OCR engine 'GoogleVision'"));
    }

    #[test]
    fn canonical_names_round_trip() {
        for kind in OcrEngineKind::ALL {
            assert_eq!(kind.as_str().parse::<OcrEngineKind>().unwrap(), kind);
        }
        assert_eq!(OcrEngineKind::default(), OcrEngineKind::EasyOcr);
    }

    #[tokio::test]
    async fn local_engines_refuse_pdf() {
        let request = OcrRequest {
            path: PathBuf::from("missing.pdf"),
            file_name: "missing.pdf".to_string(),
            mime: data::PDF_MIME.to_string(),
            language: "ar".to_string(),
        };
        let settings = Settings::default();
        for kind in [OcrEngineKind::EasyOcr, OcrEngineKind::TesseractOcr] {
            let err = extract_text(kind, &request, &settings).await.unwrap_err();
            assert!(err.to_string().contains("cannot read PDF files"), "{err}");
        }
    }
}
