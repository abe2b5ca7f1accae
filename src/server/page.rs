use anyhow::{Context, Result};
use serde::Serialize;
use tera::{Context as TeraContext, Tera};

use crate::document::DOWNLOAD_FILE_NAME;
use crate::ocr::OcrEngineKind;
use crate::settings::Settings;

const INDEX_TEMPLATE: &str = include_str!("templates/index.html.tera");

#[derive(Serialize)]
struct EngineOption {
    value: &'static str,
    label: &'static str,
    selected: bool,
}

pub(crate) fn render_index_html(settings: &Settings) -> Result<String> {
    let default_engine = settings
        .default_engine
        .parse::<OcrEngineKind>()
        .unwrap_or_default();
    let engines = OcrEngineKind::ALL
        .iter()
        .map(|kind| EngineOption {
            value: kind.as_str(),
            label: engine_label(*kind),
            selected: *kind == default_engine,
        })
        .collect::<Vec<_>>();

    let mut context = TeraContext::new();
    context.insert("engines", &engines);
    context.insert("default_language", settings.default_language.as_str());
    context.insert("default_target_lang", settings.default_target_lang.as_str());
    context.insert("download_file_name", DOWNLOAD_FILE_NAME);
    Tera::one_off(INDEX_TEMPLATE, &context, true).with_context(|| "failed to render index page")
}

fn engine_label(kind: OcrEngineKind) -> &'static str {
    match kind {
        OcrEngineKind::EasyOcr => "EasyOCR (local)",
        OcrEngineKind::MistralOcr => "Mistral OCR (cloud, reads PDF)",
        OcrEngineKind::TesseractOcr => "Tesseract (local)",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_lists_every_engine() {
        let html = render_index_html(&Settings::default()).unwrap();
        for kind in OcrEngineKind::ALL {
            assert!(html.contains(&format!("value=\"{}\"", kind.as_str())), "{kind}");
        }
        assert!(html.contains("<option value=\"EasyOCR\" selected>"));
        assert!(html.contains("arabic_ocr_output.docx"));
    }

    #[test]
    fn default_engine_comes_from_settings() {
        let settings = Settings {
            default_engine: "tesseract".to_string(),
            ..Settings::default()
        };
        let html = render_index_html(&settings).unwrap();
        assert!(html.contains("<option value=\"TesseractOCR\" selected>"));
        assert!(!html.contains("<option value=\"EasyOCR\" selected>"));
    }
}
