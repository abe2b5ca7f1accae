mod easyocr;
mod mistral;
mod preprocess;
mod tesseract;

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::process::Command;

use super::OcrRequest;
use crate::settings::Settings;

pub use tesseract::list_tesseract_languages;

pub(super) async fn easyocr(request: &OcrRequest, settings: &Settings) -> Result<String> {
    let request = request.clone();
    let binary = settings.easyocr_binary.clone();
    let gpu = settings.easyocr_gpu;
    let optimize = settings.optimize_images;
    run_blocking(move || {
        let input = preprocess::prepare_input(&request.path, optimize)?;
        let languages = easyocr::easyocr_languages(&request.language);
        easyocr::run_easyocr(&binary, input.path(), &languages, gpu)
    })
    .await
}

pub(super) async fn tesseract(request: &OcrRequest, settings: &Settings) -> Result<String> {
    let request = request.clone();
    let binary = settings.tesseract_binary.clone();
    let requested = settings.tesseract_languages.clone();
    let optimize = settings.optimize_images;
    run_blocking(move || {
        let input = preprocess::prepare_input(&request.path, optimize)?;
        let languages = tesseract::normalize_ocr_languages(&binary, &requested)?;
        tesseract::run_tesseract_text(&binary, input.path(), &languages)
    })
    .await
}

pub(super) async fn mistral(request: &OcrRequest, settings: &Settings) -> Result<String> {
    mistral::run_mistral_ocr(request, settings).await
}

async fn run_blocking<F>(job: F) -> Result<String>
where
    F: FnOnce() -> Result<String> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|err| anyhow!("OCR task failed: {}", err))?
}

/// Run `command` to completion and return its stdout, failing on a non-zero exit.
fn run_command(mut command: Command, label: &str) -> Result<String> {
    let output = command
        .output()
        .with_context(|| format!("failed to run {} (is it installed?)", label))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("{} failed: {}", label, stderr.trim()));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Image handed to a local engine: the upload itself or a preprocessed copy.
enum EngineInput {
    Original(PathBuf),
    Prepared(tempfile::NamedTempFile),
}

impl EngineInput {
    fn path(&self) -> &std::path::Path {
        match self {
            EngineInput::Original(path) => path,
            EngineInput::Prepared(file) => file.path(),
        }
    }
}
