use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

pub mod data;
pub mod document;
pub mod logging;
pub mod ocr;
mod providers;
pub mod server;
pub mod settings;
#[cfg(test)]
mod test_util;
pub mod translations;
mod translator;
pub mod transliteration;

pub use providers::{OpenAI, Provider, ProviderUsage};
pub use translations::TranslateOptions;
pub use translator::{ExecutionOutput, Translator};

#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Image or PDF to OCR; stdin text is used when absent.
    pub data: Option<String>,
    pub engine: Option<String>,
    pub language: Option<String>,
    pub transliterate: bool,
    pub translate: bool,
    pub target_lang: Option<String>,
    pub source_lang: String,
    /// Write a `.docx` with every produced section here.
    pub out: Option<String>,
    pub model: Option<String>,
    pub key: Option<String>,
    pub settings_path: Option<String>,
}

pub async fn run(config: Config, input: Option<String>) -> Result<String> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;
    run_with_settings(config, &settings, input).await
}

pub async fn run_with_settings(
    config: Config,
    settings: &settings::Settings,
    input: Option<String>,
) -> Result<String> {
    let original = match config.data.as_deref() {
        Some(path) => ocr_file(Path::new(path), &config, settings).await?,
        None => {
            let input = input.unwrap_or_default();
            let input = input.trim_end_matches(['\r', '\n']);
            if input.trim().is_empty() {
                return Err(anyhow!("stdin is empty"));
            }
            input.to_string()
        }
    };

    let translation = if config.translate {
        let target_lang = config
            .target_lang
            .as_deref()
            .unwrap_or(&settings.default_target_lang);
        let options = TranslateOptions::new(&config.source_lang, target_lang)?;
        let provider = providers::build_provider(
            settings,
            config.key.as_deref(),
            config.model.as_deref(),
        )
        .with_context(|| "no API key found for translation")?;
        let execution = Translator::new(provider).exec(&original, options).await?;
        Some(execution.text)
    } else {
        None
    };
    let transliteration = config
        .transliterate
        .then(|| transliteration::transliterate(&original));

    if let Some(out) = config.out.as_deref() {
        write_document(
            Path::new(out),
            &document::OcrDocument {
                original: original.clone(),
                translation: translation.clone().unwrap_or_default(),
                transliteration: transliteration.clone().unwrap_or_default(),
            },
        )?;
    }

    Ok(format_output(original, translation, transliteration))
}

async fn ocr_file(path: &Path, config: &Config, settings: &settings::Settings) -> Result<String> {
    let file = data::UploadedFile::load(path)?;
    if !data::allowed_file(&file.file_name) {
        return Err(anyhow!(
            "unsupported file type: {} (expected one of {})",
            path.display(),
            data::ALLOWED_EXTENSIONS.join(", ")
        ));
    }
    let kind = config
        .engine
        .as_deref()
        .unwrap_or(&settings.default_engine)
        .parse::<ocr::OcrEngineKind>()?;
    let request = ocr::OcrRequest {
        path: PathBuf::from(path),
        file_name: file.file_name,
        mime: file.mime,
        language: config
            .language
            .clone()
            .unwrap_or_else(|| settings.default_language.clone()),
    };
    ocr::extract_text(kind, &request, settings).await
}

fn write_document(path: &Path, document: &document::OcrDocument) -> Result<()> {
    let bytes = document::render_docx(document)?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output dir: {}", parent.display()))?;
    }
    std::fs::write(path, bytes)
        .with_context(|| format!("failed to write document: {}", path.display()))?;
    tracing::info!("wrote {}", path.display());
    Ok(())
}

fn format_output(
    original: String,
    translation: Option<String>,
    transliteration: Option<String>,
) -> String {
    let sections = [translation, transliteration]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();
    if sections.is_empty() {
        original
    } else {
        sections.join("\n\n")
    }
}
