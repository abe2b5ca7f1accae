use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_addr: String,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub keep_uploads: bool,
    pub default_engine: String,
    pub default_language: String,
    pub tesseract_languages: String,
    pub easyocr_binary: String,
    pub tesseract_binary: String,
    pub easyocr_gpu: bool,
    pub optimize_images: bool,
    pub mistral_base_url: String,
    pub mistral_model: String,
    pub mistral_api_key: Option<String>,
    pub translation_base_url: String,
    pub translation_model: String,
    pub translation_api_key: Option<String>,
    pub default_target_lang: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:5000".to_string(),
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: 16 * 1024 * 1024,
            keep_uploads: false,
            default_engine: "EasyOCR".to_string(),
            default_language: "en".to_string(),
            tesseract_languages: "ara+eng+rus+hye".to_string(),
            easyocr_binary: "easyocr".to_string(),
            tesseract_binary: "tesseract".to_string(),
            easyocr_gpu: false,
            optimize_images: false,
            mistral_base_url: "https://api.mistral.ai/v1".to_string(),
            mistral_model: "mistral-ocr-latest".to_string(),
            mistral_api_key: None,
            translation_base_url: "https://api.openai.com/v1".to_string(),
            translation_model: "gpt-4o-mini".to_string(),
            translation_api_key: None,
            default_target_lang: "en".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    server: Option<ServerSettings>,
    ocr: Option<OcrSettings>,
    mistral: Option<MistralSettings>,
    translation: Option<TranslationSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    addr: Option<String>,
    upload_dir: Option<String>,
    max_upload_bytes: Option<usize>,
    keep_uploads: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct OcrSettings {
    default_engine: Option<String>,
    default_language: Option<String>,
    tesseract_languages: Option<String>,
    easyocr_binary: Option<String>,
    tesseract_binary: Option<String>,
    easyocr_gpu: Option<bool>,
    optimize_images: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct MistralSettings {
    base_url: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TranslationSettings {
    base_url: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    default_target_lang: Option<String>,
}

/// Merges, in order: home settings, `./settings.toml`, `./settings.local.toml`,
/// then `extra_path`. Later files win.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    load_settings_from(Path::new("."), extra_path)
}

fn load_settings_from(project_dir: &Path, extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }
    ordered_paths.push(project_dir.join("settings.toml"));
    ordered_paths.push(project_dir.join("settings.local.toml"));

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            settings.merge_toml(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
        }
    }

    Ok(settings)
}

impl Settings {
    pub fn merge_toml(&mut self, content: &str) -> Result<()> {
        let parsed: SettingsFile = toml::from_str(content)?;
        self.merge(parsed);
        Ok(())
    }

    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(server) = incoming.server {
            merge_string(&mut self.server_addr, server.addr);
            if let Some(dir) = non_blank(server.upload_dir) {
                self.upload_dir = PathBuf::from(dir);
            }
            if let Some(limit) = server.max_upload_bytes {
                if limit > 0 {
                    self.max_upload_bytes = limit;
                }
            }
            if let Some(keep) = server.keep_uploads {
                self.keep_uploads = keep;
            }
        }
        if let Some(ocr) = incoming.ocr {
            merge_string(&mut self.default_engine, ocr.default_engine);
            merge_string(&mut self.default_language, ocr.default_language);
            merge_string(&mut self.tesseract_languages, ocr.tesseract_languages);
            merge_string(&mut self.easyocr_binary, ocr.easyocr_binary);
            merge_string(&mut self.tesseract_binary, ocr.tesseract_binary);
            if let Some(gpu) = ocr.easyocr_gpu {
                self.easyocr_gpu = gpu;
            }
            if let Some(optimize) = ocr.optimize_images {
                self.optimize_images = optimize;
            }
        }
        if let Some(mistral) = incoming.mistral {
            merge_string(&mut self.mistral_base_url, mistral.base_url);
            merge_string(&mut self.mistral_model, mistral.model);
            if let Some(key) = non_blank(mistral.api_key) {
                self.mistral_api_key = Some(key);
            }
        }
        if let Some(translation) = incoming.translation {
            merge_string(&mut self.translation_base_url, translation.base_url);
            merge_string(&mut self.translation_model, translation.model);
            merge_string(
                &mut self.default_target_lang,
                translation.default_target_lang,
            );
            if let Some(key) = non_blank(translation.api_key) {
                self.translation_api_key = Some(key);
            }
        }
    }
}

fn merge_string(target: &mut String, incoming: Option<String>) {
    if let Some(value) = non_blank(incoming) {
        *target = value;
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".arabic-ocr-rust"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::with_temp_home;

    #[test]
    fn bundled_settings_match_defaults() {
        let mut settings = Settings::default();
        settings.merge_toml(DEFAULT_SETTINGS_TOML).expect("parse");
        let defaults = Settings::default();
        assert_eq!(settings.server_addr, defaults.server_addr);
        assert_eq!(settings.max_upload_bytes, defaults.max_upload_bytes);
        assert_eq!(settings.tesseract_languages, "ara+eng+rus+hye");
        assert_eq!(settings.mistral_model, "mistral-ocr-latest");
        assert_eq!(settings.default_engine, "EasyOCR");
    }

    #[test]
    fn blank_values_do_not_override() {
        let mut settings = Settings::default();
        settings
            .merge_toml(
                r#"
[ocr]
default_language = "  "
tesseract_languages = "ara"

[server]
max_upload_bytes = 0
keep_uploads = true

[mistral]
api_key = ""
"#,
            )
            .expect("parse");
        assert_eq!(settings.default_language, "en");
        assert_eq!(settings.tesseract_languages, "ara");
        assert_eq!(settings.max_upload_bytes, 16 * 1024 * 1024);
        assert!(settings.keep_uploads);
        assert_eq!(settings.mistral_api_key, None);
    }

    #[test]
    fn home_settings_file_is_created() {
        with_temp_home(|home| {
            let settings = load_settings(None).expect("settings");
            assert!(home.join(".arabic-ocr-rust").join("settings.toml").exists());
            assert_eq!(settings.mistral_base_url, "https://api.mistral.ai/v1");
        });
    }

    #[test]
    fn project_local_settings_beat_home_defaults() {
        with_temp_home(|home| {
            let project = home.join("project");
            fs::create_dir_all(&project).expect("project dir");
            fs::write(
                project.join("settings.local.toml"),
                "[ocr]\ndefault_engine = \"TesseractOCR\"\n",
            )
            .expect("write");
            let home_config = home.join(".arabic-ocr-rust");
            fs::create_dir_all(&home_config).expect("home dir");
            fs::write(
                home_config.join("settings.local.toml"),
                "[ocr]\ndefault_engine = \"MistralOCR\"\ndefault_language = \"ar\"\n",
            )
            .expect("write");

            let settings = load_settings_from(&project, None).expect("settings");
            assert_eq!(settings.default_engine, "TesseractOCR");
            assert_eq!(settings.default_language, "ar");
            assert!(home_config.join("settings.toml").exists());
        });
    }

    #[test]
    fn extra_settings_file_overrides_and_must_exist() {
        with_temp_home(|home| {
            let extra = home.join("extra.toml");
            fs::write(&extra, "[translation]\nmodel = \"local-model\"\n").expect("write");
            let settings = load_settings(Some(&extra)).expect("settings");
            assert_eq!(settings.translation_model, "local-model");

            let missing = home.join("missing.toml");
            let err = load_settings(Some(&missing)).unwrap_err();
            assert!(err.to_string().contains("settings file not found"));
        });
    }
}
