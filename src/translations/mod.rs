use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use tera::{Context as TeraContext, Tera};

use crate::providers::ToolSpec;

pub const TOOL_NAME: &str = "deliver_translation";

const SYSTEM_PROMPT_TEMPLATE: &str = include_str!("prompts/system_prompt.tera");

#[derive(Debug, Clone)]
pub struct TranslateOptions {
    pub source_lang: String,
    pub target_lang: String,
}

impl TranslateOptions {
    /// Normalizes and checks both codes; `auto` is accepted for the source only.
    pub fn new(source_lang: &str, target_lang: &str) -> Result<Self> {
        let source_lang = normalize_lang_code(source_lang);
        let target_lang = normalize_lang_code(target_lang);
        let source_lang = if source_lang.is_empty() {
            "auto".to_string()
        } else {
            source_lang
        };
        if source_lang != "auto" && !is_valid_lang_code(&source_lang) {
            return Err(anyhow!("invalid source language '{}'", source_lang));
        }
        if !is_valid_lang_code(&target_lang) {
            return Err(anyhow!("invalid target language '{}'", target_lang));
        }
        Ok(Self {
            source_lang,
            target_lang,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TranslationResult {
    pub translation: String,
    pub source_language: String,
    pub target_language: String,
}

pub fn tool_spec(tool_name: &str) -> ToolSpec {
    ToolSpec {
        name: tool_name.to_string(),
        description: "Return the translation with its language codes.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "translation": {"type": "string"},
                "source_language": {"type": "string"},
                "target_language": {"type": "string"}
            },
            "required": ["translation", "source_language", "target_language"]
        }),
    }
}

pub fn render_system_prompt(options: &TranslateOptions, tool_name: &str) -> Result<String> {
    let mut context = TeraContext::new();
    context.insert("source_lang", options.source_lang.as_str());
    context.insert("target_lang", options.target_lang.as_str());
    context.insert("tool_name", tool_name);
    Tera::one_off(SYSTEM_PROMPT_TEMPLATE, &context, false)
        .with_context(|| "failed to render system prompt")
}

pub fn parse_tool_args(value: Value, options: &TranslateOptions) -> Result<TranslationResult> {
    let args: ToolArgs =
        serde_json::from_value(value).with_context(|| "invalid translation tool arguments")?;
    validate_tool_args(&args, options)?;

    Ok(TranslationResult {
        translation: args.translation,
        source_language: normalize_lang_code(&args.source_language),
        target_language: normalize_lang_code(&args.target_language),
    })
}

#[derive(Debug, Deserialize)]
struct ToolArgs {
    translation: String,
    #[serde(default)]
    source_language: String,
    target_language: String,
}

fn validate_tool_args(args: &ToolArgs, options: &TranslateOptions) -> Result<()> {
    if args.translation.trim().is_empty() {
        return Err(anyhow!("translation is empty"));
    }
    if !is_valid_lang_code(&args.target_language) {
        return Err(anyhow!(
            "target_language must be an ISO 639 code (got '{}')",
            args.target_language
        ));
    }
    if !eq_insensitive(&args.target_language, &options.target_lang) {
        return Err(anyhow!(
            "tool response target_language mismatch (expected '{}', got '{}')",
            options.target_lang,
            args.target_language
        ));
    }
    Ok(())
}

/// Two or three ASCII letters, optionally followed by `-subtag` (`zh-hant`, `pt-br`).
pub fn is_valid_lang_code(code: &str) -> bool {
    let code = code.trim();
    let (base, suffix) = match code.split_once('-') {
        Some((base, suffix)) => (base, Some(suffix)),
        None => (code, None),
    };
    let base_ok = (2..=3).contains(&base.len()) && base.chars().all(|c| c.is_ascii_alphabetic());
    let suffix_ok = suffix.is_none_or(|suffix| {
        (2..=8).contains(&suffix.len()) && suffix.chars().all(|c| c.is_ascii_alphanumeric())
    });
    base_ok && suffix_ok
}

fn normalize_lang_code(code: &str) -> String {
    code.trim().to_lowercase()
}

fn eq_insensitive(left: &str, right: &str) -> bool {
    left.trim().eq_ignore_ascii_case(right.trim())
}
