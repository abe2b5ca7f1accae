use anyhow::{anyhow, Result};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;

use crate::settings::Settings;

mod openai;
pub(crate) mod retry;

pub use openai::OpenAI;

#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderResponse {
    pub args: serde_json::Value,
    pub model: Option<String>,
    pub usage: Option<ProviderUsage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: String) -> Self {
        Self {
            role: MessageRole::System,
            content,
        }
    }

    pub fn user(content: String) -> Self {
        Self {
            role: MessageRole::User,
            content,
        }
    }
}

pub type ProviderFuture = Pin<Box<dyn Future<Output = Result<ProviderResponse>> + Send>>;

/// A chat model that answers by calling one registered tool.
pub trait Provider: Clone + Send + Sync {
    fn append_system_input(self, input: String) -> Self;
    fn append_user_input(self, input: String) -> Self;
    fn register_tool(self, tool: ToolSpec) -> Self;
    fn call_tool(self, tool_name: &str) -> ProviderFuture;
}

/// Builds the translation provider from settings, with optional CLI overrides.
pub fn build_provider(
    settings: &Settings,
    override_key: Option<&str>,
    override_model: Option<&str>,
) -> Result<OpenAI> {
    let key = resolve_key(settings, override_key)?;
    let model = override_model
        .filter(|value| !value.trim().is_empty())
        .unwrap_or(&settings.translation_model);
    Ok(OpenAI::new(key)
        .with_model(model)
        .with_base_url(base_url(settings)))
}

/// Key order: explicit override, `OPENAI_API_KEY`, then the settings file.
pub fn resolve_key(settings: &Settings, override_key: Option<&str>) -> Result<String> {
    if let Some(key) = override_key.filter(|value| !value.trim().is_empty()) {
        return Ok(key.to_string());
    }
    get_env("OPENAI_API_KEY")
        .or_else(|| settings.translation_api_key.clone())
        .ok_or_else(|| anyhow!("API key not found for translation (set OPENAI_API_KEY)"))
}

fn base_url(settings: &Settings) -> String {
    get_env("OPENAI_BASE_URL").unwrap_or_else(|| settings.translation_base_url.clone())
}

fn get_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
