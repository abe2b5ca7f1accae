use anyhow::Result;

use crate::providers::{Provider, ProviderUsage};
use crate::translations::{self, tool_spec, TranslateOptions, TOOL_NAME};

#[derive(Debug, Clone)]
pub struct Translator<P: Provider + Clone> {
    provider: P,
}

#[derive(Debug, Clone)]
pub struct ExecutionOutput {
    pub text: String,
    pub model: Option<String>,
    pub usage: Option<ProviderUsage>,
}

impl<P: Provider + Clone> Translator<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub async fn exec(&self, input: &str, options: TranslateOptions) -> Result<ExecutionOutput> {
        let system_prompt = translations::render_system_prompt(&options, TOOL_NAME)?;
        let response = self
            .provider
            .clone()
            .register_tool(tool_spec(TOOL_NAME))
            .append_system_input(system_prompt)
            .append_user_input(input.to_string())
            .call_tool(TOOL_NAME)
            .await?;

        let parsed = translations::parse_tool_args(response.args, &options)?;
        tracing::debug!(
            "translated {} -> {} with {}",
            parsed.source_language,
            parsed.target_language,
            response.model.as_deref().unwrap_or("unknown model")
        );
        Ok(ExecutionOutput {
            text: parsed.translation,
            model: response.model,
            usage: response.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ProviderFuture, ProviderResponse, ToolSpec};
    use serde_json::json;

    /// Replies with fixed tool arguments and records what it was given.
    #[derive(Debug, Clone, Default)]
    struct CannedProvider {
        args: serde_json::Value,
        inputs: Vec<String>,
        tools: Vec<String>,
    }

    impl Provider for CannedProvider {
        fn append_system_input(mut self, input: String) -> Self {
            self.inputs.push(format!("system:{}", input));
            self
        }

        fn append_user_input(mut self, input: String) -> Self {
            self.inputs.push(format!("user:{}", input));
            self
        }

        fn register_tool(mut self, tool: ToolSpec) -> Self {
            self.tools.push(tool.name);
            self
        }

        fn call_tool(self, tool_name: &str) -> ProviderFuture {
            let tool_name = tool_name.to_string();
            Box::pin(async move {
                assert!(self.tools.contains(&tool_name));
                assert!(self.inputs.iter().any(|value| value.starts_with("system:")));
                assert!(self.inputs.last().is_some_and(|value| value.starts_with("user:")));
                Ok(ProviderResponse {
                    args: self.args,
                    model: Some("canned".to_string()),
                    usage: None,
                })
            })
        }
    }

    #[tokio::test]
    async fn exec_returns_tool_translation() {
        let provider = CannedProvider {
            args: json!({"translation": "Hello", "source_language": "ar", "target_language": "en"}),
            ..CannedProvider::default()
        };
        let output = Translator::new(provider)
            .exec("مرحبا", TranslateOptions::new("auto", "en").unwrap())
            .await
            .unwrap();
        assert_eq!(output.text, "Hello");
        assert_eq!(output.model.as_deref(), Some("canned"));
    }

    #[tokio::test]
    async fn exec_rejects_wrong_target() {
        let provider = CannedProvider {
            args: json!({"translation": "Bonjour", "source_language": "ar", "target_language": "fr"}),
            ..CannedProvider::default()
        };
        let err = Translator::new(provider)
            .exec("مرحبا", TranslateOptions::new("auto", "en").unwrap())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("mismatch"));
    }
}
