use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_json::json;

use super::retry::{
    is_rate_limited, retry_after, wait_with_backoff, RATE_LIMIT_BASE_DELAY, RATE_LIMIT_MAX_RETRIES,
};
use super::{Message, Provider, ProviderFuture, ProviderResponse, ProviderUsage, ToolSpec};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub(crate) const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI-compatible chat completions client.
#[derive(Debug, Clone)]
pub struct OpenAI {
    key: String,
    model: String,
    base_url: String,
    messages: Vec<Message>,
    tools: Vec<ToolSpec>,
}

impl OpenAI {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            messages: Vec::new(),
            tools: Vec::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.model = model;
        }
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        if !base_url.trim().is_empty() {
            self.base_url = base_url.trim_end_matches('/').to_string();
        }
        self
    }

    fn find_tool(&self, name: &str) -> Result<&ToolSpec> {
        self.tools
            .iter()
            .find(|tool| tool.name == name)
            .ok_or_else(|| anyhow!("tool '{}' not registered", name))
    }
}

impl Provider for OpenAI {
    fn append_system_input(mut self, input: String) -> Self {
        self.messages.push(Message::system(input));
        self
    }

    fn append_user_input(mut self, input: String) -> Self {
        self.messages.push(Message::user(input));
        self
    }

    fn register_tool(mut self, tool: ToolSpec) -> Self {
        self.tools.push(tool);
        self
    }

    fn call_tool(self, tool_name: &str) -> ProviderFuture {
        let tool_name = tool_name.to_string();
        Box::pin(async move {
            let tool = self.find_tool(&tool_name)?.clone();
            call_with_chat_completions(self, tool, &tool_name).await
        })
    }
}

fn request_body(provider: &OpenAI, tool: &ToolSpec) -> serde_json::Value {
    let messages = provider
        .messages
        .iter()
        .map(|message| json!({"role": message.role.as_str(), "content": message.content}))
        .collect::<Vec<_>>();

    json!({
        "model": provider.model,
        "messages": messages,
        "tools": [
            {
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters
                }
            }
        ],
        "tool_choice": {"type": "function", "function": {"name": tool.name}}
    })
}

async fn call_with_chat_completions(
    provider: OpenAI,
    tool: ToolSpec,
    tool_name: &str,
) -> Result<ProviderResponse> {
    let client = reqwest::Client::new();
    let url = format!("{}/chat/completions", provider.base_url);
    let body = request_body(&provider, &tool);

    let mut attempt = 0usize;
    let mut delay = RATE_LIMIT_BASE_DELAY;
    loop {
        attempt += 1;
        let response = client
            .post(&url)
            .bearer_auth(provider.key.clone())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let retry_after = retry_after(response.headers());
        let text = response.text().await.unwrap_or_default();
        if status.is_success() {
            return extract_tool_response(&text, tool_name, &provider.model);
        }
        if is_rate_limited(status, &text) && attempt < RATE_LIMIT_MAX_RETRIES {
            delay = wait_with_backoff("OpenAI", attempt, delay, retry_after).await;
            continue;
        }
        return Err(anyhow!(
            "OpenAI API error ({}): {}",
            status,
            extract_openai_error(&text).unwrap_or(text)
        ));
    }
}

fn extract_tool_response(
    text: &str,
    tool_name: &str,
    fallback_model: &str,
) -> Result<ProviderResponse> {
    let payload: OpenAIResponse =
        serde_json::from_str(text).with_context(|| "failed to parse OpenAI response JSON")?;
    let tool_call = payload
        .choices
        .first()
        .and_then(|choice| choice.message.tool_calls.first())
        .ok_or_else(|| anyhow!("no tool call returned from OpenAI"))?;

    if tool_call.function.name != tool_name {
        return Err(anyhow!(
            "unexpected tool name '{}' from OpenAI",
            tool_call.function.name
        ));
    }

    let args: serde_json::Value = serde_json::from_str(&tool_call.function.arguments)
        .with_context(|| "failed to parse OpenAI tool arguments")?;
    let model = payload
        .model
        .filter(|value| !value.trim().is_empty())
        .or_else(|| Some(fallback_model.to_string()));
    let usage = payload.usage.map(|usage| ProviderUsage {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
    });
    Ok(ProviderResponse { args, model, usage })
}

fn extract_openai_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<OpenAIError>,
    }

    #[derive(Deserialize)]
    struct OpenAIError {
        message: Option<String>,
        #[serde(rename = "type")]
        kind: Option<String>,
        code: Option<String>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let error = parsed.error?;
    let parts = [
        error.message,
        error.kind.map(|kind| format!("type: {}", kind)),
        error.code.map(|code| format!("code: {}", code)),
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.trim().is_empty())
    .collect::<Vec<_>>();
    if parts.is_empty() {
        Some("unknown error".to_string())
    } else {
        Some(parts.join(" | "))
    }
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    model: Option<String>,
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    #[serde(default)]
    tool_calls: Vec<OpenAIToolCall>,
}

#[derive(Debug, Deserialize)]
struct OpenAIToolCall {
    function: OpenAIFunctionCall,
}

#[derive(Debug, Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};

    fn sample_tool() -> ToolSpec {
        ToolSpec {
            name: "deliver_translation".to_string(),
            description: "Return the translation".to_string(),
            parameters: json!({"type": "object"}),
        }
    }

    #[test]
    fn extracts_tool_args_from_fixture() {
        let payload = include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/openai_tool_response.json"
        ));
        let response =
            extract_tool_response(payload, "deliver_translation", "gpt-4o-mini").unwrap();
        assert_eq!(response.args["translation"], "In the name of God");
        assert_eq!(response.args["target_language"], "en");
        assert_eq!(response.model.as_deref(), Some("gpt-4o-mini-2024-07-18"));
        let usage = response.usage.expect("usage");
        assert_eq!(usage.total_tokens, Some(131));
    }

    #[test]
    fn other_tool_names_are_rejected() {
        let payload = include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/openai_tool_response.json"
        ));
        let err = extract_tool_response(payload, "something_else", "gpt-4o-mini").unwrap_err();
        assert!(err.to_string().contains("unexpected tool name"));
    }

    #[test]
    fn error_parts_are_joined() {
        let body = r#"{"error":{"message":"Incorrect API key","type":"invalid_request_error","code":"invalid_api_key"}}"#;
        insta::assert_snapshot!(
            extract_openai_error(body).unwrap(),
            @"Incorrect API key | type: invalid_request_error | code: invalid_api_key"
        );
        assert_eq!(extract_openai_error("<html>"), None);
    }

    #[test]
    fn body_forces_the_registered_tool() {
        let provider = OpenAI::new("key")
            .append_system_input("system".to_string())
            .append_user_input("نص".to_string());
        let body = request_body(&provider, &sample_tool());
        assert_eq!(body["tool_choice"]["function"]["name"], "deliver_translation");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "نص");
        assert_eq!(body["model"], DEFAULT_MODEL);
    }

    #[tokio::test]
    async fn unregistered_tool_fails_before_any_request() {
        let err = OpenAI::new("key")
            .with_base_url("http://127.0.0.1:9")
            .call_tool("deliver_translation")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not registered"));
    }

    async fn spawn_mock(status: StatusCode, body: serde_json::Value) -> String {
        let app = Router::new().route(
            "/chat/completions",
            post(move || {
                let body = body.clone();
                async move { (status, Json(body)) }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn calls_chat_completions_endpoint() {
        let fixture: serde_json::Value = serde_json::from_str(include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/openai_tool_response.json"
        )))
        .unwrap();
        let base = spawn_mock(StatusCode::OK, fixture).await;
        let response = OpenAI::new("key")
            .with_base_url(base)
            .append_user_input("بسم الله".to_string())
            .register_tool(sample_tool())
            .call_tool("deliver_translation")
            .await
            .unwrap();
        assert_eq!(response.args["translation"], "In the name of God");
    }

    #[tokio::test]
    async fn api_errors_carry_the_message() {
        let base = spawn_mock(
            StatusCode::UNAUTHORIZED,
            json!({"error": {"message": "Incorrect API key"}}),
        )
        .await;
        let err = OpenAI::new("key")
            .with_base_url(base)
            .append_user_input("text".to_string())
            .register_tool(sample_tool())
            .call_tool("deliver_translation")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("401"), "{err}");
        assert!(err.to_string().contains("Incorrect API key"), "{err}");
    }
}
