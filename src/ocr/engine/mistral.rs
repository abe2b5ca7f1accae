use anyhow::{anyhow, Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::ocr::OcrRequest;
use crate::providers::retry::{
    is_rate_limited, retry_after, wait_with_backoff, RATE_LIMIT_BASE_DELAY, RATE_LIMIT_MAX_RETRIES,
};
use crate::settings::Settings;

const SERVICE: &str = "Mistral";

pub(super) async fn run_mistral_ocr(request: &OcrRequest, settings: &Settings) -> Result<String> {
    let key = resolve_key(settings)?;
    let base = settings.mistral_base_url.trim_end_matches('/').to_string();
    let bytes = tokio::fs::read(&request.path)
        .await
        .with_context(|| format!("failed to read upload: {}", request.path.display()))?;
    let client = Client::new();

    let file_id = upload_file(&client, &base, &key, request, bytes).await?;
    let result = run_ocr(&client, &base, &key, &settings.mistral_model, &file_id).await;
    if let Err(err) = delete_file(&client, &base, &key, &file_id).await {
        warn!("failed to delete Mistral file {}: {}", file_id, err);
    }
    result
}

fn resolve_key(settings: &Settings) -> Result<String> {
    std::env::var("MISTRAL_API_KEY")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .or_else(|| settings.mistral_api_key.clone())
        .ok_or_else(|| anyhow!("MISTRAL_API_KEY is not set"))
}

async fn upload_file(
    client: &Client,
    base: &str,
    key: &str,
    request: &OcrRequest,
    bytes: Vec<u8>,
) -> Result<String> {
    let url = format!("{}/files", base);
    let (status, text) = send_with_retry(|| {
        let part = Part::bytes(bytes.clone())
            .file_name(request.file_name.clone())
            .mime_str(&request.mime)?;
        let form = Form::new().part("file", part).text("purpose", "ocr");
        Ok(client.post(&url).bearer_auth(key).multipart(form))
    })
    .await?;
    if !status.is_success() {
        return Err(anyhow!(
            "file upload failed ({}): {}",
            status,
            extract_mistral_error(&text).unwrap_or(text)
        ));
    }
    let uploaded: UploadedFileResponse =
        serde_json::from_str(&text).with_context(|| "failed to parse Mistral upload response")?;
    Ok(uploaded.id)
}

async fn run_ocr(
    client: &Client,
    base: &str,
    key: &str,
    model: &str,
    file_id: &str,
) -> Result<String> {
    let url = format!("{}/ocr", base);
    let body = ocr_payload(model, file_id);
    let (status, text) =
        send_with_retry(|| Ok(client.post(&url).bearer_auth(key).json(&body))).await?;
    if !status.is_success() {
        return Err(anyhow!(
            "OCR failed ({}): {}",
            status,
            extract_mistral_error(&text).unwrap_or(text)
        ));
    }
    parse_ocr_response(&text)
}

async fn delete_file(client: &Client, base: &str, key: &str, file_id: &str) -> Result<()> {
    let url = format!("{}/files/{}", base, file_id);
    let response = client.delete(&url).bearer_auth(key).send().await?;
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(anyhow!("delete returned {}: {}", status, text));
    }
    Ok(())
}

fn ocr_payload(model: &str, file_id: &str) -> serde_json::Value {
    // Only the first page is processed.
    json!({
        "model": model,
        "document": {
            "type": "file",
            "file_id": file_id
        },
        "pages": [0],
        "include_image_base64": false,
        "image_limit": 0,
        "image_min_size": 0
    })
}

async fn send_with_retry<F>(build: F) -> Result<(StatusCode, String)>
where
    F: Fn() -> Result<RequestBuilder>,
{
    let mut attempt = 0usize;
    let mut delay = RATE_LIMIT_BASE_DELAY;
    loop {
        attempt += 1;
        let response = build()?.send().await?;
        let status = response.status();
        let retry_after = retry_after(response.headers());
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() && is_rate_limited(status, &text) && attempt < RATE_LIMIT_MAX_RETRIES
        {
            delay = wait_with_backoff(SERVICE, attempt, delay, retry_after).await;
            continue;
        }
        return Ok((status, text));
    }
}

fn parse_ocr_response(text: &str) -> Result<String> {
    let payload: OcrResponse =
        serde_json::from_str(text).with_context(|| "failed to parse Mistral OCR response")?;
    payload
        .pages
        .into_iter()
        .next()
        .map(|page| page.markdown)
        .ok_or_else(|| anyhow!("Mistral OCR returned no pages"))
}

fn extract_mistral_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: Option<String>,
        detail: Option<serde_json::Value>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    if let Some(message) = parsed.message.filter(|value| !value.trim().is_empty()) {
        return Some(message);
    }
    match parsed.detail? {
        serde_json::Value::String(detail) => Some(detail),
        other => Some(other.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct UploadedFileResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    #[serde(default)]
    pages: Vec<OcrPage>,
}

#[derive(Debug, Deserialize)]
struct OcrPage {
    markdown: String,
}
