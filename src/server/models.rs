use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct TranslateRequest {
    pub(crate) text: Option<String>,
    pub(crate) target_lang: Option<String>,
    pub(crate) source_lang: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct TransliterateRequest {
    pub(crate) text: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct DownloadRequest {
    pub(crate) original: String,
    pub(crate) translation: String,
    pub(crate) transliteration: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct UploadResponse {
    pub(crate) text: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct TranslateResponse {
    pub(crate) translation: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct TransliterateResponse {
    pub(crate) transliteration: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) details: Option<String>,
}

#[derive(Debug)]
pub(crate) struct ServerError {
    pub(crate) status: StatusCode,
    pub(crate) message: String,
    pub(crate) details: Option<String>,
}

impl ServerError {
    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            details: None,
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            details: None,
        }
    }

    pub(crate) fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::internal(format!("{:#}", err))
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = self.status.as_u16(),
                details = self.details.as_deref().unwrap_or(""),
                "{}",
                self.message
            );
        }
        let body = ErrorResponse {
            error: self.message,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}
