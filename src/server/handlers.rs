use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;

use super::models::{
    DownloadRequest, ServerError, TranslateRequest, TranslateResponse, TransliterateRequest,
    TransliterateResponse, UploadResponse,
};
use super::page::render_index_html;
use super::state::ServerState;
use super::upload::read_upload_form;
use super::util;
use crate::data::{self, UploadedFile};
use crate::document::{self, OcrDocument, DOWNLOAD_FILE_NAME};
use crate::ocr::{self, OcrEngineKind, OcrRequest};
use crate::providers;
use crate::settings;
use crate::translations::TranslateOptions;
use crate::transliteration;
use crate::translator::Translator;

pub async fn run_server(settings: settings::Settings, addr: String) -> Result<()> {
    let app = build_router(settings)?;
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind server address {}", addr))?;
    tracing::info!("listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

pub fn build_router(settings: settings::Settings) -> Result<Router> {
    let index_html = render_index_html(&settings)?;
    let body_limit = settings.max_upload_bytes;
    let state = Arc::new(ServerState {
        settings,
        index_html,
    });
    Ok(Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/upload", post(upload))
        .route("/translate", post(translate))
        .route("/transliterate", post(transliterate))
        .route("/download", post(download))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn(cors_middleware))
        .layer(
            TraceLayer::new_for_http()
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        ))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
}

async fn index(State(state): State<Arc<ServerState>>) -> Html<String> {
    Html(state.index_html.clone())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn cors_middleware(req: Request<Body>, next: Next) -> Result<Response<Body>, StatusCode> {
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return Ok(response);
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    Ok(response)
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type,authorization"),
    );
    headers.insert(
        "access-control-expose-headers",
        HeaderValue::from_static("content-disposition"),
    );
}

async fn upload(
    State(state): State<Arc<ServerState>>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ServerError> {
    let form = read_upload_form(multipart).await?;
    let Some((file_name, bytes)) = form.file else {
        return Err(ServerError::bad_request("No file uploaded"));
    };
    let Some(stored_name) = data::upload_file_name(&file_name) else {
        return Err(ServerError::bad_request("Invalid file type"));
    };

    let settings = &state.settings;
    let engine_name = form
        .engine
        .unwrap_or_else(|| settings.default_engine.clone());
    let kind = engine_name
        .parse::<OcrEngineKind>()
        .map_err(|err| ServerError::bad_request(err.to_string()))?;
    let language = form
        .language
        .unwrap_or_else(|| settings.default_language.clone());

    let upload = UploadedFile::new(bytes, stored_name);
    if upload.is_pdf() && !kind.accepts_pdf() {
        return Err(ServerError::bad_request("Invalid file type").with_details(format!(
            "{} cannot read PDF files; use {}",
            kind,
            OcrEngineKind::MistralOcr
        )));
    }

    let path = util::save_upload(&upload.bytes, &upload.file_name, &settings.upload_dir)?;
    let request = OcrRequest {
        path: path.clone(),
        file_name: upload.file_name,
        mime: upload.mime,
        language,
    };
    let result = ocr::extract_text(kind, &request, settings).await;
    if !settings.keep_uploads {
        util::remove_upload(&path);
    }

    let text = result
        .map_err(|err| ServerError::internal("OCR failed").with_details(format!("{:#}", err)))?;
    Ok(Json(UploadResponse { text }))
}

async fn translate(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<TranslateRequest>,
) -> Result<Json<TranslateResponse>, ServerError> {
    let text = payload.text.unwrap_or_default();
    if text.trim().is_empty() {
        return Err(ServerError::bad_request("No text provided"));
    }
    let settings = &state.settings;
    let target_lang = payload
        .target_lang
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| settings.default_target_lang.clone());
    let source_lang = payload.source_lang.unwrap_or_else(|| "auto".to_string());
    let options = TranslateOptions::new(&source_lang, &target_lang)
        .map_err(|err| ServerError::bad_request(err.to_string()))?;

    let provider = providers::build_provider(settings, None, None).map_err(|err| {
        ServerError::internal("Translation failed").with_details(err.to_string())
    })?;
    let output = Translator::new(provider)
        .exec(&text, options)
        .await
        .map_err(|err| {
            ServerError::internal("Translation failed").with_details(format!("{:#}", err))
        })?;
    Ok(Json(TranslateResponse {
        translation: output.text,
    }))
}

async fn transliterate(
    Json(payload): Json<TransliterateRequest>,
) -> Result<Json<TransliterateResponse>, ServerError> {
    let text = payload.text.unwrap_or_default();
    if text.trim().is_empty() {
        return Err(ServerError::bad_request("No text provided"));
    }
    Ok(Json(TransliterateResponse {
        transliteration: transliteration::transliterate(&text),
    }))
}

async fn download(Json(payload): Json<DownloadRequest>) -> Result<Response<Body>, ServerError> {
    let bytes = document::render_docx(&OcrDocument {
        original: payload.original,
        translation: payload.translation,
        transliteration: payload.transliteration,
    })?;
    let disposition = HeaderValue::from_str(&util::attachment_header(DOWNLOAD_FILE_NAME))
        .map_err(|err| ServerError::internal(err.to_string()))?;
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(data::DOCX_MIME)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
