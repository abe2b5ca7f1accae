use axum::extract::Multipart;

use super::models::ServerError;

/// Fields of the `/upload` form.
#[derive(Debug, Default)]
pub(crate) struct UploadForm {
    /// `(file name, bytes)`; the name may be empty when the browser sent none.
    pub(crate) file: Option<(String, Vec<u8>)>,
    pub(crate) engine: Option<String>,
    pub(crate) language: Option<String>,
}

pub(crate) async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, ServerError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await.map_err(|err| {
        tracing::warn!("failed to read multipart field: {}", err);
        ServerError::bad_request("Failed to read upload").with_details(err.to_string())
    })? {
        let name = field.name().unwrap_or("").to_string();
        tracing::debug!(
            "received field: name='{}', filename={:?}",
            name,
            field.file_name()
        );
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let bytes = field.bytes().await.map_err(|err| {
                    ServerError::bad_request("Failed to read upload").with_details(err.to_string())
                })?;
                form.file = Some((file_name, bytes.to_vec()));
            }
            "engine" | "language" => {
                let value = field.text().await.map_err(|err| {
                    ServerError::bad_request("Failed to read upload").with_details(err.to_string())
                })?;
                let value = Some(value.trim().to_string()).filter(|value| !value.is_empty());
                if name == "engine" {
                    form.engine = value;
                } else {
                    form.language = value;
                }
            }
            _ => {}
        }
    }
    Ok(form)
}
