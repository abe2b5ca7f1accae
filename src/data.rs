use anyhow::{Context, Result};
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const PDF_MIME: &str = "application/pdf";
pub const PNG_MIME: &str = "image/png";
pub const JPEG_MIME: &str = "image/jpeg";
pub const OCTET_STREAM_MIME: &str = "application/octet-stream";

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["pdf", "png", "jpg", "jpeg"];

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime: String,
}

impl UploadedFile {
    pub fn new(bytes: Vec<u8>, file_name: impl Into<String>) -> Self {
        let file_name = file_name.into();
        let mime = mime_for_upload(&bytes, &file_name).to_string();
        Self {
            bytes,
            file_name,
            mime,
        }
    }

    pub fn is_pdf(&self) -> bool {
        self.mime == PDF_MIME
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read data file: {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|value| value.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(Self::new(bytes, name))
    }
}

pub fn get_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    Some(ext.to_lowercase())
}

pub fn allowed_file(file_name: &str) -> bool {
    get_extension(file_name)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Reduce an uploaded file name to `[A-Za-z0-9_.-]`, with no directory part.
///
/// Accents are folded away through NFKD; other non-ASCII characters are
/// dropped, so the result can be empty.
pub fn secure_filename(file_name: &str) -> String {
    let ascii: String = file_name
        .nfkd()
        .filter(char::is_ascii)
        .map(|ch| if ch == '/' || ch == '\\' { ' ' } else { ch })
        .collect();
    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-'))
        .collect();
    kept.trim_matches(|ch| ch == '.' || ch == '_').to_string()
}

/// Name under which an upload is stored, or `None` if its type is not accepted.
pub fn upload_file_name(file_name: &str) -> Option<String> {
    if !allowed_file(file_name) {
        return None;
    }
    let ext = get_extension(file_name)?;
    let secured = secure_filename(file_name);
    if secured.is_empty() || get_extension(&secured).as_deref() != Some(ext.as_str()) {
        return Some(format!("upload.{}", ext));
    }
    match secured.rsplit_once('.') {
        Some((stem, _)) if !stem.trim_matches(|ch| ch == '.' || ch == '_').is_empty() => {
            Some(secured)
        }
        _ => Some(format!("upload.{}", ext)),
    }
}

pub fn mime_for_upload(bytes: &[u8], file_name: &str) -> &'static str {
    if let Some(kind) = infer::get(bytes) {
        match kind.mime_type() {
            PDF_MIME => return PDF_MIME,
            PNG_MIME => return PNG_MIME,
            JPEG_MIME => return JPEG_MIME,
            _ => {}
        }
    }
    match get_extension(file_name).as_deref() {
        Some("pdf") => PDF_MIME,
        Some("png") => PNG_MIME,
        Some("jpg" | "jpeg") => JPEG_MIME,
        _ => OCTET_STREAM_MIME,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn allowed_extensions_are_case_insensitive() {
        assert!(allowed_file("scan.PNG"));
        assert!(allowed_file("scan.jpeg"));
        assert!(allowed_file("archive.tar.pdf"));
        assert!(!allowed_file("scan.gif"));
        assert!(!allowed_file("png"));
        assert!(!allowed_file(""));
    }

    #[test]
    fn extension_is_taken_after_last_dot() {
        assert_eq!(get_extension("a.b.JPG").as_deref(), Some("jpg"));
        assert_eq!(get_extension("noext"), None);
        assert_eq!(get_extension("trailing.").as_deref(), Some(""));
    }

    #[test]
    fn secure_filename_strips_paths_and_symbols() {
        assert_eq!(secure_filename("My cool image.png"), "My_cool_image.png");
        assert_eq!(secure_filename("../../../etc/passwd"), "etc_passwd");
        assert_eq!(secure_filename(r"C:\Users\me\scan 1.jpg"), "C_Users_me_scan_1.jpg");
        assert_eq!(secure_filename("__hidden.png"), "hidden.png");
        assert_eq!(secure_filename("وثيقة.png"), "png");
        assert_eq!(secure_filename("وثيقة"), "");
    }

    #[test]
    fn secure_filename_folds_accents() {
        assert_eq!(secure_filename("résumé façade.png"), "resume_facade.png");
        assert_eq!(secure_filename("Ångström ﬁle.jpg"), "Angstrom_file.jpg");
        assert_eq!(upload_file_name("naïve.PDF").as_deref(), Some("naive.PDF"));
    }

    #[test]
    fn upload_name_falls_back_when_only_extension_survives() {
        assert_eq!(upload_file_name("وثيقة.png").as_deref(), Some("upload.png"));
        assert_eq!(upload_file_name("scan 2.JPG").as_deref(), Some("scan_2.JPG"));
        assert_eq!(upload_file_name("../x.pdf").as_deref(), Some("x.pdf"));
        assert_eq!(upload_file_name("notes.txt"), None);
        assert_eq!(upload_file_name(""), None);
    }

    #[test]
    fn mime_prefers_content_over_extension() {
        assert_eq!(mime_for_upload(PNG_MAGIC, "scan.jpg"), PNG_MIME);
        assert_eq!(mime_for_upload(b"%PDF-1.7\n", "scan.png"), PDF_MIME);
        assert_eq!(mime_for_upload(b"", "scan.jpeg"), JPEG_MIME);
        assert_eq!(mime_for_upload(b"", "scan.bin"), OCTET_STREAM_MIME);
    }

    #[test]
    fn uploaded_file_reports_pdf() {
        let file = UploadedFile::new(b"%PDF-1.4\n".to_vec(), "doc.pdf");
        assert!(file.is_pdf());
        let file = UploadedFile::new(PNG_MAGIC.to_vec(), "doc.png");
        assert!(!file.is_pdf());
        assert_eq!(file.mime, PNG_MIME);
    }
}
