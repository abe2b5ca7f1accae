use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::data;

/// Writes an upload under `dir` with a unique name built from `file_name`.
pub(crate) fn save_upload(bytes: &[u8], file_name: &str, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create upload dir: {}", dir.display()))?;
    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) => (stem, ext),
        None => (file_name, "bin"),
    };
    let prefix = format!("{}-", stem);
    let suffix = format!(".{}", ext);
    let file = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(&suffix)
        .tempfile_in(dir)
        .with_context(|| "failed to create upload file")?;
    std::fs::write(file.path(), bytes).with_context(|| "failed to write upload file")?;
    let path = file
        .into_temp_path()
        .keep()
        .with_context(|| "failed to persist upload file")?;
    Ok(path)
}

pub(crate) fn remove_upload(path: &Path) {
    if let Err(err) = std::fs::remove_file(path) {
        tracing::warn!("failed to remove upload {}: {}", path.display(), err);
    }
}

/// `Content-Disposition` value for a file download.
pub(crate) fn attachment_header(file_name: &str) -> String {
    let safe = data::secure_filename(file_name);
    let safe = if safe.is_empty() {
        "download".to_string()
    } else {
        safe
    };
    format!("attachment; filename=\"{}\"", safe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uploads_keep_stem_and_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = save_upload(b"one", "scan.png", dir.path()).unwrap();
        let second = save_upload(b"two", "scan.png", dir.path()).unwrap();
        assert_ne!(first, second);
        for path in [&first, &second] {
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            assert!(name.starts_with("scan-"), "{name}");
            assert!(name.ends_with(".png"), "{name}");
        }
        assert_eq!(std::fs::read(&first).unwrap(), b"one");

        remove_upload(&first);
        assert!(!first.exists());
        assert!(second.exists());
    }

    #[test]
    fn upload_dir_is_created() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("a").join("uploads");
        let path = save_upload(b"x", "upload.pdf", &nested).unwrap();
        assert!(path.starts_with(&nested));
    }

    #[test]
    fn attachment_names_are_sanitized() {
        assert_eq!(
            attachment_header("arabic_ocr_output.docx"),
            "attachment; filename=\"arabic_ocr_output.docx\""
        );
        assert_eq!(
            attachment_header("../\"x\".docx"),
            "attachment; filename=\"x.docx\""
        );
    }
}
