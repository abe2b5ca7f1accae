use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::process::Command;

use super::run_command;

pub fn list_tesseract_languages(binary: &str) -> Result<Vec<String>> {
    let output = Command::new(binary)
        .arg("--list-langs")
        .output()
        .with_context(|| "failed to run tesseract --list-langs")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("tesseract --list-langs failed: {}", stderr.trim()));
    }
    Ok(parse_list_langs(&String::from_utf8_lossy(&output.stdout)))
}

/// `--list-langs` prints a header line followed by one language per line.
fn parse_list_langs(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .skip(1)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

pub(super) fn normalize_ocr_languages(binary: &str, requested: &str) -> Result<String> {
    let trimmed = requested.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("ocr languages is empty"));
    }

    let available = match list_tesseract_languages(binary) {
        Ok(list) => list,
        Err(_) => return Ok(trimmed.to_string()),
    };
    select_languages(trimmed, &available)
}

fn select_languages(requested: &str, available: &[String]) -> Result<String> {
    let mut chosen = Vec::new();
    let mut missing = Vec::new();
    for raw in requested.split(['+', ',', ' ']) {
        let lang = raw.trim();
        if lang.is_empty() {
            continue;
        }
        if available.iter().any(|value| value == lang) {
            chosen.push(lang.to_string());
        } else {
            missing.push(lang.to_string());
        }
    }

    if chosen.is_empty() {
        return Err(anyhow!(
            "ocr language(s) not available: {} (available: {})",
            missing.join(", "),
            available.join(", ")
        ));
    }
    if !missing.is_empty() {
        tracing::warn!(
            "ocr language(s) not available: {} (available: {})",
            missing.join(", "),
            available.join(", ")
        );
    }

    Ok(chosen.join("+"))
}

pub(super) fn run_tesseract_text(binary: &str, path: &Path, languages: &str) -> Result<String> {
    let mut command = Command::new(binary);
    command.arg(path).arg("stdout").arg("-l").arg(languages);
    let stdout = run_command(command, "tesseract")?;
    Ok(stdout.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn available() -> Vec<String> {
        ["ara", "eng", "osd"].iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn list_langs_skips_header() {
        let stdout = "List of available languages in \"/usr/share/tessdata/\" (3):\nara\neng\n\nosd\n";
        assert_eq!(parse_list_langs(stdout), available());
    }

    #[test]
    fn keeps_installed_languages_in_order() {
        assert_eq!(select_languages("ara+eng+rus+hye", &available()).unwrap(), "ara+eng");
        assert_eq!(select_languages("eng, ara", &available()).unwrap(), "eng+ara");
    }

    #[test]
    fn fails_when_nothing_is_installed() {
        let err = select_languages("rus+hye", &available()).unwrap_err();
        assert!(err.to_string().contains("not available: rus, hye"));
    }

    #[test]
    fn empty_request_is_an_error() {
        assert!(normalize_ocr_languages("tesseract", "  ").is_err());
    }

    #[test]
    fn unknown_binary_keeps_request_as_is() {
        let languages =
            normalize_ocr_languages("definitely-not-a-tesseract-binary", "ara+eng").unwrap();
        assert_eq!(languages, "ara+eng");
    }
}
