use anyhow::Result;
use std::path::Path;
use std::process::Command;

use super::run_command;

/// Reader languages: the requested one plus English, without duplicates.
pub(super) fn easyocr_languages(requested: &str) -> Vec<String> {
    let mut languages = Vec::new();
    for raw in requested.split(['+', ',', ' ']).chain(["en"]) {
        let lang = raw.trim().to_lowercase();
        if !lang.is_empty() && !languages.contains(&lang) {
            languages.push(lang);
        }
    }
    languages
}

pub(super) fn easyocr_args(path: &Path, languages: &[String], gpu: bool) -> Vec<String> {
    let mut args = vec!["-l".to_string()];
    args.extend(languages.iter().cloned());
    args.push("-f".to_string());
    args.push(path.to_string_lossy().to_string());
    args.push("--detail".to_string());
    args.push("0".to_string());
    args.push("--gpu".to_string());
    args.push(if gpu { "True" } else { "False" }.to_string());
    args
}

pub(super) fn run_easyocr(
    binary: &str,
    path: &Path,
    languages: &[String],
    gpu: bool,
) -> Result<String> {
    let mut command = Command::new(binary);
    command.args(easyocr_args(path, languages, gpu));
    let stdout = run_command(command, "easyocr")?;
    Ok(join_detections(&stdout))
}

/// With `--detail 0` every detected text box is printed on its own line.
fn join_detections(stdout: &str) -> String {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_is_always_added_once() {
        assert_eq!(easyocr_languages("ar"), vec!["ar", "en"]);
        assert_eq!(easyocr_languages("en"), vec!["en"]);
        assert_eq!(easyocr_languages("AR+fa"), vec!["ar", "fa", "en"]);
        assert_eq!(easyocr_languages(""), vec!["en"]);
    }

    #[test]
    fn args_follow_cli_layout() {
        let args = easyocr_args(
            Path::new("/tmp/scan.png"),
            &["ar".to_string(), "en".to_string()],
            false,
        );
        assert_eq!(
            args,
            vec!["-l", "ar", "en", "-f", "/tmp/scan.png", "--detail", "0", "--gpu", "False"]
        );
    }

    #[test]
    fn detections_are_joined_with_spaces() {
        let stdout = "مرحبا\n  بالعالم \n\nsecond line\n";
        assert_eq!(join_detections(stdout), "مرحبا بالعالم second line");
        assert_eq!(join_detections(""), "");
    }

    #[test]
    fn missing_binary_is_reported() {
        let err = run_easyocr(
            "definitely-not-an-easyocr-binary",
            Path::new("scan.png"),
            &["en".to_string()],
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("failed to run easyocr"));
    }
}
