use std::io::{self, Read};
use std::path::Path;

use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "arabic-ocr-rust",
    version,
    about = "OCR Arabic documents, then transliterate or translate the text"
)]
struct Cli {
    /// Run the HTTP server instead of a one-shot conversion
    #[arg(long = "serve")]
    serve: bool,

    /// Server listen address (default: [server] addr from settings)
    #[arg(long = "addr")]
    addr: Option<String>,

    /// Image or PDF to OCR (pdf, png, jpg, jpeg). Reads text from stdin when omitted.
    #[arg(short = 'd', long = "data")]
    data: Option<String>,

    /// OCR engine: EasyOCR, MistralOCR or TesseractOCR
    #[arg(short = 'e', long = "engine")]
    engine: Option<String>,

    /// OCR language hint (e.g. ar)
    #[arg(short = 'l', long = "language")]
    language: Option<String>,

    /// Print the Latin transliteration of the text
    #[arg(long = "transliterate")]
    transliterate: bool,

    /// Print a translation of the text
    #[arg(long = "translate")]
    translate: bool,

    /// Translation target language (default: [translation] default_target_lang)
    #[arg(short = 't', long = "target-lang")]
    target_lang: Option<String>,

    /// Translation source language. Use "auto" to detect.
    #[arg(short = 'L', long = "source-lang", default_value = "auto")]
    source_lang: String,

    /// Also write the results to a .docx file
    #[arg(short = 'o', long = "out")]
    out: Option<String>,

    /// Translation model (overrides settings)
    #[arg(short = 'm', long = "model")]
    model: Option<String>,

    /// Translation API key (overrides environment variables)
    #[arg(short = 'k', long = "key")]
    key: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    arabic_ocr_rust::logging::init(cli.verbose, cli.serve)?;

    if cli.serve {
        let settings =
            arabic_ocr_rust::settings::load_settings(cli.read_settings.as_deref().map(Path::new))?;
        let addr = cli.addr.unwrap_or_else(|| settings.server_addr.clone());
        return arabic_ocr_rust::server::run_server(settings, addr).await;
    }

    let input = if cli.data.is_none() {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Some(buffer)
    } else {
        None
    };

    let output = arabic_ocr_rust::run(
        arabic_ocr_rust::Config {
            data: cli.data,
            engine: cli.engine,
            language: cli.language,
            transliterate: cli.transliterate,
            translate: cli.translate,
            target_lang: cli.target_lang,
            source_lang: cli.source_lang,
            out: cli.out,
            model: cli.model,
            key: cli.key,
            settings_path: cli.read_settings,
        },
        input,
    )
    .await?;

    println!("{}", output);
    Ok(())
}
