//! Word document export for OCR results.
//!
//! The package is a minimal WordprocessingML file: one body with a title,
//! the recognized text, and the optional translation and transliteration
//! sections.

use anyhow::{Context, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Cursor, Write};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::transliteration::contains_source_script;

pub use crate::data::DOCX_MIME;

pub const DOWNLOAD_FILE_NAME: &str = "arabic_ocr_output.docx";

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/></Relationships>"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:cs="Arial"/><w:sz w:val="24"/><w:szCs w:val="24"/></w:rPr></w:rPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:pPr><w:spacing w:after="160"/></w:pPr></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:keepNext/><w:spacing w:before="240" w:after="120"/><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:b/><w:sz w:val="36"/><w:szCs w:val="36"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:keepNext/><w:spacing w:before="200" w:after="80"/><w:outlineLvl w:val="1"/></w:pPr><w:rPr><w:b/><w:sz w:val="28"/><w:szCs w:val="28"/></w:rPr></w:style></w:styles>"#;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OcrDocument {
    pub original: String,
    pub translation: String,
    pub transliteration: String,
}

pub fn render_docx(document: &OcrDocument) -> Result<Vec<u8>> {
    let body = document_xml(document)?;
    let core = core_xml(OffsetDateTime::now_utc())?;
    let parts: [(&str, &[u8]); 6] = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes()),
        ("_rels/.rels", ROOT_RELS_XML.as_bytes()),
        ("docProps/core.xml", core.as_bytes()),
        ("word/document.xml", &body),
        ("word/styles.xml", STYLES_XML.as_bytes()),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS_XML.as_bytes()),
    ];

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, bytes) in parts {
        zip.start_file(name, options)
            .with_context(|| format!("failed to add {} to docx", name))?;
        zip.write_all(bytes)
            .with_context(|| format!("failed to write {} to docx", name))?;
    }
    let cursor = zip.finish().with_context(|| "failed to finish docx")?;
    Ok(cursor.into_inner())
}

fn document_xml(document: &OcrDocument) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    writer.write_event(Event::Start(
        BytesStart::new("w:document").with_attributes([("xmlns:w", W_NS)]),
    ))?;
    writer.write_event(Event::Start(BytesStart::new("w:body")))?;

    write_heading(&mut writer, "Heading1", "OCR Output")?;
    write_heading(&mut writer, "Heading2", "Original Arabic Text")?;
    write_paragraph(&mut writer, &document.original)?;
    if !document.translation.trim().is_empty() {
        write_heading(&mut writer, "Heading2", "Translation")?;
        write_paragraph(&mut writer, &document.translation)?;
    }
    if !document.transliteration.trim().is_empty() {
        write_heading(&mut writer, "Heading2", "Transliteration")?;
        write_paragraph(&mut writer, &document.transliteration)?;
    }

    writer.write_event(Event::End(BytesEnd::new("w:body")))?;
    writer.write_event(Event::End(BytesEnd::new("w:document")))?;
    Ok(writer.into_inner())
}

fn write_heading(writer: &mut Writer<Vec<u8>>, style: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("w:p")))?;
    writer.write_event(Event::Start(BytesStart::new("w:pPr")))?;
    writer.write_event(Event::Empty(
        BytesStart::new("w:pStyle").with_attributes([("w:val", style)]),
    ))?;
    writer.write_event(Event::End(BytesEnd::new("w:pPr")))?;
    writer.write_event(Event::Start(BytesStart::new("w:r")))?;
    write_text(writer, text)?;
    writer.write_event(Event::End(BytesEnd::new("w:r")))?;
    writer.write_event(Event::End(BytesEnd::new("w:p")))?;
    Ok(())
}

/// One paragraph per section; line breaks and tabs stay inside the run.
fn write_paragraph(writer: &mut Writer<Vec<u8>>, text: &str) -> Result<()> {
    let rtl = contains_source_script(text);
    writer.write_event(Event::Start(BytesStart::new("w:p")))?;
    if rtl {
        writer.write_event(Event::Start(BytesStart::new("w:pPr")))?;
        writer.write_event(Event::Empty(BytesStart::new("w:bidi")))?;
        writer.write_event(Event::End(BytesEnd::new("w:pPr")))?;
    }
    writer.write_event(Event::Start(BytesStart::new("w:r")))?;
    if rtl {
        writer.write_event(Event::Start(BytesStart::new("w:rPr")))?;
        writer.write_event(Event::Empty(BytesStart::new("w:rtl")))?;
        writer.write_event(Event::End(BytesEnd::new("w:rPr")))?;
    }

    let normalized = text.replace("\r\n", "\n");
    for (line_index, line) in normalized.split('\n').enumerate() {
        if line_index > 0 {
            writer.write_event(Event::Empty(BytesStart::new("w:br")))?;
        }
        for (tab_index, chunk) in line.split('\t').enumerate() {
            if tab_index > 0 {
                writer.write_event(Event::Empty(BytesStart::new("w:tab")))?;
            }
            if !chunk.is_empty() {
                write_text(writer, chunk)?;
            }
        }
    }

    writer.write_event(Event::End(BytesEnd::new("w:r")))?;
    writer.write_event(Event::End(BytesEnd::new("w:p")))?;
    Ok(())
}

fn write_text(writer: &mut Writer<Vec<u8>>, text: &str) -> Result<()> {
    writer.write_event(Event::Start(
        BytesStart::new("w:t").with_attributes([("xml:space", "preserve")]),
    ))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new("w:t")))?;
    Ok(())
}

fn core_xml(created: OffsetDateTime) -> Result<String> {
    let timestamp = created
        .format(&Rfc3339)
        .with_context(|| "failed to format docx timestamp")?;
    Ok(format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\n",
            r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" "#,
            r#"xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" "#,
            r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
            "<dc:title>OCR Output</dc:title>",
            "<dc:creator>arabic-ocr-rust</dc:creator>",
            r#"<dcterms:created xsi:type="dcterms:W3CDTF">{stamp}</dcterms:created>"#,
            r#"<dcterms:modified xsi:type="dcterms:W3CDTF">{stamp}</dcterms:modified>"#,
            "</cp:coreProperties>"
        ),
        stamp = timestamp
    ))
}
