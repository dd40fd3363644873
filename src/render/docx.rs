//! Word-processing (DOCX) package built from the document block stream.
//!
//! The package is a deflated zip holding the minimal WordprocessingML part
//! set. Headings carry bookmarks so the table of contents links resolve
//! inside the document; external links become hyperlink relationships.
//! Entry timestamps are fixed, so only `dcterms:created` varies between two
//! renders of the same text.

use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Write};

use chrono::{DateTime, Utc};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::prose::{parse_inline, prose_shape, Inline, ProseShape};
use super::{export_filename, require_text, ExportFormat, RenderedExport};
use crate::dossier::{parse_blocks, DocumentBlock};
use crate::error::{AppError, Result};

pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// A4 portrait in twentieths of a point.
const PAGE_WIDTH: u32 = 11906;
const PAGE_HEIGHT: u32 = 16838;
const PAGE_MARGIN: u32 = 1134;
const CONTENT_WIDTH: u32 = PAGE_WIDTH - 2 * PAGE_MARGIN;

const MAX_BOOKMARK_LEN: usize = 40;
const CODE_FONT: &str = "Courier New";

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const REL_HYPERLINK: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";

pub fn render_word_processing(text: &str, title: &str) -> Result<RenderedExport> {
    render_word_processing_at(text, title, Utc::now())
}

/// Same as `render_word_processing` with an explicit creation timestamp.
pub fn render_word_processing_at(
    text: &str,
    title: &str,
    created: DateTime<Utc>,
) -> Result<RenderedExport> {
    require_text(text)?;

    let mut body = BodyWriter::default();
    for block in parse_blocks(text) {
        body.block(&block);
    }
    let document = body.document_xml();
    let document_rels = body.relationships_xml();

    let parts: [(&str, String); 7] = [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", PACKAGE_RELS.to_string()),
        ("docProps/core.xml", core_properties(title, created)),
        ("docProps/app.xml", APP_PROPERTIES.to_string()),
        ("word/_rels/document.xml.rels", document_rels),
        ("word/document.xml", document),
        ("word/styles.xml", STYLES.to_string()),
    ];
    let bytes = package(&parts)?;
    tracing::debug!("Packaged {} DOCX parts into {} bytes", parts.len(), bytes.len());

    Ok(RenderedExport {
        bytes,
        mime_type: DOCX_MIME,
        filename: export_filename(title, ExportFormat::Docx),
    })
}

fn package(parts: &[(&str, String)]) -> Result<Vec<u8>> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in parts {
        zip.start_file(*name, options)?;
        zip.write_all(content.as_bytes())
            .map_err(|e| AppError::serialization(format!("failed to write {name}: {e}")))?;
    }
    Ok(zip.finish()?.into_inner())
}

/// Accumulates `w:body` content and the external links it references.
#[derive(Default)]
struct BodyWriter {
    xml: String,
    external_links: Vec<String>,
    next_bookmark: u32,
    bookmarks: HashMap<String, String>,
    taken: HashSet<String>,
}

impl BodyWriter {
    fn block(&mut self, block: &DocumentBlock) {
        match block {
            DocumentBlock::Heading {
                level,
                text,
                anchor,
            } => self.heading(*level, text, anchor),
            DocumentBlock::Paragraph { text } => match prose_shape(text) {
                ProseShape::List(items) => {
                    for item in items {
                        let runs = format!("{}{}", run("\u{2022} ", ""), self.inline_runs(item, ""));
                        self.paragraph("ListParagraph", &runs);
                    }
                }
                ProseShape::Quote(lines) => {
                    for line in lines {
                        let runs = self.inline_runs(line, "");
                        self.paragraph("Quote", &runs);
                    }
                }
                ProseShape::Lines(lines) => {
                    let runs: Vec<String> = lines.iter().map(|l| self.inline_runs(l, "")).collect();
                    self.paragraph("Normal", &runs.join("<w:r><w:br/></w:r>"));
                }
            },
            DocumentBlock::CodeBlock { text, .. } => {
                for line in text.split('\n') {
                    self.paragraph("Code", &run(&line.replace('\t', "    "), ""));
                }
            }
            DocumentBlock::Table { headers, rows } => self.table(headers, rows),
        }
    }

    fn heading(&mut self, level: u8, text: &str, anchor: &str) {
        let style = match level {
            0 | 1 => "Title".to_string(),
            n => format!("Heading{}", (n - 1).min(3)),
        };
        let id = self.next_bookmark;
        self.next_bookmark += 1;
        let name = self.bookmark(anchor);
        self.xml.push_str(&format!(
            "<w:p><w:pPr><w:pStyle w:val=\"{style}\"/></w:pPr><w:bookmarkStart w:id=\"{id}\" w:name=\"{name}\"/>{}<w:bookmarkEnd w:id=\"{id}\"/></w:p>",
            run(text, "")
        ));
    }

    fn paragraph(&mut self, style: &str, runs: &str) {
        self.xml.push_str(&format!(
            "<w:p><w:pPr><w:pStyle w:val=\"{style}\"/></w:pPr>{runs}</w:p>"
        ));
    }

    fn table(&mut self, headers: &[String], rows: &[Vec<String>]) {
        let columns = headers.len().max(1);
        let col_width = CONTENT_WIDTH / columns as u32;

        let mut xml = String::from(
            "<w:tbl><w:tblPr><w:tblStyle w:val=\"TableGrid\"/><w:tblW w:w=\"5000\" w:type=\"pct\"/><w:tblBorders>",
        );
        for side in ["top", "left", "bottom", "right", "insideH", "insideV"] {
            xml.push_str(&format!(
                "<w:{side} w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"D1D5DB\"/>"
            ));
        }
        xml.push_str("</w:tblBorders></w:tblPr><w:tblGrid>");
        for _ in 0..columns {
            xml.push_str(&format!("<w:gridCol w:w=\"{col_width}\"/>"));
        }
        xml.push_str("</w:tblGrid>");

        xml.push_str("<w:tr><w:trPr><w:tblHeader/></w:trPr>");
        for i in 0..columns {
            let header = headers.get(i).map(String::as_str).unwrap_or("");
            let runs = self.inline_runs(header, "<w:b/>");
            xml.push_str(&format!(
                "<w:tc><w:tcPr><w:shd w:val=\"clear\" w:color=\"auto\" w:fill=\"F1F5F9\"/></w:tcPr><w:p>{runs}</w:p></w:tc>"
            ));
        }
        xml.push_str("</w:tr>");

        for row in rows {
            xml.push_str("<w:tr>");
            for i in 0..columns {
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                let runs = self.inline_runs(cell, "");
                xml.push_str(&format!("<w:tc><w:p>{runs}</w:p></w:tc>"));
            }
            xml.push_str("</w:tr>");
        }
        xml.push_str("</w:tbl>");
        self.xml.push_str(&xml);
    }

    fn inline_runs(&mut self, text: &str, base: &str) -> String {
        let mut out = String::new();
        for span in parse_inline(text) {
            match span {
                Inline::Text(t) => out.push_str(&run(&t, base)),
                Inline::Strong(t) => out.push_str(&run(&t, &format!("{base}<w:b/>"))),
                Inline::Emphasis(t) => out.push_str(&run(&t, &format!("{base}<w:i/>"))),
                Inline::Code(t) => out.push_str(&run(
                    &t,
                    &format!("{base}<w:rFonts w:ascii=\"{CODE_FONT}\" w:hAnsi=\"{CODE_FONT}\"/>"),
                )),
                Inline::Link { text, target } => {
                    let styled = format!("<w:rStyle w:val=\"Hyperlink\"/>{base}");
                    let inner = run(&text, &styled);
                    match target.strip_prefix('#') {
                        Some(anchor) => {
                            let name = self.bookmark(anchor);
                            out.push_str(&format!(
                                "<w:hyperlink w:anchor=\"{name}\">{inner}</w:hyperlink>"
                            ));
                        }
                        None => {
                            let id = self.link_relationship(&target);
                            out.push_str(&format!("<w:hyperlink r:id=\"{id}\">{inner}</w:hyperlink>"));
                        }
                    }
                }
            }
        }
        out
    }

    /// Bookmark for `anchor`, stable across headings and links. Anchors that
    /// collide after truncation get a numeric suffix.
    fn bookmark(&mut self, anchor: &str) -> String {
        if let Some(name) = self.bookmarks.get(anchor) {
            return name.clone();
        }
        let base = bookmark_name(anchor);
        let mut name = base.clone();
        let mut n = 2;
        while self.taken.contains(&name) {
            let suffix = format!("_{n}");
            let keep = MAX_BOOKMARK_LEN.saturating_sub(suffix.len()).min(base.len());
            name = format!("{}{suffix}", &base[..keep]);
            n += 1;
        }
        self.taken.insert(name.clone());
        self.bookmarks.insert(anchor.to_string(), name.clone());
        name
    }

    fn link_relationship(&mut self, target: &str) -> String {
        let index = match self.external_links.iter().position(|t| t == target) {
            Some(i) => i,
            None => {
                self.external_links.push(target.to_string());
                self.external_links.len() - 1
            }
        };
        format!("rId{}", index + 2)
    }

    fn document_xml(&self) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<w:document xmlns:w=\"{W_NS}\" xmlns:r=\"{R_NS}\"><w:body>{}<w:p/><w:sectPr><w:pgSz w:w=\"{PAGE_WIDTH}\" w:h=\"{PAGE_HEIGHT}\"/><w:pgMar w:top=\"{PAGE_MARGIN}\" w:right=\"{PAGE_MARGIN}\" w:bottom=\"{PAGE_MARGIN}\" w:left=\"{PAGE_MARGIN}\" w:header=\"708\" w:footer=\"708\" w:gutter=\"0\"/></w:sectPr></w:body></w:document>",
            self.xml
        )
    }

    fn relationships_xml(&self) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\"><Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles\" Target=\"styles.xml\"/>",
        );
        for (i, target) in self.external_links.iter().enumerate() {
            xml.push_str(&format!(
                "<Relationship Id=\"rId{}\" Type=\"{REL_HYPERLINK}\" Target=\"{}\" TargetMode=\"External\"/>",
                i + 2,
                escape_xml(target)
            ));
        }
        xml.push_str("</Relationships>");
        xml
    }
}

fn run(text: &str, properties: &str) -> String {
    let props = if properties.is_empty() {
        String::new()
    } else {
        format!("<w:rPr>{properties}</w:rPr>")
    };
    format!("<w:r>{props}<w:t xml:space=\"preserve\">{}</w:t></w:r>", escape_xml(text))
}

/// Word bookmark names must start with a letter and stay under 40 chars.
fn bookmark_name(anchor: &str) -> String {
    std::iter::once('a')
        .chain(std::iter::once('_'))
        .chain(anchor.chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }))
        .take(MAX_BOOKMARK_LEN)
        .collect()
}

/// Escape markup characters and drop code points XML 1.0 cannot carry.
fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if c.is_control() || c == '\u{FFFE}' || c == '\u{FFFF}' => {}
            c => out.push(c),
        }
    }
    out
}

fn core_properties(title: &str, created: DateTime<Utc>) -> String {
    let stamp = created.format("%Y-%m-%dT%H:%M:%SZ");
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<cp:coreProperties xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" xmlns:dc=\"http://purl.org/dc/elements/1.1/\" xmlns:dcterms=\"http://purl.org/dc/terms/\" xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\"><dc:title>{}</dc:title><dc:creator>repo-dossier</dc:creator><dcterms:created xsi:type=\"dcterms:W3CDTF\">{stamp}</dcterms:created></cp:coreProperties>",
        escape_xml(title)
    )
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/><Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/></Relationships>"#;

const APP_PROPERTIES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Application>repo-dossier</Application></Properties>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:cs="Calibri"/><w:sz w:val="22"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="120" w:line="264" w:lineRule="auto"/></w:pPr></w:pPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style><w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:spacing w:after="240"/></w:pPr><w:rPr><w:b/><w:color w:val="0F172A"/><w:sz w:val="40"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:keepNext/><w:spacing w:before="360" w:after="120"/><w:pBdr><w:bottom w:val="single" w:sz="4" w:space="1" w:color="E5E7EB"/></w:pBdr><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:b/><w:color w:val="0F172A"/><w:sz w:val="32"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:keepNext/><w:spacing w:before="240" w:after="80"/><w:outlineLvl w:val="1"/></w:pPr><w:rPr><w:b/><w:color w:val="0F172A"/><w:sz w:val="26"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading3"><w:name w:val="heading 3"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:keepNext/><w:spacing w:before="200" w:after="60"/><w:outlineLvl w:val="2"/></w:pPr><w:rPr><w:b/><w:sz w:val="22"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Code"><w:name w:val="Code"/><w:basedOn w:val="Normal"/><w:pPr><w:shd w:val="clear" w:color="auto" w:fill="F1F5F9"/><w:spacing w:after="0" w:line="240" w:lineRule="auto"/></w:pPr><w:rPr><w:rFonts w:ascii="Courier New" w:hAnsi="Courier New" w:cs="Courier New"/><w:sz w:val="18"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Quote"><w:name w:val="Quote"/><w:basedOn w:val="Normal"/><w:pPr><w:ind w:left="284"/><w:pBdr><w:left w:val="single" w:sz="18" w:space="6" w:color="E5E7EB"/></w:pBdr></w:pPr><w:rPr><w:color w:val="374151"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="ListParagraph"><w:name w:val="List Paragraph"/><w:basedOn w:val="Normal"/><w:pPr><w:ind w:left="360" w:hanging="220"/><w:spacing w:after="40"/></w:pPr></w:style><w:style w:type="character" w:styleId="Hyperlink"><w:name w:val="Hyperlink"/><w:rPr><w:color w:val="0369A1"/><w:u w:val="single"/></w:rPr></w:style><w:style w:type="table" w:styleId="TableGrid"><w:name w:val="Table Grid"/><w:tblPr><w:tblCellMar><w:top w:w="40" w:type="dxa"/><w:left w:w="100" w:type="dxa"/><w:bottom w:w="40" w:type="dxa"/><w:right w:w="100" w:type="dxa"/></w:tblCellMar></w:tblPr></w:style></w:styles>"#;
