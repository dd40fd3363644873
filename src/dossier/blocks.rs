//! Parse canonical document text back into blocks.
//!
//! The text is first split into alternating prose and fenced-code regions,
//! then each prose region is split on blank lines into paragraphs. A
//! paragraph is classified as a heading, a table or plain prose. This is the
//! inverse of `document::blocks_to_text` for every document the composer
//! produces.

use std::sync::OnceLock;

use regex::Regex;

use super::document::{slug, DocumentBlock};

/// One region of the text: prose, or the body of a fenced code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Region {
    Prose(String),
    Code {
        language: Option<String>,
        text: String,
    },
}

fn heading_pattern() -> &'static Regex {
    static HEADING: OnceLock<Regex> = OnceLock::new();
    HEADING.get_or_init(|| {
        Regex::new(r#"^(#{1,6})\s+(.*?)(?:\s*<a id="([^"]*)"></a>)?\s*$"#).unwrap()
    })
}

fn separator_pattern() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"^\|(\s*:?-{3,}:?\s*\|)+$").unwrap())
}

/// Split on code fences. An unterminated fence runs to the end of the text.
pub fn split_regions(text: &str) -> Vec<Region> {
    let mut regions = Vec::new();
    let mut prose: Vec<&str> = Vec::new();
    let mut lines = text.split('\n');

    while let Some(line) = lines.next() {
        let Some((fence_len, info)) = opening_fence(line) else {
            prose.push(line);
            continue;
        };

        if !prose.is_empty() {
            regions.push(Region::Prose(prose.join("\n")));
            prose.clear();
        }

        let mut body: Vec<&str> = Vec::new();
        for inner in lines.by_ref() {
            if is_closing_fence(inner, fence_len) {
                break;
            }
            body.push(inner);
        }
        regions.push(Region::Code {
            language: (!info.is_empty()).then(|| info.to_string()),
            text: body.join("\n"),
        });
    }

    if !prose.is_empty() {
        regions.push(Region::Prose(prose.join("\n")));
    }
    regions
}

fn opening_fence(line: &str) -> Option<(usize, &str)> {
    let len = line.chars().take_while(|&c| c == '`').count();
    if len < 3 {
        return None;
    }
    let info = line[len..].trim();
    // A backtick in the info string means inline code, not a fence.
    if info.contains('`') {
        return None;
    }
    Some((len, info))
}

fn is_closing_fence(line: &str, open_len: usize) -> bool {
    let trimmed = line.trim_end();
    trimmed.len() >= open_len && trimmed.chars().all(|c| c == '`')
}

/// Split a prose region on blank lines.
pub fn paragraphs(prose: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in prose.split('\n') {
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        out.push(current.join("\n"));
    }
    out
}

pub fn parse_blocks(text: &str) -> Vec<DocumentBlock> {
    let mut blocks = Vec::new();
    for region in split_regions(text) {
        match region {
            Region::Code { language, text } => blocks.push(DocumentBlock::CodeBlock { language, text }),
            Region::Prose(prose) => {
                blocks.extend(paragraphs(&prose).iter().map(|p| classify(p)));
            }
        }
    }
    blocks
}

fn classify(paragraph: &str) -> DocumentBlock {
    if !paragraph.contains('\n') {
        if let Some(caps) = heading_pattern().captures(paragraph) {
            let level = caps[1].len() as u8;
            let text = caps[2].to_string();
            let anchor = caps
                .get(3)
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| slug(&text));
            return DocumentBlock::Heading {
                level,
                text,
                anchor,
            };
        }
    }

    let lines: Vec<&str> = paragraph.lines().map(str::trim).collect();
    if lines.len() >= 2
        && lines.iter().all(|l| l.starts_with('|') && l.ends_with('|'))
        && separator_pattern().is_match(lines[1])
    {
        let headers = split_row(lines[0]);
        let rows = lines[2..].iter().map(|l| split_row(l)).collect();
        return DocumentBlock::Table { headers, rows };
    }

    DocumentBlock::Paragraph {
        text: paragraph.to_string(),
    }
}

/// Split a `| a | b |` row on unescaped pipes and unescape `\|`.
fn split_row(line: &str) -> Vec<String> {
    let inner = line.strip_prefix('|').unwrap_or(line);
    let inner = inner.strip_suffix('|').unwrap_or(inner);

    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                cell.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut cell).trim().to_string()),
            _ => cell.push(c),
        }
    }
    cells.push(cell.trim().to_string());
    cells
}
