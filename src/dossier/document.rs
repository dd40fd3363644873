//! Canonical dossier document.
//!
//! A `Document` is a title, some front matter and an ordered list of
//! `Section`s. The table of contents is never stored: it is derived from the
//! section list every time the document is flattened, so it cannot drift
//! from the body. Anchors are slugs claimed through one `AnchorRegistry`, which
//! keeps them unique in document order.

use std::collections::HashSet;

use serde::Serialize;

/// Title of the derived table-of-contents heading.
pub const CONTENTS_TITLE: &str = "Contents";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentBlock {
    Heading {
        level: u8,
        text: String,
        anchor: String,
    },
    Paragraph {
        text: String,
    },
    CodeBlock {
        language: Option<String>,
        text: String,
    },
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
}

impl DocumentBlock {
    pub fn heading(level: u8, text: impl Into<String>, anchor: impl Into<String>) -> Self {
        DocumentBlock::Heading {
            level,
            text: text.into(),
            anchor: anchor.into(),
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        DocumentBlock::Paragraph { text: text.into() }
    }

    pub fn code(language: Option<&str>, text: impl Into<String>) -> Self {
        DocumentBlock::CodeBlock {
            language: language.map(str::to_string),
            text: text.into(),
        }
    }

    pub fn table(headers: &[&str], rows: Vec<Vec<String>>) -> Self {
        DocumentBlock::Table {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: String,
    pub anchor: String,
    pub blocks: Vec<DocumentBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub number: usize,
    pub title: String,
    pub anchor: String,
}

impl TocEntry {
    pub fn label(&self) -> String {
        format!("{}. {}", self.number, self.title)
    }
}

/// Lowercase, keep ASCII alphanumerics, collapse every other run into one
/// hyphen and trim hyphens at both ends.
pub fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_hyphen = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    out
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnchorRegistry {
    taken: HashSet<String>,
}

impl AnchorRegistry {
    /// Claim the slug of `text`, suffixing `-2`, `-3`, ... on collision.
    pub fn claim(&mut self, text: &str) -> String {
        let mut base = slug(text);
        if base.is_empty() {
            base = "section".to_string();
        }
        if self.taken.insert(base.clone()) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}-{n}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub title: String,
    title_anchor: String,
    contents_anchor: String,
    front_matter: Vec<DocumentBlock>,
    sections: Vec<Section>,
    #[serde(skip)]
    anchors: AnchorRegistry,
}

impl Document {
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into();
        let mut anchors = AnchorRegistry::default();
        let title_anchor = anchors.claim(&title);
        let contents_anchor = anchors.claim(CONTENTS_TITLE);
        Self {
            title,
            title_anchor,
            contents_anchor,
            front_matter: Vec::new(),
            sections: Vec::new(),
            anchors,
        }
    }

    /// Blocks shown between the title and the table of contents.
    pub fn push_front_matter(&mut self, block: DocumentBlock) {
        self.front_matter.push(block);
    }

    /// Append a section. Its anchor is claimed before `build` runs so that
    /// anchors claimed inside the section come after it in document order.
    pub fn add_section<F>(&mut self, title: &str, build: F)
    where
        F: FnOnce(&mut AnchorRegistry) -> Vec<DocumentBlock>,
    {
        let anchor = self.anchors.claim(title);
        let blocks = build(&mut self.anchors);
        self.sections.push(Section {
            title: title.to_string(),
            anchor,
            blocks,
        });
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, anchor: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.anchor == anchor)
    }

    pub fn table_of_contents(&self) -> Vec<TocEntry> {
        self.sections
            .iter()
            .enumerate()
            .map(|(i, s)| TocEntry {
                number: i + 1,
                title: s.title.clone(),
                anchor: s.anchor.clone(),
            })
            .collect()
    }

    /// Every block of the document in reading order, TOC included.
    pub fn blocks(&self) -> Vec<DocumentBlock> {
        let toc = self.table_of_contents();
        let mut blocks = Vec::with_capacity(4 + self.front_matter.len() + self.sections.len() * 4);

        blocks.push(DocumentBlock::heading(1, &self.title, &self.title_anchor));
        blocks.extend(self.front_matter.iter().cloned());
        blocks.push(DocumentBlock::heading(2, CONTENTS_TITLE, &self.contents_anchor));
        blocks.push(DocumentBlock::paragraph(
            toc.iter()
                .map(|e| format!("- [{}](#{})", e.label(), e.anchor))
                .collect::<Vec<_>>()
                .join("\n"),
        ));

        for (section, entry) in self.sections.iter().zip(&toc) {
            blocks.push(DocumentBlock::heading(2, entry.label(), &section.anchor));
            blocks.extend(section.blocks.iter().cloned());
        }

        blocks
    }

    pub fn to_text(&self) -> String {
        blocks_to_text(&self.blocks())
    }
}

/// Serialize blocks to the canonical Markdown-flavoured text.
pub fn blocks_to_text(blocks: &[DocumentBlock]) -> String {
    let mut out = String::new();
    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n");
        }
        write_block(&mut out, block);
    }
    out.push('\n');
    out
}

fn write_block(out: &mut String, block: &DocumentBlock) {
    match block {
        DocumentBlock::Heading {
            level,
            text,
            anchor,
        } => {
            out.push_str(&"#".repeat((*level).clamp(1, 6) as usize));
            out.push(' ');
            out.push_str(text);
            if *anchor != slug(text) {
                out.push_str(&format!(" <a id=\"{anchor}\"></a>"));
            }
        }
        DocumentBlock::Paragraph { text } => out.push_str(text),
        DocumentBlock::CodeBlock { language, text } => {
            let fence = fence_for(text);
            out.push_str(&fence);
            if let Some(lang) = language {
                out.push_str(lang);
            }
            out.push('\n');
            out.push_str(text);
            out.push('\n');
            out.push_str(&fence);
        }
        DocumentBlock::Table { headers, rows } => {
            write_row(out, headers);
            out.push('\n');
            out.push('|');
            for _ in headers {
                out.push_str("---|");
            }
            for row in rows {
                out.push('\n');
                write_row(out, row);
            }
        }
    }
}

fn write_row(out: &mut String, cells: &[String]) {
    out.push('|');
    for cell in cells {
        out.push(' ');
        out.push_str(&escape_cell(cell));
        out.push_str(" |");
    }
}

pub(crate) fn escape_cell(cell: &str) -> String {
    cell.replace(['\r', '\n'], " ").trim().replace('|', "\\|")
}

/// A backtick fence longer than any backtick run inside `text`.
pub(crate) fn fence_for(text: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in text.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn slug_collapses_runs_and_trims() {
        assert_eq!(slug("src/main.rs"), "src-main-rs");
        assert_eq!(slug("Notes & Assessment"), "notes-assessment");
        assert_eq!(slug("  --Hello,   World!-- "), "hello-world");
        assert_eq!(slug("ÄÖ"), "");
    }

    #[test]
    fn registry_suffixes_collisions() {
        let mut anchors = AnchorRegistry::default();
        assert_eq!(anchors.claim("a/b.ts"), "a-b-ts");
        assert_eq!(anchors.claim("a-b.ts"), "a-b-ts-2");
        assert_eq!(anchors.claim("a b ts"), "a-b-ts-3");
        assert_eq!(anchors.claim("!!!"), "section");
        assert_eq!(anchors.claim("???"), "section-2");
    }

    #[test]
    fn toc_is_derived_from_sections() {
        let mut doc = Document::new("Project Dossier: acme/app");
        doc.add_section("Overview", |_| vec![DocumentBlock::paragraph("hi")]);
        doc.add_section("Contents", |_| Vec::new());

        let toc = doc.table_of_contents();
        assert_eq!(toc.len(), 2);
        assert_eq!(toc[0].anchor, "overview");
        // "contents" is already taken by the TOC heading itself.
        assert_eq!(toc[1].anchor, "contents-2");

        let text = doc.to_text();
        assert!(text.contains("- [1. Overview](#overview)\n- [2. Contents](#contents-2)"));
        assert!(text.contains("## 1. Overview <a id=\"overview\"></a>"));
    }

    #[test]
    fn fence_outgrows_content_backticks() {
        assert_eq!(fence_for("plain"), "```");
        assert_eq!(fence_for("```rust\n```"), "````");
        assert_eq!(fence_for("a ````` b"), "``````");
    }

    #[test]
    fn table_cells_are_escaped() {
        let text = blocks_to_text(&[DocumentBlock::table(
            &["Message", "Files"],
            vec![vec!["a | b\nsecond".to_string(), "3".to_string()]],
        )]);
        assert_eq!(text, "| Message | Files |\n|---|---|\n| a \\| b second | 3 |\n");
    }
}
