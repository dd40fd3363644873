//! Inline markup and paragraph shapes shared by the HTML and DOCX renderers.
//!
//! Only the markup the composer emits is recognised: `**strong**`,
//! `_emphasis_`, `` `code` ``, `[text](target)` and backslash escapes.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Strong(String),
    Emphasis(String),
    Code(String),
    Link { text: String, target: String },
}

/// How a paragraph block should be laid out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProseShape<'a> {
    /// Every line starts with `- `.
    List(Vec<&'a str>),
    /// Every line starts with `>`; empty quote lines are dropped.
    Quote(Vec<&'a str>),
    Lines(Vec<&'a str>),
}

pub fn prose_shape(text: &str) -> ProseShape<'_> {
    let lines: Vec<&str> = text.lines().collect();
    if !lines.is_empty() && lines.iter().all(|l| l.starts_with("- ")) {
        return ProseShape::List(lines.iter().map(|l| &l[2..]).collect());
    }
    if !lines.is_empty() && lines.iter().all(|l| l.starts_with('>')) {
        return ProseShape::Quote(
            lines
                .iter()
                .map(|l| l[1..].trim())
                .filter(|l| !l.is_empty())
                .collect(),
        );
    }
    ProseShape::Lines(lines)
}

pub fn parse_inline(text: &str) -> Vec<Inline> {
    let mut out = Vec::new();
    let mut plain = String::new();
    let mut i = 0;

    while i < text.len() {
        if let Some((span, consumed)) = match_span(text, i) {
            if !plain.is_empty() {
                out.push(Inline::Text(std::mem::take(&mut plain)));
            }
            out.push(span);
            i += consumed;
            continue;
        }

        let rest = &text[i..];
        let Some(c) = rest.chars().next() else { break };
        if c == '\\' {
            if let Some(escaped) = rest[1..].chars().next().filter(char::is_ascii_punctuation) {
                plain.push(escaped);
                i += 1 + escaped.len_utf8();
                continue;
            }
        }
        plain.push(c);
        i += c.len_utf8();
    }

    if !plain.is_empty() {
        out.push(Inline::Text(plain));
    }
    out
}

fn match_span(text: &str, i: usize) -> Option<(Inline, usize)> {
    let rest = &text[i..];

    if let Some(after) = rest.strip_prefix("**") {
        let end = after.find("**")?;
        if end > 0 {
            return Some((Inline::Strong(after[..end].to_string()), end + 4));
        }
        return None;
    }

    if let Some(after) = rest.strip_prefix('`') {
        let end = after.find('`')?;
        if end > 0 {
            return Some((Inline::Code(after[..end].to_string()), end + 2));
        }
        return None;
    }

    if let Some(after) = rest.strip_prefix('[') {
        let close = after.find("](")?;
        let label = &after[..close];
        let tail = &after[close + 2..];
        let paren = tail.find(')')?;
        let target = &tail[..paren];
        if label.contains('[') || target.is_empty() || target.contains(char::is_whitespace) {
            return None;
        }
        return Some((
            Inline::Link {
                text: label.to_string(),
                target: target.to_string(),
            },
            close + paren + 4,
        ));
    }

    if let Some(after) = rest.strip_prefix('_') {
        if !boundary_before(text, i) || after.starts_with(|c: char| c.is_whitespace() || c == '_') {
            return None;
        }
        for (j, _) in after.match_indices('_') {
            let next = after[j + 1..].chars().next();
            if j > 0 && next.is_none_or(|c| c.is_whitespace() || ".,;:!?)".contains(c)) {
                return Some((Inline::Emphasis(after[..j].to_string()), j + 2));
            }
        }
    }

    None
}

fn boundary_before(text: &str, i: usize) -> bool {
    text[..i]
        .chars()
        .next_back()
        .is_none_or(|c| c.is_whitespace() || "([\"'".contains(c))
}
