//! Styled HTML page for the paginated renderer.

use crate::dossier::{parse_blocks, DocumentBlock};

use super::prose::{parse_inline, prose_shape, Inline, ProseShape};

const PAGE_STYLE: &str = r#"
  @page { size: A4; margin: 20mm; }
  *,*::before,*::after { box-sizing: border-box; }
  html { -webkit-print-color-adjust: exact; print-color-adjust: exact; }
  body { font-family: ui-sans-serif, system-ui, -apple-system, "Segoe UI", Roboto, Arial, sans-serif; color: #111; font-size: 13px; line-height: 1.45; }
  h1, h2, h3, h4 { color: #0f172a; margin: 18px 0 10px; break-after: avoid; }
  h2 { border-bottom: 1px solid #e5e7eb; padding-bottom: 4px; }
  pre { background: #0b1220; color: #e5e7eb; padding: 12px; border-radius: 8px; white-space: pre-wrap; word-break: break-word; font-size: 11px; }
  code { font-family: ui-monospace, SFMono-Regular, Menlo, Consolas, "Liberation Mono", monospace; }
  p code { background: #f1f5f9; padding: 0 3px; border-radius: 3px; }
  a { color: #0369a1; text-decoration: none; }
  blockquote { border-left: 4px solid #e5e7eb; margin: 0; padding-left: 10px; color: #374151; }
  table { border-collapse: collapse; width: 100%; margin: 8px 0; }
  th, td { border: 1px solid #e5e7eb; padding: 6px 8px; font-size: 12px; vertical-align: top; }
  th { background: #f8fafc; text-align: left; }
  tr { break-inside: avoid; }
"#;

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wrap the document text in the print page template.
pub fn render_page(text: &str, title: &str) -> String {
    let body = blocks_to_html(&parse_blocks(text));
    format!(
        "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\"/>\n<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape_html(title),
        PAGE_STYLE,
        body
    )
}

pub fn blocks_to_html(blocks: &[DocumentBlock]) -> String {
    let mut out = String::new();
    for block in blocks {
        match block {
            DocumentBlock::Heading {
                level,
                text,
                anchor,
            } => {
                let level = (*level).clamp(1, 6);
                out.push_str(&format!(
                    "<h{level} id=\"{}\">{}</h{level}>\n",
                    escape_html(anchor),
                    escape_html(text)
                ));
            }
            DocumentBlock::Paragraph { text } => match prose_shape(text) {
                ProseShape::List(items) => {
                    out.push_str("<ul>\n");
                    for item in items {
                        out.push_str(&format!("<li>{}</li>\n", inline_html(item)));
                    }
                    out.push_str("</ul>\n");
                }
                ProseShape::Quote(lines) => {
                    out.push_str("<blockquote>\n");
                    for line in lines {
                        out.push_str(&format!("<p>{}</p>\n", inline_html(line)));
                    }
                    out.push_str("</blockquote>\n");
                }
                ProseShape::Lines(lines) => {
                    let joined: Vec<String> = lines.iter().map(|l| inline_html(l)).collect();
                    out.push_str(&format!("<p>{}</p>\n", joined.join("<br/>\n")));
                }
            },
            DocumentBlock::CodeBlock { language, text } => {
                let class = language
                    .as_deref()
                    .map(|l| format!(" class=\"language-{}\"", escape_html(l)))
                    .unwrap_or_default();
                out.push_str(&format!("<pre><code{class}>{}</code></pre>\n", escape_html(text)));
            }
            DocumentBlock::Table { headers, rows } => {
                out.push_str("<table>\n<thead><tr>");
                for h in headers {
                    out.push_str(&format!("<th>{}</th>", inline_html(h)));
                }
                out.push_str("</tr></thead>\n<tbody>\n");
                for row in rows {
                    out.push_str("<tr>");
                    for cell in row {
                        out.push_str(&format!("<td>{}</td>", inline_html(cell)));
                    }
                    out.push_str("</tr>\n");
                }
                out.push_str("</tbody>\n</table>\n");
            }
        }
    }
    out
}

fn inline_html(text: &str) -> String {
    parse_inline(text)
        .into_iter()
        .map(|span| match span {
            Inline::Text(t) => escape_html(&t),
            Inline::Strong(t) => format!("<strong>{}</strong>", escape_html(&t)),
            Inline::Emphasis(t) => format!("<em>{}</em>", escape_html(&t)),
            Inline::Code(t) => format!("<code>{}</code>", escape_html(&t)),
            Inline::Link { text, target } => {
                format!("<a href=\"{}\">{}</a>", escape_html(&target), escape_html(&text))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_every_block_kind() {
        let html = blocks_to_html(&[
            DocumentBlock::heading(2, "1. Overview", "overview"),
            DocumentBlock::paragraph("- [1. a.rs](#a-rs)"),
            DocumentBlock::paragraph("> **Description:** <b>"),
            DocumentBlock::code(Some("rust"), "if a < b {}"),
            DocumentBlock::table(&["SHA"], vec![vec!["[abc1234](https://x/commit/abc)".to_string()]]),
        ]);
        assert!(html.contains("<h2 id=\"overview\">1. Overview</h2>"));
        assert!(html.contains("<li><a href=\"#a-rs\">1. a.rs</a></li>"));
        assert!(html.contains("<blockquote>\n<p><strong>Description:</strong> &lt;b&gt;</p>"));
        assert!(html.contains("<pre><code class=\"language-rust\">if a &lt; b {}</code></pre>"));
        assert!(html.contains("<td><a href=\"https://x/commit/abc\">abc1234</a></td>"));
    }

    #[test]
    fn page_template_sets_print_layout() {
        let page = render_page("# T\n\nbody\n", "a \"title\"");
        assert!(page.starts_with("<!doctype html>"));
        assert!(page.contains("@page { size: A4; margin: 20mm; }"));
        assert!(page.contains("print-color-adjust: exact"));
        assert!(page.contains("<title>a &quot;title&quot;</title>"));
        assert!(page.contains("<h1 id=\"t\">T</h1>"));
    }
}
