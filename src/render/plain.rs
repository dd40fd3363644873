use super::{export_filename, require_text, ExportFormat, RenderedExport};
use crate::error::Result;

pub const MARKDOWN_MIME: &str = "text/markdown; charset=utf-8";

/// Identity transform of the document text.
pub fn render_plain(text: &str, title: &str) -> Result<RenderedExport> {
    require_text(text)?;
    Ok(RenderedExport {
        bytes: text.as_bytes().to_vec(),
        mime_type: MARKDOWN_MIME,
        filename: export_filename(title, ExportFormat::Md),
    })
}
