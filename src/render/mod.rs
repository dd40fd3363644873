//! Format renderers.
//!
//! Each renderer takes the composed document text and a title and returns
//! the complete output buffer with its MIME type and a download filename.
//! Output is all-or-nothing: a failing renderer never hands back partial
//! bytes.
//!
//! - `plain`: identity transform (Markdown download)
//! - `pdf`: paginated output through a headless layout engine
//! - `docx`: word-processing package built from the block stream

pub mod docx;
pub mod html;
pub mod pdf;
pub mod plain;
pub mod prose;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

pub use docx::{render_word_processing, DOCX_MIME};
pub use pdf::{render_paginated, ChromiumEngine, EngineSession, LayoutEngine, UnavailableEngine, PDF_MIME};
pub use plain::{render_plain, MARKDOWN_MIME};

/// Used when a title sanitizes to nothing.
pub const DEFAULT_TITLE: &str = "dossier";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedExport {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub filename: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Md,
    Pdf,
    Docx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Md => "md",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Docx => "docx",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Keep only `[A-Za-z0-9_.-]` from the title.
pub fn sanitize_filename(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .collect();
    if cleaned.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        cleaned
    }
}

pub fn export_filename(title: &str, format: ExportFormat) -> String {
    format!("{}.{}", sanitize_filename(title), format.extension())
}

/// Rejects empty document text before any renderer does work.
pub(crate) fn require_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(AppError::input("document text is required"));
    }
    Ok(())
}

/// Dispatches an export to the renderer for its format.
#[derive(Clone)]
pub struct Renderers {
    engine: Arc<dyn LayoutEngine>,
    timeout: Duration,
}

impl Renderers {
    pub fn new(engine: Arc<dyn LayoutEngine>, timeout: Duration) -> Self {
        Self { engine, timeout }
    }

    pub async fn render(&self, format: ExportFormat, text: &str, title: &str) -> Result<RenderedExport> {
        tracing::info!("Rendering {} export \"{}\" ({} bytes of text)", format, title, text.len());
        let start = std::time::Instant::now();
        let rendered = match format {
            ExportFormat::Md => render_plain(text, title),
            ExportFormat::Pdf => render_paginated(self.engine.as_ref(), text, title, self.timeout).await,
            ExportFormat::Docx => render_word_processing(text, title),
        }?;
        tracing::info!(
            "Rendered {} ({} bytes) in {:?}",
            rendered.filename,
            rendered.bytes.len(),
            start.elapsed()
        );
        Ok(rendered)
    }
}
