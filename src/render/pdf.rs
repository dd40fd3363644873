//! Paginated rendering through a headless layout engine.
//!
//! The engine is an external, stateful resource. Every export launches its
//! own `EngineSession`, uses it for exactly one capture and closes it on every
//! exit path, including failures and the deadline firing. Launch and capture
//! share one deadline; hitting it fails the export with `RenderTimeout`.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::process::Command;
use tokio::time::{timeout_at, Instant};

use super::{export_filename, html, require_text, ExportFormat, RenderedExport};
use crate::error::{AppError, Result};

pub const PDF_MIME: &str = "application/pdf";

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Binaries probed on `PATH` when no explicit engine path is configured.
const CHROMIUM_CANDIDATES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
    "headless_shell",
];

/// Produces one scoped session per export.
#[async_trait]
pub trait LayoutEngine: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn EngineSession>>;
}

#[async_trait]
pub trait EngineSession: Send {
    /// Lay out the page completely, then capture it as PDF bytes.
    async fn capture_pdf(&mut self, html: &str) -> Result<Vec<u8>>;

    /// Tear the session down and release everything it holds.
    async fn close(self: Box<Self>) -> Result<()>;
}

pub async fn render_paginated(
    engine: &dyn LayoutEngine,
    text: &str,
    title: &str,
    limit: Duration,
) -> Result<RenderedExport> {
    require_text(text)?;
    let page = html::render_page(text, title);
    let deadline = Instant::now() + limit;

    let mut session = match timeout_at(deadline, engine.launch()).await {
        Ok(launched) => launched?,
        Err(_) => return Err(AppError::RenderTimeout(limit.as_secs())),
    };
    tracing::debug!("Layout engine session launched");

    let captured = timeout_at(deadline, session.capture_pdf(&page)).await;

    if let Err(e) = session.close().await {
        tracing::warn!("Layout engine teardown failed: {}", e);
    }
    tracing::debug!("Layout engine session closed");

    let bytes = match captured {
        Ok(result) => result?,
        Err(_) => return Err(AppError::RenderTimeout(limit.as_secs())),
    };
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(AppError::engine("engine output is not a PDF document"));
    }

    Ok(RenderedExport {
        bytes,
        mime_type: PDF_MIME,
        filename: export_filename(title, ExportFormat::Pdf),
    })
}

/// Stands in when no browser is installed; every launch fails.
#[derive(Debug, Clone)]
pub struct UnavailableEngine {
    reason: String,
}

impl UnavailableEngine {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl LayoutEngine for UnavailableEngine {
    async fn launch(&self) -> Result<Box<dyn EngineSession>> {
        Err(AppError::engine(self.reason.clone()))
    }
}

/// Headless Chromium driven through its `--print-to-pdf` mode.
#[derive(Debug, Clone)]
pub struct ChromiumEngine {
    executable: PathBuf,
    /// Virtual time granted to the page so layout settles before capture.
    settle_budget: Duration,
}

impl ChromiumEngine {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            settle_budget: Duration::from_secs(5),
        }
    }

    /// Use `explicit` when given, otherwise the first known browser on `PATH`.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self::new(path));
        }
        find_on_path(CHROMIUM_CANDIDATES)
            .map(Self::new)
            .ok_or_else(|| AppError::engine("no Chromium executable found on PATH"))
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

fn find_on_path(names: &[&str]) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}

#[async_trait]
impl LayoutEngine for ChromiumEngine {
    async fn launch(&self) -> Result<Box<dyn EngineSession>> {
        let workdir = tempfile::Builder::new()
            .prefix("repo-dossier-")
            .tempdir()
            .map_err(|e| AppError::engine(format!("failed to create engine workspace: {e}")))?;
        tracing::debug!(
            "Launching {} in {}",
            self.executable.display(),
            workdir.path().display()
        );

        Ok(Box::new(ChromiumSession {
            executable: self.executable.clone(),
            settle_budget: self.settle_budget,
            workdir,
        }))
    }
}

/// Owns a private profile and scratch directory; the browser process is
/// killed if the capture future is dropped.
struct ChromiumSession {
    executable: PathBuf,
    settle_budget: Duration,
    workdir: TempDir,
}

/// `file://` URL for an absolute path. Bytes outside the unreserved set are
/// escaped as `%HH` (uppercase).
fn file_url(path: &Path) -> String {
    let mut url = String::from("file://");
    let bytes = path.as_os_str().as_encoded_bytes();
    if bytes.first() != Some(&b'/') {
        url.push('/');
    }
    for &b in bytes {
        match b {
            b'\\' if cfg!(windows) => url.push('/'),
            b if b.is_ascii_alphanumeric() || b"/-._~:".contains(&b) => url.push(b as char),
            b => url.push_str(&format!("%{b:02X}")),
        }
    }
    url
}

#[async_trait]
impl EngineSession for ChromiumSession {
    async fn capture_pdf(&mut self, html: &str) -> Result<Vec<u8>> {
        let page = self.workdir.path().join("page.html");
        let output = self.workdir.path().join("page.pdf");
        let profile = self.workdir.path().join("profile");

        tokio::fs::write(&page, html)
            .await
            .map_err(|e| AppError::engine(format!("failed to stage page: {e}")))?;

        let run = Command::new(&self.executable)
            .arg("--headless")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--no-first-run")
            .arg("--disable-extensions")
            .arg("--hide-scrollbars")
            .arg(format!("--user-data-dir={}", profile.display()))
            .arg("--run-all-compositor-stages-before-draw")
            .arg(format!("--virtual-time-budget={}", self.settle_budget.as_millis()))
            .arg("--no-pdf-header-footer")
            .arg(format!("--print-to-pdf={}", output.display()))
            .arg(file_url(&page))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                AppError::engine(format!("failed to launch {}: {e}", self.executable.display()))
            })?;

        if !run.status.success() {
            let stderr = String::from_utf8_lossy(&run.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            return Err(AppError::engine(format!(
                "{} exited with {}: {}",
                self.executable.display(),
                run.status,
                tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
            )));
        }

        tokio::fs::read(&output)
            .await
            .map_err(|e| AppError::engine(format!("engine produced no output: {e}")))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.workdir
            .close()
            .map_err(|e| AppError::engine(format!("failed to remove engine workspace: {e}")))
    }
}
