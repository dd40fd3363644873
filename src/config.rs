//! Runtime configuration resolved from CLI flags and environment variables.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::git::history::DEFAULT_COMMIT_LIMIT;
use crate::render::{ChromiumEngine, LayoutEngine, Renderers, UnavailableEngine};

pub const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_FETCH_RETRIES: u32 = 2;

/// Flags shared by the server and the one-shot export command.
#[derive(Debug, Clone, clap::Args)]
pub struct ServiceArgs {
    /// Chromium/Chrome executable used for PDF export (searched on PATH when unset)
    #[arg(long, env = "DOSSIER_CHROMIUM", value_name = "PATH")]
    pub chromium: Option<PathBuf>,

    /// Wall-clock ceiling for one PDF layout and capture
    #[arg(long, env = "DOSSIER_RENDER_TIMEOUT_SECS", default_value_t = DEFAULT_RENDER_TIMEOUT_SECS)]
    pub render_timeout_secs: u64,

    /// Commits included when a request does not set a limit
    #[arg(long, env = "DOSSIER_COMMIT_LIMIT", default_value_t = DEFAULT_COMMIT_LIMIT)]
    pub commit_limit: usize,

    /// Extra attempts for each file read and commit enrichment
    #[arg(long, env = "DOSSIER_FETCH_RETRIES", default_value_t = DEFAULT_FETCH_RETRIES)]
    pub fetch_retries: u32,
}

impl Default for ServiceArgs {
    fn default() -> Self {
        Self {
            chromium: None,
            render_timeout_secs: DEFAULT_RENDER_TIMEOUT_SECS,
            commit_limit: DEFAULT_COMMIT_LIMIT,
            fetch_retries: DEFAULT_FETCH_RETRIES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub repo_path: PathBuf,
    pub chromium: Option<PathBuf>,
    pub render_timeout: Duration,
    pub commit_limit: usize,
    pub fetch_retries: u32,
}

impl ExportConfig {
    pub fn new(repo_path: impl Into<PathBuf>, args: &ServiceArgs) -> Self {
        Self {
            repo_path: repo_path.into(),
            chromium: args.chromium.clone(),
            render_timeout: Duration::from_secs(args.render_timeout_secs.max(1)),
            commit_limit: args.commit_limit,
            fetch_retries: args.fetch_retries,
        }
    }

    /// The paginated renderer's engine. Without a browser, PDF exports fail
    /// at request time while the other formats keep working.
    pub fn layout_engine(&self) -> Arc<dyn LayoutEngine> {
        match ChromiumEngine::discover(self.chromium.as_deref()) {
            Ok(engine) => {
                tracing::info!("PDF export via {}", engine.executable().display());
                Arc::new(engine)
            }
            Err(e) => {
                tracing::warn!("PDF export unavailable: {}", e);
                Arc::new(UnavailableEngine::new(e.to_string()))
            }
        }
    }

    pub fn renderers(&self) -> Renderers {
        Renderers::new(self.layout_engine(), self.render_timeout)
    }
}
