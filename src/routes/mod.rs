//! API route handlers - maps HTTP endpoints to the dossier pipeline.
//!
//! Each submodule defines routes for a feature area:
//! - `repository`: Repository metadata (GET /api/v1/repository)
//! - `tree`: Path listing, rendered folder structure and file content
//! - `commits`: Reviewed commit history with summary counters
//! - `dossier`: Compose the dossier text for a selection
//! - `export`: Render document text as Markdown, PDF or DOCX

pub mod commits;
pub mod dossier;
pub mod export;
pub mod repository;
pub mod tree;

use std::sync::Arc;

use axum::Router;

use crate::config::ExportConfig;
use crate::render::Renderers;

pub struct AppState {
    pub config: ExportConfig,
    pub renderers: Renderers,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: ExportConfig, renderers: Renderers) -> SharedState {
        Arc::new(Self { config, renderers })
    }
}

pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .merge(repository::routes(state.clone()))
        .merge(tree::routes(state.clone()))
        .merge(commits::routes(state.clone()))
        .merge(dossier::routes(state.clone()))
        .merge(export::routes(state))
}
