//! Repository dossier generation.
//!
//! Gathers a repository's structure, selected source files, reviewed commit
//! history and manifests from a local git repository, composes them into one
//! navigable document and renders it as Markdown, PDF or DOCX.

pub mod config;
pub mod dossier;
pub mod error;
pub mod git;
pub mod models;
pub mod pipeline;
pub mod render;
pub mod routes;

pub use config::{ExportConfig, ServiceArgs};
pub use error::{AppError, Result};
