//! Request pipeline: gather every collaborator result, then compose.
//!
//! Retrieval runs concurrently on blocking threads, each with its own
//! repository handle. Composition starts only after all of them resolved;
//! the first failure aborts the whole request and nothing partial is
//! composed.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::config::ExportConfig;
use crate::dossier::{analyze_commits, compose_text, DossierInput};
use crate::error::{AppError, Result};
use crate::git::GitRepository;
use crate::models::{CommitHistoryResponse, CommitQuery, FilesResponse, PathEntry, RepoMetadata};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DossierRequest {
    /// Selected files, in the order they should appear.
    #[serde(default)]
    pub paths: Vec<String>,
    /// Commit history to review; omitted means no history section rows.
    #[serde(default)]
    pub commits: Option<CommitQuery>,
    #[serde(default = "default_true")]
    pub include_tree: bool,
    #[serde(default)]
    pub notes: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// Run `op` against a fresh repository handle on the blocking pool.
async fn blocking<T, F>(repo_path: &Path, what: &'static str, op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&GitRepository) -> Result<T> + Send + 'static,
{
    let path: PathBuf = repo_path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let repo = GitRepository::open(&path)?;
        op(&repo)
    })
    .await
    .map_err(|e| AppError::upstream(format!("{what} task failed: {e}")))?
}

/// Trim, drop blanks and repeats, keep first-seen order.
pub fn normalize_selection(paths: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    paths
        .iter()
        .map(|p| p.trim().trim_start_matches('/').to_string())
        .filter(|p| !p.is_empty() && seen.insert(p.clone()))
        .collect()
}

pub async fn metadata(config: &ExportConfig) -> Result<RepoMetadata> {
    blocking(&config.repo_path, "repository metadata", |repo| repo.metadata()).await
}

pub async fn list_paths(config: &ExportConfig, branch: Option<String>) -> Result<Vec<PathEntry>> {
    blocking(&config.repo_path, "path listing", move |repo| repo.list_paths(branch.as_deref())).await
}

/// All file paths at HEAD, for exports that select everything.
pub async fn all_files(config: &ExportConfig) -> Result<Vec<String>> {
    let listing = list_paths(config, None).await?;
    Ok(listing
        .into_iter()
        .filter(PathEntry::is_file)
        .map(|e| e.path)
        .collect())
}

pub async fn read_files(config: &ExportConfig, paths: &[String]) -> Result<FilesResponse> {
    let paths = normalize_selection(paths);
    if paths.is_empty() {
        return Err(AppError::input("at least one path is required"));
    }
    let retries = config.fetch_retries;
    blocking(&config.repo_path, "file content", move |repo| repo.read_files(&paths, retries)).await
}

pub async fn commit_history(config: &ExportConfig, query: CommitQuery) -> Result<CommitHistoryResponse> {
    let (limit, retries) = (config.commit_limit, config.fetch_retries);
    let records = blocking(&config.repo_path, "commit history", move |repo| {
        repo.commits(&query, limit, retries)
    })
    .await?;
    let (commits, summary) = analyze_commits(records);
    Ok(CommitHistoryResponse { commits, summary })
}

/// Gather every input the composer needs.
pub async fn gather(config: &ExportConfig, request: &DossierRequest) -> Result<DossierInput> {
    let start = std::time::Instant::now();
    let repo_path = config.repo_path.as_path();
    let paths = normalize_selection(&request.paths);
    let retries = config.fetch_retries;
    let limit = config.commit_limit;
    tracing::info!(
        "Gathering dossier inputs for {} selected paths (history: {})",
        paths.len(),
        request.commits.is_some()
    );

    let listing = blocking(repo_path, "path listing", |repo| {
        let listing = repo.list_paths(None)?;
        let metadata = repo.metadata_for(&listing)?;
        Ok((listing, metadata))
    });
    let files = blocking(repo_path, "file content", move |repo| repo.read_files(&paths, retries));
    let query = request.commits.clone();
    let history = async move {
        match query {
            Some(query) => blocking(repo_path, "commit history", move |repo| {
                repo.commits(&query, limit, retries)
            })
            .await
            .map(Some),
            None => Ok(None),
        }
    };
    let manifest = blocking(repo_path, "manifest", |repo| repo.manifest());
    let env_template = blocking(repo_path, "environment template", |repo| repo.env_template());

    let ((listing, metadata), files, history, manifest, env_template) =
        tokio::try_join!(listing, files, history, manifest, env_template)?;
    tracing::info!("Gathered dossier inputs in {:?}", start.elapsed());

    Ok(DossierInput {
        metadata,
        files: files.files,
        commits: history.map(|records| analyze_commits(records).0),
        tree_text: None,
        all_paths: request.include_tree.then_some(listing),
        manifest,
        env_template,
        readme: files.readme,
        notes: request.notes.clone(),
    })
}

/// Gather and compose the dossier text.
pub async fn build_dossier(
    config: &ExportConfig,
    request: &DossierRequest,
    generated_at: DateTime<Utc>,
) -> Result<String> {
    let input = gather(config, request).await?;
    Ok(compose_text(&input, generated_at))
}
