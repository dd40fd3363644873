use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::dossier::PathTree;
use crate::error::Result;
use crate::models::{FilesResponse, PathEntry};
use crate::pipeline;
use crate::routes::SharedState;

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/api/v1/repository/tree", get(get_tree))
        .route("/api/v1/repository/tree/text", get(get_tree_text))
        .route("/api/v1/repository/files", post(get_files))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct TreeQuery {
    branch: Option<String>,
}

async fn get_tree(
    State(state): State<SharedState>,
    Query(query): Query<TreeQuery>,
) -> Result<Json<Vec<PathEntry>>> {
    let entries = pipeline::list_paths(&state.config, query.branch).await?;
    Ok(Json(entries))
}

async fn get_tree_text(
    State(state): State<SharedState>,
    Query(query): Query<TreeQuery>,
) -> Result<String> {
    let entries = pipeline::list_paths(&state.config, query.branch).await?;
    Ok(PathTree::from_entries(&entries).render())
}

#[derive(Debug, Deserialize)]
struct FilesRequest {
    #[serde(default)]
    paths: Vec<String>,
}

async fn get_files(
    State(state): State<SharedState>,
    Json(request): Json<FilesRequest>,
) -> Result<Json<FilesResponse>> {
    let response = pipeline::read_files(&state.config, &request.paths).await?;
    Ok(Json(response))
}
