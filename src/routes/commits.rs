use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::error::Result;
use crate::models::{CommitHistoryResponse, CommitQuery};
use crate::pipeline;
use crate::routes::SharedState;

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/api/v1/repository/commits", get(get_commits))
        .with_state(state)
}

async fn get_commits(
    State(state): State<SharedState>,
    Query(query): Query<CommitQuery>,
) -> Result<Json<CommitHistoryResponse>> {
    let response = pipeline::commit_history(&state.config, query).await?;
    Ok(Json(response))
}
