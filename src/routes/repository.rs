use axum::{extract::State, routing::get, Json, Router};

use crate::error::Result;
use crate::models::RepoMetadata;
use crate::pipeline;
use crate::routes::SharedState;

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/api/v1/repository", get(get_repository_info))
        .with_state(state)
}

async fn get_repository_info(State(state): State<SharedState>) -> Result<Json<RepoMetadata>> {
    let metadata = pipeline::metadata(&state.config).await?;
    Ok(Json(metadata))
}
