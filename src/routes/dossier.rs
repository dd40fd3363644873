use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::Utc;

use crate::error::Result;
use crate::pipeline::{self, DossierRequest};
use crate::render::MARKDOWN_MIME;
use crate::routes::SharedState;

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/api/v1/dossier", post(create_dossier))
        .with_state(state)
}

async fn create_dossier(
    State(state): State<SharedState>,
    Json(request): Json<DossierRequest>,
) -> Result<impl IntoResponse> {
    let text = pipeline::build_dossier(&state.config, &request, Utc::now()).await?;
    Ok(([(header::CONTENT_TYPE, MARKDOWN_MIME)], text))
}
