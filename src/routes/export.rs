//! Document export.
//!
//! - POST /api/v1/export/{md|pdf|docx} { text, title? }
//!   Renders already composed text; the response body is the complete file
//!   with a download filename derived from the title.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use crate::error::Result;
use crate::render::{ExportFormat, RenderedExport, DEFAULT_TITLE};
use crate::routes::SharedState;

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/api/v1/export/{format}", post(export_document))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ExportRequest {
    #[serde(default)]
    text: String,
    title: Option<String>,
}

async fn export_document(
    State(state): State<SharedState>,
    Path(format): Path<ExportFormat>,
    Json(request): Json<ExportRequest>,
) -> Result<Response> {
    let title = request
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TITLE);
    let rendered = state.renderers.render(format, &request.text, title).await?;
    Ok(attachment(rendered))
}

fn attachment(rendered: RenderedExport) -> Response {
    (
        [
            (header::CONTENT_TYPE, rendered.mime_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", rendered.filename),
            ),
        ],
        rendered.bytes,
    )
        .into_response()
}
