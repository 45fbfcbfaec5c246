//! Direct create-post endpoint

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use std::sync::Arc;

use super::auth::ServiceAuth;
use crate::AppState;
use crate::error::PublishErrorKind;
use crate::services::error::LogErr;
use crate::services::threads::{PublishRequest, PublishedPost};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/posts", post(create_post))
}

/// POST /posts - Validate and publish a single post
async fn create_post(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Json(req): Json<PublishRequest>,
) -> Result<Json<PublishedPost>, StatusCode> {
    req.validate()
        .log_status("Invalid create post request", StatusCode::BAD_REQUEST)?;

    let post = state.publisher.publish(&req).await.map_err(|e| {
        let status = publish_status(e.kind);
        tracing::warn!(account_id = %req.account_id, error = %e, status = status.as_u16(), "create post failed");
        status
    })?;

    Ok(Json(post))
}

/// HTTP status for a failed publish
pub(crate) fn publish_status(kind: PublishErrorKind) -> StatusCode {
    match kind {
        PublishErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
        PublishErrorKind::MissingAccount => StatusCode::NOT_FOUND,
        PublishErrorKind::Store => StatusCode::INTERNAL_SERVER_ERROR,
        PublishErrorKind::Http | PublishErrorKind::Api { .. } | PublishErrorKind::Decode => {
            StatusCode::BAD_GATEWAY
        }
    }
}
