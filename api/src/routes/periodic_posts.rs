//! Periodic post endpoints: run a cycle, post now, automation health

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::auth::ServiceAuth;
use crate::AppState;
use super::posts::publish_status;
use crate::error::{CycleError, PostNowError};
use crate::scheduler::ExecutionReport;
use crate::services::error::LogErr;
use crate::services::health::{AutomationHealth, automation_health};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/periodic-posts/execute", post(execute))
        .route("/periodic-posts/{id}/post-now", post(post_now))
        .route("/periodic-posts/{id}/health", get(health))
}

#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    pub success: bool,
    pub processed: usize,
    pub results: Vec<ExecutionReport>,
}

/// POST /periodic-posts/execute - Run one scheduling cycle now
async fn execute(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
) -> Result<Json<ExecuteResponse>, StatusCode> {
    let results = state
        .scheduler
        .run_cycle()
        .await
        .log_500("Run periodic post cycle error")?;

    Ok(Json(ExecuteResponse {
        success: true,
        processed: results.len(),
        results,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostNowResponse {
    pub success: bool,
    pub threads_post_id: String,
    pub creation_id: String,
}

/// POST /periodic-posts/{id}/post-now - Publish once, outside the schedule
async fn post_now(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(automation_id): Path<Uuid>,
) -> Result<Json<PostNowResponse>, StatusCode> {
    let post = state
        .scheduler
        .post_now(automation_id)
        .await
        .map_err(|e| {
            let status = post_now_status(&e);
            tracing::warn!(%automation_id, error = %e, status = status.as_u16(), "post now failed");
            status
        })?;

    Ok(Json(PostNowResponse {
        success: true,
        threads_post_id: post.post_id,
        creation_id: post.creation_id,
    }))
}

fn post_now_status(e: &PostNowError) -> StatusCode {
    match e {
        PostNowError::NotFound => StatusCode::NOT_FOUND,
        PostNowError::Cycle(CycleError::Resolution(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        PostNowError::Cycle(CycleError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        PostNowError::Publish(p) => publish_status(p.kind),
    }
}

/// GET /periodic-posts/{id}/health - Broken references and last failure
async fn health(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(automation_id): Path<Uuid>,
) -> Result<Json<AutomationHealth>, StatusCode> {
    let automation = state
        .store
        .get_automation(automation_id)
        .await
        .log_500("Get automation error")?
        .ok_or(StatusCode::NOT_FOUND)?;

    let health = automation_health(state.store.as_ref(), &automation)
        .await
        .log_500("Automation health error")?;

    Ok(Json(health))
}
