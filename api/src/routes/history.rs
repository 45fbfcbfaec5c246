//! Post history listing

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::auth::ServiceAuth;
use crate::AppState;
use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::domain::{PostHistoryRecord, history};
use crate::services::error::LogErr;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/accounts/{id}/history", get(list_history))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_SIZE
}

/// GET /accounts/{id}/history?limit= - Newest history rows for an account
async fn list_history(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(account_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<PostHistoryRecord>>, StatusCode> {
    let limit = query.limit.clamp(1, MAX_PAGE_SIZE);

    let rows = history::list_account_history(&state.db, account_id, limit)
        .await
        .log_500("List account history error")?;

    Ok(Json(rows))
}
