//! REST handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::AppState;
use crate::ActivitySnapshot;

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub activity: ActivitySnapshot,
    pub uptime_secs: i64,
    pub version: String,
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let activity = state.snapshot.borrow().clone();
    Json(StatusResponse {
        activity,
        uptime_secs: (chrono::Utc::now() - state.started_at).num_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
