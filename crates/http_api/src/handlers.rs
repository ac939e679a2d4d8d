use axum::{
    extract::{Json, State},
    response::Html,
};
use serde::Deserialize;

use monitor_core::{AccountingState, DailyUsage, UsageSnapshot};

use crate::{assets, errors::HttpError, state::HttpState};

pub async fn dashboard() -> Html<&'static str> {
    Html(assets::INDEX_HTML)
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn summary(State(state): State<HttpState>) -> Result<Json<UsageSnapshot>, HttpError> {
    Ok(Json(state.service.usage_summary()?))
}

pub async fn daily(State(state): State<HttpState>) -> Result<Json<DailyUsage>, HttpError> {
    Ok(Json(state.service.daily_usage()?))
}

#[derive(Debug, Deserialize)]
pub struct OffsetPayload {
    pub offset_gb: f64,
}

pub async fn offset_put(
    State(state): State<HttpState>,
    Json(payload): Json<OffsetPayload>,
) -> Result<Json<UsageSnapshot>, HttpError> {
    state.service.set_manual_offset_gb(payload.offset_gb)?;
    Ok(Json(state.service.usage_summary()?))
}

pub async fn state_get(State(state): State<HttpState>) -> Result<Json<AccountingState>, HttpError> {
    Ok(Json(state.service.state_snapshot()?))
}

/// Full-state overwrite for administrative recovery. A body missing any field
/// is rejected by the extractor before the engine is touched.
pub async fn state_put(
    State(state): State<HttpState>,
    Json(new_state): Json<AccountingState>,
) -> Result<Json<AccountingState>, HttpError> {
    Ok(Json(state.service.replace_state(new_state)?))
}
