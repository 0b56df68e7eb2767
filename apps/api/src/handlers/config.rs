use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use keyward_core::AppError;

use crate::dto::{ConfigResponse, WriteConfigRequest};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn write_config_handler(
    State(state): State<AppState>,
    Json(payload): Json<WriteConfigRequest>,
) -> ApiResult<StatusCode> {
    state
        .config_service
        .write_upstream(payload.access_key, payload.secret_key)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn read_config_handler(State(state): State<AppState>) -> ApiResult<Json<ConfigResponse>> {
    let view = state
        .config_service
        .read_upstream()
        .await?
        .ok_or_else(|| AppError::NotFound("upstream credentials are not configured".to_owned()))?;

    Ok(Json(ConfigResponse::from(view)))
}

pub async fn delete_config_handler(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.config_service.delete_upstream().await?;
    Ok(StatusCode::NO_CONTENT)
}
