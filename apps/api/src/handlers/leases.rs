use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use keyward_core::{AppError, LeaseId};

use crate::dto::{KeyListResponse, LeaseResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_leases_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<KeyListResponse>> {
    let keys = state
        .lease_service
        .list()
        .await?
        .iter()
        .map(LeaseId::to_string)
        .collect();

    Ok(Json(KeyListResponse { keys }))
}

pub async fn read_lease_handler(
    State(state): State<AppState>,
    Path(lease_id): Path<String>,
) -> ApiResult<Json<LeaseResponse>> {
    let record = state.lease_service.lookup(lease_id.parse()?).await?;
    Ok(Json(LeaseResponse::from(record)))
}

pub async fn renew_lease_handler(
    State(state): State<AppState>,
    Path(lease_id): Path<String>,
) -> ApiResult<Json<LeaseResponse>> {
    let record = state.lease_service.renew(lease_id.parse()?).await?;
    Ok(Json(LeaseResponse::from(record)))
}

pub async fn revoke_lease_handler(
    State(state): State<AppState>,
    Path(lease_id): Path<String>,
) -> ApiResult<StatusCode> {
    let lease_id: LeaseId = lease_id.parse()?;

    let cancel = state.shutdown.child_token();
    let lease_service = state.lease_service.clone();
    tokio::spawn(async move { lease_service.revoke(lease_id, &cancel).await })
        .await
        .map_err(|error| {
            AppError::Internal(format!("lease revocation task failed: {error}"))
        })??;

    Ok(StatusCode::NO_CONTENT)
}
