use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use keyward_core::AppError;
use keyward_domain::GroupName;

use crate::dto::{KeyListResponse, RoleResponse, WriteRoleRequest};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_roles_handler(State(state): State<AppState>) -> ApiResult<Json<KeyListResponse>> {
    let keys = state.role_service.list_roles().await?;
    Ok(Json(KeyListResponse { keys }))
}

pub async fn write_role_handler(
    State(state): State<AppState>,
    Path(group_name): Path<String>,
    payload: Option<Json<WriteRoleRequest>>,
) -> ApiResult<Json<RoleResponse>> {
    let group_name = GroupName::new(group_name)?;
    let payload = payload.map(|Json(payload)| payload).unwrap_or_default();
    let outcome = state
        .role_service
        .write_role(&group_name, payload.into())
        .await?;

    Ok(Json(RoleResponse::from(outcome)))
}

pub async fn update_role_handler(
    State(state): State<AppState>,
    Path(group_name): Path<String>,
    Json(payload): Json<WriteRoleRequest>,
) -> ApiResult<Json<RoleResponse>> {
    let group_name = GroupName::new(group_name)?;
    let outcome = state
        .role_service
        .update_role(&group_name, payload.into())
        .await?;

    Ok(Json(RoleResponse::from(outcome)))
}

pub async fn read_role_handler(
    State(state): State<AppState>,
    Path(group_name): Path<String>,
) -> ApiResult<Json<RoleResponse>> {
    let group_name = GroupName::new(group_name)?;
    let entry = state
        .role_service
        .read_role(&group_name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("role for group '{group_name}' does not exist")))?;

    Ok(Json(RoleResponse::from(entry)))
}

pub async fn delete_role_handler(
    State(state): State<AppState>,
    Path(group_name): Path<String>,
) -> ApiResult<StatusCode> {
    let group_name = GroupName::new(group_name)?;
    state.role_service.delete_role(&group_name).await?;
    Ok(StatusCode::NO_CONTENT)
}
