use axum::Json;
use axum::extract::{Path, State};
use keyward_core::AppError;
use keyward_domain::GroupName;

use crate::dto::{IssueCredentialRequest, IssuedCredentialResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn issue_credential_handler(
    State(state): State<AppState>,
    Path(group_name): Path<String>,
    payload: Option<Json<IssueCredentialRequest>>,
) -> ApiResult<Json<IssuedCredentialResponse>> {
    let group_name = GroupName::new(group_name)?;
    let display_name = payload
        .and_then(|Json(payload)| payload.display_name)
        .unwrap_or_default();

    // Detached so a dropped connection cannot interrupt compensation.
    let cancel = state.shutdown.child_token();
    let lease_service = state.lease_service.clone();
    let issued = tokio::spawn(async move {
        lease_service
            .issue(display_name.as_str(), &group_name, &cancel)
            .await
    })
    .await
    .map_err(|error| AppError::Internal(format!("credential issuance task failed: {error}")))??;

    Ok(Json(IssuedCredentialResponse::from(issued)))
}
