use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use keyward_core::AppError;
use serde::Serialize;
use tracing::error;
use ts_rs::TS;

/// API error payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/error-response.ts"
)]
pub struct ErrorResponse {
    message: String,
}

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::UpstreamNotConfigured => StatusCode::PRECONDITION_FAILED,
            AppError::MalformedLeaseMetadata(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Remote(_) | AppError::Provisioning(_) | AppError::Revocation(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Cancelled(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::RolePolicyLoadFailed(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = %status, error = %self.0, "request failed");
        }

        let payload = Json(ErrorResponse {
            message: self.0.to_string(),
        });

        (status, payload).into_response()
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use keyward_core::{AppError, ProvisioningFailure, ProvisioningStep};

    use super::ApiError;

    #[test]
    fn lifecycle_errors_map_to_distinct_statuses() {
        let provisioning = AppError::Provisioning(ProvisioningFailure {
            step: ProvisioningStep::AttachToGroup,
            message: "group missing".to_owned(),
            cancelled: false,
            cleanup_failures: Vec::new(),
            skipped_compensations: Vec::new(),
        });

        assert_eq!(ApiError(provisioning).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ApiError(AppError::UpstreamNotConfigured).status(),
            StatusCode::PRECONDITION_FAILED
        );
        assert_eq!(
            ApiError(AppError::MalformedLeaseMetadata("missing".to_owned())).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError(AppError::Cancelled("shutdown".to_owned())).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
