use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use keyward_core::AppError;
use subtle::ConstantTimeEq;

use crate::error::ApiResult;
use crate::state::AppState;

pub async fn require_operator_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("operator token required".to_owned()))?;

    if !tokens_match(presented.trim().as_bytes(), state.operator_token.as_bytes()) {
        return Err(AppError::Unauthorized("invalid operator token".to_owned()).into());
    }

    Ok(next.run(request).await)
}

fn tokens_match(presented: &[u8], expected: &[u8]) -> bool {
    presented.ct_eq(expected).into()
}
