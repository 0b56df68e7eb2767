use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

pub fn build_router(app_state: AppState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/v1/config",
            get(handlers::config::read_config_handler)
                .post(handlers::config::write_config_handler)
                .delete(handlers::config::delete_config_handler),
        )
        .route("/v1/roles", get(handlers::roles::list_roles_handler))
        .route(
            "/v1/roles/{group_name}",
            get(handlers::roles::read_role_handler)
                .post(handlers::roles::write_role_handler)
                .put(handlers::roles::update_role_handler)
                .delete(handlers::roles::delete_role_handler),
        )
        .route(
            "/v1/creds/{group_name}",
            post(handlers::creds::issue_credential_handler),
        )
        .route("/v1/leases", get(handlers::leases::list_leases_handler))
        .route(
            "/v1/leases/{lease_id}",
            get(handlers::leases::read_lease_handler)
                .delete(handlers::leases::revoke_lease_handler),
        )
        .route(
            "/v1/leases/{lease_id}/renew",
            post(handlers::leases::renew_lease_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_operator_token,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
