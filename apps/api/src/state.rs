use std::sync::Arc;

use keyward_application::{ConfigService, LeaseService, RoleService};
use tokio_util::sync::CancellationToken;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config_service: ConfigService,
    pub role_service: RoleService,
    pub lease_service: LeaseService,
    pub operator_token: Arc<str>,
    /// Cancelled on shutdown; credential pipelines run on child tokens.
    pub shutdown: CancellationToken,
}
