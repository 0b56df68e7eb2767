use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use keyward_application::{
    ConfigService, CredentialService, IdentityPlatform, IdentityPlatformConnector, LeaseService,
    RoleService,
};
use keyward_core::{AppError, AppResult};
use keyward_domain::{AccessKey, GroupName, SystemLeaseLimits, UpstreamCredential};
use keyward_infrastructure::InMemorySecretStorage;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::{config, creds, leases, roles};
use crate::dto::{IssueCredentialRequest, WriteConfigRequest, WriteRoleRequest};
use crate::state::AppState;

#[derive(Default)]
struct RecordingPlatform {
    actions: Mutex<Vec<String>>,
    missing_groups: Vec<String>,
}

impl RecordingPlatform {
    async fn push(&self, action: &str) {
        self.actions.lock().await.push(action.to_owned());
    }
}

#[async_trait]
impl IdentityPlatform for RecordingPlatform {
    async fn create_identity(&self, _name: &str, _display_name: &str) -> AppResult<()> {
        self.push("CreateUser").await;
        Ok(())
    }

    async fn delete_identity(&self, _name: &str) -> AppResult<()> {
        self.push("DeleteUser").await;
        Ok(())
    }

    async fn add_to_group(&self, _name: &str, group_name: &GroupName) -> AppResult<()> {
        self.push("AddUserToGroup").await;
        if self
            .missing_groups
            .iter()
            .any(|missing| missing == group_name.as_str())
        {
            return Err(AppError::Remote("EntityNotExist.Group".to_owned()));
        }
        Ok(())
    }

    async fn remove_from_group(&self, _name: &str, _group_name: &GroupName) -> AppResult<()> {
        self.push("RemoveUserFromGroup").await;
        Ok(())
    }

    async fn create_access_key(&self, name: &str) -> AppResult<AccessKey> {
        self.push("CreateAccessKey").await;
        Ok(AccessKey::new(format!("LTAI-{name}"), "minted-secret"))
    }

    async fn delete_access_key(&self, _name: &str, _access_key_id: &str) -> AppResult<()> {
        self.push("DeleteAccessKey").await;
        Ok(())
    }
}

struct RecordingConnector(Arc<RecordingPlatform>);

impl IdentityPlatformConnector for RecordingConnector {
    fn connect(&self, _upstream: &UpstreamCredential) -> AppResult<Arc<dyn IdentityPlatform>> {
        Ok(self.0.clone())
    }
}

fn test_state(platform: Arc<RecordingPlatform>) -> AppState {
    let storage = Arc::new(InMemorySecretStorage::new());
    let limits = SystemLeaseLimits::new(Duration::from_secs(3600), Duration::from_secs(86_400))
        .unwrap_or_else(|_| unreachable!());
    let config_service = ConfigService::new(storage.clone());
    let role_service = RoleService::new(storage.clone(), limits);
    let credentials = CredentialService::new(
        config_service.clone(),
        role_service.clone(),
        Arc::new(RecordingConnector(platform)),
    );

    AppState {
        config_service,
        role_service,
        lease_service: LeaseService::new(credentials, storage, limits),
        operator_token: Arc::from("operator-token-0123456789abcdef0123"),
        shutdown: CancellationToken::new(),
    }
}

async fn configure(state: &AppState) {
    let written = config::write_config_handler(
        State(state.clone()),
        Json(WriteConfigRequest {
            access_key: Some("LTAIroot".to_owned()),
            secret_key: Some("root-secret".to_owned()),
        }),
    )
    .await;
    assert!(matches!(written, Ok(StatusCode::NO_CONTENT)));
}

#[tokio::test]
async fn config_read_omits_secret_key() {
    let state = test_state(Arc::new(RecordingPlatform::default()));
    configure(&state).await;

    let response = config::read_config_handler(State(state)).await;
    assert!(response.is_ok());
    let Json(body) = response.unwrap_or_else(|_| unreachable!());

    let json = serde_json::to_value(&body).unwrap_or_default();
    assert_eq!(json, serde_json::json!({"access_key": "LTAIroot"}));
}

#[tokio::test]
async fn config_write_without_secret_is_rejected() {
    let state = test_state(Arc::new(RecordingPlatform::default()));

    let written = config::write_config_handler(
        State(state),
        Json(WriteConfigRequest {
            access_key: Some("LTAIroot".to_owned()),
            secret_key: None,
        }),
    )
    .await;

    assert!(matches!(written, Err(error) if matches!(error.0, AppError::Validation(_))));
}

#[tokio::test]
async fn role_write_reports_ttl_conflict() {
    let state = test_state(Arc::new(RecordingPlatform::default()));

    let response = roles::write_role_handler(
        State(state),
        Path("deploy".to_owned()),
        Some(Json(WriteRoleRequest {
            ttl: Some(100),
            max_ttl: Some(50),
        })),
    )
    .await;

    assert!(matches!(
        response,
        Err(error) if matches!(&error.0, AppError::Validation(message) if message == "ttl exceeds max_ttl")
    ));
}

#[tokio::test]
async fn role_path_must_be_a_valid_group_name() {
    let state = test_state(Arc::new(RecordingPlatform::default()));

    let response = roles::read_role_handler(State(state), Path("-bad".to_owned())).await;

    assert!(matches!(response, Err(error) if matches!(error.0, AppError::Validation(_))));
}

#[tokio::test]
async fn issue_then_revoke_round_trip() {
    let platform = Arc::new(RecordingPlatform::default());
    let state = test_state(platform.clone());
    configure(&state).await;

    let written = roles::write_role_handler(
        State(state.clone()),
        Path("deploy".to_owned()),
        Some(Json(WriteRoleRequest {
            ttl: Some(600),
            max_ttl: None,
        })),
    )
    .await;
    assert!(written.is_ok());

    let issued = creds::issue_credential_handler(
        State(state.clone()),
        Path("deploy".to_owned()),
        Some(Json(IssueCredentialRequest {
            display_name: Some("ci".to_owned()),
        })),
    )
    .await;
    assert!(issued.is_ok());
    let Json(issued) = issued.unwrap_or_else(|_| unreachable!());
    assert_eq!(issued.lease_duration, 600);
    assert_eq!(issued.lease_max_duration, 86_400);
    assert_eq!(issued.secret_key, "minted-secret");

    let lease = leases::read_lease_handler(State(state.clone()), Path(issued.lease_id.clone())).await;
    assert!(lease.is_ok());
    let Json(lease) = lease.unwrap_or_else(|_| unreachable!());
    assert_eq!(lease.group_name, "deploy");
    assert!(
        lease
            .username
            .as_deref()
            .is_some_and(|username| username.starts_with("deploy-ci-"))
    );

    let revoked = leases::revoke_lease_handler(State(state.clone()), Path(issued.lease_id)).await;
    assert!(matches!(revoked, Ok(StatusCode::NO_CONTENT)));

    let actions = platform.actions.lock().await.clone();
    assert_eq!(
        actions,
        vec![
            "CreateUser",
            "AddUserToGroup",
            "CreateAccessKey",
            "DeleteAccessKey",
            "RemoveUserFromGroup",
            "DeleteUser",
        ]
    );

    let Json(listed) = leases::list_leases_handler(State(state))
        .await
        .unwrap_or_else(|_| unreachable!());
    assert!(listed.keys.is_empty());
}

#[tokio::test]
async fn issue_into_missing_group_is_bad_gateway_and_cleans_up() {
    let platform = Arc::new(RecordingPlatform {
        missing_groups: vec!["ghost".to_owned()],
        ..RecordingPlatform::default()
    });
    let state = test_state(platform.clone());
    configure(&state).await;

    let issued =
        creds::issue_credential_handler(State(state), Path("ghost".to_owned()), None).await;

    assert!(matches!(issued, Err(error) if matches!(error.0, AppError::Provisioning(_))));
    let actions = platform.actions.lock().await.clone();
    assert_eq!(actions, vec!["CreateUser", "AddUserToGroup", "DeleteUser"]);
}

#[tokio::test]
async fn issue_without_config_is_precondition_failure() {
    let state = test_state(Arc::new(RecordingPlatform::default()));

    let issued =
        creds::issue_credential_handler(State(state), Path("deploy".to_owned()), None).await;

    assert!(matches!(
        issued,
        Err(error) if matches!(error.0, AppError::UpstreamNotConfigured)
    ));
}

#[tokio::test]
async fn unknown_lease_is_not_found() {
    let state = test_state(Arc::new(RecordingPlatform::default()));

    let renewed = leases::renew_lease_handler(
        State(state),
        Path("6f1c1f0e-0000-4000-8000-000000000000".to_owned()),
    )
    .await;

    assert!(matches!(renewed, Err(error) if matches!(error.0, AppError::NotFound(_))));
}
