//! Alibaba Cloud RAM adapter for the identity platform port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use keyward_application::{IdentityPlatform, IdentityPlatformConnector};
use keyward_core::{AppError, AppResult};
use keyward_domain::{AccessKey, GroupName, UpstreamCredential};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

mod signing;

use signing::{RpcRequest, SignedRequest, sign};

/// RAM RPC API version the adapter speaks.
pub const RAM_API_VERSION: &str = "2015-05-01";

/// Public RAM endpoint.
pub const DEFAULT_RAM_ENDPOINT: &str = "https://ram.aliyuncs.com";

/// Builds RAM clients that share one HTTP connection pool.
#[derive(Clone)]
pub struct RamIdentityPlatformConnector {
    http_client: reqwest::Client,
    endpoint: Url,
}

impl RamIdentityPlatformConnector {
    /// Creates a connector for `endpoint`.
    pub fn new(http_client: reqwest::Client, endpoint: Url) -> AppResult<Self> {
        if endpoint.host_str().is_none() {
            return Err(AppError::Validation(format!(
                "RAM endpoint '{endpoint}' has no host"
            )));
        }

        Ok(Self {
            http_client,
            endpoint,
        })
    }
}

impl IdentityPlatformConnector for RamIdentityPlatformConnector {
    fn connect(&self, upstream: &UpstreamCredential) -> AppResult<Arc<dyn IdentityPlatform>> {
        Ok(Arc::new(RamIdentityPlatform {
            http_client: self.http_client.clone(),
            endpoint: self.endpoint.clone(),
            upstream: upstream.clone(),
        }))
    }
}

/// RAM client authenticated with the broker's upstream credentials.
pub struct RamIdentityPlatform {
    http_client: reqwest::Client,
    endpoint: Url,
    upstream: UpstreamCredential,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RamErrorResponse {
    code: Option<String>,
    message: Option<String>,
    request_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateAccessKeyResponse {
    access_key: AccessKeyPayload,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AccessKeyPayload {
    access_key_id: String,
    access_key_secret: String,
}

impl RamIdentityPlatform {
    fn host(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or_default();
        match self.endpoint.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_owned(),
        }
    }

    async fn call(&self, action: &str, params: &[(&str, &str)]) -> AppResult<Value> {
        let host = self.host();
        let date = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let nonce = uuid::Uuid::new_v4().to_string();
        let SignedRequest { query, headers } = sign(
            &RpcRequest {
                method: "POST",
                host: host.as_str(),
                action,
                version: RAM_API_VERSION,
                params,
                date: date.as_str(),
                nonce: nonce.as_str(),
            },
            self.upstream.access_key(),
            self.upstream.secret_key(),
        )?;

        let mut url = self.endpoint.clone();
        url.set_path("/");
        url.set_query(Some(query.as_str()));

        let mut builder = self.http_client.post(url);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }

        debug!(action, "calling RAM");
        let response = builder
            .send()
            .await
            .map_err(|error| AppError::Remote(format!("{action} transport error: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| AppError::Remote(format!("{action} response unreadable: {error}")))?;

        if !status.is_success() {
            return Err(error_from_response(action, status, body.as_str()));
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(body.as_str())
            .map_err(|error| AppError::Remote(format!("{action} returned invalid JSON: {error}")))
    }
}

fn error_from_response(action: &str, status: reqwest::StatusCode, body: &str) -> AppError {
    match serde_json::from_str::<RamErrorResponse>(body) {
        Ok(RamErrorResponse {
            code: Some(code),
            message,
            request_id,
        }) => AppError::Remote(format!(
            "{action} failed with {code}: {} (status {status}, request {})",
            message.unwrap_or_default(),
            request_id.unwrap_or_else(|| "unknown".to_owned())
        )),
        _ => AppError::Remote(format!("{action} failed with status {status}: {body}")),
    }
}

#[async_trait]
impl IdentityPlatform for RamIdentityPlatform {
    async fn create_identity(&self, name: &str, display_name: &str) -> AppResult<()> {
        self.call(
            "CreateUser",
            &[("UserName", name), ("DisplayName", display_name)],
        )
        .await?;
        Ok(())
    }

    async fn delete_identity(&self, name: &str) -> AppResult<()> {
        self.call("DeleteUser", &[("UserName", name)]).await?;
        Ok(())
    }

    async fn add_to_group(&self, name: &str, group_name: &GroupName) -> AppResult<()> {
        self.call(
            "AddUserToGroup",
            &[("UserName", name), ("GroupName", group_name.as_str())],
        )
        .await?;
        Ok(())
    }

    async fn remove_from_group(&self, name: &str, group_name: &GroupName) -> AppResult<()> {
        self.call(
            "RemoveUserFromGroup",
            &[("UserName", name), ("GroupName", group_name.as_str())],
        )
        .await?;
        Ok(())
    }

    async fn create_access_key(&self, name: &str) -> AppResult<AccessKey> {
        let response = self.call("CreateAccessKey", &[("UserName", name)]).await?;
        let parsed = serde_json::from_value::<CreateAccessKeyResponse>(response).map_err(|error| {
            AppError::Remote(format!("CreateAccessKey returned unexpected payload: {error}"))
        })?;

        Ok(AccessKey::new(
            parsed.access_key.access_key_id,
            parsed.access_key.access_key_secret,
        ))
    }

    async fn delete_access_key(&self, name: &str, access_key_id: &str) -> AppResult<()> {
        self.call(
            "DeleteAccessKey",
            &[("UserName", name), ("UserAccessKeyId", access_key_id)],
        )
        .await?;
        Ok(())
    }
}
