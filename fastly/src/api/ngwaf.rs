//! Next-Gen WAF workspace alert integrations

use serde::{Deserialize, Serialize};

use super::common::null_as_default;
use super::error::ApiError;
use crate::api::Client;

pub const DATADOG_INTEGRATION_TYPE: &str = "datadog";

/// Events forwarded to an alert integration
pub const FLAG_EVENT: &str = "flag";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DatadogConfig {
    /// The API never echoes the key back, so it may be missing on reads
    #[serde(default, deserialize_with = "null_as_default")]
    pub key: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub site: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorkspaceAlert {
    pub id: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub config: DatadogConfig,
    #[serde(default, deserialize_with = "null_as_default")]
    pub events: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateWorkspaceAlertRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub config: DatadogConfig,
    pub events: Vec<String>,
}

impl CreateWorkspaceAlertRequest {
    pub fn datadog(description: String, config: DatadogConfig) -> Self {
        Self {
            kind: DATADOG_INTEGRATION_TYPE.to_string(),
            description,
            config,
            events: vec![FLAG_EVENT.to_string()],
        }
    }
}

/// PATCH body; the integration type cannot change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateWorkspaceAlertRequest {
    pub description: String,
    pub config: DatadogConfig,
    pub events: Vec<String>,
}

impl From<CreateWorkspaceAlertRequest> for UpdateWorkspaceAlertRequest {
    fn from(req: CreateWorkspaceAlertRequest) -> Self {
        Self {
            description: req.description,
            config: req.config,
            events: req.events,
        }
    }
}

pub struct NgwafApi<'a> {
    client: &'a Client,
}

impl<'a> NgwafApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn alerts_path(workspace_id: &str) -> String {
        format!(
            "/ngwaf/v1/workspaces/{}/alerts",
            urlencoding::encode(workspace_id)
        )
    }

    fn alert_path(workspace_id: &str, alert_id: &str) -> String {
        format!(
            "{}/{}",
            Self::alerts_path(workspace_id),
            urlencoding::encode(alert_id)
        )
    }

    pub async fn create_alert(
        &self,
        workspace_id: &str,
        request: &CreateWorkspaceAlertRequest,
    ) -> Result<WorkspaceAlert, ApiError> {
        self.client
            .post(&Self::alerts_path(workspace_id), request)
            .await
    }

    pub async fn get_alert(
        &self,
        workspace_id: &str,
        alert_id: &str,
    ) -> Result<WorkspaceAlert, ApiError> {
        self.client
            .get(&Self::alert_path(workspace_id, alert_id))
            .await
    }

    pub async fn update_alert(
        &self,
        workspace_id: &str,
        alert_id: &str,
        request: &UpdateWorkspaceAlertRequest,
    ) -> Result<WorkspaceAlert, ApiError> {
        self.client
            .patch(&Self::alert_path(workspace_id, alert_id), request)
            .await
    }

    pub async fn delete_alert(&self, workspace_id: &str, alert_id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&Self::alert_path(workspace_id, alert_id))
            .await
    }
}
