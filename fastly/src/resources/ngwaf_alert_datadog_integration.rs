//! Next-Gen WAF Datadog alert integration resource

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource,
    ReadResourceRequest, ReadResourceResponse, Resource, ResourceMetadataRequest,
    ResourceMetadataResponse, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, ResourceWithImportState, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

use crate::api::ngwaf::{
    CreateWorkspaceAlertRequest, DatadogConfig, UpdateWorkspaceAlertRequest, WorkspaceAlert,
};

pub const DEFAULT_DATADOG_SITE: &str = "us1";

#[derive(Default)]
pub struct NgwafAlertDatadogIntegrationResource {
    provider_data: Option<crate::FastlyProviderData>,
}

impl NgwafAlertDatadogIntegrationResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a Datadog alert integration for a Next-Gen WAF workspace")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("The ID of the alert integration")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("workspace_id", AttributeType::String)
                    .description("The ID of the workspace")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("key", AttributeType::String)
                    .description("Datadog API key")
                    .required()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("site", AttributeType::String)
                    .description("Datadog site the events are sent to, e.g. `us1` or `eu1`")
                    .optional()
                    .validator(crate::validators::datadog_site())
                    .default(StaticDefault::string(DEFAULT_DATADOG_SITE))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("An optional description for the alert integration")
                    .optional()
                    .build(),
            )
            .build()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntegrationConfig {
    pub workspace_id: String,
    pub description: String,
    pub datadog: DatadogConfig,
}

impl IntegrationConfig {
    /// Decode after filling schema defaults
    pub fn from_config(config: &DynamicValue) -> Result<Self, Diagnostic> {
        let config = tfplug::apply_defaults(
            &NgwafAlertDatadogIntegrationResource::schema_static(),
            config,
        );
        let invalid = |e: tfplug::TfplugError| Diagnostic::error("Invalid configuration", e.to_string());

        Ok(Self {
            workspace_id: config
                .get_string(&AttributePath::new("workspace_id"))
                .map_err(invalid)?,
            description: config
                .get_optional_string(&AttributePath::new("description"))
                .map_err(invalid)?
                .unwrap_or_default(),
            datadog: DatadogConfig {
                key: config
                    .get_string(&AttributePath::new("key"))
                    .map_err(invalid)?,
                site: config
                    .get_optional_string(&AttributePath::new("site"))
                    .map_err(invalid)?
                    .unwrap_or_else(|| DEFAULT_DATADOG_SITE.to_string()),
            },
        })
    }
}

impl From<IntegrationConfig> for CreateWorkspaceAlertRequest {
    fn from(config: IntegrationConfig) -> Self {
        CreateWorkspaceAlertRequest::datadog(config.description, config.datadog)
    }
}

/// Split an import ID of the form `<workspace_id>/<id>`
pub fn parse_import_id(id: &str) -> Option<(&str, &str)> {
    match id.split_once('/') {
        Some((workspace_id, alert_id))
            if !workspace_id.is_empty() && !alert_id.is_empty() && !alert_id.contains('/') =>
        {
            Some((workspace_id, alert_id))
        }
        _ => None,
    }
}

/// The key is never returned by the API, so it stays as configured
pub fn integration_state(
    base: DynamicValue,
    workspace_id: &str,
    alert: &WorkspaceAlert,
) -> tfplug::Result<DynamicValue> {
    let mut state = if base.is_null() {
        DynamicValue::object()
    } else {
        base
    };

    state.set_string(&AttributePath::new("id"), alert.id.clone())?;
    state.set_string(&AttributePath::new("workspace_id"), workspace_id.to_string())?;
    if alert.description.is_empty() {
        state.set_null(&AttributePath::new("description"))?;
    } else {
        state.set_string(&AttributePath::new("description"), alert.description.clone())?;
    }
    if !alert.config.site.is_empty() {
        state.set_string(&AttributePath::new("site"), alert.config.site.clone())?;
    }
    if !alert.config.key.is_empty() {
        state.set_string(&AttributePath::new("key"), alert.config.key.clone())?;
    }
    Ok(state)
}

fn not_configured() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "Provider data was not properly configured",
    )
}

fn state_ids(state: &DynamicValue) -> tfplug::Result<(String, String)> {
    Ok((
        state.get_string(&AttributePath::new("workspace_id"))?,
        state.get_string(&AttributePath::new("id"))?,
    ))
}

#[async_trait]
impl Resource for NgwafAlertDatadogIntegrationResource {
    fn type_name(&self) -> &str {
        "fastly_ngwaf_alert_datadog_integration"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: tfplug::validate_config(&Self::schema_static(), &request.config),
        }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics,
            };
        };

        let config = match IntegrationConfig::from_config(&request.config) {
            Ok(config) => config,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let workspace_id = config.workspace_id.clone();
        tracing::debug!("Creating Datadog alert integration in workspace {}", workspace_id);

        let create_request = CreateWorkspaceAlertRequest::from(config.clone());
        let new_state = match provider_data
            .client
            .ngwaf()
            .create_alert(&workspace_id, &create_request)
            .await
        {
            Ok(alert) => {
                let mut state = request.planned_state.clone();
                let written = state
                    .set_string(&AttributePath::new("id"), alert.id)
                    .and_then(|_| {
                        state.set_string(&AttributePath::new("site"), config.datadog.site)
                    });
                if let Err(e) = written {
                    diagnostics.push(Diagnostic::error(
                        "Failed to set alert integration state",
                        e.to_string(),
                    ));
                }
                state
            }
            Err(e) => {
                tracing::error!("Failed to create Datadog alert integration: {}", e);
                diagnostics.push(Diagnostic::error(
                    "Failed to create alert integration",
                    format!("API error: {}", e),
                ));
                request.planned_state
            }
        };

        CreateResourceResponse {
            new_state,
            private: vec![],
            diagnostics,
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut diagnostics = vec![];

        let Ok((workspace_id, id)) = state_ids(&request.current_state) else {
            return ReadResourceResponse {
                new_state: None,
                diagnostics,
                private: request.private,
                deferred: None,
            };
        };

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics,
                private: request.private,
                deferred: None,
            };
        };

        let new_state = match provider_data.client.ngwaf().get_alert(&workspace_id, &id).await {
            Ok(alert) => {
                match integration_state(request.current_state.clone(), &workspace_id, &alert) {
                    Ok(state) => Some(state),
                    Err(e) => {
                        diagnostics.push(Diagnostic::error(
                            "Failed to set alert integration state",
                            e.to_string(),
                        ));
                        Some(request.current_state)
                    }
                }
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    "Alert integration {} not found in workspace {}, removing from state",
                    id,
                    workspace_id
                );
                None
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to read alert integration",
                    format!("API error: {}", e),
                ));
                Some(request.current_state)
            }
        };

        ReadResourceResponse {
            new_state,
            diagnostics,
            private: request.private,
            deferred: None,
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return UpdateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics,
            };
        };

        let (workspace_id, id) = match state_ids(&request.prior_state) {
            Ok(ids) => ids,
            Err(e) => {
                diagnostics.push(Diagnostic::error("Missing alert integration ID", e.to_string()));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let config = match IntegrationConfig::from_config(&request.config) {
            Ok(config) => config,
            Err(diag) => {
                diagnostics.push(diag);
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        tracing::debug!("Updating Datadog alert integration {}", id);
        let site = config.datadog.site.clone();
        let update_request =
            UpdateWorkspaceAlertRequest::from(CreateWorkspaceAlertRequest::from(config));

        match provider_data
            .client
            .ngwaf()
            .update_alert(&workspace_id, &id, &update_request)
            .await
        {
            Ok(_) => {
                let mut new_state = request.planned_state;
                if let Err(e) = new_state.set_string(&AttributePath::new("site"), site) {
                    diagnostics.push(Diagnostic::error(
                        "Failed to set alert integration state",
                        e.to_string(),
                    ));
                }
                UpdateResourceResponse {
                    new_state,
                    private: vec![],
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to update alert integration",
                    format!("API error: {}", e),
                ));
                UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                }
            }
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return DeleteResourceResponse { diagnostics };
        };

        let Ok((workspace_id, id)) = state_ids(&request.prior_state) else {
            return DeleteResourceResponse { diagnostics };
        };

        match provider_data
            .client
            .ngwaf()
            .delete_alert(&workspace_id, &id)
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!("Alert integration {} already deleted", id);
            }
            Err(e) => diagnostics.push(Diagnostic::error(
                "Failed to delete alert integration",
                format!("API error: {}", e),
            )),
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for NgwafAlertDatadogIntegrationResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];

        match crate::FastlyProviderData::from_configure(request.provider_data, "resource") {
            Ok(provider_data) => self.provider_data = Some(provider_data),
            Err(diag) => diagnostics.push(diag),
        }

        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for NgwafAlertDatadogIntegrationResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
            deferred: None,
        };

        let Some((workspace_id, id)) = parse_import_id(&request.id) else {
            response.diagnostics.push(Diagnostic::error(
                "Invalid import ID",
                format!(
                    "Expected an import ID of the form <workspace_id>/<id>, got \"{}\"",
                    request.id
                ),
            ));
            return response;
        };

        let mut state = DynamicValue::object();
        let written = state
            .set_string(&AttributePath::new("workspace_id"), workspace_id.to_string())
            .and_then(|_| state.set_string(&AttributePath::new("id"), id.to_string()));
        match written {
            Ok(()) => response.imported_resources.push(ImportedResource {
                type_name: request.type_name.clone(),
                state,
                private: vec![],
            }),
            Err(e) => response
                .diagnostics
                .push(Diagnostic::error("Failed to set import state", e.to_string())),
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Client;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use tfplug::types::{ClientCapabilities, Dynamic};

    fn config(site: Option<&str>) -> DynamicValue {
        let mut config = DynamicValue::object();
        config
            .set_string(&AttributePath::new("workspace_id"), "ws-1".to_string())
            .unwrap();
        config
            .set_string(&AttributePath::new("key"), "123456789".to_string())
            .unwrap();
        config
            .set_string(&AttributePath::new("description"), "Some Description".to_string())
            .unwrap();
        config
            .set(
                &AttributePath::new("site"),
                site.map(Dynamic::from).unwrap_or(Dynamic::Null),
            )
            .unwrap();
        config
    }

    fn configured(server_url: &str) -> NgwafAlertDatadogIntegrationResource {
        let mut resource = NgwafAlertDatadogIntegrationResource::new();
        resource.provider_data = Some(crate::FastlyProviderData::new(
            Client::new(server_url, "test-key").unwrap(),
        ));
        resource
    }

    #[test]
    fn schema_site_is_optional_with_default() {
        let schema = NgwafAlertDatadogIntegrationResource::schema_static();
        let site = schema.attribute("site").unwrap();
        assert!(site.optional);
        assert!(!site.required);
        assert!(site.default.is_some());
        assert_eq!(site.validators.len(), 1);

        let key = schema.attribute("key").unwrap();
        assert!(key.sensitive);
    }

    #[test]
    fn config_defaults_site() {
        let decoded = IntegrationConfig::from_config(&config(None)).unwrap();
        assert_eq!(decoded.datadog.site, "us1");

        let decoded = IntegrationConfig::from_config(&config(Some("eu1"))).unwrap();
        assert_eq!(decoded.datadog.site, "eu1");
    }

    #[tokio::test]
    async fn validate_rejects_bad_site() {
        let response = NgwafAlertDatadogIntegrationResource::new()
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "fastly_ngwaf_alert_datadog_integration".to_string(),
                    config: config(Some("us13")),
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;
        assert_eq!(response.diagnostics.len(), 1);
    }

    #[test]
    fn import_id_parsing() {
        assert_eq!(parse_import_id("ws-1/alert-1"), Some(("ws-1", "alert-1")));
        assert_eq!(parse_import_id("alert-1"), None);
        assert_eq!(parse_import_id("/alert-1"), None);
        assert_eq!(parse_import_id("ws-1/"), None);
        assert_eq!(parse_import_id("a/b/c"), None);
    }

    #[tokio::test]
    async fn create_sends_datadog_payload() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/ngwaf/v1/workspaces/ws-1/alerts")
            .match_body(Matcher::Json(json!({
                "type": "datadog",
                "description": "Some Description",
                "config": {"key": "123456789", "site": "us1"},
                "events": ["flag"]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"alert-1","type":"datadog","description":"Some Description","config":{"site":"us1"},"events":["flag"]}"#)
            .create_async()
            .await;

        let response = configured(&server.url())
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "fastly_ngwaf_alert_datadog_integration".to_string(),
                    planned_state: config(None),
                    config: config(None),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        mock.assert_async().await;
        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(
            response.new_state.get_string(&AttributePath::new("id")).unwrap(),
            "alert-1"
        );
        assert_eq!(
            response.new_state.get_string(&AttributePath::new("site")).unwrap(),
            "us1"
        );
    }

    #[tokio::test]
    async fn read_keeps_configured_key_and_drops_missing_integration() {
        let mut server = Server::new_async().await;
        let _found = server
            .mock("GET", "/ngwaf/v1/workspaces/ws-1/alerts/alert-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"alert-1","type":"datadog","description":"","config":{"site":"eu1"}}"#)
            .create_async()
            .await;
        let _gone = server
            .mock("GET", "/ngwaf/v1/workspaces/ws-1/alerts/alert-2")
            .with_status(404)
            .create_async()
            .await;
        let resource = configured(&server.url());

        let read = |id: &str| {
            let mut state = config(Some("us1"));
            state
                .set_string(&AttributePath::new("id"), id.to_string())
                .unwrap();
            ReadResourceRequest {
                type_name: "fastly_ngwaf_alert_datadog_integration".to_string(),
                current_state: state,
                private: vec![],
                provider_meta: None,
                client_capabilities: ClientCapabilities::default(),
            }
        };

        let response = resource.read(Context::new(), read("alert-1")).await;
        assert!(response.diagnostics.is_empty());
        let state = response.new_state.unwrap();
        assert_eq!(state.get_string(&AttributePath::new("site")).unwrap(), "eu1");
        assert_eq!(
            state.get_string(&AttributePath::new("key")).unwrap(),
            "123456789"
        );
        assert_eq!(
            state
                .get_optional_string(&AttributePath::new("description"))
                .unwrap(),
            None
        );

        let response = resource.read(Context::new(), read("alert-2")).await;
        assert!(response.diagnostics.is_empty());
        assert!(response.new_state.is_none());
    }

    #[tokio::test]
    async fn import_splits_workspace_and_id() {
        let resource = NgwafAlertDatadogIntegrationResource::new();
        let response = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: "fastly_ngwaf_alert_datadog_integration".to_string(),
                    id: "ws-1/alert-1".to_string(),
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;
        assert!(response.diagnostics.is_empty());
        let state = &response.imported_resources[0].state;
        assert_eq!(
            state.get_string(&AttributePath::new("workspace_id")).unwrap(),
            "ws-1"
        );
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "alert-1");

        let response = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: "fastly_ngwaf_alert_datadog_integration".to_string(),
                    id: "alert-1".to_string(),
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;
        assert_eq!(response.diagnostics[0].summary, "Invalid import ID");
    }
}
