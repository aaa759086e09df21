pub mod annotation;
pub mod api;
pub mod data_sources;
pub mod lookup;
pub mod provider_data;
pub mod resources;
pub mod validators;

pub use provider_data::FastlyProviderData;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::DataSourceWithConfigure;
use tfplug::defaults::EnvDefault;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetaSchemaRequest, ProviderMetaSchemaResponse, ProviderMetadataRequest,
    ProviderMetadataResponse, ProviderSchemaRequest, ProviderSchemaResponse, ResourceFactory,
    StopProviderRequest, StopProviderResponse, ValidateProviderConfigRequest,
    ValidateProviderConfigResponse,
};
use tfplug::resource::ResourceWithConfigure;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, ServerCapabilities};
use tfplug::LogLevel;

pub const API_KEY_ENV: &str = "FASTLY_API_KEY";
pub const BASE_URL_ENV: &str = "FASTLY_API_URL";

#[derive(Default)]
pub struct FastlyProvider {
    provider_data: Option<FastlyProviderData>,
}

impl FastlyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Terraform provider for Fastly")
            .attribute(
                AttributeBuilder::new("api_key", AttributeType::String)
                    .description("Fastly API key from https://app.fastly.com/#account. Can also be set with the FASTLY_API_KEY environment variable.")
                    .optional()
                    .sensitive()
                    .default(EnvDefault::create_required(API_KEY_ENV))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("base_url", AttributeType::String)
                    .description("Fastly API URL. Can also be set with the FASTLY_API_URL environment variable.")
                    .optional()
                    .default(EnvDefault::create(BASE_URL_ENV, api::DEFAULT_BASE_URL))
                    .build(),
            )
            .build()
    }
}

/// Read a non-empty string setting; a value of the wrong type is a config error
fn config_string(
    config: &tfplug::DynamicValue,
    name: &str,
) -> Result<Option<String>, Diagnostic> {
    let path = AttributePath::new(name);
    match config.get_optional_string(&path) {
        Ok(value) => Ok(value.filter(|v| !v.is_empty())),
        Err(e) => Err(
            Diagnostic::error("Invalid configuration", format!("{}: {}", name, e))
                .with_attribute(path),
        ),
    }
}

#[async_trait]
impl Provider for FastlyProvider {
    fn type_name(&self) -> &str {
        "fastly"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name().to_string(),
            server_capabilities: ServerCapabilities::default(),
        }
    }

    async fn schema(&self, _ctx: Context, _request: ProviderSchemaRequest) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: vec![],
        }
    }

    async fn meta_schema(
        &self,
        _ctx: Context,
        _request: ProviderMetaSchemaRequest,
    ) -> ProviderMetaSchemaResponse {
        ProviderMetaSchemaResponse {
            schema: None,
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        // No-op once a subscriber is installed
        tfplug::init_logging(LogLevel::from_env_or(LogLevel::Info));

        let mut diagnostics = vec![];
        let config = tfplug::apply_defaults(&Self::schema_static(), &request.config);

        let (api_key, base_url) = match (
            config_string(&config, "api_key"),
            config_string(&config, "base_url"),
        ) {
            (Ok(api_key), Ok(base_url)) => (api_key, base_url),
            (api_key, base_url) => {
                diagnostics.extend(api_key.err());
                diagnostics.extend(base_url.err());
                return ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                };
            }
        };
        let base_url = base_url.unwrap_or_else(|| api::DEFAULT_BASE_URL.to_string());

        let Some(api_key) = api_key else {
            diagnostics.push(
                Diagnostic::error(
                    "Missing API key",
                    "api_key is required (set in provider config or FASTLY_API_KEY env var)",
                )
                .with_attribute(AttributePath::new("api_key")),
            );
            return ConfigureProviderResponse {
                diagnostics,
                provider_data: None,
            };
        };

        tracing::debug!("Configuring Fastly provider for {}", base_url);
        match api::Client::new(&base_url, &api_key) {
            Ok(client) => {
                let provider_data = FastlyProviderData::new(client);
                self.provider_data = Some(provider_data.clone());
                ConfigureProviderResponse {
                    diagnostics,
                    provider_data: Some(Arc::new(provider_data)),
                }
            }
            Err(e) => {
                diagnostics.push(
                    Diagnostic::error("Failed to create API client", e.to_string())
                        .with_attribute(AttributePath::new("base_url")),
                );
                ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                }
            }
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        ValidateProviderConfigResponse {
            diagnostics: tfplug::validate_config(&Self::schema_static(), &request.config),
        }
    }

    async fn stop(&self, _ctx: Context, _request: StopProviderRequest) -> StopProviderResponse {
        StopProviderResponse { error: None }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();
        factories.insert(
            "fastly_alert".to_string(),
            Box::new(|| {
                Box::new(resources::AlertResource::new()) as Box<dyn ResourceWithConfigure>
            }),
        );
        factories.insert(
            "fastly_ngwaf_alert_datadog_integration".to_string(),
            Box::new(|| {
                Box::new(resources::NgwafAlertDatadogIntegrationResource::new())
                    as Box<dyn ResourceWithConfigure>
            }),
        );
        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut factories: HashMap<String, DataSourceFactory> = HashMap::new();
        factories.insert(
            "fastly_tls_certificate".to_string(),
            Box::new(|| {
                Box::new(data_sources::TlsCertificateDataSource::new())
                    as Box<dyn DataSourceWithConfigure>
            }),
        );
        factories.insert(
            "fastly_tls_configuration".to_string(),
            Box::new(|| {
                Box::new(data_sources::TlsConfigurationDataSource::new())
                    as Box<dyn DataSourceWithConfigure>
            }),
        );
        factories
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tfplug::types::{ClientCapabilities, Dynamic, DynamicValue};
    use tfplug::{DataSource, Resource};

    fn configure_request(values: Vec<(&str, &str)>) -> ConfigureProviderRequest {
        ConfigureProviderRequest {
            terraform_version: "1.9.0".to_string(),
            config: DynamicValue::new(Dynamic::Map(
                values
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), Dynamic::from(v)))
                    .collect(),
            )),
            client_capabilities: ClientCapabilities::default(),
        }
    }

    #[tokio::test]
    #[serial]
    async fn provider_configures_from_env_vars() {
        std::env::set_var(API_KEY_ENV, "env-key");
        std::env::set_var(BASE_URL_ENV, "https://api.example.test");

        let mut provider = FastlyProvider::new();
        let response = provider
            .configure(Context::new(), configure_request(vec![]))
            .await;

        assert!(response.diagnostics.is_empty());
        assert!(response.provider_data.is_some());
        let data = provider.provider_data.as_ref().unwrap();
        assert_eq!(data.client.base_url(), "https://api.example.test");

        std::env::remove_var(API_KEY_ENV);
        std::env::remove_var(BASE_URL_ENV);
    }

    #[tokio::test]
    #[serial]
    async fn provider_config_overrides_env_and_defaults_base_url() {
        std::env::set_var(API_KEY_ENV, "env-key");
        std::env::remove_var(BASE_URL_ENV);

        let mut provider = FastlyProvider::new();
        let response = provider
            .configure(Context::new(), configure_request(vec![("api_key", "config-key")]))
            .await;

        assert!(response.diagnostics.is_empty());
        let data = provider.provider_data.as_ref().unwrap();
        assert_eq!(data.client.base_url(), api::DEFAULT_BASE_URL);

        std::env::remove_var(API_KEY_ENV);
    }

    #[tokio::test]
    #[serial]
    async fn provider_configure_requires_api_key() {
        std::env::remove_var(API_KEY_ENV);

        let mut provider = FastlyProvider::new();
        let response = provider
            .configure(Context::new(), configure_request(vec![]))
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].detail.contains("api_key is required"));
        assert!(response.provider_data.is_none());
        assert!(provider.provider_data.is_none());
    }

    #[tokio::test]
    #[serial]
    async fn provider_configure_rejects_wrongly_typed_settings() {
        std::env::set_var(API_KEY_ENV, "env-key");

        let mut provider = FastlyProvider::new();
        let request = ConfigureProviderRequest {
            terraform_version: "1.9.0".to_string(),
            config: DynamicValue::new(Dynamic::Map(HashMap::from([
                ("api_key".to_string(), Dynamic::Number(42.0)),
                ("base_url".to_string(), Dynamic::Bool(true)),
            ]))),
            client_capabilities: ClientCapabilities::default(),
        };
        let response = provider.configure(Context::new(), request).await;

        let summaries: Vec<_> = response.diagnostics.iter().map(|d| d.summary.as_str()).collect();
        assert_eq!(summaries, vec!["Invalid configuration", "Invalid configuration"]);
        assert_eq!(
            response.diagnostics[0].attribute,
            Some(AttributePath::new("api_key"))
        );
        assert!(response.provider_data.is_none());

        std::env::remove_var(API_KEY_ENV);
    }

    #[test]
    fn provider_registers_resources_and_data_sources() {
        let provider = FastlyProvider::new();

        let resources = provider.resources();
        for name in ["fastly_alert", "fastly_ngwaf_alert_datadog_integration"] {
            let factory = resources.get(name).unwrap();
            assert_eq!(factory().type_name(), name);
        }

        let data_sources = provider.data_sources();
        for name in ["fastly_tls_certificate", "fastly_tls_configuration"] {
            let factory = data_sources.get(name).unwrap();
            assert_eq!(factory().type_name(), name);
        }
    }

    #[test]
    fn metadata_reports_provider_type_name() {
        let provider = FastlyProvider::new();
        let response =
            tokio_test::block_on(provider.metadata(Context::new(), ProviderMetadataRequest));
        assert_eq!(response.type_name, "fastly");
    }

    #[test]
    fn api_key_is_sensitive() {
        let schema = FastlyProvider::schema_static();
        let api_key = schema.attribute("api_key").unwrap();
        assert!(api_key.sensitive);
        assert!(!api_key.required);
    }
}
