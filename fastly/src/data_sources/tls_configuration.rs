//! TLS configuration data source

use async_trait::async_trait;
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use super::{config_diagnostic, config_string, config_strings, lookup_diagnostic, rfc3339};
use crate::api::tls::{DnsRecord, TlsConfiguration};
use crate::api::Client;
use crate::lookup::{
    list_all, resolve_single, TlsConfigurationFilter, TlsConfigurationPages, TlsService,
};

#[derive(Default)]
pub struct TlsConfigurationDataSource {
    provider_data: Option<crate::FastlyProviderData>,
}

impl TlsConfigurationDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        let string_set = || AttributeType::Set(Box::new(AttributeType::String));
        let dns_record = AttributeType::Object(HashMap::from([
            ("record_type".to_string(), AttributeType::String),
            ("record_value".to_string(), AttributeType::String),
            ("region".to_string(), AttributeType::String),
        ]));

        SchemaBuilder::new()
            .version(0)
            .description("Looks up a TLS configuration by ID or by matching attributes")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("ID of the TLS configuration obtained from the Fastly API or another data source. Conflicts with all the other filters.")
                    .optional()
                    .computed()
                    .conflicts_with(&["name", "tls_protocols", "http_protocols", "tls_service", "default"])
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Custom name of the TLS configuration")
                    .optional()
                    .computed()
                    .conflicts_with(&["id"])
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tls_protocols", string_set())
                    .description("TLS protocols available on the TLS configuration")
                    .optional()
                    .computed()
                    .conflicts_with(&["id"])
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("http_protocols", string_set())
                    .description("HTTP protocols available on the TLS configuration")
                    .optional()
                    .computed()
                    .conflicts_with(&["id"])
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tls_service", AttributeType::String)
                    .description("Whether the configuration should support the `PLATFORM` or `CUSTOM` TLS service")
                    .optional()
                    .computed()
                    .conflicts_with(&["id"])
                    .validator(crate::validators::tls_service())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("default", AttributeType::Bool)
                    .description("Signifies whether Fastly will use this configuration as a default when creating a new TLS activation")
                    .optional()
                    .computed()
                    .conflicts_with(&["id"])
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("dns_records", AttributeType::Set(Box::new(dns_record)))
                    .description("The available DNS addresses that can be used to enable TLS for a domain")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("created_at", AttributeType::String)
                    .description("Timestamp (GMT) when the configuration was created")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("updated_at", AttributeType::String)
                    .description("Timestamp (GMT) when the configuration was last updated")
                    .computed()
                    .build(),
            )
            .build()
    }

    async fn find_configuration(
        &self,
        ctx: &Context,
        client: &Client,
        config: &DynamicValue,
    ) -> Result<TlsConfiguration, Diagnostic> {
        if let Some(id) = config_string(config, "id").map_err(config_diagnostic)? {
            tracing::debug!("Reading TLS configuration {}", id);
            return client.tls().get_configuration(&id).await.map_err(|e| {
                Diagnostic::error(
                    "Failed to read TLS configuration",
                    format!("API error: {}", e),
                )
            });
        }

        let filter = configuration_filter(config).map_err(config_diagnostic)?;
        tracing::debug!("Searching TLS configurations with {:?}", filter);

        let matches = list_all(ctx, &TlsConfigurationPages::new(client), &filter)
            .await
            .map_err(|e| lookup_diagnostic("TLS configurations", e))?;
        resolve_single(matches).map_err(|e| lookup_diagnostic("TLS configurations", e))
    }
}

pub fn configuration_filter(config: &DynamicValue) -> tfplug::Result<TlsConfigurationFilter> {
    Ok(TlsConfigurationFilter {
        name: config_string(config, "name")?,
        tls_protocols: config_strings(config, "tls_protocols")?,
        http_protocols: config_strings(config, "http_protocols")?,
        tls_service: config_string(config, "tls_service")?.map(|s| TlsService::parse(&s)),
        default: config.get_optional_bool(&AttributePath::new("default"))?,
    })
}

fn dns_record_state(record: &DnsRecord) -> Dynamic {
    Dynamic::Map(HashMap::from([
        ("record_type".to_string(), Dynamic::from(record.record_type.as_str())),
        ("record_value".to_string(), Dynamic::from(record.id.as_str())),
        ("region".to_string(), Dynamic::from(record.region.as_str())),
    ]))
}

/// Flatten a configuration into data source state
pub fn configuration_state(conf: &TlsConfiguration) -> tfplug::Result<DynamicValue> {
    let mut state = DynamicValue::object();
    state.set_string(&AttributePath::new("id"), conf.id.clone())?;
    state.set_string(&AttributePath::new("name"), conf.name.clone())?;
    state.set(
        &AttributePath::new("tls_protocols"),
        Dynamic::string_list(conf.tls_protocols.iter().cloned()),
    )?;
    state.set(
        &AttributePath::new("http_protocols"),
        Dynamic::string_list(conf.http_protocols.iter().cloned()),
    )?;
    state.set_string(
        &AttributePath::new("tls_service"),
        TlsService::from_bulk(conf.bulk).to_string(),
    )?;
    state.set_bool(&AttributePath::new("default"), conf.default)?;
    state.set(
        &AttributePath::new("created_at"),
        rfc3339(conf.created_at.as_ref()),
    )?;
    state.set(
        &AttributePath::new("updated_at"),
        rfc3339(conf.updated_at.as_ref()),
    )?;
    state.set_list(
        &AttributePath::new("dns_records"),
        conf.dns_records.iter().map(dns_record_state).collect(),
    )?;
    Ok(state)
}

#[async_trait]
impl DataSource for TlsConfigurationDataSource {
    fn type_name(&self) -> &str {
        "fastly_tls_configuration"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: tfplug::validate_config(&Self::schema_static(), &request.config),
        }
    }

    async fn read(&self, ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(Diagnostic::error(
                "Provider not configured",
                "Provider data was not properly configured",
            ));
            return ReadDataSourceResponse {
                state: DynamicValue::null(),
                diagnostics,
                deferred: None,
            };
        };

        let state = match self
            .find_configuration(&ctx, &provider_data.client, &request.config)
            .await
        {
            Ok(configuration) => configuration_state(&configuration).map_err(|e| {
                Diagnostic::error("Failed to set TLS configuration state", e.to_string())
            }),
            Err(diag) => Err(diag),
        };

        match state {
            Ok(state) => ReadDataSourceResponse {
                state,
                diagnostics,
                deferred: None,
            },
            Err(diag) => {
                diagnostics.push(diag);
                ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                    deferred: None,
                }
            }
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for TlsConfigurationDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = vec![];

        match crate::FastlyProviderData::from_configure(request.provider_data, "data source") {
            Ok(provider_data) => self.provider_data = Some(provider_data),
            Err(diag) => diagnostics.push(diag),
        }

        ConfigureDataSourceResponse { diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(values: Vec<(&str, Dynamic)>) -> DynamicValue {
        DynamicValue::new(Dynamic::Map(
            values
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        ))
    }

    #[test]
    fn filter_keeps_explicit_false_default() {
        let filter = configuration_filter(&config(vec![
            ("default", Dynamic::Bool(false)),
            ("tls_service", Dynamic::from("PLATFORM")),
            ("http_protocols", Dynamic::string_list(["http/2"])),
        ]))
        .unwrap();

        assert_eq!(
            filter,
            TlsConfigurationFilter {
                http_protocols: Some(vec!["http/2".into()]),
                tls_service: Some(TlsService::Platform),
                default: Some(false),
                ..Default::default()
            }
        );
    }

    #[test]
    fn state_maps_bulk_and_dns_records() {
        let conf = TlsConfiguration {
            id: "conf-1".into(),
            name: "Standard TLS".into(),
            tls_protocols: vec!["1.2".into()],
            http_protocols: vec!["http/1.1".into()],
            default: true,
            bulk: false,
            created_at: None,
            updated_at: None,
            dns_records: vec![DnsRecord {
                id: "151.101.2.132".into(),
                record_type: "A".into(),
                region: "global".into(),
            }],
        };
        let state = configuration_state(&conf).unwrap();

        assert_eq!(
            state.get_string(&AttributePath::new("tls_service")).unwrap(),
            "CUSTOM"
        );
        let record = AttributePath::new("dns_records").index(0);
        assert_eq!(
            state
                .get_string(&record.clone().attribute("record_value"))
                .unwrap(),
            "151.101.2.132"
        );
        assert_eq!(
            state.get_string(&record.attribute("record_type")).unwrap(),
            "A"
        );
    }

    #[tokio::test]
    async fn validate_rejects_unknown_tls_service() {
        let ds = TlsConfigurationDataSource::new();
        let response = ds
            .validate(
                Context::new(),
                ValidateDataSourceConfigRequest {
                    type_name: "fastly_tls_configuration".into(),
                    config: config(vec![("tls_service", Dynamic::from("platform"))]),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(
            response.diagnostics[0].summary,
            "expected tls_service to be one of [\"PLATFORM\" \"CUSTOM\"], got platform"
        );
    }
}
