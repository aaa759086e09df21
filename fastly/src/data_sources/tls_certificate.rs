//! TLS certificate data source

use async_trait::async_trait;
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
use crate::api::tls::TlsCertificate;
use crate::api::Client;
use crate::lookup::{list_all, resolve_single, TlsCertificateFilter, TlsCertificatePages};

#[derive(Default)]
pub struct TlsCertificateDataSource {
    provider_data: Option<crate::FastlyProviderData>,
}

impl TlsCertificateDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Looks up a custom TLS certificate by ID or by matching attributes")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Unique ID assigned to certificate by Fastly. Conflicts with all the other filters.")
                    .optional()
                    .computed()
                    .conflicts_with(&["name", "issued_to", "domains", "issuer"])
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Human-readable name used to identify the certificate")
                    .optional()
                    .computed()
                    .conflicts_with(&["id"])
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("issued_to", AttributeType::String)
                    .description("The hostname for which a certificate was issued")
                    .optional()
                    .computed()
                    .conflicts_with(&["id"])
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("issuer", AttributeType::String)
                    .description("The certificate authority that issued the certificate")
                    .optional()
                    .computed()
                    .conflicts_with(&["id"])
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "domains",
                    AttributeType::Set(Box::new(AttributeType::String)),
                )
                .description("Domains that are listed in any certificate's Subject Alternative Names (SAN) list")
                .optional()
                .computed()
                .conflicts_with(&["id"])
                .build(),
            )
            .attribute(
                AttributeBuilder::new("created_at", AttributeType::String)
                    .description("Timestamp (GMT) when the certificate was created")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("updated_at", AttributeType::String)
                    .description("Timestamp (GMT) when the certificate was last updated")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("replace", AttributeType::Bool)
                    .description("A recommendation from Fastly indicating the key associated with this certificate is in need of rotation")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("serial_number", AttributeType::String)
                    .description("A value assigned by the issuer that is unique to a certificate")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("signature_algorithm", AttributeType::String)
                    .description("The algorithm used to sign the certificate")
                    .computed()
                    .build(),
            )
            .build()
    }

    async fn find_certificate(
        &self,
        ctx: &Context,
        client: &Client,
        config: &DynamicValue,
    ) -> Result<TlsCertificate, Diagnostic> {
        if let Some(id) = config_string(config, "id").map_err(config_diagnostic)? {
            tracing::debug!("Reading TLS certificate {}", id);
            return client.tls().get_certificate(&id).await.map_err(|e| {
                Diagnostic::error("Failed to read TLS certificate", format!("API error: {}", e))
            });
        }

        let filter = certificate_filter(config).map_err(config_diagnostic)?;
        tracing::debug!("Searching TLS certificates with {:?}", filter);

        let matches = list_all(ctx, &TlsCertificatePages::new(client), &filter)
            .await
            .map_err(|e| lookup_diagnostic("TLS certificates", e))?;
        resolve_single(matches).map_err(|e| lookup_diagnostic("TLS certificates", e))
    }
}

/// Filter criteria from the configured lookup arguments
pub fn certificate_filter(config: &DynamicValue) -> tfplug::Result<TlsCertificateFilter> {
    Ok(TlsCertificateFilter {
        name: config_string(config, "name")?,
        issued_to: config_string(config, "issued_to")?,
        issuer: config_string(config, "issuer")?,
        domains: config_strings(config, "domains")?,
    })
}

/// Flatten a certificate into data source state
pub fn certificate_state(cert: &TlsCertificate) -> tfplug::Result<DynamicValue> {
    let mut state = DynamicValue::object();
    state.set_string(&AttributePath::new("id"), cert.id.clone())?;
    state.set_string(&AttributePath::new("name"), cert.name.clone())?;
    state.set_string(&AttributePath::new("issued_to"), cert.issued_to.clone())?;
    state.set_string(&AttributePath::new("issuer"), cert.issuer.clone())?;
    state.set(
        &AttributePath::new("domains"),
        Dynamic::string_list(cert.domains.iter().map(|d| d.id.as_str())),
    )?;
    state.set(
        &AttributePath::new("created_at"),
        rfc3339(cert.created_at.as_ref()),
    )?;
    state.set(
        &AttributePath::new("updated_at"),
        rfc3339(cert.updated_at.as_ref()),
    )?;
    state.set_bool(&AttributePath::new("replace"), cert.replace)?;
    state.set_string(
        &AttributePath::new("serial_number"),
        cert.serial_number.clone(),
    )?;
    state.set_string(
        &AttributePath::new("signature_algorithm"),
        cert.signature_algorithm.clone(),
    )?;
    Ok(state)
}

fn replacement_warning(cert: &TlsCertificate) -> Option<Diagnostic> {
    cert.replace.then(|| {
        Diagnostic::warning(
            format!(
                "Fastly recommends that this certificate ({}) be replaced",
                cert.id
            ),
            "",
        )
    })
}

#[async_trait]
impl DataSource for TlsCertificateDataSource {
    fn type_name(&self) -> &str {
        "fastly_tls_certificate"
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

        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                diagnostics.push(Diagnostic::error(
                    "Provider not configured",
                    "Provider data was not properly configured",
                ));
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                    deferred: None,
                };
            }
        };

        let certificate = match self
            .find_certificate(&ctx, &provider_data.client, &request.config)
            .await
        {
            Ok(certificate) => certificate,
            Err(diag) => {
                diagnostics.push(diag);
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                    deferred: None,
                };
            }
        };

        diagnostics.extend(replacement_warning(&certificate));

        match certificate_state(&certificate) {
            Ok(state) => ReadDataSourceResponse {
                state,
                diagnostics,
                deferred: None,
            },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to set TLS certificate state",
                    e.to_string(),
                ));
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
impl DataSourceWithConfigure for TlsCertificateDataSource {
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
    use crate::api::tls::TlsDomain;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use tfplug::types::DiagnosticSeverity;

    fn config(values: Vec<(&str, Dynamic)>) -> DynamicValue {
        DynamicValue::new(Dynamic::Map(
            values
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<HashMap<_, _>>(),
        ))
    }

    fn certificate(replace: bool) -> TlsCertificate {
        TlsCertificate {
            id: "cert-1".into(),
            name: "www".into(),
            issued_to: "www.example.com".into(),
            issuer: "Let's Encrypt".into(),
            serial_number: "0a1b".into(),
            signature_algorithm: "SHA256-RSA".into(),
            replace,
            created_at: Some(chrono::Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap()),
            updated_at: None,
            domains: vec![
                TlsDomain {
                    id: "www.example.com".into(),
                },
                TlsDomain {
                    id: "example.com".into(),
                },
            ],
        }
    }

    #[tokio::test]
    async fn validate_rejects_id_with_filters() {
        let ds = TlsCertificateDataSource::new();
        let response = ds
            .validate(
                Context::new(),
                ValidateDataSourceConfigRequest {
                    type_name: "fastly_tls_certificate".into(),
                    config: config(vec![
                        ("id", Dynamic::from("cert-1")),
                        ("issuer", Dynamic::from("DigiCert")),
                    ]),
                },
            )
            .await;

        // reported from both sides of the conflict
        assert_eq!(response.diagnostics.len(), 2);
        assert!(response
            .diagnostics
            .iter()
            .all(|d| d.summary == "Conflicting configuration arguments"));
    }

    #[tokio::test]
    async fn validate_accepts_filters_alone() {
        let ds = TlsCertificateDataSource::new();
        let response = ds
            .validate(
                Context::new(),
                ValidateDataSourceConfigRequest {
                    type_name: "fastly_tls_certificate".into(),
                    config: config(vec![
                        ("name", Dynamic::from("www")),
                        ("domains", Dynamic::string_list(["example.com"])),
                    ]),
                },
            )
            .await;
        assert!(response.diagnostics.is_empty());
    }

    #[test]
    fn filter_reads_populated_arguments() {
        let filter = certificate_filter(&config(vec![
            ("issuer", Dynamic::from("DigiCert")),
            ("name", Dynamic::Null),
            ("domains", Dynamic::string_list(["a.example.com"])),
        ]))
        .unwrap();

        assert_eq!(
            filter,
            TlsCertificateFilter {
                issuer: Some("DigiCert".into()),
                domains: Some(vec!["a.example.com".into()]),
                ..Default::default()
            }
        );
    }

    #[test]
    fn state_flattens_domains_and_timestamps() {
        let state = certificate_state(&certificate(false)).unwrap();

        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "cert-1");
        assert_eq!(
            state
                .get_optional_string_list(&AttributePath::new("domains"))
                .unwrap()
                .unwrap(),
            vec!["www.example.com", "example.com"]
        );
        assert_eq!(
            state.get_string(&AttributePath::new("created_at")).unwrap(),
            "2021-03-04T05:06:07Z"
        );
        assert!(state
            .get_optional_string(&AttributePath::new("updated_at"))
            .unwrap()
            .is_none());
        assert!(!state.get_bool(&AttributePath::new("replace")).unwrap());
    }

    #[test]
    fn replace_flag_produces_warning() {
        assert!(replacement_warning(&certificate(false)).is_none());

        let warning = replacement_warning(&certificate(true)).unwrap();
        assert_eq!(warning.severity, DiagnosticSeverity::Warning);
        assert_eq!(
            warning.summary,
            "Fastly recommends that this certificate (cert-1) be replaced"
        );
    }

    #[tokio::test]
    async fn read_requires_configuration() {
        let ds = TlsCertificateDataSource::new();
        let response = ds
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "fastly_tls_certificate".into(),
                    config: config(vec![("id", Dynamic::from("cert-1"))]),
                    provider_meta: None,
                    client_capabilities: Default::default(),
                },
            )
            .await;
        assert_eq!(response.diagnostics[0].summary, "Provider not configured");
        assert!(response.state.is_null());
    }
}
