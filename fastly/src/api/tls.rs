//! TLS certificates and TLS configurations (JSON:API endpoints)

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::common::{null_as_default, Document, IncludedResource, PageRequest, RelationshipList};
use super::error::ApiError;
use crate::api::Client;

/// Page size used when listing certificates
pub const CERTIFICATE_PAGE_SIZE: u32 = 10;

const DNS_RECORD_TYPE: &str = "dns_record";

/// Domain covered by a certificate; its id is the domain name
#[derive(Debug, Clone, PartialEq)]
pub struct TlsDomain {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TlsCertificate {
    pub id: String,
    pub name: String,
    pub issued_to: String,
    pub issuer: String,
    pub serial_number: String,
    pub signature_algorithm: String,
    pub replace: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub domains: Vec<TlsDomain>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DnsRecord {
    /// The record value (an IP address or hostname)
    pub id: String,
    pub record_type: String,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TlsConfiguration {
    pub id: String,
    pub name: String,
    pub tls_protocols: Vec<String>,
    pub http_protocols: Vec<String>,
    pub default: bool,
    /// Set for Fastly-managed platform configurations
    pub bulk: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub dns_records: Vec<DnsRecord>,
}

#[derive(Debug, Deserialize)]
struct CertificateResource {
    id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    attributes: CertificateAttributes,
    #[serde(default, deserialize_with = "null_as_default")]
    relationships: CertificateRelationships,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CertificateAttributes {
    #[serde(deserialize_with = "null_as_default")]
    name: String,
    #[serde(deserialize_with = "null_as_default")]
    issued_to: String,
    #[serde(deserialize_with = "null_as_default")]
    issuer: String,
    #[serde(deserialize_with = "null_as_default")]
    serial_number: String,
    #[serde(deserialize_with = "null_as_default")]
    signature_algorithm: String,
    #[serde(deserialize_with = "null_as_default")]
    replace: bool,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CertificateRelationships {
    #[serde(deserialize_with = "null_as_default")]
    tls_domains: RelationshipList,
}

impl From<CertificateResource> for TlsCertificate {
    fn from(res: CertificateResource) -> Self {
        let a = res.attributes;
        Self {
            id: res.id,
            name: a.name,
            issued_to: a.issued_to,
            issuer: a.issuer,
            serial_number: a.serial_number,
            signature_algorithm: a.signature_algorithm,
            replace: a.replace,
            created_at: a.created_at,
            updated_at: a.updated_at,
            domains: res
                .relationships
                .tls_domains
                .data
                .into_iter()
                .map(|d| TlsDomain { id: d.id })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigurationResource {
    id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    attributes: ConfigurationAttributes,
    #[serde(default, deserialize_with = "null_as_default")]
    relationships: ConfigurationRelationships,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigurationAttributes {
    #[serde(deserialize_with = "null_as_default")]
    name: String,
    #[serde(deserialize_with = "null_as_default")]
    tls_protocols: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    http_protocols: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    default: bool,
    #[serde(deserialize_with = "null_as_default")]
    bulk: bool,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigurationRelationships {
    #[serde(deserialize_with = "null_as_default")]
    dns_records: RelationshipList,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DnsRecordAttributes {
    #[serde(deserialize_with = "null_as_default")]
    record_type: String,
    #[serde(deserialize_with = "null_as_default")]
    region: String,
}

impl ConfigurationResource {
    /// Resolve the dns_records linkage against the side-loaded `included` array
    fn into_configuration(self, included: &[IncludedResource]) -> TlsConfiguration {
        let dns_records = self
            .relationships
            .dns_records
            .data
            .into_iter()
            .map(|link| {
                let attrs = included
                    .iter()
                    .find(|inc| inc.kind == DNS_RECORD_TYPE && inc.id == link.id)
                    .and_then(|inc| {
                        serde_json::from_value::<DnsRecordAttributes>(inc.attributes.clone()).ok()
                    })
                    .unwrap_or_default();
                DnsRecord {
                    id: link.id,
                    record_type: attrs.record_type,
                    region: attrs.region,
                }
            })
            .collect();

        let a = self.attributes;
        TlsConfiguration {
            id: self.id,
            name: a.name,
            tls_protocols: a.tls_protocols,
            http_protocols: a.http_protocols,
            default: a.default,
            bulk: a.bulk,
            created_at: a.created_at,
            updated_at: a.updated_at,
            dns_records,
        }
    }
}

pub struct TlsApi<'a> {
    client: &'a Client,
}

impl<'a> TlsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /tls/certificates
    pub async fn list_certificates(&self, page: PageRequest) -> Result<Vec<TlsCertificate>, ApiError> {
        let doc: Document<Vec<CertificateResource>> = self
            .client
            .get_with_params("/tls/certificates", &page.to_query_params())
            .await?;
        Ok(doc.data.into_iter().map(TlsCertificate::from).collect())
    }

    /// GET /tls/certificates/{id}
    pub async fn get_certificate(&self, id: &str) -> Result<TlsCertificate, ApiError> {
        let path = format!("/tls/certificates/{}", urlencoding::encode(id));
        let doc: Document<CertificateResource> = self.client.get(&path).await?;
        Ok(doc.data.into())
    }

    /// GET /tls/configurations, always side-loading dns_records
    pub async fn list_configurations(
        &self,
        page: PageRequest,
    ) -> Result<Vec<TlsConfiguration>, ApiError> {
        let params = page.to_query_params().add("include", "dns_records");
        let doc: Document<Vec<ConfigurationResource>> = self
            .client
            .get_with_params("/tls/configurations", &params)
            .await?;
        let included = doc.included;
        Ok(doc
            .data
            .into_iter()
            .map(|res| res.into_configuration(&included))
            .collect())
    }

    /// GET /tls/configurations/{id}
    pub async fn get_configuration(&self, id: &str) -> Result<TlsConfiguration, ApiError> {
        let path = format!("/tls/configurations/{}", urlencoding::encode(id));
        let params = super::common::ApiQueryParams::new().add("include", "dns_records");
        let doc: Document<ConfigurationResource> =
            self.client.get_with_params(&path, &params).await?;
        Ok(doc.data.into_configuration(&doc.included))
    }
}
