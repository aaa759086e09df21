//! Client-side filter predicates
//!
//! A filter is a partially populated set of criteria. Every populated field
//! must match (logical AND); a field left as `None` does not constrain the
//! result, so an empty filter matches everything.

use std::fmt;

use crate::api::tls::{TlsCertificate, TlsConfiguration};

pub trait Criteria<T> {
    fn matches(&self, entity: &T) -> bool;
}

/// Every requested value appears in `set`
pub fn contains_subset(set: &[String], requested: &[String]) -> bool {
    requested.iter().all(|r| set.contains(r))
}

/// At least one of `values` is among `requested`
pub fn intersects<'a>(mut values: impl Iterator<Item = &'a str>, requested: &[String]) -> bool {
    values.any(|v| requested.iter().any(|r| r == v))
}

fn eq_if_set(wanted: &Option<String>, actual: &str) -> bool {
    wanted.as_deref().map_or(true, |w| w == actual)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TlsCertificateFilter {
    pub name: Option<String>,
    pub issued_to: Option<String>,
    pub issuer: Option<String>,
    /// Matches when any of the certificate's domains is listed
    pub domains: Option<Vec<String>>,
}

impl Criteria<TlsCertificate> for TlsCertificateFilter {
    fn matches(&self, cert: &TlsCertificate) -> bool {
        eq_if_set(&self.name, &cert.name)
            && eq_if_set(&self.issued_to, &cert.issued_to)
            && eq_if_set(&self.issuer, &cert.issuer)
            && self.domains.as_ref().map_or(true, |wanted| {
                intersects(cert.domains.iter().map(|d| d.id.as_str()), wanted)
            })
    }
}

/// Who manages a TLS configuration: Fastly (bulk platform) or the customer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsService {
    Platform,
    Custom,
}

impl TlsService {
    pub const PLATFORM: &'static str = "PLATFORM";
    pub const CUSTOM: &'static str = "CUSTOM";

    pub fn from_bulk(bulk: bool) -> Self {
        if bulk {
            TlsService::Platform
        } else {
            TlsService::Custom
        }
    }

    /// Anything other than PLATFORM selects customer-managed configurations
    pub fn parse(value: &str) -> Self {
        if value == Self::PLATFORM {
            TlsService::Platform
        } else {
            TlsService::Custom
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TlsService::Platform => Self::PLATFORM,
            TlsService::Custom => Self::CUSTOM,
        }
    }
}

impl fmt::Display for TlsService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TlsConfigurationFilter {
    pub name: Option<String>,
    pub tls_protocols: Option<Vec<String>>,
    pub http_protocols: Option<Vec<String>>,
    pub tls_service: Option<TlsService>,
    /// Plain boolean equality: a configured `false` keeps only non-default
    /// configurations, where the Go provider ignored `false` and only
    /// filtered on `true`.
    pub default: Option<bool>,
}

impl Criteria<TlsConfiguration> for TlsConfigurationFilter {
    fn matches(&self, conf: &TlsConfiguration) -> bool {
        eq_if_set(&self.name, &conf.name)
            && self
                .tls_protocols
                .as_ref()
                .map_or(true, |wanted| contains_subset(&conf.tls_protocols, wanted))
            && self
                .http_protocols
                .as_ref()
                .map_or(true, |wanted| contains_subset(&conf.http_protocols, wanted))
            && self
                .tls_service
                .map_or(true, |service| service == TlsService::from_bulk(conf.bulk))
            && self.default.map_or(true, |wanted| wanted == conf.default)
    }
}
