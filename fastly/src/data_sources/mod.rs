//! Data source implementations

pub mod tls_certificate;
pub mod tls_configuration;

pub use tls_certificate::TlsCertificateDataSource;
pub use tls_configuration::TlsConfigurationDataSource;

use chrono::{DateTime, SecondsFormat, Utc};
use tfplug::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use crate::lookup::LookupError;

/// RFC3339 at seconds precision, e.g. `2006-01-02T15:04:05Z`
pub(crate) fn rfc3339(ts: Option<&DateTime<Utc>>) -> Dynamic {
    match ts {
        Some(ts) => Dynamic::String(ts.to_rfc3339_opts(SecondsFormat::Secs, true)),
        None => Dynamic::Null,
    }
}

/// Optional string argument; an empty string does not count as set
pub(crate) fn config_string(config: &DynamicValue, name: &str) -> tfplug::Result<Option<String>> {
    Ok(config
        .get_optional_string(&AttributePath::new(name))?
        .filter(|s| !s.is_empty()))
}

/// Optional set of strings; an empty set does not count as set
pub(crate) fn config_strings(
    config: &DynamicValue,
    name: &str,
) -> tfplug::Result<Option<Vec<String>>> {
    Ok(config
        .get_optional_string_list(&AttributePath::new(name))?
        .filter(|items| !items.is_empty()))
}

pub(crate) fn config_diagnostic(err: tfplug::TfplugError) -> Diagnostic {
    Diagnostic::error("Invalid configuration", err.to_string())
}

/// Empty and ambiguous queries are reported verbatim; remote failures get context
pub(crate) fn lookup_diagnostic(kind: &str, err: LookupError) -> Diagnostic {
    match err {
        LookupError::EmptyQuery | LookupError::AmbiguousQuery { .. } => {
            Diagnostic::error(err.to_string(), "")
        }
        LookupError::Remote(e) => Diagnostic::error(
            format!("Failed to list {}", kind),
            format!("API error: {}", e),
        ),
        LookupError::Interrupted(e) => {
            Diagnostic::error(format!("Listing {} was interrupted", kind), e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    #[test]
    fn rfc3339_truncates_to_seconds() {
        let ts = Utc
            .with_ymd_and_hms(2020, 6, 1, 10, 11, 12)
            .unwrap()
            .checked_add_signed(chrono::Duration::milliseconds(345))
            .unwrap();
        assert_eq!(
            rfc3339(Some(&ts)),
            Dynamic::String("2020-06-01T10:11:12Z".to_string())
        );
        assert_eq!(rfc3339(None), Dynamic::Null);
    }

    #[test]
    fn empty_arguments_read_as_unset() {
        let mut values = HashMap::new();
        values.insert("name".to_string(), Dynamic::from(""));
        values.insert("domains".to_string(), Dynamic::List(vec![]));
        values.insert("issuer".to_string(), Dynamic::from("DigiCert"));
        let config = DynamicValue::new(Dynamic::Map(values));

        assert_eq!(config_string(&config, "name").unwrap(), None);
        assert_eq!(config_string(&config, "id").unwrap(), None);
        assert_eq!(
            config_string(&config, "issuer").unwrap().as_deref(),
            Some("DigiCert")
        );
        assert_eq!(config_strings(&config, "domains").unwrap(), None);
    }

    #[test]
    fn lookup_diagnostic_keeps_query_messages() {
        let diag = lookup_diagnostic("TLS certificates", LookupError::EmptyQuery);
        assert_eq!(
            diag.summary,
            "your query returned no results. Please change your search criteria and try again."
        );

        let diag = lookup_diagnostic(
            "TLS certificates",
            LookupError::Remote(crate::api::ApiError::AuthError),
        );
        assert_eq!(diag.summary, "Failed to list TLS certificates");
        assert_eq!(diag.detail, "API error: Authentication failed");
    }
}
