//! Fastly attribute validators
//!
//! Thin constructors over the generic validators in `tfplug::validator`,
//! named after the Fastly attribute they guard.

pub mod pem;

pub use pem::{PemBlock, PemBlocks};

use tfplug::schema::{Validator, ValidatorRequest, ValidatorResponse};
use tfplug::types::AttributePathStep;
use tfplug::validator::{
    violation, IntBetween, IntInSlice, MapMaxItems, StringInSlice, StringLenBetween,
};

/// Largest number of items Fastly accepts in an edge dictionary
pub const MAXIMUM_DICTIONARY_SIZE: usize = 10_000;

pub fn logging_format_version() -> Box<dyn Validator> {
    IntBetween::create(1, 2)
}

pub fn logging_message_type() -> Box<dyn Validator> {
    StringInSlice::create(&["classic", "loggly", "logplex", "blank"])
}

pub fn logging_compression_codec() -> Box<dyn Validator> {
    StringInSlice::create(&["zstd", "snappy", "gzip"])
}

pub fn logging_placement() -> Box<dyn Validator> {
    StringInSlice::create(&["none"])
}

pub fn logging_server_side_encryption() -> Box<dyn Validator> {
    StringInSlice::create(&["AES256", "aws:kms"])
}

pub fn director_quorum() -> Box<dyn Validator> {
    IntBetween::create(0, 100)
}

/// 1 = random, 3 = hash, 4 = client
pub fn director_type() -> Box<dyn Validator> {
    IntInSlice::create(&[1, 3, 4])
}

pub fn condition_type() -> Box<dyn Validator> {
    StringInSlice::create(&["REQUEST", "RESPONSE", "CACHE", "PREFETCH"])
}

pub fn header_action() -> Box<dyn Validator> {
    StringInSlice::create(&["set", "append", "delete", "regex", "regex_repeat"])
}

pub fn header_type() -> Box<dyn Validator> {
    StringInSlice::create(&["request", "fetch", "cache", "response"])
}

pub fn snippet_type() -> Box<dyn Validator> {
    StringInSlice::create(&[
        "init", "recv", "hash", "hit", "miss", "pass", "fetch", "error", "deliver", "log", "none",
    ])
}

pub fn dictionary_items() -> Box<dyn Validator> {
    MapMaxItems::create(MAXIMUM_DICTIONARY_SIZE)
}

pub fn service_authorization_permission() -> Box<dyn Validator> {
    StringInSlice::create(&["full", "read_only", "purge_select", "purge_all"])
}

pub fn user_role() -> Box<dyn Validator> {
    StringInSlice::create(&["user", "billing", "engineer", "superuser"])
}

pub fn alert_source() -> Box<dyn Validator> {
    StringInSlice::create(&["domains", "origins", "stats"])
}

pub fn alert_evaluation_type() -> Box<dyn Validator> {
    StringInSlice::create(&[
        "above_threshold",
        "all_above_threshold",
        "below_threshold",
        "percent_absolute",
        "percent_decrease",
        "percent_increase",
    ])
}

pub fn alert_evaluation_period() -> Box<dyn Validator> {
    StringInSlice::create(&["2m", "3m", "5m", "15m", "30m"])
}

pub fn tls_service() -> Box<dyn Validator> {
    StringInSlice::create(&["PLATFORM", "CUSTOM"])
}

/// Datadog site codes such as `us1` or `eu1`
pub fn datadog_site() -> Box<dyn Validator> {
    StringLenBetween::create(3, 3)
}

pub fn pem_block(label: &str) -> Box<dyn Validator> {
    PemBlock::create(label)
}

pub fn pem_blocks(label: &str) -> Box<dyn Validator> {
    PemBlocks::create(label)
}

pub fn string_trimmed() -> Box<dyn Validator> {
    Box::new(StringTrimmed)
}

/// Rejects strings with leading or trailing whitespace
pub struct StringTrimmed;

impl Validator for StringTrimmed {
    fn description(&self) -> String {
        "value must not have leading or trailing whitespace".to_string()
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];
        if let Some(s) = request.config_value.value.as_str() {
            if s != s.trim() {
                let name = request
                    .path
                    .steps
                    .iter()
                    .rev()
                    .find_map(|step| match step {
                        AttributePathStep::AttributeName(name) => Some(name.clone()),
                        _ => None,
                    })
                    .unwrap_or_else(|| request.path.to_string());
                diagnostics.push(violation(
                    &request.path,
                    format!(
                        "{} must not contain trailing space characters (e.g., \\n\\t\\r\\f). Consider using trimspace() function",
                        name
                    ),
                ));
            }
        }
        ValidatorResponse { diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tfplug::validator::check;
    use tfplug::{AttributePath, Dynamic, DynamicValue};

    fn errors(validator: Box<dyn Validator>, key: &str, value: impl Into<Dynamic>) -> usize {
        check(validator.as_ref(), key, value.into()).len()
    }

    fn number(n: f64) -> Dynamic {
        Dynamic::Number(n)
    }

    #[test]
    fn logging_format_version_range() {
        for (value, expected) in [(0.0, 1), (1.0, 0), (2.0, 0), (3.0, 1)] {
            assert_eq!(
                errors(logging_format_version(), "format_version", number(value)),
                expected,
                "format_version {}",
                value
            );
        }
    }

    #[test]
    fn logging_string_sets() {
        for (value, expected) in [
            ("classic", 0),
            ("loggly", 0),
            ("logplex", 0),
            ("blank", 0),
            ("CLASSIC", 1),
            ("custom", 1),
        ] {
            assert_eq!(
                errors(logging_message_type(), "message_type", value),
                expected
            );
        }
        assert_eq!(errors(logging_compression_codec(), "compression_codec", "zstd"), 0);
        assert_eq!(errors(logging_compression_codec(), "compression_codec", "lz4"), 1);
        assert_eq!(errors(logging_placement(), "placement", "none"), 0);
        assert_eq!(errors(logging_placement(), "placement", "waf_debug"), 1);
        assert_eq!(errors(logging_placement(), "placement", "NONE"), 1);
        assert_eq!(errors(logging_server_side_encryption(), "sse", "AES256"), 0);
        assert_eq!(errors(logging_server_side_encryption(), "sse", "aws:kms"), 0);
        assert_eq!(errors(logging_server_side_encryption(), "sse", "aes256"), 1);
    }

    #[test]
    fn director_rules() {
        for (value, expected) in [(-1.0, 1), (0.0, 0), (50.0, 0), (100.0, 0), (101.0, 1)] {
            assert_eq!(errors(director_quorum(), "quorum", number(value)), expected);
        }
        for (value, expected) in [(0.0, 1), (1.0, 0), (2.0, 1), (3.0, 0), (4.0, 0), (5.0, 1)] {
            assert_eq!(errors(director_type(), "type", number(value)), expected);
        }
    }

    #[test]
    fn vcl_string_sets() {
        assert_eq!(errors(condition_type(), "type", "PREFETCH"), 0);
        assert_eq!(errors(condition_type(), "type", "request"), 1);
        assert_eq!(errors(header_action(), "action", "regex_repeat"), 0);
        assert_eq!(errors(header_action(), "action", "SET"), 1);
        assert_eq!(errors(header_type(), "type", "cache"), 0);
        assert_eq!(errors(header_type(), "type", "deliver"), 1);
        for snippet in [
            "init", "recv", "hash", "hit", "miss", "pass", "fetch", "error", "deliver", "log",
            "none",
        ] {
            assert_eq!(errors(snippet_type(), "type", snippet), 0, "{}", snippet);
        }
        assert_eq!(errors(snippet_type(), "type", "NONE"), 1);
    }

    #[test]
    fn account_string_sets() {
        assert_eq!(
            errors(service_authorization_permission(), "permission", "purge_select"),
            0
        );
        assert_eq!(
            errors(service_authorization_permission(), "permission", "write"),
            1
        );
        for role in ["user", "billing", "engineer", "superuser"] {
            assert_eq!(errors(user_role(), "role", role), 0);
            assert_eq!(errors(user_role(), "role", role.to_uppercase()), 1);
        }
    }

    #[test]
    fn dictionary_items_limit() {
        let items = |n: usize| {
            Dynamic::Map(
                (0..n)
                    .map(|i| (format!("key{}", i), Dynamic::String(format!("value{}", i))))
                    .collect::<HashMap<_, _>>(),
            )
        };
        assert_eq!(errors(dictionary_items(), "dictionary_items", items(10)), 0);
        assert_eq!(
            errors(dictionary_items(), "dictionary_items", items(MAXIMUM_DICTIONARY_SIZE)),
            0
        );

        let diags = check(
            dictionary_items().as_ref(),
            "dictionary_items",
            items(MAXIMUM_DICTIONARY_SIZE + 1),
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags[0].summary,
            "expected dictionary_items to be at most (10000), got 10001"
        );
    }

    #[test]
    fn alert_string_sets() {
        assert_eq!(errors(alert_source(), "source", "stats"), 0);
        assert_eq!(errors(alert_source(), "source", "logs"), 1);
        assert_eq!(errors(alert_evaluation_type(), "type", "percent_increase"), 0);
        assert_eq!(errors(alert_evaluation_type(), "type", "Above_threshold"), 1);
        assert_eq!(errors(alert_evaluation_period(), "period", "15m"), 0);
        assert_eq!(errors(alert_evaluation_period(), "period", "10m"), 1);
    }

    #[test]
    fn datadog_site_length() {
        for site in ["us1", "us3", "us5", "eu1", "ap1"] {
            assert_eq!(errors(datadog_site(), "site", site), 0, "{}", site);
        }
        assert_eq!(errors(datadog_site(), "site", ""), 1);
        assert_eq!(errors(datadog_site(), "site", "us13"), 1);
    }

    #[test]
    fn string_trimmed_names_the_attribute() {
        assert_eq!(errors(string_trimmed(), "content", "ok"), 0);

        let response = StringTrimmed.validate(ValidatorRequest {
            config_value: DynamicValue::new(Dynamic::from("value\n")),
            path: AttributePath::new("snippet").index(0).attribute("content"),
        });
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(
            response.diagnostics[0].summary,
            "content must not contain trailing space characters (e.g., \\n\\t\\r\\f). Consider using trimspace() function"
        );
        assert_eq!(
            response.diagnostics[0].attribute,
            Some(AttributePath::new("snippet").index(0).attribute("content"))
        );
    }
}
