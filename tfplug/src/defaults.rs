//! Default value providers for attributes
//!
//! Defaults are consulted by [`crate::validation::apply_defaults`] when an
//! optional attribute is absent or null in configuration.

use crate::schema::{Default, DefaultRequest, DefaultResponse};
use crate::types::{Dynamic, DynamicValue};
use std::env;

/// StaticDefault provides a fixed default value
pub struct StaticDefault {
    value: Dynamic,
}

impl StaticDefault {
    pub fn create(value: Dynamic) -> Box<dyn Default> {
        Box::new(Self { value })
    }

    pub fn string(value: &str) -> Box<dyn Default> {
        Self::create(Dynamic::String(value.to_string()))
    }

    pub fn number(value: f64) -> Box<dyn Default> {
        Self::create(Dynamic::Number(value))
    }

    pub fn bool(value: bool) -> Box<dyn Default> {
        Self::create(Dynamic::Bool(value))
    }
}

impl Default for StaticDefault {
    fn description(&self) -> String {
        format!("static default value: {:?}", self.value)
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        DefaultResponse {
            value: DynamicValue::new(self.value.clone()),
        }
    }
}

/// EnvDefault reads the default from an environment variable.
/// An empty variable counts as unset.
pub struct EnvDefault {
    env_var: String,
    fallback: Option<String>,
}

impl EnvDefault {
    pub fn create(env_var: &str, fallback: &str) -> Box<dyn Default> {
        Box::new(Self {
            env_var: env_var.to_string(),
            fallback: Some(fallback.to_string()),
        })
    }

    /// Without a fallback the attribute stays null when the variable is unset
    pub fn create_required(env_var: &str) -> Box<dyn Default> {
        Box::new(Self {
            env_var: env_var.to_string(),
            fallback: None,
        })
    }
}

impl Default for EnvDefault {
    fn description(&self) -> String {
        match &self.fallback {
            Some(fallback) => format!(
                "default from environment variable {} (fallback: {})",
                self.env_var, fallback
            ),
            None => format!("default from environment variable {}", self.env_var),
        }
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        let value = env::var(&self.env_var)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.fallback.clone())
            .map(Dynamic::String)
            .unwrap_or(Dynamic::Null);

        DefaultResponse {
            value: DynamicValue::new(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttributePath;
    use serial_test::serial;

    fn request() -> DefaultRequest {
        DefaultRequest {
            path: AttributePath::new("test"),
        }
    }

    #[test]
    fn static_default_string() {
        let default = StaticDefault::string("us1");
        assert_eq!(
            default.default_value(request()).value.value,
            Dynamic::String("us1".to_string())
        );
    }

    #[test]
    #[serial]
    fn env_default_with_fallback() {
        env::remove_var("TFPLUG_TEST_DEFAULT_URL");
        let default = EnvDefault::create("TFPLUG_TEST_DEFAULT_URL", "https://api.example.com");
        assert_eq!(
            default.default_value(request()).value.value,
            Dynamic::String("https://api.example.com".to_string())
        );
    }

    #[test]
    #[serial]
    fn env_default_with_value() {
        env::set_var("TFPLUG_TEST_DEFAULT_URL", "http://localhost:8080");
        let default = EnvDefault::create("TFPLUG_TEST_DEFAULT_URL", "https://api.example.com");
        assert_eq!(
            default.default_value(request()).value.value,
            Dynamic::String("http://localhost:8080".to_string())
        );
        env::remove_var("TFPLUG_TEST_DEFAULT_URL");
    }

    #[test]
    #[serial]
    fn env_default_required_missing() {
        env::set_var("TFPLUG_TEST_DEFAULT_KEY", "");
        let default = EnvDefault::create_required("TFPLUG_TEST_DEFAULT_KEY");
        assert!(default.default_value(request()).value.is_null());
        env::remove_var("TFPLUG_TEST_DEFAULT_KEY");
    }
}
