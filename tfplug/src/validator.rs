//! Built-in attribute validators
//!
//! Each validator checks a single configured value and reports zero or more
//! error diagnostics against the attribute path it was invoked for. Null and
//! unknown values are never checked; absence is the schema's concern.

use crate::schema::{Validator, ValidatorRequest, ValidatorResponse};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::fmt::Display;

/// Build an error diagnostic for `path` with `message` as the summary
pub fn violation(path: &AttributePath, message: impl Into<String>) -> Diagnostic {
    Diagnostic::error(message, String::new()).with_attribute(path.clone())
}

/// Run a validator against a bare value, keyed by a top-level attribute name
pub fn check(validator: &dyn Validator, key: &str, value: Dynamic) -> Vec<Diagnostic> {
    validator
        .validate(ValidatorRequest {
            config_value: DynamicValue::new(value),
            path: AttributePath::new(key),
        })
        .diagnostics
}

fn respond(diagnostics: Vec<Diagnostic>) -> ValidatorResponse {
    ValidatorResponse { diagnostics }
}

fn skip(value: &Dynamic) -> bool {
    value.is_null() || value.is_unknown()
}

fn as_integer(value: &Dynamic) -> Option<i64> {
    value
        .as_number()
        .filter(|n| n.fract() == 0.0 && n.is_finite())
        .map(|n| n as i64)
}

fn quoted<T: Display>(items: &[T]) -> String {
    let inner = items
        .iter()
        .map(|i| format!("\"{}\"", i))
        .collect::<Vec<_>>()
        .join(" ");
    format!("[{}]", inner)
}

/// Integer within an inclusive range
pub struct IntBetween {
    min: i64,
    max: i64,
}

impl IntBetween {
    pub fn create(min: i64, max: i64) -> Box<dyn Validator> {
        Box::new(Self { min, max })
    }
}

impl Validator for IntBetween {
    fn description(&self) -> String {
        format!("value must be between {} and {}", self.min, self.max)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let value = &request.config_value.value;
        if skip(value) {
            return respond(vec![]);
        }
        let key = request.path.to_string();
        let Some(n) = as_integer(value) else {
            return respond(vec![violation(
                &request.path,
                format!("expected type of {} to be integer", key),
            )]);
        };
        if n < self.min || n > self.max {
            return respond(vec![violation(
                &request.path,
                format!(
                    "expected {} to be in the range ({} - {}), got {}",
                    key, self.min, self.max, n
                ),
            )]);
        }
        respond(vec![])
    }
}

/// Integer drawn from a fixed set
pub struct IntInSlice {
    valid: Vec<i64>,
}

impl IntInSlice {
    pub fn create(valid: &[i64]) -> Box<dyn Validator> {
        Box::new(Self {
            valid: valid.to_vec(),
        })
    }
}

impl Validator for IntInSlice {
    fn description(&self) -> String {
        format!("value must be one of {:?}", self.valid)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let value = &request.config_value.value;
        if skip(value) {
            return respond(vec![]);
        }
        let key = request.path.to_string();
        let Some(n) = as_integer(value) else {
            return respond(vec![violation(
                &request.path,
                format!("expected type of {} to be integer", key),
            )]);
        };
        if !self.valid.contains(&n) {
            return respond(vec![violation(
                &request.path,
                format!("expected {} to be one of {:?}, got {}", key, self.valid, n),
            )]);
        }
        respond(vec![])
    }
}

/// String drawn from a fixed set, compared case-sensitively
pub struct StringInSlice {
    valid: Vec<String>,
}

impl StringInSlice {
    pub fn create(valid: &[&str]) -> Box<dyn Validator> {
        Box::new(Self {
            valid: valid.iter().map(|s| s.to_string()).collect(),
        })
    }
}

impl Validator for StringInSlice {
    fn description(&self) -> String {
        format!("value must be one of {}", quoted(&self.valid))
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let value = &request.config_value.value;
        if skip(value) {
            return respond(vec![]);
        }
        let key = request.path.to_string();
        let Some(s) = value.as_str() else {
            return respond(vec![violation(
                &request.path,
                format!("expected type of {} to be string", key),
            )]);
        };
        if !self.valid.iter().any(|v| v == s) {
            return respond(vec![violation(
                &request.path,
                format!(
                    "expected {} to be one of {}, got {}",
                    key,
                    quoted(&self.valid),
                    s
                ),
            )]);
        }
        respond(vec![])
    }
}

/// String whose length in characters is within an inclusive range
pub struct StringLenBetween {
    min: usize,
    max: usize,
}

impl StringLenBetween {
    pub fn create(min: usize, max: usize) -> Box<dyn Validator> {
        Box::new(Self { min, max })
    }
}

impl Validator for StringLenBetween {
    fn description(&self) -> String {
        format!("length must be between {} and {}", self.min, self.max)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let value = &request.config_value.value;
        if skip(value) {
            return respond(vec![]);
        }
        let key = request.path.to_string();
        let Some(s) = value.as_str() else {
            return respond(vec![violation(
                &request.path,
                format!("expected type of {} to be string", key),
            )]);
        };
        let len = s.chars().count();
        if len < self.min || len > self.max {
            return respond(vec![violation(
                &request.path,
                format!(
                    "expected length of {} to be in the range ({} - {}), got {}",
                    key, self.min, self.max, s
                ),
            )]);
        }
        respond(vec![])
    }
}

/// Map with no more than `max` entries
pub struct MapMaxItems {
    max: usize,
}

impl MapMaxItems {
    pub fn create(max: usize) -> Box<dyn Validator> {
        Box::new(Self { max })
    }
}

impl Validator for MapMaxItems {
    fn description(&self) -> String {
        format!("map must have at most {} entries", self.max)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let value = &request.config_value.value;
        if skip(value) {
            return respond(vec![]);
        }
        let key = request.path.to_string();
        let Some(entries) = value.as_map() else {
            return respond(vec![violation(
                &request.path,
                format!("expected type of {} to be map", key),
            )]);
        };
        if entries.len() > self.max {
            return respond(vec![violation(
                &request.path,
                format!(
                    "expected {} to be at most ({}), got {}",
                    key,
                    self.max,
                    entries.len()
                ),
            )]);
        }
        respond(vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn int_between_is_inclusive() {
        let v = IntBetween::create(0, 100);
        assert!(check(v.as_ref(), "quorum", Dynamic::Number(0.0)).is_empty());
        assert!(check(v.as_ref(), "quorum", Dynamic::Number(100.0)).is_empty());

        let diags = check(v.as_ref(), "quorum", Dynamic::Number(101.0));
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags[0].summary,
            "expected quorum to be in the range (0 - 100), got 101"
        );
        assert_eq!(check(v.as_ref(), "quorum", Dynamic::Number(-1.0)).len(), 1);
    }

    #[test]
    fn int_validators_reject_fractions() {
        let v = IntInSlice::create(&[1, 3, 4]);
        let diags = check(v.as_ref(), "type", Dynamic::Number(1.5));
        assert_eq!(diags[0].summary, "expected type of type to be integer");
        assert_eq!(check(v.as_ref(), "type", Dynamic::Number(2.0)).len(), 1);
        assert!(check(v.as_ref(), "type", Dynamic::Number(3.0)).is_empty());
    }

    #[test]
    fn string_in_slice_is_case_sensitive() {
        let v = StringInSlice::create(&["PLATFORM", "CUSTOM"]);
        assert!(check(v.as_ref(), "tls_service", "CUSTOM".into()).is_empty());

        let diags = check(v.as_ref(), "tls_service", "custom".into());
        assert_eq!(
            diags[0].summary,
            "expected tls_service to be one of [\"PLATFORM\" \"CUSTOM\"], got custom"
        );
    }

    #[test]
    fn null_and_unknown_values_are_not_checked() {
        let v = StringLenBetween::create(3, 3);
        assert!(check(v.as_ref(), "site", Dynamic::Null).is_empty());
        assert!(check(v.as_ref(), "site", Dynamic::Unknown).is_empty());
        assert_eq!(check(v.as_ref(), "site", "".into()).len(), 1);
    }

    #[test]
    fn map_max_items_boundary() {
        let v = MapMaxItems::create(2);
        let mut items = HashMap::from([
            ("a".to_string(), Dynamic::from("1")),
            ("b".to_string(), Dynamic::from("2")),
        ]);
        assert!(check(v.as_ref(), "items", Dynamic::Map(items.clone())).is_empty());

        items.insert("c".to_string(), Dynamic::from("3"));
        let diags = check(v.as_ref(), "items", Dynamic::Map(items));
        assert_eq!(diags[0].summary, "expected items to be at most (2), got 3");
    }
}
