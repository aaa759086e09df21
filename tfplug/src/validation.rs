//! Schema-driven configuration checks
//!
//! [`validate_config`] walks a configuration against its schema and collects
//! every problem it finds: missing required arguments, unsupported arguments,
//! type mismatches, conflicting arguments, nested block counts and the
//! attribute validators. Nothing short-circuits, so a user sees all issues
//! from a single plan.

use crate::schema::{AttributeType, Block, DefaultRequest, Schema, ValidatorRequest};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::collections::HashMap;

/// Check `config` against `schema`, returning all diagnostics
pub fn validate_config(schema: &Schema, config: &DynamicValue) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    match &config.value {
        // Whole config not known yet, nothing to check
        Dynamic::Unknown => {}
        Dynamic::Null => validate_block(
            &schema.block,
            &HashMap::new(),
            &AttributePath::root(),
            &mut diagnostics,
        ),
        Dynamic::Map(values) => {
            validate_block(&schema.block, values, &AttributePath::root(), &mut diagnostics)
        }
        other => diagnostics.push(Diagnostic::error(
            "Invalid configuration",
            format!("Expected an object, got {}", other.type_name()),
        )),
    }
    diagnostics
}

fn child_path(parent: &AttributePath, name: &str) -> AttributePath {
    parent.clone().attribute(name)
}

fn is_set(value: Option<&Dynamic>) -> bool {
    !matches!(value, None | Some(Dynamic::Null))
}

fn validate_block(
    block: &Block,
    values: &HashMap<String, Dynamic>,
    path: &AttributePath,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (name, value) in values {
        let known = block.attribute(name).is_some() || block.nested_block(name).is_some();
        if !known && !value.is_null() {
            diagnostics.push(
                Diagnostic::error(
                    "Unsupported argument",
                    format!("An argument named \"{}\" is not expected here.", name),
                )
                .with_attribute(child_path(path, name)),
            );
        }
    }

    for attr in &block.attributes {
        let attr_path = child_path(path, &attr.name);
        let value = values.get(&attr.name);

        if attr.required && !is_set(value) {
            diagnostics.push(
                Diagnostic::error(
                    "Missing required argument",
                    format!(
                        "The argument \"{}\" is required, but no definition was found.",
                        attr.name
                    ),
                )
                .with_attribute(attr_path),
            );
            continue;
        }

        let Some(value) = value.filter(|v| !v.is_null()) else {
            continue;
        };

        if attr.computed && !attr.optional && !attr.required {
            diagnostics.push(
                Diagnostic::error(
                    "Value for unconfigurable attribute",
                    format!(
                        "Can't configure a value for \"{}\": its value will be decided automatically.",
                        attr.name
                    ),
                )
                .with_attribute(attr_path),
            );
            continue;
        }

        for other in &attr.conflicts_with {
            if is_set(values.get(other)) {
                diagnostics.push(
                    Diagnostic::error(
                        "Conflicting configuration arguments",
                        format!("\"{}\": conflicts with {}", attr.name, other),
                    )
                    .with_attribute(attr_path.clone()),
                );
            }
        }

        if value.is_unknown() {
            continue;
        }

        if !type_matches(value, &attr.r#type) {
            diagnostics.push(
                Diagnostic::error(
                    "Incorrect attribute value type",
                    format!(
                        "Inappropriate value for attribute \"{}\": expected {:?}, got {}.",
                        attr.name,
                        attr.r#type,
                        value.type_name()
                    ),
                )
                .with_attribute(attr_path),
            );
            continue;
        }

        for validator in &attr.validators {
            let response = validator.validate(ValidatorRequest {
                config_value: DynamicValue::new(value.clone()),
                path: attr_path.clone(),
            });
            diagnostics.extend(response.diagnostics);
        }
    }

    for nested in &block.block_types {
        let nested_path = child_path(path, &nested.type_name);
        let items: &[Dynamic] = match values.get(&nested.type_name) {
            None | Some(Dynamic::Null) => &[],
            Some(Dynamic::Unknown) => continue,
            Some(Dynamic::List(items)) => items,
            Some(other) => {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid block",
                        format!(
                            "Block \"{}\" must be a list of objects, got {}.",
                            nested.type_name,
                            other.type_name()
                        ),
                    )
                    .with_attribute(nested_path),
                );
                continue;
            }
        };

        let count = items.len() as i64;
        if count < nested.min_items {
            diagnostics.push(
                Diagnostic::error(
                    format!("Insufficient {} blocks", nested.type_name),
                    format!(
                        "At least {} \"{}\" blocks are required.",
                        nested.min_items, nested.type_name
                    ),
                )
                .with_attribute(nested_path.clone()),
            );
        }
        if nested.max_items > 0 && count > nested.max_items {
            diagnostics.push(
                Diagnostic::error(
                    format!("Too many {} blocks", nested.type_name),
                    format!(
                        "No more than {} \"{}\" blocks are allowed.",
                        nested.max_items, nested.type_name
                    ),
                )
                .with_attribute(nested_path.clone()),
            );
        }

        for (idx, item) in items.iter().enumerate() {
            let item_path = nested_path.clone().index(idx as i64);
            match item {
                Dynamic::Map(fields) => {
                    validate_block(&nested.block, fields, &item_path, diagnostics)
                }
                Dynamic::Unknown => {}
                other => diagnostics.push(
                    Diagnostic::error(
                        "Invalid block",
                        format!("Expected an object, got {}.", other.type_name()),
                    )
                    .with_attribute(item_path),
                ),
            }
        }
    }
}

fn type_matches(value: &Dynamic, expected: &AttributeType) -> bool {
    match (value, expected) {
        (Dynamic::Null, _) | (Dynamic::Unknown, _) => true,
        (Dynamic::String(_), AttributeType::String) => true,
        (Dynamic::Number(_), AttributeType::Number) => true,
        (Dynamic::Bool(_), AttributeType::Bool) => true,
        (Dynamic::List(items), AttributeType::List(inner))
        | (Dynamic::List(items), AttributeType::Set(inner)) => {
            items.iter().all(|item| type_matches(item, inner))
        }
        (Dynamic::Map(entries), AttributeType::Map(inner)) => {
            entries.values().all(|item| type_matches(item, inner))
        }
        (Dynamic::Map(entries), AttributeType::Object(fields)) => {
            entries.iter().all(|(key, item)| {
                fields
                    .get(key)
                    .is_some_and(|field_type| type_matches(item, field_type))
            })
        }
        _ => false,
    }
}

/// Return a copy of `config` with unset optional attributes filled from their defaults
pub fn apply_defaults(schema: &Schema, config: &DynamicValue) -> DynamicValue {
    let mut value = config.value.clone();
    if value.is_null() {
        value = Dynamic::Map(HashMap::new());
    }
    if let Dynamic::Map(values) = &mut value {
        fill_block_defaults(&schema.block, values, &AttributePath::root());
    }
    DynamicValue::new(value)
}

fn fill_block_defaults(
    block: &Block,
    values: &mut HashMap<String, Dynamic>,
    path: &AttributePath,
) {
    for attr in &block.attributes {
        let Some(default) = &attr.default else {
            continue;
        };
        if is_set(values.get(&attr.name)) {
            continue;
        }
        let response = default.default_value(DefaultRequest {
            path: child_path(path, &attr.name),
        });
        values.insert(attr.name.clone(), response.value.value);
    }

    for nested in &block.block_types {
        if let Some(Dynamic::List(items)) = values.get_mut(&nested.type_name) {
            for (idx, item) in items.iter_mut().enumerate() {
                if let Dynamic::Map(fields) = item {
                    let item_path = child_path(path, &nested.type_name).index(idx as i64);
                    fill_block_defaults(&nested.block, fields, &item_path);
                }
            }
        }
    }
}
