//! Config flows through validation, defaults and planning in the order the
//! host drives them. These tests run the three stages against one schema.

use std::collections::HashMap;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::{plan_attributes, RequiresReplace, UseStateForUnknown};
use tfplug::validator::StringInSlice;
use tfplug::{
    apply_defaults, validate_config, AttributeBuilder, AttributePath, AttributeType, Dynamic,
    DynamicValue, Schema, SchemaBuilder,
};

fn schema() -> Schema {
    SchemaBuilder::new()
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("workspace_id", AttributeType::String)
                .required()
                .plan_modifier(RequiresReplace::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("site", AttributeType::String)
                .optional()
                .validator(StringInSlice::create(&["us1", "us3", "eu1"]))
                .default(StaticDefault::string("us1"))
                .build(),
        )
        .build()
}

fn object(fields: Vec<(&str, Dynamic)>) -> DynamicValue {
    DynamicValue::new(Dynamic::Map(
        fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect::<HashMap<_, _>>(),
    ))
}

#[test]
fn validation_reports_every_problem() {
    let config = object(vec![("site", Dynamic::from("mars"))]);

    let diagnostics = validate_config(&schema(), &config);

    assert_eq!(diagnostics.len(), 2);
    assert!(diagnostics
        .iter()
        .any(|d| d.summary == "Missing required argument"));
    assert!(diagnostics.iter().any(|d| d.summary.ends_with("got mars")));
}

#[test]
fn defaults_fill_unset_optionals_only() {
    let config = object(vec![("workspace_id", Dynamic::from("ws"))]);
    let filled = apply_defaults(&schema(), &config);
    assert_eq!(
        filled.get_string(&AttributePath::new("site")).unwrap(),
        "us1"
    );

    let config = object(vec![
        ("workspace_id", Dynamic::from("ws")),
        ("site", Dynamic::from("eu1")),
    ]);
    let filled = apply_defaults(&schema(), &config);
    assert_eq!(
        filled.get_string(&AttributePath::new("site")).unwrap(),
        "eu1"
    );
    assert!(validate_config(&schema(), &filled).is_empty());
}

#[test]
fn planning_an_update_keeps_id_and_flags_replacement() {
    let config = object(vec![("workspace_id", Dynamic::from("ws-2"))]);
    let prior = object(vec![
        ("id", Dynamic::from("int-1")),
        ("workspace_id", Dynamic::from("ws-1")),
        ("site", Dynamic::from("us1")),
    ]);
    let proposed = object(vec![
        ("id", Dynamic::Unknown),
        ("workspace_id", Dynamic::from("ws-2")),
        ("site", Dynamic::from("us1")),
    ]);

    let change = plan_attributes(&schema(), &config, &prior, &proposed);

    assert!(change.diagnostics.is_empty());
    assert_eq!(
        change.planned_state.get_string(&AttributePath::new("id")).unwrap(),
        "int-1"
    );
    assert_eq!(
        change.requires_replace,
        vec![AttributePath::new("workspace_id")]
    );
}

#[test]
fn planning_a_create_never_replaces() {
    let config = object(vec![("workspace_id", Dynamic::from("ws-1"))]);
    let proposed = object(vec![
        ("id", Dynamic::Unknown),
        ("workspace_id", Dynamic::from("ws-1")),
        ("site", Dynamic::from("us1")),
    ]);

    let change = plan_attributes(&schema(), &config, &DynamicValue::null(), &proposed);

    assert!(change.requires_replace.is_empty());
    assert!(change
        .planned_state
        .get(&AttributePath::new("id"))
        .unwrap()
        .is_unknown());
}
