//! Plan modifiers shipped with the framework

use crate::schema::{PlanModifier, PlanModifierRequest, PlanModifierResponse, Schema};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

/// Outcome of running a schema's plan modifiers over a proposed state
pub struct PlannedChange {
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Run every top-level attribute's plan modifiers in declaration order.
/// A null prior state means the resource is being created, which never
/// counts as a replacement.
pub fn plan_attributes(
    schema: &Schema,
    config: &DynamicValue,
    prior_state: &DynamicValue,
    proposed: &DynamicValue,
) -> PlannedChange {
    let mut planned_state = proposed.clone();
    let mut requires_replace = Vec::new();
    let mut diagnostics = Vec::new();

    if proposed.is_null() {
        return PlannedChange {
            planned_state,
            requires_replace,
            diagnostics,
        };
    }

    let read = |value: &DynamicValue, path: &AttributePath| {
        value
            .get_optional(path)
            .ok()
            .flatten()
            .cloned()
            .map(DynamicValue::new)
            .unwrap_or_else(DynamicValue::null)
    };

    for attr in &schema.block.attributes {
        if attr.plan_modifiers.is_empty() {
            continue;
        }
        let path = AttributePath::new(&attr.name);
        // Unknown plans must survive so modifiers can see them
        let mut plan_value = match planned_state.get(&path) {
            Ok(value) => DynamicValue::new(value.clone()),
            Err(_) => DynamicValue::null(),
        };

        for modifier in &attr.plan_modifiers {
            let response = modifier.modify(PlanModifierRequest {
                config_value: read(config, &path),
                state_value: read(prior_state, &path),
                plan_value,
                path: path.clone(),
            });
            plan_value = response.plan_value;
            diagnostics.extend(response.diagnostics);
            if response.requires_replace
                && !prior_state.is_null()
                && !requires_replace.contains(&path)
            {
                requires_replace.push(path.clone());
            }
        }

        if let Err(e) = planned_state.set(&path, plan_value.value) {
            diagnostics.push(Diagnostic::error(
                "Failed to apply plan modifier",
                format!("{}: {}", path, e),
            ));
        }
    }

    PlannedChange {
        planned_state,
        requires_replace,
        diagnostics,
    }
}

/// Marks an attribute as forcing a new resource when its value changes,
/// including going from unset to set. Not-yet-known plans never force replacement.
pub struct RequiresReplace;

impl RequiresReplace {
    pub fn create() -> Box<dyn PlanModifier> {
        Box::new(Self)
    }
}

impl PlanModifier for RequiresReplace {
    fn description(&self) -> String {
        "changing this value forces a new resource".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let requires_replace = match (&request.state_value.value, &request.plan_value.value) {
            (_, Dynamic::Unknown) => false,
            (state, plan) => state != plan,
        };

        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics: vec![],
        }
    }
}

/// Keep the prior state value for a computed attribute whose plan is unknown
pub struct UseStateForUnknown;

impl UseStateForUnknown {
    pub fn create() -> Box<dyn PlanModifier> {
        Box::new(Self)
    }
}

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "once set, the value of this attribute will not change".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let plan_value = if request.plan_value.is_unknown() && !request.state_value.is_null() {
            request.state_value
        } else {
            request.plan_value
        };

        PlanModifierResponse {
            plan_value,
            requires_replace: false,
            diagnostics: vec![],
        }
    }
}
