//! Alert definition resource

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tfplug::context::Context;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure,
    ResourceWithImportState, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, NestedBlockBuilder, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use crate::annotation;
use crate::api::alerts::{
    AlertDefinition, CreateAlertDefinitionRequest, EvaluationStrategy,
    UpdateAlertDefinitionRequest,
};

/// The only source that may be used without a service
pub const STATS_SOURCE: &str = "stats";

const DIMENSION_BUCKETS: [&str; 2] = ["domains", "origins"];
const EVALUATION_STRATEGY_FIELDS: [&str; 4] = ["type", "period", "threshold", "ignore_below"];

const EMPTY_SERVICE_ID: &str = "empty `service_id` is only supported for `stats` as a source";

#[derive(Default)]
pub struct AlertResource {
    provider_data: Option<crate::FastlyProviderData>,
}

impl AlertResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        let string_set = || AttributeType::Set(Box::new(AttributeType::String));

        SchemaBuilder::new()
            .version(0)
            .description("Manages a Fastly alert definition")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("The ID of the alert definition")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the alert")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("metric", AttributeType::String)
                    .description("The metric name to alert on for a specific source")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("source", AttributeType::String)
                    .description("The source where the metric comes from. One of: `domains`, `origins`, `stats`.")
                    .required()
                    .validator(crate::validators::alert_source())
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("service_id", AttributeType::String)
                    .description("The service which the alert monitors. Optional when using `stats` as the `source`.")
                    .optional()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("Additional text that is included in the alert notification")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("integration_ids", string_set())
                    .description("List of integration IDs to notify when alert fires")
                    .optional()
                    .build(),
            )
            .block(
                NestedBlockBuilder::list("dimensions")
                    .description("More filters depending on the source type")
                    .attribute(
                        AttributeBuilder::new("domains", string_set())
                            .description("Names of a subset of domains that the alert monitors")
                            .optional()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("origins", string_set())
                            .description("Addresses of a subset of backends that the alert monitors")
                            .optional()
                            .build(),
                    )
                    .max_items(1)
                    .build(),
            )
            .block(
                NestedBlockBuilder::list("evaluation_strategy")
                    .description("Criteria on how to alert")
                    .attribute(
                        AttributeBuilder::new("type", AttributeType::String)
                            .description("Type of strategy to use to evaluate")
                            .required()
                            .validator(crate::validators::alert_evaluation_type())
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("period", AttributeType::String)
                            .description("The length of time to evaluate whether the conditions have been met")
                            .required()
                            .validator(crate::validators::alert_evaluation_period())
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("threshold", AttributeType::Number)
                            .description("Threshold used to alert")
                            .required()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("ignore_below", AttributeType::Number)
                            .description("Threshold for the denominator value used in evaluations that calculate a rate or ratio")
                            .optional()
                            .build(),
                    )
                    .min_items(1)
                    .max_items(1)
                    .build(),
            )
            .build()
    }
}

/// Alert settings decoded from configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AlertConfig {
    pub name: String,
    pub metric: String,
    pub source: String,
    pub service_id: String,
    pub description: Option<String>,
    /// Only the buckets the configuration provides
    pub dimensions: BTreeMap<String, Vec<String>>,
    pub evaluation_strategy: EvaluationStrategy,
    pub integration_ids: Vec<String>,
}

impl AlertConfig {
    pub fn from_config(config: &DynamicValue) -> Result<Self, Diagnostic> {
        let name = field(config, AttributePath::new("name"), DynamicValue::get_string)?;
        let metric = field(config, AttributePath::new("metric"), DynamicValue::get_string)?;
        let source = field(config, AttributePath::new("source"), DynamicValue::get_string)?;
        let service_id = field(
            config,
            AttributePath::new("service_id"),
            DynamicValue::get_optional_string,
        )?
        .unwrap_or_default();
        let description = field(
            config,
            AttributePath::new("description"),
            DynamicValue::get_optional_string,
        )?;
        let integration_ids = field(
            config,
            AttributePath::new("integration_ids"),
            DynamicValue::get_optional_string_list,
        )?
        .unwrap_or_default();

        let mut dimensions = BTreeMap::new();
        if let Some(block) = single_block(config, "dimensions", &DIMENSION_BUCKETS)? {
            for bucket in DIMENSION_BUCKETS {
                let values = field(
                    config,
                    block.clone().attribute(bucket),
                    DynamicValue::get_optional_string_list,
                )?;
                if let Some(values) = values {
                    dimensions.insert(bucket.to_string(), values);
                }
            }
        }

        let Some(block) = single_block(config, "evaluation_strategy", &EVALUATION_STRATEGY_FIELDS)?
        else {
            return Err(Diagnostic::error(
                "Missing evaluation_strategy block",
                "Exactly one evaluation_strategy block is required",
            )
            .with_attribute(AttributePath::new("evaluation_strategy")));
        };
        let evaluation_strategy = EvaluationStrategy {
            kind: field(config, block.clone().attribute("type"), DynamicValue::get_string)?,
            period: field(config, block.clone().attribute("period"), DynamicValue::get_string)?,
            threshold: field(config, block.clone().attribute("threshold"), DynamicValue::get_number)?,
            ignore_below: field(
                config,
                block.attribute("ignore_below"),
                DynamicValue::get_optional_number,
            )?,
        };

        check_source_service_id(&source, &service_id)?;

        Ok(Self {
            name,
            metric,
            source,
            service_id,
            description,
            dimensions,
            evaluation_strategy,
            integration_ids,
        })
    }
}

impl From<AlertConfig> for CreateAlertDefinitionRequest {
    fn from(config: AlertConfig) -> Self {
        let strategy = config.evaluation_strategy;
        Self {
            name: config.name,
            description: annotation::annotate(config.description.as_deref()),
            metric: config.metric,
            source: config.source,
            service_id: config.service_id,
            dimensions: config.dimensions,
            evaluation_strategy: EvaluationStrategy {
                ignore_below: strategy.ignore_below.filter(|v| *v > 0.0),
                ..strategy
            },
            integration_ids: config.integration_ids,
        }
    }
}

fn field<'a, T>(
    config: &'a DynamicValue,
    path: AttributePath,
    read: impl FnOnce(&'a DynamicValue, &AttributePath) -> tfplug::Result<T>,
) -> Result<T, Diagnostic> {
    read(config, &path).map_err(|e| {
        Diagnostic::error("Invalid attribute value", format!("{}: {}", path, e)).with_attribute(path)
    })
}

/// Path of the single item of a list block, `None` when the block is absent
fn single_block(
    config: &DynamicValue,
    name: &str,
    allowed: &[&str],
) -> Result<Option<AttributePath>, Diagnostic> {
    let path = AttributePath::new(name);
    let items = match field(config, path.clone(), DynamicValue::get_optional)? {
        None => return Ok(None),
        Some(Dynamic::List(items)) => items,
        Some(other) => {
            return Err(Diagnostic::error(
                "Invalid block",
                format!("Expected a list of {} blocks, got {}", name, other.type_name()),
            )
            .with_attribute(path))
        }
    };

    let item = match items.as_slice() {
        [] => return Ok(None),
        [item] => item,
        _ => {
            return Err(Diagnostic::error(
                "Too many blocks",
                format!("No more than 1 \"{}\" block is allowed, got {}", name, items.len()),
            )
            .with_attribute(path))
        }
    };

    let item_path = path.index(0);
    let Some(values) = item.as_map() else {
        return Err(Diagnostic::error(
            "Invalid block",
            format!("Expected a {} object, got {}", name, item.type_name()),
        )
        .with_attribute(item_path));
    };
    if let Some(key) = values
        .iter()
        .find(|(key, value)| !allowed.contains(&key.as_str()) && !value.is_null())
        .map(|(key, _)| key)
    {
        return Err(Diagnostic::error(
            "Unsupported argument",
            format!("An argument named \"{}\" is not expected here.", key),
        )
        .with_attribute(item_path.attribute(key)));
    }

    Ok(Some(item_path))
}

fn check_source_service_id(source: &str, service_id: &str) -> Result<(), Diagnostic> {
    if source != STATS_SOURCE && service_id.is_empty() {
        return Err(Diagnostic::error(EMPTY_SERVICE_ID, "")
            .with_attribute(AttributePath::new("service_id")));
    }
    Ok(())
}

/// Source and service_id checked once both are known
fn validate_source_service_id(config: &DynamicValue) -> Option<Diagnostic> {
    let Ok(Dynamic::String(source)) = config.get(&AttributePath::new("source")) else {
        return None;
    };
    let service_id = match config.get(&AttributePath::new("service_id")) {
        Ok(Dynamic::Unknown) => return None,
        Ok(Dynamic::String(id)) => id.as_str(),
        _ => "",
    };
    check_source_service_id(source, service_id).err()
}

/// Overlay a remote definition onto `base` (prior or planned state).
/// Collections and description are only written when the server returns them.
pub fn alert_state(base: DynamicValue, definition: &AlertDefinition) -> tfplug::Result<DynamicValue> {
    let mut state = if base.is_null() {
        DynamicValue::object()
    } else {
        base
    };

    state.set_string(&AttributePath::new("id"), definition.id.clone())?;
    state.set_string(&AttributePath::new("name"), definition.name.clone())?;
    state.set_string(&AttributePath::new("metric"), definition.metric.clone())?;
    state.set_string(&AttributePath::new("source"), definition.source.clone())?;
    if definition.service_id.is_empty() {
        state.set_null(&AttributePath::new("service_id"))?;
    } else {
        state.set_string(
            &AttributePath::new("service_id"),
            definition.service_id.clone(),
        )?;
    }

    if let Some(description) = annotation::strip(&definition.description) {
        state.set_string(&AttributePath::new("description"), description)?;
    }

    if DIMENSION_BUCKETS
        .iter()
        .any(|bucket| definition.dimensions.contains_key(*bucket))
    {
        let block: HashMap<String, Dynamic> = DIMENSION_BUCKETS
            .iter()
            .map(|bucket| {
                let values = match definition.dimensions.get(*bucket) {
                    Some(values) => Dynamic::string_list(values.iter().cloned()),
                    None => Dynamic::Null,
                };
                (bucket.to_string(), values)
            })
            .collect();
        state.set_list(&AttributePath::new("dimensions"), vec![Dynamic::Map(block)])?;
    }

    if let Some(strategy) = &definition.evaluation_strategy {
        let ignore_below = match strategy.ignore_below.filter(|v| *v > 0.0) {
            Some(v) => Dynamic::Number(v),
            None => Dynamic::Null,
        };
        let block = HashMap::from([
            ("type".to_string(), Dynamic::from(strategy.kind.as_str())),
            ("period".to_string(), Dynamic::from(strategy.period.as_str())),
            ("threshold".to_string(), Dynamic::Number(strategy.threshold)),
            ("ignore_below".to_string(), ignore_below),
        ]);
        state.set_list(
            &AttributePath::new("evaluation_strategy"),
            vec![Dynamic::Map(block)],
        )?;
    }

    if !definition.integration_ids.is_empty() {
        state.set(
            &AttributePath::new("integration_ids"),
            Dynamic::string_list(definition.integration_ids.iter().cloned()),
        )?;
    }

    Ok(state)
}

fn not_configured() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "Provider data was not properly configured",
    )
}

#[async_trait]
impl Resource for AlertResource {
    fn type_name(&self) -> &str {
        "fastly_alert"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = tfplug::validate_config(&Self::schema_static(), &request.config);
        diagnostics.extend(validate_source_service_id(&request.config));

        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics,
            };
        };

        let config = match AlertConfig::from_config(&request.config) {
            Ok(config) => config,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        tracing::debug!("Creating alert definition {}", config.name);
        let create_request = CreateAlertDefinitionRequest::from(config);
        let mut new_state = request.planned_state;

        match provider_data.client.alerts().create(&create_request).await {
            Ok(definition) => {
                tracing::debug!("Created alert definition {}", definition.id);
                if let Err(e) = new_state.set_string(&AttributePath::new("id"), definition.id) {
                    diagnostics.push(Diagnostic::error("Failed to set alert ID", e.to_string()));
                }
            }
            Err(e) => {
                tracing::error!("Failed to create alert definition: {}", e);
                diagnostics.push(Diagnostic::error(
                    "Failed to create alert definition",
                    format!("API error: {}", e),
                ));
            }
        }

        CreateResourceResponse {
            new_state,
            private: vec![],
            diagnostics,
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut diagnostics = vec![];

        let Ok(id) = request.current_state.get_string(&AttributePath::new("id")) else {
            return ReadResourceResponse {
                new_state: None,
                diagnostics,
                private: request.private,
                deferred: None,
            };
        };

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics,
                private: request.private,
                deferred: None,
            };
        };

        let new_state = match provider_data.client.alerts().get(&id).await {
            Ok(definition) => match alert_state(request.current_state.clone(), &definition) {
                Ok(state) => state,
                Err(e) => {
                    diagnostics.push(Diagnostic::error(
                        "Failed to set alert state",
                        e.to_string(),
                    ));
                    request.current_state
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read alert definition {}: {}", id, e);
                diagnostics.push(Diagnostic::error(
                    "Failed to read alert definition",
                    format!("API error: {}", e),
                ));
                request.current_state
            }
        };

        ReadResourceResponse {
            new_state: Some(new_state),
            diagnostics,
            private: request.private,
            deferred: None,
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return UpdateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics,
            };
        };

        let id = match request.prior_state.get_string(&AttributePath::new("id")) {
            Ok(id) => id,
            Err(e) => {
                diagnostics.push(Diagnostic::error("Missing alert ID", e.to_string()));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let config = match AlertConfig::from_config(&request.config) {
            Ok(config) => config,
            Err(diag) => {
                diagnostics.push(diag);
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        tracing::debug!("Updating alert definition {}", id);
        let update_request =
            UpdateAlertDefinitionRequest::from(CreateAlertDefinitionRequest::from(config));
        let alerts = provider_data.client.alerts();

        if let Err(e) = alerts.update(&id, &update_request).await {
            diagnostics.push(Diagnostic::error(
                "Failed to update alert definition",
                format!("API error: {}", e),
            ));
            return UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics,
            };
        }

        let new_state = match alerts.get(&id).await {
            Ok(definition) => match alert_state(request.planned_state.clone(), &definition) {
                Ok(state) => state,
                Err(e) => {
                    diagnostics.push(Diagnostic::error(
                        "Failed to set alert state",
                        e.to_string(),
                    ));
                    request.planned_state
                }
            },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to read alert definition after update",
                    format!("API error: {}", e),
                ));
                request.planned_state
            }
        };

        UpdateResourceResponse {
            new_state,
            private: vec![],
            diagnostics,
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return DeleteResourceResponse { diagnostics };
        };

        let Ok(id) = request.prior_state.get_string(&AttributePath::new("id")) else {
            return DeleteResourceResponse { diagnostics };
        };

        tracing::debug!("Deleting alert definition {}", id);
        if let Err(e) = provider_data.client.alerts().delete(&id).await {
            diagnostics.push(Diagnostic::error(
                "Failed to delete alert definition",
                format!("API error: {}", e),
            ));
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for AlertResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];

        match crate::FastlyProviderData::from_configure(request.provider_data, "resource") {
            Ok(provider_data) => self.provider_data = Some(provider_data),
            Err(diag) => diagnostics.push(diag),
        }

        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for AlertResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
            deferred: None,
        };
        tfplug::import_state_passthrough_id(&ctx, AttributePath::new("id"), &request, &mut response);
        response
    }
}

#[cfg(test)]
#[path = "./alert_test.rs"]
mod alert_test;
