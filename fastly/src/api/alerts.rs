//! Alert definitions API

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::common::null_as_default;
use super::error::ApiError;
use crate::api::Client;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationStrategy {
    #[serde(rename = "type")]
    pub kind: String,
    pub period: String,
    pub threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_below: Option<f64>,
}

/// Alert definition as returned by the API
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AlertDefinition {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metric: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub service_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dimensions: BTreeMap<String, Vec<String>>,
    pub evaluation_strategy: Option<EvaluationStrategy>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub integration_ids: Vec<String>,
}

/// Request body for POST /alerts/definitions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateAlertDefinitionRequest {
    pub name: String,
    pub description: String,
    pub metric: String,
    pub source: String,
    pub service_id: String,
    pub dimensions: BTreeMap<String, Vec<String>>,
    pub evaluation_strategy: EvaluationStrategy,
    pub integration_ids: Vec<String>,
}

/// Request body for PUT /alerts/definitions/{id}; source and service_id are immutable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateAlertDefinitionRequest {
    pub name: String,
    pub description: String,
    pub metric: String,
    pub dimensions: BTreeMap<String, Vec<String>>,
    pub evaluation_strategy: EvaluationStrategy,
    pub integration_ids: Vec<String>,
}

impl From<CreateAlertDefinitionRequest> for UpdateAlertDefinitionRequest {
    fn from(req: CreateAlertDefinitionRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            metric: req.metric,
            dimensions: req.dimensions,
            evaluation_strategy: req.evaluation_strategy,
            integration_ids: req.integration_ids,
        }
    }
}

pub struct AlertsApi<'a> {
    client: &'a Client,
}

impl<'a> AlertsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn definition_path(id: &str) -> String {
        format!("/alerts/definitions/{}", urlencoding::encode(id))
    }

    pub async fn create(
        &self,
        request: &CreateAlertDefinitionRequest,
    ) -> Result<AlertDefinition, ApiError> {
        self.client.post("/alerts/definitions", request).await
    }

    pub async fn get(&self, id: &str) -> Result<AlertDefinition, ApiError> {
        self.client.get(&Self::definition_path(id)).await
    }

    pub async fn update(
        &self,
        id: &str,
        request: &UpdateAlertDefinitionRequest,
    ) -> Result<AlertDefinition, ApiError> {
        self.client.put(&Self::definition_path(id), request).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&Self::definition_path(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignore_below_omitted_when_none() {
        let strategy = EvaluationStrategy {
            kind: "above_threshold".into(),
            period: "5m".into(),
            threshold: 10.0,
            ignore_below: None,
        };
        let json = serde_json::to_value(&strategy).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type":"above_threshold","period":"5m","threshold":10.0})
        );
    }

    #[test]
    fn definition_tolerates_missing_collections() {
        let def: AlertDefinition = serde_json::from_str(
            r#"{"id":"a1","name":"n","metric":"status_5xx","source":"stats","service_id":null,
                "evaluation_strategy":{"type":"below_threshold","period":"2m","threshold":1}}"#,
        )
        .unwrap();
        assert!(def.dimensions.is_empty());
        assert_eq!(def.service_id, "");
        assert!(def.integration_ids.is_empty());
        assert_eq!(def.evaluation_strategy.unwrap().ignore_below, None);
    }
}
