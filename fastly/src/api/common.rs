//! Common types and utilities for the Fastly API

use serde::Deserialize;

/// JSON:API top-level document used by the TLS endpoints
#[derive(Debug, Deserialize)]
pub struct Document<T> {
    pub data: T,
    #[serde(default, deserialize_with = "null_as_default")]
    pub included: Vec<IncludedResource>,
}

/// `{ "type": ..., "id": ... }` linkage inside a relationship
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ResourceIdentifier {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// To-many relationship. Null or absent data reads as empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelationshipList {
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<ResourceIdentifier>,
}

/// Side-loaded resource from an `include=` request; attributes are decoded lazily
#[derive(Debug, Clone, Deserialize)]
pub struct IncludedResource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: serde_json::Value,
}

/// Treat an explicit JSON `null` like an absent field
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Both error shapes Fastly uses: JSON:API `errors` and the legacy `msg`/`detail`
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub errors: Option<Vec<ApiErrorItem>>,
    pub msg: Option<String>,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorItem {
    pub title: Option<String>,
    pub detail: Option<String>,
}

#[derive(Debug)]
pub struct ApiErrorDetails {
    pub errors: Vec<ApiErrorItem>,
    pub msg: Option<String>,
    pub detail: Option<String>,
}

impl ApiErrorDetails {
    fn describe(&self) -> String {
        let mut parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| match (&e.title, &e.detail) {
                (Some(t), Some(d)) => format!("{}: {}", t, d),
                (Some(t), None) => t.clone(),
                (None, Some(d)) => d.clone(),
                (None, None) => "unknown error".to_string(),
            })
            .collect();
        parts.extend(self.msg.iter().cloned());
        parts.extend(self.detail.iter().cloned());
        parts.join("; ")
    }
}

impl std::fmt::Display for ApiErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "API error details: {}", self.describe())
    }
}

impl std::error::Error for ApiErrorDetails {}

impl From<ApiErrorResponse> for ApiErrorDetails {
    fn from(resp: ApiErrorResponse) -> Self {
        Self {
            errors: resp.errors.unwrap_or_default(),
            msg: resp.msg,
            detail: resp.detail,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn add_optional<K: Into<String>, V: ToString>(mut self, key: K, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.params.push((key.into(), v.to_string()));
        }
        self
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            return String::new();
        }
        format!(
            "?{}",
            self.params
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&")
        )
    }
}

/// Page request for the JSON:API list endpoints. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: u32,
    pub size: Option<u32>,
}

impl PageRequest {
    pub fn new(number: u32) -> Self {
        Self { number, size: None }
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn to_query_params(&self) -> ApiQueryParams {
        ApiQueryParams::new()
            .add("page[number]", self.number)
            .add_optional("page[size]", self.size)
    }
}
