//! Provider data structure passed to resources and data sources

use crate::api::Client;
use std::any::Any;
use std::sync::Arc;
use tfplug::Diagnostic;

#[derive(Clone)]
pub struct FastlyProviderData {
    pub client: Arc<Client>,
}

impl FastlyProviderData {
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Recover the provider data handed to a resource or data source `configure`
    pub fn from_configure(
        provider_data: Option<Arc<dyn Any + Send + Sync>>,
        receiver: &str,
    ) -> Result<Self, Diagnostic> {
        let Some(data) = provider_data else {
            tracing::warn!("No provider data provided to {}", receiver);
            return Err(Diagnostic::error(
                "No provider data",
                format!("No provider data was provided to the {}", receiver),
            ));
        };

        match data.downcast_ref::<FastlyProviderData>() {
            Some(provider_data) => Ok(provider_data.clone()),
            None => {
                tracing::error!("Failed to downcast provider data to FastlyProviderData");
                Err(Diagnostic::error(
                    "Invalid provider data",
                    "Failed to extract FastlyProviderData from provider data",
                ))
            }
        }
    }
}
