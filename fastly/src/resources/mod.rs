//! Resource implementations

pub mod alert;
pub mod ngwaf_alert_datadog_integration;

pub use alert::AlertResource;
pub use ngwaf_alert_datadog_integration::NgwafAlertDatadogIntegrationResource;
