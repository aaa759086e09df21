//! Fastly REST API client

pub mod alerts;
pub mod client;
pub mod common;
pub mod error;
pub mod ngwaf;
pub mod tls;

pub use client::{Client, ClientConfig, DEFAULT_BASE_URL};
pub use error::ApiError;
