//! HTTP API: ingestion gateway adapters and analytics read endpoints

pub mod analytics;
pub mod automation;
pub mod data;
pub mod health;
pub mod webhook;

pub use analytics::analytics_routes;
pub use automation::automation_routes;
pub use data::data_routes;
pub use health::health_routes;
pub use webhook::webhook_routes;
