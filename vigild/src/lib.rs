pub mod alerts;
pub mod api;
pub mod collectors;
pub mod config;
pub mod metrics;
pub mod scheduler;
pub mod store;
pub mod types;

pub use config::Config;
pub use metrics::Metrics;
