pub mod dashboards;
pub mod metrics;
pub mod services;
pub mod spans;
pub mod stats;
