mod health;
mod invoke;
mod metrics;

pub use health::health_handler;
pub use invoke::invoke_handler;
pub use metrics::metrics_handler;
