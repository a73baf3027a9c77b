pub mod cli;
pub mod config;
pub mod error;
pub mod performance;

pub use config::WorkshopConfig;
pub use error::{WorkshopError, WorkshopResult};
pub use performance::{Advisor, Advisory, Collector, MetricsProvider, Observation, PerformanceSystem};
