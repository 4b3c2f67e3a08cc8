//! Shared plumbing for toolauth: tracing setup and default directories.

pub mod paths;
pub mod tracing;

pub use paths::{config_dir, data_dir};
pub use self::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
