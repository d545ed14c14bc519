//! Ragbot core library
//!
//! Shared foundations for the ragbot workspace:
//! - Error taxonomy (`AppError`, `AppResult`)
//! - Layered configuration (`AppConfig`)
//! - Logging setup

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, DimensionPolicy};
pub use error::{AppError, AppResult};
