//! # Cinder Utilities
//!
//! Shared helpers for the Cinder workspace.
//!
//! Right now that is the logging setup built on `tracing`; see [`logging`].

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{
    init_logging, init_logging_with_level, LogFormat, LogLevel, LoggingConfig, LoggingError, LoggingGuard,
};
pub use tracing::{debug, error, info, trace, warn};
