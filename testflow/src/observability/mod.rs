//! Logging setup and timing helpers.

mod logging;
mod timer;

pub use logging::{init_logging, LogFormat, DEFAULT_LOG_FILTER};
pub use timer::SpanTimer;
