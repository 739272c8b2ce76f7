pub mod level;
pub mod subscriber;

pub use level::LogLevel;
pub use subscriber::{build_filter, init_logging, LoggingConfig, LoggingError};
