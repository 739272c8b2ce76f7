pub mod error;
pub mod loader;
pub mod settings;

pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, ENV_PREFIX, ENV_SEPARATOR};
pub use settings::{AppConfig, DeviceConfig};

pub use foobot_logging::{LogLevel, LoggingConfig};
