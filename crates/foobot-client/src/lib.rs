pub mod client;
pub mod error;
pub mod http;
pub mod model;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use client::TelemetryClient;
pub use error::{ClientError, Result};
pub use http::{ClientConfig, FoobotClient, DEFAULT_BASE_URL};
pub use model::{DatapointsResponse, OwnedDevice};
