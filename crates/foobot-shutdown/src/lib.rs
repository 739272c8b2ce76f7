pub mod signal;

pub use signal::{ShutdownSignal, SignalHandler};
