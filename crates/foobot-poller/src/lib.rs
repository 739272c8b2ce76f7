pub mod poller;
pub mod scheduler;
pub mod sink;

pub use poller::{default_sensors, DevicePoller, PollPhase, PollerSettings};
pub use scheduler::PollScheduler;
pub use sink::{
    DeviceSnapshot, FanoutSink, PresentationSink, SensorUpdate, SnapshotSink, TracingSink,
};
