pub mod device;
pub mod quality;
pub mod reading;
pub mod state;

pub use device::{format_mac, Device, DeviceInfo};
pub use quality::{AirQuality, Co2Detected};
pub use reading::{RawReadingRow, Sensor};
pub use state::{LastKnown, PollState};
