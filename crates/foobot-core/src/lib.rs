pub mod duration;
pub mod normalize;
pub mod peak;
pub mod schedule;

pub use duration::{format_duration, format_millis};
pub use normalize::{
    clamp_co2, clamp_humidity, clamp_pm25, clamp_temperature, classify_air_quality, convert_voc,
    detect_co2,
};
pub use peak::peak;
pub use schedule::{backoff_delay, next_delay, NextDelay};
