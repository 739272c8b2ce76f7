use crate::quality::AirQuality;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 初始轮询间隔
pub const INITIAL_DELAY: Duration = Duration::from_secs(10 * 60);

/// 最近一次接受的归一化读数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastKnown {
    pub air_quality: AirQuality,
    pub pm25_density: f64,
    pub voc_density: f64,
    pub current_temperature: f64,
    pub current_relative_humidity: f64,
    pub carbon_dioxide_level: f64,
    pub carbon_dioxide_peak_level: f64,
    /// 读数时间戳（unix 秒）
    pub time: i64,
}

impl Default for LastKnown {
    fn default() -> Self {
        Self {
            air_quality: AirQuality::Unknown,
            pm25_density: 0.0,
            voc_density: 0.0,
            current_temperature: 0.0,
            current_relative_humidity: 0.0,
            carbon_dioxide_level: 0.0,
            carbon_dioxide_peak_level: 0.0,
            time: 0,
        }
    }
}

/// 单个设备的轮询状态，只由该设备自己的轮询任务修改
#[derive(Debug, Clone, PartialEq)]
pub struct PollState {
    pub last_known: LastKnown,

    /// 当前轮询间隔（调整后，永不为负）
    pub delay: Duration,

    /// 仅在一次成功轮询之后为 true
    pub active: bool,
}

impl PollState {
    pub fn new() -> Self {
        Self {
            last_known: LastKnown::default(),
            delay: INITIAL_DELAY,
            active: false,
        }
    }

    /// 从缓存的读数恢复（例如桥接层持久化的上次值）
    pub fn with_last_known(last_known: LastKnown) -> Self {
        Self {
            last_known,
            ..Self::new()
        }
    }
}

impl Default for PollState {
    fn default() -> Self {
        Self::new()
    }
}
