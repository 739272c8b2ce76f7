//! 原始读数到展示层取值的归一化
//!
//! 全部是纯函数。超出范围的值被截断而不是拒绝；NaN 原样透传，
//! 由调用方决定是否写入。

use foobot_types::{AirQuality, Co2Detected};

pub const PM25_MIN: f64 = 0.0;
pub const PM25_MAX: f64 = 1000.0;

/// 温度下限取绝对零度附近
pub const TEMPERATURE_MIN: f64 = -270.0;
pub const TEMPERATURE_MAX: f64 = 100.0;

pub const HUMIDITY_MIN: f64 = 0.0;
pub const HUMIDITY_MAX: f64 = 100.0;

pub const CO2_MIN: f64 = 0.0;
pub const CO2_MAX: f64 = 100_000.0;

pub const VOC_MAX: f64 = 1000.0;

/// 20 °C、1013 mb 下 CO 的 ppb → µg/m³ 换算系数
///
/// 设备对 CO 非常敏感，因此 VOC 按 CO 当量换算。
pub const CO_AT_20C_AND_1013MB: f64 = 1.1642;

/// `allpollu` 六档刻度的单档宽度
const BAND: f64 = 50.0 / 3.0;

pub fn clamp_pm25(value: f64) -> f64 {
    value.clamp(PM25_MIN, PM25_MAX)
}

pub fn clamp_temperature(value: f64) -> f64 {
    value.clamp(TEMPERATURE_MIN, TEMPERATURE_MAX)
}

pub fn clamp_humidity(value: f64) -> f64 {
    value.clamp(HUMIDITY_MIN, HUMIDITY_MAX)
}

pub fn clamp_co2(value: f64) -> f64 {
    value.clamp(CO2_MIN, CO2_MAX)
}

/// VOC 从 ppb 换算为 µg/m³，结果限制在 [0, 1000]
pub fn convert_voc(ppb: f64) -> f64 {
    (ppb * CO_AT_20C_AND_1013MB).clamp(0.0, VOC_MAX)
}

/// 将 `allpollu` 综合指数映射为五级空气质量
///
/// 源刻度有六档（全蓝、2/3 蓝、1/3 蓝、1/3 橙、2/3 橙、全橙），目标只有五级，
/// 中间偏上的两档都归为 INFERIOR：
///
/// | allpollu        | 等级      |
/// |-----------------|-----------|
/// | ≤ 16.67         | EXCELLENT |
/// | ≤ 33.33         | GOOD      |
/// | ≤ 50            | FAIR      |
/// | ≤ 66.67         | INFERIOR  |
/// | ≤ 83.33         | INFERIOR  |
/// | > 83.33         | POOR      |
///
/// NaN 返回 UNKNOWN。
pub fn classify_air_quality(allpollu: f64) -> AirQuality {
    if allpollu.is_nan() {
        AirQuality::Unknown
    } else if allpollu <= BAND {
        AirQuality::Excellent
    } else if allpollu <= BAND * 2.0 {
        AirQuality::Good
    } else if allpollu <= BAND * 3.0 {
        AirQuality::Fair
    } else if allpollu <= BAND * 5.0 {
        AirQuality::Inferior
    } else {
        AirQuality::Poor
    }
}

/// 超过阈值即为异常；每次独立判断，没有迟滞
pub fn detect_co2(level: f64, limit: f64) -> Co2Detected {
    if level > limit {
        Co2Detected::Abnormal
    } else {
        Co2Detected::Normal
    }
}
