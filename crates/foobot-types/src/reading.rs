use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// API 暴露的传感器名称（固定词表）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensor {
    /// PM2.5 (µg/m³)
    Pm,
    /// 挥发性有机物 (ppb)
    Voc,
    /// 温度 (°C)
    Tmp,
    /// 相对湿度 (%)
    Hum,
    /// 二氧化碳 (ppm)
    Co2,
    /// 综合污染指数
    AllPollu,
    /// 读数时间戳（unix 秒）
    Time,
}

impl Sensor {
    pub const ALL: [Sensor; 7] = [
        Sensor::Pm,
        Sensor::Voc,
        Sensor::Tmp,
        Sensor::Hum,
        Sensor::Co2,
        Sensor::AllPollu,
        Sensor::Time,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pm => "pm",
            Self::Voc => "voc",
            Self::Tmp => "tmp",
            Self::Hum => "hum",
            Self::Co2 => "co2",
            Self::AllPollu => "allpollu",
            Self::Time => "time",
        }
    }

    /// 拼接成 `sensorList` 查询参数
    pub fn join(sensors: &[Sensor]) -> String {
        sensors
            .iter()
            .map(Sensor::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl FromStr for Sensor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pm" => Ok(Self::Pm),
            "voc" => Ok(Self::Voc),
            "tmp" => Ok(Self::Tmp),
            "hum" => Ok(Self::Hum),
            "co2" => Ok(Self::Co2),
            "allpollu" => Ok(Self::AllPollu),
            "time" => Ok(Self::Time),
            other => Err(format!("unknown sensor: {}", other)),
        }
    }
}

/// 一行原始读数
///
/// `sensors[i]` 与 `values[i]` 一一对应。客户端只返回接口中最新的一行
/// （响应中的第 0 行），调用方无需关心行序。非数值（`null`）读数以 NaN 表示。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawReadingRow {
    pub sensors: Vec<String>,
    pub values: Vec<f64>,
}

impl RawReadingRow {
    pub fn new(sensors: Vec<String>, values: Vec<f64>) -> Self {
        Self { sensors, values }
    }

    /// 读取指定传感器的值；行中没有该传感器时返回 `None`
    pub fn get(&self, sensor: Sensor) -> Option<f64> {
        let index = self.sensors.iter().position(|s| s == sensor.as_str())?;
        self.values.get(index).copied()
    }

    pub fn contains(&self, sensor: Sensor) -> bool {
        self.get(sensor).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_parse() {
        for sensor in Sensor::ALL {
            assert_eq!(sensor.as_str().parse::<Sensor>(), Ok(sensor));
        }
        assert!("ozone".parse::<Sensor>().is_err());
    }

    #[test]
    fn test_sensor_join() {
        let list = Sensor::join(&[Sensor::Pm, Sensor::Voc, Sensor::Co2]);
        assert_eq!(list, "pm,voc,co2");
    }

    #[test]
    fn test_row_lookup() {
        let row = RawReadingRow::new(
            vec!["time".to_string(), "pm".to_string(), "tmp".to_string()],
            vec![1_700_000_000.0, 42.0, 21.0],
        );

        assert_eq!(row.get(Sensor::Pm), Some(42.0));
        assert_eq!(row.get(Sensor::Tmp), Some(21.0));
        assert_eq!(row.get(Sensor::Hum), None);
        assert!(row.contains(Sensor::Time));
    }

    #[test]
    fn test_row_value_missing_for_position() {
        let row = RawReadingRow::new(vec!["pm".to_string(), "voc".to_string()], vec![3.0]);
        assert_eq!(row.get(Sensor::Voc), None);
    }
}
