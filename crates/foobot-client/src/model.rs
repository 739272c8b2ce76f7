use crate::error::{ClientError, Result};
use foobot_types::{Device, RawReadingRow};
use serde::{Deserialize, Serialize};

/// `/device/{uuid}/datapoint/...` 的响应体
///
/// `datapoints` 的第 0 行是最新的一行，列与 `sensors` 对齐。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatapointsResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub sensors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub units: Vec<String>,
    pub datapoints: Vec<Vec<Option<f64>>>,
}

impl DatapointsResponse {
    /// 取出最新一行；空表或行宽不足视为格式错误
    pub fn into_latest_row(self) -> Result<RawReadingRow> {
        let row = self
            .datapoints
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::malformed("response contains no datapoints"))?;

        if row.len() < self.sensors.len() {
            return Err(ClientError::malformed(format!(
                "datapoint row has {} values for {} sensors",
                row.len(),
                self.sensors.len()
            )));
        }

        let values = row
            .into_iter()
            .take(self.sensors.len())
            .map(|value| value.unwrap_or(f64::NAN))
            .collect();

        Ok(RawReadingRow::new(self.sensors, values))
    }
}

/// `/owner/{user}/devices` 返回的设备
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedDevice {
    pub uuid: String,
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub mac: String,
    pub name: String,
}

impl OwnedDevice {
    pub fn into_device(self) -> Device {
        let device = Device::new(self.uuid, self.name);
        if self.mac.is_empty() {
            device
        } else {
            device.with_mac(self.mac)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foobot_types::Sensor;

    #[test]
    fn test_latest_row_is_first() {
        let body = r#"{
            "uuid": "240D676D40002482",
            "sensors": ["time", "pm", "tmp"],
            "units": ["s", "ugm3", "C"],
            "datapoints": [[1700000300, 12.5, 21.0], [1700000000, 99.0, 30.0]]
        }"#;
        let response: DatapointsResponse = serde_json::from_str(body).unwrap();
        let row = response.into_latest_row().unwrap();

        assert_eq!(row.get(Sensor::Time), Some(1_700_000_300.0));
        assert_eq!(row.get(Sensor::Pm), Some(12.5));
        assert_eq!(row.get(Sensor::Tmp), Some(21.0));
    }

    #[test]
    fn test_null_value_becomes_nan() {
        let body = r#"{"sensors": ["allpollu"], "datapoints": [[null]]}"#;
        let response: DatapointsResponse = serde_json::from_str(body).unwrap();
        let row = response.into_latest_row().unwrap();
        assert!(row.get(Sensor::AllPollu).unwrap().is_nan());
    }

    #[test]
    fn test_empty_datapoints_rejected() {
        let body = r#"{"sensors": ["pm"], "datapoints": []}"#;
        let response: DatapointsResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(
            response.into_latest_row(),
            Err(ClientError::MalformedBody(_))
        ));
    }

    #[test]
    fn test_short_row_rejected() {
        let body = r#"{"sensors": ["pm", "tmp"], "datapoints": [[1.0]]}"#;
        let response: DatapointsResponse = serde_json::from_str(body).unwrap();
        assert!(response.into_latest_row().is_err());
    }

    #[test]
    fn test_owned_device_into_device() {
        let body = r#"{"uuid": "ABC", "userId": 42, "mac": "240d676d4000", "name": "Office"}"#;
        let owned: OwnedDevice = serde_json::from_str(body).unwrap();
        let device = owned.into_device();

        assert_eq!(device.id, "ABC");
        assert_eq!(device.name, "Office");
        assert_eq!(device.mac.as_deref(), Some("240d676d4000"));
        assert_eq!(device.offset_secs, 0);
    }
}
