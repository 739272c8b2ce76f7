use chrono::{DateTime, Utc};
use foobot_types::{AirQuality, Co2Detected, DeviceInfo};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// 推送给展示层的一项更新
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SensorUpdate {
    Active(bool),
    AirQuality(AirQuality),
    Pm25Density(f64),
    VocDensity(f64),
    CurrentTemperature(f64),
    CurrentRelativeHumidity(f64),
    Co2Detected(Co2Detected),
    Co2Level(f64),
    Co2PeakLevel(f64),
}

/// 展示层接口（只推不拉）
///
/// 由轮询任务同步调用，实现应尽快返回。
pub trait PresentationSink: Send + Sync {
    /// 启动时推送一次设备信息
    fn register(&self, _info: &DeviceInfo) {}

    /// 推送一项更新
    fn publish(&self, device_id: &str, update: SensorUpdate);
}

/// 每台设备最近一次推送的取值
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub info: Option<DeviceInfo>,
    pub active: bool,
    pub air_quality: AirQuality,
    pub pm25_density: Option<f64>,
    pub voc_density: Option<f64>,
    pub current_temperature: Option<f64>,
    pub current_relative_humidity: Option<f64>,
    pub co2_detected: Option<Co2Detected>,
    pub co2_level: Option<f64>,
    pub co2_peak_level: Option<f64>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updates: u64,
}

impl DeviceSnapshot {
    fn apply(&mut self, update: SensorUpdate) {
        match update {
            SensorUpdate::Active(active) => self.active = active,
            SensorUpdate::AirQuality(quality) => self.air_quality = quality,
            SensorUpdate::Pm25Density(v) => self.pm25_density = Some(v),
            SensorUpdate::VocDensity(v) => self.voc_density = Some(v),
            SensorUpdate::CurrentTemperature(v) => self.current_temperature = Some(v),
            SensorUpdate::CurrentRelativeHumidity(v) => self.current_relative_humidity = Some(v),
            SensorUpdate::Co2Detected(detected) => self.co2_detected = Some(detected),
            SensorUpdate::Co2Level(v) => self.co2_level = Some(v),
            SensorUpdate::Co2PeakLevel(v) => self.co2_peak_level = Some(v),
        }
        self.updated_at = Some(Utc::now());
        self.updates += 1;
    }
}

/// 内存快照
///
/// 保存每台设备最近一次推送的状态，可作为桥接层的只读视图。
#[derive(Clone, Default)]
pub struct SnapshotSink {
    devices: Arc<RwLock<HashMap<String, DeviceSnapshot>>>,
}

impl SnapshotSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, device_id: &str) -> Option<DeviceSnapshot> {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(device_id)
            .cloned()
    }

    pub fn all(&self) -> HashMap<String, DeviceSnapshot> {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.all())
    }
}

impl PresentationSink for SnapshotSink {
    fn register(&self, info: &DeviceInfo) {
        let mut devices = self.devices.write().unwrap_or_else(PoisonError::into_inner);
        devices.entry(info.device_id.clone()).or_default().info = Some(info.clone());
    }

    fn publish(&self, device_id: &str, update: SensorUpdate) {
        let mut devices = self.devices.write().unwrap_or_else(PoisonError::into_inner);
        devices
            .entry(device_id.to_string())
            .or_default()
            .apply(update);
    }
}

/// 把每次推送写入日志
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl PresentationSink for TracingSink {
    fn register(&self, info: &DeviceInfo) {
        info!(
            device_id = %info.device_id,
            name = %info.name,
            model = %info.model,
            mac = ?info.mac,
            "Device registered"
        );
    }

    fn publish(&self, device_id: &str, update: SensorUpdate) {
        match update {
            SensorUpdate::Active(active) => {
                info!(device_id = %device_id, active, "Availability changed");
            }
            other => {
                debug!(device_id = %device_id, update = ?other, "Value published");
            }
        }
    }
}

/// 同时推送给多个展示层
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn PresentationSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn PresentationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl PresentationSink for FanoutSink {
    fn register(&self, info: &DeviceInfo) {
        for sink in &self.sinks {
            sink.register(info);
        }
    }

    fn publish(&self, device_id: &str, update: SensorUpdate) {
        for sink in &self.sinks {
            sink.publish(device_id, update);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foobot_types::Device;

    #[test]
    fn test_snapshot_tracks_latest_values() {
        let sink = SnapshotSink::new();
        sink.publish("dev1", SensorUpdate::Pm25Density(12.0));
        sink.publish("dev1", SensorUpdate::Pm25Density(15.0));
        sink.publish("dev1", SensorUpdate::Active(true));

        let snapshot = sink.get("dev1").unwrap();
        assert_eq!(snapshot.pm25_density, Some(15.0));
        assert!(snapshot.active);
        assert_eq!(snapshot.updates, 3);
        assert!(sink.get("dev2").is_none());
    }

    #[test]
    fn test_snapshot_register() {
        let sink = SnapshotSink::new();
        let info = Device::new("dev1", "Office").info("0.1.0");
        sink.register(&info);

        let snapshot = sink.get("dev1").unwrap();
        assert_eq!(snapshot.info, Some(info));
        assert_eq!(snapshot.updates, 0);
        assert!(!snapshot.active);
    }

    #[test]
    fn test_fanout_reaches_every_sink() {
        let first = SnapshotSink::new();
        let second = SnapshotSink::new();
        let fanout = FanoutSink::new()
            .with(Arc::new(first.clone()))
            .with(Arc::new(second.clone()))
            .with(Arc::new(TracingSink));
        assert_eq!(fanout.len(), 3);

        fanout.publish("dev1", SensorUpdate::AirQuality(AirQuality::Good));

        assert_eq!(first.get("dev1").unwrap().air_quality, AirQuality::Good);
        assert_eq!(second.get("dev1").unwrap().air_quality, AirQuality::Good);
    }

    #[test]
    fn test_update_serialization() {
        let json = serde_json::to_value(SensorUpdate::Co2Level(850.0)).unwrap();
        assert_eq!(json["kind"], "co2_level");
        assert_eq!(json["value"], 850.0);
    }
}
