use crate::sink::{PresentationSink, SensorUpdate};
use foobot_client::{ClientError, TelemetryClient};
use foobot_core::{
    backoff_delay, clamp_co2, clamp_humidity, clamp_pm25, clamp_temperature,
    classify_air_quality, convert_voc, detect_co2, format_duration, format_millis, next_delay,
    peak,
};
use foobot_shutdown::ShutdownSignal;
use foobot_types::{Device, PollState, RawReadingRow, Sensor};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// 上报给展示层的固件版本
pub const FIRMWARE_REVISION: &str = env!("CARGO_PKG_VERSION");

/// 轮询行为配置（所有设备共享，只读）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollerSettings {
    /// CO2 告警阈值（ppm）
    pub co2_limit: f64,

    /// 完全关闭 CO2 采集
    pub co2_off: bool,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            co2_limit: 1000.0,
            co2_off: false,
        }
    }
}

/// 每次请求的传感器列表
pub fn default_sensors(co2_off: bool) -> Vec<Sensor> {
    let mut sensors = vec![
        Sensor::Pm,
        Sensor::Voc,
        Sensor::Tmp,
        Sensor::Hum,
        Sensor::AllPollu,
    ];
    if !co2_off {
        sensors.push(Sensor::Co2);
    }
    sensors
}

/// 轮询状态机
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    /// 等待定时器
    Idle,
    /// 请求进行中
    Polling,
    /// 写入成功取回的读数
    Applying,
    /// 失败，准备随机退避
    Backoff,
}

/// 单台设备的轮询循环
///
/// 独占该设备的 [`PollState`]；同一设备任意时刻最多只有一个请求在途，
/// 下一次定时器只在本次 tick（无论成功失败）完全结束后才安排。
pub struct DevicePoller<C: TelemetryClient + ?Sized> {
    device: Device,
    state: PollState,
    phase: PollPhase,
    settings: PollerSettings,
    sensors: Vec<Sensor>,
    client: Arc<C>,
    sink: Arc<dyn PresentationSink>,
}

impl<C: TelemetryClient + ?Sized> DevicePoller<C> {
    pub fn new(
        device: Device,
        settings: PollerSettings,
        client: Arc<C>,
        sink: Arc<dyn PresentationSink>,
    ) -> Self {
        Self {
            device,
            state: PollState::new(),
            phase: PollPhase::Idle,
            sensors: default_sensors(settings.co2_off),
            settings,
            client,
            sink,
        }
    }

    /// 以已有的状态启动（例如恢复缓存的读数）
    pub fn with_state(mut self, state: PollState) -> Self {
        self.state = state;
        self
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    /// 持续轮询直到收到关闭信号，返回最终状态
    ///
    /// 关闭信号只会取消尚未触发的定时器；在途请求照常完成并写入结果。
    /// 信号通道关闭同样视为关闭。
    pub async fn run(
        mut self,
        mut shutdown: broadcast::Receiver<ShutdownSignal>,
    ) -> PollState {
        self.sink.register(&self.device.info(FIRMWARE_REVISION));

        loop {
            let delay = self.tick().await;

            // 先检查关闭信号：等待时间为 0 时也不会再发起新的请求
            tokio::select! {
                biased;
                signal = shutdown.recv() => {
                    info!(
                        device_id = %self.device.id,
                        signal = ?signal.ok(),
                        "Poll timer cancelled"
                    );
                    break;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.state
    }

    /// 执行一次轮询，返回下一次等待时间
    pub async fn tick(&mut self) -> Duration {
        self.phase = PollPhase::Polling;
        info!(device_id = %self.device.id, name = %self.device.name, "Updating datapoints");

        let result = self.client.fetch_latest(&self.device.id, &self.sensors).await;

        let delay = match result {
            Ok(row) => {
                let now_ms = chrono::Utc::now().timestamp_millis();
                self.apply(&row, now_ms)
            }
            Err(err) => self.fail(&err, &mut rand::thread_rng()),
        };

        self.phase = PollPhase::Idle;
        delay
    }

    /// 写入一行成功取回的读数并计算下一次等待时间
    pub fn apply(&mut self, row: &RawReadingRow, now_ms: i64) -> Duration {
        self.phase = PollPhase::Applying;
        self.set_active(true);
        debug!(device_id = %self.device.id, row = ?row, "Received datapoints");

        let updated = self.apply_values(row);
        if updated == 0 {
            debug!(device_id = %self.device.id, "Row contained no known sensors");
        }

        let next = next_delay(
            self.state.delay,
            now_ms,
            self.state.last_known.time,
            self.device.offset_secs,
        );
        if next.clock_skew {
            warn!(
                device_id = %self.device.id,
                delta = %format_millis(
                    now_ms.saturating_sub(self.state.last_known.time.saturating_mul(1000))
                ),
                "Time delta exceeds 5 minutes, ignoring it"
            );
        } else {
            debug!(
                device_id = %self.device.id,
                delta = %format_millis(next.delta_ms),
                "Delta between now and the time in the data"
            );
        }

        self.state.delay = next.delay;
        info!(
            device_id = %self.device.id,
            delay = %format_duration(next.delay),
            "Waiting for next call"
        );
        next.delay
    }

    /// 请求失败：标记不可用并返回随机退避时间
    ///
    /// 基础间隔保持不变，下一次成功后仍按原来的节奏交替。
    pub fn fail<R: Rng + ?Sized>(&mut self, err: &ClientError, rng: &mut R) -> Duration {
        self.phase = PollPhase::Backoff;
        error!(device_id = %self.device.id, error = %err, "Failed to fetch datapoints");
        self.set_active(false);

        let delay = backoff_delay(rng);
        info!(
            device_id = %self.device.id,
            delay = %format_duration(delay),
            "Waiting to try again"
        );
        delay
    }

    fn set_active(&mut self, active: bool) {
        self.state.active = active;
        self.publish(SensorUpdate::Active(active));
    }

    fn publish(&self, update: SensorUpdate) {
        self.sink.publish(&self.device.id, update);
    }

    /// 按传感器逐项归一化并写入 `last_known`，返回更新的字段数
    ///
    /// 行中缺失的传感器保持原值；NaN 读数同样不覆盖数值字段。
    fn apply_values(&mut self, row: &RawReadingRow) -> usize {
        let mut updated = 0;

        if let Some(pm) = finite(row, Sensor::Pm) {
            let value = clamp_pm25(pm);
            self.state.last_known.pm25_density = value;
            self.publish(SensorUpdate::Pm25Density(value));
            updated += 1;
        }

        if let Some(tmp) = finite(row, Sensor::Tmp) {
            let value = clamp_temperature(tmp);
            self.state.last_known.current_temperature = value;
            self.publish(SensorUpdate::CurrentTemperature(value));
            updated += 1;
        }

        if let Some(hum) = finite(row, Sensor::Hum) {
            let value = clamp_humidity(hum);
            self.state.last_known.current_relative_humidity = value;
            self.publish(SensorUpdate::CurrentRelativeHumidity(value));
            updated += 1;
        }

        if !self.settings.co2_off {
            if let Some(co2) = finite(row, Sensor::Co2) {
                let value = clamp_co2(co2);
                let last = &mut self.state.last_known;
                last.carbon_dioxide_level = value;
                last.carbon_dioxide_peak_level = peak(value, last.carbon_dioxide_peak_level);
                let peak_level = last.carbon_dioxide_peak_level;

                self.publish(SensorUpdate::Co2Detected(detect_co2(
                    value,
                    self.settings.co2_limit,
                )));
                self.publish(SensorUpdate::Co2Level(value));
                self.publish(SensorUpdate::Co2PeakLevel(peak_level));
                updated += 1;
            }
        }

        if let Some(voc) = finite(row, Sensor::Voc) {
            let value = convert_voc(voc);
            self.state.last_known.voc_density = value;
            self.publish(SensorUpdate::VocDensity(value));
            updated += 1;
        }

        // 非数值的指数显式映射为 UNKNOWN
        if let Some(allpollu) = row.get(Sensor::AllPollu) {
            let quality = classify_air_quality(allpollu);
            self.state.last_known.air_quality = quality;
            self.publish(SensorUpdate::AirQuality(quality));
            updated += 1;
        }

        if let Some(time) = finite(row, Sensor::Time) {
            self.state.last_known.time = time as i64;
            updated += 1;
        }

        updated
    }
}

fn finite(row: &RawReadingRow, sensor: Sensor) -> Option<f64> {
    row.get(sensor).filter(|v| !v.is_nan())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::SnapshotSink;
    use foobot_client::mock::ScriptedClient;
    use foobot_types::{AirQuality, Co2Detected, LastKnown};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    const NOW_MS: i64 = 1_700_000_000_000;
    const NOW_S: f64 = 1_700_000_000.0;

    fn row(pairs: &[(&str, f64)]) -> RawReadingRow {
        RawReadingRow::new(
            pairs.iter().map(|(s, _)| s.to_string()).collect(),
            pairs.iter().map(|(_, v)| *v).collect(),
        )
    }

    fn poller(
        settings: PollerSettings,
        offset_secs: i64,
    ) -> (DevicePoller<ScriptedClient>, SnapshotSink) {
        let sink = SnapshotSink::new();
        let device = Device::new("240D676D40002482", "Living room").with_offset(offset_secs);
        let poller = DevicePoller::new(
            device,
            settings,
            Arc::new(ScriptedClient::new()),
            Arc::new(sink.clone()),
        );
        (poller, sink)
    }

    #[test]
    fn test_sensor_list() {
        assert_eq!(
            Sensor::join(&default_sensors(false)),
            "pm,voc,tmp,hum,allpollu,co2"
        );
        assert_eq!(Sensor::join(&default_sensors(true)), "pm,voc,tmp,hum,allpollu");
    }

    #[test]
    fn test_partial_row_leaves_other_fields() {
        let (poller, sink) = poller(PollerSettings::default(), 0);
        let previous = LastKnown {
            current_relative_humidity: 55.0,
            carbon_dioxide_level: 700.0,
            carbon_dioxide_peak_level: 900.0,
            voc_density: 120.0,
            air_quality: AirQuality::Good,
            ..LastKnown::default()
        };
        let mut poller = poller.with_state(PollState::with_last_known(previous.clone()));

        poller.apply(&row(&[("pm", 42.0), ("tmp", 21.0)]), NOW_MS);

        let last = &poller.state().last_known;
        assert_eq!(last.pm25_density, 42.0);
        assert_eq!(last.current_temperature, 21.0);
        assert_eq!(last.current_relative_humidity, 55.0);
        assert_eq!(last.carbon_dioxide_level, 700.0);
        assert_eq!(last.carbon_dioxide_peak_level, 900.0);
        assert_eq!(last.voc_density, 120.0);
        assert_eq!(last.air_quality, AirQuality::Good);
        assert!(poller.state().active);

        let snapshot = sink.get("240D676D40002482").unwrap();
        assert!(snapshot.active);
        assert_eq!(snapshot.pm25_density, Some(42.0));
        assert_eq!(snapshot.current_relative_humidity, None);
    }

    #[test]
    fn test_values_are_normalized() {
        let (mut poller, _sink) = poller(PollerSettings::default(), 0);

        poller.apply(
            &row(&[
                ("pm", 1500.0),
                ("tmp", -300.0),
                ("hum", 120.0),
                ("voc", 100.0),
                ("co2", 250_000.0),
                ("allpollu", 60.0),
            ]),
            NOW_MS,
        );

        let last = &poller.state().last_known;
        assert_eq!(last.pm25_density, 1000.0);
        assert_eq!(last.current_temperature, -270.0);
        assert_eq!(last.current_relative_humidity, 100.0);
        assert!((last.voc_density - 116.42).abs() < 1e-9);
        assert_eq!(last.carbon_dioxide_level, 100_000.0);
        assert_eq!(last.air_quality, AirQuality::Inferior);
    }

    #[test]
    fn test_co2_alarm_and_peak() {
        let settings = PollerSettings {
            co2_limit: 1000.0,
            co2_off: false,
        };
        let (mut poller, sink) = poller(settings, 0);

        poller.apply(&row(&[("co2", 1500.0)]), NOW_MS);
        let snapshot = sink.get("240D676D40002482").unwrap();
        assert_eq!(snapshot.co2_detected, Some(Co2Detected::Abnormal));
        assert_eq!(snapshot.co2_peak_level, Some(1500.0));

        poller.apply(&row(&[("co2", 500.0)]), NOW_MS);
        let snapshot = sink.get("240D676D40002482").unwrap();
        assert_eq!(snapshot.co2_detected, Some(Co2Detected::Normal));
        assert_eq!(snapshot.co2_level, Some(500.0));
        assert_eq!(snapshot.co2_peak_level, Some(1500.0));
        assert_eq!(poller.state().last_known.carbon_dioxide_peak_level, 1500.0);
    }

    #[test]
    fn test_co2_ignored_when_disabled() {
        let settings = PollerSettings {
            co2_limit: 1000.0,
            co2_off: true,
        };
        let (mut poller, sink) = poller(settings, 0);
        assert!(!poller.sensors().contains(&Sensor::Co2));

        poller.apply(&row(&[("co2", 1500.0), ("pm", 3.0)]), NOW_MS);

        assert_eq!(poller.state().last_known.carbon_dioxide_level, 0.0);
        let snapshot = sink.get("240D676D40002482").unwrap();
        assert_eq!(snapshot.co2_level, None);
        assert_eq!(snapshot.co2_detected, None);
    }

    #[test]
    fn test_allpollu_scenarios() {
        let (mut poller, _sink) = poller(PollerSettings::default(), 0);
        let cases = [
            (10.0, AirQuality::Excellent),
            (20.0, AirQuality::Good),
            (40.0, AirQuality::Fair),
            (60.0, AirQuality::Inferior),
            (90.0, AirQuality::Poor),
            (f64::NAN, AirQuality::Unknown),
        ];

        for (allpollu, expected) in cases {
            poller.apply(&row(&[("allpollu", allpollu)]), NOW_MS);
            assert_eq!(poller.state().last_known.air_quality, expected);
        }
    }

    #[test]
    fn test_nan_reading_keeps_previous_value() {
        let (mut poller, _sink) = poller(PollerSettings::default(), 0);
        poller.apply(&row(&[("pm", 12.0)]), NOW_MS);
        poller.apply(&row(&[("pm", f64::NAN)]), NOW_MS);
        assert_eq!(poller.state().last_known.pm25_density, 12.0);
    }

    #[test]
    fn test_fresh_reading_delay_is_base_minus_offset() {
        let (mut poller, _sink) = poller(PollerSettings::default(), 30);

        // 初始间隔 10 分钟 → 本次基础间隔 5 分钟
        let delay = poller.apply(&row(&[("time", NOW_S), ("pm", 5.0)]), NOW_MS);
        assert_eq!(delay, Duration::from_secs(5 * 60 - 30));
        assert_eq!(poller.state().delay, delay);
        assert_eq!(poller.state().last_known.time, 1_700_000_000);

        // 4.5 分钟不超过 7.5 分钟 → 10 分钟基础间隔
        let delay = poller.apply(&row(&[("time", NOW_S), ("pm", 5.0)]), NOW_MS);
        assert_eq!(delay, Duration::from_secs(10 * 60 - 30));
    }

    #[test]
    fn test_empty_row_still_reschedules() {
        let (mut poller, _sink) = poller(PollerSettings::default(), 0);

        let delay = poller.apply(&RawReadingRow::default(), NOW_MS);

        // 没有时间戳，差值异常被归零
        assert_eq!(delay, Duration::from_secs(5 * 60));
        assert!(poller.state().active);
        assert_eq!(poller.state().last_known, LastKnown::default());
    }

    #[test]
    fn test_failure_marks_inactive() {
        let (mut poller, sink) = poller(PollerSettings::default(), 0);
        poller.apply(&row(&[("pm", 5.0)]), NOW_MS);
        assert!(sink.get("240D676D40002482").unwrap().active);

        let mut rng = SmallRng::seed_from_u64(1);
        let delay = poller.fail(&ClientError::network("connection reset"), &mut rng);

        assert!(delay <= Duration::from_millis(600_000));
        assert!(!poller.state().active);
        assert_eq!(poller.phase(), PollPhase::Backoff);
        assert!(!sink.get("240D676D40002482").unwrap().active);
        // 失败不改变基础节奏
        assert_eq!(poller.state().delay, Duration::from_secs(5 * 60));
    }

    #[test]
    fn test_failure_delay_distribution() {
        let (mut poller, _sink) = poller(PollerSettings::default(), 0);
        let mut rng = SmallRng::seed_from_u64(42);
        let err = ClientError::Status {
            status: 503,
            url: "https://api.foobot.io/v2".to_string(),
        };

        let trials = 5_000;
        let mut below_half = 0;
        for _ in 0..trials {
            let delay = poller.fail(&err, &mut rng);
            assert!(delay <= Duration::from_millis(600_000));
            if delay < Duration::from_millis(300_000) {
                below_half += 1;
            }
        }

        let share = below_half as f64 / trials as f64;
        assert!((0.45..0.55).contains(&share), "share = {share}");
    }

    #[tokio::test]
    async fn test_tick_failure_path() {
        let sink = SnapshotSink::new();
        let client = Arc::new(ScriptedClient::new().then_fail(ClientError::Status {
            status: 500,
            url: "x".to_string(),
        }));
        let mut poller = DevicePoller::new(
            Device::new("dev1", "Office"),
            PollerSettings::default(),
            client.clone(),
            Arc::new(sink.clone()),
        );

        let delay = poller.tick().await;

        assert!(delay <= Duration::from_millis(600_000));
        assert_eq!(poller.phase(), PollPhase::Idle);
        assert!(!poller.state().active);
        assert_eq!(client.calls(), 1);
        assert_eq!(client.requests()[0].1, default_sensors(false));
    }

    #[tokio::test]
    async fn test_tick_success_path() {
        let sink = SnapshotSink::new();
        let client = Arc::new(
            ScriptedClient::new().then_fresh(row(&[("pm", 8.0), ("allpollu", 20.0)])),
        );
        let mut poller = DevicePoller::new(
            Device::new("dev1", "Office"),
            PollerSettings::default(),
            client,
            Arc::new(sink.clone()),
        );

        let delay = poller.tick().await;

        // 读数几乎是当前时间：约 5 分钟
        assert!(delay <= Duration::from_secs(5 * 60));
        assert!(delay > Duration::from_secs(4 * 60));
        assert!(poller.state().active);
        assert_eq!(poller.state().last_known.air_quality, AirQuality::Good);
        assert_eq!(sink.get("dev1").unwrap().pm25_density, Some(8.0));
    }
}
