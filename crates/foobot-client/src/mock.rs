//! 按脚本返回结果的内存客户端

use crate::client::TelemetryClient;
use crate::error::{ClientError, Result};
use crate::model::OwnedDevice;
use async_trait::async_trait;
use foobot_types::{RawReadingRow, Sensor};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

/// 预设的一次响应
#[derive(Debug)]
pub enum Scripted {
    /// 原样返回
    Row(RawReadingRow),
    /// 返回时把 `time` 改写为当前时间
    Fresh(RawReadingRow),
    /// 返回错误
    Fail(ClientError),
}

/// 脚本化客户端
///
/// 脚本耗尽后，若设置了 `repeat_fresh` 则持续返回该行（时间戳为当前时间），
/// 否则返回网络错误。
#[derive(Default)]
pub struct ScriptedClient {
    script: Mutex<VecDeque<Scripted>>,
    repeat_fresh: Option<RawReadingRow>,
    devices: Vec<OwnedDevice>,
    calls: AtomicUsize,
    requested: Mutex<Vec<(String, Vec<Sensor>)>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(self, response: Scripted) -> Self {
        lock(&self.script).push_back(response);
        self
    }

    pub fn then_row(self, row: RawReadingRow) -> Self {
        self.then(Scripted::Row(row))
    }

    pub fn then_fresh(self, row: RawReadingRow) -> Self {
        self.then(Scripted::Fresh(row))
    }

    pub fn then_fail(self, error: ClientError) -> Self {
        self.then(Scripted::Fail(error))
    }

    pub fn repeat_fresh(mut self, row: RawReadingRow) -> Self {
        self.repeat_fresh = Some(row);
        self
    }

    pub fn with_devices(mut self, devices: Vec<OwnedDevice>) -> Self {
        self.devices = devices;
        self
    }

    /// `fetch_latest` 被调用的次数
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 每次调用的设备 ID 与传感器列表
    pub fn requests(&self) -> Vec<(String, Vec<Sensor>)> {
        lock(&self.requested).clone()
    }
}

/// 把行中的 `time` 改写为当前 unix 秒（没有则追加）
pub fn stamp_now(mut row: RawReadingRow) -> RawReadingRow {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as f64)
        .unwrap_or_default();

    match row.sensors.iter().position(|s| s == Sensor::Time.as_str()) {
        Some(index) if index < row.values.len() => row.values[index] = now,
        _ => {
            row.sensors.push(Sensor::Time.as_str().to_string());
            row.values.push(now);
        }
    }
    row
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl TelemetryClient for ScriptedClient {
    async fn fetch_latest(&self, device_id: &str, sensors: &[Sensor]) -> Result<RawReadingRow> {
        if device_id.is_empty() {
            return Err(ClientError::invalid_argument("device id required"));
        }

        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.requested).push((device_id.to_string(), sensors.to_vec()));

        let next = lock(&self.script).pop_front();
        match next {
            Some(Scripted::Row(row)) => Ok(row),
            Some(Scripted::Fresh(row)) => Ok(stamp_now(row)),
            Some(Scripted::Fail(error)) => Err(error),
            None => match &self.repeat_fresh {
                Some(row) => Ok(stamp_now(row.clone())),
                None => Err(ClientError::network("script exhausted")),
            },
        }
    }

    async fn list_devices(&self, owner: &str) -> Result<Vec<OwnedDevice>> {
        if owner.is_empty() {
            return Err(ClientError::invalid_argument("owner required"));
        }
        Ok(self.devices.clone())
    }
}
