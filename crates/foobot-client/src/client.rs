use crate::error::Result;
use crate::model::OwnedDevice;
use async_trait::async_trait;
use foobot_types::{RawReadingRow, Sensor};

/// 遥测 API 客户端接口
///
/// 每次调用恰好发起一次请求，本层不做重试。
#[async_trait]
pub trait TelemetryClient: Send + Sync {
    /// 读取设备最新的一行读数
    ///
    /// 返回的始终是接口中最新的一行。`device_id` 为空时直接返回
    /// `InvalidArgument`，不发起请求。要么完整解码，要么失败，不返回部分结果。
    async fn fetch_latest(&self, device_id: &str, sensors: &[Sensor]) -> Result<RawReadingRow>;

    /// 列出账号下的设备
    async fn list_devices(&self, owner: &str) -> Result<Vec<OwnedDevice>>;
}
