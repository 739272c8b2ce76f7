use foobot_client::{ClientConfig, ClientError, TelemetryClient};
use foobot_config::{AppConfig, DeviceConfig};
use foobot_poller::{
    DevicePoller, FanoutSink, PollScheduler, PollerSettings, PresentationSink, SnapshotSink,
    TracingSink,
};
use foobot_shutdown::{ShutdownSignal, SignalHandler};
use foobot_types::{Device, PollState};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub fn client_config(config: &AppConfig) -> ClientConfig {
    ClientConfig::new(config.api_key.clone())
        .with_base_url(config.base_url.clone())
        .with_timeout(config.request_timeout())
}

pub fn poller_settings(config: &AppConfig) -> PollerSettings {
    PollerSettings {
        co2_limit: config.co2_limit,
        co2_off: config.co2_off,
    }
}

/// 确定要轮询的设备集合
///
/// 显式配置的设备在前，账号下自动发现的设备在后，按 uuid 去重。
/// 未指定 offset 的设备按最终序号错峰。发现失败时，若已有显式设备则
/// 只记录警告，否则返回错误。
pub async fn resolve_devices<C>(config: &AppConfig, client: &C) -> Result<Vec<Device>, ClientError>
where
    C: TelemetryClient + ?Sized,
{
    let mut entries: Vec<DeviceConfig> = config.devices.clone();

    if let Some(owner) = config.owner() {
        match client.list_devices(owner).await {
            Ok(owned) => {
                info!(owner = %owner, count = owned.len(), "Discovered devices");
                let mut seen: HashSet<String> = entries.iter().map(|d| d.uuid.clone()).collect();
                for device in owned {
                    let device = device.into_device();
                    if device.id.is_empty() || !seen.insert(device.id.clone()) {
                        continue;
                    }
                    entries.push(DeviceConfig::from(&device));
                }
            }
            Err(e) if !entries.is_empty() => {
                warn!(
                    owner = %owner,
                    error = %e,
                    "Device discovery failed, using configured devices"
                );
            }
            Err(e) => return Err(e),
        }
    }

    Ok(entries
        .iter()
        .enumerate()
        .map(|(index, entry)| entry.to_device(index, config.offset_spacing_secs))
        .collect())
}

/// 运行中的服务
pub struct Service {
    scheduler: PollScheduler,
    snapshot: SnapshotSink,
}

impl Service {
    pub fn snapshot(&self) -> &SnapshotSink {
        &self.snapshot
    }

    pub fn device_count(&self) -> usize {
        self.scheduler.len()
    }

    /// 取消所有定时器并等待轮询任务退出
    ///
    /// 在途请求最多等待 `limit`，超时的任务被中止。
    pub async fn stop(self, limit: Duration) -> HashMap<String, PollState> {
        let states = self.scheduler.shutdown_timeout(limit).await;
        if let Ok(json) = self.snapshot.to_json() {
            info!(snapshot = %json, "Final device snapshot");
        }
        states
    }
}

/// 等待关闭信号后停止服务
///
/// 信号监听本身失败时同样停止所有轮询任务，并把错误返回给调用方。
pub async fn serve_until<F>(
    service: Service,
    shutdown: F,
    limit: Duration,
) -> io::Result<HashMap<String, PollState>>
where
    F: Future<Output = io::Result<ShutdownSignal>>,
{
    match shutdown.await {
        Ok(signal) => {
            info!(signal = ?signal, "Stopping pollers");
            Ok(service.stop(limit).await)
        }
        Err(e) => {
            warn!(error = %e, "Shutdown listener failed, stopping pollers");
            service.stop(limit).await;
            Err(e)
        }
    }
}

/// 为每台设备启动一个轮询任务
pub fn start_pollers<C>(
    devices: Vec<Device>,
    settings: PollerSettings,
    client: Arc<C>,
    handler: SignalHandler,
) -> Service
where
    C: TelemetryClient + ?Sized + 'static,
{
    let snapshot = SnapshotSink::new();
    let sink: Arc<dyn PresentationSink> = Arc::new(
        FanoutSink::new()
            .with(Arc::new(snapshot.clone()))
            .with(Arc::new(TracingSink)),
    );

    let mut scheduler = PollScheduler::new(handler);
    for device in devices {
        scheduler.spawn(DevicePoller::new(device, settings, client.clone(), sink.clone()));
    }

    Service {
        scheduler,
        snapshot,
    }
}
