use crate::poller::DevicePoller;
use foobot_client::TelemetryClient;
use foobot_shutdown::SignalHandler;
use foobot_types::PollState;
use std::collections::HashMap;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// 设备轮询任务的集合
///
/// 每台设备一个独立任务，彼此之间没有共享的可变状态。
pub struct PollScheduler {
    handler: SignalHandler,
    tasks: Vec<(String, JoinHandle<PollState>)>,
}

impl PollScheduler {
    pub fn new(handler: SignalHandler) -> Self {
        Self {
            handler,
            tasks: Vec::new(),
        }
    }

    /// 启动一台设备的轮询任务（立即进行首次轮询）
    pub fn spawn<C>(&mut self, poller: DevicePoller<C>)
    where
        C: TelemetryClient + ?Sized + 'static,
    {
        let device_id = poller.device().id.clone();
        // 先订阅再启动，避免错过启动期间发出的信号
        let shutdown = self.handler.subscribe();

        info!(
            device_id = %device_id,
            name = %poller.device().name,
            offset_secs = poller.device().offset_secs,
            "Starting device poller"
        );
        let handle = tokio::spawn(poller.run(shutdown));
        self.tasks.push((device_id, handle));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// 广播关闭信号并等待所有任务退出
    pub async fn shutdown(self) -> HashMap<String, PollState> {
        self.handler.trigger_shutdown();
        self.join().await
    }

    /// 在限定时间内关闭；超时未退出的任务被强制中止
    pub async fn shutdown_timeout(self, limit: Duration) -> HashMap<String, PollState> {
        self.handler.trigger_shutdown();

        let mut states = HashMap::new();
        for (device_id, mut handle) in self.tasks {
            match timeout(limit, &mut handle).await {
                Ok(Ok(state)) => {
                    states.insert(device_id, state);
                }
                Ok(Err(e)) => error!(device_id = %device_id, error = %e, "Poller task failed"),
                Err(_) => {
                    warn!(device_id = %device_id, "Poller did not stop in time, aborting");
                    handle.abort();
                }
            }
        }
        states
    }

    /// 等待所有任务结束，返回每台设备的最终状态
    pub async fn join(self) -> HashMap<String, PollState> {
        let mut states = HashMap::new();
        for (device_id, handle) in self.tasks {
            match handle.await {
                Ok(state) => {
                    info!(device_id = %device_id, active = state.active, "Device poller stopped");
                    states.insert(device_id, state);
                }
                Err(e) => error!(device_id = %device_id, error = %e, "Poller task failed"),
            }
        }
        states
    }
}
