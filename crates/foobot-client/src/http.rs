use crate::client::TelemetryClient;
use crate::error::{ClientError, Result};
use crate::model::{DatapointsResponse, OwnedDevice};
use async_trait::async_trait;
use foobot_types::{RawReadingRow, Sensor};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// 官方 API 地址
pub const DEFAULT_BASE_URL: &str = "https://api.foobot.io/v2";

/// API key 请求头
pub const API_KEY_HEADER: &str = "x-api-key-token";

const ACCEPT_JSON: &str = "application/json;charset=UTF-8";

/// 客户端配置
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// 基于 reqwest 的 Foobot API 客户端
pub struct FoobotClient {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl FoobotClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ClientError::invalid_argument(format!("invalid base url {}: {}", config.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::invalid_argument(format!(
                "base url cannot carry a path: {}",
                config.base_url
            )));
        }

        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key,
        })
    }

    /// 读取数据点
    ///
    /// `period` 与 `average_by` 为 0 时只返回最新一行。
    pub async fn fetch_datapoints(
        &self,
        device_id: &str,
        period: u64,
        average_by: u64,
        sensors: &[Sensor],
    ) -> Result<DatapointsResponse> {
        if device_id.is_empty() {
            return Err(ClientError::invalid_argument("device id required"));
        }

        let period = period.to_string();
        let average_by = average_by.to_string();
        let mut url = self.endpoint(&[
            "device",
            device_id,
            "datapoint",
            period.as_str(),
            "last",
            average_by.as_str(),
            "",
        ])?;
        if !sensors.is_empty() {
            url.query_pairs_mut()
                .append_pair("sensorList", &Sensor::join(sensors));
        }

        self.get_json(url).await
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::invalid_argument("base url cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(url = %url, "Requesting Foobot API");

        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, ACCEPT_JSON)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.starts_with("application/json") {
            return Err(ClientError::BadContentType { content_type });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl TelemetryClient for FoobotClient {
    async fn fetch_latest(&self, device_id: &str, sensors: &[Sensor]) -> Result<RawReadingRow> {
        self.fetch_datapoints(device_id, 0, 0, sensors)
            .await?
            .into_latest_row()
    }

    async fn list_devices(&self, owner: &str) -> Result<Vec<OwnedDevice>> {
        if owner.is_empty() {
            return Err(ClientError::invalid_argument("owner required"));
        }

        let url = self.endpoint(&["owner", owner, "devices"])?;
        self.get_json(url).await
    }
}
