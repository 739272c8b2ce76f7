use crate::error::{ConfigError, Result};
use foobot_logging::LoggingConfig;
use foobot_types::Device;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// 应用配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    /// Foobot API key
    pub api_key: String,

    /// CO2 告警阈值（ppm）
    #[serde(default = "default_co2_limit")]
    pub co2_limit: f64,

    /// 关闭 CO2 采集
    #[serde(default)]
    pub co2_off: bool,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// 关闭时等待在途请求的最长时间
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    /// 账号用户名，用于自动发现设备
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// 未指定 offset 的设备按序号乘以该间隔错峰
    #[serde(default = "default_offset_spacing_secs")]
    pub offset_spacing_secs: i64,

    #[serde(default)]
    pub devices: Vec<DeviceConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 单台设备配置
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeviceConfig {
    pub uuid: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,

    /// 固定偏移（秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
}

fn default_co2_limit() -> f64 {
    1000.0
}

fn default_base_url() -> String {
    "https://api.foobot.io/v2".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}

fn default_offset_spacing_secs() -> i64 {
    30
}

impl AppConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            co2_limit: default_co2_limit(),
            co2_off: false,
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            owner: None,
            offset_spacing_secs: default_offset_spacing_secs(),
            devices: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// 非空的 owner
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref().map(str::trim).filter(|o| !o.is_empty())
    }

    /// 验证配置
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::invalid("api_key must not be empty"));
        }

        if !self.co2_limit.is_finite() || self.co2_limit < 0.0 {
            return Err(ConfigError::invalid(format!(
                "co2_limit must be a non-negative number, got {}",
                self.co2_limit
            )));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::invalid("request_timeout_secs must be greater than 0"));
        }

        if self.offset_spacing_secs < 0 {
            return Err(ConfigError::invalid("offset_spacing_secs must not be negative"));
        }

        if self.devices.is_empty() && self.owner().is_none() {
            return Err(ConfigError::invalid(
                "either devices or owner must be configured",
            ));
        }

        let mut seen = HashSet::new();
        for (index, device) in self.devices.iter().enumerate() {
            if device.uuid.trim().is_empty() {
                return Err(ConfigError::invalid(format!(
                    "devices[{}].uuid must not be empty",
                    index
                )));
            }
            if device.offset.is_some_and(|offset| offset < 0) {
                return Err(ConfigError::invalid(format!(
                    "devices[{}].offset must not be negative",
                    index
                )));
            }
            if !seen.insert(device.uuid.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "device {} is configured more than once",
                    device.uuid
                )));
            }
        }

        Ok(())
    }

    /// 渲染为 TOML，API key 被隐藏
    pub fn to_toml_redacted(&self) -> Result<String> {
        let mut redacted = self.clone();
        redacted.api_key = "********".to_string();
        Ok(toml::to_string_pretty(&redacted)?)
    }
}

impl DeviceConfig {
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            mac: None,
            offset: None,
        }
    }

    /// 生成运行期设备；未指定 offset 时取 `index * spacing_secs`
    pub fn to_device(&self, index: usize, spacing_secs: i64) -> Device {
        let offset = self
            .offset
            .unwrap_or_else(|| (index as i64).saturating_mul(spacing_secs));
        let name = if self.name.is_empty() {
            self.uuid.clone()
        } else {
            self.name.clone()
        };

        let device = Device::new(self.uuid.clone(), name).with_offset(offset);
        match &self.mac {
            Some(mac) => device.with_mac(mac.clone()),
            None => device,
        }
    }
}

impl From<&Device> for DeviceConfig {
    fn from(device: &Device) -> Self {
        Self {
            uuid: device.id.clone(),
            name: device.name.clone(),
            mac: device.mac.clone(),
            offset: None,
        }
    }
}
