use serde::{Deserialize, Serialize};

/// 厂商名称
pub const MANUFACTURER: &str = "Airboxlab SA";

/// 设备型号
pub const MODEL: &str = "Foobot";

/// 被轮询的空气质量设备
///
/// 设备集合在进程启动时确定，运行期间不会增删。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// 设备 UUID（API 中的唯一标识）
    pub id: String,

    /// 显示名称
    pub name: String,

    /// MAC 地址（原始格式，仅用于展示）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,

    /// 轮询错峰偏移（秒），同一账号下的多个设备借此分散请求
    #[serde(default)]
    pub offset_secs: i64,
}

impl Device {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mac: None,
            offset_secs: 0,
        }
    }

    pub fn with_mac(mut self, mac: impl Into<String>) -> Self {
        self.mac = Some(mac.into());
        self
    }

    pub fn with_offset(mut self, offset_secs: i64) -> Self {
        self.offset_secs = offset_secs;
        self
    }

    /// 生成设备的附属信息（厂商、型号、序列号等）
    pub fn info(&self, firmware_revision: &str) -> DeviceInfo {
        DeviceInfo {
            device_id: self.id.clone(),
            name: self.name.clone(),
            manufacturer: MANUFACTURER.to_string(),
            model: MODEL.to_string(),
            serial_number: self.id.clone(),
            mac: self.mac.as_deref().and_then(format_mac),
            firmware_revision: firmware_revision.to_string(),
        }
    }
}

/// 设备附属信息，启动时向展示层推送一次
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_id: String,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub mac: Option<String>,
    pub firmware_revision: String,
}

/// 将任意分隔形式的 MAC 地址整理为 `AA:BB:CC:DD:EE:FF`
///
/// 没有任何十六进制字节对时返回 `None`。
pub fn format_mac(raw: &str) -> Option<String> {
    let digits: Vec<char> = raw.chars().filter(|c| c.is_ascii_hexdigit()).collect();
    let pairs: Vec<String> = digits
        .chunks_exact(2)
        .map(|pair| pair.iter().collect::<String>().to_ascii_uppercase())
        .collect();

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join(":"))
    }
}
