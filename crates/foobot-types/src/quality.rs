use serde::{Deserialize, Serialize};

/// 五级空气质量（外加未知）
///
/// 数值编码与家庭自动化层的 AirQuality 特征值保持一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AirQuality {
    #[default]
    Unknown,
    Excellent,
    Good,
    Fair,
    Inferior,
    Poor,
}

impl AirQuality {
    pub fn code(&self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Excellent => 1,
            Self::Good => 2,
            Self::Fair => 3,
            Self::Inferior => 4,
            Self::Poor => 5,
        }
    }

    /// 严重程度，未知时为 `None`
    pub fn severity(&self) -> Option<u8> {
        match self {
            Self::Unknown => None,
            other => Some(other.code()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Excellent => "EXCELLENT",
            Self::Good => "GOOD",
            Self::Fair => "FAIR",
            Self::Inferior => "INFERIOR",
            Self::Poor => "POOR",
        }
    }
}

/// CO2 告警状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Co2Detected {
    #[default]
    Normal,
    Abnormal,
}

impl Co2Detected {
    pub fn code(&self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::Abnormal => 1,
        }
    }
}
