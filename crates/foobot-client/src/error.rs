use thiserror::Error;

/// 遥测客户端错误
///
/// 除 `InvalidArgument` 外都属于传输类错误，由轮询循环统一转入重试。
#[derive(Error, Debug)]
pub enum ClientError {
    /// 调用方参数错误（例如设备 ID 为空）
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// 非 2xx 响应
    #[error("Request failed with status {status}: {url}")]
    Status { status: u16, url: String },

    /// 响应不是 JSON
    #[error("Invalid content-type; expected application/json, received {content_type:?}")]
    BadContentType { content_type: String },

    /// 响应体解码失败或结构不符合约定
    #[error("Malformed response body: {0}")]
    MalformedBody(String),

    /// 连接层错误
    #[error("Network error: {0}")]
    Network(String),
}

/// 客户端结果类型
pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        ClientError::InvalidArgument(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        ClientError::MalformedBody(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        ClientError::Network(msg.into())
    }

    /// 是否为可重试的传输类错误
    pub fn is_transport(&self) -> bool {
        !matches!(self, ClientError::InvalidArgument(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::MalformedBody(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_transport() {
        assert!(!ClientError::invalid_argument("UUID required").is_transport());
        assert!(ClientError::Status { status: 429, url: "x".into() }.is_transport());
        assert!(ClientError::malformed("eof").is_transport());
        assert!(ClientError::network("refused").is_transport());
    }

    #[test]
    fn test_from_serde_error() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(ClientError::from(err), ClientError::MalformedBody(_)));
    }
}
