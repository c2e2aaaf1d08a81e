use serde::Deserialize;
use std::time::Duration;

/// 命令总线配置
///
/// 可直接从配置文件反序列化，缺省字段使用默认值：
/// ```rust
/// use cmdkit_dispatch::config::CommandBusConfig;
/// use std::time::Duration;
///
/// let config: CommandBusConfig = serde_json::from_str(r#"{ "default_timeout_ms": 250 }"#).unwrap();
/// assert_eq!(config.default_timeout(), Some(Duration::from_millis(250)));
/// ```
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommandBusConfig {
    /// 命令未声明超时时使用的默认超时（毫秒）；为空表示不限时
    pub default_timeout_ms: Option<u64>,
}

impl CommandBusConfig {
    pub fn with_default_timeout(timeout: Duration) -> Self {
        Self {
            default_timeout_ms: Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)),
        }
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms.map(Duration::from_millis)
    }
}
