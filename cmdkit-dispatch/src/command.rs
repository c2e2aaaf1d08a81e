use crate::error::{CommandError, CommandResult};
use crate::event::CommandCompleted;
use cmdkit_core::EventChannel;
use std::time::Duration;

/// 应用层命令（Command）
///
/// 表达“意图”的写操作请求，由唯一注册的处理器执行。
/// - 以 `NAME` 作为路由键，不依赖运行时类型探测；
/// - 每个命令实例持有自己的事件通道，执行结束时触发一次 [`CommandCompleted`]；
/// - 可选能力（`setup`/`completed`/`failed`/`timeout`）以默认空实现提供，按需覆盖。
///
/// 命令以 `Arc<C>` 在调用方与分发器之间共享，钩子仅获得 `&self`，
/// 需要在钩子中修改的状态请使用内部可变性。
pub trait Command: Send + Sync + Sized + 'static {
    /// 命令的稳定名称（建议常量字符串，不随重构变化）
    const NAME: &'static str;

    fn events(&self) -> &EventChannel<CommandCompleted<Self>>;

    /// 执行前钩子：在任何异步工作开始前同步调用。
    /// 返回的错误仅记录日志，不影响执行；panic 会直接传播给调用方。
    fn setup(&self) -> CommandResult<()> {
        Ok(())
    }

    /// 成功后钩子
    fn completed(&self) {}

    /// 失败后钩子（处理器失败或超时）
    fn failed(&self, _err: &CommandError) {}

    /// 超时策略，默认沿用分发器配置
    fn timeout(&self) -> TimeoutPolicy {
        TimeoutPolicy::Inherit
    }
}

/// 命令级超时策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeoutPolicy {
    /// 使用分发器的默认超时
    #[default]
    Inherit,
    /// 不设超时，等待处理器自行结束
    Unlimited,
    /// 固定时长；`Duration::ZERO` 表示立即超时
    After(Duration),
}

impl TimeoutPolicy {
    /// 结合分发器默认值得到实际生效的超时，`None` 表示不限时
    pub fn effective(self, default: Option<Duration>) -> Option<Duration> {
        match self {
            Self::Inherit => default,
            Self::Unlimited => None,
            Self::After(limit) => Some(limit),
        }
    }
}

impl From<Option<Duration>> for TimeoutPolicy {
    fn from(value: Option<Duration>) -> Self {
        value.map_or(Self::Unlimited, Self::After)
    }
}
