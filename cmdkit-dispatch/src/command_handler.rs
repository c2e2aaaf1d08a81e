use crate::{command::Command, error::CommandResult};
use async_trait::async_trait;
use cmdkit_core::Registry;

/// 命令处理器
///
/// 通过关联类型 `Command` 声明所处理的命令；同一命令仅保留最后注册的处理器。
#[async_trait]
pub trait CommandHandler: Send + Sync + 'static {
    type Command: Command;

    /// 注册时调用一次，用于从注册表解析依赖；未配置注册表时不会调用
    fn bind(&mut self, _registry: &dyn Registry) -> CommandResult<()> {
        Ok(())
    }

    async fn handle(&self, cmd: &Self::Command) -> CommandResult<()>;
}
