use crate::{command::Command, error::CommandError, error::CommandResult};
use async_trait::async_trait;
use cmdkit_core::Deferred;
use std::sync::Arc;

/// 命令总线（Command Bus）
///
/// - 负责根据命令的 `NAME` 路由到对应的处理器；
/// - `execute` 立即返回待定结果，`dispatch` 等待结果落定；
/// - 该 trait 带有泛型方法，通常以具体实现类型注入使用。
#[async_trait]
pub trait CommandBus: Send + Sync {
    /// 启动命令执行，返回其最终结果的句柄
    fn execute<C: Command>(&self, cmd: Arc<C>) -> CommandResult<Deferred<CommandError>>;

    /// 分发命令并等待其成功或失败
    async fn dispatch<C: Command>(&self, cmd: Arc<C>) -> CommandResult<()>;
}
