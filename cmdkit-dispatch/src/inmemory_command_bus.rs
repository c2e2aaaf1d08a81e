use crate::{
    command::Command,
    command_bus::CommandBus,
    command_handler::CommandHandler,
    config::CommandBusConfig,
    error::{CommandError, CommandResult},
    event::CommandCompleted,
    handler_table::{DynHandler, HandlerTable},
    latch::SettleLatch,
};
use async_trait::async_trait;
use bon::Builder;
use cmdkit_core::{Deferred, Registry};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// 基于内存的 CommandBus 实现
/// - 以命令 `NAME` 注册对应的 Handler，后注册者覆盖先注册者
/// - 处理器在独立任务中执行，与可选的超时计时器竞争落定
/// - 每次执行持有独立的落定闩，保证钩子与完成事件恰好触发一次
///
/// 未显式配置 `runtime` 时使用调用 `execute` 所在的 tokio 运行时。
#[derive(Builder)]
pub struct InMemoryCommandBus {
    #[builder(skip)]
    handlers: HandlerTable,
    /// 依赖注册表：注册处理器前用于绑定其依赖
    registry: Option<Arc<dyn Registry>>,
    #[builder(default)]
    config: CommandBusConfig,
    runtime: Option<Handle>,
}

impl Default for InMemoryCommandBus {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl InMemoryCommandBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: Arc<dyn Registry>) -> Self {
        Self::builder().registry(registry).build()
    }

    pub fn config(&self) -> &CommandBusConfig {
        &self.config
    }

    /// 注册命令处理器
    pub fn register<H>(&self, handler: H) -> CommandResult<()>
    where
        H: CommandHandler,
    {
        self.maybe_register(Some(handler))
    }

    /// 注册可能为空的命令处理器；为空时返回 `NilHandler` 且不修改处理器表
    pub fn maybe_register<H>(&self, handler: Option<H>) -> CommandResult<()>
    where
        H: CommandHandler,
    {
        let Some(mut handler) = handler else {
            return Err(CommandError::NilHandler);
        };

        if let Some(registry) = &self.registry {
            handler.bind(registry.as_ref())?;
        }

        let replaced = self.handlers.insert(handler);
        debug!(
            command = <H::Command as Command>::NAME,
            replaced, "command handler registered"
        );
        Ok(())
    }

    pub fn is_registered<C: Command>(&self) -> bool {
        self.handlers.contains(C::NAME)
    }

    /// 获取已注册的命令名列表（按名称排序）
    pub fn registered_commands(&self) -> Vec<&'static str> {
        self.handlers.names()
    }

    /// 启动命令执行，立即返回待定结果
    pub fn execute<C: Command>(&self, cmd: Arc<C>) -> CommandResult<Deferred<CommandError>> {
        self.maybe_execute(Some(cmd))
    }

    /// 同 `execute`，命令为空时返回 `NilCommand`
    ///
    /// 启动失败（空命令、未注册、无运行时）同步返回，不会触发任何事件。
    pub fn maybe_execute<C: Command>(
        &self,
        cmd: Option<Arc<C>>,
    ) -> CommandResult<Deferred<CommandError>> {
        let Some(cmd) = cmd else {
            return Err(CommandError::NilCommand);
        };

        let handler = self.handlers.get::<C>().inspect_err(|err| {
            warn!(command = C::NAME, error = %err, "unable to resolve command handler");
        })?;
        let runtime = self.runtime()?;

        if let Err(err) = cmd.setup() {
            warn!(command = C::NAME, error = %err, "command setup failed");
        }

        let timeout = cmd.timeout().effective(self.config.default_timeout());
        debug!(command = C::NAME, ?timeout, "dispatching command");

        Ok(Self::execute_timed(&runtime, cmd, handler, timeout))
    }

    /// 执行命令并等待结果落定
    pub async fn wait<C: Command>(&self, cmd: Arc<C>) -> CommandResult<()> {
        self.maybe_wait(Some(cmd)).await
    }

    pub async fn maybe_wait<C: Command>(&self, cmd: Option<Arc<C>>) -> CommandResult<()> {
        self.maybe_execute(cmd)?.settled().await
    }

    /// 阻塞当前线程直到命令结果落定
    ///
    /// 不可在单线程运行时的异步任务中调用：处理器任务将无法推进。
    pub fn blocking_wait<C: Command>(&self, cmd: Arc<C>) -> CommandResult<()> {
        let outcome = self.execute(cmd)?;
        futures::executor::block_on(outcome.settled())
    }

    fn runtime(&self) -> CommandResult<Handle> {
        self.runtime
            .clone()
            .or_else(|| Handle::try_current().ok())
            .ok_or(CommandError::NoRuntime)
    }

    fn execute_timed<C: Command>(
        runtime: &Handle,
        cmd: Arc<C>,
        handler: DynHandler<C>,
        timeout: Option<Duration>,
    ) -> Deferred<CommandError> {
        let outcome = Deferred::new();
        let latch = Arc::new(SettleLatch::new());

        // handler worker：处理器 panic 视为处理器失败
        {
            let cmd = cmd.clone();
            let outcome = outcome.clone();
            let latch = latch.clone();

            runtime.spawn(async move {
                let result = AssertUnwindSafe(handler.handle(&cmd))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| Err(CommandError::from_panic(payload)));

                match result {
                    Ok(()) => Self::settle_success(&latch, &cmd, &outcome),
                    Err(err) => Self::settle_failure(&latch, &cmd, &outcome, err),
                }
            });
        }

        // timeout worker：结果先落定时直接退出，不触碰落定闩
        if let Some(limit) = timeout {
            let outcome = outcome.clone();

            runtime.spawn(async move {
                tokio::select! {
                    _ = outcome.settled() => {}
                    _ = tokio::time::sleep(limit) => {
                        let err = CommandError::Timeout { command: C::NAME, after: limit };
                        Self::settle_failure(&latch, &cmd, &outcome, err);
                    }
                }
            });
        }

        outcome
    }

    fn settle_success<C: Command>(
        latch: &SettleLatch,
        cmd: &Arc<C>,
        outcome: &Deferred<CommandError>,
    ) {
        let entered = latch.enter(|| {
            cmd.completed();
            cmd.events()
                .trigger(CommandCompleted::new(cmd.clone(), None));
            outcome.resolve();
            Ok(())
        });

        match entered {
            Ok(()) => debug!(command = C::NAME, "command completed"),
            Err(err) => Self::settle_rejected_entry(C::NAME, outcome, err),
        }
    }

    fn settle_failure<C: Command>(
        latch: &SettleLatch,
        cmd: &Arc<C>,
        outcome: &Deferred<CommandError>,
        err: CommandError,
    ) {
        let entered = latch.enter(|| {
            cmd.failed(&err);
            cmd.events()
                .trigger(CommandCompleted::new(cmd.clone(), Some(err.clone())));
            outcome.reject(err.clone());
            Ok(())
        });

        match entered {
            Ok(()) => debug!(command = C::NAME, error = %err, "command failed"),
            Err(entry_err) => Self::settle_rejected_entry(C::NAME, outcome, entry_err),
        }

        // 已落定时为无操作
        outcome.reject(err);
    }

    fn settle_rejected_entry(
        command: &'static str,
        outcome: &Deferred<CommandError>,
        err: CommandError,
    ) {
        match err {
            CommandError::AlreadySettled => {
                debug!(command, "command already settled, outcome discarded");
            }
            err => {
                warn!(command, error = %err, "command hook panicked");
                outcome.reject(err);
            }
        }
    }
}

#[async_trait]
impl CommandBus for InMemoryCommandBus {
    fn execute<C: Command>(&self, cmd: Arc<C>) -> CommandResult<Deferred<CommandError>> {
        self.maybe_execute(Some(cmd))
    }

    async fn dispatch<C: Command>(&self, cmd: Arc<C>) -> CommandResult<()> {
        self.maybe_wait(Some(cmd)).await
    }
}
